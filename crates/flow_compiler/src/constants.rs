/// General purpose registers of the target machine (`r0`..`r15`).
///
/// `r16` (`sp`) and `r17` (`ra`) exist too but belong to the calling convention.
pub const MAX_REGISTERS: usize = 16;

/// Default size of a register frame.
pub const DEFAULT_REGISTER_COUNT: usize = MAX_REGISTERS;

/// Textual prefix of a register operand.
pub const REGISTER_PREFIX: &str = "r";

/// Number of 8-bit characters that fit losslessly in the 53-bit mantissa of a target value.
pub const MAX_ASCII_CHARS: usize = 53 / 8;

/// Builtin numeric constants: source name and the operand the assembler understands.
pub const BUILTIN_CONSTANTS: [(&str, &str); 9] = [
    ("Pi", "pi"),
    ("Tau", "tau"),
    ("Epsilon", "epsilon"),
    ("NaN", "nan"),
    ("PInf", "pinf"),
    ("NInf", "ninf"),
    ("Deg2Rad", "deg2rad"),
    ("Rad2Deg", "rad2deg"),
    ("RGas", "rgas"),
];
