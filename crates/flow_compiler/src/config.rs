//! Settings of the semantic pass.

use crate::{
    constants::{DEFAULT_REGISTER_COUNT, MAX_REGISTERS},
    error::{FlowError, FlowResult},
};

/// Configuration shared by the tree builder, the scope tree and the passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowConfig {
    /// Registers available to each register frame (program body or method body).
    pub register_count: usize,
}

impl FlowConfig {
    /// Creates a configuration with `register_count` registers per frame.
    pub fn new(register_count: usize) -> FlowResult<Self> {
        Self::default().with_register_count(register_count)
    }

    /// Returns a copy with a different frame size.
    pub fn with_register_count(mut self, register_count: usize) -> FlowResult<Self> {
        if register_count == 0 || register_count > MAX_REGISTERS {
            return Err(FlowError::InvalidConfig(format!(
                "register count must be between 1 and {MAX_REGISTERS}, got {register_count}"
            )));
        }
        self.register_count = register_count;
        Ok(self)
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            register_count: DEFAULT_REGISTER_COUNT,
        }
    }
}
