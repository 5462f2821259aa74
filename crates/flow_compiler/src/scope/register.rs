use std::fmt::{Display, Formatter};

use tracing::trace;

use crate::{
    constants::{MAX_REGISTERS, REGISTER_PREFIX},
    error::{FlowError, FlowResult},
    scope::ScopeId,
};

/// A physical register of the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(u8);

impl Register {
    #[must_use]
    pub const fn new(number: u8) -> Self {
        Self(number)
    }

    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{REGISTER_PREFIX}{}", self.0)
    }
}

/// Handle of a [`Variable`] inside the scope tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(pub(crate) usize);

impl VariableId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One claim of a physical register, with its live interval.
///
/// The three indices never move backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    pub register: Register,
    pub declare_index: usize,
    pub last_referenced_index: usize,
    pub last_reassigned_index: usize,
}

impl Variable {
    #[must_use]
    pub const fn new(register: Register, index: usize) -> Self {
        Self {
            register,
            declare_index: index,
            last_referenced_index: index,
            last_reassigned_index: index,
        }
    }

    /// Records a read at `index`.
    pub fn extend_reference(&mut self, index: usize) {
        self.last_referenced_index = self.last_referenced_index.max(index);
    }

    /// Records an overwrite at `index`; an overwrite is also a reference.
    pub fn extend_reassignment(&mut self, index: usize) {
        self.last_reassigned_index = self.last_reassigned_index.max(index);
        self.extend_reference(index);
    }
}

#[derive(Debug, Clone)]
struct Slot {
    register: Register,
    holder: VariableId,
    /// Scope of the named binding that holds the register, while that scope is open.
    held_by: Option<ScopeId>,
}

/// Bounded set of registers owned by one register frame.
#[derive(Debug, Clone)]
pub struct RegisterPool {
    capacity: usize,
    slots: Vec<Slot>,
}

impl RegisterPool {
    /// A pool of `capacity` registers, never more than the register file holds.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity: if capacity > MAX_REGISTERS {
                MAX_REGISTERS
            } else {
                capacity
            },
            slots: Vec::new(),
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Registers handed out at least once.
    #[must_use]
    pub fn used(&self) -> usize {
        self.slots.len()
    }

    /// Allocates a register for a value becoming live at `index`.
    ///
    /// A register whose holder was last read at or before `index` is reused first,
    /// lowest number wins; otherwise a never-used register is taken.
    pub(crate) fn claim(&mut self, index: usize, variables: &mut Vec<Variable>) -> FlowResult<VariableId> {
        let id = VariableId(variables.len());

        let reusable = self.slots.iter_mut().find(|slot| {
            slot.held_by.is_none() && variables[slot.holder.0].last_referenced_index <= index
        });

        let register = if let Some(slot) = reusable {
            trace!(register = %slot.register, index, "reusing register");
            slot.holder = id;
            slot.register
        } else if self.slots.len() < self.capacity {
            let register = Register(self.slots.len() as u8);
            self.slots.push(Slot {
                register,
                holder: id,
                held_by: None,
            });
            register
        } else {
            return Err(FlowError::RegisterExhausted {
                capacity: self.capacity,
            });
        };

        variables.push(Variable::new(register, index));
        Ok(id)
    }

    /// Keeps `variable`'s register out of reuse until `scope` is released.
    pub(crate) fn hold(&mut self, variable: VariableId, scope: ScopeId) {
        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.holder == variable) {
            slot.held_by = Some(scope);
        }
    }

    /// Returns every register held for `scope` to the reuse policy.
    pub(crate) fn release(&mut self, scope: ScopeId) -> usize {
        let mut released = 0;
        for slot in &mut self.slots {
            if slot.held_by == Some(scope) {
                slot.held_by = None;
                released += 1;
            }
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_display() {
        assert_eq!(Register::new(0).to_string(), "r0");
        assert_eq!(Register::new(15).to_string(), "r15");
    }

    #[test]
    fn test_variable_indices_only_grow() {
        let mut variable = Variable::new(Register::new(0), 5);
        variable.extend_reference(9);
        variable.extend_reference(7);
        assert_eq!(variable.last_referenced_index, 9);

        variable.extend_reassignment(8);
        assert_eq!(variable.last_reassigned_index, 8);
        assert_eq!(variable.last_referenced_index, 9);

        variable.extend_reassignment(12);
        assert_eq!(variable.last_reassigned_index, 12);
        assert_eq!(variable.last_referenced_index, 12);
        assert_eq!(variable.declare_index, 5);
    }

    #[test]
    fn test_claim_reuses_ended_interval() {
        let mut variables = Vec::new();
        let mut pool = RegisterPool::new(2);

        let a = pool.claim(1, &mut variables).unwrap();
        assert_eq!(variables[a.0], Variable::new(Register::new(0), 1));

        variables[a.0].extend_reference(3);
        let b = pool.claim(2, &mut variables).unwrap();
        assert_eq!(variables[b.0].register, Register::new(1));

        // `a` ends at 3, so a value born at 3 may take its register.
        let c = pool.claim(3, &mut variables).unwrap();
        assert_eq!(variables[c.0].register, Register::new(0));
        assert_eq!(pool.used(), 2);
    }

    #[test]
    fn test_claim_exhausts() {
        let mut variables = Vec::new();
        let mut pool = RegisterPool::new(1);

        let a = pool.claim(0, &mut variables).unwrap();
        variables[a.0].extend_reference(10);
        assert_eq!(
            pool.claim(1, &mut variables),
            Err(FlowError::RegisterExhausted { capacity: 1 })
        );
    }

    #[test]
    fn test_capacity_is_bounded_by_the_register_file() {
        let mut variables = Vec::new();
        let mut pool = RegisterPool::new(300);
        assert_eq!(pool.capacity(), MAX_REGISTERS);

        for index in 0..MAX_REGISTERS {
            let id = pool.claim(index, &mut variables).unwrap();
            variables[id.0].extend_reference(usize::MAX);
        }
        assert_eq!(
            variables.last().map(|variable| variable.register),
            Some(Register::new(15))
        );
        assert_eq!(
            pool.claim(MAX_REGISTERS, &mut variables),
            Err(FlowError::RegisterExhausted {
                capacity: MAX_REGISTERS
            })
        );
    }

    #[test]
    fn test_held_register_waits_for_release() {
        let mut variables = Vec::new();
        let mut pool = RegisterPool::new(1);
        let scope = ScopeId::new(3);

        let a = pool.claim(0, &mut variables).unwrap();
        pool.hold(a, scope);
        assert!(pool.claim(5, &mut variables).is_err());

        assert_eq!(pool.release(scope), 1);
        let b = pool.claim(5, &mut variables).unwrap();
        assert_eq!(variables[b.0].register, Register::new(0));
    }
}
