//! Lexical scopes, name resolution and register frames.

pub mod register;

use std::collections::BTreeMap;

use tracing::debug;

pub use register::{Register, RegisterPool, Variable, VariableId};

use crate::{
    config::FlowConfig,
    context::{UserConstantId, UserVariableId},
    error::{FlowError, FlowResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Program body. Owns a register frame.
    Program,
    /// Method body. Owns a register frame with its own liveness clock.
    Method,
    /// If, else, for and while bodies. Allocate from the enclosing frame.
    Block,
}

impl ScopeKind {
    #[must_use]
    pub const fn owns_registers(self) -> bool {
        matches!(self, Self::Program | Self::Method)
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    user_variables: BTreeMap<String, UserVariableId>,
    user_constants: BTreeMap<String, UserConstantId>,
    pool: Option<RegisterPool>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>, register_count: usize) -> Self {
        Self {
            kind,
            parent,
            user_variables: BTreeMap::new(),
            user_constants: BTreeMap::new(),
            pool: kind
                .owns_registers()
                .then(|| RegisterPool::new(register_count)),
        }
    }

    /// Whether `name` is declared in this exact scope, as a variable or a constant.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.user_variables.contains_key(name) || self.user_constants.contains_key(name)
    }

    #[must_use]
    pub const fn pool(&self) -> Option<&RegisterPool> {
        self.pool.as_ref()
    }
}

/// Every lexical scope of a program, plus the arena of claimed registers.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    variables: Vec<Variable>,
    register_count: usize,
}

impl ScopeTree {
    /// The program scope, created with the tree.
    pub const ROOT: ScopeId = ScopeId(0);

    #[must_use]
    pub fn new(config: &FlowConfig) -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Program, None, config.register_count)],
            variables: Vec::new(),
            register_count: config.register_count,
        }
    }

    pub fn add_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes
            .push(Scope::new(kind, Some(parent), self.register_count));
        id
    }

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Nearest scope, starting at `id`, that owns a register pool.
    #[must_use]
    pub fn frame_of(&self, id: ScopeId) -> ScopeId {
        self.chain(id)
            .find(|&scope| self.scopes[scope.0].kind.owns_registers())
            .unwrap_or(Self::ROOT)
    }

    /// `id` and its ancestors, innermost first.
    pub fn chain(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), |scope| self.scopes[scope.0].parent)
    }

    pub fn add_user_variable(
        &mut self,
        scope: ScopeId,
        name: &str,
        id: UserVariableId,
    ) -> FlowResult<()> {
        let target = &mut self.scopes[scope.0];
        if target.declares(name) {
            return Err(FlowError::DuplicateDeclaration {
                name: name.to_string(),
            });
        }
        target.user_variables.insert(name.to_string(), id);
        Ok(())
    }

    pub fn add_user_constant(
        &mut self,
        scope: ScopeId,
        name: &str,
        id: UserConstantId,
    ) -> FlowResult<()> {
        let target = &mut self.scopes[scope.0];
        if target.declares(name) {
            return Err(FlowError::DuplicateDeclaration {
                name: name.to_string(),
            });
        }
        target.user_constants.insert(name.to_string(), id);
        Ok(())
    }

    #[must_use]
    pub fn try_get_user_variable(&self, scope: ScopeId, name: &str) -> Option<UserVariableId> {
        self.chain(scope)
            .find_map(|id| self.scopes[id.0].user_variables.get(name).copied())
    }

    #[must_use]
    pub fn try_get_user_constant(&self, scope: ScopeId, name: &str) -> Option<UserConstantId> {
        self.chain(scope)
            .find_map(|id| self.scopes[id.0].user_constants.get(name).copied())
    }

    /// Claims a register of `scope`'s frame for a value live from `index`.
    pub fn claim_new_variable(&mut self, scope: ScopeId, index: usize) -> FlowResult<VariableId> {
        let frame = self.frame_of(scope);
        let pool = self.scopes[frame.0]
            .pool
            .as_mut()
            .expect("frames own a register pool");
        let id = pool.claim(index, &mut self.variables)?;
        debug!(
            register = %self.variables[id.0].register,
            index,
            frame = frame.0,
            "claimed register"
        );
        Ok(id)
    }

    /// Keeps the register of a named binding declared in `scope` until `scope` is released.
    pub fn hold(&mut self, scope: ScopeId, variable: VariableId) {
        let frame = self.frame_of(scope);
        if let Some(pool) = self.scopes[frame.0].pool.as_mut() {
            pool.hold(variable, scope);
        }
    }

    /// Called when traversal leaves `scope`: its bindings' intervals are final.
    pub fn release(&mut self, scope: ScopeId) {
        let frame = self.frame_of(scope);
        if let Some(pool) = self.scopes[frame.0].pool.as_mut() {
            let released = pool.release(scope);
            if released > 0 {
                debug!(scope = scope.0, released, "released scope registers");
            }
        }
    }

    #[must_use]
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn variable_mut(&mut self, id: VariableId) -> &mut Variable {
        &mut self.variables[id.0]
    }

    /// Every register claim made so far, in claim order.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }
}
