//! Registry shared by the passes of one compilation.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::{
    lang::{NodeKind, SyntaxTree},
    scope::{ScopeId, VariableId},
};

/// What a method call leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MethodReturnKind {
    Value,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserVariableId(usize);

impl UserVariableId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserConstantId(usize);

impl UserConstantId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A named variable (or array address) bound to a register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDefinedVariable {
    pub name: String,
    pub variable: VariableId,
    pub scope: ScopeId,
    pub declare_index: usize,
    pub last_referenced_index: usize,
    pub last_reassigned_index: usize,
    /// The initializer had a compile-time known value.
    pub ct_initialized: bool,
    pub is_array: bool,
}

impl UserDefinedVariable {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        variable: VariableId,
        scope: ScopeId,
        declare_index: usize,
        ct_initialized: bool,
    ) -> Self {
        Self {
            name: name.into(),
            variable,
            scope,
            declare_index,
            last_referenced_index: declare_index,
            last_reassigned_index: declare_index,
            ct_initialized,
            is_array: false,
        }
    }

    pub fn extend_reference(&mut self, index: usize) {
        self.last_referenced_index = self.last_referenced_index.max(index);
    }

    pub fn extend_reassignment(&mut self, index: usize) {
        self.last_reassigned_index = self.last_reassigned_index.max(index);
        self.extend_reference(index);
    }
}

/// A named compile-time value. Never occupies a register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDefinedConstant {
    pub name: String,
    pub ct_known_value: Decimal,
    pub scope: ScopeId,
    pub declare_index: usize,
    pub last_referenced_index: usize,
}

impl UserDefinedConstant {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        ct_known_value: Decimal,
        scope: ScopeId,
        declare_index: usize,
    ) -> Self {
        Self {
            name: name.into(),
            ct_known_value,
            scope,
            declare_index,
            last_referenced_index: declare_index,
        }
    }

    pub fn extend_reference(&mut self, index: usize) {
        self.last_referenced_index = self.last_referenced_index.max(index);
    }
}

/// Method signatures known before traversal, plus every named binding declared during it.
#[derive(Debug, Clone, Default)]
pub struct FlowContext {
    pub declared_methods: BTreeMap<String, MethodReturnKind>,
    user_variables: Vec<UserDefinedVariable>,
    user_constants: Vec<UserDefinedConstant>,
}

impl FlowContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the signature of every method declared at the top level of `tree`.
    #[must_use]
    pub fn from_tree(tree: &SyntaxTree) -> Self {
        let declared_methods = tree
            .root
            .body
            .statements
            .iter()
            .filter_map(|&id| match &tree.node(id).kind {
                NodeKind::MethodDeclaration { name, returns, .. } => Some((name.clone(), *returns)),
                _ => None,
            })
            .collect();
        Self {
            declared_methods,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_method(mut self, name: impl Into<String>, returns: MethodReturnKind) -> Self {
        self.declared_methods.insert(name.into(), returns);
        self
    }

    #[must_use]
    pub fn method_return_kind(&self, name: &str) -> Option<MethodReturnKind> {
        self.declared_methods.get(name).copied()
    }

    pub fn push_user_variable(&mut self, variable: UserDefinedVariable) -> UserVariableId {
        self.user_variables.push(variable);
        UserVariableId(self.user_variables.len() - 1)
    }

    pub fn push_user_constant(&mut self, constant: UserDefinedConstant) -> UserConstantId {
        self.user_constants.push(constant);
        UserConstantId(self.user_constants.len() - 1)
    }

    #[must_use]
    pub fn user_variable(&self, id: UserVariableId) -> &UserDefinedVariable {
        &self.user_variables[id.0]
    }

    pub fn user_variable_mut(&mut self, id: UserVariableId) -> &mut UserDefinedVariable {
        &mut self.user_variables[id.0]
    }

    #[must_use]
    pub fn user_constant(&self, id: UserConstantId) -> &UserDefinedConstant {
        &self.user_constants[id.0]
    }

    pub fn user_constant_mut(&mut self, id: UserConstantId) -> &mut UserDefinedConstant {
        &mut self.user_constants[id.0]
    }

    /// Every named variable declared so far, in declaration order.
    #[must_use]
    pub fn user_variables(&self) -> &[UserDefinedVariable] {
        &self.user_variables
    }

    /// Every named constant declared so far, in declaration order.
    #[must_use]
    pub fn user_constants(&self) -> &[UserDefinedConstant] {
        &self.user_constants
    }

    /// Finds a declared variable by name; the most recent declaration wins.
    #[must_use]
    pub fn find_user_variable(&self, name: &str) -> Option<&UserDefinedVariable> {
        self.user_variables.iter().rev().find(|v| v.name == name)
    }

    /// Finds a declared constant by name; the most recent declaration wins.
    #[must_use]
    pub fn find_user_constant(&self, name: &str) -> Option<&UserDefinedConstant> {
        self.user_constants.iter().rev().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::FlowConfig, lang::TreeBuilder, scope::ScopeTree};

    #[test]
    fn test_from_tree_collects_method_signatures() {
        let mut builder = TreeBuilder::new(FlowConfig::default());
        builder.method("tick", MethodReturnKind::Void, &[], |_| {});
        builder.method("read", MethodReturnKind::Value, &["a"], |b| {
            let a = b.access("a");
            b.return_value(Some(a));
        });
        let tree = builder.finish();

        let context = FlowContext::from_tree(&tree);
        assert_eq!(context.method_return_kind("tick"), Some(MethodReturnKind::Void));
        assert_eq!(context.method_return_kind("read"), Some(MethodReturnKind::Value));
        assert_eq!(context.method_return_kind("missing"), None);
    }

    #[test]
    fn test_user_variable_liveness_only_grows() {
        let mut variable =
            UserDefinedVariable::new("x", VariableId(0), ScopeTree::ROOT, 3, false);
        variable.extend_reassignment(6);
        variable.extend_reference(4);

        assert_eq!(variable.declare_index, 3);
        assert_eq!(variable.last_reassigned_index, 6);
        assert_eq!(variable.last_referenced_index, 6);
    }

    #[test]
    fn test_registry_keeps_declaration_order() {
        let mut context = FlowContext::new();
        let first = context.push_user_constant(UserDefinedConstant::new(
            "a",
            Decimal::ONE,
            ScopeTree::ROOT,
            0,
        ));
        let second = context.push_user_constant(UserDefinedConstant::new(
            "a",
            Decimal::TWO,
            ScopeTree::ROOT,
            5,
        ));

        assert_eq!(context.user_constants().len(), 2);
        assert_eq!(context.user_constant(first).ct_known_value, Decimal::ONE);
        assert_eq!(context.find_user_constant("a").unwrap().declare_index, 5);
        assert_ne!(first, second);
    }
}
