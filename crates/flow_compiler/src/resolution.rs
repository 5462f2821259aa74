//! What every expression node resolved to.

use rust_decimal::Decimal;

use crate::{
    constants::BUILTIN_CONSTANTS,
    context::UserVariableId,
    error::{FlowError, FlowResult},
    lang::{Node, NodeId},
    scope::{ScopeTree, VariableId},
};

/// Assembler operand of a builtin constant, if `name` is one.
#[must_use]
pub fn builtin_constant(name: &str) -> Option<&'static str> {
    BUILTIN_CONSTANTS
        .iter()
        .find(|(source, _)| *source == name)
        .map(|(_, operand)| *operand)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Register holding the node's value at run time.
    pub variable: Option<VariableId>,
    pub ct_known_value: Option<Decimal>,
    /// Set for builtin constant references; wins over everything else when rendering.
    pub builtin_constant: Option<&'static str>,
    /// Named array binding a declaration, load or store refers to.
    pub array_address: Option<UserVariableId>,
}

/// Side table indexed by [`NodeId`], filled during traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolutions {
    entries: Vec<Resolution>,
}

impl Resolutions {
    /// Seeds every entry with the value its node already carries.
    #[must_use]
    pub fn from_nodes(nodes: &[Node]) -> Self {
        Self {
            entries: nodes
                .iter()
                .map(|node| Resolution {
                    ct_known_value: node.ct_known_value,
                    ..Resolution::default()
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> &Resolution {
        &self.entries[id.index()]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Resolution {
        &mut self.entries[id.index()]
    }

    #[must_use]
    pub fn variable(&self, id: NodeId) -> Option<VariableId> {
        self.get(id).variable
    }

    #[must_use]
    pub fn ct_known_value(&self, id: NodeId) -> Option<Decimal> {
        self.get(id).ct_known_value
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Operand text of `id` for code generation.
    pub fn render(&self, id: NodeId, scopes: &ScopeTree) -> FlowResult<String> {
        let resolution = self.get(id);
        if let Some(builtin) = resolution.builtin_constant {
            return Ok(builtin.to_string());
        }
        if let Some(value) = resolution.ct_known_value {
            return Ok(value.normalize().to_string());
        }
        resolution
            .variable
            .map(|variable| scopes.variable(variable).register.to_string())
            .ok_or(FlowError::UnboundExpression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlowConfig;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(builtin_constant("Pi"), Some("pi"));
        assert_eq!(builtin_constant("RGas"), Some("rgas"));
        assert_eq!(builtin_constant("pi"), None);
    }

    #[test]
    fn test_render_precedence() {
        let mut scopes = ScopeTree::new(&FlowConfig::default());
        let variable = scopes.claim_new_variable(ScopeTree::ROOT, 0).unwrap();

        let mut resolutions = Resolutions {
            entries: vec![Resolution::default(); 3],
        };
        let id = NodeId::new(0);

        assert_eq!(resolutions.render(id, &scopes), Err(FlowError::UnboundExpression));

        resolutions.get_mut(id).variable = Some(variable);
        assert_eq!(resolutions.render(id, &scopes).unwrap(), "r0");

        resolutions.get_mut(id).ct_known_value = Some(Decimal::new(250, 2));
        assert_eq!(resolutions.render(id, &scopes).unwrap(), "2.5");

        resolutions.get_mut(id).builtin_constant = Some("pi");
        assert_eq!(resolutions.render(id, &scopes).unwrap(), "pi");
    }
}
