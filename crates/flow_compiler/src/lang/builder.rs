//! Programmatic construction of syntax trees.
//!
//! The builder hands out indices the way the parser does: operands before the
//! operation that consumes them, a statement after its operands, and control
//! flow nodes before their condition and bodies. Each method body runs on its
//! own clock.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{
    node::{ArrayInitializer, Block, Node, NodeId, NodeKind, Root, SyntaxTree},
    operator::{BinaryOperator, TernaryOperator, UnaryOperator},
};
use crate::{
    config::FlowConfig,
    context::MethodReturnKind,
    encoding,
    error::FlowResult,
    scope::{ScopeId, ScopeKind, ScopeTree},
};

/// Liveness ticks of a ternary operation: its three operands stay live while the result is written.
const TERNARY_INDEX_SIZE: usize = 2;

#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    scopes: ScopeTree,
    /// One clock per open register frame.
    clocks: Vec<usize>,
    /// Open statement sequences, innermost last.
    blocks: Vec<Block>,
}

impl TreeBuilder {
    #[must_use]
    pub fn new(config: FlowConfig) -> Self {
        Self {
            nodes: Vec::new(),
            scopes: ScopeTree::new(&config),
            clocks: vec![0],
            blocks: vec![Block::new(ScopeTree::ROOT)],
        }
    }

    #[must_use]
    pub fn finish(self) -> SyntaxTree {
        let body = self
            .blocks
            .into_iter()
            .next()
            .unwrap_or_else(|| Block::new(ScopeTree::ROOT));
        SyntaxTree {
            nodes: self.nodes,
            scopes: self.scopes,
            root: Root {
                body,
                device_pins: BTreeMap::new(),
            },
        }
    }

    fn current_scope(&self) -> ScopeId {
        self.blocks
            .last()
            .map_or(ScopeTree::ROOT, |block| block.scope)
    }

    fn tick(&mut self, size: usize) -> usize {
        let Some(clock) = self.clocks.last_mut() else {
            return 0;
        };
        let index = *clock;
        *clock += size;
        index
    }

    fn push(
        &mut self,
        kind: NodeKind,
        index_in_scope: usize,
        scope: ScopeId,
        index_size: usize,
        ct_known_value: Option<Decimal>,
    ) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        for child in kind.expressions().into_iter().chain(kind.statements()) {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            index_in_scope,
            scope,
            parent: None,
            index_size,
            ct_known_value,
        });
        id
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        let index = self.tick(1);
        let scope = self.current_scope();
        self.push(kind, index, scope, 1, None)
    }

    fn append(&mut self, id: NodeId) -> NodeId {
        if let Some(block) = self.blocks.last_mut() {
            block.statements.push(id);
        }
        id
    }

    fn open_block(&mut self, kind: ScopeKind) -> ScopeId {
        let scope = self.scopes.add_scope(self.current_scope(), kind);
        self.blocks.push(Block::new(scope));
        scope
    }

    fn close_block(&mut self) -> Block {
        self.blocks
            .pop()
            .unwrap_or_else(|| Block::new(ScopeTree::ROOT))
    }

    pub fn literal(&mut self, value: impl Into<Decimal>) -> NodeId {
        let index = self.tick(1);
        let scope = self.current_scope();
        self.push(NodeKind::Literal, index, scope, 1, Some(value.into()))
    }

    /// `0x...` literal.
    pub fn hex_literal(&mut self, text: &str) -> FlowResult<NodeId> {
        let value = encoding::parse_hex(text)?;
        Ok(self.literal(value))
    }

    /// `0b...` literal.
    pub fn binary_literal(&mut self, text: &str) -> FlowResult<NodeId> {
        let value = encoding::parse_binary(text)?;
        Ok(self.literal(value))
    }

    /// `HASH("...")`.
    pub fn hash_literal(&mut self, text: &str) -> NodeId {
        self.literal(encoding::hash(text))
    }

    /// `STR("...")`, up to six packed characters.
    pub fn ascii_literal(&mut self, text: &str) -> FlowResult<NodeId> {
        let value = encoding::to_ascii(text)?;
        Ok(self.literal(value))
    }

    pub fn access(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::ValueAccess {
            name: name.to_string(),
        })
    }

    pub fn unary(&mut self, operator: UnaryOperator, operand: NodeId) -> NodeId {
        self.add(NodeKind::Unary { operator, operand })
    }

    pub fn binary(&mut self, left: NodeId, operator: BinaryOperator, right: NodeId) -> NodeId {
        self.add(NodeKind::Binary {
            left,
            operator,
            right,
        })
    }

    pub fn ternary(
        &mut self,
        operator: TernaryOperator,
        first: NodeId,
        second: NodeId,
        third: NodeId,
    ) -> NodeId {
        let index = self.tick(TERNARY_INDEX_SIZE);
        let scope = self.current_scope();
        let kind = NodeKind::Ternary {
            operator,
            first,
            second,
            third,
        };
        self.push(kind, index, scope, TERNARY_INDEX_SIZE, None)
    }

    /// A call whose result is consumed by an enclosing expression.
    pub fn call(&mut self, name: &str, arguments: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::MethodCall {
            name: name.to_string(),
            arguments,
        })
    }

    /// A call standing alone as a statement.
    pub fn call_statement(&mut self, name: &str, arguments: Vec<NodeId>) -> NodeId {
        let id = self.call(name, arguments);
        self.append(id)
    }

    pub fn array_access(&mut self, name: &str, index: NodeId) -> NodeId {
        self.add(NodeKind::ArrayAccess {
            name: name.to_string(),
            index,
        })
    }

    pub fn device_read(&mut self, pin: &str, property: &str) -> NodeId {
        self.add(NodeKind::DeviceRead {
            pin: pin.to_string(),
            property: property.to_string(),
        })
    }

    pub fn declare_variable(&mut self, name: &str, expression: NodeId) -> NodeId {
        let id = self.add(NodeKind::VariableDeclaration {
            name: name.to_string(),
            expression,
        });
        self.append(id)
    }

    pub fn declare_constant(&mut self, name: &str, expression: NodeId) -> NodeId {
        let id = self.add(NodeKind::ConstantDeclaration {
            name: name.to_string(),
            expression,
        });
        self.append(id)
    }

    pub fn assign(&mut self, name: &str, expression: NodeId) -> NodeId {
        let id = self.add(NodeKind::VariableAssignment {
            name: name.to_string(),
            expression,
        });
        self.append(id)
    }

    pub fn declare_array_sized(&mut self, name: &str, size: NodeId) -> NodeId {
        let id = self.add(NodeKind::ArrayDeclaration {
            name: name.to_string(),
            initializer: ArrayInitializer::Size(size),
        });
        self.append(id)
    }

    pub fn declare_array_list(&mut self, name: &str, elements: Vec<NodeId>) -> NodeId {
        let id = self.add(NodeKind::ArrayDeclaration {
            name: name.to_string(),
            initializer: ArrayInitializer::List(elements),
        });
        self.append(id)
    }

    pub fn assign_array(&mut self, name: &str, index: NodeId, value: NodeId) -> NodeId {
        let id = self.add(NodeKind::ArrayAssignment {
            name: name.to_string(),
            value,
            index,
        });
        self.append(id)
    }

    pub fn device_write(&mut self, pin: &str, property: &str, value: NodeId) -> NodeId {
        let id = self.add(NodeKind::DeviceWrite {
            pin: pin.to_string(),
            property: property.to_string(),
            value,
        });
        self.append(id)
    }

    pub fn declare_pin(&mut self, name: &str, device: &str) -> NodeId {
        let id = self.add(NodeKind::PinDeclaration {
            name: name.to_string(),
            device: device.to_string(),
        });
        self.append(id)
    }

    pub fn method(
        &mut self,
        name: &str,
        returns: MethodReturnKind,
        parameters: &[&str],
        body: impl FnOnce(&mut Self),
    ) -> NodeId {
        let index = self.tick(1);
        let scope = self.current_scope();

        self.open_block(ScopeKind::Method);
        self.clocks.push(0);
        let parameters: Vec<NodeId> = parameters
            .iter()
            .map(|parameter| {
                self.add(NodeKind::Parameter {
                    name: (*parameter).to_string(),
                })
            })
            .collect();
        body(self);
        self.clocks.pop();
        let body = self.close_block();

        let kind = NodeKind::MethodDeclaration {
            name: name.to_string(),
            returns,
            parameters: parameters.clone(),
            body,
        };
        let id = self.push(kind, index, scope, 1, None);
        for parameter in parameters {
            self.nodes[parameter.index()].parent = Some(id);
        }
        self.append(id)
    }

    pub fn if_else(
        &mut self,
        condition: impl FnOnce(&mut Self) -> NodeId,
        then_branch: impl FnOnce(&mut Self),
        else_branch: impl FnOnce(&mut Self),
    ) -> NodeId {
        let index = self.tick(1);
        let scope = self.current_scope();
        let condition = condition(self);

        self.open_block(ScopeKind::Block);
        then_branch(self);
        let then_branch = self.close_block();

        self.open_block(ScopeKind::Block);
        else_branch(self);
        let else_branch = self.close_block();

        let kind = NodeKind::If {
            condition,
            then_branch,
            else_branch,
        };
        let id = self.push(kind, index, scope, 1, None);
        self.append(id)
    }

    pub fn if_then(
        &mut self,
        condition: impl FnOnce(&mut Self) -> NodeId,
        then_branch: impl FnOnce(&mut Self),
    ) -> NodeId {
        self.if_else(condition, then_branch, |_| {})
    }

    /// `for (initializer; condition; update) { body }`.
    ///
    /// The initializer closure appends at most one statement; the update runs after the body.
    pub fn for_loop(
        &mut self,
        initializer: impl FnOnce(&mut Self),
        condition: impl FnOnce(&mut Self) -> NodeId,
        update: impl FnOnce(&mut Self),
        body: impl FnOnce(&mut Self),
    ) -> NodeId {
        let index = self.tick(1);
        let scope = self.current_scope();

        self.open_block(ScopeKind::Block);
        initializer(self);
        let has_initializer = self
            .blocks
            .last()
            .is_some_and(|block| !block.statements.is_empty());
        let condition = condition(self);
        body(self);
        update(self);
        let body = self.close_block();

        let kind = NodeKind::For {
            has_initializer,
            condition,
            body,
        };
        let id = self.push(kind, index, scope, 1, None);
        self.append(id)
    }

    pub fn while_loop(
        &mut self,
        condition: impl FnOnce(&mut Self) -> NodeId,
        body: impl FnOnce(&mut Self),
    ) -> NodeId {
        let index = self.tick(1);
        let scope = self.current_scope();
        let condition = condition(self);

        self.open_block(ScopeKind::Block);
        body(self);
        let body = self.close_block();

        let id = self.push(NodeKind::While { condition, body }, index, scope, 1, None);
        self.append(id)
    }

    pub fn return_value(&mut self, value: Option<NodeId>) -> NodeId {
        let id = self.add(NodeKind::Return { value });
        self.append(id)
    }

    pub fn break_loop(&mut self) -> NodeId {
        let id = self.add(NodeKind::Break);
        self.append(id)
    }

    pub fn continue_loop(&mut self) -> NodeId {
        let id = self.add(NodeKind::Continue);
        self.append(id)
    }
}
