//! Arena-allocated syntax tree.

use rust_decimal::Decimal;
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use super::operator::{BinaryOperator, TernaryOperator, UnaryOperator};
use crate::{
    context::MethodReturnKind,
    scope::{ScopeId, ScopeTree},
};

/// Stable handle of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A statement sequence together with the lexical scope it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub scope: ScopeId,
    pub statements: Vec<NodeId>,
}

impl Block {
    #[must_use]
    pub const fn new(scope: ScopeId) -> Self {
        Self {
            scope,
            statements: Vec::new(),
        }
    }
}

/// How an array declaration provides its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayInitializer {
    /// `array a[size];`
    Size(NodeId),
    /// `array a = { e0, e1, ... };`
    List(Vec<NodeId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Numeric literal. Its value lives in [`Node::ct_known_value`].
    Literal,
    /// Use of a name: user variable, user constant, or builtin constant.
    ValueAccess {
        name: String,
    },
    Unary {
        operator: UnaryOperator,
        operand: NodeId,
    },
    Binary {
        left: NodeId,
        operator: BinaryOperator,
        right: NodeId,
    },
    Ternary {
        operator: TernaryOperator,
        first: NodeId,
        second: NodeId,
        third: NodeId,
    },
    MethodCall {
        name: String,
        arguments: Vec<NodeId>,
    },
    ArrayAccess {
        name: String,
        index: NodeId,
    },
    DeviceRead {
        pin: String,
        property: String,
    },
    VariableDeclaration {
        name: String,
        expression: NodeId,
    },
    ConstantDeclaration {
        name: String,
        expression: NodeId,
    },
    VariableAssignment {
        name: String,
        expression: NodeId,
    },
    ArrayDeclaration {
        name: String,
        initializer: ArrayInitializer,
    },
    ArrayAssignment {
        name: String,
        value: NodeId,
        index: NodeId,
    },
    DeviceWrite {
        pin: String,
        property: String,
        value: NodeId,
    },
    PinDeclaration {
        name: String,
        device: String,
    },
    MethodDeclaration {
        name: String,
        returns: MethodReturnKind,
        parameters: Vec<NodeId>,
        body: Block,
    },
    Parameter {
        name: String,
    },
    If {
        condition: NodeId,
        then_branch: Block,
        else_branch: Block,
    },
    /// The initializer, when present, is the first statement of `body`.
    For {
        has_initializer: bool,
        condition: NodeId,
        body: Block,
    },
    While {
        condition: NodeId,
        body: Block,
    },
    Return {
        value: Option<NodeId>,
    },
    Break,
    Continue,
}

impl NodeKind {
    /// Sub-expressions, in evaluation order.
    #[must_use]
    pub fn expressions(&self) -> Vec<NodeId> {
        match self {
            Self::Unary { operand, .. } => vec![*operand],
            Self::Binary { left, right, .. } => vec![*left, *right],
            Self::Ternary {
                first,
                second,
                third,
                ..
            } => vec![*first, *second, *third],
            Self::MethodCall { arguments, .. } => arguments.clone(),
            Self::ArrayAccess { index, .. } => vec![*index],
            Self::VariableDeclaration { expression, .. }
            | Self::ConstantDeclaration { expression, .. }
            | Self::VariableAssignment { expression, .. } => vec![*expression],
            Self::ArrayDeclaration { initializer, .. } => match initializer {
                ArrayInitializer::Size(size) => vec![*size],
                ArrayInitializer::List(elements) => elements.clone(),
            },
            Self::ArrayAssignment { value, index, .. } => vec![*value, *index],
            Self::DeviceWrite { value, .. } => vec![*value],
            Self::If { condition, .. }
            | Self::For { condition, .. }
            | Self::While { condition, .. } => vec![*condition],
            Self::Return { value } => value.iter().copied().collect(),
            Self::Literal
            | Self::ValueAccess { .. }
            | Self::DeviceRead { .. }
            | Self::PinDeclaration { .. }
            | Self::MethodDeclaration { .. }
            | Self::Parameter { .. }
            | Self::Break
            | Self::Continue => Vec::new(),
        }
    }

    /// Nested statement sequences, in program order.
    #[must_use]
    pub fn blocks(&self) -> Vec<&Block> {
        match self {
            Self::MethodDeclaration { body, .. }
            | Self::For { body, .. }
            | Self::While { body, .. } => vec![body],
            Self::If {
                then_branch,
                else_branch,
                ..
            } => vec![then_branch, else_branch],
            _ => Vec::new(),
        }
    }

    /// All nested statements, flattened in program order.
    #[must_use]
    pub fn statements(&self) -> Vec<NodeId> {
        self.blocks()
            .into_iter()
            .flat_map(|block| block.statements.iter().copied())
            .collect()
    }

    /// Whether the node yields a value an enclosing expression can consume.
    #[must_use]
    pub const fn produces_value(&self) -> bool {
        matches!(
            self,
            Self::Literal
                | Self::ValueAccess { .. }
                | Self::Unary { .. }
                | Self::Binary { .. }
                | Self::Ternary { .. }
                | Self::MethodCall { .. }
                | Self::ArrayAccess { .. }
                | Self::DeviceRead { .. }
                | Self::VariableAssignment { .. }
        )
    }

    /// Value of an operator node whose operands all have one, as reported by `operand`.
    #[must_use]
    pub fn evaluate(&self, operand: impl Fn(NodeId) -> Option<Decimal>) -> Option<Decimal> {
        match self {
            Self::Unary { operator, operand: value } => operator.evaluate(operand(*value)?),
            Self::Binary {
                left,
                operator,
                right,
            } => operator.evaluate(operand(*left)?, operand(*right)?),
            Self::Ternary {
                operator,
                first,
                second,
                third,
            } => operator.evaluate(operand(*first)?, operand(*second)?, operand(*third)?),
            _ => None,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::ValueAccess { .. } => "value access",
            Self::Unary { .. } => "unary operation",
            Self::Binary { .. } => "binary operation",
            Self::Ternary { .. } => "ternary operation",
            Self::MethodCall { .. } => "method call",
            Self::ArrayAccess { .. } => "array access",
            Self::DeviceRead { .. } => "device read",
            Self::VariableDeclaration { .. } => "variable declaration",
            Self::ConstantDeclaration { .. } => "constant declaration",
            Self::VariableAssignment { .. } => "variable assignment",
            Self::ArrayDeclaration { .. } => "array declaration",
            Self::ArrayAssignment { .. } => "array assignment",
            Self::DeviceWrite { .. } => "device write",
            Self::PinDeclaration { .. } => "pin declaration",
            Self::MethodDeclaration { .. } => "method declaration",
            Self::Parameter { .. } => "parameter",
            Self::If { .. } => "if",
            Self::For { .. } => "for",
            Self::While { .. } => "while",
            Self::Return { .. } => "return",
            Self::Break => "break",
            Self::Continue => "continue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Position on the liveness clock of the node's register frame.
    pub index_in_scope: usize,
    pub scope: ScopeId,
    /// Structural back-reference; not an ownership link.
    pub parent: Option<NodeId>,
    /// Liveness ticks spanned by the node.
    pub index_size: usize,
    /// Value known before resolution: literals, and operations folded upstream.
    pub ct_known_value: Option<Decimal>,
}

/// Top-level program node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub body: Block,
    /// Pin name -> device identifier, filled by pin declarations.
    pub device_pins: BTreeMap<String, String>,
}

/// Output of the parser: node arena, lexical scopes and the root.
#[derive(Debug)]
pub struct SyntaxTree {
    pub nodes: Vec<Node>,
    pub scopes: ScopeTree,
    pub root: Root,
}

impl SyntaxTree {
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len()).map(NodeId)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Earliest program point at which evaluation of `id`'s inputs begins.
    #[must_use]
    pub fn first_index_in_tree(&self, id: NodeId) -> usize {
        first_index_in_tree(&self.nodes, id)
    }

    /// Whether `id` is one of its parent's sub-expressions.
    #[must_use]
    pub fn is_in_expression_list(&self, id: NodeId) -> bool {
        is_in_expression_list(&self.nodes, id)
    }
}

pub(crate) fn first_index_in_tree(nodes: &[Node], id: NodeId) -> usize {
    let node = &nodes[id.0];
    node.kind
        .expressions()
        .into_iter()
        .map(|child| first_index_in_tree(nodes, child))
        .fold(node.index_in_scope, usize::min)
}

pub(crate) fn is_in_expression_list(nodes: &[Node], id: NodeId) -> bool {
    nodes[id.0]
        .parent
        .is_some_and(|parent| nodes[parent.0].kind.expressions().contains(&id))
}
