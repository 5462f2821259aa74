pub mod builder;
pub mod node;
pub mod operator;

pub use builder::TreeBuilder;
pub use node::{ArrayInitializer, Block, Node, NodeId, NodeKind, Root, SyntaxTree};
pub use operator::{BinaryOperator, TernaryOperator, UnaryOperator};
