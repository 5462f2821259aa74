use crate::passes::{CompilationUnit, PassPipeline, PassResult};

pub mod config;
pub mod constants;
pub mod context;
pub mod encoding;
pub mod error;
pub mod lang;
pub mod logs;
pub mod passes;
pub mod resolution;
pub mod scope;
pub mod visitor;

pub use config::FlowConfig;
pub use context::{FlowContext, MethodReturnKind};
pub use error::{Diagnostic, EncodingError, FlowError, FlowResult};
pub use lang::{NodeId, SyntaxTree, TreeBuilder};
pub use resolution::Resolutions;

/// Folds literal operations, then resolves names and registers.
///
/// The returned unit carries the resolutions, the finalized register intervals
/// and the registry of named bindings.
pub fn analyze(tree: SyntaxTree) -> PassResult<CompilationUnit> {
    let mut unit = CompilationUnit::new(tree);
    PassPipeline::default_pipeline().run(&mut unit)?;
    Ok(unit)
}
