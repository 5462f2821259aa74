//! Semantic passes over a parsed program.

use thiserror::Error;
use tracing::{debug, info_span};

use crate::{
    context::FlowContext,
    error::Diagnostic,
    lang::SyntaxTree,
    resolution::Resolutions,
};

pub mod const_fold;
pub mod resolve;

pub use const_fold::ConstantFoldPass;
pub use resolve::VariableResolutionPass;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassError {
    #[error("Pass '{pass}' failed: {diagnostic}")]
    Failed {
        pass: &'static str,
        #[source]
        diagnostic: Diagnostic,
    },
}

pub type PassResult<T = ()> = Result<T, PassError>;

/// Everything the passes of one compilation read and write.
#[derive(Debug)]
pub struct CompilationUnit {
    pub tree: SyntaxTree,
    pub context: FlowContext,
    /// Filled by [`VariableResolutionPass`].
    pub resolutions: Option<Resolutions>,
}

impl CompilationUnit {
    /// Wraps `tree` with a context knowing the methods it declares.
    #[must_use]
    pub fn new(tree: SyntaxTree) -> Self {
        let context = FlowContext::from_tree(&tree);
        Self::with_context(tree, context)
    }

    #[must_use]
    pub const fn with_context(tree: SyntaxTree, context: FlowContext) -> Self {
        Self {
            tree,
            context,
            resolutions: None,
        }
    }
}

pub trait Pass {
    fn run(&mut self, unit: &mut CompilationUnit) -> Result<(), Diagnostic>;

    fn name(&self) -> &'static str;

    /// Allows a pass to skip units it has nothing to do for.
    fn should_run(&self, _unit: &CompilationUnit) -> bool {
        true
    }
}

/// Ordered passes, run until the first failure.
#[allow(missing_debug_implementations)]
pub struct PassPipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl PassPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Literal folding, then variable resolution.
    #[must_use]
    pub fn default_pipeline() -> Self {
        Self::new()
            .add_pass(ConstantFoldPass::new())
            .add_pass(VariableResolutionPass::new())
    }

    #[must_use]
    pub fn add_pass<P: Pass + 'static>(mut self, pass: P) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn run(&mut self, unit: &mut CompilationUnit) -> PassResult {
        for pass in &mut self.passes {
            let name = pass.name();
            if !pass.should_run(unit) {
                debug!(pass = name, "skipping pass");
                continue;
            }

            let _span = info_span!("pass", name).entered();
            pass.run(unit).map_err(|diagnostic| PassError::Failed {
                pass: name,
                diagnostic,
            })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }
}

impl Default for PassPipeline {
    fn default() -> Self {
        Self::default_pipeline()
    }
}

#[allow(missing_debug_implementations)]
pub struct PassPipelineBuilder {
    pipeline: PassPipeline,
}

impl PassPipelineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipeline: PassPipeline::new(),
        }
    }

    #[must_use]
    pub fn add_pass<P: Pass + 'static>(mut self, pass: P) -> Self {
        self.pipeline = self.pipeline.add_pass(pass);
        self
    }

    #[must_use]
    pub fn build(self) -> PassPipeline {
        self.pipeline
    }
}

impl Default for PassPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
