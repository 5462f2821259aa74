use super::{CompilationUnit, Pass};
use crate::{
    error::Diagnostic,
    visitor::{self, Folding},
};

/// Runs the variable visitor and stores its resolutions on the unit.
///
/// Folds through named constants unless configured otherwise.
#[derive(Debug)]
pub struct VariableResolutionPass {
    folding: Folding,
}

impl VariableResolutionPass {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            folding: Folding::ThroughConstants,
        }
    }

    #[must_use]
    pub const fn with_folding(mut self, folding: Folding) -> Self {
        self.folding = folding;
        self
    }
}

impl Default for VariableResolutionPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for VariableResolutionPass {
    fn run(&mut self, unit: &mut CompilationUnit) -> Result<(), Diagnostic> {
        let resolutions = visitor::resolve_with(&mut unit.tree, &mut unit.context, self.folding)?;
        unit.resolutions = Some(resolutions);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "variable_resolution"
    }

    /// Resolution claims registers, so a unit is only ever resolved once.
    fn should_run(&self, unit: &CompilationUnit) -> bool {
        unit.resolutions.is_none()
    }
}
