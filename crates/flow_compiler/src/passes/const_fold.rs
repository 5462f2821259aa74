//! Literal folding.

use tracing::debug;

use super::{CompilationUnit, Pass};
use crate::{error::Diagnostic, lang::NodeId};

/// Annotates operator nodes whose operands are all known with their value.
///
/// Operands are created before the operations consuming them, so a single sweep
/// in arena order folds nested operations too.
#[derive(Debug, Default)]
pub struct ConstantFoldPass;

impl ConstantFoldPass {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Pass for ConstantFoldPass {
    fn run(&mut self, unit: &mut CompilationUnit) -> Result<(), Diagnostic> {
        let nodes = &mut unit.tree.nodes;
        let mut folded = 0;
        for index in 0..nodes.len() {
            if nodes[index].ct_known_value.is_some() {
                continue;
            }
            let known = |id: NodeId| nodes[id.index()].ct_known_value;
            let value = nodes[index].kind.evaluate(known);
            if let Some(value) = value {
                nodes[index].ct_known_value = Some(value);
                folded += 1;
            }
        }
        debug!(folded, "folded constant operations");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "const_fold"
    }

    fn should_run(&self, unit: &CompilationUnit) -> bool {
        unit.resolutions.is_none()
    }
}
