//! Per-generation context and options.
//!
//! A [`GenContext`] is created fresh for every `generate` call and owns all
//! run-scoped state: emitted-flag bookkeeping, the closure-context stack,
//! and the scoped emission overrides used by closure layering. Registries
//! live on the generator setup and stay immutable during a run, so
//! independent generate calls can run on separate threads.

use std::collections::HashSet;

use crate::closure::ClosureContext;
use crate::graph::node::{InputRef, OutputRef};
use crate::options::GenOptions;

/// Scoped emission overrides, pushed around a nested closure emission.
///
/// Layering needs the top closure to read its base from the layer node's
/// base connection and write into the layer node's output variable. Rather
/// than rewiring the graph in place, the layer implementation pushes a
/// redirect frame for the duration of the nested call.
#[derive(Debug, Default)]
pub struct EmitOverrides {
    /// Input slot -> substitute upstream output.
    pub input_redirect: Vec<(InputRef, OutputRef)>,
    /// Output slot -> substitute variable name.
    pub output_rename: Vec<(OutputRef, String)>,
}

/// State for one generation run.
#[derive(Debug, Default)]
pub struct GenContext {
    options: GenOptions,
    emitted: HashSet<OutputRef>,
    closure_stack: Vec<ClosureContext>,
    override_stack: Vec<EmitOverrides>,
    warnings: Vec<String>,
}

impl GenContext {
    pub fn new(options: GenOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> &GenOptions {
        &self.options
    }

    // ── Emitted-flag bookkeeping ───────────────────────────────────────

    pub fn is_emitted(&self, output: OutputRef) -> bool {
        self.emitted.contains(&output)
    }

    pub fn mark_emitted(&mut self, output: OutputRef) {
        self.emitted.insert(output);
    }

    /// Forget all emitted flags. Used between stages.
    pub fn clear_emitted(&mut self) {
        self.emitted.clear();
    }

    /// A copy of the current emitted-flag set, for snapshot/restore
    /// around branch-scoped emission.
    pub fn emitted_snapshot(&self) -> HashSet<OutputRef> {
        self.emitted.clone()
    }

    /// Swap in a fresh emitted-flag set, returning the current one.
    ///
    /// Closure trees are re-emitted once per evaluation purpose and
    /// compound bodies emit into their own function scope; both wrap
    /// their emission in a swap/restore pair.
    pub fn swap_emitted(&mut self, set: HashSet<OutputRef>) -> HashSet<OutputRef> {
        std::mem::replace(&mut self.emitted, set)
    }

    // ── Closure contexts ───────────────────────────────────────────────

    pub fn push_closure_context(&mut self, cc: ClosureContext) {
        self.closure_stack.push(cc);
    }

    pub fn pop_closure_context(&mut self) -> Option<ClosureContext> {
        self.closure_stack.pop()
    }

    pub fn closure_context(&self) -> Option<&ClosureContext> {
        self.closure_stack.last()
    }

    pub fn closure_context_mut(&mut self) -> Option<&mut ClosureContext> {
        self.closure_stack.last_mut()
    }

    // ── Scoped emission overrides ──────────────────────────────────────

    pub fn push_overrides(&mut self, overrides: EmitOverrides) {
        self.override_stack.push(overrides);
    }

    pub fn pop_overrides(&mut self) {
        self.override_stack.pop();
    }

    /// The active redirect for an input slot, innermost frame first.
    pub fn redirect_for(&self, input: InputRef) -> Option<OutputRef> {
        self.override_stack
            .iter()
            .rev()
            .find_map(|f| f.input_redirect.iter().find(|(i, _)| *i == input).map(|(_, o)| *o))
    }

    /// The active rename for an output slot, innermost frame first.
    pub fn rename_for(&self, output: OutputRef) -> Option<&str> {
        self.override_stack.iter().rev().find_map(|f| {
            f.output_rename
                .iter()
                .find(|(o, _)| *o == output)
                .map(|(_, n)| n.as_str())
        })
    }

    // ── Warnings ───────────────────────────────────────────────────────

    pub fn add_warning(&mut self, msg: String) {
        self.warnings.push(msg);
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::NodeId;

    #[test]
    fn override_frames_shadow_outer_frames() {
        let mut ctx = GenContext::default();
        let input = InputRef { node: NodeId(1), port: 0 };
        let outer = OutputRef { node: NodeId(2), port: 0 };
        let inner = OutputRef { node: NodeId(3), port: 0 };

        ctx.push_overrides(EmitOverrides {
            input_redirect: vec![(input, outer)],
            ..Default::default()
        });
        ctx.push_overrides(EmitOverrides {
            input_redirect: vec![(input, inner)],
            ..Default::default()
        });
        assert_eq!(ctx.redirect_for(input), Some(inner));
        ctx.pop_overrides();
        assert_eq!(ctx.redirect_for(input), Some(outer));
        ctx.pop_overrides();
        assert_eq!(ctx.redirect_for(input), None);
    }

    #[test]
    fn emitted_flags_are_per_context() {
        let out = OutputRef { node: NodeId(0), port: 0 };
        let mut a = GenContext::default();
        a.mark_emitted(out);
        assert!(a.is_emitted(out));

        let b = GenContext::default();
        assert!(!b.is_emitted(out));
    }
}
