//! Conditional node implementations: compare (if/else) and switch.
//!
//! A conditional owns its branch blocks: it opens each branch scope,
//! emits the nodes scoped to that branch (exactly the ones the scope
//! analysis restricted to it), assigns its output from the branch input,
//! and closes the scope. Branch-scoped emission is snapshot-isolated so a
//! node needed by several branches of the same conditional is emitted in
//! each of them.

use crate::context::GenContext;
use crate::error::Result;
use crate::generator::{
    emit_node_call_in_scope, emit_output_declarations, named_input_expr, output_var,
    ShaderGenerator,
};
use crate::graph::node::{NodeId, OutputRef};
use crate::graph::ShaderGraph;
use crate::registry::NodeImpl;
use crate::shader::{Brackets, ShaderStage};

/// `compare`: selects `in1` when `intest <= cutoff`, else `in2`.
pub struct CompareImpl;

impl NodeImpl for CompareImpl {
    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        emit_output_declarations(gen, graph, node, ctx, stage);
        let intest = named_input_expr(gen, graph, node, "intest", ctx)?;
        let cutoff = named_input_expr(gen, graph, node, "cutoff", ctx)?;
        let out = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);

        for branch in 0..2u32 {
            if branch == 0 {
                stage.line(&format!("if ({intest} <= {cutoff})"));
            } else {
                stage.line("else");
            }
            stage.begin_scope(Brackets::Braces);

            let snapshot = ctx.emitted_snapshot();
            for dep in graph.nodes_scoped_to(node, branch) {
                emit_node_call_in_scope(gen, graph, dep, ctx, stage)?;
            }
            let value = named_input_expr(gen, graph, node, &format!("in{}", branch + 1), ctx)?;
            stage.statement(&format!("{out} = {value}"));
            ctx.swap_emitted(snapshot);

            stage.end_scope();
        }
        Ok(())
    }
}

/// Compare for expression-only targets (MDL): branch-scoped nodes are
/// bound flat, the selection lowers to a ternary.
pub struct TernaryCompareImpl;

impl NodeImpl for TernaryCompareImpl {
    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        for branch in 0..2u32 {
            for dep in graph.nodes_scoped_to(node, branch) {
                emit_node_call_in_scope(gen, graph, dep, ctx, stage)?;
            }
        }
        let n = graph.node(node);
        let intest = named_input_expr(gen, graph, node, "intest", ctx)?;
        let cutoff = named_input_expr(gen, graph, node, "cutoff", ctx)?;
        let in1 = named_input_expr(gen, graph, node, "in1", ctx)?;
        let in2 = named_input_expr(gen, graph, node, "in2", ctx)?;
        let out = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        let ty = gen.syntax().type_name(&n.outputs[0].ty);
        stage.statement(&format!(
            "{ty} {out} = ({intest} <= {cutoff}) ? {in1} : {in2}"
        ));
        Ok(())
    }
}

/// Switch for expression-only targets (MDL): nested ternaries.
pub struct TernarySwitchImpl;

impl NodeImpl for TernarySwitchImpl {
    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let n = graph.node(node);
        let branch_count = n
            .inputs
            .iter()
            .filter(|i| {
                i.name
                    .strip_prefix("in")
                    .map(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
                    .unwrap_or(false)
            })
            .count() as u32;
        for branch in 0..branch_count {
            for dep in graph.nodes_scoped_to(node, branch) {
                emit_node_call_in_scope(gen, graph, dep, ctx, stage)?;
            }
        }
        let which = named_input_expr(gen, graph, node, "which", ctx)?;
        let mut expr = named_input_expr(gen, graph, node, &format!("in{branch_count}"), ctx)?;
        for branch in (0..branch_count.saturating_sub(1)).rev() {
            let value = named_input_expr(gen, graph, node, &format!("in{}", branch + 1), ctx)?;
            expr = format!("(float({which}) < {}.0) ? {value} : ({expr})", branch + 1);
        }
        let out = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        let ty = gen.syntax().type_name(&n.outputs[0].ty);
        stage.statement(&format!("{ty} {out} = {expr}"));
        Ok(())
    }
}

/// `switch`: selects among `in1..inN` by the `which` selector.
pub struct SwitchImpl;

impl NodeImpl for SwitchImpl {
    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let n = graph.node(node);
        let branch_count = n
            .inputs
            .iter()
            .filter(|i| {
                i.name
                    .strip_prefix("in")
                    .map(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
                    .unwrap_or(false)
            })
            .count() as u32;

        emit_output_declarations(gen, graph, node, ctx, stage);
        let which = named_input_expr(gen, graph, node, "which", ctx)?;
        let out = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);

        for branch in 0..branch_count {
            let bound = branch + 1;
            if branch == 0 {
                stage.line(&format!("if (float({which}) < 1.0)"));
            } else if branch + 1 < branch_count {
                stage.line(&format!("else if (float({which}) < {bound}.0)"));
            } else {
                stage.line("else");
            }
            stage.begin_scope(Brackets::Braces);

            let snapshot = ctx.emitted_snapshot();
            for dep in graph.nodes_scoped_to(node, branch) {
                emit_node_call_in_scope(gen, graph, dep, ctx, stage)?;
            }
            let value = named_input_expr(gen, graph, node, &format!("in{}", branch + 1), ctx)?;
            stage.statement(&format!("{out} = {value}"));
            ctx.swap_emitted(snapshot);

            stage.end_scope();
        }
        Ok(())
    }
}
