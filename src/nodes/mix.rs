//! Closure mix: blend two sibling closures by a scalar weight.
//!
//! Foreground and background are evaluated independently, then lerped:
//! `result = lerp(bg, fg, mix)` on both response and throughput. EDF
//! mixes carry no throughput, so only the direct value is lerped.

use crate::context::GenContext;
use crate::error::{GenError, Result};
use crate::generator::{
    emit_closure_tree, named_input_expr, output_var, ShaderGenerator,
};
use crate::graph::node::{Classification, InputRef, NodeId, OutputRef};
use crate::graph::ShaderGraph;
use crate::registry::NodeImpl;
use crate::shader::ShaderStage;

fn mix_inputs(graph: &ShaderGraph, node: NodeId) -> Result<(InputRef, InputRef)> {
    let n = graph.node(node);
    let fg = n
        .input("fg")
        .map(|(port, _)| InputRef { node, port })
        .ok_or_else(|| GenError::missing_input(&n.name, "fg"))?;
    let bg = n
        .input("bg")
        .map(|(port, _)| InputRef { node, port })
        .ok_or_else(|| GenError::missing_input(&n.name, "bg"))?;
    Ok((fg, bg))
}

/// Hardware (GLSL-family) closure mix.
pub struct HwClosureMixImpl;

impl NodeImpl for HwClosureMixImpl {
    fn is_editable(&self, input: &str) -> bool {
        input == "mix"
    }

    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let (fg_in, bg_in) = mix_inputs(graph, node)?;
        let fg = emit_closure_tree(gen, graph, fg_in, ctx, stage)?;
        let bg = emit_closure_tree(gen, graph, bg_in, ctx, stage)?;
        let mix = named_input_expr(gen, graph, node, "mix", ctx)?;

        let n = graph.node(node);
        let out = &n.outputs[0];
        let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        let ty = gen.syntax().type_name(&out.ty);
        let default = gen.syntax().default_value(&out.ty, false);

        stage.statement(&format!("{ty} {var} = {default}"));
        if n.has_classification(Classification::EDF) {
            stage.statement(&format!("{var} = mix({bg}, {fg}, {mix})"));
        } else {
            stage.statement(&format!(
                "{var}.response = mix({bg}.response, {fg}.response, {mix})"
            ));
            stage.statement(&format!(
                "{var}.throughput = mix({bg}.throughput, {fg}.throughput, {mix})"
            ));
        }
        Ok(())
    }
}

/// OSL closure mix: closures scale and add natively.
pub struct OslClosureMixImpl;

impl NodeImpl for OslClosureMixImpl {
    fn is_editable(&self, input: &str) -> bool {
        input == "mix"
    }

    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let (fg_in, bg_in) = mix_inputs(graph, node)?;
        let fg = emit_closure_tree(gen, graph, fg_in, ctx, stage)?;
        let bg = emit_closure_tree(gen, graph, bg_in, ctx, stage)?;
        let mix = named_input_expr(gen, graph, node, "mix", ctx)?;

        let n = graph.node(node);
        let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        let ty = gen.syntax().type_name(&n.outputs[0].ty);
        stage.statement(&format!(
            "{ty} {var} = ({bg} * (1.0 - {mix})) + ({fg} * {mix})"
        ));
        Ok(())
    }
}

/// MDL closure mix through the runtime module's material mixer.
pub struct MdlClosureMixImpl;

impl NodeImpl for MdlClosureMixImpl {
    fn is_editable(&self, input: &str) -> bool {
        input == "mix"
    }

    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let (fg_in, bg_in) = mix_inputs(graph, node)?;
        let fg = emit_closure_tree(gen, graph, fg_in, ctx, stage)?;
        let bg = emit_closure_tree(gen, graph, bg_in, ctx, stage)?;
        let mix = named_input_expr(gen, graph, node, "mix", ctx)?;

        let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        stage.statement(&format!(
            "material {var} = materialx::mix_material({fg}, {bg}, {mix})"
        ));
        Ok(())
    }
}
