//! Closure addition: two closures summed.
//!
//! Responses add; for BSDFs the combined throughput is the average of the
//! two, since both lobes attenuate light passing below them.

use crate::context::GenContext;
use crate::error::{GenError, Result};
use crate::generator::{emit_closure_tree, output_var, ShaderGenerator};
use crate::graph::node::{Classification, InputRef, NodeId, OutputRef};
use crate::graph::ShaderGraph;
use crate::registry::NodeImpl;
use crate::shader::ShaderStage;

fn add_inputs(graph: &ShaderGraph, node: NodeId) -> Result<(InputRef, InputRef)> {
    let n = graph.node(node);
    let in1 = n
        .input("in1")
        .map(|(port, _)| InputRef { node, port })
        .ok_or_else(|| GenError::missing_input(&n.name, "in1"))?;
    let in2 = n
        .input("in2")
        .map(|(port, _)| InputRef { node, port })
        .ok_or_else(|| GenError::missing_input(&n.name, "in2"))?;
    Ok((in1, in2))
}

/// Hardware (GLSL-family) closure add.
pub struct HwClosureAddImpl;

impl NodeImpl for HwClosureAddImpl {
    fn is_editable(&self, _input: &str) -> bool {
        false
    }

    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let (in1, in2) = add_inputs(graph, node)?;
        let a = emit_closure_tree(gen, graph, in1, ctx, stage)?;
        let b = emit_closure_tree(gen, graph, in2, ctx, stage)?;

        let n = graph.node(node);
        let out = &n.outputs[0];
        let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        let ty = gen.syntax().type_name(&out.ty);
        let default = gen.syntax().default_value(&out.ty, false);

        stage.statement(&format!("{ty} {var} = {default}"));
        if n.has_classification(Classification::EDF) {
            stage.statement(&format!("{var} = {a} + {b}"));
        } else {
            stage.statement(&format!("{var}.response = {a}.response + {b}.response"));
            stage.statement(&format!(
                "{var}.throughput = mix({a}.throughput, {b}.throughput, 0.5)"
            ));
        }
        Ok(())
    }
}

/// OSL closure add: native closure sum.
pub struct OslClosureAddImpl;

impl NodeImpl for OslClosureAddImpl {
    fn is_editable(&self, _input: &str) -> bool {
        false
    }

    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let (in1, in2) = add_inputs(graph, node)?;
        let a = emit_closure_tree(gen, graph, in1, ctx, stage)?;
        let b = emit_closure_tree(gen, graph, in2, ctx, stage)?;
        let n = graph.node(node);
        let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        let ty = gen.syntax().type_name(&n.outputs[0].ty);
        stage.statement(&format!("{ty} {var} = {a} + {b}"));
        Ok(())
    }
}

/// MDL closure add through the runtime module.
pub struct MdlClosureAddImpl;

impl NodeImpl for MdlClosureAddImpl {
    fn is_editable(&self, _input: &str) -> bool {
        false
    }

    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let (in1, in2) = add_inputs(graph, node)?;
        let a = emit_closure_tree(gen, graph, in1, ctx, stage)?;
        let b = emit_closure_tree(gen, graph, in2, ctx, stage)?;
        let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        stage.statement(&format!(
            "material {var} = materialx::add_material({a}, {b})"
        ));
        Ok(())
    }
}
