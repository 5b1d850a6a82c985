//! Closure layering: a top BSDF over a base BSDF or VDF.
//!
//! For a BSDF base, the top closure's native implementation receives the
//! base contribution through its own `base` input and writes straight
//! into the layer node's output variable. Instead of rewiring the graph
//! in place, the emission runs under a scoped override frame redirecting
//! the top's base input and renaming its output; the frame pops when the
//! nested call returns.
//!
//! A thin-film top does not scatter by itself: it arms the closure
//! context's thin-film state and re-emits the base, whose first
//! supporting BSDF leaf consumes the modifier.

use crate::context::{EmitOverrides, GenContext};
use crate::error::{GenError, Result};
use crate::generator::{emit_closure_node, output_var, ShaderGenerator};
use crate::graph::node::{Classification, InputRef, NodeId, OutputRef};
use crate::graph::ShaderGraph;
use crate::registry::NodeImpl;
use crate::shader::ShaderStage;

/// Hardware (GLSL-family) closure layer.
pub struct HwClosureLayerImpl;

impl NodeImpl for HwClosureLayerImpl {
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
        let n = graph.node(node);
        let (top_port, top_input) = n
            .input("top")
            .ok_or_else(|| GenError::missing_input(&n.name, "top"))?;
        let (base_port, base_input) = n
            .input("base")
            .ok_or_else(|| GenError::missing_input(&n.name, "base"))?;
        let base_is_vdf = base_input.ty.name() == "VDF";

        let out_ty = gen.syntax().type_name(&n.outputs[0].ty).to_string();
        let out_default = gen.syntax().default_value(&n.outputs[0].ty, false);
        let out = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);

        let top_ref = InputRef { node, port: top_port };
        let base_ref = InputRef { node, port: base_port };
        let top_conn = ctx.redirect_for(top_ref).or(top_input.connection);
        let base_conn = ctx.redirect_for(base_ref).or(base_input.connection);

        // An unconnected top degrades to the default (zero) closure.
        let Some(top_conn) = top_conn.filter(|c| c.node != NodeId::GRAPH) else {
            stage.statement(&format!("{out_ty} {out} = {out_default}"));
            return Ok(());
        };
        let top_id = top_conn.node;
        let top_node = graph.node(top_id);

        // Thin film: arm the modifier and emit the base in our place.
        if top_node.has_classification(Classification::THINFILM) {
            let Some(base_conn) = base_conn.filter(|c| c.node != NodeId::GRAPH) else {
                stage.statement(&format!("{out_ty} {out} = {out_default}"));
                return Ok(());
            };
            if let Some(cc) = ctx.closure_context_mut() {
                cc.set_thin_film(top_id);
            }
            ctx.push_overrides(EmitOverrides {
                output_rename: vec![(base_conn, out.clone())],
                ..Default::default()
            });
            let base_imp = graph.node(base_conn.node).imp.clone().ok_or_else(|| {
                GenError::internal("layer base node has no implementation")
            })?;
            base_imp.emit_function_call(gen, graph, base_conn.node, ctx, stage)?;
            ctx.pop_overrides();
            // Drop the modifier if no leaf consumed it.
            if let Some(cc) = ctx.closure_context_mut() {
                let _ = cc.take_thin_film();
            }
            return Ok(());
        }

        if base_is_vdf {
            // Volumetric base: the base medium's throughput attenuates
            // the top surface's contribution.
            emit_closure_node(gen, graph, top_id, ctx, stage)?;
            let top_var = output_var(gen, graph, top_conn, ctx);
            let base_expr = match base_conn.filter(|c| c.node != NodeId::GRAPH) {
                Some(bc) => {
                    emit_closure_node(gen, graph, bc.node, ctx, stage)?;
                    output_var(gen, graph, bc, ctx)
                }
                None => out_default.clone(),
            };
            stage.statement(&format!("{out_ty} {out} = {out_default}"));
            stage.statement(&format!(
                "{out}.response = {top_var}.response * {base_expr}.throughput"
            ));
            stage.statement(&format!(
                "{out}.throughput = {top_var}.throughput * {base_expr}.throughput"
            ));
            return Ok(());
        }

        // BSDF base: the top must expose a base slot to layer onto.
        let Some((top_base_port, top_base)) = top_node.input("base") else {
            return Err(GenError::invalid_node(
                &n.name,
                &n.category,
                &format!("top BSDF '{}' is not layerable (no base input)", top_node.name),
            ));
        };
        if top_base.ty.name() != "BSDF" {
            return Err(GenError::invalid_node(
                &n.name,
                &n.category,
                &format!("top BSDF '{}' is not layerable (base is not BSDF)", top_node.name),
            ));
        }

        // Emit the base stack first, then the top writing our variable
        // with its base slot redirected to our base connection.
        let mut overrides = EmitOverrides {
            output_rename: vec![(top_conn, out)],
            ..Default::default()
        };
        if let Some(bc) = base_conn.filter(|c| c.node != NodeId::GRAPH) {
            emit_closure_node(gen, graph, bc.node, ctx, stage)?;
            overrides
                .input_redirect
                .push((InputRef { node: top_id, port: top_base_port }, bc));
        }
        ctx.push_overrides(overrides);
        let top_imp = top_node
            .imp
            .clone()
            .ok_or_else(|| GenError::internal("layer top node has no implementation"))?;
        top_imp.emit_function_call(gen, graph, top_id, ctx, stage)?;
        ctx.pop_overrides();
        Ok(())
    }
}

/// OSL closure layer: closures add, with the base attenuated by the
/// top's transmission estimate inside the library functions; here the
/// composition is a straight closure sum.
pub struct OslClosureLayerImpl;

impl NodeImpl for OslClosureLayerImpl {
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
        let n = graph.node(node);
        let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        let ty = gen.syntax().type_name(&n.outputs[0].ty).to_string();

        let mut parts: Vec<String> = Vec::new();
        for name in ["top", "base"] {
            let Some((port, input)) = n.input(name) else { continue };
            let r = InputRef { node, port };
            if let Some(conn) = ctx.redirect_for(r).or(input.connection) {
                if conn.node != NodeId::GRAPH {
                    emit_closure_node(gen, graph, conn.node, ctx, stage)?;
                }
                parts.push(output_var(gen, graph, conn, ctx));
            }
        }
        let expr = if parts.is_empty() {
            gen.syntax().default_value(&n.outputs[0].ty, false)
        } else {
            parts.join(" + ")
        };
        stage.statement(&format!("{ty} {var} = {expr}"));
        Ok(())
    }
}

/// MDL closure layer through the runtime module's layering helper.
pub struct MdlClosureLayerImpl;

impl NodeImpl for MdlClosureLayerImpl {
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
        let n = graph.node(node);
        let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);

        let mut vars: Vec<String> = Vec::new();
        for name in ["top", "base"] {
            let Some((port, input)) = n.input(name) else { continue };
            let r = InputRef { node, port };
            match ctx.redirect_for(r).or(input.connection) {
                Some(conn) => {
                    if conn.node != NodeId::GRAPH {
                        emit_closure_node(gen, graph, conn.node, ctx, stage)?;
                    }
                    vars.push(output_var(gen, graph, conn, ctx));
                }
                None => vars.push("material()".to_string()),
            }
        }
        stage.statement(&format!(
            "material {var} = materialx::layer_material({})",
            vars.join(", ")
        ));
        Ok(())
    }
}
