//! Geometric input nodes: position, normal, texcoord.
//!
//! On hardware targets these read vertex-to-pixel connector variables;
//! the vertex stage computes the world-space values. On CPU targets they
//! read the renderer globals directly.

use crate::context::GenContext;
use crate::error::{GenError, Result};
use crate::generator::{output_var, ShaderGenerator};
use crate::graph::node::{NodeId, OutputRef};
use crate::graph::ShaderGraph;
use crate::registry::NodeImpl;
use crate::shader::{blocks, Shader, ShaderStage, PIXEL_STAGE, VERTEX_STAGE};

/// A geometric input realized as a plain expression over renderer
/// globals, optionally backed by a vertex-to-pixel connector variable.
pub struct GeomPropImpl {
    /// Expression the pixel-stage value is read from.
    expr: &'static str,
    /// Connector variable to route through the vertex stage, with type.
    connector: Option<(&'static str, &'static str)>,
    /// Vertex input attribute the connector is computed from, with type.
    vertex_input: Option<(&'static str, &'static str)>,
}

impl GeomPropImpl {
    pub fn new(
        expr: &'static str,
        connector: Option<(&'static str, &'static str)>,
        vertex_input: Option<(&'static str, &'static str)>,
    ) -> Self {
        Self {
            expr,
            connector,
            vertex_input,
        }
    }
}

impl NodeImpl for GeomPropImpl {
    fn create_variables(
        &self,
        gen: &dyn ShaderGenerator,
        _graph: &ShaderGraph,
        _node: NodeId,
        _ctx: &mut GenContext,
        shader: &mut Shader,
    ) -> Result<()> {
        let types = &gen.setup().types;
        if let Some((name, ty_name)) = self.connector {
            let ty = types.get(ty_name)?;
            let vs = shader
                .stage_mut(VERTEX_STAGE)
                .ok_or_else(|| GenError::internal("geometric input requires a vertex stage"))?;
            vs.output_block(blocks::VERTEX_DATA)?.add(ty.clone(), name, None);
            if let Some((attr, attr_ty_name)) = self.vertex_input {
                let attr_ty = types.get(attr_ty_name)?;
                vs.input_block(blocks::VERTEX_INPUTS)?.add(attr_ty, attr, None);
            }
            let ps = shader
                .stage_mut(PIXEL_STAGE)
                .ok_or_else(|| GenError::internal("geometric input requires a pixel stage"))?;
            ps.input_block(blocks::VERTEX_DATA)?.add(ty, name, None);
        }
        Ok(())
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
        let ty = gen.syntax().type_name(&n.outputs[0].ty);
        stage.statement(&format!("{ty} {var} = {}", self.expr));
        Ok(())
    }
}
