//! File texture sampling on hardware targets.
//!
//! The file input surfaces as a sampler uniform through the published
//! interface; sampling honors the vertical-flip generation option.

use crate::context::GenContext;
use crate::error::{GenError, Result};
use crate::generator::{named_input_expr, output_var, ShaderGenerator};
use crate::graph::node::{NodeId, OutputRef};
use crate::graph::ShaderGraph;
use crate::registry::NodeImpl;
use crate::shader::ShaderStage;

pub struct HwImageImpl;

impl NodeImpl for HwImageImpl {
    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let n = graph.node(node);
        let (_, file) = n
            .input("file")
            .ok_or_else(|| GenError::missing_input(&n.name, "file"))?;
        if file.connection.is_none() && file.value.is_none() {
            return Err(GenError::missing_input(&n.name, "file"));
        }
        // The sampler is reachable only through its published uniform.
        let sampler = match file.connection {
            Some(conn) => graph.output_port(conn).variable.clone(),
            None => {
                return Err(GenError::invalid_node(
                    &n.name,
                    &n.category,
                    "file input was not published as a sampler uniform",
                ))
            }
        };

        let (_, texcoord) = n
            .input("texcoord")
            .ok_or_else(|| GenError::missing_input(&n.name, "texcoord"))?;
        let uv_ty = gen.syntax().type_name(&texcoord.ty).to_string();
        let uv = named_input_expr(gen, graph, node, "texcoord", ctx)?;
        let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        let ty = gen.syntax().type_name(&n.outputs[0].ty);

        let uv_var = format!("{var}_uv");
        stage.statement(&format!("{uv_ty} {uv_var} = {uv}"));
        if ctx.options().file_texture_vertical_flip {
            stage.statement(&format!("{uv_var} = {uv_ty}({uv_var}.x, 1.0 - {uv_var}.y)"));
        }
        stage.statement(&format!("{ty} {var} = texture({sampler}, {uv_var}).rgb"));
        Ok(())
    }
}
