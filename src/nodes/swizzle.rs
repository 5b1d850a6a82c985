//! Swizzle node: reorder/extract channels named by a string value.

use crate::context::GenContext;
use crate::error::{GenError, Result};
use crate::generator::{input_expr, output_var, ShaderGenerator};
use crate::graph::node::{InputRef, NodeId, OutputRef};
use crate::graph::ShaderGraph;
use crate::registry::NodeImpl;
use crate::shader::ShaderStage;
use crate::value::Value;

pub struct SwizzleImpl;

impl NodeImpl for SwizzleImpl {
    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let n = graph.node(node);
        let (in_port, input) = n
            .input("in")
            .ok_or_else(|| GenError::missing_input(&n.name, "in"))?;
        if input.connection.is_none() && input.value.is_none() {
            return Err(GenError::invalid_node(
                &n.name,
                &n.category,
                "swizzle has no input connection and no value",
            ));
        }
        let channels = match n.input("channels").and_then(|(_, p)| p.value.clone()) {
            Some(Value::String(s)) if !s.is_empty() => s,
            _ => {
                return Err(GenError::invalid_node(
                    &n.name,
                    &n.category,
                    "swizzle requires a channels string",
                ))
            }
        };

        let src_ty = input.ty.clone();
        let src = input_expr(gen, graph, InputRef { node, port: in_port }, ctx);
        let out = &n.outputs[0];
        let expr = gen
            .syntax()
            .swizzle(&src, &src_ty, &channels, &out.ty)
            .map_err(|e| GenError::invalid_node(&n.name, &n.category, &e.to_string()))?;
        let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        let ty = gen.syntax().type_name(&out.ty);
        stage.statement(&format!("{ty} {var} = {expr}"));
        Ok(())
    }
}
