//! Surface shader node implementations.
//!
//! The hardware surface node drives the closure composition engine: the
//! same BSDF/EDF tree is emitted once per evaluation purpose (direct
//! reflection inside the light loop, indirect/environment after it,
//! emission, and transmission when transparency is on), each pass under
//! its own closure context and emitted-flag scope.

use std::collections::HashSet;

use crate::closure::ClosureContext;
use crate::context::GenContext;
use crate::error::{GenError, Result};
use crate::generator::{emit_closure_tree, named_input_expr, output_var, ShaderGenerator};
use crate::graph::node::{InputRef, NodeId, OutputRef};
use crate::graph::ShaderGraph;
use crate::options::SpecularEnv;
use crate::registry::NodeImpl;
use crate::shader::{blocks, Brackets, Shader, ShaderStage, PIXEL_STAGE, VERTEX_STAGE};

/// GLSL-family lighting support functions, defined once per stage.
const HW_LIGHTING_SOURCE: &str = "\
int numActiveLightSources()
{
    return min(u_numActiveLightSources, MAX_LIGHT_SOURCES);
}

void sampleLightSource(LightData light, vec3 position, out lightshader result)
{
    result.intensity = light.color * light.intensity;
    result.direction = -light.direction;
}";

fn input_ref(graph: &ShaderGraph, node: NodeId, name: &str) -> Result<InputRef> {
    let n = graph.node(node);
    n.input(name)
        .map(|(port, _)| InputRef { node, port })
        .ok_or_else(|| GenError::missing_input(&n.name, name))
}

pub struct SurfaceHwImpl;

impl SurfaceHwImpl {
    /// Emit one closure evaluation pass under its own context and
    /// emitted-flag scope, returning the result expression.
    fn closure_pass(
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        input: InputRef,
        cc: ClosureContext,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<String> {
        ctx.push_closure_context(cc);
        let saved = ctx.swap_emitted(HashSet::new());
        let result = emit_closure_tree(gen, graph, input, ctx, stage);
        ctx.swap_emitted(saved);
        ctx.pop_closure_context();
        result
    }
}

impl NodeImpl for SurfaceHwImpl {
    fn create_variables(
        &self,
        gen: &dyn ShaderGenerator,
        _graph: &ShaderGraph,
        _node: NodeId,
        _ctx: &mut GenContext,
        shader: &mut Shader,
    ) -> Result<()> {
        let types = &gen.setup().types;
        let v3 = types.get("vector3")?;
        let i1 = types.get("integer")?;

        let vs = shader
            .stage_mut(VERTEX_STAGE)
            .ok_or_else(|| GenError::internal("surface node requires a vertex stage"))?;
        vs.input_block(blocks::VERTEX_INPUTS)?
            .add(v3.clone(), "i_normal", None);
        vs.output_block(blocks::VERTEX_DATA)?
            .add(v3.clone(), "normalWorld", None);
        vs.output_block(blocks::VERTEX_DATA)?
            .add(v3.clone(), "positionWorld", None);

        let ps = shader
            .stage_mut(PIXEL_STAGE)
            .ok_or_else(|| GenError::internal("surface node requires a pixel stage"))?;
        ps.input_block(blocks::VERTEX_DATA)?
            .add(v3.clone(), "normalWorld", None);
        ps.input_block(blocks::VERTEX_DATA)?
            .add(v3.clone(), "positionWorld", None);
        ps.uniform_block(blocks::PRIVATE_UNIFORMS)?
            .add(v3, "u_viewPosition", None);
        ps.uniform_block(blocks::PRIVATE_UNIFORMS)?
            .add(i1, "u_numActiveLightSources", None);
        Ok(())
    }

    fn emit_function_definition(
        &self,
        _gen: &dyn ShaderGenerator,
        _graph: &ShaderGraph,
        _node: NodeId,
        _ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        if stage.name() == PIXEL_STAGE && stage.claim_function("sampleLightSource") {
            stage.block(HW_LIGHTING_SOURCE);
            stage.blank();
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
        if stage.name() != PIXEL_STAGE {
            return Ok(());
        }
        let n = graph.node(node);
        let out = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        let out_ty = gen.syntax().type_name(&n.outputs[0].ty).to_string();
        let out_default = gen.syntax().default_value(&n.outputs[0].ty, false);
        let bsdf_input = input_ref(graph, node, "bsdf")?;
        let edf_input = input_ref(graph, node, "edf")?;
        let opacity = named_input_expr(gen, graph, node, "opacity", ctx)?;

        stage.comment(&format!("surface: {}", n.name));
        stage.statement(&format!("{out_ty} {out} = {out_default}"));
        stage.begin_scope(Brackets::Braces);

        stage.statement("vec3 N = normalize(vd.normalWorld)");
        stage.statement("vec3 V = normalize(u_viewPosition - vd.positionWorld)");
        stage.blank();

        // Direct lighting.
        stage.comment("Shadow the lights");
        stage.statement("int numLights = numActiveLightSources()");
        stage.statement("lightshader lightShader");
        stage.line("for (int activeLightIndex = 0; activeLightIndex < numLights; ++activeLightIndex)");
        stage.begin_scope(Brackets::Braces);
        stage.statement(
            "sampleLightSource(u_lightData[activeLightIndex], vd.positionWorld, lightShader)",
        );
        stage.statement("vec3 L = lightShader.direction");
        stage.blank();
        stage.comment("Calculate the BSDF response for this light source");
        let bsdf = Self::closure_pass(
            gen,
            graph,
            bsdf_input,
            ClosureContext::reflection(),
            ctx,
            stage,
        )?;
        stage.blank();
        stage.comment("Accumulate the light's contribution");
        stage.statement(&format!(
            "{out}.color += lightShader.intensity * ({bsdf}).response"
        ));
        stage.end_scope();
        stage.blank();

        // Indirect lighting.
        if ctx.options().specular_environment != SpecularEnv::None {
            stage.comment("Add indirect contribution");
            let bsdf = Self::closure_pass(
                gen,
                graph,
                bsdf_input,
                ClosureContext::indirect(),
                ctx,
                stage,
            )?;
            stage.statement(&format!("{out}.color += ({bsdf}).response"));
            stage.blank();
        }

        // Emission.
        stage.comment("Add surface emission");
        let edf = Self::closure_pass(
            gen,
            graph,
            edf_input,
            ClosureContext::emission(),
            ctx,
            stage,
        )?;
        stage.statement(&format!("{out}.color += {edf}"));
        stage.blank();

        // Opacity and transparency.
        if ctx.options().hw_transparency {
            stage.comment("Calculate the BSDF transmission for viewing direction");
            let bsdf = Self::closure_pass(
                gen,
                graph,
                bsdf_input,
                ClosureContext::transmission(),
                ctx,
                stage,
            )?;
            stage.statement(&format!("{out}.color += ({bsdf}).response"));
            stage.statement(&format!(
                "{out}.transparency = mix(vec3(1.0), ({bsdf}).throughput, {opacity})"
            ));
        } else {
            stage.statement(&format!("{out}.transparency = vec3(0.0)"));
        }
        stage.statement(&format!("{out}.color *= {opacity}"));

        stage.end_scope();
        stage.blank();
        Ok(())
    }
}

/// OSL surface: closures compose natively, weighted by opacity.
pub struct SurfaceOslImpl;

impl NodeImpl for SurfaceOslImpl {
    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let out = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        let bsdf_input = input_ref(graph, node, "bsdf")?;
        let edf_input = input_ref(graph, node, "edf")?;
        let opacity = named_input_expr(gen, graph, node, "opacity", ctx)?;

        ctx.push_closure_context(ClosureContext::default_context());
        let bsdf = emit_closure_tree(gen, graph, bsdf_input, ctx, stage)?;
        let edf = emit_closure_tree(gen, graph, edf_input, ctx, stage)?;
        ctx.pop_closure_context();

        stage.statement(&format!(
            "closure color {out} = ({bsdf} + {edf}) * {opacity}"
        ));
        Ok(())
    }
}

/// MDL surface: closures join into a full material.
pub struct SurfaceMdlImpl;

impl NodeImpl for SurfaceMdlImpl {
    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let out = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
        let bsdf_input = input_ref(graph, node, "bsdf")?;
        let edf_input = input_ref(graph, node, "edf")?;
        let opacity = named_input_expr(gen, graph, node, "opacity", ctx)?;

        ctx.push_closure_context(ClosureContext::default_context());
        let bsdf = emit_closure_tree(gen, graph, bsdf_input, ctx, stage)?;
        let edf = emit_closure_tree(gen, graph, edf_input, ctx, stage)?;
        ctx.pop_closure_context();

        stage.statement(&format!(
            "material {out} = materialx::surface_material({bsdf}, {edf}, {opacity})"
        ));
        Ok(())
    }
}
