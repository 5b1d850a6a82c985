//! Hardware shader generation: GLSL, with ESSL and MSL dialects layered
//! on the same two-stage (vertex + pixel) pipeline.

use crate::context::GenContext;
use crate::document::Document;
use crate::error::{GenError, Result};
use crate::generator::{
    create_all_variables, emit_function_definitions, emit_graph_body, emit_node_call,
    input_expr, CallStyle, GeneratorSetup, ShaderGenerator,
};
use crate::graph::node::{Classification, InputRef, NodeId};
use crate::graph::{GenElement, ShaderGraph};
use crate::shader::{blocks, Brackets, Shader, ShaderStage, VariableBlock, PIXEL_STAGE, VERTEX_STAGE};
use crate::syntax::{EsslSyntax, GlslSyntax, MslSyntax, Syntax};

/// The hardware dialects sharing this pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HwDialect {
    Glsl,
    Essl,
    Msl,
}

pub(crate) struct HwGenerator {
    dialect: HwDialect,
    setup: GeneratorSetup,
    syntax: Box<dyn Syntax>,
}

impl HwGenerator {
    pub(crate) fn new(dialect: HwDialect, setup: GeneratorSetup) -> Self {
        let syntax: Box<dyn Syntax> = match dialect {
            HwDialect::Glsl => Box::new(GlslSyntax::new()),
            HwDialect::Essl => Box::new(EsslSyntax::new()),
            HwDialect::Msl => Box::new(MslSyntax::new()),
        };
        Self {
            dialect,
            setup,
            syntax,
        }
    }

    fn target_name(&self) -> &'static str {
        match self.dialect {
            HwDialect::Glsl => "glsl",
            HwDialect::Essl => "essl",
            HwDialect::Msl => "msl",
        }
    }

    fn vec4(&self) -> &'static str {
        match self.dialect {
            HwDialect::Msl => "float4",
            _ => "vec4",
        }
    }

    /// Spell a value expression widened to 4 channels for the final
    /// framebuffer assignment.
    fn to_vec4(&self, ty_name: &str, expr: &str) -> String {
        let vec4 = self.vec4();
        match ty_name {
            "float" | "integer" => format!("{vec4}({expr}, {expr}, {expr}, 1.0)"),
            "vector2" => format!("{vec4}({expr}, 0.0, 1.0)"),
            "color3" | "vector3" => format!("{vec4}({expr}, 1.0)"),
            "color4" | "vector4" => expr.to_string(),
            _ => format!("{vec4}(0.0, 0.0, 0.0, 1.0)"),
        }
    }

    fn create_stages(&self, graph: &ShaderGraph, shader: &mut Shader, ctx: &GenContext) -> Result<()> {
        let has_surface = graph.has_classification(Classification::SHADER)
            || graph.contains_classification(Classification::SHADER);

        let types = &self.setup.types;
        let v3 = types.get("vector3")?;
        let m44 = types.get("matrix44")?;

        let vs = shader.create_stage(VERTEX_STAGE);
        vs.create_input_block(blocks::VERTEX_INPUTS, "i_vs");
        vs.create_output_block(blocks::VERTEX_DATA, "vd");
        vs.create_uniform_block(blocks::PRIVATE_UNIFORMS, "u_prv");
        vs.create_uniform_block(blocks::PUBLIC_UNIFORMS, "u_pub");
        vs.input_block(blocks::VERTEX_INPUTS)?
            .add(v3.clone(), "i_position", None);
        let vs_prv = vs.uniform_block(blocks::PRIVATE_UNIFORMS)?;
        vs_prv.add(m44.clone(), "u_worldMatrix", None);
        vs_prv.add(m44.clone(), "u_viewProjectionMatrix", None);
        vs_prv.add(m44, "u_worldInverseTransposeMatrix", None);

        let ps = shader.create_stage(PIXEL_STAGE);
        ps.create_input_block(blocks::VERTEX_DATA, "vd");
        ps.create_output_block(blocks::PIXEL_OUTPUTS, "");
        ps.create_uniform_block(blocks::PRIVATE_UNIFORMS, "u_prv");
        ps.create_uniform_block(blocks::PUBLIC_UNIFORMS, "u_pub");
        if has_surface {
            ps.create_uniform_block(blocks::LIGHT_DATA, "u_lightData");
            let f = types.get("float")?;
            let i1 = types.get("integer")?;
            let c3 = types.get("color3")?;
            let light = ps.uniform_block(blocks::LIGHT_DATA)?;
            light.add(i1, "type", None);
            light.add(v3.clone(), "direction", None);
            light.add(c3, "color", None);
            light.add(f, "intensity", None);
        }

        // Published graph interface inputs become public uniforms.
        let c4 = types.get("color4")?;
        for socket in graph.input_sockets() {
            if socket.connections.is_empty() {
                continue;
            }
            ps.uniform_block(blocks::PUBLIC_UNIFORMS)?.add(
                socket.ty.clone(),
                &socket.variable,
                socket.value.clone(),
            );
        }

        // One framebuffer output per terminal graph output.
        for socket in graph.output_sockets() {
            ps.output_block(blocks::PIXEL_OUTPUTS)?
                .add(c4.clone(), &socket.variable, None);
        }

        let _ = ctx;
        Ok(())
    }

    fn emit_preamble(&self, stage: &mut ShaderStage, ctx: &GenContext) {
        match self.dialect {
            HwDialect::Glsl => {
                stage.line("#version 400");
            }
            HwDialect::Essl => {
                stage.line("#version 300 es");
                stage.line("precision mediump float;");
            }
            HwDialect::Msl => {
                stage.line("#include <metal_stdlib>");
                stage.line("using namespace metal;");
            }
        }
        stage.blank();
        let _ = ctx;
    }

    fn emit_type_definitions(&self, stage: &mut ShaderStage) {
        let defs = self.syntax.type_definitions();
        if !defs.is_empty() {
            stage.block(defs);
            stage.blank();
        }
    }

    fn emit_uniform_declarations(&self, stage_name: &str, stage: &mut ShaderStage, ctx: &GenContext) -> Result<()> {
        if ctx.options().hw_explicit_bindings && self.dialect == HwDialect::Essl {
            return Err(GenError::UnsupportedBinding {
                target: self.target_name().to_string(),
                what: "explicit uniform binding locations".to_string(),
            });
        }
        let _ = stage_name;

        let mut text = String::new();
        let mut binding = 0usize;
        let qualifier = match self.dialect {
            HwDialect::Msl => "constant",
            _ => "uniform",
        };
        let blocks_list: Vec<VariableBlock> = stage.uniform_blocks().cloned().collect();
        for block in &blocks_list {
            if block.is_empty() {
                continue;
            }
            if block.name() == blocks::LIGHT_DATA {
                // Per-light-source data: a struct array bounded by the
                // configured light limit.
                text.push_str("struct LightData\n{\n");
                for var in block.variables() {
                    let ty = self.syntax.type_name(&var.ty);
                    text.push_str(&format!("    {ty} {};\n", var.name));
                }
                text.push_str("};\n");
                text.push_str(&format!(
                    "{qualifier} LightData {}[MAX_LIGHT_SOURCES];\n",
                    block.instance()
                ));
                continue;
            }
            for var in block.variables() {
                let ty = self.syntax.type_name(&var.ty);
                if ctx.options().hw_explicit_bindings && self.dialect == HwDialect::Glsl {
                    text.push_str(&format!("layout (location = {binding}) "));
                    binding += 1;
                }
                if var.ty.name() == "filename" {
                    // Samplers are always uniforms, never block members.
                    text.push_str(&format!("uniform {ty} {};\n", var.name));
                } else if self.dialect == HwDialect::Msl {
                    let default = self.syntax.default_value(&var.ty, true);
                    text.push_str(&format!("{qualifier} {ty} {} = {default};\n", var.name));
                } else {
                    text.push_str(&format!("{qualifier} {ty} {};\n", var.name));
                }
            }
        }
        if !text.is_empty() {
            stage.block(&text);
            stage.blank();
        }
        Ok(())
    }

    fn emit_vertex_stage(
        &self,
        graph: &ShaderGraph,
        ctx: &mut GenContext,
        shader: &mut Shader,
    ) -> Result<()> {
        let mut stage = shader.take_stage(VERTEX_STAGE)?;
        self.emit_preamble(&mut stage, ctx);

        // Vertex attribute inputs.
        let mut decls = String::new();
        let in_q = self.syntax.input_qualifier();
        let inputs: Vec<VariableBlock> = stage.input_blocks().cloned().collect();
        for block in &inputs {
            for var in block.variables() {
                let ty = self.syntax.type_name(&var.ty);
                decls.push_str(&format!("{in_q} {ty} {};\n", var.name));
            }
        }
        if !decls.is_empty() {
            stage.block(&decls);
            stage.blank();
        }

        self.emit_uniform_declarations(VERTEX_STAGE, &mut stage, ctx)?;

        // Vertex-to-pixel connectors.
        let vd: Vec<VariableBlock> = stage.output_blocks().cloned().collect();
        for block in &vd {
            if block.name() != blocks::VERTEX_DATA || block.is_empty() {
                continue;
            }
            stage.block(&self.connector_block("out", block));
            stage.blank();
        }

        let vec4 = self.vec4();
        stage.line("void main()");
        stage.begin_scope(Brackets::Braces);
        stage.statement(&format!(
            "{vec4} hPositionWorld = u_worldMatrix * {vec4}(i_position, 1.0)"
        ));
        stage.statement("gl_Position = u_viewProjectionMatrix * hPositionWorld");
        for block in &vd {
            if block.name() != blocks::VERTEX_DATA {
                continue;
            }
            let instance = block.instance();
            for var in block.variables() {
                match var.name.as_str() {
                    "positionWorld" => {
                        stage.statement(&format!("{instance}.positionWorld = hPositionWorld.xyz"));
                    }
                    "normalWorld" => {
                        stage.statement(&format!(
                            "{instance}.normalWorld = normalize((u_worldInverseTransposeMatrix * {vec4}(i_normal, 0.0)).xyz)"
                        ));
                    }
                    "tangentWorld" => {
                        stage.statement(&format!(
                            "{instance}.tangentWorld = normalize((u_worldMatrix * {vec4}(i_tangent, 0.0)).xyz)"
                        ));
                    }
                    "texcoord_0" => {
                        stage.statement(&format!("{instance}.texcoord_0 = i_texcoord_0"));
                    }
                    other => {
                        let default = self.syntax.default_value(&var.ty, false);
                        stage.statement(&format!("{instance}.{other} = {default}"));
                    }
                }
            }
        }
        stage.end_scope();

        shader.put_stage(stage);
        Ok(())
    }

    /// Spell an interface block: `out VertexData { ... } vd;`
    fn connector_block(&self, direction: &str, block: &VariableBlock) -> String {
        let mut text = format!("{direction} {}\n{{\n", block.name());
        for var in block.variables() {
            let ty = self.syntax.type_name(&var.ty);
            text.push_str(&format!("    {ty} {};\n", var.name));
        }
        text.push_str(&format!("}} {};\n", block.instance()));
        text
    }

    fn emit_pixel_stage(
        &self,
        graph: &ShaderGraph,
        ctx: &mut GenContext,
        shader: &mut Shader,
    ) -> Result<()> {
        let has_surface = graph.has_classification(Classification::SURFACE)
            || graph.contains_classification(Classification::SURFACE);
        let mut stage = shader.take_stage(PIXEL_STAGE)?;

        self.emit_preamble(&mut stage, ctx);
        if has_surface {
            stage.line(&format!(
                "#define MAX_LIGHT_SOURCES {}",
                ctx.options().max_active_lights.max(1)
            ));
            stage.blank();
        }
        self.emit_type_definitions(&mut stage);
        self.emit_uniform_declarations(PIXEL_STAGE, &mut stage, ctx)?;

        // Vertex data connectors in.
        let vd: Vec<VariableBlock> = stage.input_blocks().cloned().collect();
        for block in &vd {
            if block.name() != blocks::VERTEX_DATA || block.is_empty() {
                continue;
            }
            stage.block(&self.connector_block("in", block));
            stage.blank();
        }

        // Framebuffer outputs.
        let out_q = self.syntax.output_qualifier();
        let outs: Vec<VariableBlock> = stage.output_blocks().cloned().collect();
        for block in &outs {
            if block.name() != blocks::PIXEL_OUTPUTS {
                continue;
            }
            for var in block.variables() {
                let ty = self.syntax.type_name(&var.ty);
                stage.line(&format!("{out_q} {ty} {};", var.name));
            }
        }
        stage.blank();

        emit_function_definitions(self.as_dyn(), graph, ctx, &mut stage)?;

        stage.line("void main()");
        stage.begin_scope(Brackets::Braces);
        if has_surface {
            // Texturing nodes feed the closures and shaders; they are
            // emitted first, in dependency order. Closure nodes are
            // pulled in by the surface shader per evaluation purpose.
            emit_graph_body(
                self.as_dyn(),
                graph,
                ctx,
                &mut stage,
                Classification::CLOSURE | Classification::SHADER,
            )?;
            stage.blank();
            for &id in graph.sorted_nodes() {
                if graph.node(id).has_classification(Classification::SHADER) {
                    emit_node_call(self.as_dyn(), graph, id, ctx, &mut stage)?;
                }
            }
        } else {
            emit_graph_body(
                self.as_dyn(),
                graph,
                ctx,
                &mut stage,
                Classification::CLOSURE,
            )?;
        }

        self.emit_final_outputs(graph, ctx, &mut stage)?;
        stage.end_scope();

        shader.put_stage(stage);
        Ok(())
    }

    fn emit_final_outputs(
        &self,
        graph: &ShaderGraph,
        ctx: &GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        for (port, socket) in graph.output_sockets().iter().enumerate() {
            let vec4 = self.vec4();
            match socket.connection {
                Some(conn) if conn.node != NodeId::GRAPH => {
                    let upstream = graph.node(conn.node);
                    let result = graph.output_port(conn).variable.clone();
                    if upstream.has_classification(Classification::SHADER) {
                        if ctx.options().hw_transparency {
                            stage.statement(&format!(
                                "float outAlpha = clamp(1.0 - dot({result}.transparency, vec3(0.3333)), 0.0, 1.0)"
                            ));
                            stage.statement(&format!(
                                "{} = {vec4}({result}.color, outAlpha)",
                                socket.variable
                            ));
                        } else {
                            stage.statement(&format!(
                                "{} = {vec4}({result}.color, 1.0)",
                                socket.variable
                            ));
                        }
                    } else {
                        let widened = self.to_vec4(graph.output_port(conn).ty.name(), &result);
                        stage.statement(&format!("{} = {widened}", socket.variable));
                    }
                }
                _ => {
                    // A bare value wired straight to the output.
                    let expr = input_expr(
                        self.as_dyn(),
                        graph,
                        InputRef { node: NodeId::GRAPH, port },
                        ctx,
                    );
                    let widened = self.to_vec4(socket.ty.name(), &expr);
                    stage.statement(&format!("{} = {widened}", socket.variable));
                }
            }
        }
        Ok(())
    }

    fn as_dyn(&self) -> &dyn ShaderGenerator {
        self
    }
}

impl ShaderGenerator for HwGenerator {
    fn target(&self) -> &'static str {
        self.target_name()
    }

    fn syntax(&self) -> &dyn Syntax {
        self.syntax.as_ref()
    }

    fn setup(&self) -> &GeneratorSetup {
        &self.setup
    }

    fn call_style(&self) -> CallStyle {
        CallStyle::OutputParam
    }

    fn generate(
        &self,
        name: &str,
        root: GenElement,
        doc: &Document,
        ctx: &mut GenContext,
    ) -> Result<Shader> {
        let graph = super::build_graph(self.as_dyn(), name, root, doc, ctx)?;
        let mut shader = Shader::new(name);
        self.create_stages(&graph, &mut shader, ctx)?;
        create_all_variables(self.as_dyn(), &graph, ctx, &mut shader)?;

        self.emit_vertex_stage(&graph, ctx, &mut shader)?;
        ctx.clear_emitted();
        self.emit_pixel_stage(&graph, ctx, &mut shader)?;

        super::validate_stages(&shader)?;
        shader.set_warnings(ctx.take_warnings());
        Ok(shader)
    }
}

/// Desktop GLSL generator.
pub struct GlslGenerator {
    inner: HwGenerator,
}

impl GlslGenerator {
    pub fn new(setup: GeneratorSetup) -> Self {
        Self {
            inner: HwGenerator::new(HwDialect::Glsl, setup),
        }
    }
}

impl ShaderGenerator for GlslGenerator {
    fn target(&self) -> &'static str {
        self.inner.target()
    }

    fn syntax(&self) -> &dyn Syntax {
        self.inner.syntax()
    }

    fn setup(&self) -> &GeneratorSetup {
        self.inner.setup()
    }

    fn generate(
        &self,
        name: &str,
        root: GenElement,
        doc: &Document,
        ctx: &mut GenContext,
    ) -> Result<Shader> {
        self.inner.generate(name, root, doc, ctx)
    }
}
