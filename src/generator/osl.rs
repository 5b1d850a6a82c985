//! OSL generator: a single-stage CPU target.
//!
//! Emits one `shader` entry whose parameters are the published graph
//! interface and whose output parameters are the terminal outputs.

use crate::context::GenContext;
use crate::document::Document;
use crate::error::Result;
use crate::generator::{
    create_all_variables, emit_function_definitions, emit_graph_body, input_expr, CallStyle,
    GeneratorSetup, ShaderGenerator,
};
use crate::graph::node::{Classification, InputRef, NodeId};
use crate::graph::{GenElement, ShaderGraph};
use crate::shader::{Brackets, Shader, ShaderStage, PIXEL_STAGE};
use crate::syntax::{OslSyntax, Syntax};

pub struct OslGenerator {
    setup: GeneratorSetup,
    syntax: OslSyntax,
}

impl OslGenerator {
    pub fn new(setup: GeneratorSetup) -> Self {
        Self {
            setup,
            syntax: OslSyntax::new(),
        }
    }

    fn emit_shader_signature(&self, name: &str, graph: &ShaderGraph, stage: &mut ShaderStage) {
        let mut params: Vec<String> = Vec::new();
        for socket in graph.input_sockets() {
            if socket.connections.is_empty() {
                continue;
            }
            let ty = self.syntax.type_name(&socket.ty);
            let default = match &socket.value {
                Some(v) => self.syntax.value(&socket.ty, v, true),
                None => self.syntax.default_value(&socket.ty, true),
            };
            params.push(format!("{ty} {} = {default}", socket.variable));
        }
        for socket in graph.output_sockets() {
            let ty = self.syntax.type_name(&socket.ty);
            let default = self.syntax.default_value(&socket.ty, false);
            params.push(format!("output {ty} {} = {default}", socket.variable));
        }

        stage.line(&format!("shader {name}"));
        stage.line("(");
        for (i, p) in params.iter().enumerate() {
            let comma = if i + 1 < params.len() { "," } else { "" };
            stage.line(&format!("    {p}{comma}"));
        }
        stage.line(")");
    }
}

impl ShaderGenerator for OslGenerator {
    fn target(&self) -> &'static str {
        "osl"
    }

    fn syntax(&self) -> &dyn Syntax {
        &self.syntax
    }

    fn setup(&self) -> &GeneratorSetup {
        &self.setup
    }

    fn call_style(&self) -> CallStyle {
        CallStyle::ReturnValue
    }

    fn generate(
        &self,
        name: &str,
        root: GenElement,
        doc: &Document,
        ctx: &mut GenContext,
    ) -> Result<Shader> {
        let gen: &dyn ShaderGenerator = self;
        let graph = super::build_graph(gen, name, root, doc, ctx)?;
        let mut shader = Shader::new(name);
        shader.create_stage(PIXEL_STAGE);
        create_all_variables(gen, &graph, ctx, &mut shader)?;

        let mut stage = shader.take_stage(PIXEL_STAGE)?;

        let defs = self.syntax.type_definitions();
        if !defs.is_empty() {
            stage.block(defs);
            stage.blank();
        }
        emit_function_definitions(gen, &graph, ctx, &mut stage)?;

        self.emit_shader_signature(name, &graph, &mut stage);
        stage.begin_scope(Brackets::Braces);
        emit_graph_body(gen, &graph, ctx, &mut stage, Classification::empty())?;
        for (port, socket) in graph.output_sockets().iter().enumerate() {
            let expr = input_expr(gen, &graph, InputRef { node: NodeId::GRAPH, port }, ctx);
            stage.statement(&format!("{} = {expr}", socket.variable));
        }
        stage.end_scope();

        shader.put_stage(stage);
        super::validate_stages(&shader)?;
        shader.set_warnings(ctx.take_warnings());
        Ok(shader)
    }
}
