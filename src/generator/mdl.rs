//! MDL generator: a single-stage CPU target.
//!
//! Emits a module with one exported material function. Statement
//! emission lands inside a `let { ... } in` expression, so every node
//! call is a binding; conditionals lower to ternary selects through the
//! MDL-specific node implementations.

use crate::context::GenContext;
use crate::document::Document;
use crate::error::Result;
use crate::generator::{
    create_all_variables, emit_function_definitions, emit_graph_body, input_expr, CallStyle,
    GeneratorSetup, ShaderGenerator,
};
use crate::graph::node::{Classification, InputRef, NodeId};
use crate::graph::GenElement;
use crate::shader::{Brackets, Shader, PIXEL_STAGE};
use crate::syntax::{MdlSyntax, Syntax};

pub struct MdlGenerator {
    setup: GeneratorSetup,
    syntax: MdlSyntax,
}

impl MdlGenerator {
    pub fn new(setup: GeneratorSetup) -> Self {
        Self {
            setup,
            syntax: MdlSyntax::new(),
        }
    }
}

impl ShaderGenerator for MdlGenerator {
    fn target(&self) -> &'static str {
        "mdl"
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
        stage.line("mdl 1.7;");
        stage.blank();
        stage.line("import ::df::*;");
        stage.line("import ::math::*;");
        stage.line("import ::state::*;");
        stage.line("import ::materialx::*;");
        stage.blank();

        emit_function_definitions(gen, &graph, ctx, &mut stage)?;

        // Published interface inputs become material parameters.
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
            params.push(format!("uniform {ty} {} = {default}", socket.variable));
        }

        let valid_name = name.replace(['-', '.', '/'], "_");
        stage.line(&format!("export material {valid_name}("));
        for (i, p) in params.iter().enumerate() {
            let comma = if i + 1 < params.len() { "," } else { "" };
            stage.line(&format!("    {p}{comma}"));
        }
        stage.line(") = let");
        stage.begin_scope(Brackets::Braces);
        emit_graph_body(gen, &graph, ctx, &mut stage, Classification::empty())?;

        // Bind the terminal result inside the let so the trailing `in`
        // can return it.
        let (root_ty, root_expr) = match graph.output_sockets().first() {
            Some(socket) => {
                let expr = input_expr(gen, &graph, InputRef { node: NodeId::GRAPH, port: 0 }, ctx);
                (self.syntax.type_name(&socket.ty).to_string(), expr)
            }
            None => ("material".to_string(), "material()".to_string()),
        };
        stage.statement(&format!("{root_ty} finalOutput = {root_expr}"));
        stage.end_scope();
        stage.statement("in finalOutput");

        shader.put_stage(stage);
        super::validate_stages(&shader)?;
        shader.set_warnings(ctx.take_warnings());
        Ok(shader)
    }
}
