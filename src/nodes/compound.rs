//! Compound node implementation: a nodedef realized by a nested graph.
//!
//! The sub-graph is built during graph construction and emitted as one
//! function per stage: parameters mirror the graph's input sockets,
//! out-parameters its output sockets.

use std::collections::HashSet;

use crate::context::GenContext;
use crate::error::Result;
use crate::generator::{
    emit_function_definitions, emit_graph_body, emit_output_declarations, input_expr, output_var,
    CallStyle, ShaderGenerator,
};
use crate::graph::node::{Classification, InputRef, NodeId, OutputRef};
use crate::graph::ShaderGraph;
use crate::registry::NodeImpl;
use crate::shader::{Shader, ShaderStage};

pub struct CompoundImpl {
    graph: ShaderGraph,
    function_name: String,
}

impl CompoundImpl {
    pub fn new(graph: ShaderGraph) -> Self {
        let function_name = format!("NG_{}", graph.name().replace(['-', '.', '/'], "_"));
        Self {
            graph,
            function_name,
        }
    }

    pub fn graph(&self) -> &ShaderGraph {
        &self.graph
    }
}

impl NodeImpl for CompoundImpl {
    fn create_variables(
        &self,
        gen: &dyn ShaderGenerator,
        _graph: &ShaderGraph,
        _node: NodeId,
        ctx: &mut GenContext,
        shader: &mut Shader,
    ) -> Result<()> {
        for &id in self.graph.sorted_nodes() {
            if let Some(imp) = self.graph.node(id).imp.clone() {
                imp.create_variables(gen, &self.graph, id, ctx, shader)?;
            }
        }
        Ok(())
    }

    fn emit_function_definition(
        &self,
        gen: &dyn ShaderGenerator,
        _graph: &ShaderGraph,
        _node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        // Nested out-of-line functions first, then our own.
        emit_function_definitions(gen, &self.graph, ctx, stage)?;

        if !stage.claim_function(&self.function_name) {
            return Ok(());
        }

        let syntax = gen.syntax();
        let mut params: Vec<String> = Vec::new();
        for socket in self.graph.input_sockets() {
            params.push(format!("{} {}", syntax.type_name(&socket.ty), socket.variable));
        }

        match gen.call_style() {
            CallStyle::OutputParam => {
                let out_qualifier = syntax.output_qualifier();
                for socket in self.graph.output_sockets() {
                    let ty = syntax.type_name(&socket.ty);
                    if out_qualifier.is_empty() {
                        params.push(format!("{ty} {}", socket.variable));
                    } else {
                        params.push(format!("{out_qualifier} {ty} {}", socket.variable));
                    }
                }
                stage.line(&format!("void {}({})", self.function_name, params.join(", ")));
                stage.begin_scope(crate::shader::Brackets::Braces);

                // The body emits against its own emitted-flag scope.
                let saved = ctx.swap_emitted(HashSet::new());
                emit_graph_body(gen, &self.graph, ctx, stage, Classification::empty())?;
                ctx.swap_emitted(saved);

                for (port, socket) in self.graph.output_sockets().iter().enumerate() {
                    let expr = input_expr(
                        gen,
                        &self.graph,
                        InputRef { node: NodeId::GRAPH, port },
                        ctx,
                    );
                    stage.statement(&format!("{} = {expr}", socket.variable));
                }
                stage.end_scope();
            }
            CallStyle::ReturnValue => {
                // Return-value targets get the first output socket back.
                let ret = &self.graph.output_sockets()[0];
                let ret_ty = syntax.type_name(&ret.ty).to_string();
                stage.line(&format!(
                    "{ret_ty} {}({})",
                    self.function_name,
                    params.join(", ")
                ));
                stage.begin_scope(crate::shader::Brackets::Braces);

                let saved = ctx.swap_emitted(HashSet::new());
                emit_graph_body(gen, &self.graph, ctx, stage, Classification::empty())?;
                ctx.swap_emitted(saved);

                let expr = input_expr(
                    gen,
                    &self.graph,
                    InputRef { node: NodeId::GRAPH, port: 0 },
                    ctx,
                );
                stage.statement(&format!("return {expr}"));
                stage.end_scope();
            }
        }
        stage.blank();
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
        let mut args: Vec<String> = Vec::new();
        for port in 0..n.inputs.len() {
            args.push(input_expr(gen, graph, InputRef { node, port }, ctx));
        }
        match gen.call_style() {
            CallStyle::OutputParam => {
                emit_output_declarations(gen, graph, node, ctx, stage);
                for port in 0..n.outputs.len() {
                    args.push(output_var(gen, graph, OutputRef { node, port }, ctx));
                }
                stage.statement(&format!("{}({})", self.function_name, args.join(", ")));
            }
            CallStyle::ReturnValue => {
                // Single-output compounds on return-value targets.
                let out = &n.outputs[0];
                let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
                let ty = gen.syntax().type_name(&out.ty);
                stage.statement(&format!(
                    "{ty} {var} = {}({})",
                    self.function_name,
                    args.join(", ")
                ));
            }
        }
        Ok(())
    }
}
