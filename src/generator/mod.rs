//! Shader generators.
//!
//! A [`ShaderGenerator`] drives one target dialect: it builds the shader
//! graph, declares stage variables, emits the preamble, declarations,
//! function definitions and function calls, and finishes with the output
//! assignments. The shared emission machinery lives here as free
//! functions so node implementations can reach it through a
//! `&dyn ShaderGenerator` without generic plumbing.

pub mod essl;
pub mod glsl;
pub mod mdl;
pub mod msl;
pub mod osl;

pub use essl::EsslGenerator;
pub use glsl::GlslGenerator;
pub use mdl::MdlGenerator;
pub use msl::MslGenerator;
pub use osl::OslGenerator;

use std::sync::Arc;

use crate::colorspace::ColorSystem;
use crate::context::GenContext;
use crate::document::Document;
use crate::error::{GenError, Result};
use crate::graph::node::{Classification, InputRef, NodeId, OutputRef};
use crate::graph::{BuildEnv, GenElement, ShaderGraph};
use crate::registry::ImplRegistry;
use crate::shader::{Shader, ShaderStage};
use crate::syntax::Syntax;
use crate::types::TypeRegistry;

/// How the target spells an out-of-line node function invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStyle {
    /// `fn(args..., result);` with the result as a trailing out-parameter.
    OutputParam,
    /// `type result = fn(args...);`
    ReturnValue,
}

/// Shared, immutable registries a generator draws on. Built once during
/// initialization; generation never mutates it, so independent generate
/// calls can share a setup across threads.
pub struct GeneratorSetup {
    pub types: Arc<TypeRegistry>,
    pub impls: Arc<ImplRegistry>,
    pub colors: Arc<dyn ColorSystem>,
}

pub trait ShaderGenerator: Send + Sync {
    /// Target identifier used for nodedef and implementation selection.
    fn target(&self) -> &'static str;

    fn syntax(&self) -> &dyn Syntax;

    fn setup(&self) -> &GeneratorSetup;

    fn call_style(&self) -> CallStyle {
        CallStyle::OutputParam
    }

    /// Generate a shader for the given root element.
    fn generate(
        &self,
        name: &str,
        root: GenElement,
        doc: &Document,
        ctx: &mut GenContext,
    ) -> Result<Shader>;
}

/// Build and finalize the shader graph for a generator.
pub fn build_graph(
    gen: &dyn ShaderGenerator,
    name: &str,
    root: GenElement,
    doc: &Document,
    ctx: &mut GenContext,
) -> Result<ShaderGraph> {
    let setup = gen.setup();
    let options = ctx.options().clone();
    let env = BuildEnv {
        doc,
        target: gen.target(),
        types: &setup.types,
        impls: &setup.impls,
        colors: setup.colors.as_ref(),
        syntax: gen.syntax(),
        options: &options,
    };
    ShaderGraph::build(name, root, &env, ctx)
}

/// The expression text for reading an input: the upstream result variable
/// when connected (override redirects and renames applied), else the
/// spelled literal value, else the type's default.
pub fn input_expr(
    gen: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    input: InputRef,
    ctx: &GenContext,
) -> String {
    let port = graph.input_port(input);
    let connection = ctx.redirect_for(input).or(port.connection);
    match connection {
        Some(conn) => output_var(gen, graph, conn, ctx),
        None => match &port.value {
            Some(v) => gen.syntax().value(&port.ty, v, false),
            None => gen.syntax().default_value(&port.ty, false),
        },
    }
}

/// The variable name an output writes to, override renames applied.
pub fn output_var(
    gen: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    output: OutputRef,
    ctx: &GenContext,
) -> String {
    let _ = gen;
    match ctx.rename_for(output) {
        Some(name) => name.to_string(),
        None => graph.output_port(output).variable.clone(),
    }
}

/// Convenience: the expression for a named input of a node.
pub fn named_input_expr(
    gen: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    node: NodeId,
    input: &str,
    ctx: &GenContext,
) -> Result<String> {
    let n = graph.node(node);
    let (port, _) = n
        .input(input)
        .ok_or_else(|| GenError::missing_input(&n.name, input))?;
    Ok(input_expr(gen, graph, InputRef { node, port }, ctx))
}

/// Declare a node's outputs, initialized to their type defaults.
pub fn emit_output_declarations(
    gen: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    node: NodeId,
    ctx: &GenContext,
    stage: &mut ShaderStage,
) {
    let n = graph.node(node);
    for (port, output) in n.outputs.iter().enumerate() {
        let var = output_var(gen, graph, OutputRef { node, port }, ctx);
        let ty = gen.syntax().type_name(&output.ty);
        let default = gen.syntax().default_value(&output.ty, false);
        stage.statement(&format!("{ty} {var} = {default}"));
    }
}

/// Emit a node's function call once, skipping branch-scoped nodes (their
/// conditional emits them inside its branches).
pub fn emit_node_call(
    gen: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    node: NodeId,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
) -> Result<()> {
    if graph.node(node).referenced_conditionally() {
        return Ok(());
    }
    emit_node_call_in_scope(gen, graph, node, ctx, stage)
}

/// Emit a node's function call once, regardless of scope. Used by
/// conditional implementations inside their branch blocks.
pub fn emit_node_call_in_scope(
    gen: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    node: NodeId,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
) -> Result<()> {
    let first = OutputRef { node, port: 0 };
    if ctx.is_emitted(first) {
        return Ok(());
    }
    let n = graph.node(node);
    for port in 0..n.outputs.len() {
        ctx.mark_emitted(OutputRef { node, port });
    }
    let imp = n
        .imp
        .clone()
        .ok_or_else(|| GenError::internal(&format!("node '{}' has no implementation", n.name)))?;
    imp.emit_function_call(gen, graph, node, ctx, stage)
}

/// Demand-driven closure emission: closure composition nodes pull their
/// children through here before combining them.
pub fn emit_closure_node(
    gen: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    node: NodeId,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
) -> Result<()> {
    emit_node_call_in_scope(gen, graph, node, ctx, stage)
}

/// Emit the upstream closure tree feeding an input, returning the
/// expression for its result. Unconnected inputs degrade to the type's
/// default (zero) value.
pub fn emit_closure_tree(
    gen: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    input: InputRef,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
) -> Result<String> {
    let port = graph.input_port(input);
    let connection = ctx.redirect_for(input).or(port.connection);
    match connection {
        Some(conn) if conn.node != NodeId::GRAPH => {
            emit_closure_node(gen, graph, conn.node, ctx, stage)?;
            Ok(output_var(gen, graph, conn, ctx))
        }
        Some(conn) => Ok(output_var(gen, graph, conn, ctx)),
        None => Ok(gen.syntax().default_value(&port.ty, false)),
    }
}

/// Call `create_variables` for every node, in dependency order, exactly
/// once. Declarations land before any code emission.
pub fn create_all_variables(
    gen: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    ctx: &mut GenContext,
    shader: &mut Shader,
) -> Result<()> {
    for &id in graph.sorted_nodes() {
        if let Some(imp) = graph.node(id).imp.clone() {
            imp.create_variables(gen, graph, id, ctx, shader)?;
        }
    }
    Ok(())
}

/// Emit every out-of-line function definition referenced by the graph,
/// each exactly once per stage (deduplicated by function name).
pub fn emit_function_definitions(
    gen: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
) -> Result<()> {
    for &id in graph.sorted_nodes() {
        if let Some(imp) = graph.node(id).imp.clone() {
            imp.emit_function_definition(gen, graph, id, ctx, stage)?;
        }
    }
    Ok(())
}

/// Emit function calls for the whole graph in dependency order.
/// Branch-scoped nodes are skipped here and emitted by their conditional;
/// closure nodes can be skipped for targets where a surface shader node
/// drives their emission per evaluation purpose.
pub fn emit_graph_body(
    gen: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
    skip: Classification,
) -> Result<()> {
    for &id in graph.sorted_nodes() {
        if !skip.is_empty() && graph.node(id).classification.intersects(skip) {
            continue;
        }
        emit_node_call(gen, graph, id, ctx, stage)?;
    }
    Ok(())
}

/// Check stage scope balance after generation.
pub fn validate_stages(shader: &Shader) -> Result<()> {
    for name in shader.stage_names() {
        let stage = shader.stage(name).expect("stage listed but missing");
        if !stage.scopes_balanced() {
            return Err(GenError::internal(&format!(
                "stage '{name}' has unbalanced scopes"
            )));
        }
    }
    Ok(())
}
