//! The shader generation graph.
//!
//! Built once per generate call from a root document element. After the
//! build, the graph is self-contained: emission never goes back to the
//! document. The build resolves nodedefs, instantiates ports, wires
//! connections, inserts color transforms, folds constants, sorts
//! topologically, computes conditional scopes and assigns variable names.

pub mod node;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::colorspace::ColorSystem;
use crate::context::GenContext;
use crate::document::{Document, Node, NodeDef, NodeGraph, OutputElem};
use crate::error::{GenError, Result};
use crate::options::GenOptions;
use crate::registry::{ImplRegistry, ImplResolution};
use crate::syntax::Syntax;
use crate::types::{TypeRegistry, TypeSemantic};
use crate::value::Value;

use self::node::{
    Classification, InputRef, NodeId, OutputRef, ScopeInfo, ScopeKind, ShaderInput, ShaderNode,
    ShaderOutput,
};

/// Everything the graph builder needs from the generator setup.
pub struct BuildEnv<'a> {
    pub doc: &'a Document,
    pub target: &'a str,
    pub types: &'a TypeRegistry,
    pub impls: &'a ImplRegistry,
    pub colors: &'a dyn ColorSystem,
    pub syntax: &'a dyn Syntax,
    pub options: &'a GenOptions,
}

/// A root element shader generation can start from.
#[derive(Debug, Clone, Copy)]
pub enum GenElement<'a> {
    /// A free-standing output tapping a node.
    Output(&'a OutputElem),
    /// A material or shader node.
    Node(&'a Node),
    /// A node graph; all its outputs become terminal outputs.
    Graph(&'a NodeGraph),
}

/// Where node-name references resolve during a build.
#[derive(Clone, Copy)]
enum NodeScope<'a> {
    Document(&'a Document),
    Graph(&'a NodeGraph),
}

impl<'a> NodeScope<'a> {
    fn doc_node(&self, name: &str) -> Option<&'a Node> {
        match self {
            NodeScope::Document(d) => d.node(name),
            NodeScope::Graph(g) => g.node(name),
        }
    }
}

pub struct ShaderGraph {
    name: String,
    nodes: Vec<ShaderNode>,
    lookup: HashMap<String, NodeId>,
    /// Topological after finalize; insertion order before.
    node_order: Vec<NodeId>,
    /// Graph interface inputs; they feed interior nodes, so they behave
    /// as outputs. Addressed as `OutputRef { node: NodeId::GRAPH, .. }`.
    input_sockets: Vec<ShaderOutput>,
    /// Terminal outputs; they are fed by interior nodes, so they behave
    /// as inputs. Addressed as `InputRef { node: NodeId::GRAPH, .. }`.
    output_sockets: Vec<ShaderInput>,
    classification: Classification,
    /// (input, source color space) pairs recorded during the build.
    pending_input_transforms: Vec<(InputRef, String)>,
    /// (output, source color space) pairs for file texture results.
    pending_output_transforms: Vec<(OutputRef, String)>,
}

impl ShaderGraph {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: Vec::new(),
            lookup: HashMap::new(),
            node_order: Vec::new(),
            input_sockets: Vec::new(),
            output_sockets: Vec::new(),
            classification: Classification::empty(),
            pending_input_transforms: Vec::new(),
            pending_output_transforms: Vec::new(),
        }
    }

    /// Build a graph from a root element and finalize it for emission.
    pub fn build(
        name: &str,
        root: GenElement,
        env: &BuildEnv,
        ctx: &mut GenContext,
    ) -> Result<ShaderGraph> {
        Self::build_internal(name, root, env, ctx, false)
    }

    /// Build a compound implementation graph. Its interface is exactly
    /// the nodedef's declared sockets: internal values are spelled
    /// inline rather than published, keeping the generated function
    /// signature aligned with the node's call site.
    pub fn build_compound(
        name: &str,
        root: GenElement,
        env: &BuildEnv,
        ctx: &mut GenContext,
    ) -> Result<ShaderGraph> {
        Self::build_internal(name, root, env, ctx, true)
    }

    fn build_internal(
        name: &str,
        root: GenElement,
        env: &BuildEnv,
        ctx: &mut GenContext,
        lock_interface: bool,
    ) -> Result<ShaderGraph> {
        let mut graph = Self::empty(name);
        let mut in_progress = HashSet::new();

        match root {
            GenElement::Output(out) => {
                let scope = NodeScope::Document(env.doc);
                let ty = env.types.get(&out.ty)?;
                let socket = graph.add_output_socket(&out.name, ty);
                let node_name = out.node.as_deref().ok_or_else(|| {
                    GenError::document(&format!("output '{}' references no node", out.name))
                })?;
                let doc_node = scope.doc_node(node_name).ok_or_else(|| {
                    GenError::document(&format!(
                        "output '{}' references unknown node '{node_name}'",
                        out.name
                    ))
                })?;
                let id = graph.build_doc_node(doc_node, scope, env, ctx, &mut in_progress)?;
                let port = graph.resolve_output_port(id, out.output.as_deref())?;
                graph.make_connection(
                    OutputRef { node: id, port },
                    InputRef { node: NodeId::GRAPH, port: socket },
                    env.syntax,
                )?;
            }
            GenElement::Node(doc_node) => {
                let scope = NodeScope::Document(env.doc);
                let nodedef = env.doc.resolve_nodedef(doc_node, env.target)?;
                let out_ports: Vec<(String, String)> = if nodedef.outputs.is_empty() {
                    vec![("out".to_string(), doc_node.ty.clone())]
                } else {
                    nodedef
                        .outputs
                        .iter()
                        .map(|o| (o.name.clone(), o.ty.clone()))
                        .collect()
                };
                let id = graph.build_doc_node(doc_node, scope, env, ctx, &mut in_progress)?;
                for (port, (sock_name, sock_ty)) in out_ports.iter().enumerate() {
                    let ty = env.types.get(sock_ty)?;
                    let socket = graph.add_output_socket(sock_name, ty);
                    graph.make_connection(
                        OutputRef { node: id, port },
                        InputRef { node: NodeId::GRAPH, port: socket },
                        env.syntax,
                    )?;
                }
            }
            GenElement::Graph(ng) => {
                graph.build_graph_interior(ng, env, ctx, &mut in_progress)?;
            }
        }

        graph.finalize(env, ctx, lock_interface)?;
        Ok(graph)
    }

    /// Build the interior of a node graph: interface sockets from its
    /// nodedef (when bound), terminal outputs, and all reachable nodes.
    fn build_graph_interior(
        &mut self,
        ng: &NodeGraph,
        env: &BuildEnv,
        ctx: &mut GenContext,
        in_progress: &mut HashSet<String>,
    ) -> Result<()> {
        let scope = NodeScope::Graph(ng);

        if let Some(def_name) = ng.nodedef.as_deref() {
            let def = env.doc.nodedef(def_name).ok_or_else(|| {
                GenError::document(&format!(
                    "nodegraph '{}' references unknown nodedef '{def_name}'",
                    ng.name
                ))
            })?;
            for pd in &def.inputs {
                let ty = env.types.get(&pd.ty)?;
                let idx = self.add_input_socket(&pd.name, ty);
                if let Some(text) = &pd.value {
                    self.input_sockets[idx].value = Some(Value::parse(&pd.ty, text)?);
                }
            }
        }

        for out in &ng.outputs {
            let ty = env.types.get(&out.ty)?;
            self.add_output_socket(&out.name, ty);
        }
        for (socket, out) in ng.outputs.iter().enumerate() {
            let Some(node_name) = out.node.as_deref() else {
                continue;
            };
            let doc_node = scope.doc_node(node_name).ok_or_else(|| {
                GenError::document(&format!(
                    "output '{}' references unknown node '{node_name}' in graph '{}'",
                    out.name, ng.name
                ))
            })?;
            let id = self.build_doc_node(doc_node, scope, env, ctx, in_progress)?;
            let port = self.resolve_output_port(id, out.output.as_deref())?;
            self.make_connection(
                OutputRef { node: id, port },
                InputRef { node: NodeId::GRAPH, port: socket },
                env.syntax,
            )?;
        }
        Ok(())
    }

    /// Create the shader node for a document node, recursing upstream.
    ///
    /// A node revisited while still being built closes a dependency cycle.
    fn build_doc_node(
        &mut self,
        doc_node: &Node,
        scope: NodeScope,
        env: &BuildEnv,
        ctx: &mut GenContext,
        in_progress: &mut HashSet<String>,
    ) -> Result<NodeId> {
        if let Some(&id) = self.lookup.get(&doc_node.name) {
            if in_progress.contains(&doc_node.name) {
                return Err(GenError::cycle(&self.name));
            }
            return Ok(id);
        }

        let nodedef = env.doc.resolve_nodedef(doc_node, env.target)?;
        let classification = classify(nodedef, doc_node);

        let mut sh_node = ShaderNode::new(&doc_node.name, &doc_node.category, classification);
        for pd in &nodedef.inputs {
            let ty = env.types.get(&pd.ty)?;
            let idx = sh_node.add_input(&pd.name, ty);
            sh_node.inputs[idx].uniform = pd.uniform;
            if let Some(text) = &pd.value {
                sh_node.inputs[idx].value = Some(Value::parse(&pd.ty, text)?);
            }
        }
        if nodedef.outputs.is_empty() {
            let ty_name = if doc_node.ty.is_empty() { "float" } else { &doc_node.ty };
            sh_node.add_output("out", env.types.get(ty_name)?);
        } else {
            for pd in &nodedef.outputs {
                sh_node.add_output(&pd.name, env.types.get(&pd.ty)?);
            }
        }

        sh_node.imp = Some(self.resolve_implementation(nodedef, env, ctx)?);

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(sh_node);
        self.lookup.insert(doc_node.name.clone(), id);
        self.node_order.push(id);
        in_progress.insert(doc_node.name.clone());

        for binding in &doc_node.inputs {
            let Some((idx, port)) = self.nodes[id.index()].input(&binding.name) else {
                return Err(GenError::invalid_node(
                    &doc_node.name,
                    &doc_node.category,
                    &format!("no input named '{}'", binding.name),
                ));
            };
            let port_ty_name = port.ty.name().to_string();
            let port_uniform = port.uniform;
            let input_ref = InputRef { node: id, port: idx };

            if let Some(text) = &binding.value {
                let value = Value::parse(&port_ty_name, text)?;
                self.nodes[id.index()].inputs[idx].value = Some(value);
                if let Some(space) = &binding.colorspace {
                    self.record_input_colorspace(input_ref, space, env);
                }
            }

            if let Some(upstream_name) = &binding.node {
                if port_uniform {
                    return Err(GenError::invalid_node(
                        &doc_node.name,
                        &doc_node.category,
                        &format!("uniform input '{}' cannot take a connection", binding.name),
                    ));
                }
                let up_doc = scope.doc_node(upstream_name).ok_or_else(|| {
                    GenError::document(&format!(
                        "node '{}' connects to unknown node '{upstream_name}'",
                        doc_node.name
                    ))
                })?;
                let up_id = self.build_doc_node(up_doc, scope, env, ctx, in_progress)?;
                let up_port = self.resolve_output_port(up_id, binding.output.as_deref())?;
                self.make_connection(
                    OutputRef { node: up_id, port: up_port },
                    input_ref,
                    env.syntax,
                )?;
            } else if let Some(interface) = &binding.interface {
                let ty = self.nodes[id.index()].inputs[idx].ty.clone();
                let socket = match self.input_socket_index(interface) {
                    Some(s) => s,
                    None => self.add_input_socket(interface, ty),
                };
                self.make_connection(
                    OutputRef { node: NodeId::GRAPH, port: socket },
                    input_ref,
                    env.syntax,
                )?;
            }
        }

        // A file texture whose image carries a foreign color space gets its
        // result transformed, not its parameters.
        if self.nodes[id.index()].has_classification(Classification::FILETEXTURE) {
            if let Some(space) = doc_node
                .input("file")
                .and_then(|b| b.colorspace.clone())
            {
                let out_ty = self.nodes[id.index()].outputs[0].ty.clone();
                if out_ty.semantic() == TypeSemantic::Color {
                    self.record_output_colorspace(OutputRef { node: id, port: 0 }, &space, env);
                }
            }
        }

        in_progress.remove(&doc_node.name);
        Ok(id)
    }

    fn record_input_colorspace(&mut self, input: InputRef, space: &str, env: &BuildEnv) {
        let ty = self.input_port(input).ty.clone();
        if ty.semantic() == TypeSemantic::Color && space != self.working_colorspace(env) {
            self.pending_input_transforms.push((input, space.to_string()));
        }
    }

    fn record_output_colorspace(&mut self, output: OutputRef, space: &str, env: &BuildEnv) {
        if space != self.working_colorspace(env) {
            self.pending_output_transforms.push((output, space.to_string()));
        }
    }

    fn working_colorspace(&self, env: &BuildEnv) -> String {
        env.options
            .target_color_space
            .clone()
            .or_else(|| env.doc.colorspace.clone())
            .unwrap_or_else(|| "lin_rec709".to_string())
    }

    /// Resolve an implementation for a nodedef, building compound
    /// sub-graphs as needed. The lookup priority lives in the registry.
    fn resolve_implementation(
        &mut self,
        nodedef: &NodeDef,
        env: &BuildEnv,
        ctx: &mut GenContext,
    ) -> Result<Arc<dyn crate::registry::NodeImpl>> {
        match env.impls.find(env.doc, nodedef, env.target)? {
            ImplResolution::Registered(imp) => Ok(imp),
            ImplResolution::SourceTemplate(elem) => Ok(Arc::new(
                crate::nodes::source_code::SourceCodeImpl::from_element(nodedef, &elem)?,
            )),
            ImplResolution::Compound(graph_name) => {
                let ng = env.doc.nodegraph(&graph_name).ok_or_else(|| {
                    GenError::document(&format!(
                        "nodedef '{}' references unknown nodegraph '{graph_name}'",
                        nodedef.name
                    ))
                })?;
                let sub = ShaderGraph::build_compound(&ng.name, GenElement::Graph(ng), env, ctx)?;
                Ok(Arc::new(crate::nodes::compound::CompoundImpl::new(sub)))
            }
        }
    }

    fn resolve_output_port(&self, id: NodeId, name: Option<&str>) -> Result<usize> {
        let node = self.node(id);
        match name {
            None | Some("") => Ok(0),
            Some(n) => node.output(n).map(|(i, _)| i).ok_or_else(|| {
                GenError::invalid_node(&node.name, &node.category, &format!("no output named '{n}'"))
            }),
        }
    }

    // ── Port plumbing ──────────────────────────────────────────────────

    pub fn add_input_socket(&mut self, name: &str, ty: crate::types::TypeRef) -> usize {
        self.input_sockets.push(ShaderOutput {
            name: name.to_string(),
            ty,
            connections: Vec::new(),
            variable: String::new(),
            value: None,
        });
        self.input_sockets.len() - 1
    }

    pub fn add_output_socket(&mut self, name: &str, ty: crate::types::TypeRef) -> usize {
        self.output_sockets.push(ShaderInput {
            name: name.to_string(),
            ty,
            value: None,
            connection: None,
            variable: String::new(),
            uniform: false,
        });
        self.output_sockets.len() - 1
    }

    pub fn input_socket_index(&self, name: &str) -> Option<usize> {
        self.input_sockets.iter().position(|s| s.name == name)
    }

    pub fn input_sockets(&self) -> &[ShaderOutput] {
        &self.input_sockets
    }

    pub fn output_sockets(&self) -> &[ShaderInput] {
        &self.output_sockets
    }

    /// The output port an `OutputRef` names, graph sockets included.
    pub fn output_port(&self, r: OutputRef) -> &ShaderOutput {
        if r.node == NodeId::GRAPH {
            &self.input_sockets[r.port]
        } else {
            &self.nodes[r.node.index()].outputs[r.port]
        }
    }

    fn output_port_mut(&mut self, r: OutputRef) -> &mut ShaderOutput {
        if r.node == NodeId::GRAPH {
            &mut self.input_sockets[r.port]
        } else {
            &mut self.nodes[r.node.index()].outputs[r.port]
        }
    }

    /// The input port an `InputRef` names, graph sockets included.
    pub fn input_port(&self, r: InputRef) -> &ShaderInput {
        if r.node == NodeId::GRAPH {
            &self.output_sockets[r.port]
        } else {
            &self.nodes[r.node.index()].inputs[r.port]
        }
    }

    fn input_port_mut(&mut self, r: InputRef) -> &mut ShaderInput {
        if r.node == NodeId::GRAPH {
            &mut self.output_sockets[r.port]
        } else {
            &mut self.nodes[r.node.index()].inputs[r.port]
        }
    }

    /// Wire an output to an input, enforcing type compatibility.
    pub fn make_connection(
        &mut self,
        from: OutputRef,
        to: InputRef,
        syntax: &dyn Syntax,
    ) -> Result<()> {
        let from_ty = self.output_port(from).ty.clone();
        let to_ty = self.input_port(to).ty.clone();
        if from_ty.name() != to_ty.name() && !syntax.allows_connection(&from_ty, &to_ty) {
            return Err(GenError::type_mismatch(
                &self.port_label_out(from),
                from_ty.name(),
                &self.port_label_in(to),
                to_ty.name(),
            ));
        }
        self.break_connection(to);
        self.input_port_mut(to).connection = Some(from);
        self.output_port_mut(from).connections.push(to);
        Ok(())
    }

    pub fn break_connection(&mut self, to: InputRef) {
        if let Some(from) = self.input_port_mut(to).connection.take() {
            self.output_port_mut(from).connections.retain(|c| *c != to);
        }
    }

    fn port_label_out(&self, r: OutputRef) -> String {
        if r.node == NodeId::GRAPH {
            self.input_sockets[r.port].name.clone()
        } else {
            let n = self.node(r.node);
            format!("{}.{}", n.name, n.outputs[r.port].name)
        }
    }

    fn port_label_in(&self, r: InputRef) -> String {
        if r.node == NodeId::GRAPH {
            self.output_sockets[r.port].name.clone()
        } else {
            let n = self.node(r.node);
            format!("{}.{}", n.name, n.inputs[r.port].name)
        }
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self, id: NodeId) -> &ShaderNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut ShaderNode {
        &mut self.nodes[id.index()]
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.lookup.get(name).copied()
    }

    /// Node ids in emission (topological) order.
    pub fn sorted_nodes(&self) -> &[NodeId] {
        &self.node_order
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn has_classification(&self, c: Classification) -> bool {
        self.classification.contains(c)
    }

    /// True if any node in the graph matches the classification.
    pub fn contains_classification(&self, c: Classification) -> bool {
        self.node_order
            .iter()
            .any(|id| self.node(*id).has_classification(c))
    }

    /// Nodes emitted inside a specific branch of a conditional, in order.
    pub fn nodes_scoped_to(&self, conditional: NodeId, branch: u32) -> Vec<NodeId> {
        self.node_order
            .iter()
            .copied()
            .filter(|id| {
                let s = &self.node(*id).scope;
                s.kind == ScopeKind::Single
                    && s.conditional == Some(conditional)
                    && s.used_by_branch(branch)
            })
            .collect()
    }

    // ── Finalize ───────────────────────────────────────────────────────

    fn finalize(&mut self, env: &BuildEnv, ctx: &mut GenContext, lock_interface: bool) -> Result<()> {
        self.insert_color_transforms(env, ctx)?;
        self.optimize();
        if !lock_interface {
            match env.options.shader_interface {
                crate::options::ShaderInterface::Complete => self.publish_interface(false),
                crate::options::ShaderInterface::Reduced => {
                    self.insert_value_constants(env);
                    // Samplers can only be bound as uniforms, so filename
                    // inputs are published regardless of interface mode.
                    self.publish_interface(true);
                }
            }
        }
        self.topological_sort()?;
        self.calculate_scopes();
        self.collect_used_closures();
        self.set_variable_names(env.syntax);

        if let Some(conn) = self.output_sockets.first().and_then(|s| s.connection) {
            if conn.node != NodeId::GRAPH {
                self.classification |= self.node(conn.node).classification;
            }
        }
        Ok(())
    }

    /// Insert color transform nodes recorded during the build.
    ///
    /// This is the single place the strict-transform option is consulted:
    /// non-strict falls back to passing the raw value through with a
    /// warning, strict mode fails the build.
    fn insert_color_transforms(&mut self, env: &BuildEnv, ctx: &mut GenContext) -> Result<()> {
        let target_space = self.working_colorspace(env);

        let input_transforms = std::mem::take(&mut self.pending_input_transforms);
        for (input, from_space) in input_transforms {
            let ty = self.input_port(input).ty.clone();
            let Some(source) =
                env.colors
                    .transform_source(&from_space, &target_space, &ty, env.target)
            else {
                if env.options.strict_color_transforms {
                    return Err(GenError::ColorSpace {
                        from: from_space,
                        to: target_space,
                        ty: ty.name().to_string(),
                    });
                }
                ctx.add_warning(format!(
                    "no color transform from '{from_space}' to '{target_space}'; passing value through"
                ));
                continue;
            };

            let consumer = self.node(input.node);
            let cm_name = format!("{}_{}_cm", consumer.name, consumer.inputs[input.port].name);
            let value = self.input_port(input).value.clone();

            let mut cm = ShaderNode::new(
                &cm_name,
                "colortransform",
                Classification::TEXTURE
                    | Classification::COLOR_SPACE_TRANSFORM
                    | Classification::DO_NOT_OPTIMIZE,
            );
            cm.add_input("in", ty.clone());
            cm.inputs[0].value = value;
            cm.add_output("out", ty);
            cm.imp = Some(Arc::new(source.into_impl()));

            let cm_id = NodeId(self.nodes.len() as u32);
            self.nodes.push(cm);
            self.lookup.insert(cm_name, cm_id);
            self.node_order.push(cm_id);

            self.input_port_mut(input).value = None;
            self.make_connection(OutputRef { node: cm_id, port: 0 }, input, env.syntax)?;
        }

        let output_transforms = std::mem::take(&mut self.pending_output_transforms);
        for (output, from_space) in output_transforms {
            let ty = self.output_port(output).ty.clone();
            let Some(source) =
                env.colors
                    .transform_source(&from_space, &target_space, &ty, env.target)
            else {
                if env.options.strict_color_transforms {
                    return Err(GenError::ColorSpace {
                        from: from_space,
                        to: target_space,
                        ty: ty.name().to_string(),
                    });
                }
                ctx.add_warning(format!(
                    "no color transform from '{from_space}' to '{target_space}'; passing result through"
                ));
                continue;
            };

            let producer = self.node(output.node);
            let cm_name = format!("{}_{}_cm", producer.name, producer.outputs[output.port].name);

            let mut cm = ShaderNode::new(
                &cm_name,
                "colortransform",
                Classification::TEXTURE
                    | Classification::COLOR_SPACE_TRANSFORM
                    | Classification::DO_NOT_OPTIMIZE,
            );
            cm.add_input("in", ty.clone());
            cm.add_output("out", ty);
            cm.imp = Some(Arc::new(source.into_impl()));

            let cm_id = NodeId(self.nodes.len() as u32);
            self.nodes.push(cm);
            self.lookup.insert(cm_name, cm_id);
            self.node_order.push(cm_id);

            // Reroute all downstream consumers to the transform result.
            let downstream = self.output_port(output).connections.clone();
            for consumer in downstream {
                self.break_connection(consumer);
                self.make_connection(OutputRef { node: cm_id, port: 0 }, consumer, env.syntax)?;
            }
            self.make_connection(output, InputRef { node: cm_id, port: 0 }, env.syntax)?;
        }

        Ok(())
    }

    /// Remove redundant paths: fold constants downstream and elide
    /// statically decided conditionals, then prune unreachable nodes.
    fn optimize(&mut self) {
        let mut edits = 0usize;
        for id in self.node_order.clone() {
            let node = self.node(id);
            if node.has_classification(Classification::DO_NOT_OPTIMIZE) {
                continue;
            }
            if node.has_classification(Classification::CONSTANT) {
                // A constant with an unconnected value input folds into its
                // consumers. A connected one is published and must stay.
                if node.inputs.first().map(|i| i.connection.is_none()).unwrap_or(false) {
                    self.bypass(id, 0);
                    edits += 1;
                }
            } else if node.has_classification(Classification::IFELSE) {
                if let Some(branch_input) = self.static_compare_branch(id) {
                    self.bypass(id, branch_input);
                    edits += 1;
                }
            } else if node.has_classification(Classification::SWITCH) {
                if let Some(branch_input) = self.static_switch_branch(id) {
                    self.bypass(id, branch_input);
                    edits += 1;
                }
            }
        }
        if edits > 0 {
            self.prune_unreachable();
        }
    }

    /// The taken branch input of a compare node whose condition is static.
    fn static_compare_branch(&self, id: NodeId) -> Option<usize> {
        let node = self.node(id);
        let (intest_idx, intest) = node.input("intest")?;
        let (_, cutoff) = node.input("cutoff")?;
        let intest_value = match intest.connection {
            None => intest.value.clone(),
            Some(conn) if conn.node != NodeId::GRAPH => {
                let upstream = self.node(conn.node);
                if !upstream.has_classification(Classification::CONSTANT) {
                    return None;
                }
                upstream.inputs.first().and_then(|i| i.value.clone())
            }
            Some(_) => return None,
        };
        let _ = intest_idx;
        let intest_value = intest_value.and_then(|v| v.as_float()).unwrap_or(0.0);
        let cutoff_value = cutoff.value.as_ref().and_then(|v| v.as_float()).unwrap_or(0.0);
        let branch_name = if intest_value <= cutoff_value { "in1" } else { "in2" };
        node.input(branch_name).map(|(i, _)| i)
    }

    /// The taken branch input of a switch node whose selector is static.
    fn static_switch_branch(&self, id: NodeId) -> Option<usize> {
        let node = self.node(id);
        let (_, which) = node.input("which")?;
        let which_value = match which.connection {
            None => which.value.clone(),
            Some(conn) if conn.node != NodeId::GRAPH => {
                let upstream = self.node(conn.node);
                if !upstream.has_classification(Classification::CONSTANT) {
                    return None;
                }
                upstream.inputs.first().and_then(|i| i.value.clone())
            }
            Some(_) => return None,
        };
        let selected = which_value.and_then(|v| v.as_integer()).unwrap_or(0).max(0) as usize;
        let branch_count = node
            .inputs
            .iter()
            .filter(|i| branch_input_index(&i.name).is_some())
            .count();
        let selected = selected.min(branch_count.saturating_sub(1));
        node.input(&format!("in{}", selected + 1)).map(|(i, _)| i)
    }

    /// Re-route around a node: its consumers take either the upstream
    /// connection or the literal value of the given input.
    fn bypass(&mut self, id: NodeId, input_index: usize) {
        let input = self.nodes[id.index()].inputs[input_index].clone();
        let downstream = self.nodes[id.index()].outputs[0].connections.clone();
        match input.connection {
            Some(upstream) => {
                for consumer in downstream {
                    self.break_connection(consumer);
                    self.input_port_mut(consumer).connection = Some(upstream);
                    self.output_port_mut(upstream).connections.push(consumer);
                }
            }
            None => {
                for consumer in downstream {
                    self.break_connection(consumer);
                    self.input_port_mut(consumer).value = input.value.clone();
                }
            }
        }
    }

    fn prune_unreachable(&mut self) {
        let mut used: HashSet<NodeId> = HashSet::new();
        let mut stack: Vec<NodeId> = self
            .output_sockets
            .iter()
            .filter_map(|s| s.connection)
            .filter(|c| c.node != NodeId::GRAPH)
            .map(|c| c.node)
            .collect();
        while let Some(id) = stack.pop() {
            if !used.insert(id) {
                continue;
            }
            for input in &self.nodes[id.index()].inputs {
                if let Some(conn) = input.connection {
                    if conn.node != NodeId::GRAPH {
                        stack.push(conn.node);
                    }
                }
            }
        }

        let removed: Vec<NodeId> = self
            .node_order
            .iter()
            .copied()
            .filter(|id| !used.contains(id))
            .collect();
        for id in removed {
            let inputs = self.nodes[id.index()].inputs.len();
            for port in 0..inputs {
                self.break_connection(InputRef { node: id, port });
            }
            let outputs = self.nodes[id.index()].outputs.len();
            for port in 0..outputs {
                let consumers = self.nodes[id.index()].outputs[port].connections.clone();
                for c in consumers {
                    self.break_connection(c);
                }
            }
            self.lookup.remove(&self.nodes[id.index()].name.clone());
        }
        self.node_order.retain(|id| used.contains(id));
    }

    /// Publish every unconnected editable input as a graph input socket,
    /// using the `<node>_<input>` naming convention so applications can
    /// map uniforms back to document inputs.
    fn publish_interface(&mut self, filenames_only: bool) {
        for id in self.node_order.clone() {
            let input_count = self.nodes[id.index()].inputs.len();
            for port in 0..input_count {
                let node = &self.nodes[id.index()];
                let input = &node.inputs[port];
                if input.connection.is_some() || !input.ty.is_editable() {
                    continue;
                }
                // Uniform-flagged ports are baked into the generated
                // code, not exposed for per-draw editing.
                if input.uniform && input.ty.name() != "filename" {
                    continue;
                }
                if filenames_only && input.ty.name() != "filename" {
                    continue;
                }
                let editable = node
                    .imp
                    .as_ref()
                    .map(|i| i.is_editable(&input.name))
                    .unwrap_or(true);
                if !editable {
                    continue;
                }
                let socket_name = format!("{}_{}", node.name, input.name);
                let ty = input.ty.clone();
                let value = input.value.clone();
                let socket = match self.input_socket_index(&socket_name) {
                    Some(s) => s,
                    None => {
                        let s = self.add_input_socket(&socket_name, ty);
                        self.input_sockets[s].value = value;
                        s
                    }
                };
                let to = InputRef { node: id, port };
                self.input_port_mut(to).connection = Some(OutputRef {
                    node: NodeId::GRAPH,
                    port: socket,
                });
                self.input_sockets[socket].connections.push(to);
            }
        }
    }

    /// Reduced interface mode: make non-trivial literal values explicit
    /// as constant nodes, so implementations see values and connections
    /// uniformly.
    fn insert_value_constants(&mut self, env: &BuildEnv) {
        for id in self.node_order.clone() {
            let input_count = self.nodes[id.index()].inputs.len();
            for port in 0..input_count {
                let node = &self.nodes[id.index()];
                if node.has_classification(Classification::CONSTANT) {
                    break;
                }
                let input = &node.inputs[port];
                if input.connection.is_some() || input.uniform {
                    continue;
                }
                let Some(value) = input.value.clone() else {
                    continue;
                };
                if !input.ty.is_editable() || value.is_zero() {
                    continue;
                }
                let const_name = format!("{}_{}_value", node.name, input.name);
                let ty = input.ty.clone();

                let mut c = ShaderNode::new(
                    &const_name,
                    "constant",
                    Classification::TEXTURE
                        | Classification::CONSTANT
                        | Classification::DO_NOT_OPTIMIZE,
                );
                c.add_input("value", ty.clone());
                c.inputs[0].value = Some(value);
                c.add_output("out", ty);
                c.imp = Some(Arc::new(crate::nodes::source_code::SourceCodeImpl::inline(
                    "{{value}}",
                    vec!["value".to_string()],
                )));

                let c_id = NodeId(self.nodes.len() as u32);
                self.nodes.push(c);
                self.lookup.insert(const_name, c_id);
                self.node_order.push(c_id);

                let to = InputRef { node: id, port };
                self.input_port_mut(to).value = None;
                // Types are identical, no compatibility check needed.
                self.input_port_mut(to).connection = Some(OutputRef { node: c_id, port: 0 });
                self.nodes[c_id.index()].outputs[0].connections.push(to);
                let _ = env;
            }
        }
    }

    /// Kahn's algorithm. Also the backstop cycle check: any node left
    /// unordered sits on a cycle.
    fn topological_sort(&mut self) -> Result<()> {
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        let mut queue: std::collections::VecDeque<NodeId> = std::collections::VecDeque::new();

        for &id in &self.node_order {
            let count = self.nodes[id.index()]
                .inputs
                .iter()
                .filter(|i| matches!(i.connection, Some(c) if c.node != NodeId::GRAPH))
                .count();
            in_degree.insert(id, count);
            if count == 0 {
                queue.push_back(id);
            }
        }

        let mut order = Vec::with_capacity(self.node_order.len());
        while let Some(id) = queue.pop_front() {
            order.push(id);
            let consumers: Vec<NodeId> = self.nodes[id.index()]
                .outputs
                .iter()
                .flat_map(|o| o.connections.iter())
                .filter(|c| c.node != NodeId::GRAPH)
                .map(|c| c.node)
                .collect();
            for consumer in consumers {
                let d = in_degree.get_mut(&consumer).expect("consumer not in graph");
                *d -= 1;
                if *d == 0 {
                    queue.push_back(consumer);
                }
            }
        }

        if order.len() != self.node_order.len() {
            return Err(GenError::cycle(&self.name));
        }
        self.node_order = order;
        Ok(())
    }

    /// Compute conditional scopes with a reverse-topological reachability
    /// walk. Tags propagate upstream from each conditional's branch
    /// inputs; scopes union where paths meet.
    fn calculate_scopes(&mut self) {
        if self.node_order.is_empty() {
            return;
        }

        let mut used: HashSet<NodeId> = HashSet::new();
        let roots: Vec<NodeId> = self
            .output_sockets
            .iter()
            .filter_map(|s| s.connection)
            .filter(|c| c.node != NodeId::GRAPH)
            .map(|c| c.node)
            .collect();
        for root in roots {
            self.nodes[root.index()].scope.merge(&ScopeInfo::global());
            used.insert(root);
        }

        for idx in (0..self.node_order.len()).rev() {
            let id = self.node_order[idx];
            if !used.contains(&id) {
                continue;
            }
            let node = &self.nodes[id.index()];
            let is_ifelse = node.has_classification(Classification::IFELSE);
            let is_switch = node.has_classification(Classification::SWITCH);
            let current = node.scope.clone();
            let branch_count = node
                .inputs
                .iter()
                .filter(|i| branch_input_index(&i.name).is_some())
                .count() as u32;

            let mut merges: Vec<(NodeId, ScopeInfo)> = Vec::new();
            for input in &node.inputs {
                let Some(conn) = input.connection else { continue };
                if conn.node == NodeId::GRAPH {
                    continue;
                }
                let mut scope = current.clone();
                if let Some(branch) = branch_input_index(&input.name) {
                    if is_ifelse {
                        scope.adjust_at_conditional_input(id, branch, 0b11);
                    } else if is_switch {
                        let full = (1u32 << branch_count) - 1;
                        scope.adjust_at_conditional_input(id, branch, full);
                    }
                }
                merges.push((conn.node, scope));
            }
            for (upstream, scope) in merges {
                self.nodes[upstream.index()].scope.merge(&scope);
                used.insert(upstream);
            }
        }
    }

    /// Record the closure nodes feeding each shader-classified node.
    fn collect_used_closures(&mut self) {
        for id in self.node_order.clone() {
            if !self.node(id).has_classification(Classification::SHADER) {
                continue;
            }
            let mut seen: HashSet<NodeId> = HashSet::new();
            let mut stack: Vec<NodeId> = self.nodes[id.index()]
                .inputs
                .iter()
                .filter_map(|i| i.connection)
                .filter(|c| c.node != NodeId::GRAPH)
                .map(|c| c.node)
                .collect();
            while let Some(up) = stack.pop() {
                if !seen.insert(up) {
                    continue;
                }
                for input in &self.nodes[up.index()].inputs {
                    if let Some(conn) = input.connection {
                        if conn.node != NodeId::GRAPH {
                            stack.push(conn.node);
                        }
                    }
                }
            }
            let closures: HashSet<NodeId> = seen
                .into_iter()
                .filter(|n| self.node(*n).has_classification(Classification::CLOSURE))
                .collect();
            self.nodes[id.index()].used_closures = closures;
        }
    }

    /// Assign unique, language-valid variable names to every port.
    fn set_variable_names(&mut self, syntax: &dyn Syntax) {
        let mut unique: HashMap<String, usize> = HashMap::new();
        for socket in &mut self.input_sockets {
            let mut var = socket.name.clone();
            syntax.make_valid_name(&mut var);
            syntax.make_unique(&mut var, &mut unique);
            socket.variable = var;
        }
        for socket in &mut self.output_sockets {
            let mut var = socket.name.clone();
            syntax.make_valid_name(&mut var);
            syntax.make_unique(&mut var, &mut unique);
            socket.variable = var;
        }
        for &id in &self.node_order {
            let node = &mut self.nodes[id.index()];
            let node_name = node.name.clone();
            for output in &mut node.outputs {
                // Long names keep generated code readable.
                let mut var = format!("{}_{}", node_name, output.name);
                syntax.make_valid_name(&mut var);
                syntax.make_unique(&mut var, &mut unique);
                output.variable = var;
            }
            for input in &mut node.inputs {
                let mut var = format!("{}_{}", node_name, input.name);
                syntax.make_valid_name(&mut var);
                syntax.make_unique(&mut var, &mut unique);
                input.variable = var;
            }
        }
    }
}

/// Branch index for conditional inputs named `in1`, `in2`, ...
fn branch_input_index(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("in")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().map(|n| n.saturating_sub(1))
}

/// Classification from a nodedef's output type, node group and category.
fn classify(nodedef: &NodeDef, doc_node: &Node) -> Classification {
    let mut c = match nodedef.output_type() {
        "BSDF" => Classification::CLOSURE | Classification::BSDF,
        "EDF" => Classification::CLOSURE | Classification::EDF,
        "VDF" => Classification::CLOSURE | Classification::VDF,
        "surfaceshader" | "material" => Classification::SHADER | Classification::SURFACE,
        "volumeshader" => Classification::SHADER | Classification::VOLUME,
        "lightshader" => Classification::SHADER | Classification::LIGHT,
        _ => Classification::TEXTURE,
    };

    match doc_node.category.as_str() {
        "constant" => c |= Classification::CONSTANT,
        "compare" => c |= Classification::CONDITIONAL | Classification::IFELSE,
        "switch" => c |= Classification::CONDITIONAL | Classification::SWITCH,
        "image" | "tiledimage" => c |= Classification::FILETEXTURE,
        "layer" => c |= Classification::LAYER,
        "thin_film_bsdf" => c |= Classification::THINFILM,
        _ => {}
    }
    if nodedef.nodegroup == "conditional" {
        c |= Classification::CONDITIONAL;
    }

    if c.contains(Classification::BSDF) {
        let scatter_mode = doc_node
            .input("scatter_mode")
            .and_then(|b| b.value.clone())
            .or_else(|| {
                nodedef
                    .input("scatter_mode")
                    .and_then(|p| p.value.clone())
            })
            .unwrap_or_else(|| "R".to_string());
        if scatter_mode.contains('R') {
            c |= Classification::BSDF_R;
        }
        if scatter_mode.contains('T') {
            c |= Classification::BSDF_T;
        }
        if doc_node.category == "translucent_bsdf" || doc_node.category == "subsurface_bsdf" {
            c |= Classification::BSDF_T;
        }
    }

    c
}
