//! Node implementation registry.
//!
//! Maps (nodedef, target) to the strategy that emits a node: a registered
//! implementation object, an inline source template carried by the
//! nodedef, or a compound sub-graph. Built once by an explicit
//! initialization call and immutable during generation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::GenContext;
use crate::document::{Document, ImplElement, NodeDef};
use crate::error::{GenError, Result};
use crate::generator::ShaderGenerator;
use crate::graph::node::NodeId;
use crate::graph::ShaderGraph;
use crate::shader::{Shader, ShaderStage};

/// One implementation strategy for a node category on some target.
///
/// Side effects are strictly append-only on the given stage; state private
/// to other nodes is reachable only through the public port API.
pub trait NodeImpl: Send + Sync {
    /// Declare stage inputs/outputs/uniforms this node's emission will
    /// need. Called once per node before any code is emitted, so
    /// declarations always precede use.
    fn create_variables(
        &self,
        _gen: &dyn ShaderGenerator,
        _graph: &ShaderGraph,
        _node: NodeId,
        _ctx: &mut GenContext,
        _shader: &mut Shader,
    ) -> Result<()> {
        Ok(())
    }

    /// Emit a reusable function definition, deduplicated by name within
    /// the stage. Only out-of-line implementations emit anything here.
    fn emit_function_definition(
        &self,
        _gen: &dyn ShaderGenerator,
        _graph: &ShaderGraph,
        _node: NodeId,
        _ctx: &mut GenContext,
        _stage: &mut ShaderStage,
    ) -> Result<()> {
        Ok(())
    }

    /// Emit the invocation or inline expression assigning the node's
    /// output variable(s).
    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()>;

    /// Whether an input may be published as an editable uniform.
    fn is_editable(&self, _input: &str) -> bool {
        true
    }
}

/// Outcome of an implementation lookup.
pub enum ImplResolution {
    Registered(Arc<dyn NodeImpl>),
    SourceTemplate(ImplElement),
    /// Name of the nodegraph acting as a compound implementation.
    Compound(String),
}

#[derive(Default)]
pub struct ImplRegistry {
    impls: HashMap<(String, String), Arc<dyn NodeImpl>>,
}

impl ImplRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation for a nodedef. An empty target
    /// registers the target-agnostic fallback.
    pub fn register(&mut self, nodedef: &str, target: &str, imp: Arc<dyn NodeImpl>) {
        self.impls
            .insert((nodedef.to_string(), target.to_string()), imp);
    }

    /// Resolve the implementation for a nodedef on a target.
    ///
    /// This is the one place the lookup priority is defined:
    /// 1. registered, target-exact
    /// 2. registered, target-agnostic
    /// 3. the nodedef's own implementation element (target-exact first):
    ///    a compound graph reference, or an inline source template
    /// 4. a nodegraph in the document bound to the nodedef
    pub fn find(&self, doc: &Document, nodedef: &NodeDef, target: &str) -> Result<ImplResolution> {
        if let Some(imp) = self.impls.get(&(nodedef.name.clone(), target.to_string())) {
            return Ok(ImplResolution::Registered(imp.clone()));
        }
        if let Some(imp) = self.impls.get(&(nodedef.name.clone(), String::new())) {
            return Ok(ImplResolution::Registered(imp.clone()));
        }
        if let Some(elem) = nodedef.implementation(target) {
            if let Some(graph) = &elem.nodegraph {
                return Ok(ImplResolution::Compound(graph.clone()));
            }
            if elem.source.is_some() || elem.function.is_some() {
                return Ok(ImplResolution::SourceTemplate(elem.clone()));
            }
        }
        if let Some(graph) = doc.implementation_graph(nodedef) {
            return Ok(ImplResolution::Compound(graph.name.clone()));
        }
        Err(GenError::no_implementation(&nodedef.name, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PortDef;

    struct DummyImpl;
    impl NodeImpl for DummyImpl {
        fn emit_function_call(
            &self,
            _gen: &dyn ShaderGenerator,
            _graph: &ShaderGraph,
            _node: NodeId,
            _ctx: &mut GenContext,
            _stage: &mut ShaderStage,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn nodedef_with_source() -> NodeDef {
        NodeDef {
            name: "ND_add_float".into(),
            node: "add".into(),
            inputs: vec![
                PortDef { name: "in1".into(), ty: "float".into(), ..Default::default() },
                PortDef { name: "in2".into(), ty: "float".into(), ..Default::default() },
            ],
            outputs: vec![PortDef { name: "out".into(), ty: "float".into(), ..Default::default() }],
            implementations: vec![ImplElement {
                source: Some("{{in1}} + {{in2}}".into()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn target_exact_beats_generic_beats_template() {
        let doc = Document::default();
        let nodedef = nodedef_with_source();

        let mut reg = ImplRegistry::new();
        assert!(matches!(
            reg.find(&doc, &nodedef, "glsl"),
            Ok(ImplResolution::SourceTemplate(_))
        ));

        reg.register("ND_add_float", "", Arc::new(DummyImpl));
        assert!(matches!(
            reg.find(&doc, &nodedef, "glsl"),
            Ok(ImplResolution::Registered(_))
        ));

        reg.register("ND_add_float", "glsl", Arc::new(DummyImpl));
        assert!(matches!(
            reg.find(&doc, &nodedef, "glsl"),
            Ok(ImplResolution::Registered(_))
        ));
    }

    #[test]
    fn missing_implementation_is_an_error() {
        let doc = Document::default();
        let nodedef = NodeDef {
            name: "ND_mystery".into(),
            node: "mystery".into(),
            ..Default::default()
        };
        let reg = ImplRegistry::new();
        let err = reg.find(&doc, &nodedef, "glsl").err().unwrap();
        assert!(err.to_string().contains("ND_mystery"));
    }
}
