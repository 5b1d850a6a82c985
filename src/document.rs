//! The read-only input document model.
//!
//! This is the boundary API the generator core consumes: a flattened
//! description of nodes, node graphs and node definitions. Documents are
//! built programmatically or deserialized from JSON; XML interchange and
//! element-tree inheritance live outside this crate.

use serde::Deserialize;

use crate::error::{GenError, Result};

/// A complete material document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub nodedefs: Vec<NodeDef>,
    #[serde(default)]
    pub nodegraphs: Vec<NodeGraph>,
    /// Free-standing nodes (materials, shader nodes referenced by name).
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Free-standing outputs, each naming the node it taps.
    #[serde(default)]
    pub outputs: Vec<OutputElem>,
    /// The working color space render results are expected in.
    #[serde(default)]
    pub colorspace: Option<String>,
}

/// Interface declaration for a node category: ports, defaults, and the
/// implementation(s) that realize it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeDef {
    pub name: String,
    /// The node category this definition implements (e.g. "mix").
    pub node: String,
    /// Target identifier this definition is specific to; empty = any target.
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub inputs: Vec<PortDef>,
    #[serde(default)]
    pub outputs: Vec<PortDef>,
    /// Node-group metadata used for classification (e.g. "conditional").
    #[serde(default)]
    pub nodegroup: String,
    #[serde(default)]
    pub implementations: Vec<ImplElement>,
}

/// A declared input or output port on a nodedef.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// Default value in canonical string form.
    #[serde(default)]
    pub value: Option<String>,
    /// Uniform ports may not take upstream connections.
    #[serde(default)]
    pub uniform: bool,
}

/// One implementation of a nodedef for some target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImplElement {
    /// Target identifier; empty = any target.
    #[serde(default)]
    pub target: String,
    /// Name of the shading-language function to call, for out-of-line code.
    #[serde(default)]
    pub function: Option<String>,
    /// Inline source template with `{{input}}` substitution points.
    #[serde(default)]
    pub source: Option<String>,
    /// Name of a nodegraph serving as a compound implementation.
    #[serde(default)]
    pub nodegraph: Option<String>,
}

/// A node instance in the document graph.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Node {
    pub name: String,
    /// Node category, matched against nodedefs.
    pub category: String,
    /// Declared output type of the instance.
    #[serde(rename = "type", default)]
    pub ty: String,
    /// Optional explicit nodedef reference, bypassing category matching.
    #[serde(default)]
    pub nodedef: Option<String>,
    #[serde(default)]
    pub inputs: Vec<InputBinding>,
}

/// A bound input on a node instance: a literal value, an upstream
/// connection, or an interface binding to the enclosing graph.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputBinding {
    pub name: String,
    /// Literal value in canonical string form.
    #[serde(default)]
    pub value: Option<String>,
    /// Name of the upstream node this input connects to.
    #[serde(default)]
    pub node: Option<String>,
    /// Output name on the upstream node, when it has several.
    #[serde(default)]
    pub output: Option<String>,
    /// Name of an enclosing-graph interface input this input aliases.
    #[serde(default)]
    pub interface: Option<String>,
    /// Source color space of the bound value, when not the working space.
    #[serde(default)]
    pub colorspace: Option<String>,
}

/// A graph of nodes with its published outputs. A nodegraph that names a
/// nodedef acts as that definition's compound implementation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeGraph {
    pub name: String,
    #[serde(default)]
    pub nodedef: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub outputs: Vec<OutputElem>,
}

/// A published output tapping a node inside a graph (or at document level).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputElem {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// Name of the node this output taps.
    #[serde(default)]
    pub node: Option<String>,
    /// Output name on that node, when it has several.
    #[serde(default)]
    pub output: Option<String>,
}

impl Document {
    pub fn from_json(text: &str) -> Result<Document> {
        serde_json::from_str(text).map_err(|e| GenError::Document(e.to_string()))
    }

    /// Merge another document's definitions into this one. Used to lay a
    /// user document over the built-in node library.
    pub fn import(&mut self, other: Document) {
        self.nodedefs.extend(other.nodedefs);
        self.nodegraphs.extend(other.nodegraphs);
        self.nodes.extend(other.nodes);
        self.outputs.extend(other.outputs);
        if self.colorspace.is_none() {
            self.colorspace = other.colorspace;
        }
    }

    /// Resolve the nodedef for a node instance on the given target.
    ///
    /// Prefers an explicit nodedef reference, then a target-exact category
    /// match, then a target-agnostic one. No match is a fatal build error.
    pub fn resolve_nodedef(&self, node: &Node, target: &str) -> Result<&NodeDef> {
        if let Some(ref def_name) = node.nodedef {
            return self
                .nodedefs
                .iter()
                .find(|d| &d.name == def_name)
                .ok_or_else(|| GenError::nodedef_not_found(&node.name, &node.category, target));
        }
        let candidates: Vec<&NodeDef> = self
            .nodedefs
            .iter()
            .filter(|d| d.node == node.category)
            .filter(|d| node.ty.is_empty() || d.output_type() == node.ty)
            .collect();
        candidates
            .iter()
            .find(|d| d.target == target)
            .or_else(|| candidates.iter().find(|d| d.target.is_empty()))
            .copied()
            .ok_or_else(|| GenError::nodedef_not_found(&node.name, &node.category, target))
    }

    pub fn nodedef(&self, name: &str) -> Option<&NodeDef> {
        self.nodedefs.iter().find(|d| d.name == name)
    }

    pub fn nodegraph(&self, name: &str) -> Option<&NodeGraph> {
        self.nodegraphs.iter().find(|g| g.name == name)
    }

    /// The compound implementation graph for a nodedef, if one exists.
    pub fn implementation_graph(&self, nodedef: &NodeDef) -> Option<&NodeGraph> {
        self.nodegraphs
            .iter()
            .find(|g| g.nodedef.as_deref() == Some(nodedef.name.as_str()))
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputElem> {
        self.outputs.iter().find(|o| o.name == name)
    }
}

impl NodeDef {
    pub fn input(&self, name: &str) -> Option<&PortDef> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// The type of the (single or first) declared output.
    pub fn output_type(&self) -> &str {
        self.outputs.first().map(|o| o.ty.as_str()).unwrap_or("")
    }

    /// Pick the implementation for a target: exact match first, then
    /// target-agnostic. Compound graphs are resolved by the caller.
    pub fn implementation(&self, target: &str) -> Option<&ImplElement> {
        self.implementations
            .iter()
            .find(|i| i.target == target)
            .or_else(|| self.implementations.iter().find(|i| i.target.is_empty()))
    }
}

impl Node {
    pub fn input(&self, name: &str) -> Option<&InputBinding> {
        self.inputs.iter().find(|i| i.name == name)
    }
}

impl NodeGraph {
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputElem> {
        self.outputs.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_defs() -> Document {
        Document {
            nodedefs: vec![
                NodeDef {
                    name: "ND_mix_float".into(),
                    node: "mix".into(),
                    outputs: vec![PortDef {
                        name: "out".into(),
                        ty: "float".into(),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                NodeDef {
                    name: "ND_mix_float_osl".into(),
                    node: "mix".into(),
                    target: "osl".into(),
                    outputs: vec![PortDef {
                        name: "out".into(),
                        ty: "float".into(),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn nodedef_resolution_prefers_exact_target() {
        let doc = doc_with_defs();
        let node = Node {
            name: "m1".into(),
            category: "mix".into(),
            ty: "float".into(),
            ..Default::default()
        };
        assert_eq!(doc.resolve_nodedef(&node, "osl").unwrap().name, "ND_mix_float_osl");
        assert_eq!(doc.resolve_nodedef(&node, "glsl").unwrap().name, "ND_mix_float");
    }

    #[test]
    fn nodedef_resolution_fails_for_unknown_category() {
        let doc = doc_with_defs();
        let node = Node {
            name: "bad1".into(),
            category: "warp".into(),
            ..Default::default()
        };
        let err = doc.resolve_nodedef(&node, "glsl").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bad1") && msg.contains("warp"), "got: {msg}");
    }

    #[test]
    fn json_documents_deserialize() {
        let doc = Document::from_json(
            r#"{
                "nodes": [
                    {
                        "name": "c1",
                        "category": "constant",
                        "type": "float",
                        "inputs": [{"name": "value", "value": "0.5"}]
                    }
                ],
                "outputs": [{"name": "out", "type": "float", "node": "c1"}]
            }"#,
        )
        .unwrap();
        assert_eq!(doc.nodes.len(), 1);
        assert_eq!(doc.outputs[0].node.as_deref(), Some("c1"));
    }
}
