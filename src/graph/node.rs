//! Shader graph nodes and ports.

use std::sync::Arc;

use bitflags::bitflags;

use crate::registry::NodeImpl;
use crate::types::TypeRef;
use crate::value::Value;

bitflags! {
    /// Classification of a shader node, assigned from its nodedef's output
    /// type and node-group metadata during graph construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Classification: u32 {
        /// Outputs a plain value (float, color, vector, ...).
        const TEXTURE      = 1 << 0;
        /// Represents light integration.
        const CLOSURE      = 1 << 1;
        /// Outputs a shader.
        const SHADER       = 1 << 2;
        const FILETEXTURE  = 1 << 3;
        const CONDITIONAL  = 1 << 4;
        const CONSTANT     = 1 << 5;
        const BSDF         = 1 << 6;
        /// BSDF for reflection only.
        const BSDF_R       = 1 << 7;
        /// BSDF for transmission only.
        const BSDF_T       = 1 << 8;
        const EDF          = 1 << 9;
        const VDF          = 1 << 10;
        const SURFACE      = 1 << 11;
        const VOLUME       = 1 << 12;
        const LIGHT        = 1 << 13;
        const IFELSE       = 1 << 14;
        const SWITCH       = 1 << 15;
        const COLOR_SPACE_TRANSFORM = 1 << 16;
        /// Excluded from the constant-folding pass.
        const DO_NOT_OPTIMIZE = 1 << 17;
        /// A vertical closure-layering operator.
        const LAYER        = 1 << 18;
        /// A thin-film modifier consumed by the first BSDF leaf below it.
        const THINFILM     = 1 << 19;
    }
}

/// Index of a node within its owning graph's arena.
///
/// The sentinel [`NodeId::GRAPH`] addresses the graph's own interface
/// sockets: graph input sockets behave as outputs feeding the interior,
/// graph output sockets as inputs fed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const GRAPH: NodeId = NodeId(u32::MAX);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A reference to an output port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputRef {
    pub node: NodeId,
    pub port: usize,
}

/// A reference to an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputRef {
    pub node: NodeId,
    pub port: usize,
}

/// An input port on a shader node. Holds at most one upstream connection.
#[derive(Debug, Clone)]
pub struct ShaderInput {
    pub name: String,
    pub ty: TypeRef,
    pub value: Option<Value>,
    pub connection: Option<OutputRef>,
    /// Variable name in generated code, assigned during finalize.
    pub variable: String,
    /// Uniform inputs may not take upstream connections.
    pub uniform: bool,
}

/// An output port on a shader node. Fans out to any number of inputs.
///
/// Graph input sockets are outputs too; for those, `value` carries the
/// published default spelled into the uniform declaration.
#[derive(Debug, Clone)]
pub struct ShaderOutput {
    pub name: String,
    pub ty: TypeRef,
    pub connections: Vec<InputRef>,
    /// Variable name in generated code, assigned during finalize.
    pub variable: String,
    pub value: Option<Value>,
}

/// Which branches of a conditional require a node's value.
///
/// Computed by a reverse-topological reachability pass: scopes union as a
/// node is reached through multiple paths, and a node needed by all
/// branches (or outside any conditional) is promoted to global scope.
#[derive(Debug, Clone, Default)]
pub struct ScopeInfo {
    pub kind: ScopeKind,
    /// The conditional restricting this node, for `Single` scope.
    pub conditional: Option<NodeId>,
    /// Bitmask of branches that need this node.
    pub branch_mask: u32,
    /// Bitmask covering every branch of the conditional.
    pub full_mask: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeKind {
    #[default]
    Unknown,
    /// Emitted once at graph top level.
    Global,
    /// Emitted inside specific branches of one conditional.
    Single,
    /// Restricted by more than one conditional; collapsed to global.
    Multiple,
}

impl ScopeInfo {
    pub fn global() -> Self {
        Self {
            kind: ScopeKind::Global,
            ..Default::default()
        }
    }

    pub fn used_by_branch(&self, branch: u32) -> bool {
        self.branch_mask & (1 << branch) != 0
    }

    /// Narrow this scope when propagating through a conditional's branch
    /// input during the reachability walk.
    pub fn adjust_at_conditional_input(&mut self, conditional: NodeId, branch: u32, full_mask: u32) {
        let covers_all =
            self.kind == ScopeKind::Single && self.branch_mask == self.full_mask;
        if self.kind == ScopeKind::Global || covers_all {
            self.kind = ScopeKind::Single;
            self.conditional = Some(conditional);
            self.branch_mask = 1 << branch;
            self.full_mask = full_mask;
        } else if self.kind == ScopeKind::Single {
            self.kind = ScopeKind::Multiple;
            self.conditional = None;
        }
    }

    /// Union with the scope of another consumer of the same node.
    pub fn merge(&mut self, from: &ScopeInfo) {
        if self.kind == ScopeKind::Unknown || from.kind == ScopeKind::Global {
            *self = from.clone();
        } else if self.kind == ScopeKind::Global {
            // Already as wide as it gets.
        } else if self.kind == ScopeKind::Single
            && from.kind == ScopeKind::Single
            && self.conditional == from.conditional
        {
            self.branch_mask |= from.branch_mask;
            if self.branch_mask == self.full_mask {
                // Needed by every branch, so no longer conditional.
                self.kind = ScopeKind::Global;
                self.conditional = None;
            }
        } else {
            // Restricted by sibling conditionals; emit globally.
            self.kind = ScopeKind::Global;
            self.conditional = None;
        }
    }
}

/// A node in the shader generation graph.
pub struct ShaderNode {
    pub name: String,
    /// The document category this node was instanced from.
    pub category: String,
    pub classification: Classification,
    pub inputs: Vec<ShaderInput>,
    pub outputs: Vec<ShaderOutput>,
    pub imp: Option<Arc<dyn NodeImpl>>,
    pub scope: ScopeInfo,
    /// Closure nodes feeding this node, filled in for shader-classified
    /// nodes during finalize. Drives the per-purpose closure emission.
    pub used_closures: std::collections::HashSet<NodeId>,
}

impl std::fmt::Debug for ShaderNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderNode")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("classification", &self.classification)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .finish()
    }
}

impl ShaderNode {
    pub fn new(name: &str, category: &str, classification: Classification) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            classification,
            inputs: Vec::new(),
            outputs: Vec::new(),
            imp: None,
            scope: ScopeInfo::default(),
            used_closures: std::collections::HashSet::new(),
        }
    }

    pub fn has_classification(&self, c: Classification) -> bool {
        self.classification.contains(c)
    }

    pub fn add_input(&mut self, name: &str, ty: TypeRef) -> usize {
        self.inputs.push(ShaderInput {
            name: name.to_string(),
            ty,
            value: None,
            connection: None,
            variable: String::new(),
            uniform: false,
        });
        self.inputs.len() - 1
    }

    pub fn add_output(&mut self, name: &str, ty: TypeRef) -> usize {
        self.outputs.push(ShaderOutput {
            name: name.to_string(),
            ty,
            connections: Vec::new(),
            variable: String::new(),
            value: None,
        });
        self.outputs.len() - 1
    }

    pub fn input(&self, name: &str) -> Option<(usize, &ShaderInput)> {
        self.inputs
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<(usize, &ShaderOutput)> {
        self.outputs
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
    }

    /// True if this node is emitted only inside conditional branches.
    pub fn referenced_conditionally(&self) -> bool {
        self.scope.kind == ScopeKind::Single
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_union_within_one_conditional() {
        let cond = NodeId(3);
        let mut a = ScopeInfo::global();
        a.adjust_at_conditional_input(cond, 0, 0b11);
        assert_eq!(a.kind, ScopeKind::Single);
        assert!(a.used_by_branch(0));
        assert!(!a.used_by_branch(1));

        let mut b = ScopeInfo::global();
        b.adjust_at_conditional_input(cond, 1, 0b11);

        // A node reached through both branches is needed unconditionally.
        a.merge(&b);
        assert_eq!(a.kind, ScopeKind::Global);
        assert_eq!(a.conditional, None);
    }

    #[test]
    fn scope_from_sibling_conditionals_goes_global() {
        let mut a = ScopeInfo::global();
        a.adjust_at_conditional_input(NodeId(1), 0, 0b11);
        let mut b = ScopeInfo::global();
        b.adjust_at_conditional_input(NodeId(2), 1, 0b11);
        a.merge(&b);
        assert_eq!(a.kind, ScopeKind::Global);
    }

    #[test]
    fn global_consumer_wins_over_branch_scope() {
        let mut a = ScopeInfo::global();
        a.adjust_at_conditional_input(NodeId(1), 0, 0b11);
        a.merge(&ScopeInfo::global());
        assert_eq!(a.kind, ScopeKind::Global);
    }
}
