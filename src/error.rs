use thiserror::Error;

/// All fatal errors produced by shader generation.
///
/// Every variant carries enough context (node name, category, target) to
/// locate the defect in the source document without generator internals.
#[derive(Debug, Error)]
pub enum GenError {
    /// No nodedef matched a node instance for the active target.
    #[error("no nodedef found for node '{node}' of category '{category}' on target '{target}'")]
    NodeDefNotFound {
        node: String,
        category: String,
        target: String,
    },

    /// An explicit connection between incompatible port types.
    #[error("cannot connect '{from}' of type '{from_type}' to '{to}' of type '{to_type}'")]
    TypeMismatch {
        from: String,
        from_type: String,
        to: String,
        to_type: String,
    },

    /// The document graph contains a dependency cycle.
    #[error("graph '{graph}' contains a cycle")]
    Cycle { graph: String },

    /// A required input has no connection, no value and no default.
    #[error("missing required input '{input}' on node '{node}'")]
    MissingInput { node: String, input: String },

    /// No implementation registered for a (nodedef, target) pair.
    #[error("no implementation found for nodedef '{nodedef}' on target '{target}'")]
    NoImplementation { nodedef: String, target: String },

    /// A node violates a structural precondition of its implementation.
    #[error("node '{node}' ({category}): {reason}")]
    InvalidNode {
        node: String,
        category: String,
        reason: String,
    },

    /// A resource-binding request the target forbids.
    #[error("target '{target}' does not support {what}")]
    UnsupportedBinding { target: String, what: String },

    /// Strict mode: no color transform available for a declared space.
    #[error("no color transform from '{from}' to '{to}' for type '{ty}'")]
    ColorSpace {
        from: String,
        to: String,
        ty: String,
    },

    /// The input document itself is malformed.
    #[error("malformed document: {0}")]
    Document(String),

    /// A type name that resolves to no registered type descriptor.
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// A value literal that fails to parse for its declared type.
    #[error("cannot parse '{text}' as {ty}")]
    ValueParse { ty: String, text: String },

    /// A generator invariant was broken. Indicates a bug, not a document defect.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GenError>;

/// Shorthand constructors.
impl GenError {
    pub fn nodedef_not_found(node: &str, category: &str, target: &str) -> Self {
        Self::NodeDefNotFound {
            node: node.to_string(),
            category: category.to_string(),
            target: target.to_string(),
        }
    }

    pub fn type_mismatch(from: &str, from_type: &str, to: &str, to_type: &str) -> Self {
        Self::TypeMismatch {
            from: from.to_string(),
            from_type: from_type.to_string(),
            to: to.to_string(),
            to_type: to_type.to_string(),
        }
    }

    pub fn cycle(graph: &str) -> Self {
        Self::Cycle {
            graph: graph.to_string(),
        }
    }

    pub fn missing_input(node: &str, input: &str) -> Self {
        Self::MissingInput {
            node: node.to_string(),
            input: input.to_string(),
        }
    }

    pub fn no_implementation(nodedef: &str, target: &str) -> Self {
        Self::NoImplementation {
            nodedef: nodedef.to_string(),
            target: target.to_string(),
        }
    }

    pub fn invalid_node(node: &str, category: &str, reason: &str) -> Self {
        Self::InvalidNode {
            node: node.to_string(),
            category: category.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn document(msg: &str) -> Self {
        Self::Document(msg.to_string())
    }

    pub fn internal(msg: &str) -> Self {
        Self::Internal(msg.to_string())
    }
}
