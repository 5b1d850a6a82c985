//! Runtime type descriptors for shader ports and variables.
//!
//! Every semantic type name appearing in a document ("float", "color3",
//! "BSDF", ...) resolves to exactly one registered [`TypeDesc`]. The
//! registry is built once per generator setup and immutable afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{GenError, Result};
use crate::value::Value;

/// Base kind of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A single scalar value (float, integer, boolean).
    Scalar,
    /// A fixed-size vector of scalars with addressable members.
    Aggregate,
    /// A square matrix.
    Matrix,
    /// A string-valued type (string, filename).
    Text,
    /// A light-scattering closure (BSDF, EDF, VDF) or shader output.
    Closure,
}

/// Semantic tag refining how a type's values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSemantic {
    None,
    Color,
    Vector,
    Filename,
    Shader,
}

/// A named member of an aggregate type.
#[derive(Debug, Clone)]
pub struct TypeMember {
    pub name: &'static str,
    pub type_name: &'static str,
}

/// Descriptor for one registered type.
#[derive(Debug, Clone)]
pub struct TypeDesc {
    name: String,
    kind: TypeKind,
    size: usize,
    semantic: TypeSemantic,
    members: Vec<TypeMember>,
}

impl TypeDesc {
    pub fn new(
        name: &str,
        kind: TypeKind,
        size: usize,
        semantic: TypeSemantic,
        members: Vec<TypeMember>,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            size,
            semantic,
            members,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Number of scalar elements, 1 for scalars, 0 for closures and text.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn semantic(&self) -> TypeSemantic {
        self.semantic
    }

    pub fn members(&self) -> &[TypeMember] {
        &self.members
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == TypeKind::Scalar
    }

    pub fn is_aggregate(&self) -> bool {
        self.kind == TypeKind::Aggregate
    }

    pub fn is_closure(&self) -> bool {
        self.kind == TypeKind::Closure
    }

    pub fn is_float_based(&self) -> bool {
        matches!(self.kind, TypeKind::Scalar | TypeKind::Aggregate | TypeKind::Matrix)
            && self.name != "integer"
            && self.name != "boolean"
    }

    /// True if values of this type can be published as editable uniforms.
    pub fn is_editable(&self) -> bool {
        !self.is_closure() && self.semantic != TypeSemantic::Shader
    }

    /// A zero-initialized default value for value-kinded types.
    pub fn default_value(&self) -> Option<Value> {
        match self.name.as_str() {
            "float" => Some(Value::Float(0.0)),
            "integer" => Some(Value::Integer(0)),
            "boolean" => Some(Value::Boolean(false)),
            "string" => Some(Value::String(String::new())),
            "filename" => Some(Value::Filename(String::new())),
            "color3" => Some(Value::Color3([0.0; 3])),
            "color4" => Some(Value::Color4([0.0; 4])),
            "vector2" => Some(Value::Vector2([0.0; 2])),
            "vector3" => Some(Value::Vector3([0.0; 3])),
            "vector4" => Some(Value::Vector4([0.0; 4])),
            "matrix33" => Some(Value::Matrix33({
                let mut m = [0.0; 9];
                m[0] = 1.0;
                m[4] = 1.0;
                m[8] = 1.0;
                m
            })),
            "matrix44" => Some(Value::Matrix44({
                let mut m = [0.0; 16];
                m[0] = 1.0;
                m[5] = 1.0;
                m[10] = 1.0;
                m[15] = 1.0;
                m
            })),
            _ => None,
        }
    }
}

pub type TypeRef = Arc<TypeDesc>;

/// Registry mapping type names to descriptors.
///
/// Built during setup, shared immutably between generators afterwards.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeRef>,
}

impl TypeRegistry {
    /// An empty registry. Most callers want [`TypeRegistry::with_standard_types`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every type the built-in node library uses.
    pub fn with_standard_types() -> Self {
        let mut reg = Self::new();
        let float3 = |a, b, c| {
            vec![
                TypeMember { name: a, type_name: "float" },
                TypeMember { name: b, type_name: "float" },
                TypeMember { name: c, type_name: "float" },
            ]
        };
        reg.register(TypeDesc::new("float", TypeKind::Scalar, 1, TypeSemantic::None, vec![]));
        reg.register(TypeDesc::new("integer", TypeKind::Scalar, 1, TypeSemantic::None, vec![]));
        reg.register(TypeDesc::new("boolean", TypeKind::Scalar, 1, TypeSemantic::None, vec![]));
        reg.register(TypeDesc::new("string", TypeKind::Text, 0, TypeSemantic::None, vec![]));
        reg.register(TypeDesc::new(
            "filename",
            TypeKind::Text,
            0,
            TypeSemantic::Filename,
            vec![],
        ));
        reg.register(TypeDesc::new(
            "color3",
            TypeKind::Aggregate,
            3,
            TypeSemantic::Color,
            float3("r", "g", "b"),
        ));
        reg.register(TypeDesc::new(
            "color4",
            TypeKind::Aggregate,
            4,
            TypeSemantic::Color,
            vec![
                TypeMember { name: "r", type_name: "float" },
                TypeMember { name: "g", type_name: "float" },
                TypeMember { name: "b", type_name: "float" },
                TypeMember { name: "a", type_name: "float" },
            ],
        ));
        reg.register(TypeDesc::new(
            "vector2",
            TypeKind::Aggregate,
            2,
            TypeSemantic::Vector,
            vec![
                TypeMember { name: "x", type_name: "float" },
                TypeMember { name: "y", type_name: "float" },
            ],
        ));
        reg.register(TypeDesc::new(
            "vector3",
            TypeKind::Aggregate,
            3,
            TypeSemantic::Vector,
            float3("x", "y", "z"),
        ));
        reg.register(TypeDesc::new(
            "vector4",
            TypeKind::Aggregate,
            4,
            TypeSemantic::Vector,
            vec![
                TypeMember { name: "x", type_name: "float" },
                TypeMember { name: "y", type_name: "float" },
                TypeMember { name: "z", type_name: "float" },
                TypeMember { name: "w", type_name: "float" },
            ],
        ));
        reg.register(TypeDesc::new("matrix33", TypeKind::Matrix, 9, TypeSemantic::None, vec![]));
        reg.register(TypeDesc::new("matrix44", TypeKind::Matrix, 16, TypeSemantic::None, vec![]));
        reg.register(TypeDesc::new("BSDF", TypeKind::Closure, 0, TypeSemantic::None, vec![]));
        reg.register(TypeDesc::new("EDF", TypeKind::Closure, 0, TypeSemantic::None, vec![]));
        reg.register(TypeDesc::new("VDF", TypeKind::Closure, 0, TypeSemantic::None, vec![]));
        reg.register(TypeDesc::new(
            "surfaceshader",
            TypeKind::Closure,
            0,
            TypeSemantic::Shader,
            vec![],
        ));
        reg.register(TypeDesc::new(
            "volumeshader",
            TypeKind::Closure,
            0,
            TypeSemantic::Shader,
            vec![],
        ));
        reg.register(TypeDesc::new(
            "lightshader",
            TypeKind::Closure,
            0,
            TypeSemantic::Shader,
            vec![],
        ));
        reg.register(TypeDesc::new(
            "material",
            TypeKind::Closure,
            0,
            TypeSemantic::Shader,
            vec![],
        ));
        reg
    }

    /// Register a type. Re-registering a name replaces the descriptor;
    /// this is only legal before any generation has started.
    pub fn register(&mut self, desc: TypeDesc) -> TypeRef {
        let arc = Arc::new(desc);
        self.types.insert(arc.name().to_string(), arc.clone());
        arc
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Result<TypeRef> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| GenError::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_resolves_core_types() {
        let reg = TypeRegistry::with_standard_types();
        for name in [
            "float", "integer", "boolean", "string", "filename", "color3", "color4", "vector2",
            "vector3", "vector4", "matrix33", "matrix44", "BSDF", "EDF", "VDF", "surfaceshader",
        ] {
            assert!(reg.get(name).is_ok(), "missing {name}");
        }
        assert!(reg.get("half3").is_err());
    }

    #[test]
    fn aggregate_members_are_ordered() {
        let reg = TypeRegistry::with_standard_types();
        let c3 = reg.get("color3").unwrap();
        let names: Vec<_> = c3.members().iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["r", "g", "b"]);
        assert_eq!(c3.size(), 3);
        assert!(c3.is_aggregate());
    }

    #[test]
    fn closures_are_not_editable() {
        let reg = TypeRegistry::with_standard_types();
        assert!(!reg.get("BSDF").unwrap().is_editable());
        assert!(reg.get("color3").unwrap().is_editable());
    }
}
