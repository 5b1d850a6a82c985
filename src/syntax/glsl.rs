//! GLSL syntax (desktop OpenGL, #version 400 core).

use super::{aggregate, scalar_value, Syntax};
use crate::types::{TypeDesc, TypeKind};
use crate::value::Value;

pub struct GlslSyntax;

impl GlslSyntax {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GlslSyntax {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) const GLSL_RESTRICTED: &[&str] = &[
    "attribute", "break", "case", "centroid", "const", "continue", "default", "discard", "do",
    "else", "flat", "float", "for", "highp", "if", "in", "inout", "int", "invariant", "layout",
    "lowp", "mat2", "mat3", "mat4", "mediump", "out", "patch", "precision", "return", "sample",
    "sampler2D", "sampler3D", "samplerCube", "smooth", "struct", "switch", "uniform", "uint",
    "varying", "vec2", "vec3", "vec4", "void", "while", "bool", "true", "false", "main",
];

/// Struct types the generated code relies on. BSDF responses carry both
/// the scattered radiance and the transmitted throughput so layering can
/// modulate lower layers.
pub(crate) const GLSL_TYPE_DEFINITIONS: &str = "\
struct BSDF { vec3 response; vec3 throughput; };
#define EDF vec3
struct surfaceshader { vec3 color; vec3 transparency; };
struct lightshader { vec3 intensity; vec3 direction; };
";

pub(crate) fn glsl_type_name(ty: &TypeDesc) -> &'static str {
    match ty.name() {
        "float" => "float",
        "integer" => "int",
        "boolean" => "bool",
        "color3" | "vector3" => "vec3",
        "color4" | "vector4" => "vec4",
        "vector2" => "vec2",
        "matrix33" => "mat3",
        "matrix44" => "mat4",
        // Strings lower to integer enumerations on hardware targets.
        "string" => "int",
        "filename" => "sampler2D",
        "BSDF" => "BSDF",
        "EDF" => "EDF",
        "VDF" => "BSDF",
        "surfaceshader" | "material" => "surfaceshader",
        "volumeshader" => "surfaceshader",
        "lightshader" => "lightshader",
        _ => "float",
    }
}

pub(crate) fn glsl_default_value(ty: &TypeDesc) -> String {
    match ty.name() {
        "float" => "0.0".to_string(),
        "integer" | "string" => "0".to_string(),
        "boolean" => "false".to_string(),
        "color3" | "vector3" => "vec3(0.0)".to_string(),
        "color4" | "vector4" => "vec4(0.0)".to_string(),
        "vector2" => "vec2(0.0)".to_string(),
        "matrix33" => "mat3(1.0)".to_string(),
        "matrix44" => "mat4(1.0)".to_string(),
        "BSDF" | "VDF" => "BSDF(vec3(0.0), vec3(1.0))".to_string(),
        "EDF" => "EDF(0.0)".to_string(),
        "surfaceshader" | "material" | "volumeshader" => {
            "surfaceshader(vec3(0.0), vec3(0.0))".to_string()
        }
        "lightshader" => "lightshader(vec3(0.0), vec3(0.0))".to_string(),
        _ => "0.0".to_string(),
    }
}

pub(crate) fn glsl_value(ty: &TypeDesc, value: &Value) -> String {
    match value {
        Value::Float(_) | Value::Integer(_) | Value::Boolean(_) => scalar_value(value),
        Value::String(_) | Value::Filename(_) => "0".to_string(),
        _ => aggregate(glsl_type_name(ty), &value.components()),
    }
}

impl Syntax for GlslSyntax {
    fn type_name(&self, ty: &TypeDesc) -> &str {
        glsl_type_name(ty)
    }

    fn type_definitions(&self) -> &str {
        GLSL_TYPE_DEFINITIONS
    }

    fn default_value(&self, ty: &TypeDesc, _uniform: bool) -> String {
        glsl_default_value(ty)
    }

    fn value(&self, ty: &TypeDesc, value: &Value, _uniform: bool) -> String {
        glsl_value(ty, value)
    }

    fn uniform_qualifier(&self) -> &str {
        "uniform"
    }

    fn input_qualifier(&self) -> &str {
        "in"
    }

    fn output_qualifier(&self) -> &str {
        "out"
    }

    fn constant_qualifier(&self) -> &str {
        "const"
    }

    fn type_supported(&self, ty: &TypeDesc) -> bool {
        ty.kind() != TypeKind::Text || ty.name() == "string" || ty.name() == "filename"
    }

    fn restricted_names(&self) -> &'static [&'static str] {
        GLSL_RESTRICTED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    #[test]
    fn literals_spell_as_glsl() {
        let types = TypeRegistry::with_standard_types();
        let syntax = GlslSyntax::new();
        let c3 = types.get("color3").unwrap();
        assert_eq!(
            syntax.value(&c3, &Value::Color3([0.1, 0.2, 0.3]), false),
            "vec3(0.1, 0.2, 0.3)"
        );
        let f = types.get("float").unwrap();
        assert_eq!(syntax.value(&f, &Value::Float(0.5), false), "0.5");
        assert_eq!(syntax.default_value(&f, false), "0.0");
    }

    #[test]
    fn closure_types_have_struct_defaults() {
        let types = TypeRegistry::with_standard_types();
        let syntax = GlslSyntax::new();
        let bsdf = types.get("BSDF").unwrap();
        assert_eq!(syntax.type_name(&bsdf), "BSDF");
        assert_eq!(syntax.default_value(&bsdf, false), "BSDF(vec3(0.0), vec3(1.0))");
    }
}
