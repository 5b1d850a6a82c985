//! MDL syntax (NVIDIA Material Definition Language).

use super::{scalar_value, Syntax};
use crate::types::TypeDesc;
use crate::value::{fmt_float, Value};

pub struct MdlSyntax;

impl MdlSyntax {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MdlSyntax {
    fn default() -> Self {
        Self::new()
    }
}

const MDL_RESTRICTED: &[&str] = &[
    "annotation", "bool", "break", "bsdf", "color", "const", "continue", "df", "do", "double",
    "edf", "else", "enum", "export", "false", "float", "float2", "float3", "float4", "float3x3",
    "float4x4", "for", "hair_bsdf", "if", "import", "in", "int", "let", "material",
    "material_emission", "material_surface", "material_volume", "mdl", "module", "package",
    "return", "state", "string", "struct", "switch", "texture_2d", "true", "uniform", "using",
    "varying", "vdf", "while",
];

fn mdl_type_name(ty: &TypeDesc) -> &'static str {
    match ty.name() {
        "float" => "float",
        "integer" => "int",
        "boolean" => "bool",
        "color3" => "color",
        "color4" => "float4",
        "vector2" => "float2",
        "vector3" => "float3",
        "vector4" => "float4",
        "matrix33" => "float3x3",
        "matrix44" => "float4x4",
        "string" => "string",
        "filename" => "texture_2d",
        // Closures compose through full materials in MDL.
        "BSDF" | "EDF" | "VDF" | "surfaceshader" | "material" | "volumeshader" => "material",
        _ => "float",
    }
}

fn mdl_aggregate(head: &str, components: &[f32]) -> String {
    let parts: Vec<String> = components.iter().map(|c| fmt_float(*c)).collect();
    format!("{head}({})", parts.join(", "))
}

impl Syntax for MdlSyntax {
    fn type_name(&self, ty: &TypeDesc) -> &str {
        mdl_type_name(ty)
    }

    fn default_value(&self, ty: &TypeDesc, _uniform: bool) -> String {
        match ty.name() {
            "float" => "0.0".to_string(),
            "integer" => "0".to_string(),
            "boolean" => "false".to_string(),
            "color3" => "color(0.0)".to_string(),
            "color4" | "vector4" => "float4(0.0)".to_string(),
            "vector2" => "float2(0.0)".to_string(),
            "vector3" => "float3(0.0)".to_string(),
            "matrix33" => "float3x3(1.0)".to_string(),
            "matrix44" => "float4x4(1.0)".to_string(),
            "string" => "\"\"".to_string(),
            "filename" => "texture_2d()".to_string(),
            "BSDF" | "EDF" | "VDF" | "surfaceshader" | "material" | "volumeshader" => {
                "material()".to_string()
            }
            _ => "0.0".to_string(),
        }
    }

    fn value(&self, ty: &TypeDesc, value: &Value, _uniform: bool) -> String {
        match value {
            Value::Float(_) | Value::Integer(_) | Value::Boolean(_) => scalar_value(value),
            Value::String(s) => format!("\"{s}\""),
            Value::Filename(s) => format!("texture_2d(\"{s}\")"),
            Value::Color3(c) => mdl_aggregate("color", c),
            _ => mdl_aggregate(mdl_type_name(ty), &value.components()),
        }
    }

    fn uniform_qualifier(&self) -> &str {
        "uniform"
    }

    fn constant_qualifier(&self) -> &str {
        "const"
    }

    fn restricted_names(&self) -> &'static [&'static str] {
        MDL_RESTRICTED
    }
}
