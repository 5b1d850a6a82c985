//! MSL syntax (Metal Shading Language).

use super::{aggregate, scalar_value, Syntax};
use crate::types::TypeDesc;
use crate::value::Value;

pub struct MslSyntax;

impl MslSyntax {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MslSyntax {
    fn default() -> Self {
        Self::new()
    }
}

const MSL_RESTRICTED: &[&str] = &[
    "kernel", "vertex", "fragment", "device", "constant", "threadgroup", "thread", "using",
    "namespace", "template", "float2", "float3", "float4", "float3x3", "float4x4", "int", "uint",
    "bool", "true", "false", "return", "if", "else", "for", "while", "struct", "texture2d",
    "sampler", "metal", "main0",
];

const MSL_TYPE_DEFINITIONS: &str = "\
struct BSDF { float3 response; float3 throughput; };
#define EDF float3
struct surfaceshader { float3 color; float3 transparency; };
struct lightshader { float3 intensity; float3 direction; };
";

fn msl_type_name(ty: &TypeDesc) -> &'static str {
    match ty.name() {
        "float" => "float",
        "integer" => "int",
        "boolean" => "bool",
        "color3" | "vector3" => "float3",
        "color4" | "vector4" => "float4",
        "vector2" => "float2",
        "matrix33" => "float3x3",
        "matrix44" => "float4x4",
        "string" => "int",
        "filename" => "MetalTexture",
        "BSDF" => "BSDF",
        "EDF" => "EDF",
        "VDF" => "BSDF",
        "surfaceshader" | "material" | "volumeshader" => "surfaceshader",
        "lightshader" => "lightshader",
        _ => "float",
    }
}

impl Syntax for MslSyntax {
    fn type_name(&self, ty: &TypeDesc) -> &str {
        msl_type_name(ty)
    }

    fn type_definitions(&self) -> &str {
        MSL_TYPE_DEFINITIONS
    }

    fn default_value(&self, ty: &TypeDesc, _uniform: bool) -> String {
        match ty.name() {
            "float" => "0.0".to_string(),
            "integer" | "string" => "0".to_string(),
            "boolean" => "false".to_string(),
            "color3" | "vector3" => "float3(0.0)".to_string(),
            "color4" | "vector4" => "float4(0.0)".to_string(),
            "vector2" => "float2(0.0)".to_string(),
            "matrix33" => "float3x3(1.0)".to_string(),
            "matrix44" => "float4x4(1.0)".to_string(),
            "BSDF" | "VDF" => "BSDF{float3(0.0), float3(1.0)}".to_string(),
            "EDF" => "EDF(0.0)".to_string(),
            "surfaceshader" | "material" | "volumeshader" => {
                "surfaceshader{float3(0.0), float3(0.0)}".to_string()
            }
            _ => "0.0".to_string(),
        }
    }

    fn value(&self, ty: &TypeDesc, value: &Value, _uniform: bool) -> String {
        match value {
            Value::Float(_) | Value::Integer(_) | Value::Boolean(_) => scalar_value(value),
            Value::String(_) | Value::Filename(_) => "0".to_string(),
            _ => aggregate(msl_type_name(ty), &value.components()),
        }
    }

    fn constant_qualifier(&self) -> &str {
        "constant"
    }

    fn input_qualifier(&self) -> &str {
        "in"
    }

    fn output_qualifier(&self) -> &str {
        "out"
    }

    fn restricted_names(&self) -> &'static [&'static str] {
        MSL_RESTRICTED
    }
}
