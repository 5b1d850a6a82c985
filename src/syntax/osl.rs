//! OSL syntax (Open Shading Language).

use super::{scalar_value, Syntax};
use crate::types::TypeDesc;
use crate::value::{fmt_float, Value};

pub struct OslSyntax;

impl OslSyntax {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OslSyntax {
    fn default() -> Self {
        Self::new()
    }
}

const OSL_RESTRICTED: &[&str] = &[
    "and", "break", "closure", "color", "continue", "do", "else", "emit", "float", "for", "if",
    "illuminance", "illuminate", "int", "matrix", "normal", "not", "or", "output", "point",
    "public", "return", "string", "struct", "vector", "void", "while", "shader", "surface",
    "displacement", "volume",
];

fn osl_type_name(ty: &TypeDesc) -> &'static str {
    match ty.name() {
        "float" => "float",
        "integer" => "int",
        "boolean" => "int",
        "color3" => "color",
        "color4" => "color4",
        "vector2" => "vector2",
        "vector3" => "vector",
        "vector4" => "vector4",
        "matrix33" | "matrix44" => "matrix",
        "string" | "filename" => "string",
        "BSDF" | "EDF" | "VDF" | "surfaceshader" | "material" | "volumeshader" => "closure color",
        _ => "float",
    }
}

fn osl_aggregate(head: &str, components: &[f32]) -> String {
    let parts: Vec<String> = components.iter().map(|c| fmt_float(*c)).collect();
    format!("{head}({})", parts.join(", "))
}

impl Syntax for OslSyntax {
    fn type_name(&self, ty: &TypeDesc) -> &str {
        osl_type_name(ty)
    }

    /// OSL needs helper structs for the 2- and 4-channel types it lacks.
    fn type_definitions(&self) -> &str {
        "\
struct vector2 { float x; float y; };
struct vector4 { float x; float y; float z; float w; };
struct color4 { color rgb; float a; };
"
    }

    fn default_value(&self, ty: &TypeDesc, _uniform: bool) -> String {
        match ty.name() {
            "float" => "0.0".to_string(),
            "integer" | "boolean" => "0".to_string(),
            "color3" => "color(0.0)".to_string(),
            "color4" => "color4(color(0.0), 0.0)".to_string(),
            "vector2" => "vector2(0.0, 0.0)".to_string(),
            "vector3" => "vector(0.0)".to_string(),
            "vector4" => "vector4(0.0, 0.0, 0.0, 0.0)".to_string(),
            "matrix33" | "matrix44" => "matrix(1.0)".to_string(),
            "string" | "filename" => "\"\"".to_string(),
            // The null closure.
            "BSDF" | "EDF" | "VDF" | "surfaceshader" | "material" | "volumeshader" => {
                "0".to_string()
            }
            _ => "0.0".to_string(),
        }
    }

    fn value(&self, ty: &TypeDesc, value: &Value, _uniform: bool) -> String {
        match value {
            Value::Float(_) | Value::Integer(_) => scalar_value(value),
            Value::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
            Value::String(s) | Value::Filename(s) => format!("\"{s}\""),
            Value::Color3(c) => osl_aggregate("color", c),
            Value::Color4(c) => format!(
                "color4(color({}, {}, {}), {})",
                fmt_float(c[0]),
                fmt_float(c[1]),
                fmt_float(c[2]),
                fmt_float(c[3])
            ),
            Value::Vector2(v) => osl_aggregate("vector2", v),
            Value::Vector3(v) => osl_aggregate("vector", v),
            Value::Vector4(v) => osl_aggregate("vector4", v),
            Value::Matrix33(m) => {
                // OSL matrices are 4x4; pad the 3x3 into the upper block.
                let m44 = [
                    m[0], m[1], m[2], 0.0, m[3], m[4], m[5], 0.0, m[6], m[7], m[8], 0.0, 0.0, 0.0,
                    0.0, 1.0,
                ];
                osl_aggregate("matrix", &m44)
            }
            Value::Matrix44(m) => osl_aggregate("matrix", m),
        }
    }

    fn output_qualifier(&self) -> &str {
        "output"
    }

    fn constant_qualifier(&self) -> &str {
        ""
    }

    fn restricted_names(&self) -> &'static [&'static str] {
        OSL_RESTRICTED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    #[test]
    fn osl_spellings() {
        let types = TypeRegistry::with_standard_types();
        let syntax = OslSyntax::new();
        let c3 = types.get("color3").unwrap();
        assert_eq!(
            syntax.value(&c3, &Value::Color3([1.0, 0.5, 0.0]), false),
            "color(1.0, 0.5, 0.0)"
        );
        let s = types.get("string").unwrap();
        assert_eq!(
            syntax.value(&s, &Value::String("srgb_texture".into()), false),
            "\"srgb_texture\""
        );
        let bsdf = types.get("BSDF").unwrap();
        assert_eq!(syntax.type_name(&bsdf), "closure color");
        assert_eq!(syntax.default_value(&bsdf, false), "0");
    }
}
