//! Typed literal values crossing the document boundary.
//!
//! Values arrive as strings on document elements and leave as source-text
//! literals spelled by a target syntax. The canonical string form uses a
//! `", "` separator for aggregate components; parsing tolerates any mix of
//! commas and whitespace.

use crate::error::{GenError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f32),
    Integer(i32),
    Boolean(bool),
    String(String),
    Filename(String),
    Color3([f32; 3]),
    Color4([f32; 4]),
    Vector2([f32; 2]),
    Vector3([f32; 3]),
    Vector4([f32; 4]),
    Matrix33([f32; 9]),
    Matrix44([f32; 16]),
}

impl Value {
    /// Parse a literal from its canonical string form, for a named type.
    pub fn parse(type_name: &str, text: &str) -> Result<Value> {
        let fail = || GenError::ValueParse {
            ty: type_name.to_string(),
            text: text.to_string(),
        };
        let text = text.trim();
        match type_name {
            "float" => text.parse::<f32>().map(Value::Float).map_err(|_| fail()),
            "integer" => text.parse::<i32>().map(Value::Integer).map_err(|_| fail()),
            "boolean" => match text {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(fail()),
            },
            "string" => Ok(Value::String(text.to_string())),
            "filename" => Ok(Value::Filename(text.to_string())),
            "color3" => parse_floats::<3>(text).map(Value::Color3).ok_or_else(fail),
            "color4" => parse_floats::<4>(text).map(Value::Color4).ok_or_else(fail),
            "vector2" => parse_floats::<2>(text).map(Value::Vector2).ok_or_else(fail),
            "vector3" => parse_floats::<3>(text).map(Value::Vector3).ok_or_else(fail),
            "vector4" => parse_floats::<4>(text).map(Value::Vector4).ok_or_else(fail),
            "matrix33" => parse_floats::<9>(text).map(Value::Matrix33).ok_or_else(fail),
            "matrix44" => parse_floats::<16>(text).map(Value::Matrix44).ok_or_else(fail),
            _ => Err(GenError::UnknownType(type_name.to_string())),
        }
    }

    /// The name of this value's type in the type registry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Float(_) => "float",
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Filename(_) => "filename",
            Value::Color3(_) => "color3",
            Value::Color4(_) => "color4",
            Value::Vector2(_) => "vector2",
            Value::Vector3(_) => "vector3",
            Value::Vector4(_) => "vector4",
            Value::Matrix33(_) => "matrix33",
            Value::Matrix44(_) => "matrix44",
        }
    }

    /// Canonical string serialization, round-trippable through `parse`.
    pub fn to_value_string(&self) -> String {
        match self {
            Value::Float(v) => fmt_float(*v),
            Value::Integer(v) => v.to_string(),
            Value::Boolean(v) => v.to_string(),
            Value::String(s) | Value::Filename(s) => s.clone(),
            Value::Color3(v) | Value::Vector3(v) => join_floats(v),
            Value::Color4(v) | Value::Vector4(v) => join_floats(v),
            Value::Vector2(v) => join_floats(v),
            Value::Matrix33(v) => join_floats(v),
            Value::Matrix44(v) => join_floats(v),
        }
    }

    /// Scalar components in declaration order. Empty for string kinds.
    pub fn components(&self) -> Vec<f32> {
        match self {
            Value::Float(v) => vec![*v],
            Value::Integer(v) => vec![*v as f32],
            Value::Boolean(v) => vec![if *v { 1.0 } else { 0.0 }],
            Value::String(_) | Value::Filename(_) => vec![],
            Value::Color3(v) | Value::Vector3(v) => v.to_vec(),
            Value::Color4(v) | Value::Vector4(v) => v.to_vec(),
            Value::Vector2(v) => v.to_vec(),
            Value::Matrix33(v) => v.to_vec(),
            Value::Matrix44(v) => v.to_vec(),
        }
    }

    /// True for values that spell out to a zero default.
    pub fn is_zero(&self) -> bool {
        self.components().iter().all(|c| *c == 0.0)
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(v) => Some(*v as i32),
            Value::Boolean(v) => Some(*v as i32),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_value_string())
    }
}

/// Format a float so it parses back to the same value.
pub fn fmt_float(v: f32) -> String {
    // `{}` on f32 produces the shortest representation that round-trips.
    let s = format!("{v}");
    if s.contains(['.', 'e', 'n', 'i']) {
        s
    } else {
        format!("{s}.0")
    }
}

fn join_floats(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| fmt_float(*v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_floats<const N: usize>(text: &str) -> Option<[f32; N]> {
    let mut out = [0.0f32; N];
    let mut count = 0;
    for part in text.split(',').flat_map(|p| p.split_whitespace()) {
        if count == N {
            return None;
        }
        out[count] = part.parse().ok()?;
        count += 1;
    }
    (count == N).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scalars() {
        assert_eq!(Value::parse("float", "0.5").unwrap(), Value::Float(0.5));
        assert_eq!(Value::parse("integer", "-3").unwrap(), Value::Integer(-3));
        assert_eq!(Value::parse("boolean", "true").unwrap(), Value::Boolean(true));
        assert!(Value::parse("boolean", "yes").is_err());
    }

    #[test]
    fn parse_aggregates_tolerates_separators() {
        let expected = Value::Color3([0.1, 0.2, 0.3]);
        assert_eq!(Value::parse("color3", "0.1, 0.2, 0.3").unwrap(), expected);
        assert_eq!(Value::parse("color3", "0.1,0.2,0.3").unwrap(), expected);
        assert_eq!(Value::parse("color3", " 0.1  0.2\t0.3 ").unwrap(), expected);
    }

    #[test]
    fn parse_rejects_wrong_arity() {
        assert!(Value::parse("color3", "0.1, 0.2").is_err());
        assert!(Value::parse("vector2", "1, 2, 3").is_err());
    }

    #[test]
    fn round_trip_every_kind() {
        let samples = [
            Value::Float(0.25),
            Value::Integer(7),
            Value::Boolean(false),
            Value::String("linear".into()),
            Value::Filename("tex/wood.png".into()),
            Value::Color3([1.0, 0.5, 0.0]),
            Value::Color4([1.0, 0.5, 0.0, 1.0]),
            Value::Vector2([0.5, -0.5]),
            Value::Vector3([0.0, 1.0, 0.0]),
            Value::Vector4([0.0, 1.0, 0.0, 2.5]),
            Value::Matrix33([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
            Value::Matrix44([
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
            ]),
        ];
        for v in samples {
            let text = v.to_value_string();
            let back = Value::parse(v.type_name(), &text).unwrap();
            assert_eq!(back, v, "round trip failed for {text}");
        }
    }

    #[test]
    fn float_formatting_keeps_a_decimal_point() {
        assert_eq!(fmt_float(1.0), "1.0");
        assert_eq!(fmt_float(0.5), "0.5");
        assert_eq!(fmt_float(-2.0), "-2.0");
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert!(matches!(
            Value::parse("quaternion", "0, 0, 0, 1"),
            Err(GenError::UnknownType(_))
        ));
    }
}
