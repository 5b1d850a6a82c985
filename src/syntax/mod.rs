//! Per-target-language spelling policy.
//!
//! A [`Syntax`] knows how to spell a type name, a literal, a qualifier and
//! a swizzle for one output dialect, and how to turn arbitrary document
//! names into valid, unique identifiers. One implementation per target.

pub mod essl;
pub mod glsl;
pub mod mdl;
pub mod msl;
pub mod osl;

pub use essl::EsslSyntax;
pub use glsl::GlslSyntax;
pub use mdl::MdlSyntax;
pub use msl::MslSyntax;
pub use osl::OslSyntax;

use std::collections::HashMap;

use crate::error::{GenError, Result};
use crate::types::{TypeDesc, TypeKind};
use crate::value::{fmt_float, Value};

pub trait Syntax: Send + Sync {
    /// The spelling of a type in this language.
    fn type_name(&self, ty: &TypeDesc) -> &str;

    /// Struct/alias definitions the generated code depends on, emitted
    /// once in the preamble. Empty when the language needs none.
    fn type_definitions(&self) -> &str {
        ""
    }

    /// A literal for the zero/identity default of a type.
    fn default_value(&self, ty: &TypeDesc, uniform: bool) -> String;

    /// A literal for a concrete value.
    fn value(&self, ty: &TypeDesc, value: &Value, uniform: bool) -> String;

    /// Qualifier for uniform declarations ("uniform" where applicable).
    fn uniform_qualifier(&self) -> &str {
        ""
    }

    fn input_qualifier(&self) -> &str {
        ""
    }

    fn output_qualifier(&self) -> &str {
        ""
    }

    fn constant_qualifier(&self) -> &str;

    /// Spelling of a single-line comment prefix.
    fn comment_prefix(&self) -> &str {
        "//"
    }

    /// Spell a swizzled read of `src`, e.g. `src.xyz` or a constructor
    /// when the language cannot swizzle the source type directly.
    fn swizzle(
        &self,
        src: &str,
        src_ty: &TypeDesc,
        channels: &str,
        dst_ty: &TypeDesc,
    ) -> Result<String> {
        if src_ty.members().is_empty() && src_ty.size() != 1 {
            return Err(GenError::internal(&format!(
                "type '{}' cannot be swizzled",
                src_ty.name()
            )));
        }
        for c in channels.chars() {
            if !swizzle_channel_valid(src_ty, c) {
                return Err(GenError::internal(&format!(
                    "invalid channel '{c}' for swizzle of type '{}'",
                    src_ty.name()
                )));
            }
        }
        if dst_ty.size() == 1 {
            return Ok(if src_ty.size() == 1 {
                src.to_string()
            } else {
                format!("{src}.{channels}")
            });
        }
        // Aggregate destination: spell a constructor over the channels.
        let parts: Vec<String> = channels
            .chars()
            .map(|c| {
                if src_ty.size() == 1 {
                    src.to_string()
                } else {
                    format!("{src}.{c}")
                }
            })
            .collect();
        Ok(format!("{}({})", self.type_name(dst_ty), parts.join(", ")))
    }

    /// Structural compatibility beyond exact type equality: float-based
    /// aggregates of the same size are interchangeable (color3/vector3).
    fn allows_connection(&self, from: &TypeDesc, to: &TypeDesc) -> bool {
        from.kind() == TypeKind::Aggregate
            && to.kind() == TypeKind::Aggregate
            && from.size() == to.size()
    }

    fn type_supported(&self, _ty: &TypeDesc) -> bool {
        true
    }

    /// Identifiers the language reserves.
    fn restricted_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Strip characters the language forbids in identifiers.
    fn make_valid_name(&self, name: &mut String) {
        let mut cleaned: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if cleaned.is_empty() || cleaned.chars().next().unwrap().is_ascii_digit() {
            cleaned.insert(0, '_');
        }
        *name = cleaned;
    }

    /// Make a name unique against the given record, appending or bumping
    /// a numeric suffix on collision. Reserved words always collide.
    fn make_unique(&self, name: &mut String, unique: &mut HashMap<String, usize>) {
        let restricted = self.restricted_names().contains(&name.as_str());
        match unique.get(name).copied() {
            None if !restricted => {
                unique.insert(name.clone(), 0);
            }
            _ => {
                let base = name.clone();
                let mut count = unique.get(&base).copied().unwrap_or(0);
                loop {
                    count += 1;
                    let candidate = format!("{base}{count}");
                    if !unique.contains_key(&candidate)
                        && !self.restricted_names().contains(&candidate.as_str())
                    {
                        unique.insert(base, count);
                        unique.insert(candidate.clone(), 0);
                        *name = candidate;
                        break;
                    }
                }
            }
        }
    }
}

fn swizzle_channel_valid(ty: &TypeDesc, c: char) -> bool {
    if ty.size() == 1 {
        return matches!(c, 'x' | 'r');
    }
    ty.members().iter().any(|m| m.name.chars().next() == Some(c))
}

/// Spell an aggregate constructor: `head(a, b, c)`.
pub(crate) fn aggregate(head: &str, components: &[f32]) -> String {
    let parts: Vec<String> = components.iter().map(|c| fmt_float(*c)).collect();
    format!("{head}({})", parts.join(", "))
}

/// Shared scalar spelling used by the C-like targets.
pub(crate) fn scalar_value(value: &Value) -> String {
    match value {
        Value::Float(f) => fmt_float(*f),
        Value::Integer(i) => i.to_string(),
        Value::Boolean(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    #[test]
    fn unique_names_get_numeric_suffixes() {
        let syntax = GlslSyntax::new();
        let mut unique = HashMap::new();

        let mut a = "image1_out".to_string();
        syntax.make_unique(&mut a, &mut unique);
        assert_eq!(a, "image1_out");

        let mut b = "image1_out".to_string();
        syntax.make_unique(&mut b, &mut unique);
        assert_eq!(b, "image1_out1");

        let mut c = "image1_out".to_string();
        syntax.make_unique(&mut c, &mut unique);
        assert_eq!(c, "image1_out2");
    }

    #[test]
    fn reserved_words_are_renamed() {
        let syntax = GlslSyntax::new();
        let mut unique = HashMap::new();
        let mut name = "sampler2D".to_string();
        syntax.make_unique(&mut name, &mut unique);
        assert_ne!(name, "sampler2D");
    }

    #[test]
    fn invalid_characters_are_scrubbed() {
        let syntax = GlslSyntax::new();
        let mut name = "3rd-stage.out".to_string();
        syntax.make_valid_name(&mut name);
        assert_eq!(name, "_3rd_stage_out");
    }

    #[test]
    fn swizzle_spelling() {
        let types = TypeRegistry::with_standard_types();
        let syntax = GlslSyntax::new();
        let c3 = types.get("color3").unwrap();
        let f = types.get("float").unwrap();
        let v3 = types.get("vector3").unwrap();

        assert_eq!(syntax.swizzle("c", &c3, "r", &f).unwrap(), "c.r");
        assert_eq!(
            syntax.swizzle("f", &f, "xxx", &v3).unwrap(),
            "vec3(f, f, f)"
        );
        assert!(syntax.swizzle("c", &c3, "w", &f).is_err());
    }

    #[test]
    fn color_and_vector_of_same_size_are_connectable() {
        let types = TypeRegistry::with_standard_types();
        let syntax = GlslSyntax::new();
        let c3 = types.get("color3").unwrap();
        let v3 = types.get("vector3").unwrap();
        let v2 = types.get("vector2").unwrap();
        assert!(syntax.allows_connection(&c3, &v3));
        assert!(!syntax.allows_connection(&c3, &v2));
    }
}
