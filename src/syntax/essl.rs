//! ESSL syntax (OpenGL ES / WebGL2, #version 300 es).
//!
//! Shares the GLSL spellings; differs in preamble (precision directives)
//! and in what the generator allows (no explicit binding locations).

use super::glsl::{
    glsl_default_value, glsl_type_name, glsl_value, GLSL_RESTRICTED, GLSL_TYPE_DEFINITIONS,
};
use super::Syntax;
use crate::types::TypeDesc;
use crate::value::Value;

pub struct EsslSyntax;

impl EsslSyntax {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EsslSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl Syntax for EsslSyntax {
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

    fn restricted_names(&self) -> &'static [&'static str] {
        GLSL_RESTRICTED
    }
}
