//! Color management hook.
//!
//! The graph builder consults a [`ColorSystem`] whenever a value or
//! texture result carries a non-default color space. A supported
//! transform yields an inline source template the builder wraps into a
//! synthetic texture node; an unsupported one passes through, or fails
//! the build in strict mode. That check lives in the graph builder, the
//! single place the option is read.

use crate::nodes::source_code::SourceCodeImpl;
use crate::types::TypeDesc;

/// Inline source for one color transform, ready to become a node
/// implementation. The template reads its input through `{{in}}`.
pub struct ColorTransformSource {
    pub source: String,
}

impl ColorTransformSource {
    pub fn into_impl(self) -> SourceCodeImpl {
        SourceCodeImpl::inline(&self.source, vec!["in".to_string()])
    }
}

pub trait ColorSystem: Send + Sync {
    /// Whether a transform exists for (source space, target space, type).
    fn supports(&self, from: &str, to: &str, ty: &TypeDesc) -> bool;

    /// The transform's inline source for a target language, or None when
    /// the transform is unsupported.
    fn transform_source(
        &self,
        from: &str,
        to: &str,
        ty: &TypeDesc,
        target: &str,
    ) -> Option<ColorTransformSource>;
}

/// The default color system: gamma conversions between the common
/// srgb/gamma spaces and scene-linear Rec.709.
pub struct DefaultColorSystem;

impl DefaultColorSystem {
    pub fn new() -> Self {
        Self
    }

    /// Power applied per transform, None when the pair is unsupported.
    fn exponent(from: &str, to: &str) -> Option<&'static str> {
        match (from, to) {
            ("srgb_texture", "lin_rec709") | ("gamma22", "lin_rec709") => Some("2.2"),
            ("gamma18", "lin_rec709") => Some("1.8"),
            ("lin_rec709", "srgb_texture") | ("lin_rec709", "gamma22") => Some("1.0 / 2.2"),
            ("lin_rec709", "gamma18") => Some("1.0 / 1.8"),
            _ => None,
        }
    }
}

impl Default for DefaultColorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorSystem for DefaultColorSystem {
    fn supports(&self, from: &str, to: &str, ty: &TypeDesc) -> bool {
        (ty.name() == "color3" || ty.name() == "color4") && Self::exponent(from, to).is_some()
    }

    fn transform_source(
        &self,
        from: &str,
        to: &str,
        ty: &TypeDesc,
        target: &str,
    ) -> Option<ColorTransformSource> {
        if !self.supports(from, to, ty) {
            return None;
        }
        let exponent = Self::exponent(from, to)?;
        let source = match (target, ty.name()) {
            ("glsl" | "essl", "color3") => format!("pow({{{{in}}}}, vec3({exponent}))"),
            ("glsl" | "essl", "color4") => {
                format!("vec4(pow({{{{in}}}}.rgb, vec3({exponent})), {{{{in}}}}.a)")
            }
            ("msl", "color3") => format!("pow({{{{in}}}}, float3({exponent}))"),
            ("msl", "color4") => {
                format!("float4(pow({{{{in}}}}.rgb, float3({exponent})), {{{{in}}}}.a)")
            }
            ("osl", "color3") => format!("pow({{{{in}}}}, {exponent})"),
            ("osl", "color4") => {
                format!("color4(pow({{{{in}}}}.rgb, {exponent}), {{{{in}}}}.a)")
            }
            ("mdl", "color3") => format!("math::pow({{{{in}}}}, {exponent})"),
            ("mdl", "color4") => format!(
                "float4(math::pow(float3({{{{in}}}}.x, {{{{in}}}}.y, {{{{in}}}}.z), {exponent}), {{{{in}}}}.w)"
            ),
            _ => return None,
        };
        Some(ColorTransformSource { source })
    }
}

/// A color system with no transforms at all. Useful for tests exercising
/// the strict-mode failure path.
pub struct NoColorSystem;

impl ColorSystem for NoColorSystem {
    fn supports(&self, _from: &str, _to: &str, _ty: &TypeDesc) -> bool {
        false
    }

    fn transform_source(
        &self,
        _from: &str,
        _to: &str,
        _ty: &TypeDesc,
        _target: &str,
    ) -> Option<ColorTransformSource> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    #[test]
    fn srgb_to_linear_is_supported_for_colors_only() {
        let types = TypeRegistry::with_standard_types();
        let cs = DefaultColorSystem::new();
        let c3 = types.get("color3").unwrap();
        let f = types.get("float").unwrap();
        assert!(cs.supports("srgb_texture", "lin_rec709", &c3));
        assert!(!cs.supports("srgb_texture", "lin_rec709", &f));
        assert!(!cs.supports("aces2065", "lin_rec709", &c3));
    }

    #[test]
    fn transform_source_substitutes_per_target() {
        let types = TypeRegistry::with_standard_types();
        let cs = DefaultColorSystem::new();
        let c3 = types.get("color3").unwrap();
        let src = cs
            .transform_source("srgb_texture", "lin_rec709", &c3, "glsl")
            .unwrap();
        assert_eq!(src.source, "pow({{in}}, vec3(2.2))");
    }
}
