//! Generation options.

use serde::Deserialize;

/// Which node inputs get published as shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderInterface {
    /// A uniform for every editable unconnected input.
    #[default]
    Complete,
    /// Uniforms only for inputs published on the graph interface.
    Reduced,
}

/// Method used for specular environment lighting on hardware targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecularEnv {
    #[default]
    Prefilter,
    FilteredImportanceSampling,
    None,
}

/// Generation options, settable per call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenOptions {
    pub shader_interface: ShaderInterface,
    /// Flip the v coordinate on file texture samples.
    pub file_texture_vertical_flip: bool,
    /// Overrides the document's working color space.
    pub target_color_space: Option<String>,
    /// Enable transparency code paths on hardware targets.
    pub hw_transparency: bool,
    pub specular_environment: SpecularEnv,
    /// Bounds the generated light loop.
    pub max_active_lights: u32,
    /// Fail generation when a declared color space has no transform,
    /// instead of passing the raw value through.
    pub strict_color_transforms: bool,
    /// Assign explicit binding locations to uniform blocks. Targets that
    /// forbid manual bindings (ESSL) fail generation when set.
    pub hw_explicit_bindings: bool,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            shader_interface: ShaderInterface::Complete,
            file_texture_vertical_flip: false,
            target_color_space: None,
            hw_transparency: false,
            specular_environment: SpecularEnv::Prefilter,
            max_active_lights: 3,
            strict_color_transforms: false,
            hw_explicit_bindings: false,
        }
    }
}
