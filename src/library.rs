//! The built-in node library.
//!
//! Node definitions with per-target source templates for the common
//! value nodes, the physically-based closure set and the surface
//! constructors, plus the registration of the implementation objects the
//! templates cannot express (closure composition, conditionals, surface
//! light integration, geometric inputs). User documents are laid over
//! this library with `Document::import`.

use std::sync::Arc;

use crate::document::{Document, ImplElement, NodeDef, PortDef};
use crate::nodes::add::{HwClosureAddImpl, MdlClosureAddImpl, OslClosureAddImpl};
use crate::nodes::conditional::{CompareImpl, SwitchImpl, TernaryCompareImpl, TernarySwitchImpl};
use crate::nodes::geom::GeomPropImpl;
use crate::nodes::image::HwImageImpl;
use crate::nodes::layer::{HwClosureLayerImpl, MdlClosureLayerImpl, OslClosureLayerImpl};
use crate::nodes::mix::{HwClosureMixImpl, MdlClosureMixImpl, OslClosureMixImpl};
use crate::nodes::source_code::DefaultOutputImpl;
use crate::nodes::surface::{SurfaceHwImpl, SurfaceMdlImpl, SurfaceOslImpl};
use crate::nodes::swizzle::SwizzleImpl;
use crate::registry::ImplRegistry;

const HW_TARGETS: [&str; 3] = ["glsl", "essl", "msl"];

fn port(name: &str, ty: &str, value: Option<&str>) -> PortDef {
    PortDef {
        name: name.to_string(),
        ty: ty.to_string(),
        value: value.map(|v| v.to_string()),
        uniform: false,
    }
}

fn uniform_port(name: &str, ty: &str, value: Option<&str>) -> PortDef {
    PortDef {
        uniform: true,
        ..port(name, ty, value)
    }
}

fn inline(target: &str, source: &str) -> ImplElement {
    ImplElement {
        target: target.to_string(),
        source: Some(source.to_string()),
        ..Default::default()
    }
}

fn function(target: &str, name: &str, source: Option<&str>) -> ImplElement {
    ImplElement {
        target: target.to_string(),
        function: Some(name.to_string()),
        source: source.map(|s| s.to_string()),
        ..Default::default()
    }
}

fn nodedef(
    name: &str,
    category: &str,
    inputs: Vec<PortDef>,
    out_ty: &str,
    implementations: Vec<ImplElement>,
) -> NodeDef {
    NodeDef {
        name: name.to_string(),
        node: category.to_string(),
        inputs,
        outputs: vec![port("out", out_ty, None)],
        implementations,
        ..Default::default()
    }
}

// ── Closure function sources (GLSL family) ─────────────────────────────

const GLSL_OREN_NAYAR_SOURCE: &str = "\
void mx_oren_nayar_diffuse_bsdf_reflection(vec3 L, vec3 V, float weight, vec3 color, float roughness, vec3 normal, out BSDF bsdf)
{
    bsdf.throughput = vec3(0.0);
    float NdotL = clamp(dot(normal, L), 0.0, 1.0);
    bsdf.response = color * weight * NdotL / 3.14159265;
}

void mx_oren_nayar_diffuse_bsdf_indirect(vec3 V, float weight, vec3 color, float roughness, vec3 normal, out BSDF bsdf)
{
    bsdf.throughput = vec3(0.0);
    bsdf.response = color * weight * 0.5;
}";

const GLSL_DIELECTRIC_SOURCE: &str = "\
float mx_fresnel_schlick(float cosTheta, float ior)
{
    float F0 = (ior - 1.0) / (ior + 1.0);
    F0 *= F0;
    float x = clamp(1.0 - cosTheta, 0.0, 1.0);
    float x5 = x * x * x * x * x;
    return F0 + (1.0 - F0) * x5;
}

void mx_dielectric_bsdf_reflection(vec3 L, vec3 V, float weight, vec3 tint, float ior, vec2 roughness, vec3 normal, int scatter_mode, BSDF base, out BSDF bsdf)
{
    float NdotV = clamp(dot(normal, V), 1e-4, 1.0);
    float F = mx_fresnel_schlick(NdotV, ior) * weight;
    bsdf.throughput = vec3(1.0 - F);
    float NdotL = clamp(dot(normal, L), 0.0, 1.0);
    bsdf.response = tint * (F * NdotL) + base.response * bsdf.throughput;
    bsdf.throughput = bsdf.throughput * base.throughput;
}

void mx_dielectric_bsdf_reflection(vec3 L, vec3 V, float weight, vec3 tint, float ior, vec2 roughness, vec3 normal, int scatter_mode, BSDF base, float tf_thickness, float tf_ior, out BSDF bsdf)
{
    float iridescence = 0.5 + 0.5 * cos(tf_thickness * 0.0123 + tf_ior);
    mx_dielectric_bsdf_reflection(L, V, weight * iridescence, tint, ior, roughness, normal, scatter_mode, base, bsdf);
}

void mx_dielectric_bsdf_transmission(vec3 V, float weight, vec3 tint, float ior, vec2 roughness, vec3 normal, int scatter_mode, BSDF base, out BSDF bsdf)
{
    float NdotV = clamp(dot(normal, V), 1e-4, 1.0);
    float F = mx_fresnel_schlick(NdotV, ior) * weight;
    bsdf.throughput = tint * (1.0 - F);
    bsdf.response = tint * (1.0 - F) + base.response * bsdf.throughput;
    bsdf.throughput = bsdf.throughput * base.throughput;
}

void mx_dielectric_bsdf_transmission(vec3 V, float weight, vec3 tint, float ior, vec2 roughness, vec3 normal, int scatter_mode, BSDF base, float tf_thickness, float tf_ior, out BSDF bsdf)
{
    mx_dielectric_bsdf_transmission(V, weight, tint, ior, roughness, normal, scatter_mode, base, bsdf);
}

void mx_dielectric_bsdf_indirect(vec3 V, float weight, vec3 tint, float ior, vec2 roughness, vec3 normal, int scatter_mode, BSDF base, out BSDF bsdf)
{
    float NdotV = clamp(dot(normal, V), 1e-4, 1.0);
    float F = mx_fresnel_schlick(NdotV, ior) * weight;
    bsdf.throughput = vec3(1.0 - F);
    bsdf.response = tint * F + base.response * bsdf.throughput;
    bsdf.throughput = bsdf.throughput * base.throughput;
}

void mx_dielectric_bsdf_indirect(vec3 V, float weight, vec3 tint, float ior, vec2 roughness, vec3 normal, int scatter_mode, BSDF base, float tf_thickness, float tf_ior, out BSDF bsdf)
{
    float iridescence = 0.5 + 0.5 * cos(tf_thickness * 0.0123 + tf_ior);
    mx_dielectric_bsdf_indirect(V, weight * iridescence, tint, ior, roughness, normal, scatter_mode, base, bsdf);
}";

const GLSL_UNIFORM_EDF_SOURCE: &str = "\
void mx_uniform_edf(vec3 N, vec3 L, vec3 color, out EDF result)
{
    result = color;
}";

// ── Closure function sources (OSL) ─────────────────────────────────────

const OSL_OREN_NAYAR_SOURCE: &str = "\
closure color mx_oren_nayar_diffuse_bsdf(float weight, color albedo, float roughness, vector n)
{
    return (weight * albedo) * oren_nayar(n, roughness);
}";

const OSL_DIELECTRIC_SOURCE: &str = "\
closure color mx_dielectric_bsdf(float weight, color tint, float ior, vector2 roughness, vector n, string scatter_mode, closure color base)
{
    closure color spec = (weight * tint) * microfacet(\"ggx\", n, roughness.x, ior, 0);
    if (scatter_mode == \"T\")
        return (weight * tint) * refraction(n, ior) + base;
    return spec + base;
}";

const OSL_UNIFORM_EDF_SOURCE: &str = "\
closure color mx_uniform_edf(color intensity)
{
    return intensity * emission();
}";

const OSL_IMAGE_SOURCE: &str = "\
color mx_image_color3(string file, vector2 uv)
{
    return texture(file, uv.x, uv.y);
}";

/// The library document: node definitions and their source templates.
pub fn document() -> Document {
    let mut doc = Document::default();

    // Constants.
    for (suffix, ty) in [("float", "float"), ("color3", "color3"), ("vector3", "vector3")] {
        doc.nodedefs.push(nodedef(
            &format!("ND_constant_{suffix}"),
            "constant",
            vec![port("value", ty, Some(if ty == "float" { "0.0" } else { "0.0, 0.0, 0.0" }))],
            ty,
            vec![inline("", "{{value}}")],
        ));
    }

    // Arithmetic.
    for (suffix, ty) in [("float", "float"), ("color3", "color3"), ("vector3", "vector3")] {
        let zero = if ty == "float" { "0.0" } else { "0.0, 0.0, 0.0" };
        doc.nodedefs.push(nodedef(
            &format!("ND_add_{suffix}"),
            "add",
            vec![port("in1", ty, Some(zero)), port("in2", ty, Some(zero))],
            ty,
            vec![inline("", "{{in1}} + {{in2}}")],
        ));
        doc.nodedefs.push(nodedef(
            &format!("ND_multiply_{suffix}"),
            "multiply",
            vec![port("in1", ty, Some(zero)), port("in2", ty, Some(zero))],
            ty,
            vec![inline("", "{{in1}} * {{in2}}")],
        ));
        doc.nodedefs.push(nodedef(
            &format!("ND_mix_{suffix}"),
            "mix",
            vec![
                port("fg", ty, Some(zero)),
                port("bg", ty, Some(zero)),
                port("mix", "float", Some("0.0")),
            ],
            ty,
            vec![
                inline("glsl", "mix({{bg}}, {{fg}}, {{mix}})"),
                inline("essl", "mix({{bg}}, {{fg}}, {{mix}})"),
                inline("msl", "mix({{bg}}, {{fg}}, {{mix}})"),
                inline("osl", "mix({{bg}}, {{fg}}, {{mix}})"),
                inline("mdl", "math::lerp({{bg}}, {{fg}}, {{mix}})"),
            ],
        ));
    }

    // Conversions.
    doc.nodedefs.push(nodedef(
        "ND_convert_color3_vector3",
        "convert",
        vec![port("in", "color3", Some("0.0, 0.0, 0.0"))],
        "vector3",
        vec![
            inline("glsl", "{{in}}"),
            inline("essl", "{{in}}"),
            inline("msl", "{{in}}"),
            inline("osl", "vector({{in}}[0], {{in}}[1], {{in}}[2])"),
            inline("mdl", "float3({{in}})"),
        ],
    ));
    doc.nodedefs.push(nodedef(
        "ND_convert_vector3_color3",
        "convert",
        vec![port("in", "vector3", Some("0.0, 0.0, 0.0"))],
        "color3",
        vec![
            inline("glsl", "{{in}}"),
            inline("essl", "{{in}}"),
            inline("msl", "{{in}}"),
            inline("osl", "color({{in}}[0], {{in}}[1], {{in}}[2])"),
            inline("mdl", "color({{in}})"),
        ],
    ));

    // Swizzle.
    doc.nodedefs.push(nodedef(
        "ND_swizzle_color3_float",
        "swizzle",
        vec![
            port("in", "color3", Some("0.0, 0.0, 0.0")),
            uniform_port("channels", "string", Some("r")),
        ],
        "float",
        vec![],
    ));
    doc.nodedefs.push(nodedef(
        "ND_swizzle_float_color3",
        "swizzle",
        vec![
            port("in", "float", Some("0.0")),
            uniform_port("channels", "string", Some("rrr")),
        ],
        "color3",
        vec![],
    ));

    // Conditionals.
    for (suffix, ty) in [("float", "float"), ("color3", "color3")] {
        let zero = if ty == "float" { "0.0" } else { "0.0, 0.0, 0.0" };
        let mut def = nodedef(
            &format!("ND_compare_{suffix}"),
            "compare",
            vec![
                port("intest", "float", Some("0.0")),
                port("cutoff", "float", Some("0.0")),
                port("in1", ty, Some(zero)),
                port("in2", ty, Some(zero)),
            ],
            ty,
            vec![],
        );
        def.nodegroup = "conditional".to_string();
        doc.nodedefs.push(def);

        let mut def = nodedef(
            &format!("ND_switch_{suffix}"),
            "switch",
            vec![
                port("in1", ty, Some(zero)),
                port("in2", ty, Some(zero)),
                port("in3", ty, Some(zero)),
                port("in4", ty, Some(zero)),
                port("in5", ty, Some(zero)),
                port("which", "float", Some("0.0")),
            ],
            ty,
            vec![],
        );
        def.nodegroup = "conditional".to_string();
        doc.nodedefs.push(def);
    }

    // Geometric inputs.
    doc.nodedefs.push(nodedef("ND_position_vector3", "position", vec![], "vector3", vec![]));
    doc.nodedefs.push(nodedef("ND_normal_vector3", "normal", vec![], "vector3", vec![]));
    doc.nodedefs.push(nodedef("ND_texcoord_vector2", "texcoord", vec![], "vector2", vec![]));

    // Image.
    doc.nodedefs.push(nodedef(
        "ND_image_color3",
        "image",
        vec![
            uniform_port("file", "filename", None),
            port("texcoord", "vector2", Some("0.0, 0.0")),
        ],
        "color3",
        vec![
            function("osl", "mx_image_color3", Some(OSL_IMAGE_SOURCE)),
            function("mdl", "materialx::image_color3", None),
        ],
    ));

    // BSDF/EDF leaves.
    doc.nodedefs.push(nodedef(
        "ND_oren_nayar_diffuse_bsdf",
        "oren_nayar_diffuse_bsdf",
        vec![
            port("weight", "float", Some("1.0")),
            port("color", "color3", Some("0.18, 0.18, 0.18")),
            port("roughness", "float", Some("0.0")),
            port("normal", "vector3", Some("0.0, 0.0, 1.0")),
        ],
        "BSDF",
        vec![
            function("glsl", "mx_oren_nayar_diffuse_bsdf", Some(GLSL_OREN_NAYAR_SOURCE)),
            function("essl", "mx_oren_nayar_diffuse_bsdf", Some(GLSL_OREN_NAYAR_SOURCE)),
            function("msl", "mx_oren_nayar_diffuse_bsdf", Some(GLSL_OREN_NAYAR_SOURCE)),
            function("osl", "mx_oren_nayar_diffuse_bsdf", Some(OSL_OREN_NAYAR_SOURCE)),
            function("mdl", "materialx::oren_nayar_diffuse_bsdf", None),
        ],
    ));
    doc.nodedefs.push(nodedef(
        "ND_dielectric_bsdf",
        "dielectric_bsdf",
        vec![
            port("weight", "float", Some("1.0")),
            port("tint", "color3", Some("1.0, 1.0, 1.0")),
            port("ior", "float", Some("1.5")),
            port("roughness", "vector2", Some("0.05, 0.05")),
            port("normal", "vector3", Some("0.0, 0.0, 1.0")),
            uniform_port("scatter_mode", "string", Some("R")),
            port("base", "BSDF", None),
        ],
        "BSDF",
        vec![
            function("glsl", "mx_dielectric_bsdf", Some(GLSL_DIELECTRIC_SOURCE)),
            function("essl", "mx_dielectric_bsdf", Some(GLSL_DIELECTRIC_SOURCE)),
            function("msl", "mx_dielectric_bsdf", Some(GLSL_DIELECTRIC_SOURCE)),
            function("osl", "mx_dielectric_bsdf", Some(OSL_DIELECTRIC_SOURCE)),
            function("mdl", "materialx::dielectric_bsdf", None),
        ],
    ));
    doc.nodedefs.push(nodedef(
        "ND_thin_film_bsdf",
        "thin_film_bsdf",
        vec![
            port("thickness", "float", Some("550.0")),
            port("ior", "float", Some("1.5")),
        ],
        "BSDF",
        vec![],
    ));
    doc.nodedefs.push(nodedef(
        "ND_uniform_edf",
        "uniform_edf",
        vec![port("color", "color3", Some("1.0, 1.0, 1.0"))],
        "EDF",
        vec![
            function("glsl", "mx_uniform_edf", Some(GLSL_UNIFORM_EDF_SOURCE)),
            function("essl", "mx_uniform_edf", Some(GLSL_UNIFORM_EDF_SOURCE)),
            function("msl", "mx_uniform_edf", Some(GLSL_UNIFORM_EDF_SOURCE)),
            function("osl", "mx_uniform_edf", Some(OSL_UNIFORM_EDF_SOURCE)),
            function("mdl", "materialx::uniform_edf", None),
        ],
    ));

    // Closure composition.
    for (name, ty) in [("ND_mix_bsdf", "BSDF"), ("ND_mix_edf", "EDF"), ("ND_mix_vdf", "VDF")] {
        doc.nodedefs.push(nodedef(
            name,
            "mix",
            vec![
                port("fg", ty, None),
                port("bg", ty, None),
                port("mix", "float", Some("0.0")),
            ],
            ty,
            vec![],
        ));
    }
    for (name, ty) in [("ND_add_bsdf", "BSDF"), ("ND_add_edf", "EDF")] {
        doc.nodedefs.push(nodedef(
            name,
            "add",
            vec![port("in1", ty, None), port("in2", ty, None)],
            ty,
            vec![],
        ));
    }
    doc.nodedefs.push(nodedef(
        "ND_layer_bsdf",
        "layer",
        vec![port("top", "BSDF", None), port("base", "BSDF", None)],
        "BSDF",
        vec![],
    ));
    doc.nodedefs.push(nodedef(
        "ND_layer_vdf",
        "layer",
        vec![port("top", "BSDF", None), port("base", "VDF", None)],
        "BSDF",
        vec![],
    ));

    // Surface constructors.
    doc.nodedefs.push(nodedef(
        "ND_surface",
        "surface",
        vec![
            port("bsdf", "BSDF", None),
            port("edf", "EDF", None),
            port("opacity", "float", Some("1.0")),
        ],
        "surfaceshader",
        vec![],
    ));
    doc.nodedefs.push(nodedef(
        "ND_surfacematerial",
        "surfacematerial",
        vec![port("surfaceshader", "surfaceshader", None)],
        "material",
        vec![inline("", "{{surfaceshader}}")],
    ));

    doc
}

/// Register the implementation objects the library's templates cannot
/// express. Called once while building a generator setup.
pub fn register_impls(reg: &mut ImplRegistry) {
    let hw_mix = Arc::new(HwClosureMixImpl);
    let hw_add = Arc::new(HwClosureAddImpl);
    let hw_layer = Arc::new(HwClosureLayerImpl);
    let hw_surface = Arc::new(SurfaceHwImpl);
    let compare = Arc::new(CompareImpl);
    let switch = Arc::new(SwitchImpl);
    let swizzle = Arc::new(SwizzleImpl);
    let thin_film = Arc::new(DefaultOutputImpl);

    for target in HW_TARGETS {
        for def in ["ND_mix_bsdf", "ND_mix_edf", "ND_mix_vdf"] {
            reg.register(def, target, hw_mix.clone());
        }
        for def in ["ND_add_bsdf", "ND_add_edf"] {
            reg.register(def, target, hw_add.clone());
        }
        for def in ["ND_layer_bsdf", "ND_layer_vdf"] {
            reg.register(def, target, hw_layer.clone());
        }
        reg.register("ND_surface", target, hw_surface.clone());
        reg.register("ND_image_color3", target, Arc::new(HwImageImpl));

        reg.register(
            "ND_position_vector3",
            target,
            Arc::new(GeomPropImpl::new(
                "vd.positionWorld",
                Some(("positionWorld", "vector3")),
                None,
            )),
        );
        reg.register(
            "ND_normal_vector3",
            target,
            Arc::new(GeomPropImpl::new(
                "normalize(vd.normalWorld)",
                Some(("normalWorld", "vector3")),
                Some(("i_normal", "vector3")),
            )),
        );
        reg.register(
            "ND_texcoord_vector2",
            target,
            Arc::new(GeomPropImpl::new(
                "vd.texcoord_0",
                Some(("texcoord_0", "vector2")),
                Some(("i_texcoord_0", "vector2")),
            )),
        );
    }

    // CPU targets.
    reg.register("ND_mix_bsdf", "osl", Arc::new(OslClosureMixImpl));
    reg.register("ND_mix_edf", "osl", Arc::new(OslClosureMixImpl));
    reg.register("ND_mix_vdf", "osl", Arc::new(OslClosureMixImpl));
    reg.register("ND_add_bsdf", "osl", Arc::new(OslClosureAddImpl));
    reg.register("ND_add_edf", "osl", Arc::new(OslClosureAddImpl));
    reg.register("ND_layer_bsdf", "osl", Arc::new(OslClosureLayerImpl));
    reg.register("ND_layer_vdf", "osl", Arc::new(OslClosureLayerImpl));
    reg.register("ND_surface", "osl", Arc::new(SurfaceOslImpl));
    reg.register(
        "ND_position_vector3",
        "osl",
        Arc::new(GeomPropImpl::new("P", None, None)),
    );
    reg.register(
        "ND_normal_vector3",
        "osl",
        Arc::new(GeomPropImpl::new("N", None, None)),
    );
    reg.register(
        "ND_texcoord_vector2",
        "osl",
        Arc::new(GeomPropImpl::new("vector2(u, v)", None, None)),
    );

    reg.register("ND_mix_bsdf", "mdl", Arc::new(MdlClosureMixImpl));
    reg.register("ND_mix_edf", "mdl", Arc::new(MdlClosureMixImpl));
    reg.register("ND_mix_vdf", "mdl", Arc::new(MdlClosureMixImpl));
    reg.register("ND_add_bsdf", "mdl", Arc::new(MdlClosureAddImpl));
    reg.register("ND_add_edf", "mdl", Arc::new(MdlClosureAddImpl));
    reg.register("ND_layer_bsdf", "mdl", Arc::new(MdlClosureLayerImpl));
    reg.register("ND_layer_vdf", "mdl", Arc::new(MdlClosureLayerImpl));
    reg.register("ND_surface", "mdl", Arc::new(SurfaceMdlImpl));
    reg.register(
        "ND_position_vector3",
        "mdl",
        Arc::new(GeomPropImpl::new("state::position()", None, None)),
    );
    reg.register(
        "ND_normal_vector3",
        "mdl",
        Arc::new(GeomPropImpl::new("state::normal()", None, None)),
    );
    reg.register(
        "ND_texcoord_vector2",
        "mdl",
        Arc::new(GeomPropImpl::new(
            "float2(state::texture_coordinate(0).x, state::texture_coordinate(0).y)",
            None,
            None,
        )),
    );

    // Target-agnostic implementations.
    for def in ["ND_compare_float", "ND_compare_color3"] {
        reg.register(def, "", compare.clone());
        reg.register(def, "mdl", Arc::new(TernaryCompareImpl));
    }
    for def in ["ND_switch_float", "ND_switch_color3"] {
        reg.register(def, "", switch.clone());
        reg.register(def, "mdl", Arc::new(TernarySwitchImpl));
    }
    for def in ["ND_swizzle_color3_float", "ND_swizzle_float_color3"] {
        reg.register(def, "", swizzle.clone());
    }
    reg.register("ND_thin_film_bsdf", "", thin_film);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_nodedefs_resolve_for_all_targets() {
        let doc = document();
        let reg = {
            let mut r = ImplRegistry::new();
            register_impls(&mut r);
            r
        };
        for def in &doc.nodedefs {
            for target in ["glsl", "essl", "msl", "osl", "mdl"] {
                assert!(
                    reg.find(&doc, def, target).is_ok(),
                    "no implementation for {} on {target}",
                    def.name
                );
            }
        }
    }
}
