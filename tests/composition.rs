//! Closure composition tests: mix, layer, add, thin film, and the
//! per-purpose re-evaluation driven by the surface node.

use shadegen::shader::PIXEL_STAGE;
use shadegen::{generate_shader, Document, GenError, GenOptions};

/// A surface document: two BSDF leaves combined by `combiner`, feeding a
/// surface node tapped by the output.
fn surface_doc(combiner: &str) -> Document {
    Document::from_json(&format!(
        r#"{{
            "nodes": [
                {{
                    "name": "diff1",
                    "category": "oren_nayar_diffuse_bsdf",
                    "type": "BSDF",
                    "inputs": [{{"name": "color", "value": "0.8, 0.7, 0.6"}}]
                }},
                {{
                    "name": "spec1",
                    "category": "dielectric_bsdf",
                    "type": "BSDF",
                    "inputs": [
                        {{"name": "ior", "value": "1.5"}},
                        {{"name": "scatter_mode", "value": "RT"}}
                    ]
                }},
                {combiner},
                {{
                    "name": "surf1",
                    "category": "surface",
                    "type": "surfaceshader",
                    "inputs": [{{"name": "bsdf", "node": "comb1"}}]
                }}
            ],
            "outputs": [{{"name": "out1", "type": "surfaceshader", "node": "surf1"}}]
        }}"#
    ))
    .unwrap()
}

#[test]
fn surface_emits_light_loop_and_purpose_suffixes() {
    let doc = surface_doc(
        r#"{
            "name": "comb1",
            "category": "mix",
            "type": "BSDF",
            "inputs": [
                {"name": "fg", "node": "spec1"},
                {"name": "bg", "node": "diff1"},
                {"name": "mix", "value": "0.5"}
            ]
        }"#,
    );
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);

    assert!(
        pixel.contains("for (int activeLightIndex = 0; activeLightIndex < numLights; ++activeLightIndex)"),
        "missing light loop:\n{pixel}"
    );
    assert!(pixel.contains("_reflection("), "missing reflection calls:\n{pixel}");
    assert!(pixel.contains("_indirect("), "missing indirect calls:\n{pixel}");
    assert!(pixel.contains("sampleLightSource"), "missing light sampling:\n{pixel}");
    assert!(pixel.contains("#define MAX_LIGHT_SOURCES 3"));
}

#[test]
fn mix_lerps_response_and_throughput() {
    let doc = surface_doc(
        r#"{
            "name": "comb1",
            "category": "mix",
            "type": "BSDF",
            "inputs": [
                {"name": "fg", "node": "spec1"},
                {"name": "bg", "node": "diff1"},
                {"name": "mix", "value": "0.5"}
            ]
        }"#,
    );
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);

    assert!(
        pixel.contains("comb1_out.response = mix(diff1_out.response, spec1_out.response,"),
        "mix response formula missing:\n{pixel}"
    );
    assert!(
        pixel.contains("comb1_out.throughput = mix(diff1_out.throughput, spec1_out.throughput,"),
        "mix throughput formula missing:\n{pixel}"
    );
}

#[test]
fn layer_redirects_base_into_the_top_call() {
    let doc = surface_doc(
        r#"{
            "name": "comb1",
            "category": "layer",
            "type": "BSDF",
            "inputs": [
                {"name": "top", "node": "spec1"},
                {"name": "base", "node": "diff1"}
            ]
        }"#,
    );
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);

    // The top BSDF writes straight into the layer's variable, reading
    // the base result through its own base slot.
    assert!(
        pixel.contains("diff1_out, comb1_out)"),
        "top call should take the base result and write the layer output:\n{pixel}"
    );
    // The base-modulation arithmetic lives in the BSDF definition.
    assert!(
        pixel.contains("base.response * bsdf.throughput"),
        "layer response formula missing:\n{pixel}"
    );
    assert!(
        pixel.contains("bsdf.throughput * base.throughput"),
        "layer throughput formula missing:\n{pixel}"
    );
}

#[test]
fn layer_over_unlayerable_top_fails() {
    // Diffuse has no base slot, so it cannot sit on top of a layer.
    let doc = surface_doc(
        r#"{
            "name": "comb1",
            "category": "layer",
            "type": "BSDF",
            "inputs": [
                {"name": "top", "node": "diff1"},
                {"name": "base", "node": "spec1"}
            ]
        }"#,
    );
    let err = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap_err();
    assert!(
        matches!(err, GenError::InvalidNode { .. }),
        "expected invalid-node error, got: {err}"
    );
    assert!(err.to_string().contains("not layerable"), "got: {err}");
}

#[test]
fn thin_film_arguments_reach_the_first_bsdf_leaf() {
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "tf1",
                    "category": "thin_film_bsdf",
                    "type": "BSDF",
                    "inputs": [
                        {"name": "thickness", "value": "550.0"},
                        {"name": "ior", "value": "1.33"}
                    ]
                },
                {
                    "name": "spec1",
                    "category": "dielectric_bsdf",
                    "type": "BSDF"
                },
                {
                    "name": "comb1",
                    "category": "layer",
                    "type": "BSDF",
                    "inputs": [
                        {"name": "top", "node": "tf1"},
                        {"name": "base", "node": "spec1"}
                    ]
                },
                {
                    "name": "surf1",
                    "category": "surface",
                    "type": "surfaceshader",
                    "inputs": [{"name": "bsdf", "node": "comb1"}]
                }
            ],
            "outputs": [{"name": "out1", "type": "surfaceshader", "node": "surf1"}]
        }"#,
    )
    .unwrap();
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);

    // The dielectric call takes the thin-film parameters just before its
    // output argument, writing the layer node's variable.
    assert!(
        pixel.contains("tf1_thickness, tf1_ior, comb1_out)"),
        "thin-film arguments missing from the leaf call:\n{pixel}"
    );
}

#[test]
fn add_sums_responses() {
    let doc = surface_doc(
        r#"{
            "name": "comb1",
            "category": "add",
            "type": "BSDF",
            "inputs": [
                {"name": "in1", "node": "spec1"},
                {"name": "in2", "node": "diff1"}
            ]
        }"#,
    );
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);
    assert!(
        pixel.contains("comb1_out.response = spec1_out.response + diff1_out.response"),
        "add formula missing:\n{pixel}"
    );
}

#[test]
fn emission_uses_the_edf_tree() {
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "glow1",
                    "category": "uniform_edf",
                    "type": "EDF",
                    "inputs": [{"name": "color", "value": "1.0, 0.9, 0.8"}]
                },
                {
                    "name": "surf1",
                    "category": "surface",
                    "type": "surfaceshader",
                    "inputs": [{"name": "edf", "node": "glow1"}]
                }
            ],
            "outputs": [{"name": "out1", "type": "surfaceshader", "node": "surf1"}]
        }"#,
    )
    .unwrap();
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);
    assert!(pixel.contains("mx_uniform_edf(N, L,"), "edf call missing:\n{pixel}");
    assert!(pixel.contains("+= glow1_out"), "emission accumulation missing:\n{pixel}");
}

#[test]
fn transparency_pass_only_with_the_option() {
    let combiner = r#"{
        "name": "comb1",
        "category": "mix",
        "type": "BSDF",
        "inputs": [
            {"name": "fg", "node": "spec1"},
            {"name": "bg", "node": "diff1"},
            {"name": "mix", "value": "0.5"}
        ]
    }"#;

    let opaque = generate_shader(
        &surface_doc(combiner),
        "out1",
        "glsl",
        GenOptions::default(),
    )
    .unwrap();
    let pixel = opaque.source_code(PIXEL_STAGE);
    assert!(!pixel.contains("Calculate the BSDF transmission"), "{pixel}");
    assert!(!pixel.contains("outAlpha"), "{pixel}");

    let transparent = generate_shader(
        &surface_doc(combiner),
        "out1",
        "glsl",
        GenOptions {
            hw_transparency: true,
            ..GenOptions::default()
        },
    )
    .unwrap();
    let pixel = transparent.source_code(PIXEL_STAGE);
    assert!(
        pixel.contains("Calculate the BSDF transmission"),
        "transmission pass missing:\n{pixel}"
    );
    assert!(pixel.contains("outAlpha"), "alpha output missing:\n{pixel}");
}

#[test]
fn generation_can_start_from_a_material_node() {
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "diff1",
                    "category": "oren_nayar_diffuse_bsdf",
                    "type": "BSDF"
                },
                {
                    "name": "surf1",
                    "category": "surface",
                    "type": "surfaceshader",
                    "inputs": [{"name": "bsdf", "node": "diff1"}]
                },
                {
                    "name": "mat1",
                    "category": "surfacematerial",
                    "type": "material",
                    "inputs": [{"name": "surfaceshader", "node": "surf1"}]
                }
            ]
        }"#,
    )
    .unwrap();
    let shader = generate_shader(&doc, "mat1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);
    assert!(
        pixel.contains("surfaceshader mat1_out = surf1_out;"),
        "material forward missing:\n{pixel}"
    );
    assert!(pixel.contains("(mat1_out.color, 1.0)"), "{pixel}");
}

#[test]
fn geometric_inputs_route_through_the_vertex_stage() {
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "n1",
                    "category": "normal",
                    "type": "vector3"
                },
                {
                    "name": "diff1",
                    "category": "oren_nayar_diffuse_bsdf",
                    "type": "BSDF",
                    "inputs": [{"name": "normal", "node": "n1"}]
                },
                {
                    "name": "surf1",
                    "category": "surface",
                    "type": "surfaceshader",
                    "inputs": [{"name": "bsdf", "node": "diff1"}]
                }
            ],
            "outputs": [{"name": "out1", "type": "surfaceshader", "node": "surf1"}]
        }"#,
    )
    .unwrap();
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let vertex = shader.source_code(shadegen::shader::VERTEX_STAGE);
    let pixel = shader.source_code(PIXEL_STAGE);

    assert!(vertex.contains("in vec3 i_normal;"), "{vertex}");
    assert!(vertex.contains("out VertexData"), "{vertex}");
    assert!(
        vertex.contains("vd.normalWorld = normalize((u_worldInverseTransposeMatrix"),
        "{vertex}"
    );
    assert!(pixel.contains("in VertexData"), "{pixel}");
    assert!(
        pixel.contains("vec3 n1_out = normalize(vd.normalWorld);"),
        "{pixel}"
    );
}

#[test]
fn osl_surface_composes_closures_natively() {
    let doc = surface_doc(
        r#"{
            "name": "comb1",
            "category": "mix",
            "type": "BSDF",
            "inputs": [
                {"name": "fg", "node": "spec1"},
                {"name": "bg", "node": "diff1"},
                {"name": "mix", "value": "0.5"}
            ]
        }"#,
    );
    let shader = generate_shader(&doc, "out1", "osl", GenOptions::default()).unwrap();
    let src = shader.source_code(PIXEL_STAGE);
    assert!(src.contains("shader out1"), "missing shader entry:\n{src}");
    assert!(src.contains("closure color"), "missing closure declarations:\n{src}");
    assert!(src.contains("mx_oren_nayar_diffuse_bsdf"), "missing bsdf call:\n{src}");
}
