//! Shader interface modes, color management, bindings and compounds.

use shadegen::shader::{blocks, PIXEL_STAGE};
use shadegen::{generate_shader, Document, GenError, GenOptions, ShaderInterface};

fn mix_doc(colorspace: Option<&str>) -> Document {
    let cs = match colorspace {
        Some(cs) => format!(r#", "colorspace": "{cs}""#),
        None => String::new(),
    };
    Document::from_json(&format!(
        r#"{{
            "colorspace": "lin_rec709",
            "nodes": [
                {{
                    "name": "m1",
                    "category": "mix",
                    "type": "color3",
                    "inputs": [
                        {{"name": "fg", "value": "0.9, 0.8, 0.7"}},
                        {{"name": "bg", "value": "0.1, 0.2, 0.3"{cs}}},
                        {{"name": "mix", "value": "0.25"}}
                    ]
                }}
            ],
            "outputs": [{{"name": "out1", "type": "color3", "node": "m1"}}]
        }}"#
    ))
    .unwrap()
}

#[test]
fn complete_interface_publishes_editable_inputs_as_uniforms() {
    let shader = generate_shader(&mix_doc(None), "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);
    assert!(pixel.contains("uniform vec3 m1_fg;"), "{pixel}");
    assert!(pixel.contains("uniform vec3 m1_bg;"), "{pixel}");
    assert!(pixel.contains("uniform float m1_mix;"), "{pixel}");

    // The uniforms are enumerable on the shader object, in declaration
    // order, so backends need not parse the text.
    let stage = shader.stage(PIXEL_STAGE).unwrap();
    let publics: Vec<String> = stage
        .uniform_blocks()
        .find(|b| b.name() == blocks::PUBLIC_UNIFORMS)
        .unwrap()
        .variables()
        .iter()
        .map(|v| v.name.clone())
        .collect();
    assert_eq!(publics, vec!["m1_fg", "m1_bg", "m1_mix"]);
}

#[test]
fn reduced_interface_inlines_values_through_constants() {
    let options = GenOptions {
        shader_interface: ShaderInterface::Reduced,
        ..GenOptions::default()
    };
    let shader = generate_shader(&mix_doc(None), "out1", "glsl", options).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);
    assert!(!pixel.contains("uniform vec3 m1_fg;"), "{pixel}");
    assert!(pixel.contains("vec3(0.9, 0.8, 0.7)"), "value not inlined:\n{pixel}");
}

#[test]
fn supported_colorspace_inserts_a_transform_node() {
    let shader =
        generate_shader(&mix_doc(Some("srgb_texture")), "out1", "glsl", GenOptions::default())
            .unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);
    assert!(pixel.contains("m1_bg_cm_out"), "transform node missing:\n{pixel}");
    assert!(pixel.contains("pow("), "gamma transform missing:\n{pixel}");
    assert!(shader.warnings().is_empty());
}

#[test]
fn unsupported_colorspace_passes_through_with_a_warning() {
    let shader =
        generate_shader(&mix_doc(Some("aces2065")), "out1", "glsl", GenOptions::default())
            .unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);
    assert!(!pixel.contains("_cm_out"), "no transform should be inserted:\n{pixel}");
    assert!(
        shader.warnings().iter().any(|w| w.contains("aces2065")),
        "missing pass-through warning: {:?}",
        shader.warnings()
    );
}

#[test]
fn unsupported_colorspace_fails_in_strict_mode() {
    let options = GenOptions {
        strict_color_transforms: true,
        ..GenOptions::default()
    };
    let err = generate_shader(&mix_doc(Some("aces2065")), "out1", "glsl", options).unwrap_err();
    assert!(matches!(err, GenError::ColorSpace { .. }), "got: {err}");
}

#[test]
fn explicit_bindings_are_rejected_on_essl() {
    let options = GenOptions {
        hw_explicit_bindings: true,
        ..GenOptions::default()
    };
    let err = generate_shader(&mix_doc(None), "out1", "essl", options.clone()).unwrap_err();
    assert!(matches!(err, GenError::UnsupportedBinding { .. }), "got: {err}");

    // The same request is honored on desktop GLSL.
    let shader = generate_shader(&mix_doc(None), "out1", "glsl", options).unwrap();
    assert!(shader.source_code(PIXEL_STAGE).contains("layout (location = "));
}

#[test]
fn essl_emits_precision_directives() {
    let shader = generate_shader(&mix_doc(None), "out1", "essl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);
    assert!(pixel.starts_with("#version 300 es"), "{pixel}");
    assert!(pixel.contains("precision mediump float;"), "{pixel}");
}

#[test]
fn image_sampling_honors_the_vertical_flip_option() {
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "img1",
                    "category": "image",
                    "type": "color3",
                    "inputs": [{"name": "file", "value": "tex/wood.png"}]
                }
            ],
            "outputs": [{"name": "out1", "type": "color3", "node": "img1"}]
        }"#,
    )
    .unwrap();

    let plain = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = plain.source_code(PIXEL_STAGE);
    assert!(pixel.contains("uniform sampler2D img1_file;"), "{pixel}");
    assert!(pixel.contains("texture(img1_file,"), "{pixel}");
    assert!(!pixel.contains("1.0 - "), "{pixel}");

    let flipped = generate_shader(
        &doc,
        "out1",
        "glsl",
        GenOptions {
            file_texture_vertical_flip: true,
            ..GenOptions::default()
        },
    )
    .unwrap();
    let pixel = flipped.source_code(PIXEL_STAGE);
    assert!(pixel.contains("1.0 - img1_out_uv.y"), "{pixel}");
}

#[test]
fn swizzle_reads_named_channels() {
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "m1",
                    "category": "mix",
                    "type": "color3",
                    "inputs": [
                        {"name": "fg", "value": "0.9, 0.8, 0.7"},
                        {"name": "bg", "value": "0.1, 0.2, 0.3"},
                        {"name": "mix", "value": "0.25"}
                    ]
                },
                {
                    "name": "sw1",
                    "category": "swizzle",
                    "type": "float",
                    "inputs": [
                        {"name": "in", "node": "m1"},
                        {"name": "channels", "value": "g"}
                    ]
                }
            ],
            "outputs": [{"name": "out1", "type": "float", "node": "sw1"}]
        }"#,
    )
    .unwrap();
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);
    assert!(pixel.contains("float sw1_out = m1_out.g;"), "{pixel}");
}

#[test]
fn swizzle_rejects_channels_outside_the_source_type() {
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "sw1",
                    "category": "swizzle",
                    "type": "float",
                    "inputs": [
                        {"name": "in", "value": "0.1, 0.2, 0.3"},
                        {"name": "channels", "value": "w"}
                    ]
                }
            ],
            "outputs": [{"name": "out1", "type": "float", "node": "sw1"}]
        }"#,
    )
    .unwrap();
    assert!(generate_shader(&doc, "out1", "glsl", GenOptions::default()).is_err());
}

#[test]
fn compound_nodedef_emits_a_function_and_a_call() {
    let doc = Document::from_json(
        r#"{
            "nodedefs": [
                {
                    "name": "ND_warm_color",
                    "node": "warm_color",
                    "inputs": [{"name": "base", "type": "float", "value": "0.5"}],
                    "outputs": [{"name": "out", "type": "color3"}]
                }
            ],
            "nodegraphs": [
                {
                    "name": "NG_warm_color",
                    "nodedef": "ND_warm_color",
                    "nodes": [
                        {
                            "name": "tint1",
                            "category": "mix",
                            "type": "color3",
                            "inputs": [
                                {"name": "fg", "value": "1.0, 0.6, 0.2"},
                                {"name": "bg", "value": "0.0, 0.0, 0.0"},
                                {"name": "mix", "interface": "base"}
                            ]
                        }
                    ],
                    "outputs": [{"name": "result", "type": "color3", "node": "tint1"}]
                }
            ],
            "nodes": [
                {
                    "name": "warm1",
                    "category": "warm_color",
                    "type": "color3",
                    "inputs": [{"name": "base", "value": "0.75"}]
                }
            ],
            "outputs": [{"name": "out1", "type": "color3", "node": "warm1"}]
        }"#,
    )
    .unwrap();
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);

    assert!(pixel.contains("void NG_warm_color("), "function definition missing:\n{pixel}");
    assert!(pixel.contains("NG_warm_color(warm1_base, warm1_out)"), "call missing:\n{pixel}");
    // The compound body holds the inner mix.
    let def_pos = pixel.find("void NG_warm_color(").unwrap();
    let main_pos = pixel.find("void main()").unwrap();
    assert!(def_pos < main_pos, "definition must precede main:\n{pixel}");
}
