//! GLSL validation tests — parse generated shaders through naga to catch
//! codegen bugs that string-matching tests miss.

use shadegen::shader::{PIXEL_STAGE, VERTEX_STAGE};
use shadegen::{generate_shader, Document, GenOptions};

/// Parse a GLSL stage through naga and panic with the numbered source on
/// failure.
fn validate_glsl(source: &str, stage: naga::ShaderStage, name: &str) {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(stage);
    if let Err(e) = frontend.parse(&options, source) {
        eprintln!("\n--- Generated GLSL for {name} ---");
        for (i, line) in source.lines().enumerate() {
            eprintln!("{:4} | {}", i + 1, line);
        }
        eprintln!("--- End GLSL ---\n");
        panic!("{name}: naga GLSL parse error:\n{e:?}");
    }
}

fn compile_and_validate(doc: &Document, name: &str) {
    let shader = generate_shader(doc, "out1", "glsl", GenOptions::default())
        .unwrap_or_else(|e| panic!("{name}: generation failed: {e}"));
    validate_glsl(
        shader.source_code(VERTEX_STAGE),
        naga::ShaderStage::Vertex,
        &format!("{name}.vertex"),
    );
    validate_glsl(
        shader.source_code(PIXEL_STAGE),
        naga::ShaderStage::Fragment,
        &format!("{name}.pixel"),
    );
}

#[test]
fn validate_constant_graph() {
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "c1",
                    "category": "constant",
                    "type": "float",
                    "inputs": [{"name": "value", "value": "0.5"}]
                }
            ],
            "outputs": [{"name": "out1", "type": "float", "node": "c1"}]
        }"#,
    )
    .unwrap();
    compile_and_validate(&doc, "constant_graph");
}

#[test]
fn validate_mix_graph() {
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
                }
            ],
            "outputs": [{"name": "out1", "type": "color3", "node": "m1"}]
        }"#,
    )
    .unwrap();
    compile_and_validate(&doc, "mix_graph");
}

#[test]
fn validate_conditional_graph() {
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "sel1",
                    "category": "add",
                    "type": "float",
                    "inputs": [{"name": "in1", "value": "0.5"}]
                },
                {
                    "name": "a1",
                    "category": "add",
                    "type": "float",
                    "inputs": [{"name": "in1", "value": "1.0"}]
                },
                {
                    "name": "b1",
                    "category": "multiply",
                    "type": "float",
                    "inputs": [{"name": "in1", "value": "2.0"}]
                },
                {
                    "name": "cmp1",
                    "category": "compare",
                    "type": "float",
                    "inputs": [
                        {"name": "intest", "node": "sel1"},
                        {"name": "cutoff", "value": "1.0"},
                        {"name": "in1", "node": "a1"},
                        {"name": "in2", "node": "b1"}
                    ]
                }
            ],
            "outputs": [{"name": "out1", "type": "float", "node": "cmp1"}]
        }"#,
    )
    .unwrap();
    compile_and_validate(&doc, "conditional_graph");
}

#[test]
fn validate_compound_graph() {
    let doc = Document::from_json(
        r#"{
            "nodedefs": [
                {
                    "name": "ND_scaled",
                    "node": "scaled",
                    "inputs": [{"name": "amount", "type": "float", "value": "0.5"}],
                    "outputs": [{"name": "out", "type": "float"}]
                }
            ],
            "nodegraphs": [
                {
                    "name": "NG_scaled",
                    "nodedef": "ND_scaled",
                    "nodes": [
                        {
                            "name": "double1",
                            "category": "multiply",
                            "type": "float",
                            "inputs": [
                                {"name": "in1", "interface": "amount"},
                                {"name": "in2", "value": "2.0"}
                            ]
                        }
                    ],
                    "outputs": [{"name": "result", "type": "float", "node": "double1"}]
                }
            ],
            "nodes": [
                {
                    "name": "s1",
                    "category": "scaled",
                    "type": "float",
                    "inputs": [{"name": "amount", "value": "0.25"}]
                }
            ],
            "outputs": [{"name": "out1", "type": "float", "node": "s1"}]
        }"#,
    )
    .unwrap();
    compile_and_validate(&doc, "compound_graph");
}
