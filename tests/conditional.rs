//! Conditional emission: branch-scoped nodes land inside their branch
//! blocks, and only there.

use shadegen::shader::PIXEL_STAGE;
use shadegen::{generate_shader, Document, GenOptions};

/// `a1` is reachable only through the compare's first branch, `b1` only
/// through the second.
fn compare_doc(intest: &str, cutoff: &str) -> Document {
    Document::from_json(&format!(
        r#"{{
            "nodes": [
                {{
                    "name": "a1",
                    "category": "add",
                    "type": "float",
                    "inputs": [
                        {{"name": "in1", "value": "1.0"}},
                        {{"name": "in2", "value": "2.0"}}
                    ]
                }},
                {{
                    "name": "b1",
                    "category": "multiply",
                    "type": "float",
                    "inputs": [
                        {{"name": "in1", "value": "3.0"}},
                        {{"name": "in2", "value": "4.0"}}
                    ]
                }},
                {{
                    "name": "sel1",
                    "category": "add",
                    "type": "float",
                    "inputs": [
                        {{"name": "in1", "value": "{intest}"}},
                        {{"name": "in2", "value": "0.0"}}
                    ]
                }},
                {{
                    "name": "cmp1",
                    "category": "compare",
                    "type": "float",
                    "inputs": [
                        {{"name": "intest", "node": "sel1"}},
                        {{"name": "cutoff", "value": "{cutoff}"}},
                        {{"name": "in1", "node": "a1"}},
                        {{"name": "in2", "node": "b1"}}
                    ]
                }}
            ],
            "outputs": [{{"name": "out1", "type": "float", "node": "cmp1"}}]
        }}"#
    ))
    .unwrap()
}

#[test]
fn branch_scoped_nodes_emit_inside_their_branch_only() {
    let doc = compare_doc("0.5", "1.0");
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);

    let if_pos = pixel.find("if (").expect("missing if");
    let else_pos = pixel.find("else").expect("missing else");
    let a_pos = pixel.find("a1_out = ").expect("missing a1 emission");
    let b_pos = pixel.find("b1_out = ").expect("missing b1 emission");

    assert!(if_pos < a_pos && a_pos < else_pos, "a1 must sit in the then-branch:\n{pixel}");
    assert!(else_pos < b_pos, "b1 must sit in the else-branch:\n{pixel}");

    // Exactly one assignment each.
    assert_eq!(pixel.matches("a1_out = ").count(), 1, "{pixel}");
    assert_eq!(pixel.matches("b1_out = ").count(), 1, "{pixel}");
}

#[test]
fn node_shared_by_both_branches_is_emitted_once_globally() {
    // `shared1` feeds both branch inputs, so it must be hoisted out of
    // the conditional and emitted exactly once.
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "shared1",
                    "category": "add",
                    "type": "float",
                    "inputs": [
                        {"name": "in1", "value": "1.0"},
                        {"name": "in2", "value": "2.0"}
                    ]
                },
                {
                    "name": "sel1",
                    "category": "add",
                    "type": "float",
                    "inputs": [{"name": "in1", "value": "0.5"}]
                },
                {
                    "name": "b1",
                    "category": "multiply",
                    "type": "float",
                    "inputs": [
                        {"name": "in1", "node": "shared1"},
                        {"name": "in2", "value": "4.0"}
                    ]
                },
                {
                    "name": "cmp1",
                    "category": "compare",
                    "type": "float",
                    "inputs": [
                        {"name": "intest", "node": "sel1"},
                        {"name": "cutoff", "value": "1.0"},
                        {"name": "in1", "node": "shared1"},
                        {"name": "in2", "node": "b1"}
                    ]
                }
            ],
            "outputs": [{"name": "out1", "type": "float", "node": "cmp1"}]
        }"#,
    )
    .unwrap();
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);

    let if_pos = pixel.find("if (").expect("missing if");
    let shared_pos = pixel.find("shared1_out = ").expect("missing shared1 emission");
    assert!(
        shared_pos < if_pos,
        "shared node must be emitted before the conditional:\n{pixel}"
    );
    assert_eq!(pixel.matches("shared1_out = ").count(), 1, "{pixel}");
}

#[test]
fn statically_decided_compare_is_folded() {
    // The selector is a plain value, so the build elides the branch.
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "a1",
                    "category": "add",
                    "type": "float",
                    "inputs": [
                        {"name": "in1", "value": "1.0"},
                        {"name": "in2", "value": "2.0"}
                    ]
                },
                {
                    "name": "b1",
                    "category": "multiply",
                    "type": "float",
                    "inputs": [
                        {"name": "in1", "value": "3.0"},
                        {"name": "in2", "value": "4.0"}
                    ]
                },
                {
                    "name": "cmp1",
                    "category": "compare",
                    "type": "float",
                    "inputs": [
                        {"name": "intest", "value": "0.5"},
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
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);

    // intest (0.5) <= cutoff (1.0): branch one taken, branch two pruned.
    assert!(!pixel.contains("if ("), "folded compare should emit no branch:\n{pixel}");
    assert!(pixel.contains("a1_out"), "taken branch missing:\n{pixel}");
    assert!(!pixel.contains("b1_out"), "pruned branch still present:\n{pixel}");
}

#[test]
fn switch_with_computed_selector_emits_branch_chain() {
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "sel1",
                    "category": "add",
                    "type": "float",
                    "inputs": [{"name": "in1", "value": "1.0"}]
                },
                {
                    "name": "sw1",
                    "category": "switch",
                    "type": "float",
                    "inputs": [
                        {"name": "in1", "value": "0.1"},
                        {"name": "in2", "value": "0.2"},
                        {"name": "in3", "value": "0.3"},
                        {"name": "which", "node": "sel1"}
                    ]
                }
            ],
            "outputs": [{"name": "out1", "type": "float", "node": "sw1"}]
        }"#,
    )
    .unwrap();
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);
    assert!(
        pixel.contains("if (float(sel1_out) < 1.0)"),
        "first branch test missing:\n{pixel}"
    );
    assert!(
        pixel.contains("else if (float(sel1_out) < 2.0)"),
        "chained branch test missing:\n{pixel}"
    );
    assert!(pixel.contains("else"), "final branch missing:\n{pixel}");
}

#[test]
fn switch_with_value_selector_folds_to_the_selected_branch() {
    let doc = Document::from_json(
        r#"{
            "nodes": [
                {
                    "name": "sw1",
                    "category": "switch",
                    "type": "float",
                    "inputs": [
                        {"name": "in1", "value": "0.1"},
                        {"name": "in2", "value": "0.2"},
                        {"name": "in3", "value": "0.3"},
                        {"name": "which", "value": "2"}
                    ]
                }
            ],
            "outputs": [{"name": "out1", "type": "float", "node": "sw1"}]
        }"#,
    )
    .unwrap();
    let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
    let pixel = shader.source_code(PIXEL_STAGE);
    assert!(pixel.contains("0.3"), "selected branch value missing:\n{pixel}");
    assert!(!pixel.contains("if ("), "folded switch should emit no branch:\n{pixel}");
}
