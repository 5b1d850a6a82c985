//! shadegen — compiles material shading networks to shader source.
//!
//! A document describes nodes, node graphs and node definitions; a
//! generator lowers a chosen root element into per-stage source text for
//! one target dialect (GLSL, ESSL, MSL, OSL, MDL). The pipeline: build a
//! shader graph from the document, resolve per-node implementations,
//! then emit declarations, function definitions and calls in dependency
//! order, with closure trees re-evaluated per physical quantity.

pub mod closure;
pub mod colorspace;
pub mod context;
pub mod document;
pub mod error;
pub mod generator;
pub mod graph;
pub mod library;
pub mod nodes;
pub mod options;
pub mod registry;
pub mod shader;
pub mod syntax;
pub mod types;
pub mod value;

use std::sync::Arc;

use colorspace::DefaultColorSystem;
use generator::{
    EsslGenerator, GeneratorSetup, GlslGenerator, MdlGenerator, MslGenerator, OslGenerator,
    ShaderGenerator,
};
use graph::GenElement;
use registry::ImplRegistry;
use types::TypeRegistry;

pub use context::GenContext;
pub use document::Document;
pub use error::{GenError, Result};
pub use options::{GenOptions, ShaderInterface, SpecularEnv};
pub use shader::Shader;

/// All supported target identifiers.
pub const TARGETS: [&str; 5] = ["glsl", "essl", "msl", "osl", "mdl"];

/// A setup with the standard types, the built-in library registrations
/// and the default color system.
pub fn standard_setup() -> GeneratorSetup {
    let mut impls = ImplRegistry::new();
    library::register_impls(&mut impls);
    GeneratorSetup {
        types: Arc::new(TypeRegistry::with_standard_types()),
        impls: Arc::new(impls),
        colors: Arc::new(DefaultColorSystem::new()),
    }
}

/// Construct the generator for a target identifier.
pub fn generator_for(target: &str) -> Result<Box<dyn ShaderGenerator>> {
    let setup = standard_setup();
    match target {
        "glsl" => Ok(Box::new(GlslGenerator::new(setup))),
        "essl" => Ok(Box::new(EsslGenerator::new(setup))),
        "msl" => Ok(Box::new(MslGenerator::new(setup))),
        "osl" => Ok(Box::new(OslGenerator::new(setup))),
        "mdl" => Ok(Box::new(MdlGenerator::new(setup))),
        other => Err(GenError::document(&format!("unknown target '{other}'"))),
    }
}

/// Generate a shader for a named element of a document.
///
/// The element may be an output, a node (a material or shader node), or
/// a node graph. The document is laid over the built-in node library.
pub fn generate_shader(
    doc: &Document,
    element: &str,
    target: &str,
    options: GenOptions,
) -> Result<Shader> {
    let mut full = library::document();
    full.import(doc.clone());

    let gen = generator_for(target)?;
    let mut ctx = GenContext::new(options);

    if let Some(out) = full.output(element) {
        return gen.generate(element, GenElement::Output(out), &full, &mut ctx);
    }
    if let Some(node) = full.node(element) {
        return gen.generate(element, GenElement::Node(node), &full, &mut ctx);
    }
    if let Some(ng) = full.nodegraph(element) {
        return gen.generate(element, GenElement::Graph(ng), &full, &mut ctx);
    }
    Err(GenError::document(&format!(
        "no element named '{element}' in document"
    )))
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::shader::PIXEL_STAGE;

    fn constant_doc(value: &str) -> Document {
        Document::from_json(&format!(
            r#"{{
                "nodes": [
                    {{
                        "name": "c1",
                        "category": "constant",
                        "type": "float",
                        "inputs": [{{"name": "value", "value": "{value}"}}]
                    }}
                ],
                "outputs": [{{"name": "out1", "type": "float", "node": "c1"}}]
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn end_to_end_constant_float() {
        let doc = constant_doc("0.5");
        let shader = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
        let pixel = shader.source_code(PIXEL_STAGE);
        assert!(pixel.contains("#version 400"), "missing preamble:\n{pixel}");
        assert!(pixel.contains("void main()"));
        assert!(pixel.contains("0.5"), "literal missing:\n{pixel}");
        assert!(pixel.contains("out1"), "output variable missing:\n{pixel}");
    }

    #[test]
    fn end_to_end_constant_osl() {
        let doc = constant_doc("0.25");
        let shader = generate_shader(&doc, "out1", "osl", GenOptions::default()).unwrap();
        let src = shader.source_code(PIXEL_STAGE);
        assert!(src.contains("shader out1"), "missing shader entry:\n{src}");
        assert!(src.contains("0.25"), "literal missing:\n{src}");
    }

    #[test]
    fn end_to_end_mdl_module() {
        let doc = constant_doc("0.75");
        let shader = generate_shader(&doc, "out1", "mdl", GenOptions::default()).unwrap();
        let src = shader.source_code(PIXEL_STAGE);
        assert!(src.contains("mdl 1.7;"));
        assert!(src.contains("export material out1"));
        assert!(src.contains("0.75"));
    }

    #[test]
    fn unknown_element_is_an_error() {
        let doc = constant_doc("0.5");
        assert!(generate_shader(&doc, "nope", "glsl", GenOptions::default()).is_err());
    }

    #[test]
    fn unknown_target_is_an_error() {
        let doc = constant_doc("0.5");
        assert!(generate_shader(&doc, "out1", "wgsl", GenOptions::default()).is_err());
    }

    #[test]
    fn unresolved_nodedef_names_the_node() {
        let doc = Document::from_json(
            r#"{
                "nodes": [{"name": "warp1", "category": "warp", "type": "float"}],
                "outputs": [{"name": "out1", "type": "float", "node": "warp1"}]
            }"#,
        )
        .unwrap();
        let err = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("warp1") && msg.contains("warp"), "got: {msg}");
    }

    #[test]
    fn cyclic_graph_is_an_error() {
        let doc = Document::from_json(
            r#"{
                "nodes": [
                    {
                        "name": "a1",
                        "category": "add",
                        "type": "float",
                        "inputs": [{"name": "in1", "node": "b1"}]
                    },
                    {
                        "name": "b1",
                        "category": "add",
                        "type": "float",
                        "inputs": [{"name": "in1", "node": "a1"}]
                    }
                ],
                "outputs": [{"name": "out1", "type": "float", "node": "a1"}]
            }"#,
        )
        .unwrap();
        let err = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap_err();
        assert!(matches!(err, GenError::Cycle { .. }), "got: {err}");
    }

    #[test]
    fn type_mismatch_on_connection_is_an_error() {
        // A float node wired into a vector2 input.
        let doc = Document::from_json(
            r#"{
                "nodes": [
                    {
                        "name": "c1",
                        "category": "constant",
                        "type": "float",
                        "inputs": [{"name": "value", "value": "1.0"}]
                    },
                    {
                        "name": "img1",
                        "category": "image",
                        "type": "color3",
                        "inputs": [{"name": "texcoord", "node": "c1"}]
                    }
                ],
                "outputs": [{"name": "out1", "type": "color3", "node": "img1"}]
            }"#,
        )
        .unwrap();
        let err = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap_err();
        assert!(matches!(err, GenError::TypeMismatch { .. }), "got: {err}");
    }

    #[test]
    fn determinism_byte_identical_output() {
        let doc = Document::from_json(
            r#"{
                "nodes": [
                    {
                        "name": "base1",
                        "category": "constant",
                        "type": "color3",
                        "inputs": [{"name": "value", "value": "0.1, 0.2, 0.3"}]
                    },
                    {
                        "name": "m1",
                        "category": "mix",
                        "type": "color3",
                        "inputs": [
                            {"name": "fg", "node": "base1"},
                            {"name": "bg", "value": "0.5, 0.5, 0.5"},
                            {"name": "mix", "value": "0.25"}
                        ]
                    }
                ],
                "outputs": [{"name": "out1", "type": "color3", "node": "m1"}]
            }"#,
        )
        .unwrap();
        let a = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
        let b = generate_shader(&doc, "out1", "glsl", GenOptions::default()).unwrap();
        for stage in a.stage_names() {
            assert_eq!(
                a.source_code(stage),
                b.source_code(stage),
                "stage '{stage}' differs between runs"
            );
        }
    }
}
