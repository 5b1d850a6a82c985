//! The mutable output accumulator: a shader with one or more stages.
//!
//! Each stage owns ordered variable blocks (inputs, outputs, uniforms
//! grouped by block name) and an append-only source buffer with scope and
//! indentation tracking. Text is only ever appended; a stage whose scopes
//! do not balance by the end of generation is malformed.

use std::collections::{HashMap, HashSet};

use crate::error::{GenError, Result};
use crate::types::TypeRef;
use crate::value::Value;

/// Stage names used by the built-in generators.
pub const VERTEX_STAGE: &str = "vertex";
pub const PIXEL_STAGE: &str = "pixel";

/// Variable block names shared by the hardware generators.
pub mod blocks {
    pub const VERTEX_INPUTS: &str = "VertexInputs";
    /// Vertex-to-pixel connector block.
    pub const VERTEX_DATA: &str = "VertexData";
    pub const PIXEL_OUTPUTS: &str = "PixelOutputs";
    pub const PRIVATE_UNIFORMS: &str = "PrivateUniforms";
    pub const PUBLIC_UNIFORMS: &str = "PublicUniforms";
    pub const LIGHT_DATA: &str = "LightData";
}

/// One declared variable in a block.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub ty: TypeRef,
    pub value: Option<Value>,
}

/// A named, ordered group of unique-named variables.
///
/// Insertion order is declaration order in the emitted text, and for
/// structured blocks the memory layout downstream consumers expect.
#[derive(Debug, Clone)]
pub struct VariableBlock {
    name: String,
    instance: String,
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
}

impl VariableBlock {
    pub fn new(name: &str, instance: &str) -> Self {
        Self {
            name: name.to_string(),
            instance: instance.to_string(),
            variables: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Struct-instance name used when the block is emitted as a struct.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn find(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|i| &self.variables[*i])
    }

    /// Add a variable. Re-adding an existing name is a no-op returning the
    /// original slot, so independent nodes can request shared data.
    pub fn add(&mut self, ty: TypeRef, name: &str, value: Option<Value>) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        self.variables.push(Variable {
            name: name.to_string(),
            ty,
            value,
        });
        self.index.insert(name.to_string(), self.variables.len() - 1);
        self.variables.len() - 1
    }
}

/// Bracket styles for emitted scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brackets {
    Braces,
    Parentheses,
    Squares,
}

impl Brackets {
    fn open(self) -> char {
        match self {
            Brackets::Braces => '{',
            Brackets::Parentheses => '(',
            Brackets::Squares => '[',
        }
    }

    fn close(self) -> char {
        match self {
            Brackets::Braces => '}',
            Brackets::Parentheses => ')',
            Brackets::Squares => ']',
        }
    }
}

/// One physical shader unit: declarations plus a forward-only code buffer.
#[derive(Debug)]
pub struct ShaderStage {
    name: String,
    code: String,
    indentation: usize,
    scopes: Vec<Brackets>,
    defined_functions: HashSet<String>,
    constants: VariableBlock,
    uniform_order: Vec<String>,
    uniforms: HashMap<String, VariableBlock>,
    input_order: Vec<String>,
    inputs: HashMap<String, VariableBlock>,
    output_order: Vec<String>,
    outputs: HashMap<String, VariableBlock>,
}

const INDENT: &str = "    ";

impl ShaderStage {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            code: String::new(),
            indentation: 0,
            scopes: Vec::new(),
            defined_functions: HashSet::new(),
            constants: VariableBlock::new("Constants", ""),
            uniform_order: Vec::new(),
            uniforms: HashMap::new(),
            input_order: Vec::new(),
            inputs: HashMap::new(),
            output_order: Vec::new(),
            outputs: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_code(&self) -> &str {
        &self.code
    }

    // ── Variable blocks ────────────────────────────────────────────────

    pub fn create_uniform_block(&mut self, name: &str, instance: &str) {
        if !self.uniforms.contains_key(name) {
            self.uniform_order.push(name.to_string());
            self.uniforms
                .insert(name.to_string(), VariableBlock::new(name, instance));
        }
    }

    pub fn create_input_block(&mut self, name: &str, instance: &str) {
        if !self.inputs.contains_key(name) {
            self.input_order.push(name.to_string());
            self.inputs
                .insert(name.to_string(), VariableBlock::new(name, instance));
        }
    }

    pub fn create_output_block(&mut self, name: &str, instance: &str) {
        if !self.outputs.contains_key(name) {
            self.output_order.push(name.to_string());
            self.outputs
                .insert(name.to_string(), VariableBlock::new(name, instance));
        }
    }

    pub fn uniform_block(&mut self, name: &str) -> Result<&mut VariableBlock> {
        self.uniforms
            .get_mut(name)
            .ok_or_else(|| GenError::internal(&format!("no uniform block '{name}'")))
    }

    pub fn input_block(&mut self, name: &str) -> Result<&mut VariableBlock> {
        self.inputs
            .get_mut(name)
            .ok_or_else(|| GenError::internal(&format!("no input block '{name}'")))
    }

    pub fn output_block(&mut self, name: &str) -> Result<&mut VariableBlock> {
        self.outputs
            .get_mut(name)
            .ok_or_else(|| GenError::internal(&format!("no output block '{name}'")))
    }

    pub fn constant_block(&mut self) -> &mut VariableBlock {
        &mut self.constants
    }

    /// Uniform blocks in registration order.
    pub fn uniform_blocks(&self) -> impl Iterator<Item = &VariableBlock> {
        self.uniform_order.iter().map(|n| &self.uniforms[n])
    }

    pub fn input_blocks(&self) -> impl Iterator<Item = &VariableBlock> {
        self.input_order.iter().map(|n| &self.inputs[n])
    }

    pub fn output_blocks(&self) -> impl Iterator<Item = &VariableBlock> {
        self.output_order.iter().map(|n| &self.outputs[n])
    }

    // ── Code buffer ────────────────────────────────────────────────────

    /// Append one indented line verbatim.
    pub fn line(&mut self, s: &str) {
        for _ in 0..self.indentation {
            self.code.push_str(INDENT);
        }
        self.code.push_str(s);
        self.code.push('\n');
    }

    /// Append one indented line with a trailing semicolon.
    pub fn statement(&mut self, s: &str) {
        for _ in 0..self.indentation {
            self.code.push_str(INDENT);
        }
        self.code.push_str(s);
        self.code.push_str(";\n");
    }

    pub fn comment(&mut self, s: &str) {
        self.line(&format!("// {s}"));
    }

    pub fn blank(&mut self) {
        self.code.push('\n');
    }

    /// Append a pre-formatted multi-line block at current indentation.
    pub fn block(&mut self, text: &str) {
        for raw in text.lines() {
            if raw.is_empty() {
                self.blank();
            } else {
                self.line(raw);
            }
        }
    }

    pub fn begin_scope(&mut self, brackets: Brackets) {
        self.line(&brackets.open().to_string());
        self.scopes.push(brackets);
        self.indentation += 1;
    }

    pub fn end_scope(&mut self) {
        self.end_scope_with(false)
    }

    pub fn end_scope_semicolon(&mut self) {
        self.end_scope_with(true)
    }

    fn end_scope_with(&mut self, semicolon: bool) {
        let brackets = self.scopes.pop().expect("unbalanced scope end");
        self.indentation = self.indentation.saturating_sub(1);
        let mut s = brackets.close().to_string();
        if semicolon {
            s.push(';');
        }
        self.line(&s);
    }

    /// True after generation only if every opened scope was closed.
    pub fn scopes_balanced(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Claim a function name for definition. Returns false if that name
    /// was already defined in this stage.
    pub fn claim_function(&mut self, name: &str) -> bool {
        self.defined_functions.insert(name.to_string())
    }
}

/// The finished artifact: per-stage source text plus enumerable variable
/// blocks, so backends can discover uniform names and order without
/// re-parsing the generated text.
#[derive(Debug)]
pub struct Shader {
    name: String,
    stage_order: Vec<String>,
    stages: HashMap<String, ShaderStage>,
    warnings: Vec<String>,
}

impl Shader {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stage_order: Vec::new(),
            stages: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create_stage(&mut self, name: &str) -> &mut ShaderStage {
        if !self.stages.contains_key(name) {
            self.stage_order.push(name.to_string());
            self.stages.insert(name.to_string(), ShaderStage::new(name));
        }
        self.stages.get_mut(name).unwrap()
    }

    pub fn stage(&self, name: &str) -> Option<&ShaderStage> {
        self.stages.get(name)
    }

    pub fn stage_mut(&mut self, name: &str) -> Option<&mut ShaderStage> {
        self.stages.get_mut(name)
    }

    /// Take a stage out for emission, to be returned with `put_stage`.
    /// Keeps borrows of the shader and the stage independent while node
    /// implementations write into the stage.
    pub fn take_stage(&mut self, name: &str) -> Result<ShaderStage> {
        self.stages
            .remove(name)
            .ok_or_else(|| GenError::internal(&format!("no stage '{name}'")))
    }

    pub fn put_stage(&mut self, stage: ShaderStage) {
        self.stages.insert(stage.name().to_string(), stage);
    }

    /// Stage names in creation order.
    pub fn stage_names(&self) -> &[String] {
        &self.stage_order
    }

    /// Source text for a stage, empty if the stage does not exist.
    pub fn source_code(&self, stage: &str) -> &str {
        self.stages.get(stage).map(|s| s.source_code()).unwrap_or("")
    }

    pub fn add_warning(&mut self, w: String) {
        self.warnings.push(w);
    }

    pub fn set_warnings(&mut self, w: Vec<String>) {
        self.warnings = w;
    }

    /// Non-fatal issues encountered during generation.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    #[test]
    fn buffer_indents_and_balances_scopes() {
        let mut stage = ShaderStage::new(PIXEL_STAGE);
        stage.line("void main()");
        stage.begin_scope(Brackets::Braces);
        stage.statement("float a = 1.0");
        stage.begin_scope(Brackets::Braces);
        stage.statement("a += 2.0");
        stage.end_scope();
        stage.end_scope();
        assert!(stage.scopes_balanced());
        let code = stage.source_code();
        assert!(code.contains("    float a = 1.0;\n"));
        assert!(code.contains("        a += 2.0;\n"));
    }

    #[test]
    fn variable_blocks_preserve_insertion_order_and_dedupe() {
        let types = TypeRegistry::with_standard_types();
        let f = types.get("float").unwrap();
        let v3 = types.get("vector3").unwrap();

        let mut block = VariableBlock::new(blocks::PRIVATE_UNIFORMS, "u_prv");
        block.add(v3.clone(), "u_viewPosition", None);
        block.add(f.clone(), "u_time", None);
        block.add(v3, "u_viewPosition", None);
        let names: Vec<_> = block.variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["u_viewPosition", "u_time"]);
    }

    #[test]
    fn uniform_blocks_enumerate_in_registration_order() {
        let mut stage = ShaderStage::new(PIXEL_STAGE);
        stage.create_uniform_block(blocks::PRIVATE_UNIFORMS, "u_prv");
        stage.create_uniform_block(blocks::PUBLIC_UNIFORMS, "u_pub");
        stage.create_uniform_block(blocks::LIGHT_DATA, "u_lightData");
        let order: Vec<_> = stage.uniform_blocks().map(|b| b.name().to_string()).collect();
        assert_eq!(
            order,
            vec![blocks::PRIVATE_UNIFORMS, blocks::PUBLIC_UNIFORMS, blocks::LIGHT_DATA]
        );
    }

    #[test]
    fn function_names_are_claimed_once() {
        let mut stage = ShaderStage::new(PIXEL_STAGE);
        assert!(stage.claim_function("mx_mix_bsdf"));
        assert!(!stage.claim_function("mx_mix_bsdf"));
    }
}
