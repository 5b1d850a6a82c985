//! Source-code node implementations.
//!
//! The generic fallback for nodedefs carrying their own code: either an
//! inline expression template with `{{input}}` substitution points, or an
//! out-of-line function call with an optional function definition emitted
//! once per stage. Placeholders are validated against the nodedef's
//! declared inputs when the template is adopted, so unknown names never
//! reach the generated text.

use crate::context::GenContext;
use crate::document::{ImplElement, NodeDef};
use crate::error::{GenError, Result};
use crate::generator::{
    emit_output_declarations, input_expr, named_input_expr, output_var, CallStyle, ShaderGenerator,
};
use crate::graph::node::{Classification, InputRef, NodeId, OutputRef};
use crate::graph::ShaderGraph;
use crate::registry::NodeImpl;
use crate::shader::ShaderStage;

enum SourceKind {
    /// An expression template substituted into a single assignment.
    Inline {
        template: String,
        placeholders: Vec<String>,
    },
    /// A call to a named function, optionally defining it from source.
    Function {
        name: String,
        definition: Option<String>,
    },
}

pub struct SourceCodeImpl {
    kind: SourceKind,
}

impl SourceCodeImpl {
    /// Adopt the source carried by a nodedef's implementation element.
    pub fn from_element(nodedef: &NodeDef, elem: &ImplElement) -> Result<Self> {
        if let Some(function) = &elem.function {
            return Ok(Self {
                kind: SourceKind::Function {
                    name: function.clone(),
                    definition: elem.source.clone(),
                },
            });
        }
        if let Some(template) = &elem.source {
            let placeholders = extract_placeholders(template);
            for ph in &placeholders {
                if nodedef.input(ph).is_none() {
                    return Err(GenError::document(&format!(
                        "source template for '{}' references unknown placeholder '{{{{{ph}}}}}'",
                        nodedef.name
                    )));
                }
            }
            return Ok(Self {
                kind: SourceKind::Inline {
                    template: template.clone(),
                    placeholders,
                },
            });
        }
        Err(GenError::no_implementation(&nodedef.name, ""))
    }

    /// An inline template with a pre-validated placeholder set, for
    /// synthetic nodes (constants, color transforms).
    pub fn inline(template: &str, placeholders: Vec<String>) -> Self {
        Self {
            kind: SourceKind::Inline {
                template: template.to_string(),
                placeholders,
            },
        }
    }

    /// An out-of-line call to a function defined by the runtime library.
    pub fn function(name: &str, definition: Option<&str>) -> Self {
        Self {
            kind: SourceKind::Function {
                name: name.to_string(),
                definition: definition.map(|s| s.to_string()),
            },
        }
    }
}

fn extract_placeholders(template: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start + 2..].find("}}") else {
            break;
        };
        let name = &rest[start + 2..start + 2 + end];
        if !found.iter().any(|f| f == name) {
            found.push(name.to_string());
        }
        rest = &rest[start + 2 + end + 2..];
    }
    found
}

fn substitute(
    template: &str,
    mut resolve: impl FnMut(&str) -> Result<String>,
) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find("}}") else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        out.push_str(&resolve(&tail[..end])?);
        rest = &tail[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

impl NodeImpl for SourceCodeImpl {
    fn emit_function_definition(
        &self,
        _gen: &dyn ShaderGenerator,
        _graph: &ShaderGraph,
        _node: NodeId,
        _ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        if let SourceKind::Function {
            name,
            definition: Some(source),
        } = &self.kind
        {
            if stage.claim_function(name) {
                stage.block(source);
                stage.blank();
            }
        }
        Ok(())
    }

    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        let n = graph.node(node);
        match &self.kind {
            SourceKind::Inline { template, placeholders } => {
                let _ = placeholders;
                let expr = substitute(template, |name| {
                    let (port, _) = n.input(name).ok_or_else(|| {
                        GenError::missing_input(&n.name, name)
                    })?;
                    Ok(input_expr(gen, graph, InputRef { node, port }, ctx))
                })?;
                let out = &n.outputs[0];
                let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
                let ty = gen.syntax().type_name(&out.ty);
                stage.statement(&format!("{ty} {var} = {expr}"));
            }
            SourceKind::Function { name, .. } => {
                let mut suffix = "";
                let mut args: Vec<String> = Vec::new();

                // Closure evaluations prepend the purpose's extra
                // arguments and pick the suffixed entry point. A BSDF
                // that does not participate in the current purpose
                // (reflection-only asked for transmission, or the
                // reverse) degrades to its default output value.
                if n.has_classification(Classification::CLOSURE) {
                    if let Some(cc) = ctx.closure_context() {
                        if n.has_classification(Classification::BSDF) {
                            let participates = match cc.purpose() {
                                crate::closure::ClosurePurpose::Reflection
                                | crate::closure::ClosurePurpose::Indirect => {
                                    n.has_classification(Classification::BSDF_R)
                                }
                                crate::closure::ClosurePurpose::Transmission => {
                                    n.has_classification(Classification::BSDF_T)
                                }
                                _ => true,
                            };
                            if !participates {
                                emit_output_declarations(gen, graph, node, ctx, stage);
                                return Ok(());
                            }
                        }
                        suffix = cc.suffix();
                        for a in cc.args() {
                            args.push(a.expr.to_string());
                        }
                    }
                }

                for port in 0..n.inputs.len() {
                    args.push(input_expr(gen, graph, InputRef { node, port }, ctx));
                }

                // The pending thin-film modifier is consumed by the first
                // BSDF that reaches this point; siblings see none.
                if n.has_classification(Classification::BSDF) {
                    let pending = ctx
                        .closure_context_mut()
                        .and_then(|cc| cc.take_thin_film());
                    if let Some(tf) = pending {
                        args.push(named_input_expr(gen, graph, tf, "thickness", ctx)?);
                        args.push(named_input_expr(gen, graph, tf, "ior", ctx)?);
                    }
                }

                match gen.call_style() {
                    CallStyle::OutputParam => {
                        emit_output_declarations(gen, graph, node, ctx, stage);
                        for port in 0..n.outputs.len() {
                            args.push(output_var(gen, graph, OutputRef { node, port }, ctx));
                        }
                        stage.statement(&format!("{name}{suffix}({})", args.join(", ")));
                    }
                    CallStyle::ReturnValue => {
                        let out = &n.outputs[0];
                        let var = output_var(gen, graph, OutputRef { node, port: 0 }, ctx);
                        let ty = gen.syntax().type_name(&out.ty);
                        stage.statement(&format!(
                            "{ty} {var} = {name}{suffix}({})",
                            args.join(", ")
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Declares the node's outputs at their defaults and emits nothing else.
///
/// Used for nodes that only matter to an ancestor in the closure tree,
/// like a thin-film modifier reached outside a layer.
pub struct DefaultOutputImpl;

impl NodeImpl for DefaultOutputImpl {
    fn is_editable(&self, _input: &str) -> bool {
        false
    }

    fn emit_function_call(
        &self,
        gen: &dyn ShaderGenerator,
        graph: &ShaderGraph,
        node: NodeId,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> Result<()> {
        emit_output_declarations(gen, graph, node, ctx, stage);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PortDef;

    #[test]
    fn placeholders_are_extracted_in_order() {
        assert_eq!(
            extract_placeholders("{{in1}} + {{in2}} * {{in1}}"),
            vec!["in1".to_string(), "in2".to_string()]
        );
        assert!(extract_placeholders("no placeholders").is_empty());
    }

    #[test]
    fn unknown_placeholders_are_rejected() {
        let nodedef = NodeDef {
            name: "ND_scale".into(),
            node: "scale".into(),
            inputs: vec![PortDef {
                name: "in".into(),
                ty: "float".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let elem = ImplElement {
            source: Some("{{in}} * {{gain}}".into()),
            ..Default::default()
        };
        let err = SourceCodeImpl::from_element(&nodedef, &elem).err().unwrap();
        assert!(err.to_string().contains("gain"));
    }

    #[test]
    fn substitution_replaces_each_site() {
        let out = substitute("mix({{bg}}, {{fg}}, {{mix}})", |name| {
            Ok(format!("v_{name}"))
        })
        .unwrap();
        assert_eq!(out, "mix(v_bg, v_fg, v_mix)");
    }
}
