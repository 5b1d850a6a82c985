//! ESSL (OpenGL ES / WebGL2) generator.
//!
//! Shares the hardware pipeline; emits `#version 300 es` with precision
//! directives and rejects explicit binding locations.

use super::glsl::{HwDialect, HwGenerator};
use super::{CallStyle, GeneratorSetup, ShaderGenerator};
use crate::context::GenContext;
use crate::document::Document;
use crate::error::Result;
use crate::graph::GenElement;
use crate::shader::Shader;
use crate::syntax::Syntax;

pub struct EsslGenerator {
    inner: HwGenerator,
}

impl EsslGenerator {
    pub fn new(setup: GeneratorSetup) -> Self {
        Self {
            inner: HwGenerator::new(HwDialect::Essl, setup),
        }
    }
}

impl ShaderGenerator for EsslGenerator {
    fn target(&self) -> &'static str {
        self.inner.target()
    }

    fn syntax(&self) -> &dyn Syntax {
        self.inner.syntax()
    }

    fn setup(&self) -> &GeneratorSetup {
        self.inner.setup()
    }

    fn call_style(&self) -> CallStyle {
        self.inner.call_style()
    }

    fn generate(
        &self,
        name: &str,
        root: GenElement,
        doc: &Document,
        ctx: &mut GenContext,
    ) -> Result<Shader> {
        self.inner.generate(name, root, doc, ctx)
    }
}
