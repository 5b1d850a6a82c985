//! MSL (Metal) generator.
//!
//! Shares the hardware pipeline with MSL spellings. The emitted stages
//! approximate Metal entry wrappers: uniforms become program-scope
//! constants patched by the consuming backend.

use super::glsl::{HwDialect, HwGenerator};
use super::{CallStyle, GeneratorSetup, ShaderGenerator};
use crate::context::GenContext;
use crate::document::Document;
use crate::error::Result;
use crate::graph::GenElement;
use crate::shader::Shader;
use crate::syntax::Syntax;

pub struct MslGenerator {
    inner: HwGenerator,
}

impl MslGenerator {
    pub fn new(setup: GeneratorSetup) -> Self {
        Self {
            inner: HwGenerator::new(HwDialect::Msl, setup),
        }
    }
}

impl ShaderGenerator for MslGenerator {
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
