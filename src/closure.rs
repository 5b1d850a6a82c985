//! Closure evaluation contexts.
//!
//! A closure graph (BSDF/EDF/VDF tree) is emitted several times per pixel:
//! once per light for direct reflection, once for indirect/environment
//! light, once for transmission, once for emission. Each pass evaluates
//! the same nodes against a different physical quantity, selected by the
//! [`ClosureContext`] active during emission: it supplies the function
//! name suffix and the extra call arguments for that quantity.

use crate::graph::node::NodeId;

/// The physical quantity a closure evaluation computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosurePurpose {
    /// Plain value evaluation, no light integration.
    Default,
    /// Direct reflection from an active light source.
    Reflection,
    /// Transmission through the surface.
    Transmission,
    /// Indirect/environment contribution.
    Indirect,
    /// Surface emission.
    Emission,
}

/// An extra argument appended to closure function calls.
#[derive(Debug, Clone)]
pub struct ClosureArg {
    pub type_name: &'static str,
    pub expr: &'static str,
}

/// Context for one closure-tree evaluation.
///
/// Created fresh per top-level evaluation request (e.g. per light-loop
/// call site) by the surface node implementation.
#[derive(Debug, Clone)]
pub struct ClosureContext {
    purpose: ClosurePurpose,
    suffix: &'static str,
    args: Vec<ClosureArg>,
    /// A pending thin-film modifier set by an ancestor in the closure
    /// tree, consumed by the first BSDF leaf that supports it.
    thin_film: Option<NodeId>,
}

impl ClosureContext {
    pub fn new(purpose: ClosurePurpose, suffix: &'static str, args: Vec<ClosureArg>) -> Self {
        Self {
            purpose,
            suffix,
            args,
            thin_film: None,
        }
    }

    pub fn default_context() -> Self {
        Self::new(ClosurePurpose::Default, "", vec![])
    }

    /// Direct reflection: incident light and view directions.
    pub fn reflection() -> Self {
        Self::new(
            ClosurePurpose::Reflection,
            "_reflection",
            vec![
                ClosureArg { type_name: "vector3", expr: "L" },
                ClosureArg { type_name: "vector3", expr: "V" },
            ],
        )
    }

    /// Transmission through the surface: view direction only.
    pub fn transmission() -> Self {
        Self::new(
            ClosurePurpose::Transmission,
            "_transmission",
            vec![ClosureArg { type_name: "vector3", expr: "V" }],
        )
    }

    /// Indirect/environment lighting: view direction only.
    pub fn indirect() -> Self {
        Self::new(
            ClosurePurpose::Indirect,
            "_indirect",
            vec![ClosureArg { type_name: "vector3", expr: "V" }],
        )
    }

    /// Emission: surface normal and outgoing direction.
    pub fn emission() -> Self {
        Self::new(
            ClosurePurpose::Emission,
            "",
            vec![
                ClosureArg { type_name: "vector3", expr: "N" },
                ClosureArg { type_name: "vector3", expr: "L" },
            ],
        )
    }

    pub fn purpose(&self) -> ClosurePurpose {
        self.purpose
    }

    /// Function-name suffix for this evaluation purpose.
    pub fn suffix(&self) -> &'static str {
        self.suffix
    }

    pub fn args(&self) -> &[ClosureArg] {
        &self.args
    }

    /// Arm the thin-film modifier for the subtree below the given node.
    pub fn set_thin_film(&mut self, node: NodeId) {
        self.thin_film = Some(node);
    }

    /// Consume the pending thin-film modifier. Only the first BSDF leaf
    /// that asks receives it; siblings see `None` afterwards.
    pub fn take_thin_film(&mut self) -> Option<NodeId> {
        self.thin_film.take()
    }

    pub fn thin_film(&self) -> Option<NodeId> {
        self.thin_film
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thin_film_is_consumed_exactly_once() {
        let mut cc = ClosureContext::reflection();
        cc.set_thin_film(NodeId(4));
        assert_eq!(cc.take_thin_film(), Some(NodeId(4)));
        assert_eq!(cc.take_thin_film(), None);
    }

    #[test]
    fn purposes_carry_their_suffixes() {
        assert_eq!(ClosureContext::reflection().suffix(), "_reflection");
        assert_eq!(ClosureContext::transmission().suffix(), "_transmission");
        assert_eq!(ClosureContext::indirect().suffix(), "_indirect");
        assert_eq!(ClosureContext::emission().suffix(), "");
    }
}
