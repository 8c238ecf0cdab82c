//! Harness source skeletons, rendered through one handlebars registry.
//!
//! Each generator contributes its templates as `(name, source)` pairs named
//! `<language>_<part>`. Values are inserted verbatim since the output is
//! program text, and strict mode turns a missing value into an error rather
//! than an empty string.

use super::{apex, cpp, java, javascript, python};
use crate::error::{EngineError, EngineResult};
use codegrade_common::types::Language;
use handlebars::Handlebars;
use lazy_static::lazy_static;
use serde_json::Value;
use tracing::error;

lazy_static! {
    static ref REGISTRY: Handlebars<'static> = build_registry();
}

fn sources() -> impl Iterator<Item = &'static (&'static str, &'static str)> {
    python::TEMPLATES
        .iter()
        .chain(javascript::TEMPLATES)
        .chain(java::TEMPLATES)
        .chain(cpp::TEMPLATES)
        .chain(apex::TEMPLATES)
}

fn build_registry() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);
    for &(name, source) in sources() {
        // an unregistered template surfaces as a render error
        if let Err(e) = handlebars.register_template_string(name, source) {
            error!(template = name, error = %e, "Failed to register harness template");
        }
    }
    handlebars
}

/// Render a registered template. Failures are harness generation errors.
pub fn render(
    language: Language,
    problem_id: Option<&str>,
    name: &str,
    data: &Value,
) -> EngineResult<String> {
    REGISTRY.render(name, data).map_err(|e| EngineError::HarnessGeneration {
        language,
        problem_id: problem_id.map(str::to_string),
        reason: format!("failed to render {} template: {}", name, e),
    })
}
