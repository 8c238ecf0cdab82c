/// Harness Synthesizer
///
/// **Core Responsibility:**
/// Turn `(language, problem id, submitted code)` into source files that read a
/// test case from stdin, call the submission's entry point, and print its
/// result in the problem's canonical form.
///
/// **Resolution Order:**
/// 1. Registered generator for `(language, normalized problem id)`
/// 2. Content sniffing over the catalog (degraded mode, logged)
/// 3. Generic single-argument harness (degraded mode, logged)
/// 4. `HarnessGeneration` error
///
/// Generators are pure functions; they never touch the filesystem.

pub mod apex;
pub mod catalog;
pub mod cpp;
pub mod entry;
pub mod java;
pub mod javascript;
pub mod python;
pub mod template;

use crate::error::{EngineError, EngineResult};
use catalog::{OutputShape, ProblemDef, CATALOG};
use codegrade_common::types::Language;
use std::collections::HashMap;
use tracing::{debug, warn};

pub use apex::ApexProgram;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub contents: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Harness {
    /// Files written into the workspace; each test input arrives on stdin
    Local { files: Vec<SourceFile> },
    /// Program text rendered per test case for the remote runner
    Remote(ApexProgram),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessSource {
    Registered,
    Sniffed,
    Generic,
}

#[derive(Debug, Clone)]
pub struct Synthesized {
    pub harness: Harness,
    pub source: HarnessSource,
    pub problem: Option<&'static ProblemDef>,
    /// Printed form of the result, when known
    pub output_shape: Option<OutputShape>,
}

impl Synthesized {
    /// Whether outputs should be compared as JSON values
    pub fn structured_output(&self) -> bool {
        self.output_shape.is_some_and(|shape| shape.is_structured())
    }
}

pub type Generator = fn(&ProblemDef, &str) -> EngineResult<Harness>;

/// A catalog `(problem, language)` pair with no generator behind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogGap {
    pub problem_id: &'static str,
    pub language: Language,
}

impl std::fmt::Display for CatalogGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} has no {} harness", self.problem_id, self.language)
    }
}

/// Generator a language offers for a problem's shapes, if any
fn generator_for(language: Language, problem: &ProblemDef) -> Option<Generator> {
    match language {
        Language::Python => Some(python::generate as Generator),
        Language::JavaScript => Some(javascript::generate as Generator),
        Language::Java if java::supports(problem.input) => Some(java::generate as Generator),
        Language::Cpp if cpp::supports(problem.input) => Some(cpp::generate as Generator),
        Language::Apex if problem.id == "twosum" => Some(apex::generate_two_sum as Generator),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct HarnessRegistry {
    generators: HashMap<(Language, &'static str), Generator>,
}

impl HarnessRegistry {
    /// Registry covering every catalog problem for every language it supports
    pub fn from_catalog() -> Self {
        let mut generators = HashMap::new();
        for problem in CATALOG {
            for &language in problem.languages {
                if let Some(generator) = generator_for(language, problem) {
                    generators.insert((language, problem.id), generator);
                }
            }
        }
        Self { generators }
    }

    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    pub fn register(&mut self, language: Language, problem_id: &'static str, generator: Generator) {
        self.generators.insert((language, problem_id), generator);
    }

    pub fn is_registered(&self, language: Language, problem_id: &str) -> bool {
        let id = catalog::normalize_problem_id(problem_id);
        self.generators.keys().any(|(l, p)| *l == language && *p == id)
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Every supported catalog pair lacking a generator
    pub fn validate(&self) -> Vec<CatalogGap> {
        let mut gaps = Vec::new();
        for problem in CATALOG {
            for &language in problem.languages {
                if !self.generators.contains_key(&(language, problem.id)) {
                    gaps.push(CatalogGap {
                        problem_id: problem.id,
                        language,
                    });
                }
            }
        }
        gaps
    }

    pub fn synthesize(
        &self,
        language: Language,
        problem_id: Option<&str>,
        code: &str,
    ) -> EngineResult<Synthesized> {
        if code.trim().is_empty() {
            return Err(EngineError::HarnessGeneration {
                language,
                problem_id: problem_id.map(str::to_string),
                reason: "submitted code is empty".to_string(),
            });
        }

        if let Some(problem) = problem_id.and_then(catalog::find) {
            if let Some(generator) = self.generators.get(&(language, problem.id)) {
                debug!(problem_id = problem.id, %language, "Using registered harness");
                return Ok(Synthesized {
                    harness: generator(problem, code)?,
                    source: HarnessSource::Registered,
                    problem: Some(problem),
                    output_shape: Some(problem.output),
                });
            }
        }

        if let Some(problem) = catalog::sniff(language, code) {
            if let Some(generator) = self.generators.get(&(language, problem.id)) {
                warn!(
                    requested = ?problem_id,
                    sniffed = problem.id,
                    %language,
                    "No registered harness, selected one by content sniffing"
                );
                return Ok(Synthesized {
                    harness: generator(problem, code)?,
                    source: HarnessSource::Sniffed,
                    problem: Some(problem),
                    output_shape: Some(problem.output),
                });
            }
        }

        let generic = match language {
            Language::Python => Some(python::generate_generic(code).map(|h| (h, Some(OutputShape::Json)))),
            Language::JavaScript => {
                Some(javascript::generate_generic(code).map(|h| (h, Some(OutputShape::Json))))
            }
            Language::Apex => Some(apex::generate_generic(code).map(|h| (h, None))),
            Language::Java | Language::Cpp => None,
        };

        match generic {
            Some(Ok((harness, output_shape))) => {
                warn!(requested = ?problem_id, %language, "Falling back to generic harness");
                Ok(Synthesized {
                    harness,
                    source: HarnessSource::Generic,
                    problem: None,
                    output_shape,
                })
            }
            Some(Err(EngineError::HarnessGeneration { reason, .. })) => Err(EngineError::HarnessGeneration {
                language,
                problem_id: problem_id.map(str::to_string),
                reason,
            }),
            Some(Err(other)) => Err(other),
            None => Err(EngineError::HarnessGeneration {
                language,
                problem_id: problem_id.map(str::to_string),
                reason: "no registered harness and no recognizable entry point".to_string(),
            }),
        }
    }
}

impl Default for HarnessRegistry {
    fn default() -> Self {
        Self::from_catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegrade_common::types::ErrorKind;

    #[test]
    fn test_catalog_registry_has_no_gaps() {
        let registry = HarnessRegistry::from_catalog();
        assert!(registry.validate().is_empty(), "{:?}", registry.validate());
        assert!(registry.is_registered(Language::Java, "two-sum"));
        assert!(registry.is_registered(Language::Apex, "twosum"));
        assert!(!registry.is_registered(Language::Java, "arraychunk"));
    }

    #[test]
    fn test_validate_reports_missing_generators() {
        let mut registry = HarnessRegistry::empty();
        registry.register(Language::Python, "twosum", python::generate);
        let gaps = registry.validate();
        assert!(gaps.contains(&CatalogGap {
            problem_id: "twosum",
            language: Language::Java
        }));
        assert!(!gaps.contains(&CatalogGap {
            problem_id: "twosum",
            language: Language::Python
        }));
    }

    #[test]
    fn test_registered_lookup_normalizes_id() {
        let registry = HarnessRegistry::from_catalog();
        let result = registry
            .synthesize(Language::Python, Some("Two-Sum"), "def two_sum(nums, target):\n    return [0, 1]\n")
            .unwrap();
        assert_eq!(result.source, HarnessSource::Registered);
        assert_eq!(result.problem.map(|p| p.id), Some("twosum"));
        assert!(!result.structured_output());
    }

    #[test]
    fn test_sniffing_when_problem_unknown() {
        let registry = HarnessRegistry::from_catalog();
        let code = "class MinPathSum {\n    int minPathSum(int[][] grid) { return 0; }\n}";
        let result = registry.synthesize(Language::Java, None, code).unwrap();
        assert_eq!(result.source, HarnessSource::Sniffed);
        assert_eq!(result.problem.map(|p| p.id), Some("minimumpathsum"));
    }

    #[test]
    fn test_generic_fallback_and_failure() {
        let registry = HarnessRegistry::from_catalog();
        let generic = registry
            .synthesize(Language::JavaScript, Some("mystery"), "function solve(x) { return x; }")
            .unwrap();
        assert_eq!(generic.source, HarnessSource::Generic);
        assert!(generic.structured_output());

        let err = registry
            .synthesize(Language::Java, Some("mystery"), "class Foo {}")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HarnessGenerationError);

        let err = registry.synthesize(Language::Python, Some("twosum"), "  \n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HarnessGenerationError);
    }
}
