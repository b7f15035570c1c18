//! Schematron rule gate.
//!
//! Rule-set references are discovered in the document's own processing
//! instructions or supplied by the caller, resolved (optionally through a
//! catalog), compiled at most once per resolved identifier, and executed
//! against the parsed tree. Every failed assertion in the resulting report
//! is mapped back to a source position through the original document; when
//! the target path cannot be resolved, the problem degrades to contextual
//! text instead of a line and column.

use std::collections::HashMap;
use std::sync::Arc;

use pds_model::{LabelError, Problem, ProblemSink, ProblemType, Severity, SourcePosition};
use regex::Regex;
use url::Url;

use crate::document::{Document, NodeKind};
use crate::path;

/// Compiles a rule-set source into an executable transform. External
/// capability.
pub trait RuleCompiler {
    fn compile(&mut self, source: &Url) -> Result<Arc<dyn CompiledRuleSet>, LabelError>;
}

/// An executable rule transform, shared across the documents one engine
/// validates; never mutated after compilation.
pub trait CompiledRuleSet: Send + Sync {
    /// Apply the rules to a document, producing the failure report.
    fn apply(&self, document: &Document) -> Result<RuleReport, String>;
}

/// Maps a logical schema or rule-set identifier to a concrete resolvable
/// location. External capability, optional.
pub trait CatalogResolver {
    fn resolve(&self, identifier: &str) -> Option<String>;
}

/// Structured output of one rule-set execution.
#[derive(Debug, Default)]
pub struct RuleReport {
    pub failed: Vec<FailedAssertion>,
}

/// One failed assertion from a rule report.
#[derive(Debug, Clone)]
pub struct FailedAssertion {
    /// Severity hint (`warn`, `warning`, `info`); anything else is an error.
    pub role: Option<String>,
    pub message: String,
    /// Path expression locating the failing node in the source document.
    pub location: String,
    /// The original test expression, kept for context when the location
    /// cannot be resolved.
    pub test: String,
}

pub struct RuleGate {
    compiler: Option<Box<dyn RuleCompiler>>,
    catalog: Option<Box<dyn CatalogResolver>>,
    cache: HashMap<String, Arc<dyn CompiledRuleSet>>,
    reference_pattern: Regex,
}

impl RuleGate {
    pub fn new() -> Self {
        Self {
            compiler: None,
            catalog: None,
            cache: HashMap::new(),
            reference_pattern: Regex::new(
                r#"href\s*=\s*"([^"]*)"\s*schematypens\s*=\s*"http://purl\.oclc\.org/dsdl/schematron""#,
            )
            .expect("valid pattern"),
        }
    }

    pub fn with_compiler(compiler: Box<dyn RuleCompiler>) -> Self {
        let mut gate = Self::new();
        gate.compiler = Some(compiler);
        gate
    }

    pub fn set_compiler(&mut self, compiler: Box<dyn RuleCompiler>) {
        self.compiler = Some(compiler);
    }

    pub fn set_catalog(&mut self, catalog: Box<dyn CatalogResolver>) {
        self.catalog = Some(catalog);
    }

    pub fn has_compiler(&self) -> bool {
        self.compiler.is_some()
    }

    /// Scan the document's top-level processing instructions for rule-set
    /// references and resolve each to an absolute URL. Unresolvable
    /// references are reported and skipped; the document continues.
    pub fn discover_references(
        &self,
        document: &Document,
        sink: &mut dyn ProblemSink,
    ) -> Vec<Url> {
        let mut references = Vec::new();
        for id in document.top_level_processing_instructions() {
            let NodeKind::ProcessingInstruction { target, data } = document.kind(id) else {
                continue;
            };
            if !target.eq_ignore_ascii_case("xml-model") {
                continue;
            }
            let normalized = normalize_whitespace(data);
            let Some(captures) = self.reference_pattern.captures(&normalized) else {
                continue;
            };
            let value = captures[1].trim();
            // A literal URL first, then a reference relative to the
            // document's own URL.
            let resolved = Url::parse(value).or_else(|_| document.url().join(value));
            match resolved {
                Ok(reference) => references.push(reference),
                Err(error) => {
                    sink.add_problem(Problem::label(
                        Severity::Error,
                        ProblemType::SchematronError,
                        format!("cannot resolve schematron specification '{value}': {error}"),
                        &SourcePosition::unknown(document.url().as_str()),
                    ));
                }
            }
        }
        references
    }

    /// Load the given references, compiling each resolved identifier at
    /// most once per gate instance. Failures are reported and the affected
    /// rule set skipped.
    pub fn load(
        &mut self,
        references: &[Url],
        document_url: &Url,
        sink: &mut dyn ProblemSink,
    ) -> Vec<Arc<dyn CompiledRuleSet>> {
        let mut rule_sets = Vec::new();
        for reference in references {
            match self.load_one(reference) {
                Ok(rules) => rule_sets.push(rules),
                Err(message) => {
                    tracing::warn!(reference = %reference, "schematron load failed");
                    sink.add_problem(Problem::label(
                        Severity::Error,
                        ProblemType::SchematronError,
                        format!("error occurred while loading schematron: {message}"),
                        &SourcePosition::unknown(document_url.as_str()),
                    ));
                }
            }
        }
        rule_sets
    }

    fn load_one(&mut self, reference: &Url) -> Result<Arc<dyn CompiledRuleSet>, String> {
        let mut source = reference.to_string();
        if let Some(catalog) = &self.catalog {
            source = catalog.resolve(&source).ok_or_else(|| {
                format!("'{source}' was not resolvable through the catalog file")
            })?;
        }
        if let Some(rules) = self.cache.get(&source) {
            return Ok(Arc::clone(rules));
        }
        let url = Url::parse(&source).map_err(|error| format!("'{source}': {error}"))?;
        let compiler = self
            .compiler
            .as_mut()
            .ok_or_else(|| "no rule compiler configured".to_string())?;
        let rules = compiler
            .compile(&url)
            .map_err(|error| format!("'{source}': {error}"))?;
        self.cache.insert(source, Arc::clone(&rules));
        Ok(rules)
    }

    /// Apply every compiled rule set to the document, mapping failed
    /// assertions back to source positions.
    pub fn execute(
        &self,
        rule_sets: &[Arc<dyn CompiledRuleSet>],
        document: &Document,
        sink: &mut dyn ProblemSink,
    ) {
        for rules in rule_sets {
            match rules.apply(document) {
                Ok(report) => {
                    for assertion in &report.failed {
                        sink.add_problem(self.problem_for(document, assertion));
                    }
                }
                Err(message) => {
                    sink.add_problem(Problem::label(
                        Severity::Error,
                        ProblemType::SchematronError,
                        format!("schematron execution failed: {message}"),
                        &SourcePosition::unknown(document.url().as_str()),
                    ));
                }
            }
        }
    }

    fn problem_for(&self, document: &Document, assertion: &FailedAssertion) -> Problem {
        let (severity, kind) = match assertion.role.as_deref() {
            Some(role) if role.eq_ignore_ascii_case("warn") || role.eq_ignore_ascii_case("warning") => {
                (Severity::Warning, ProblemType::SchematronWarning)
            }
            Some(role) if role.eq_ignore_ascii_case("info") => {
                (Severity::Info, ProblemType::SchematronInfo)
            }
            _ => (Severity::Error, ProblemType::SchematronError),
        };
        match path::resolve(document, &assertion.location) {
            Some(node) => Problem::label(
                severity,
                kind,
                assertion.message.trim(),
                document.position(node),
            ),
            None => Problem::label(
                Severity::Error,
                kind,
                format!(
                    "{} [Context: \"{}\"; Test: \"{}\"]",
                    assertion.message.trim(),
                    assertion.location,
                    assertion.test
                ),
                &SourcePosition::unknown(document.url().as_str()),
            ),
        }
    }
}

impl Default for RuleGate {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_whitespace(data: &str) -> String {
    data.split_whitespace().collect::<Vec<_>>().join(" ")
}
