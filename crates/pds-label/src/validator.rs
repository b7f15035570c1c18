//! Per-document validation pipeline.
//!
//! Sequences parse → schema gate → rule gate → registered document
//! validators for one label, applying the configured policy and
//! accumulating processed-file and elapsed-time statistics. One instance
//! per worker: the compiled-schema and rule-set caches are instance-shared
//! mutable state, so concurrent use of a single instance requires external
//! synchronization.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pds_model::{LabelError, Problem, ProblemSink, ProblemType, Severity, SourcePosition};
use url::Url;

use crate::document::Document;
use crate::schema::{SchemaCompiler, SchemaGate, SchemaSource};
use crate::schematron::{CatalogResolver, CompiledRuleSet, RuleCompiler, RuleGate};

/// A document-level content validator registered with the orchestrator.
///
/// Runs after the schema and rule gates, against the parsed tree, and
/// reports through the same sink.
pub trait DocumentValidator {
    fn validate(&self, document: &Document, sink: &mut dyn ProblemSink);
}

pub struct LabelValidator {
    schema_check: bool,
    schematron_check: bool,
    use_label_schema: bool,
    use_label_schematron: bool,
    skip_product_validation: bool,
    user_schema_files: Option<Vec<Url>>,
    user_schematron_files: Option<Vec<Url>>,
    user_rule_sets: Vec<Arc<dyn CompiledRuleSet>>,
    schema_directory: Option<PathBuf>,
    schema_gate: SchemaGate,
    rule_gate: RuleGate,
    cached_rule_sets: Vec<Arc<dyn CompiledRuleSet>>,
    document_validators: Vec<Box<dyn DocumentValidator>>,
    files_processed: u64,
    total_time_elapsed: Duration,
}

impl LabelValidator {
    pub fn new() -> Self {
        Self {
            schema_check: true,
            schematron_check: true,
            use_label_schema: false,
            use_label_schematron: false,
            skip_product_validation: false,
            user_schema_files: None,
            user_schematron_files: None,
            user_rule_sets: Vec::new(),
            schema_directory: None,
            schema_gate: SchemaGate::new(),
            rule_gate: RuleGate::new(),
            cached_rule_sets: Vec::new(),
            document_validators: Vec::new(),
            files_processed: 0,
            total_time_elapsed: Duration::ZERO,
        }
    }

    pub fn set_schema_compiler(&mut self, compiler: Box<dyn SchemaCompiler>) {
        self.schema_gate.set_compiler(compiler);
    }

    pub fn set_rule_compiler(&mut self, compiler: Box<dyn RuleCompiler>) {
        self.rule_gate.set_compiler(compiler);
    }

    /// Enable or disable the schema gate; `use_label_schema` selects
    /// document-schema mode, where the label must declare its own schema
    /// location.
    pub fn set_schema_check(&mut self, enabled: bool, use_label_schema: bool) {
        self.schema_check = enabled;
        self.use_label_schema = use_label_schema;
    }

    /// Enable or disable the rule gate; `use_label_schematron` selects
    /// discovery of rule-set references from the label itself.
    pub fn set_schematron_check(&mut self, enabled: bool, use_label_schematron: bool) {
        self.schematron_check = enabled;
        self.use_label_schematron = use_label_schematron;
    }

    /// Validate against exactly these schema files.
    pub fn set_schema_files(&mut self, files: Vec<Url>) {
        self.user_schema_files = Some(files);
    }

    /// Compile and validate against exactly these rule-set files.
    pub fn set_schematron_files(&mut self, files: Vec<Url>) {
        self.user_schematron_files = Some(files);
    }

    /// Validate against pre-compiled rule sets.
    pub fn set_rule_sets(&mut self, rule_sets: Vec<Arc<dyn CompiledRuleSet>>) {
        self.user_rule_sets = rule_sets;
    }

    /// Directory of locally known schemas used when neither the caller nor
    /// the label supplies schema locations.
    pub fn set_schema_directory(&mut self, directory: PathBuf) {
        self.schema_directory = Some(directory);
    }

    /// Resolve rule-set references through a catalog. Implies discovery of
    /// references from the label.
    pub fn set_catalog(&mut self, catalog: Box<dyn CatalogResolver>) {
        self.rule_gate.set_catalog(catalog);
        self.use_label_schematron = true;
    }

    /// Skip the expensive per-product phases. Rule checks still run for
    /// bundle- and collection-class documents, which are detected from the
    /// document content, never from the file name.
    pub fn set_skip_product_validation(&mut self, skip: bool) {
        self.skip_product_validation = skip;
    }

    pub fn add_document_validator(&mut self, validator: Box<dyn DocumentValidator>) {
        self.document_validators.push(validator);
    }

    /// Number of documents processed by this instance.
    pub fn files_processed(&self) -> u64 {
        self.files_processed
    }

    /// Cumulative wall-clock time spent validating.
    pub fn total_time_elapsed(&self) -> Duration {
        self.total_time_elapsed
    }

    /// Validate one label, reporting every problem through `sink`.
    pub fn validate(&mut self, sink: &mut dyn ProblemSink, url: &Url) -> Result<(), LabelError> {
        self.parse_and_validate(sink, url).map(|_| ())
    }

    /// Validate one label and hand back the parsed document.
    ///
    /// Problems reach the sink in phase order (schema, then rule sets, then
    /// document validators) and in document order within a phase. The
    /// processed-file counter and elapsed-time total are updated whether or
    /// not problems were found.
    pub fn parse_and_validate(
        &mut self,
        sink: &mut dyn ProblemSink,
        url: &Url,
    ) -> Result<Document, LabelError> {
        let start = Instant::now();
        let result = self.run_phases(sink, url);
        self.files_processed += 1;
        self.total_time_elapsed += start.elapsed();
        result
    }

    fn run_phases(
        &mut self,
        sink: &mut dyn ProblemSink,
        url: &Url,
    ) -> Result<Document, LabelError> {
        let bytes = load_bytes(url)?;
        let document = match Document::parse(&bytes, url) {
            Ok(document) => document,
            Err(error) => {
                if let LabelError::Parse {
                    message,
                    line,
                    column,
                } = &error
                {
                    sink.add_problem(Problem::label(
                        Severity::Fatal,
                        ProblemType::ParseError,
                        message.clone(),
                        &SourcePosition::new(url.as_str(), *line, *column),
                    ));
                }
                return Err(error);
            }
        };

        if self.schema_check {
            let source = self.schema_source();
            self.schema_gate
                .validate(&document, &source, !self.skip_product_validation, sink)?;
        }

        if self.schematron_check {
            self.run_rule_phase(&document, url, sink);
        }

        if !self.skip_product_validation {
            for validator in &self.document_validators {
                validator.validate(&document, sink);
            }
        }

        tracing::debug!(url = %url, "label validated");
        Ok(document)
    }

    fn schema_source(&self) -> SchemaSource {
        if let Some(files) = &self.user_schema_files {
            SchemaSource::Explicit(files.clone())
        } else if self.use_label_schema {
            SchemaSource::FromDocument
        } else if let Some(directory) = &self.schema_directory {
            SchemaSource::Directory(directory.clone())
        } else {
            SchemaSource::Explicit(Vec::new())
        }
    }

    fn run_rule_phase(&mut self, document: &Document, url: &Url, sink: &mut dyn ProblemSink) {
        if !self.rule_gate.has_compiler() && self.user_rule_sets.is_empty() {
            tracing::debug!("no rule compilation capability configured; skipping rule gate");
            return;
        }
        let references = if self.use_label_schematron {
            self.rule_gate.discover_references(document, sink)
        } else {
            Vec::new()
        };

        if self.cached_rule_sets.is_empty() {
            self.cached_rule_sets = if self.use_label_schematron {
                self.rule_gate.load(&references, url, sink)
            } else if !self.user_rule_sets.is_empty() {
                self.user_rule_sets.clone()
            } else if let Some(files) = self.user_schematron_files.clone() {
                self.rule_gate.load(&files, url, sink)
            } else {
                Vec::new()
            };
        } else if self.use_label_schematron {
            // References can differ per label; the per-identifier cache in
            // the gate keeps reloads cheap.
            self.cached_rule_sets = if !self.user_rule_sets.is_empty() {
                self.user_rule_sets.clone()
            } else {
                self.rule_gate.load(&references, url, sink)
            };
        }

        if self.should_apply_rules(document) {
            self.rule_gate
                .execute(&self.cached_rule_sets, document, sink);
        }
    }

    /// Rule-set validation is the most expensive phase. It always applies
    /// to container-level documents; ordinary product labels are skipped
    /// when skip-product-validation is active.
    fn should_apply_rules(&self, document: &Document) -> bool {
        if !self.skip_product_validation {
            return true;
        }
        is_bundle_or_collection(document)
    }
}

impl Default for LabelValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the document is a container-level (bundle or collection class)
/// product, judged by document content.
pub fn is_bundle_or_collection(document: &Document) -> bool {
    document
        .document_element()
        .and_then(|root| document.element(root))
        .is_some_and(|element| {
            matches!(
                element.local_name.as_str(),
                "Product_Bundle" | "Product_Collection"
            )
        })
}

/// Build a `file:` URL for a filesystem path.
pub fn file_url(path: &Path) -> Result<Url, LabelError> {
    let absolute = std::fs::canonicalize(path)?;
    Url::from_file_path(&absolute)
        .map_err(|()| LabelError::UnsupportedUrl(path.display().to_string()))
}

fn load_bytes(url: &Url) -> Result<Vec<u8>, LabelError> {
    if url.scheme() != "file" {
        return Err(LabelError::UnsupportedUrl(url.to_string()));
    }
    let path = url
        .to_file_path()
        .map_err(|()| LabelError::UnsupportedUrl(url.to_string()))?;
    Ok(std::fs::read(path)?)
}
