//! Schema validation gate.
//!
//! The schema-validation algorithm itself is an external capability: a
//! [`SchemaCompiler`] builds an opaque [`CompiledSchema`] from a set of
//! source locations, and a per-document [`SchemaSession`] consumes the
//! structural event stream, reporting violations with the provenance that
//! was active when they were detected. The gate owns the compiled schema
//! and reuses it until the caller switches source modes.

use std::path::PathBuf;
use std::sync::Arc;

use pds_model::{LabelError, Problem, ProblemSink};
use url::Url;

use crate::document::Document;
use crate::replay::{StructuralHandler, replay};

/// Compiles a schema from a set of source locations. External capability.
pub trait SchemaCompiler {
    /// An empty source set means the schema is resolved dynamically from
    /// the namespaces the documents declare.
    fn compile(&mut self, sources: &[Url]) -> Result<Arc<dyn CompiledSchema>, LabelError>;
}

/// A compiled schema, shared across the documents one engine validates.
pub trait CompiledSchema: Send + Sync {
    /// Begin a validation session for one document.
    fn begin(&self) -> Box<dyn SchemaSession>;
}

/// One document's worth of schema validation.
pub trait SchemaSession: StructuralHandler {
    /// Finish the session and take the violations found, in document order.
    fn finish(&mut self) -> Vec<Problem>;
}

/// Where the schema for a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// Load exactly these locations.
    Explicit(Vec<Url>),
    /// The document declares its own schema location; compile with no fixed
    /// sources and require the declaration to be present.
    FromDocument,
    /// Fall back to a directory of locally known schema files.
    Directory(PathBuf),
}

pub struct SchemaGate {
    compiler: Option<Box<dyn SchemaCompiler>>,
    cached: Option<(SchemaSource, Arc<dyn CompiledSchema>)>,
}

impl SchemaGate {
    pub fn new() -> Self {
        Self {
            compiler: None,
            cached: None,
        }
    }

    pub fn with_compiler(compiler: Box<dyn SchemaCompiler>) -> Self {
        Self {
            compiler: Some(compiler),
            cached: None,
        }
    }

    pub fn set_compiler(&mut self, compiler: Box<dyn SchemaCompiler>) {
        self.compiler = Some(compiler);
        self.cached = None;
    }

    pub fn has_compiler(&self) -> bool {
        self.compiler.is_some()
    }

    /// Validate one document against the schema described by `source`.
    ///
    /// The event walk is suppressed when `replay_events` is false (product
    /// validation skipped); the schema-declaration requirement of
    /// [`SchemaSource::FromDocument`] is enforced either way.
    pub fn validate(
        &mut self,
        document: &Document,
        source: &SchemaSource,
        replay_events: bool,
        sink: &mut dyn ProblemSink,
    ) -> Result<(), LabelError> {
        if self.compiler.is_none() {
            tracing::debug!("no schema validation capability configured; skipping schema gate");
            return Ok(());
        }
        let schema = self.compiled_for(source)?;
        if replay_events {
            let mut session = schema.begin();
            replay(document, &mut *session);
            for problem in session.finish() {
                sink.add_problem(problem);
            }
        }
        if *source == SchemaSource::FromDocument && !declares_schema_location(document) {
            return Err(LabelError::MissingSchema);
        }
        Ok(())
    }

    /// Compile (or reuse) the schema for `source`. The cache holds one
    /// compiled schema and is invalidated only when the source key changes.
    fn compiled_for(&mut self, source: &SchemaSource) -> Result<Arc<dyn CompiledSchema>, LabelError> {
        if let Some((cached_source, schema)) = &self.cached {
            if cached_source == source {
                return Ok(Arc::clone(schema));
            }
        }
        let compiler = self
            .compiler
            .as_mut()
            .ok_or_else(|| LabelError::Capability("no schema compiler configured".to_string()))?;
        let sources = match source {
            SchemaSource::Explicit(urls) => urls.clone(),
            SchemaSource::FromDocument => Vec::new(),
            SchemaSource::Directory(directory) => schema_files_in(directory)?,
        };
        let schema = compiler.compile(&sources)?;
        self.cached = Some((source.clone(), Arc::clone(&schema)));
        Ok(schema)
    }
}

impl Default for SchemaGate {
    fn default() -> Self {
        Self::new()
    }
}

fn declares_schema_location(document: &Document) -> bool {
    document
        .document_element()
        .and_then(|root| document.element(root))
        .is_some_and(|element| element.attribute("xsi:schemaLocation").is_some())
}

/// Locally known schema files, in a stable order.
fn schema_files_in(directory: &std::path::Path) -> Result<Vec<Url>, LabelError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "xsd") {
            let url = Url::from_file_path(&path).map_err(|()| {
                LabelError::Capability(format!("not a valid file path: {}", path.display()))
            })?;
            files.push(url);
        }
    }
    files.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    Ok(files)
}
