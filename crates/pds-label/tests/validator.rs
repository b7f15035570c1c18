//! Orchestrator behavior: phase sequencing, caching, policy flags, and the
//! accumulated statistics.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pds_label::{
    CompiledRuleSet, CompiledSchema, Document, DocumentValidator, LabelValidator, RuleCompiler,
    RuleGate, RuleReport, SchemaCompiler, SchemaSession, StructuralEvent, StructuralHandler,
    file_url,
};
use pds_model::{
    LabelError, Problem, ProblemContainer, ProblemSink, ProblemSource, ProblemType, Severity,
    SourcePosition,
};
use tempfile::TempDir;
use url::Url;

const PRODUCT: &str = "<?xml version=\"1.0\"?>\n\
<?xml-model href=\"rules/main.sch\" schematypens=\"http://purl.oclc.org/dsdl/schematron\"?>\n\
<Product_Observational>\n\
<bad>value</bad>\n\
</Product_Observational>\n";

const BUNDLE: &str = "<?xml version=\"1.0\"?>\n\
<?xml-model href=\"rules/main.sch\" schematypens=\"http://purl.oclc.org/dsdl/schematron\"?>\n\
<Product_Bundle>\n\
<bad>value</bad>\n\
</Product_Bundle>\n";

fn write_label(dir: &TempDir, name: &str, contents: &str) -> Url {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write label");
    file_url(&path).expect("file url")
}

/// Schema capability that flags every element named `bad` at the position
/// the replay cursor reported, and counts compilations and events.
struct FlaggingSchemaCompiler {
    compilations: Rc<RefCell<Vec<usize>>>,
    events_seen: Arc<AtomicUsize>,
}

struct FlaggingSchema {
    events_seen: Arc<AtomicUsize>,
}

struct FlaggingSession {
    events_seen: Arc<AtomicUsize>,
    problems: Vec<Problem>,
}

impl SchemaCompiler for FlaggingSchemaCompiler {
    fn compile(&mut self, sources: &[Url]) -> Result<Arc<dyn CompiledSchema>, LabelError> {
        self.compilations.borrow_mut().push(sources.len());
        Ok(Arc::new(FlaggingSchema {
            events_seen: Arc::clone(&self.events_seen),
        }))
    }
}

impl CompiledSchema for FlaggingSchema {
    fn begin(&self) -> Box<dyn SchemaSession> {
        Box::new(FlaggingSession {
            events_seen: Arc::clone(&self.events_seen),
            problems: Vec::new(),
        })
    }
}

impl StructuralHandler for FlaggingSession {
    fn handle(&mut self, event: StructuralEvent<'_>, position: &SourcePosition) {
        self.events_seen.fetch_add(1, Ordering::Relaxed);
        if let StructuralEvent::StartElement { element } = event {
            if element.local_name == "bad" {
                self.problems.push(Problem::label(
                    Severity::Error,
                    ProblemType::SchemaError,
                    format!("element '{}' not allowed here", element.local_name),
                    position,
                ));
            }
        }
    }
}

impl SchemaSession for FlaggingSession {
    fn finish(&mut self) -> Vec<Problem> {
        std::mem::take(&mut self.problems)
    }
}

/// Rule capability that emits one marker failure per execution.
struct MarkerRuleCompiler;

struct MarkerRules;

impl CompiledRuleSet for MarkerRules {
    fn apply(&self, _document: &Document) -> Result<RuleReport, String> {
        Ok(RuleReport {
            failed: vec![pds_label::FailedAssertion {
                role: None,
                message: "rule fired".to_string(),
                location: "/no/such/path".to_string(),
                test: "false()".to_string(),
            }],
        })
    }
}

impl RuleCompiler for MarkerRuleCompiler {
    fn compile(&mut self, _source: &Url) -> Result<Arc<dyn CompiledRuleSet>, LabelError> {
        Ok(Arc::new(MarkerRules))
    }
}

fn validator_with_mocks(
    compilations: &Rc<RefCell<Vec<usize>>>,
    events_seen: &Arc<AtomicUsize>,
) -> LabelValidator {
    let mut validator = LabelValidator::new();
    validator.set_schema_compiler(Box::new(FlaggingSchemaCompiler {
        compilations: Rc::clone(compilations),
        events_seen: Arc::clone(events_seen),
    }));
    validator.set_rule_compiler(Box::new(MarkerRuleCompiler));
    validator.set_schematron_check(true, true);
    validator
}

fn kinds(container: &ProblemContainer) -> Vec<ProblemType> {
    container.problems().iter().map(|p| p.kind).collect()
}

#[test]
fn schema_problems_carry_replay_positions() {
    let dir = TempDir::new().expect("temp dir");
    let url = write_label(&dir, "product.xml", PRODUCT);
    let compilations = Rc::new(RefCell::new(Vec::new()));
    let events = Arc::new(AtomicUsize::new(0));
    let mut validator = validator_with_mocks(&compilations, &events);
    let mut container = ProblemContainer::new();

    validator
        .parse_and_validate(&mut container, &url)
        .expect("validates");

    let schema_problem = container
        .problems()
        .iter()
        .find(|p| p.kind == ProblemType::SchemaError)
        .expect("schema problem");
    match &schema_problem.source {
        ProblemSource::Label { line, .. } => assert_eq!(*line, 4),
        ProblemSource::Table { .. } => panic!("label problem expected"),
    }
    assert!(events.load(Ordering::Relaxed) > 0);
}

#[test]
fn phases_report_in_order_and_counters_accumulate() {
    let dir = TempDir::new().expect("temp dir");
    let url = write_label(&dir, "product.xml", PRODUCT);
    let compilations = Rc::new(RefCell::new(Vec::new()));
    let events = Arc::new(AtomicUsize::new(0));
    let mut validator = validator_with_mocks(&compilations, &events);

    struct Marker;
    impl DocumentValidator for Marker {
        fn validate(&self, document: &Document, sink: &mut dyn ProblemSink) {
            sink.add_problem(Problem::label(
                Severity::Info,
                ProblemType::SchematronInfo,
                "content validator ran",
                &SourcePosition::unknown(document.url().as_str()),
            ));
        }
    }
    validator.add_document_validator(Box::new(Marker));

    let mut container = ProblemContainer::new();
    validator
        .parse_and_validate(&mut container, &url)
        .expect("validates");

    // Schema phase first, then the rule phase, then document validators.
    assert_eq!(
        kinds(&container),
        vec![
            ProblemType::SchemaError,
            ProblemType::SchematronError,
            ProblemType::SchematronInfo,
        ]
    );
    assert_eq!(validator.files_processed(), 1);

    let mut container = ProblemContainer::new();
    validator
        .parse_and_validate(&mut container, &url)
        .expect("validates");
    assert_eq!(validator.files_processed(), 2);
}

#[test]
fn validating_twice_is_idempotent_and_caches_the_schema() {
    let dir = TempDir::new().expect("temp dir");
    let url = write_label(&dir, "product.xml", PRODUCT);
    let compilations = Rc::new(RefCell::new(Vec::new()));
    let events = Arc::new(AtomicUsize::new(0));
    let mut validator = validator_with_mocks(&compilations, &events);

    let mut first = ProblemContainer::new();
    validator
        .parse_and_validate(&mut first, &url)
        .expect("validates");
    let mut second = ProblemContainer::new();
    validator
        .parse_and_validate(&mut second, &url)
        .expect("validates");

    assert_eq!(first.problems(), second.problems());
    // One compiled schema serves both documents.
    assert_eq!(compilations.borrow().len(), 1);
}

#[test]
fn switching_schema_modes_invalidates_the_cache() {
    let dir = TempDir::new().expect("temp dir");
    let url = write_label(&dir, "product.xml", PRODUCT);
    let compilations = Rc::new(RefCell::new(Vec::new()));
    let events = Arc::new(AtomicUsize::new(0));
    let mut validator = validator_with_mocks(&compilations, &events);

    let mut container = ProblemContainer::new();
    validator
        .parse_and_validate(&mut container, &url)
        .expect("validates");
    assert_eq!(compilations.borrow().len(), 1);

    // Document-schema mode: recompiled with no fixed sources, and the label
    // must declare its own schema location.
    validator.set_schema_check(true, true);
    let mut container = ProblemContainer::new();
    let error = validator
        .parse_and_validate(&mut container, &url)
        .expect_err("label declares no schema");
    assert!(matches!(error, LabelError::MissingSchema));
    assert_eq!(compilations.borrow().as_slice(), [0, 0]);
}

#[test]
fn skip_product_validation_suppresses_walk_but_keeps_bundle_rules() {
    let dir = TempDir::new().expect("temp dir");
    let product_url = write_label(&dir, "product.xml", PRODUCT);
    let bundle_url = write_label(&dir, "bundle.xml", BUNDLE);
    let compilations = Rc::new(RefCell::new(Vec::new()));
    let events = Arc::new(AtomicUsize::new(0));
    let mut validator = validator_with_mocks(&compilations, &events);
    validator.set_skip_product_validation(true);

    let mut container = ProblemContainer::new();
    validator
        .parse_and_validate(&mut container, &product_url)
        .expect("validates");
    // No events replayed, no rule problems for an ordinary product.
    assert_eq!(events.load(Ordering::Relaxed), 0);
    assert!(container.is_empty());

    let mut container = ProblemContainer::new();
    validator
        .parse_and_validate(&mut container, &bundle_url)
        .expect("validates");
    // Container-level documents still get the rule phase.
    assert_eq!(kinds(&container), vec![ProblemType::SchematronError]);
}

#[test]
fn unresolvable_rule_reference_still_yields_schema_problems() {
    let dir = TempDir::new().expect("temp dir");
    let label = "<?xml-model href=\"http://[bad\" schematypens=\"http://purl.oclc.org/dsdl/schematron\"?>\n\
<Product_Observational>\n\
<bad>value</bad>\n\
</Product_Observational>\n";
    let url = write_label(&dir, "product.xml", label);
    let compilations = Rc::new(RefCell::new(Vec::new()));
    let events = Arc::new(AtomicUsize::new(0));
    let mut validator = validator_with_mocks(&compilations, &events);

    let mut container = ProblemContainer::new();
    validator
        .parse_and_validate(&mut container, &url)
        .expect("validates");

    assert_eq!(
        kinds(&container),
        vec![ProblemType::SchemaError, ProblemType::SchematronError]
    );
    let schematron_errors: Vec<_> = container
        .problems()
        .iter()
        .filter(|p| p.kind == ProblemType::SchematronError)
        .collect();
    assert_eq!(schematron_errors.len(), 1);
    assert!(schematron_errors[0].message.contains("cannot resolve"));
}

#[test]
fn parse_failure_surfaces_a_fatal_problem_and_aborts() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("broken.xml");
    fs::write(&path, "<Product_Observational><oops>").expect("write label");
    let url = file_url(&path).expect("file url");
    let compilations = Rc::new(RefCell::new(Vec::new()));
    let events = Arc::new(AtomicUsize::new(0));
    let mut validator = validator_with_mocks(&compilations, &events);

    let mut container = ProblemContainer::new();
    let error = validator
        .parse_and_validate(&mut container, &url)
        .expect_err("malformed");
    assert!(matches!(error, LabelError::Parse { .. }));
    assert_eq!(container.len(), 1);
    assert_eq!(container.problems()[0].severity, Severity::Fatal);
    assert_eq!(container.problems()[0].kind, ProblemType::ParseError);
    // The document still counts as processed.
    assert_eq!(validator.files_processed(), 1);
}

#[test]
fn gates_without_capabilities_are_skipped_quietly() {
    let dir = TempDir::new().expect("temp dir");
    let url = write_label(&dir, "product.xml", PRODUCT);
    let mut validator = LabelValidator::new();
    validator.set_schematron_check(true, true);

    let mut container = ProblemContainer::new();
    validator
        .parse_and_validate(&mut container, &url)
        .expect("validates");
    assert!(container.is_empty());
}

#[test]
fn file_url_round_trips_through_the_loader() {
    let dir = TempDir::new().expect("temp dir");
    let url = write_label(&dir, "product.xml", PRODUCT);
    assert_eq!(url.scheme(), "file");
    assert!(Path::new(url.path()).file_name().is_some());
}

#[test]
fn rule_gate_without_compiler_reports_unloadable_references() {
    let dir = TempDir::new().expect("temp dir");
    let url = write_label(&dir, "product.xml", PRODUCT);
    let mut gate = RuleGate::new();
    let document = {
        let bytes = fs::read(url.to_file_path().expect("path")).expect("read");
        Document::parse(&bytes, &url).expect("parses")
    };
    let mut container = ProblemContainer::new();
    let references = gate.discover_references(&document, &mut container);
    let loaded = gate.load(&references, &url, &mut container);
    assert!(loaded.is_empty());
    assert_eq!(container.len(), 1);
    assert!(container.problems()[0].message.contains("no rule compiler"));
}
