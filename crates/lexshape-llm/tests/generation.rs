//! Generation against on-disk stores with a scripted completion backend.

use lexshape_fields::{DataField, FieldRegistry, XsdDatatype};
use lexshape_llm::{
    GenerationError, GeneratorOptions, ScriptedCompletion, ShapeGenerator,
};
use lexshape_rdf::parse_turtle;
use lexshape_store::{text_id, ExampleStore, GeneratorContext, ShapeStore};
use std::sync::Arc;
use tempfile::tempdir;

const EXAMPLE_SHAPE: &str = r#"
@prefix ff: <https://foerderfunke.org/default#> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
ff:example a ff:RequirementProfile ; ff:hasMainPersonShape ff:exampleMain .
ff:exampleMain a sh:NodeShape ; sh:targetClass ff:Citizen .
"#;

/// Missing the `xsd:` declaration and the final terminator.
const SLOPPY_RESPONSE: &str = "Here you go:\n\n\
@prefix ff: <https://foerderfunke.org/default#> .\n\
@prefix sh: <http://www.w3.org/ns/shacl#> .\n\
ff:wohngeld a ff:RequirementProfile ;\n    ff:hasMainPersonShape ff:wohngeldMain .\n\
ff:wohngeldMain a sh:NodeShape ;\n    sh:targetClass ff:Citizen ;\n    sh:property ff:wohngeldIncome .\n\
ff:wohngeldIncome a sh:PropertyShape ;\n    sh:path ff:einkommen_monatlich ;\n    sh:datatype xsd:decimal ;\n    sh:maxInclusive 2000\n";

#[test]
fn prompt_uses_stores_and_result_can_be_persisted() {
    let dir = tempdir().expect("tempdir");
    let registry = Arc::new(FieldRegistry::open(dir.path().join("datafields.yaml")).expect("registry"));
    registry
        .add_field(DataField::new("alter", "ff:alter", XsdDatatype::Integer, "Age in years"))
        .expect("add");
    let context = Arc::new(
        GeneratorContext::open(dir.path().join("generator_context.json")).expect("context"),
    );
    let examples = Arc::new(ExampleStore::open(dir.path().join("examples")).expect("examples"));
    for name in ["a", "b", "c", "d"] {
        examples
            .add(name, &format!("Example text {name}"), parse_turtle(EXAMPLE_SHAPE).expect("shape"), None)
            .expect("add example");
    }

    let legal_text = "Wohngeld erhält, wer weniger als 2000 Euro im Monat verdient.";
    let id = text_id(legal_text);
    context.add_guideline("Amounts are monthly euro values").expect("guideline");
    context.add_feedback(&id, "own feedback", "ff:own ff:own ff:own .").expect("feedback");
    context.add_feedback("other", "prefer decimals", "ff:x ff:y ff:z .").expect("feedback");

    let scripted = Arc::new(ScriptedCompletion::new([SLOPPY_RESPONSE]));
    let generator = ShapeGenerator::new(registry.clone(), context.clone(), scripted.clone())
        .with_examples(examples);

    let generated = generator.generate_shape(legal_text, &id).expect("generate");
    assert_eq!(generated.repair_rounds, 0);

    let user = &scripted.prompts()[0].user;
    assert!(user.contains("Field: alter"));
    assert!(user.contains("- Amounts are monthly euro values"));
    assert!(user.contains("Example text c"));
    assert!(!user.contains("Example text d"));
    assert!(user.contains("prefer decimals"));
    assert!(!user.contains("own feedback"));

    let names: Vec<&str> = generated.new_fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["einkommen_monatlich"]);
    generator.register_fields(&generated.new_fields).expect("register");
    assert!(registry.contains("einkommen_monatlich"));

    let shapes = ShapeStore::open(dir.path().join("shapes")).expect("shapes");
    shapes
        .add(&id, legal_text, generated.graph.clone(), None)
        .expect("store");
    let reopened = ShapeStore::open(dir.path().join("shapes")).expect("reopen");
    assert_eq!(reopened.get(&id).expect("stored").graph, generated.graph);

    let reloaded = FieldRegistry::open(dir.path().join("datafields.yaml")).expect("reload");
    assert_eq!(
        reloaded.get_field("einkommen_monatlich").map(|f| f.datatype),
        Some(XsdDatatype::Decimal)
    );
}

#[test]
fn wider_repair_budget_is_still_bounded() {
    let scripted = Arc::new(ScriptedCompletion::always("not { turtle"));
    let generator = ShapeGenerator::new(
        Arc::new(FieldRegistry::in_memory()),
        Arc::new(GeneratorContext::in_memory()),
        scripted.clone(),
    )
    .with_options(GeneratorOptions {
        repair_attempts: 3,
        ..GeneratorOptions::default()
    });

    let err = generator.generate_shape("text", "t").expect_err("never parses");
    assert!(matches!(err, GenerationError::InvalidTurtle { attempts: 3, .. }));
    assert_eq!(scripted.calls(), 4);
}
