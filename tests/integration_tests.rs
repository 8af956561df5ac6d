//! Integration tests for the complete lexshape pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - SHACL field import → Registry → Citizen instances
//! - Legal text → Generator (scripted completion, repair) → Shape store
//! - Stored shape → SHACL engine → Instance validation
//!
//! Run with: cargo test --test integration_tests

use lexshape_fields::{FieldRegistry, XsdDatatype};
use lexshape_llm::{ScriptedCompletion, ShapeGenerator};
use lexshape_store::{text_id, GeneratorContext, InstanceStore, ShapeStore};
use lexshape_validate::ShaclEngine;
use std::sync::Arc;
use tempfile::tempdir;

const FIELD_DEFINITIONS: &str = r#"
@prefix ff: <https://foerderfunke.org/default#> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

ff:alter a ff:DataField ;
    rdfs:label "Alter"@de ;
    rdfs:comment "Age in years"@en ;
    ff:objectConstraints [ a sh:PropertyShape ; sh:datatype xsd:integer ; sh:minInclusive 0 ] .

ff:einkommen_monatlich a ff:DataField ;
    rdfs:comment "Monthly net income in euro"@en ;
    ff:objectConstraints [ a sh:PropertyShape ; sh:datatype xsd:decimal ] .
"#;

const LEGAL_TEXT: &str = "§ 1 Anspruch\n\n\
Wohngeld erhält, wer volljährig ist und monatlich höchstens 2000 Euro verdient.\n\
Die Postleitzahl des Wohnorts ist anzugeben.";

const BROKEN_RESPONSE: &str = "```turtle\nff:wohngeld ff:hasMainPersonShape { broken\n```";

const REPAIRED_RESPONSE: &str = r#"Corrected:

```turtle
@prefix ff: <https://foerderfunke.org/default#> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

ff:wohngeld a ff:RequirementProfile ;
    ff:hasMainPersonShape ff:wohngeldMain .

ff:wohngeldMain a sh:NodeShape ;
    sh:targetClass ff:Citizen ;
    sh:property ff:wohngeldAge, ff:wohngeldIncome, ff:wohngeldPlz .

ff:wohngeldAge a sh:PropertyShape ;
    sh:path ff:alter ;
    sh:datatype xsd:integer ;
    sh:minInclusive 18 ;
    sh:minCount 1 .

ff:wohngeldIncome a sh:PropertyShape ;
    sh:path ff:einkommen_monatlich ;
    sh:datatype xsd:decimal ;
    sh:maxInclusive 2000 ;
    sh:message "Monthly income must not exceed 2000 euro" .

ff:wohngeldPlz a sh:PropertyShape ;
    sh:path ff:wohnort_plz ;
    sh:datatype xsd:string ;
    sh:name "Postal code of the place of residence" .
```
"#;

#[test]
fn test_generated_shape_validates_citizen_instances() {
    let dir = tempdir().expect("tempdir");
    let registry =
        Arc::new(FieldRegistry::open(dir.path().join("datafields.yaml")).expect("registry"));
    let summary = registry
        .import_from_shacl(FIELD_DEFINITIONS)
        .expect("import fields");
    assert!(summary.failures.is_empty());
    assert_eq!(summary.imported, vec!["alter", "einkommen_monatlich"]);

    let context = Arc::new(
        GeneratorContext::open(dir.path().join("generator_context.json")).expect("context"),
    );
    let scripted = Arc::new(ScriptedCompletion::new([BROKEN_RESPONSE, REPAIRED_RESPONSE]));
    let generator = ShapeGenerator::new(registry.clone(), context, scripted.clone());

    let id = text_id(LEGAL_TEXT);
    let generated = generator.generate_shape(LEGAL_TEXT, &id).expect("generate");
    assert_eq!(generated.repair_rounds, 1);
    assert_eq!(scripted.calls(), 2);
    assert!(scripted.prompts()[1].user.contains("ff:wohngeld ff:hasMainPersonShape"));

    let new_names: Vec<&str> = generated.new_fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(new_names, vec!["wohnort_plz"]);
    generator
        .register_fields(&generated.new_fields)
        .expect("register");
    assert_eq!(
        registry.get_field("wohnort_plz").map(|f| f.datatype),
        Some(XsdDatatype::String)
    );

    let shapes = ShapeStore::open(dir.path().join("shapes")).expect("shapes");
    shapes
        .add(&id, LEGAL_TEXT, generated.graph.clone(), Some("Wohngeld".into()))
        .expect("store shape");

    let instances =
        InstanceStore::open(dir.path().join("instances"), registry.clone()).expect("instances");
    instances
        .create_instance(
            "Jane Doe",
            [("alter", "34"), ("einkommen_monatlich", "2500"), ("wohnort_plz", "10115")],
        )
        .expect("jane");
    instances
        .create_instance("Max Mustermann", [("alter", "41"), ("einkommen_monatlich", "1450.50")])
        .expect("max");

    let shape = ShapeStore::open(dir.path().join("shapes"))
        .expect("reopen shapes")
        .get(&id)
        .expect("stored shape");
    assert_eq!(shape.description.as_deref(), Some("Wohngeld"));
    let engine = ShaclEngine::new();

    let (conforms, messages) = instances
        .validate_instance("jane_doe", &shape.graph, &engine)
        .expect("validate jane");
    assert!(!conforms);
    assert_eq!(messages, vec!["Monthly income must not exceed 2000 euro".to_string()]);

    let (conforms, messages) = instances
        .validate_instance("max_mustermann", &shape.graph, &engine)
        .expect("validate max");
    assert!(conforms);
    assert!(messages.is_empty());
}

#[test]
fn test_instances_reload_and_revalidate() {
    let dir = tempdir().expect("tempdir");
    let registry =
        Arc::new(FieldRegistry::open(dir.path().join("datafields.yaml")).expect("registry"));
    registry
        .import_from_shacl(FIELD_DEFINITIONS)
        .expect("import fields");

    let store =
        InstanceStore::open(dir.path().join("instances"), registry.clone()).expect("instances");
    store
        .create_instance("Erika Musterfrau", [("alter", "17")])
        .expect("create");
    assert!(store
        .create_instance("Broken", [("alter", "siebzehn")])
        .is_err());

    let reloaded = FieldRegistry::open(dir.path().join("datafields.yaml")).expect("reload registry");
    assert_eq!(reloaded.len(), 2);
    let reopened =
        InstanceStore::open(dir.path().join("instances"), Arc::new(reloaded)).expect("reopen");
    let erika = reopened.get("erika_musterfrau").expect("reloaded instance");
    assert_eq!(erika.properties.get("alter").map(String::as_str), Some("17"));
    assert!(reopened.get("broken").is_none());

    let shape = lexshape_rdf::parse_turtle(
        r#"
@prefix ff: <https://foerderfunke.org/default#> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
ff:adult a sh:NodeShape ;
    sh:targetClass ff:Citizen ;
    sh:property [ sh:path ff:alter ; sh:minInclusive 18 ] .
"#,
    )
    .expect("shape");
    let (conforms, messages) = reopened
        .validate_instance("erika_musterfrau", &shape, &ShaclEngine::new())
        .expect("validate");
    assert!(!conforms);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("greater than or equal to"));
}
