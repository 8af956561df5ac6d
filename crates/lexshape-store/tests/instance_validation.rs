//! Instance validation against stored shapes through the built-in engine.

use lexshape_fields::{DataField, FieldRegistry, XsdDatatype};
use lexshape_rdf::parse_turtle;
use lexshape_store::{text_id, InstanceStore, ShapeStore, StoreError};
use lexshape_validate::ShaclEngine;
use std::sync::Arc;
use tempfile::tempdir;

const UNRELATED_SHAPE: &str = r#"
@prefix ff: <https://foerderfunke.org/default#> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
ff:wohngeld a ff:RequirementProfile ; ff:hasMainPersonShape ff:wohngeldMainPersonShape .
ff:wohngeldMainPersonShape a sh:NodeShape ;
    sh:targetClass ff:Citizen .
"#;

const REQUIRES_INCOME: &str = r#"
@prefix ff: <https://foerderfunke.org/default#> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
ff:wohngeld a ff:RequirementProfile ; ff:hasMainPersonShape ff:wohngeldMainPersonShape .
ff:wohngeldMainPersonShape a sh:NodeShape ;
    sh:targetClass ff:Citizen ;
    sh:property ff:incomeRequired .
ff:incomeRequired a sh:PropertyShape ;
    sh:path ff:einkommen_monatlich ;
    sh:minCount 1 ;
    sh:datatype xsd:decimal .
"#;

fn registry() -> Arc<FieldRegistry> {
    let registry = FieldRegistry::in_memory();
    registry
        .add_fields([
            DataField::new("alter", "ff:alter", XsdDatatype::Integer, "Age in years"),
            DataField::new(
                "einkommen_monatlich",
                "ff:einkommen_monatlich",
                XsdDatatype::Decimal,
                "Monthly income in euro",
            ),
            DataField::new("rente", "ff:rente", XsdDatatype::Decimal, "Monthly pension in euro"),
            DataField::new("kinder", "ff:kinder", XsdDatatype::Integer, "Number of children"),
        ])
        .expect("add");
    Arc::new(registry)
}

#[test]
fn conformant_instance_has_no_messages() {
    let dir = tempdir().expect("tempdir");
    let instances = InstanceStore::open(dir.path().join("instances"), registry()).expect("open");
    instances
        .create_instance("Max Mustermann", [("alter", "34")])
        .expect("create");

    let shape = parse_turtle(UNRELATED_SHAPE).expect("shape");
    let (conforms, messages) = instances
        .validate_instance("max_mustermann", &shape, &ShaclEngine::new())
        .expect("validate");
    assert!(conforms);
    assert!(messages.is_empty());
}

#[test]
fn missing_required_property_is_reported() {
    let dir = tempdir().expect("tempdir");
    let shapes = ShapeStore::open(dir.path().join("shapes")).expect("shapes");
    let legal_text = "Wohngeld erhält, wer ein monatliches Einkommen nachweist.";
    let id = text_id(legal_text);
    shapes
        .add(&id, legal_text, parse_turtle(REQUIRES_INCOME).expect("shape"), None)
        .expect("store shape");

    let instances = InstanceStore::open(dir.path().join("instances"), registry()).expect("open");
    instances
        .create_instance("erika", [("alter", "41")])
        .expect("create");

    let stored = shapes.get(&id).expect("stored shape");
    let (conforms, messages) = instances
        .validate_instance("erika", &stored.graph, &ShaclEngine::new())
        .expect("validate");
    assert!(!conforms);
    assert!(!messages.is_empty());
    assert!(messages.iter().all(|m| !m.is_empty()));
}

const INCOME_OR_PENSION_WITH_CHILDREN: &str = r#"
@prefix ff: <https://foerderfunke.org/default#> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
ff:kinderzuschlagMainPersonShape a sh:NodeShape ;
    sh:targetClass ff:Citizen ;
    sh:or ( [ sh:path ff:einkommen_monatlich ; sh:minCount 1 ]
            [ sh:path ff:rente ; sh:minCount 1 ] ) ;
    sh:node ff:hasChildren ;
    sh:property ff:notSeventeen .
ff:hasChildren sh:property [ sh:path ff:kinder ; sh:minCount 1 ] .
ff:notSeventeen a sh:PropertyShape ;
    sh:path ff:alter ;
    sh:not [ sh:hasValue 17 ] .
"#;

#[test]
fn combined_shape_constraints_reach_instance_messages() {
    let dir = tempdir().expect("tempdir");
    let instances = InstanceStore::open(dir.path(), registry()).expect("open");
    instances
        .create_instance("Max", [("alter", "17")])
        .expect("create max");
    instances
        .create_instance("Erika", [("alter", "40"), ("rente", "900"), ("kinder", "2")])
        .expect("create erika");
    let shape = parse_turtle(INCOME_OR_PENSION_WITH_CHILDREN).expect("shape");
    let engine = ShaclEngine::new();

    let (conforms, messages) = instances
        .validate_instance("max", &shape, &engine)
        .expect("validate max");
    assert!(!conforms);
    assert_eq!(messages.len(), 3, "{messages:?}");

    let (conforms, messages) = instances
        .validate_instance("erika", &shape, &engine)
        .expect("validate erika");
    assert!(conforms, "{messages:?}");
}

#[test]
fn shapes_outside_the_supported_subset_are_an_error() {
    let dir = tempdir().expect("tempdir");
    let instances = InstanceStore::open(dir.path(), registry()).expect("open");
    instances
        .create_instance("Max", [("alter", "17")])
        .expect("create");
    let shape = parse_turtle(
        r#"
@prefix ff: <https://foerderfunke.org/default#> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
ff:s sh:targetClass ff:Citizen ; sh:sparql [ sh:select "SELECT $this WHERE { }" ] .
"#,
    )
    .expect("shape");
    let err = instances
        .validate_instance("max", &shape, &ShaclEngine::new())
        .expect_err("unsupported");
    assert!(matches!(err, StoreError::Validator(_)));
}

#[test]
fn special_decimal_spellings_are_rejected_on_creation() {
    let dir = tempdir().expect("tempdir");
    let instances = InstanceStore::open(dir.path(), registry()).expect("open");
    for bad in ["NaN", "inf", "Infinity", "1e3"] {
        assert!(
            instances
                .create_instance("x", [("einkommen_monatlich", bad)])
                .is_err(),
            "{bad} accepted"
        );
    }
    instances
        .create_instance("ok", [("einkommen_monatlich", "1450.50")])
        .expect("create");
    let (conforms, messages) = instances
        .validate_instance("ok", &parse_turtle(REQUIRES_INCOME).expect("shape"), &ShaclEngine::new())
        .expect("validate");
    assert!(conforms, "{messages:?}");
}

#[test]
fn unknown_instance_is_a_lookup_error() {
    let dir = tempdir().expect("tempdir");
    let instances = InstanceStore::open(dir.path(), registry()).expect("open");
    let shape = parse_turtle(UNRELATED_SHAPE).expect("shape");
    let err = instances
        .validate_instance("ghost", &shape, &ShaclEngine::new())
        .expect_err("unknown");
    assert!(matches!(err, StoreError::UnknownInstance(_)));
}
