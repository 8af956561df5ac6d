//! Validation reports: in-memory results, the SHACL report graph and its text form.

use crate::compile::Severity;
use lexshape_rdf::vocab::{rdf, sh, xsd};
use lexshape_rdf::{Graph, RdfLiteral, RdfNode, RdfTerm};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// No Violation-level results.
    pub conforms: bool,
    pub results: Vec<ValidationResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub focus_node: RdfTerm,
    /// Predicate of the property shape, if any.
    pub result_path: Option<String>,
    pub source_shape: RdfNode,
    /// Constraint component IRI.
    pub source_constraint: String,
    pub severity: Severity,
    pub message: String,
    pub value: Option<RdfTerm>,
}

impl ValidationReport {
    pub fn conforming() -> Self {
        Self {
            conforms: true,
            results: Vec::new(),
        }
    }

    pub fn from_results(results: Vec<ValidationResult>) -> Self {
        let conforms = results.iter().all(|r| r.severity != Severity::Violation);
        Self { conforms, results }
    }

    pub fn violation_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.severity == Severity::Violation)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.severity == Severity::Warning)
            .count()
    }

    pub fn messages(&self) -> Vec<String> {
        self.results.iter().map(|r| r.message.clone()).collect()
    }

    /// Render as a `sh:ValidationReport` graph.
    pub fn to_graph(&self) -> Graph {
        let mut graph = Graph::new();
        graph.bind_prefix("sh", sh::NS);
        graph.bind_prefix("xsd", xsd::NS);
        let report = RdfNode::blank("report");
        graph.add(report.clone(), rdf::TYPE, RdfTerm::iri(sh::VALIDATION_REPORT));
        graph.add(
            report.clone(),
            sh::CONFORMS,
            RdfLiteral::typed(self.conforms.to_string(), xsd::BOOLEAN),
        );
        for (i, result) in self.results.iter().enumerate() {
            let node = RdfNode::blank(format!("result{i}"));
            graph.add(report.clone(), sh::RESULT, node.clone());
            graph.add(node.clone(), rdf::TYPE, RdfTerm::iri(sh::VALIDATION_RESULT));
            graph.add(node.clone(), sh::FOCUS_NODE, result.focus_node.clone());
            if let Some(path) = &result.result_path {
                graph.add(node.clone(), sh::RESULT_PATH, RdfTerm::iri(path.clone()));
            }
            if let Some(value) = &result.value {
                graph.add(node.clone(), sh::VALUE, value.clone());
            }
            graph.add(node.clone(), sh::SOURCE_SHAPE, result.source_shape.clone());
            graph.add(
                node.clone(),
                sh::SOURCE_CONSTRAINT_COMPONENT,
                RdfTerm::iri(result.source_constraint.clone()),
            );
            graph.add(
                node.clone(),
                sh::RESULT_SEVERITY,
                RdfTerm::iri(result.severity.iri()),
            );
            graph.add(
                node,
                sh::RESULT_MESSAGE,
                RdfLiteral::plain(result.message.clone()),
            );
        }
        graph
    }

    /// Plain-text rendering in the usual SHACL engine layout.
    pub fn to_text(&self) -> String {
        let mut out = String::from("Validation Report\n");
        let conforms = if self.conforms { "True" } else { "False" };
        let _ = writeln!(out, "Conforms: {conforms}");
        if self.results.is_empty() {
            return out;
        }
        let _ = writeln!(out, "Results ({}):", self.results.len());
        for result in &self.results {
            let component = lexshape_rdf::vocab::local_name(&result.source_constraint);
            let kind = match result.severity {
                Severity::Violation => "Constraint Violation",
                Severity::Warning => "Constraint Warning",
                Severity::Info => "Constraint Info",
            };
            let _ = writeln!(
                out,
                "{kind} in {component} ({}):",
                result.source_constraint
            );
            let _ = writeln!(
                out,
                "\tSeverity: sh:{}",
                lexshape_rdf::vocab::local_name(result.severity.iri())
            );
            let _ = writeln!(out, "\tSource Shape: {}", result.source_shape);
            let _ = writeln!(out, "\tFocus Node: {}", result.focus_node);
            if let Some(value) = &result.value {
                let _ = writeln!(out, "\tValue Node: {value}");
            }
            if let Some(path) = &result.result_path {
                let _ = writeln!(out, "\tResult Path: <{path}>");
            }
            let _ = writeln!(out, "\tMessage: {}", result.message);
        }
        out
    }
}

/// `sh:resultMessage` texts of every `sh:ValidationResult` in a report graph,
/// in graph order.
pub fn messages_from_report(report: &Graph) -> Vec<String> {
    report
        .subjects_of_type(sh::VALIDATION_RESULT)
        .iter()
        .flat_map(|result| {
            report
                .literals(result, sh::RESULT_MESSAGE)
                .map(|l| l.lexical.clone())
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(message: &str, severity: Severity) -> ValidationResult {
        ValidationResult {
            focus_node: RdfTerm::iri("http://example.org/alice"),
            result_path: Some("http://example.org/age".into()),
            source_shape: RdfNode::blank("s0"),
            source_constraint: format!("{}MinCountConstraintComponent", sh::NS),
            severity,
            message: message.into(),
            value: None,
        }
    }

    #[test]
    fn warnings_do_not_break_conformance() {
        let report = ValidationReport::from_results(vec![result("w", Severity::Warning)]);
        assert!(report.conforms);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.violation_count(), 0);
    }

    #[test]
    fn report_graph_round_trips_messages() {
        let report = ValidationReport::from_results(vec![
            result("first", Severity::Violation),
            result("second", Severity::Violation),
        ]);
        let graph = report.to_graph();
        let mut messages = messages_from_report(&graph);
        messages.sort();
        assert_eq!(messages, vec!["first".to_string(), "second".to_string()]);
        let conforms = graph
            .literal(&RdfNode::blank("report"), sh::CONFORMS)
            .expect("conforms");
        assert_eq!(conforms.lexical, "false");
        assert_eq!(conforms.datatype.as_deref(), Some(xsd::BOOLEAN));
    }

    #[test]
    fn text_lists_each_result() {
        let report = ValidationReport::from_results(vec![result("Missing age", Severity::Violation)]);
        let text = report.to_text();
        assert!(text.contains("Conforms: False"));
        assert!(text.contains("Constraint Violation in MinCountConstraintComponent"));
        assert!(text.contains("\tMessage: Missing age"));
        assert!(ValidationReport::conforming().to_text().contains("Conforms: True"));
    }
}
