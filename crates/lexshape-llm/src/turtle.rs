//! Turning free-form model output into parseable Turtle.

use lexshape_rdf::declared_prefixes;
use lexshape_rdf::vocab::{ff, rdf, rdfs, sh, xsd, EX_NS};
use regex::Regex;
use std::sync::OnceLock;

/// Prefixes every generated document is expected to declare.
const REQUIRED_PREFIXES: &[(&str, &str)] = &[
    ("ff", ff::NS),
    ("sh", sh::NS),
    ("rdf", rdf::NS),
    ("rdfs", rdfs::NS),
    ("xsd", xsd::NS),
    ("ex", EX_NS),
];

fn fenced_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[ \t]*(?:turtle|ttl)?[ \t]*\r?\n(.*?)```").ok())
        .as_ref()
}

/// The Turtle candidate in a model response: the first fenced code block,
/// else everything from the first prefix declaration on, else the whole text.
pub fn extract_turtle_block(response: &str) -> String {
    if let Some(caps) = fenced_block().and_then(|re| re.captures(response)) {
        return caps[1].trim().to_string();
    }
    let mut offset = 0;
    for line in response.split_inclusive('\n') {
        let head = line.trim_start();
        if head.starts_with("@prefix")
            || head.get(..7).is_some_and(|kw| kw.eq_ignore_ascii_case("prefix "))
        {
            return response[offset..].trim().to_string();
        }
        offset += line.len();
    }
    response.trim().to_string()
}

/// Minimal repairs before parsing: declare missing required prefixes and
/// terminate statements that end without `.`.
///
/// A line is terminated only when the next significant line starts a new
/// statement at column 0 (or there is none). Comment lines, lines inside
/// long string literals and SPARQL-style directives are left untouched.
pub fn normalize_turtle(text: &str) -> String {
    let declared: Vec<String> = declared_prefixes(text).into_iter().map(|(p, _)| p).collect();
    let mut out: Vec<String> = REQUIRED_PREFIXES
        .iter()
        .filter(|(prefix, _)| !declared.iter().any(|d| d == prefix))
        .map(|(prefix, ns)| format!("@prefix {prefix}: <{ns}> ."))
        .collect();
    if !out.is_empty() {
        out.push(String::new());
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut in_long_string = false;
    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim_end();
        let starts_in_string = in_long_string;
        in_long_string ^= toggles_long_string(line);
        if starts_in_string || in_long_string || !needs_terminator(line) {
            out.push(line.to_string());
            continue;
        }
        let next = lines[i + 1..]
            .iter()
            .map(|l| l.trim_end())
            .find(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'));
        if next.map_or(true, starts_new_statement) {
            out.push(format!("{line} ."));
        } else {
            out.push(line.to_string());
        }
    }
    out.join("\n")
}

fn toggles_long_string(line: &str) -> bool {
    (line.matches("\"\"\"").count() + line.matches("'''").count()) % 2 == 1
}

fn needs_terminator(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return false;
    }
    if is_sparql_directive(trimmed) {
        return false;
    }
    !trimmed.ends_with(['.', ';', ',', '[', '('])
}

fn is_sparql_directive(line: &str) -> bool {
    ["prefix ", "base "].iter().any(|kw| {
        line.get(..kw.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(kw))
    })
}

fn starts_new_statement(line: &str) -> bool {
    !line.starts_with(char::is_whitespace) && !line.starts_with([';', ',', '.', ']', ')'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexshape_rdf::parse_turtle;

    #[test]
    fn prefers_fenced_block() {
        let response = "Here is the shape:\n```turtle\n@prefix ff: <https://foerderfunke.org/default#> .\nff:a ff:b ff:c .\n```\nLet me know.";
        assert_eq!(
            extract_turtle_block(response),
            "@prefix ff: <https://foerderfunke.org/default#> .\nff:a ff:b ff:c ."
        );
        let bare_fence = "```\nff:a ff:b ff:c .\n```";
        assert_eq!(extract_turtle_block(bare_fence), "ff:a ff:b ff:c .");
    }

    #[test]
    fn falls_back_to_first_prefix_line_then_raw() {
        let response = "Sure!\n\n@prefix sh: <http://www.w3.org/ns/shacl#> .\nff:a a sh:NodeShape .";
        assert!(extract_turtle_block(response).starts_with("@prefix sh:"));
        assert_eq!(extract_turtle_block("  ff:a ff:b ff:c .  "), "ff:a ff:b ff:c .");
    }

    #[test]
    fn adds_missing_prefixes_and_terminators() {
        let text = "@prefix ff: <https://foerderfunke.org/default#> .\n\
                    ff:kg a ff:RequirementProfile ;\n    ff:hasMainPersonShape ff:kgShape\n\n\
                    ff:kgShape a sh:NodeShape ;\n    sh:targetClass ff:Citizen";
        let fixed = normalize_turtle(text);
        assert!(fixed.contains("@prefix xsd: <http://www.w3.org/2001/XMLSchema#> ."));
        assert_eq!(fixed.matches("@prefix ff:").count(), 1);
        assert!(fixed.contains("ff:hasMainPersonShape ff:kgShape ."));
        assert!(fixed.ends_with("sh:targetClass ff:Citizen ."));
        let graph = parse_turtle(&fixed).expect("normalized text parses");
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn leaves_valid_multiline_constructs_alone() {
        let text = "@prefix ff: <https://foerderfunke.org/default#> .\n\
                    @prefix sh: <http://www.w3.org/ns/shacl#> .\n\
                    # a comment without dot\n\
                    ff:s sh:in (\n    \"a\"\n    \"b\"\n) ;\n    sh:description \"\"\"first\nsecond\"\"\" ;\n\
                    sh:property [\n        sh:path ff:p\n    ] .";
        let fixed = normalize_turtle(text);
        assert!(fixed.contains("# a comment without dot\n"));
        assert!(fixed.contains("\"\"\"first\nsecond\"\"\" ;"));
        parse_turtle(&fixed).expect("still parses");
    }
}
