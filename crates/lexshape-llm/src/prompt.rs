//! Prompt composition for generation, improvement, repair and rule extraction.

use lexshape_store::{ExampleMapping, FeedbackEntry};

pub const DEFAULT_MAX_LEGAL_TEXT_CHARS: usize = 30_000;

const TRUNCATION_MARKER: &str = "\n\n[Text truncated due to length...]";

pub const GENERATION_SYSTEM_PROMPT: &str = r#"You are a SHACL shape generator that converts legal text requirements into SHACL shapes.
Follow these structural requirements for all shapes:

1. Create a RequirementProfile with a succinct name in the ff namespace that reflects the benefit type
   Example: ff:buergergeld a ff:RequirementProfile ;

2. Create a MainPersonShape with a name that combines the benefit name with 'MainPersonShape'
   Example: ff:buergergeldMainPersonShape a sh:NodeShape, ff:EligibilityConstraint ;

3. Link them using ff:hasMainPersonShape
   Example: ff:buergergeld ff:hasMainPersonShape ff:buergergeldMainPersonShape .

4. Set the MainPersonShape target class
   Example: ff:buergergeldMainPersonShape sh:targetClass ff:Citizen .

5. Give every eligibility condition its own named property shape attached with sh:property.
   Never use anonymous blank nodes for property shapes.
   Example: ff:buergergeldMainPersonShape sh:property ff:buergergeldAgeShape .
            ff:buergergeldAgeShape a sh:PropertyShape ; sh:path ff:alter ; sh:minInclusive 15 .

Complete example structure:
@prefix ff: <https://foerderfunke.org/default#> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

ff:buergergeld a ff:RequirementProfile ;
    ff:hasMainPersonShape ff:buergergeldMainPersonShape .

ff:buergergeldMainPersonShape a sh:NodeShape, ff:EligibilityConstraint ;
    sh:targetClass ff:Citizen ;
    sh:property ff:buergergeldAgeShape .

ff:buergergeldAgeShape a sh:PropertyShape ;
    sh:path ff:alter ;
    sh:datatype xsd:integer ;
    sh:minCount 1 ;
    sh:minInclusive 15 .

Additional guidelines:
- Use meaningful IDs for shapes and properties
- Add rdfs:label and rdfs:comment where appropriate
- Use existing vocabulary terms when possible
- Follow SHACL best practices for constraint definitions
- Stay within SHACL Core: no sh:sparql, no SPARQL-based constraints

Analyze the legal text and create appropriate SHACL property shapes within the MainPersonShape.
Use a succinct, lowercase name for the benefit type in the ff namespace.
"#;

pub const IMPROVEMENT_SYSTEM_PROMPT: &str =
    "You are a specialized AI that improves SHACL shapes based on feedback. Output only valid Turtle syntax.";

pub const REPAIR_SYSTEM_PROMPT: &str =
    "You are a Turtle/SHACL syntax expert. Fix the syntax issues in the provided Turtle content.";

pub const RULES_SYSTEM_PROMPT: &str = "You are a legal analyst who extracts eligibility rules for social benefits from legal texts. Answer with a numbered plain-text list only.";

/// Context shared by generation and improvement requests.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    /// Output of [`lexshape_fields::FieldRegistry::to_prompt_format`].
    pub field_catalog: Option<String>,
    pub guidelines: Vec<String>,
    pub examples: Vec<ExampleMapping>,
    pub feedback: Vec<FeedbackEntry>,
}

/// User prompt asking for a new shape from `legal_text`.
pub fn generation_prompt(legal_text: &str, ctx: &PromptContext) -> String {
    let mut prompt: Vec<String> = [
        "You are a specialized AI that converts legal texts about social benefits into SHACL shapes.",
        "SHACL shapes formally describe the requirements that must be met for a person to be eligible for the benefit.",
        "\nYour task is to create a SHACL shape that captures all requirements from the following legal text.",
        "\nLEGAL TEXT:",
        legal_text,
        "\nGUIDELINES:",
        "1. Use sh:NodeShape to define the main shape for the person/applicant",
        "2. Use meaningful property paths that reflect the requirement's nature",
        "3. Include appropriate cardinality constraints (sh:minCount, sh:maxCount)",
        "4. Use sh:datatype for data type constraints",
        "5. Use sh:pattern for string patterns when applicable",
        "6. Add sh:description to explain each constraint in plain language",
        "\nIMPORTANT OUTPUT FORMAT RULES:",
        "1. Start with ALL necessary prefix declarations (@prefix)",
        "2. ALWAYS include these prefixes:",
        "   @prefix ff: <https://foerderfunke.org/default#> .",
        "   @prefix sh: <http://www.w3.org/ns/shacl#> .",
        "   @prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .",
        "   @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .",
        "   @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .",
        "3. Use proper Turtle syntax with dots (.) after each statement",
        "4. End each prefix declaration with a dot (.)",
        "5. Use semicolons (;) for multiple properties of the same subject",
        "6. Output ONLY the Turtle syntax, no explanations or markdown",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    push_catalog(&mut prompt, ctx, "When defining properties");
    push_guidelines(&mut prompt, ctx);

    if !ctx.examples.is_empty() {
        prompt.push("\nEXAMPLE MAPPINGS:".to_string());
        for example in &ctx.examples {
            prompt.push("\nInput text:".to_string());
            prompt.push(example.legal_text.clone());
            prompt.push("\nSHACL shape:".to_string());
            prompt.push(example.shape_turtle());
            prompt.push("\nAnnotations:".to_string());
            prompt.push(match &example.annotations {
                Some(notes) if !notes.is_empty() => notes
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => "None provided".to_string(),
            });
        }
    }

    push_feedback(&mut prompt, ctx, "\nRELEVANT FEEDBACK FROM PREVIOUS GENERATIONS:");
    prompt.join("\n")
}

/// User prompt asking to revise `current_shape` (Turtle) to address `feedback`.
pub fn improvement_prompt(current_shape: &str, feedback: &str, ctx: &PromptContext) -> String {
    let mut prompt: Vec<String> = [
        "You are a specialized AI that improves SHACL shapes based on feedback.",
        "Your task is to modify the following SHACL shape according to the provided feedback.",
        "\nCURRENT SHAPE:",
        current_shape,
        "\nFEEDBACK TO ADDRESS:",
        feedback,
        "\nGUIDELINES:",
        "1. Preserve the existing structure where possible",
        "2. Only make changes that address the feedback",
        "3. Ensure the output remains valid Turtle syntax",
        "4. Add comments to explain significant changes",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    push_catalog(&mut prompt, ctx, "When modifying properties");
    push_guidelines(&mut prompt, ctx);
    push_feedback(&mut prompt, ctx, "\nPREVIOUS FEEDBACK AND IMPROVEMENTS:");
    prompt.join("\n")
}

/// Second-chance request after `invalid` failed to parse with `error`.
pub fn repair_prompt(invalid: &str, error: &str) -> String {
    format!(
        "The following Turtle syntax is invalid. Please fix it to be valid Turtle/SHACL:\n\n\
         {invalid}\n\n\
         Parser error: {error}\n\n\
         Output only the fixed Turtle syntax, no explanations."
    )
}

pub fn rules_prompt(legal_text: &str) -> String {
    format!(
        "Extract every eligibility rule from the following legal text.\n\
         Write one rule per line as a numbered list. Each rule names the attribute of the \
         applicant it concerns, the condition, and any threshold or allowed values.\n\
         Do not add rules that are not stated in the text.\n\n\
         LEGAL TEXT:\n{legal_text}"
    )
}

fn push_catalog(prompt: &mut Vec<String>, ctx: &PromptContext, lead: &str) {
    if let Some(catalog) = &ctx.field_catalog {
        prompt.push("\nEXISTING DATA FIELDS:".to_string());
        prompt.push(format!(
            "{lead}, first check if there's a matching field below."
        ));
        prompt.push(
            "Only create new property paths if no existing field matches the requirement."
                .to_string(),
        );
        prompt.push(catalog.clone());
    }
}

fn push_guidelines(prompt: &mut Vec<String>, ctx: &PromptContext) {
    if !ctx.guidelines.is_empty() {
        prompt.push("\nADDITIONAL GUIDELINES:".to_string());
        prompt.extend(ctx.guidelines.iter().map(|g| format!("- {g}")));
    }
}

fn push_feedback(prompt: &mut Vec<String>, ctx: &PromptContext, heading: &str) {
    if !ctx.feedback.is_empty() {
        prompt.push(heading.to_string());
        for entry in &ctx.feedback {
            prompt.push(format!("\nFeedback: {}", entry.feedback));
            prompt.push(format!("Improved shape: {}", entry.improved_shape));
        }
    }
}

/// Cut `text` to at most `max_chars` characters, preferring a paragraph
/// break, then a line break, then a sentence end, and append a marker.
pub fn truncate_legal_text(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };
    let head = &text[..cut];
    let end = head
        .rfind("\n\n")
        .or_else(|| head.rfind('\n'))
        .or_else(|| head.rfind(". "))
        .unwrap_or(head.len());
    format!("{}{TRUNCATION_MARKER}", &head[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexshape_rdf::parse_turtle;
    use std::collections::BTreeMap;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_legal_text("§ 1 Anspruch.", 100), "§ 1 Anspruch.");
        let exact = "x".repeat(10);
        assert_eq!(truncate_legal_text(&exact, 10), exact);
    }

    #[test]
    fn truncation_prefers_paragraph_then_line_then_sentence() {
        let text = "§ 1 first paragraph.\n\n§ 2 second\nline two of it. and more words";
        let cut = truncate_legal_text(text, 40);
        assert_eq!(cut, "§ 1 first paragraph.\n\n[Text truncated due to length...]");

        let lines = "line one\nline two\nline three";
        assert_eq!(
            truncate_legal_text(lines, 20),
            "line one\nline two\n\n[Text truncated due to length...]"
        );

        let sentences = "One sentence. Two sentence. Three";
        assert_eq!(
            truncate_legal_text(sentences, 30),
            "One sentence. Two sentence\n\n[Text truncated due to length...]"
        );

        let unbroken = "abcdefghij";
        assert_eq!(
            truncate_legal_text(unbroken, 4),
            "abcd\n\n[Text truncated due to length...]"
        );
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "ääääää";
        assert_eq!(
            truncate_legal_text(text, 3),
            "äää\n\n[Text truncated due to length...]"
        );
    }

    #[test]
    fn generation_prompt_sections() {
        let shape = parse_turtle(
            "@prefix ff: <https://foerderfunke.org/default#> .\nff:kg ff:hasMainPersonShape ff:kgShape .",
        )
        .expect("shape");
        let mut annotations = BTreeMap::new();
        annotations.insert("alter".to_string(), "Kind unter 18".to_string());
        let ctx = PromptContext {
            field_catalog: Some("Available data fields:\n\nField: alter".into()),
            guidelines: vec!["Prefer ff:alter for ages".into()],
            examples: vec![ExampleMapping {
                name: "kindergeld".into(),
                legal_text: "Kindergeld für Kinder unter 18".into(),
                shape,
                annotations: Some(annotations),
            }],
            feedback: vec![FeedbackEntry {
                text_id: "t0".into(),
                feedback: "use xsd:decimal for income".into(),
                improved_shape: "ff:x ff:y ff:z .".into(),
            }],
        };
        let prompt = generation_prompt("Wer 18 Jahre alt ist ...", &ctx);
        let order = [
            "LEGAL TEXT:\nWer 18 Jahre alt ist ...",
            "EXISTING DATA FIELDS:",
            "Field: alter",
            "ADDITIONAL GUIDELINES:\n- Prefer ff:alter for ages",
            "EXAMPLE MAPPINGS:",
            "Annotations:\nalter: Kind unter 18",
            "RELEVANT FEEDBACK FROM PREVIOUS GENERATIONS:",
            "Feedback: use xsd:decimal for income",
        ];
        let mut from = 0;
        for needle in order {
            let at = prompt[from..]
                .find(needle)
                .unwrap_or_else(|| panic!("missing or out of order: {needle}"));
            from += at;
        }
    }

    #[test]
    fn optional_sections_are_omitted() {
        let prompt = generation_prompt("text", &PromptContext::default());
        assert!(!prompt.contains("EXISTING DATA FIELDS"));
        assert!(!prompt.contains("EXAMPLE MAPPINGS"));
        assert!(!prompt.contains("RELEVANT FEEDBACK"));

        let example = ExampleMapping {
            name: "e".into(),
            legal_text: "t".into(),
            shape: lexshape_rdf::Graph::new(),
            annotations: None,
        };
        let ctx = PromptContext {
            examples: vec![example],
            ..PromptContext::default()
        };
        assert!(generation_prompt("text", &ctx).contains("Annotations:\nNone provided"));
    }

    #[test]
    fn improvement_and_repair_prompts() {
        let prompt = improvement_prompt("ff:a ff:b ff:c .", "add an income limit", &PromptContext::default());
        assert!(prompt.contains("CURRENT SHAPE:\nff:a ff:b ff:c ."));
        assert!(prompt.contains("FEEDBACK TO ADDRESS:\nadd an income limit"));

        let repair = repair_prompt("ff:a ff:b", "expected '.'");
        assert!(repair.starts_with("The following Turtle syntax is invalid."));
        assert!(repair.contains("ff:a ff:b"));
        assert!(repair.contains("expected '.'"));
        assert!(GENERATION_SYSTEM_PROMPT.contains(lexshape_rdf::vocab::ff::NS));
    }
}
