//! The shape generator: prompt, complete, extract, parse, repair, harvest.

use crate::completion::CompletionService;
use crate::harvest::harvest_fields;
use crate::prompt::{
    self, PromptContext, GENERATION_SYSTEM_PROMPT, IMPROVEMENT_SYSTEM_PROMPT,
    REPAIR_SYSTEM_PROMPT, RULES_SYSTEM_PROMPT,
};
use crate::turtle::{extract_turtle_block, normalize_turtle};
use crate::GenerationError;
use lexshape_fields::{DataField, FieldRegistry};
use lexshape_rdf::{parse_turtle, write_turtle, Graph};
use lexshape_store::{ExampleStore, GeneratorContext};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOptions {
    /// Stored examples included in a generation request, first-N order.
    pub max_examples: usize,
    /// Feedback entries included, excluding those for the same text.
    pub max_feedback: usize,
    pub temperature: f32,
    pub repair_temperature: f32,
    /// Repair round trips before a parse failure becomes fatal.
    pub repair_attempts: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            max_examples: 3,
            max_feedback: 5,
            temperature: 0.2,
            repair_temperature: 0.1,
            repair_attempts: 1,
        }
    }
}

/// A parsed shape plus field definitions it introduces.
#[derive(Debug, Clone)]
pub struct GeneratedShape {
    pub graph: Graph,
    /// The Turtle text that parsed into `graph`.
    pub turtle: String,
    /// Not yet registered; see [`ShapeGenerator::register_fields`].
    pub new_fields: Vec<DataField>,
    pub repair_rounds: usize,
}

pub struct ShapeGenerator {
    registry: Arc<FieldRegistry>,
    context: Arc<GeneratorContext>,
    examples: Option<Arc<ExampleStore>>,
    completion: Arc<dyn CompletionService>,
    options: GeneratorOptions,
}

impl ShapeGenerator {
    pub fn new(
        registry: Arc<FieldRegistry>,
        context: Arc<GeneratorContext>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            registry,
            context,
            examples: None,
            completion,
            options: GeneratorOptions::default(),
        }
    }

    pub fn with_examples(mut self, examples: Arc<ExampleStore>) -> Self {
        self.examples = Some(examples);
        self
    }

    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    fn prompt_context(&self, text_id: &str, with_examples: bool) -> PromptContext {
        let examples = match (&self.examples, with_examples) {
            (Some(store), true) => store.first(self.options.max_examples),
            _ => Vec::new(),
        };
        PromptContext {
            field_catalog: Some(self.registry.to_prompt_format()),
            guidelines: self.context.guidelines(),
            examples,
            feedback: self
                .context
                .relevant_feedback(text_id, self.options.max_feedback),
        }
    }

    /// The user prompt [`Self::generate_shape`] would send.
    pub fn generation_prompt(&self, legal_text: &str, text_id: &str) -> String {
        prompt::generation_prompt(legal_text, &self.prompt_context(text_id, true))
    }

    pub fn generate_shape(
        &self,
        legal_text: &str,
        text_id: &str,
    ) -> Result<GeneratedShape, GenerationError> {
        let user = self.generation_prompt(legal_text, text_id);
        tracing::info!(
            text_id,
            backend = %self.completion.describe(),
            prompt_chars = user.len(),
            "generating shape"
        );
        let response =
            self.completion
                .complete(GENERATION_SYSTEM_PROMPT, &user, self.options.temperature)?;
        self.finish(&response)
    }

    /// Revise `shape` to address `feedback`. Recording the feedback in the
    /// generator context is left to the caller.
    pub fn improve_shape(
        &self,
        shape: &Graph,
        feedback: &str,
        text_id: &str,
    ) -> Result<GeneratedShape, GenerationError> {
        let ctx = self.prompt_context(text_id, false);
        let user = prompt::improvement_prompt(&write_turtle(shape), feedback, &ctx);
        tracing::info!(text_id, backend = %self.completion.describe(), "improving shape");
        let response =
            self.completion
                .complete(IMPROVEMENT_SYSTEM_PROMPT, &user, self.options.temperature)?;
        self.finish(&response)
    }

    /// Numbered plain-text eligibility rules found in `legal_text`.
    pub fn extract_rules(&self, legal_text: &str) -> Result<String, GenerationError> {
        let response = self.completion.complete(
            RULES_SYSTEM_PROMPT,
            &prompt::rules_prompt(legal_text),
            self.options.temperature,
        )?;
        Ok(response.trim().to_string())
    }

    /// Insert harvested fields into the registry.
    pub fn register_fields(&self, fields: &[DataField]) -> Result<(), GenerationError> {
        if fields.is_empty() {
            return Ok(());
        }
        self.registry.add_fields(fields.iter().cloned())?;
        tracing::info!(count = fields.len(), "registered generated data fields");
        Ok(())
    }

    fn finish(&self, response: &str) -> Result<GeneratedShape, GenerationError> {
        let mut candidate = normalize_turtle(&extract_turtle_block(response));
        let mut repair_rounds = 0;
        let graph = loop {
            match parse_turtle(&candidate) {
                Ok(graph) => break graph,
                Err(err) if repair_rounds < self.options.repair_attempts => {
                    repair_rounds += 1;
                    tracing::warn!(
                        attempt = repair_rounds,
                        error = %err,
                        "generated Turtle does not parse, requesting a repair"
                    );
                    let fixed = self.completion.complete(
                        REPAIR_SYSTEM_PROMPT,
                        &prompt::repair_prompt(&candidate, &err.to_string()),
                        self.options.repair_temperature,
                    )?;
                    candidate = normalize_turtle(&extract_turtle_block(&fixed));
                }
                Err(err) => {
                    return Err(GenerationError::InvalidTurtle {
                        text: candidate,
                        message: err.to_string(),
                        attempts: repair_rounds,
                    })
                }
            }
        };

        let new_fields = harvest_fields(&graph, &self.registry);
        tracing::info!(
            triples = graph.len(),
            new_fields = new_fields.len(),
            repair_rounds,
            "parsed generated shape"
        );
        Ok(GeneratedShape {
            graph,
            turtle: candidate,
            new_fields,
            repair_rounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ScriptedCompletion;
    use lexshape_fields::XsdDatatype;

    const VALID: &str = "```turtle\n\
        @prefix ff: <https://foerderfunke.org/default#> .\n\
        @prefix sh: <http://www.w3.org/ns/shacl#> .\n\
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n\
        ff:kg a ff:RequirementProfile ; ff:hasMainPersonShape ff:kgMain .\n\
        ff:kgMain a sh:NodeShape ; sh:targetClass ff:Citizen ; sh:property ff:kgAge .\n\
        ff:kgAge a sh:PropertyShape ; sh:path ff:kind_alter ; sh:datatype xsd:integer ; sh:maxExclusive 18 .\n\
        ```";

    fn generator(scripted: Arc<ScriptedCompletion>) -> ShapeGenerator {
        ShapeGenerator::new(
            Arc::new(FieldRegistry::in_memory()),
            Arc::new(GeneratorContext::in_memory()),
            scripted,
        )
    }

    #[test]
    fn generates_and_harvests() {
        let scripted = Arc::new(ScriptedCompletion::new([VALID]));
        let shape = generator(scripted.clone())
            .generate_shape("Kindergeld gibt es für Kinder unter 18.", "t1")
            .expect("generate");
        assert_eq!(shape.repair_rounds, 0);
        assert_eq!(shape.new_fields.len(), 1);
        assert_eq!(shape.new_fields[0].name, "kind_alter");
        assert_eq!(shape.new_fields[0].datatype, XsdDatatype::Integer);

        let prompts = scripted.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].system, GENERATION_SYSTEM_PROMPT);
        assert_eq!(prompts[0].temperature, 0.2);
        assert!(prompts[0].user.contains("Kinder unter 18"));
    }

    #[test]
    fn one_repair_round_then_fatal() {
        let scripted = Arc::new(ScriptedCompletion::new([
            "ff:kg ff:hasMainPersonShape {{ broken",
            "still { not turtle",
        ]));
        let err = generator(scripted.clone())
            .generate_shape("text", "t1")
            .expect_err("two failures");
        match err {
            GenerationError::InvalidTurtle { text, attempts, .. } => {
                assert_eq!(attempts, 1);
                assert!(text.contains("still { not turtle"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        let prompts = scripted.prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[1].system, REPAIR_SYSTEM_PROMPT);
        assert_eq!(prompts[1].temperature, 0.1);
    }

    #[test]
    fn repair_round_recovers() {
        let scripted = Arc::new(ScriptedCompletion::new(["ff:kg ff:hasMainPersonShape {{ broken", VALID]));
        let shape = generator(scripted)
            .generate_shape("text", "t1")
            .expect("repaired");
        assert_eq!(shape.repair_rounds, 1);
        assert!(shape.graph.len() >= 6);
    }

    #[test]
    fn zero_repair_attempts_fail_immediately() {
        let scripted = Arc::new(ScriptedCompletion::new(["{ broken"]));
        let gen = generator(scripted.clone()).with_options(GeneratorOptions {
            repair_attempts: 0,
            ..GeneratorOptions::default()
        });
        assert!(matches!(
            gen.generate_shape("text", "t"),
            Err(GenerationError::InvalidTurtle { attempts: 0, .. })
        ));
        assert_eq!(scripted.calls(), 1);
    }

    #[test]
    fn completion_errors_propagate() {
        let scripted = Arc::new(ScriptedCompletion::new(Vec::<String>::new()));
        assert!(matches!(
            generator(scripted).extract_rules("text"),
            Err(GenerationError::Completion(_))
        ));
    }

    #[test]
    fn improvement_sends_current_shape_and_feedback() {
        let scripted = Arc::new(ScriptedCompletion::new([VALID]));
        let gen = generator(scripted.clone());
        let current = parse_turtle(&extract_turtle_block(VALID)).expect("parse");
        gen.improve_shape(&current, "Use ff:alter instead", "t1")
            .expect("improve");
        let prompt = &scripted.prompts()[0];
        assert_eq!(prompt.system, IMPROVEMENT_SYSTEM_PROMPT);
        assert!(prompt.user.contains("FEEDBACK TO ADDRESS:\nUse ff:alter instead"));
        assert!(prompt.user.contains("kind_alter"));
    }
}
