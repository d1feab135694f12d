//! Prompt assembly and output cleanup.
//!
//! The assembler turns a [`Selection`] into a generation request, sends it
//! to the configured [`Generator`], and strips the labels and preambles
//! models like to prepend. Generation failure never propagates from
//! stimulus generation: the caller gets [`fallback_scenario`] instead.
//!
//! [`PromptAssembler::answer`] is the one exception. It answers a question
//! over numbered context items and reports generation errors as-is.

use tracing::{info, warn};

use crate::config::{Config, PromptConfig};
use crate::error::GenerationError;
use crate::generation::{create_generator, DisabledGenerator, Generator};
use crate::models::{truncate_chars, ContextItem};
use crate::selector::Selection;

/// Asked when the question generator fails.
pub const FALLBACK_QUESTION: &str =
    "What assumptions might be driving the different positions you see here?";

const PREAMBLES: &[&str] = &["here's", "okay", "here is"];

/// Characters of each context item quoted in an answer prompt.
pub const ANSWER_SNIPPET_CHARS: usize = 500;

pub struct PromptAssembler {
    generator: Box<dyn Generator>,
    question_generator: Box<dyn Generator>,
    config: PromptConfig,
}

impl PromptAssembler {
    pub fn new(
        generator: Box<dyn Generator>,
        question_generator: Box<dyn Generator>,
        config: PromptConfig,
    ) -> Self {
        Self {
            generator,
            question_generator,
            config,
        }
    }

    /// Build both generators from `[generation]`. A generator that cannot
    /// be constructed (typically a missing API key) is replaced by
    /// [`DisabledGenerator`], so every stimulus falls back.
    pub fn from_config(config: &Config) -> Self {
        let generation = &config.generation;
        Self::new(
            generator_or_disabled(create_generator(generation, generation.temperature)),
            generator_or_disabled(create_generator(
                generation,
                generation.question_temperature,
            )),
            config.prompt.clone(),
        )
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// The generation request for `topic`.
    pub fn build_prompt(&self, topic: &str, selection: &Selection) -> String {
        let context = if selection.used_real_world_context {
            let snippets: Vec<String> = selection
                .relevant
                .iter()
                .take(self.config.context_snippets)
                .map(|item| {
                    format!(
                        "{}: {}",
                        item.source().label(),
                        truncate_chars(&item.text, self.config.snippet_chars)
                    )
                })
                .collect();
            if snippets.is_empty() {
                format!("Contemporary {} considerations", topic)
            } else {
                snippets.join("\n")
            }
        } else {
            format!("Current policy and ethical considerations around {}", topic)
        };

        format!(
            "Write a realistic policy/ethical scenario about {topic}.

CONTEXT: {context}

Create a coherent scenario (180-220 words) featuring:
- One specific organization making a decision about {topic}
- Clear stakeholders with different positions
- Realistic details (costs, timeframes, names)
- A focused ethical/policy dilemma

Requirements:
- Stay focused on the main topic: {topic}
- Write like a news report - factual and neutral
- No commentary or questions
- Start directly with the scenario"
        )
    }

    /// Generate and clean a stimulus. Never fails.
    pub async fn build_and_clean(&self, topic: &str, selection: &Selection) -> String {
        let prompt = self.build_prompt(topic, selection);
        match self.generator.generate(&prompt).await {
            Ok(raw) => {
                let cleaned = clean_output(&raw);
                if cleaned.is_empty() {
                    warn!(topic, "generation returned no content, using fallback scenario");
                    return fallback_scenario(topic);
                }
                info!(
                    topic,
                    model = self.generator.model_name(),
                    real_world = selection.used_real_world_context,
                    "stimulus generated"
                );
                cleaned
            }
            Err(e) => {
                warn!(topic, error = %e, "stimulus generation failed, using fallback scenario");
                fallback_scenario(topic)
            }
        }
    }

    /// One Socratic question about `stimulus`. Never fails.
    pub async fn opening_question(&self, stimulus: &str) -> String {
        let prompt = format!(
            "Write one Socratic question about this scenario:

{stimulus}

Write only a single question sentence that encourages critical thinking about assumptions, reasoning, or trade-offs. No extra text."
        );
        match self.question_generator.generate(&prompt).await {
            Ok(raw) => {
                let question = clean_question(&raw);
                if question.is_empty() {
                    FALLBACK_QUESTION.to_string()
                } else {
                    question
                }
            }
            Err(e) => {
                warn!(error = %e, "question generation failed, using fallback question");
                FALLBACK_QUESTION.to_string()
            }
        }
    }

    /// `stimulus`, a blank line, then its opening question.
    pub async fn with_question(&self, stimulus: &str) -> String {
        let question = self.opening_question(stimulus).await;
        format!("{}\n\n{}", stimulus, question)
    }

    /// Answer `question` from `items`, which the prompt numbers `[1]`,
    /// `[2]`, ... for citation.
    pub async fn answer(
        &self,
        question: &str,
        items: &[ContextItem],
    ) -> Result<String, GenerationError> {
        let prompt = answer_prompt(question, items);
        let answer = self.generator.generate(&prompt).await?;
        info!(
            model = self.generator.model_name(),
            context_items = items.len(),
            "question answered"
        );
        Ok(answer.trim().to_string())
    }
}

/// The cited question-answering request.
///
/// Each item becomes `[n] {source} - {title}: {text}` with the text cut to
/// [`ANSWER_SNIPPET_CHARS`].
pub fn answer_prompt(question: &str, items: &[ContextItem]) -> String {
    let context = if items.is_empty() {
        "No relevant documents found.".to_string()
    } else {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                format!(
                    "[{}] {} - {}: {}",
                    i + 1,
                    item.source().label(),
                    item.metadata.title,
                    truncate_chars(&item.text, ANSWER_SNIPPET_CHARS)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        "Based on the following context, provide a comprehensive answer to the question.
Include citations to the sources where relevant.

CONTEXT:
{context}

QUESTION: {question}

ANSWER:"
    )
}

fn generator_or_disabled(result: anyhow::Result<Box<dyn Generator>>) -> Box<dyn Generator> {
    match result {
        Ok(g) => g,
        Err(e) => {
            warn!(error = %e, "generation disabled");
            Box::new(DisabledGenerator)
        }
    }
}

/// Strip a leading `SCENARIO:` label and a conversational first line.
pub fn clean_output(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(label) = text.get(..9) {
        if label.eq_ignore_ascii_case("scenario:") {
            text = text[9..].trim();
        }
    }

    let lower = text.to_lowercase();
    if PREAMBLES.iter().any(|p| lower.starts_with(p)) {
        if let Some((_, rest)) = text.split_once('\n') {
            text = rest;
        }
    }

    text.trim().to_string()
}

fn clean_question(raw: &str) -> String {
    let question = raw.replace("Question:", "").replace("QUESTION:", "");
    let question = question.trim();
    let question = match question
        .strip_prefix('"')
        .and_then(|q| q.strip_suffix('"'))
    {
        Some(inner) => inner.trim(),
        None => question,
    };
    question.to_string()
}

/// The canned scenario used when generation fails.
///
/// Only the concept line varies: it names the first word of `topic`
/// (capitalized), or "Technology" for an empty topic.
pub fn fallback_scenario(topic: &str) -> String {
    let concept = topic.split_whitespace().next().unwrap_or("technology");
    let mut chars = concept.chars();
    let concept = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };

    format!(
        "The Smart City Surveillance Dilemma ({concept} in Practice)

GreenVale City Council has approved a £15 million smart city project that would install 2,000 AI-powered cameras throughout the town. The system, developed by SecureWatch Technologies, promises to reduce crime by 40% through facial recognition and behaviour analysis.

Councillor Sarah Martinez argues the technology will make streets safer for families and help police respond faster to incidents. The cameras can detect fights, identify wanted criminals, and even spot people in distress. \"We have a duty to protect our residents,\" she says, pointing to recent muggings in the town centre.

However, local privacy group Citizens for Digital Rights calls it \"mass surveillance dressed up as safety.\" They worry the system will track innocent people's daily movements and could discriminate against minorities. Shop owner David Chen supports the cameras but questions the £300,000 annual operating costs when the town library faces closure due to budget cuts.

The technology company insists their AI is unbiased and data will be anonymised after 30 days, but critics note the firm was recently fined for data breaches in two other cities. Meanwhile, residents are split - older residents generally support enhanced security, while younger people worry about privacy erosion."
    )
}
