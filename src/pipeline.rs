//! End-to-end stimulus generation.
//!
//! ```text
//! topic ──▶ ContextSelector ──▶ Selection ──▶ PromptAssembler ──▶ stimulus
//!            (router + store)                 (generator)
//! ```
//!
//! The only error [`StimulusPipeline::run`] can return is
//! [`PipelineError::EmptyTopic`]; every runtime failure below this layer
//! has a degraded substitute. [`StimulusPipeline::answer`] reuses the same
//! context selection and also reports generation failures.

use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::error::PipelineError;
use crate::models::{ContextItem, ContextTier};
use crate::prompt::PromptAssembler;
use crate::selector::ContextSelector;

/// Everything a caller needs to render or audit one stimulus.
#[derive(Debug, Clone, Serialize)]
pub struct StimulusReport {
    pub topic: String,
    pub tier: ContextTier,
    pub used_real_world_context: bool,
    pub candidates: Vec<ContextItem>,
    pub relevant: Vec<ContextItem>,
    pub stimulus: String,
}

/// A cited answer and the context items its `[n]` markers refer to.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerReport {
    pub question: String,
    pub tier: ContextTier,
    /// In citation order: `[1]` is the first item.
    pub sources: Vec<ContextItem>,
    pub answer: String,
}

pub struct StimulusPipeline {
    selector: ContextSelector,
    assembler: PromptAssembler,
}

impl StimulusPipeline {
    pub fn new(selector: ContextSelector, assembler: PromptAssembler) -> Self {
        Self {
            selector,
            assembler,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ContextSelector::from_config(config),
            PromptAssembler::from_config(config),
        )
    }

    pub fn selector(&self) -> &ContextSelector {
        &self.selector
    }

    pub fn assembler(&self) -> &PromptAssembler {
        &self.assembler
    }

    /// Select context for `topic` and generate a stimulus, optionally
    /// followed by an opening question.
    pub async fn run(&self, topic: &str, with_question: bool) -> Result<StimulusReport, PipelineError> {
        let selection = self.selector.select(topic).await?;

        let mut stimulus = self
            .assembler
            .build_and_clean(&selection.topic, &selection)
            .await;
        if with_question {
            stimulus = self.assembler.with_question(&stimulus).await;
        }

        info!(
            topic = %selection.topic,
            tier = %selection.tier,
            chars = stimulus.chars().count(),
            "stimulus ready"
        );

        Ok(StimulusReport {
            topic: selection.topic,
            tier: selection.tier,
            used_real_world_context: selection.used_real_world_context,
            candidates: selection.candidates,
            relevant: selection.relevant,
            stimulus,
        })
    }

    /// Select context for `question` and answer it with citations.
    pub async fn answer(&self, question: &str) -> Result<AnswerReport, PipelineError> {
        let selection = self.selector.select(question).await?;
        let answer = self
            .assembler
            .answer(&selection.topic, &selection.candidates)
            .await?;

        Ok(AnswerReport {
            question: selection.topic,
            tier: selection.tier,
            sources: selection.candidates,
            answer,
        })
    }
}
