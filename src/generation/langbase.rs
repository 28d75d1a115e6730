use async_trait::async_trait;
use tracing::{debug, warn};

use super::{truncate_words, BreakthroughInsight, QuestionGenerator};
use crate::config::GenerationConfig;
use crate::error::{GenerationError, GenerationResult};
use crate::langbase::{LangbaseClient, PipeRequest};
use crate::patterns::QuestionCategory;
use crate::stage::{BreakthroughReady, StageQuestion};

/// Generator backed by the question and breakthrough pipes.
#[derive(Debug, Clone)]
pub struct LangbaseGenerator {
    client: LangbaseClient,
    question_pipe: String,
    breakthrough_pipe: String,
}

impl LangbaseGenerator {
    /// Create a generator over an existing client.
    pub fn new(client: LangbaseClient, config: &GenerationConfig) -> Self {
        Self {
            client,
            question_pipe: config.question_pipe.clone(),
            breakthrough_pipe: config.breakthrough_pipe.clone(),
        }
    }
}

#[async_trait]
impl QuestionGenerator for LangbaseGenerator {
    async fn generate_question(
        &self,
        question: &StageQuestion,
        category: QuestionCategory,
        history: &[String],
    ) -> GenerationResult<String> {
        let mut system = question.system_prompt.to_string();
        system.push_str(&format!(
            "\n\nStyle: {} question. Example shapes:\n",
            category
        ));
        for template in category.templates() {
            system.push_str(&format!("- {}\n", template));
        }
        system.push_str(&format!("Hard limit: {} words.", question.max_words));

        let request = PipeRequest::with_transcript(&self.question_pipe, &system, history)
            .with_variable("stage", question.stage.as_str())
            .with_variable("category", category.as_str());

        let completion = self.client.complete(request).await?;
        let text = truncate_words(&completion, question.max_words);
        if text.is_empty() {
            warn!(pipe = %self.question_pipe, "Question pipe returned empty completion");
            return Err(GenerationError::InvalidResponse {
                message: "Empty question completion".to_string(),
            });
        }

        debug!(stage = %question.stage, category = %category, "Question generated");
        Ok(text)
    }

    async fn synthesize_breakthrough(
        &self,
        ready: &BreakthroughReady,
        history: &[String],
    ) -> GenerationResult<BreakthroughInsight> {
        let request = PipeRequest::with_transcript(&self.breakthrough_pipe, &ready.prompt, history)
            .with_variable("reason", ready.reason.as_str());

        let completion = self.client.complete(request).await?;
        BreakthroughInsight::parse(&completion)
    }
}
