//! Interactive chat session: retrieval-grounded question answering with
//! session-local history.
//!
//! One question is processed end-to-end before the next is accepted, so
//! history order is program order. Service failures never escape: they are
//! converted into an assistant message carrying the error text and the
//! session continues.

use std::sync::Arc;

use palate_llm::LlmProvider;
use palate_llm::provider::{Message, Role};
use palate_memory::Retriever;

use crate::prompt::PromptBuilder;

pub struct ChatSession<P> {
    provider: Arc<P>,
    retriever: Retriever<P>,
    prompt: PromptBuilder,
    history: Vec<Message>,
}

impl<P: LlmProvider> ChatSession<P> {
    pub fn new(provider: Arc<P>, retriever: Retriever<P>, prompt: PromptBuilder) -> Self {
        Self {
            provider,
            retriever,
            prompt,
            history: Vec::new(),
        }
    }

    /// Answer a question, appending the question and the answer to the
    /// session history in that order.
    ///
    /// Failures are folded into the returned text instead of propagating, so
    /// the conversation survives any service error.
    pub async fn ask(&mut self, question: &str) -> String {
        self.history.push(Message::new(Role::User, question));

        let answer = match self.answer(question).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("question failed: {e:#}");
                format!("Sorry, something went wrong while answering your question: {e:#}")
            }
        };

        self.history
            .push(Message::new(Role::Assistant, answer.clone()));
        answer
    }

    async fn answer(&self, question: &str) -> anyhow::Result<String> {
        let chunks = self.retriever.retrieve(question).await?;
        tracing::debug!(retrieved = chunks.len(), "context chunks for question");

        let messages = self.prompt.build(question, &chunks);
        let answer = self.provider.chat(&messages).await?;
        Ok(answer)
    }

    /// Session history, oldest first. In-memory only; nothing is persisted
    /// across runs.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }
}
