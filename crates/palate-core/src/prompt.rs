//! Builds the generation prompt from the question and the retrieved chunks.

use std::fmt::Write;

use palate_llm::provider::{Message, Role};

const SYSTEM_PROMPT: &str = "You are a friendly, knowledgeable assistant. \
    Answer the user's question using the provided context.";

const SECTION_SEPARATOR: &str = "-------------";

/// Assembles the system and user messages sent to the generation service.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system: String,
}

impl PromptBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: SYSTEM_PROMPT.into(),
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// One system message plus one user message carrying the question and
    /// every retrieved chunk, in rank order.
    #[must_use]
    pub fn build(&self, question: &str, chunks: &[String]) -> Vec<Message> {
        let mut user = String::new();
        let _ = writeln!(user, "Question: {question}");
        user.push_str("\nContext:\n");
        for chunk in chunks {
            user.push_str(chunk);
            user.push('\n');
            user.push_str(SECTION_SEPARATOR);
            user.push('\n');
        }
        user.push_str(
            "\nAnswer based on the context above. If it is not enough to \
             answer the question, say so honestly.",
        );

        vec![
            Message::new(Role::System, self.system.clone()),
            Message::new(Role::User, user),
        ]
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_question_and_chunks() {
        let builder = PromptBuilder::new();
        let messages = builder.build(
            "What did Alice become?",
            &[
                "Alice ate a cake and became a slime.".into(),
                "The slime rated the cake five stars.".into(),
            ],
        );

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);

        let user = &messages[1].content;
        assert!(user.contains("What did Alice become?"));
        assert!(user.contains("Alice ate a cake and became a slime."));
        assert!(user.contains("The slime rated the cake five stars."));
    }

    #[test]
    fn chunks_appear_in_rank_order() {
        let builder = PromptBuilder::new();
        let messages = builder.build("q", &["best match".into(), "weaker match".into()]);
        let user = &messages[1].content;
        let first = user.find("best match").unwrap();
        let second = user.find("weaker match").unwrap();
        assert!(first < second);
    }

    #[test]
    fn empty_context_still_builds() {
        let builder = PromptBuilder::new();
        let messages = builder.build("anything?", &[]);
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("anything?"));
    }

    #[test]
    fn custom_system_prompt() {
        let builder = PromptBuilder::new().with_system("Speak like a gourmet critic.");
        let messages = builder.build("q", &[]);
        assert_eq!(messages[0].content, "Speak like a gourmet critic.");
    }
}
