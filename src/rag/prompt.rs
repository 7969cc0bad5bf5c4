//! Grounded prompt composition.

use crate::config::Prompts;
use crate::index::ScoredMessage;
use crate::tokens::estimate_tokens;
use tracing::warn;

/// Exact answer the generator must give when the messages do not answer the
/// question. Consumers may match on it byte-for-byte.
pub const FALLBACK_ANSWER: &str = "I cannot determine the answer from this dataset.";

/// Renders retrieved messages and a question into the answer prompt.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    template: String,
}

impl PromptComposer {
    pub fn new(prompts: &Prompts) -> Self {
        Self {
            template: prompts.ask.template.clone(),
        }
    }

    /// Render the full prompt. Identical inputs give identical output.
    pub fn compose(&self, question: &str, retrieved: &[ScoredMessage]) -> String {
        self.render(question, &context_lines(retrieved))
    }

    /// Render the prompt within `max_tokens`, dropping the lowest-ranked
    /// messages first. Instructions and the question are never cut; if they
    /// alone exceed the budget the prompt is returned with no messages.
    pub fn compose_within(
        &self,
        question: &str,
        retrieved: &[ScoredMessage],
        max_tokens: usize,
    ) -> String {
        let mut lines = context_lines(retrieved);

        loop {
            let prompt = self.render(question, &lines);
            if estimate_tokens(&prompt) <= max_tokens {
                return prompt;
            }
            if lines.pop().is_none() {
                warn!(
                    "Prompt without context is ~{} tokens, over the {} token budget",
                    estimate_tokens(&prompt),
                    max_tokens
                );
                return prompt;
            }
        }
    }

    fn render(&self, question: &str, lines: &[String]) -> String {
        let context = lines.join("\n");
        Prompts::render(
            &self.template,
            &[
                ("context", context.as_str()),
                ("question", question),
                ("fallback", FALLBACK_ANSWER),
            ],
        )
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(&Prompts::default())
    }
}

fn context_lines(retrieved: &[ScoredMessage]) -> Vec<String> {
    retrieved.iter().map(|m| m.record.as_context_line()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::MessageRecord;

    fn scored(ordinal: usize, user: &str, message: &str) -> ScoredMessage {
        ScoredMessage {
            record: MessageRecord::new(ordinal, user, message),
            distance: ordinal as f32,
        }
    }

    #[test]
    fn test_compose_renders_context_and_question() {
        let composer = PromptComposer::default();
        let retrieved = vec![
            scored(0, "alice", "The meeting is at 3pm."),
            scored(1, "bob", "I'll bring snacks."),
        ];
        let prompt = composer.compose("What time is the meeting?", &retrieved);

        assert!(prompt.contains("alice: The meeting is at 3pm.\nbob: I'll bring snacks."));
        assert!(prompt.contains("Question:\nWhat time is the meeting?"));
        assert!(prompt.contains(&format!("\"{}\"", FALLBACK_ANSWER)));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_compose_is_idempotent() {
        let composer = PromptComposer::default();
        let retrieved = vec![scored(0, "alice", "Talk about {{question}} later.")];
        let a = composer.compose("q?", &retrieved);
        let b = composer.compose("q?", &retrieved);
        assert_eq!(a, b);
        assert!(a.contains("alice: Talk about {{question}} later."));
    }

    #[test]
    fn test_compose_with_no_messages() {
        let composer = PromptComposer::default();
        let prompt = composer.compose("anything", &[]);
        assert!(prompt.contains("Messages:\n\n"));
        assert!(prompt.contains("anything"));
    }

    #[test]
    fn test_compose_within_drops_lowest_ranked_first() {
        let prompts = Prompts {
            ask: crate::config::AskPrompts {
                template: "C:\n{{context}}\nQ: {{question}}".to_string(),
            },
        };
        let composer = PromptComposer::new(&prompts);
        let retrieved = vec![
            scored(0, "alice", "first message here"),
            scored(1, "bob", "second message here"),
            scored(2, "carol", "third message here"),
        ];

        let full = composer.compose("why?", &retrieved);
        let budget = estimate_tokens(&full) - 1;
        let bounded = composer.compose_within("why?", &retrieved, budget);

        assert!(estimate_tokens(&bounded) <= budget);
        assert!(bounded.contains("alice: first message here"));
        assert!(!bounded.contains("carol"));
        assert!(bounded.ends_with("Q: why?"));
    }

    #[test]
    fn test_compose_within_keeps_question_when_budget_tiny() {
        let composer = PromptComposer::default();
        let retrieved = vec![scored(0, "alice", "The meeting is at 3pm.")];
        let prompt = composer.compose_within("What time is the meeting?", &retrieved, 1);
        assert!(!prompt.contains("alice"));
        assert!(prompt.contains("What time is the meeting?"));
        assert!(prompt.contains(FALLBACK_ANSWER));
    }

    #[test]
    fn test_compose_within_large_budget_is_unchanged() {
        let composer = PromptComposer::default();
        let retrieved = vec![scored(0, "alice", "The meeting is at 3pm.")];
        assert_eq!(
            composer.compose_within("q", &retrieved, usize::MAX),
            composer.compose("q", &retrieved)
        );
    }
}
