//! Prompt templates for Aurora.
//!
//! The answer template can be customized by placing an `ask.toml` file in the
//! custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub ask: AskPrompts,
}

/// Prompt used to generate grounded answers.
///
/// Placeholders: `{{context}}`, `{{question}}` and `{{fallback}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AskPrompts {
    pub template: String,
}

impl Default for AskPrompts {
    fn default() -> Self {
        Self {
            template: r#"You are a precise AI analyst. Your job is to answer the user's question based *only* on the provided messages.

Carefully follow these two rules:

1.  **If a direct, factual answer IS found in the messages:**
    You MUST state the answer. Then, you MUST cite the specific message(s) you used as evidence, naming their authors.
    Format your response like this:
    [The direct answer]. (Source: [author name])

2.  **If a direct, factual answer IS NOT found in the messages:**
    You MUST respond with *only* the exact phrase:
    "{{fallback}}"

Never add facts that are not present in the messages.

Messages:
{{context}}

Question:
{{question}}

Answer:
"#
            .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, with an optional directory of overrides.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let ask_path = custom_path.join("ask.toml");
            if ask_path.exists() {
                let content = std::fs::read_to_string(&ask_path)?;
                prompts.ask = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a template in a single left-to-right pass.
    ///
    /// Substituted values are never re-scanned, so a message that happens to
    /// contain `{{question}}` is copied through literally. Unknown
    /// placeholders are kept as-is.
    pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let name = &after[..end];
                    match vars.iter().find(|(k, _)| *k == name) {
                        Some((_, value)) => out.push_str(value),
                        None => {
                            out.push_str("{{");
                            out.push_str(name);
                            out.push_str("}}");
                        }
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }
}
