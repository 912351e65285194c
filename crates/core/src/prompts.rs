//! Prompt templates for persona lines and the closing statement.
//!
//! Templates use `{placeholder}` slots filled in a single pass, so text coming
//! from the topic or the transcript is never re-expanded. Unknown placeholders
//! are left untouched.

use std::collections::HashMap;

pub const PERSONA_SYSTEM: &str = "persona_system";
pub const PERSONA_PROMPT: &str = "persona_prompt";
pub const CLOSING_SYSTEM: &str = "closing_system";
pub const CLOSING_PROMPT: &str = "closing_prompt";

const DEFAULT_PERSONA_SYSTEM: &str = r#"You are {name}, one of the emotions from the animated film "Inside Out".

[Persona]
Name: {name}
Role: {role}
Personality: {description}

[Rules]
1. Act out {name}'s tone, mood and way of speaking perfectly. For example: {style}
2. Never reveal that you are an AI.
3. Answer in 2-3 sentences, never more than 4 lines. Do not ramble.
4. Talk about the topic only from your character's point of view.
5. Do not start by saying your own name."#;

const DEFAULT_PERSONA_PROMPT: &str = r#"[Current debate topic]
"{topic}"

[Conversation so far]
{transcript}

[Request]
Reply as {name} in 2-3 short lines, full of {name}'s emotion."#;

const DEFAULT_CLOSING_SYSTEM: &str = r#"You are {name}, the leader of the emotions from "Inside Out".

[Task]
You have listened to your friends ({debaters}). Now give a positive, hopeful conclusion.

[Rules]
1. Soothe their worries, anger and sadness, and steer everyone somewhere positive.
2. Be as bright and lively as always!
3. Wrap up clearly in 3-4 lines."#;

const DEFAULT_CLOSING_PROMPT: &str = r#"[Topic]
"{topic}"

[Conversation]
{transcript}

[Request]
As {name}, give a happy conclusion that brings everyone together! (Keep it short.)"#;

/// Placeholder shown when nobody has spoken yet (or every line was a notice).
pub const EMPTY_TRANSCRIPT: &str = "(nobody has spoken yet)";

/// The moderator's fixed opening line. The topic is embedded verbatim.
pub fn opening_line(topic: &str) -> String {
    format!(
        "Hi everyone! Today's topic is \"{topic}\". What does everyone think? Let's have a lively talk!"
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptSet {
    templates: HashMap<String, String>,
}

impl Default for PromptSet {
    fn default() -> Self {
        let templates = [
            (PERSONA_SYSTEM, DEFAULT_PERSONA_SYSTEM),
            (PERSONA_PROMPT, DEFAULT_PERSONA_PROMPT),
            (CLOSING_SYSTEM, DEFAULT_CLOSING_SYSTEM),
            (CLOSING_PROMPT, DEFAULT_CLOSING_PROMPT),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { templates }
    }
}

impl PromptSet {
    /// Replaces the built-in templates whose names appear in `overrides`.
    /// Names that are not templates are ignored and reported back.
    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> (Self, Vec<String>) {
        let mut ignored = Vec::new();
        for (name, template) in overrides {
            if self.templates.contains_key(&name) {
                self.templates.insert(name, template);
            } else {
                ignored.push(name);
            }
        }
        ignored.sort();
        (self, ignored)
    }

    pub fn template(&self, name: &str) -> &str {
        self.templates.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn render(&self, name: &str, values: &[(&str, &str)]) -> String {
        render(self.template(name), values)
    }
}

/// Fills `{key}` slots from `values` in one left-to-right pass.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
