use crate::generator::{Generation, GenerationError, GenerationRequest, TextGenerator};
use crate::persona::{Persona, PersonaId};
use crate::prompts::{self, PromptSet};
use crate::transcript::Turn;

/// Persona lines favour variety.
pub const PERSONA_TEMPERATURE: f32 = 0.9;
/// The closing statement favours consistency.
pub const CLOSING_TEMPERATURE: f32 = 0.7;
pub const MAX_OUTPUT_TOKENS: u32 = 2000;

const MISSING_CREDENTIAL_NOTICE: &str =
    "(System error: no API key is configured. Use \"key set <KEY>\" or set GEMINI_API_KEY.)";
const EMPTY_UTTERANCE_NOTICE: &str = "(Error: no text returned from the model)";
const EMPTY_CLOSING_NOTICE: &str = "(Conclusion could not be generated)";

/// Turns (topic, transcript, speaker) into a line of dialogue.
///
/// Both operations are total: whatever goes wrong underneath comes back as a
/// parenthesised notice that is appended to the transcript like any other line.
pub struct Gateway<G> {
    generator: G,
    prompts: PromptSet,
}

impl<G: TextGenerator> Gateway<G> {
    pub fn new(generator: G) -> Self {
        Self::with_prompts(generator, PromptSet::default())
    }

    pub fn with_prompts(generator: G, prompts: PromptSet) -> Self {
        Self { generator, prompts }
    }

    pub async fn generate_utterance(&self, topic: &str, transcript: &[Turn], speaker: &Persona) -> String {
        let system_instruction = self.prompts.render(
            prompts::PERSONA_SYSTEM,
            &[
                ("name", speaker.name),
                ("role", speaker.role),
                ("description", speaker.description),
                ("style", speaker.style),
            ],
        );
        let script = dialogue_script(transcript, false);
        let prompt = self.prompts.render(
            prompts::PERSONA_PROMPT,
            &[("topic", topic), ("transcript", &script), ("name", speaker.name)],
        );

        let request = GenerationRequest {
            system_instruction,
            prompt,
            temperature: PERSONA_TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        };

        match self.generator.generate(request).await {
            Ok(generation) => {
                finish(generation).unwrap_or_else(|| EMPTY_UTTERANCE_NOTICE.to_string())
            }
            Err(e) => {
                tracing::error!(speaker = speaker.name, "persona generation failed: {}", e);
                notice(&e, "the line was filtered")
            }
        }
    }

    pub async fn generate_closing(&self, topic: &str, transcript: &[Turn]) -> String {
        let moderator = PersonaId::MODERATOR.persona();
        let debaters = PersonaId::DEBATERS
            .iter()
            .map(|id| id.persona().name)
            .collect::<Vec<_>>()
            .join(", ");
        let system_instruction = self.prompts.render(
            prompts::CLOSING_SYSTEM,
            &[("name", moderator.name), ("debaters", &debaters)],
        );
        let script = dialogue_script(transcript, true);
        let prompt = self.prompts.render(
            prompts::CLOSING_PROMPT,
            &[("topic", topic), ("transcript", &script), ("name", moderator.name)],
        );

        let request = GenerationRequest {
            system_instruction,
            prompt,
            temperature: CLOSING_TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        };

        match self.generator.generate(request).await {
            Ok(generation) => finish(generation).unwrap_or_else(|| EMPTY_CLOSING_NOTICE.to_string()),
            Err(GenerationError::EmptyResponse) => EMPTY_CLOSING_NOTICE.to_string(),
            Err(e) => {
                tracing::error!("closing generation failed: {}", e);
                notice(&e, "the conclusion was filtered")
            }
        }
    }
}

/// Serialises the conversation as a plain script, one `Name: text` line per
/// turn. Notices are left out so earlier failures do not leak into the
/// model's context.
pub fn dialogue_script(transcript: &[Turn], with_roles: bool) -> String {
    let lines: Vec<String> = transcript
        .iter()
        .filter(|turn| !turn.is_diagnostic())
        .map(|turn| {
            let persona = turn.speaker.persona();
            if with_roles {
                format!("{} ({}): {}", persona.name, persona.role, turn.text)
            } else {
                format!("{}: {}", persona.name, turn.text)
            }
        })
        .collect();

    if lines.is_empty() {
        prompts::EMPTY_TRANSCRIPT.to_string()
    } else {
        lines.join("\n")
    }
}

fn finish(generation: Generation) -> Option<String> {
    let text = generation.text.trim();
    if text.is_empty() {
        None
    } else if generation.truncated {
        Some(format!("{text} ..."))
    } else {
        Some(text.to_string())
    }
}

fn notice(error: &GenerationError, blocked_what: &str) -> String {
    match error {
        GenerationError::MissingCredential => MISSING_CREDENTIAL_NOTICE.to_string(),
        GenerationError::Blocked { reason } => {
            format!("(System: {blocked_what}. Reason: {reason})")
        }
        GenerationError::EmptyResponse => EMPTY_UTTERANCE_NOTICE.to_string(),
        GenerationError::Timeout => "(Error: the model did not answer in time)".to_string(),
        GenerationError::Provider(message) if message.trim().is_empty() => {
            "(Error: could not generate a response)".to_string()
        }
        GenerationError::Provider(message) => format!("(Error: {})", message.trim()),
    }
}
