use crate::content::Content;
use crate::safety::SafetySetting;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature, 0.0 to 2.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Upper bound on generated tokens for the candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    candidate_count: Option<u32>,
}

impl GenerationConfig {
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }
}

/// Body of a `models/{model}:generateContent` call.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
}

impl GenerateContentRequest {
    pub fn builder() -> GenerateContentRequestBuilder {
        GenerateContentRequestBuilder::new()
    }

    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    pub fn system_instruction(&self) -> Option<&Content> {
        self.system_instruction.as_ref()
    }

    pub fn generation_config(&self) -> Option<&GenerationConfig> {
        self.generation_config.as_ref()
    }

    pub fn safety_settings(&self) -> &[SafetySetting] {
        &self.safety_settings
    }
}

pub struct GenerateContentRequestBuilder {
    request: GenerateContentRequest,
}

impl Default for GenerateContentRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerateContentRequestBuilder {
    pub fn new() -> Self {
        Self {
            request: GenerateContentRequest::default(),
        }
    }

    pub fn with_system_instruction(mut self, text: &str) -> Self {
        self.request.system_instruction = Some(Content::system_text(text));
        self
    }

    pub fn with_user_text(mut self, text: &str) -> Self {
        self.request.contents.push(Content::user_text(text));
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config_mut().temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.config_mut().max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.request.safety_settings = settings;
        self
    }

    pub fn build(self) -> GenerateContentRequest {
        self.request
    }

    fn config_mut(&mut self) -> &mut GenerationConfig {
        self.request
            .generation_config
            .get_or_insert_with(GenerationConfig::default)
    }
}
