use crate::content::Content;

/// Why the model stopped generating a candidate.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    FinishReasonUnspecified,
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Language,
    Other,
    Blocklist,
    ProhibitedContent,
    Spii,
    MalformedFunctionCall,
    #[serde(other)]
    Unknown,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::FinishReasonUnspecified => "FINISH_REASON_UNSPECIFIED",
            FinishReason::Stop => "STOP",
            FinishReason::MaxTokens => "MAX_TOKENS",
            FinishReason::Safety => "SAFETY",
            FinishReason::Recitation => "RECITATION",
            FinishReason::Language => "LANGUAGE",
            FinishReason::Other => "OTHER",
            FinishReason::Blocklist => "BLOCKLIST",
            FinishReason::ProhibitedContent => "PROHIBITED_CONTENT",
            FinishReason::Spii => "SPII",
            FinishReason::MalformedFunctionCall => "MALFORMED_FUNCTION_CALL",
            FinishReason::Unknown => "UNKNOWN",
        }
    }

    /// A normal stop, as opposed to truncation or a block.
    pub fn is_clean(&self) -> bool {
        matches!(self, FinishReason::Stop)
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the prompt itself was rejected before any candidate was produced.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockReason {
    BlockReasonUnspecified,
    Safety,
    Other,
    Blocklist,
    ProhibitedContent,
    ImageSafety,
    #[serde(other)]
    Unknown,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::BlockReasonUnspecified => "BLOCK_REASON_UNSPECIFIED",
            BlockReason::Safety => "SAFETY",
            BlockReason::Other => "OTHER",
            BlockReason::Blocklist => "BLOCKLIST",
            BlockReason::ProhibitedContent => "PROHIBITED_CONTENT",
            BlockReason::ImageSafety => "IMAGE_SAFETY",
            BlockReason::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    content: Option<Content>,

    #[serde(default)]
    finish_reason: Option<FinishReason>,

    #[serde(default)]
    index: Option<u32>,
}

impl Candidate {
    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<BlockReason>,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,

    #[serde(default)]
    candidates_token_count: u32,

    #[serde(default)]
    total_token_count: u32,
}

impl UsageMetadata {
    pub fn prompt_token_count(&self) -> u32 {
        self.prompt_token_count
    }

    pub fn candidates_token_count(&self) -> u32 {
        self.candidates_token_count
    }

    pub fn total_token_count(&self) -> u32 {
        self.total_token_count
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,

    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,

    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,

    #[serde(default)]
    model_version: Option<String>,
}

impl GenerateContentResponse {
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.first_candidate().and_then(Candidate::finish_reason)
    }

    pub fn block_reason(&self) -> Option<BlockReason> {
        self.prompt_feedback.as_ref().and_then(|f| f.block_reason)
    }

    pub fn usage(&self) -> Option<UsageMetadata> {
        self.usage_metadata
    }

    pub fn model_version(&self) -> Option<&str> {
        self.model_version.as_deref()
    }

    /// The generated text of the first candidate, only when it finished cleanly
    /// (or reported no finish reason at all).
    pub fn text(&self) -> Option<String> {
        let candidate = self.first_candidate()?;
        match candidate.finish_reason() {
            None => {}
            Some(reason) if reason.is_clean() => {}
            Some(_) => return None,
        }
        non_empty(candidate.content()?.joined_text())
    }

    /// Whatever text the first candidate carries, regardless of finish reason.
    /// Truncated candidates keep their partial parts here even though `text()`
    /// refuses them.
    pub fn partial_text(&self) -> Option<String> {
        non_empty(self.first_candidate()?.content()?.joined_text())
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).expect("valid response json")
    }

    #[test]
    fn text_joins_parts_of_clean_candidate() {
        let response = parse(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Oh no, "}, {"text": "this is bad."}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17}
            }"#,
        );

        assert_eq!(response.text().as_deref(), Some("Oh no, this is bad."));
        assert_eq!(response.usage().unwrap().total_token_count(), 17);
    }

    #[test]
    fn truncated_candidate_only_reachable_through_partial_text() {
        let response = parse(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Well I think"}]},
                    "finishReason": "MAX_TOKENS"
                }]
            }"#,
        );

        assert_eq!(response.text(), None);
        assert_eq!(response.partial_text().as_deref(), Some("Well I think"));
        assert_eq!(response.finish_reason(), Some(FinishReason::MaxTokens));
    }

    #[test]
    fn thought_parts_are_skipped() {
        let response = parse(
            r#"{
                "candidates": [{
                    "content": {"parts": [{"text": "planning...", "thought": true}, {"text": "Hmph."}]},
                    "finishReason": "STOP"
                }]
            }"#,
        );

        assert_eq!(response.text().as_deref(), Some("Hmph."));
    }

    #[test]
    fn safety_block_without_content() {
        let response = parse(r#"{"candidates": [{"finishReason": "SAFETY", "index": 0}]}"#);

        assert_eq!(response.text(), None);
        assert_eq!(response.partial_text(), None);
        assert_eq!(response.finish_reason().unwrap().as_str(), "SAFETY");
    }

    #[test]
    fn prompt_feedback_block_and_unknown_reasons() {
        let response = parse(r#"{"promptFeedback": {"blockReason": "SOMETHING_NEW"}}"#);

        assert!(response.candidates().is_empty());
        assert_eq!(response.block_reason(), Some(BlockReason::Unknown));

        let response = parse(r#"{"candidates": [{"finishReason": "BRAND_NEW_REASON"}]}"#);
        assert_eq!(response.finish_reason(), Some(FinishReason::Unknown));
    }
}
