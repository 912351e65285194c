pub mod error;
pub mod request;
pub mod response;
pub mod safety;
mod content;

pub use content::{Content, Part, Role};
pub use error::{ApiError, ErrorDetails};
pub use request::{GenerateContentRequest, GenerateContentRequestBuilder, GenerationConfig};
pub use response::{BlockReason, Candidate, FinishReason, GenerateContentResponse, UsageMetadata};
pub use safety::{HarmBlockThreshold, HarmCategory, SafetySetting};
