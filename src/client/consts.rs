pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

pub const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const API_KEY_HEADER: &str = "x-goog-api-key";
