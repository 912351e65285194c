use crate::client::config::Config;

pub fn generate_content_url(config: &Config) -> String {
    let model = config.model();
    // Accept both "gemini-2.5-flash" and the fully qualified "models/gemini-2.5-flash".
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!("{}/models/{}:generateContent", config.base_url(), model)
}
