use anyhow::{Context, Result};
use council_core::prompts::PromptSet;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Reads every `<name>.md` file in `dir_path` into a map keyed by file stem.
pub fn load_prompts(dir_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let path = entry?.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for prompt file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

            prompts.insert(prompt_key, content.trim_end().to_string());
        }
    }

    Ok(prompts)
}

/// The built-in templates with any overrides from `dir_path` applied.
pub fn load_prompt_set(dir_path: Option<&Path>) -> Result<PromptSet> {
    let Some(dir_path) = dir_path else {
        return Ok(PromptSet::default());
    };

    let overrides = load_prompts(dir_path)?;
    let loaded = overrides.len();
    let (prompts, ignored) = PromptSet::default().with_overrides(overrides);
    for name in &ignored {
        tracing::warn!("Ignoring {}.md: not a known prompt template", name);
    }
    tracing::info!(
        "Loaded {} prompt override(s) from {}",
        loaded - ignored.len(),
        dir_path.display()
    );
    Ok(prompts)
}
