//! Loading of the persona and output guideline prompts.

use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::Path};

/// Reads every `*.md` file in `prompts_path`, keyed by file stem.
pub fn load_prompts(prompts_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(prompts_path)
        .with_context(|| format!("Could not read prompts directory {}", prompts_path.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

/// Composes the system prompt from `persona.md` and `output_guidelines.md`.
pub fn system_prompt(prompts: &HashMap<String, String>) -> Result<String> {
    let persona = prompts
        .get("persona")
        .context("persona.md not found in prompts directory")?;
    let guidelines = prompts
        .get("output_guidelines")
        .context("output_guidelines.md not found in prompts directory")?;
    Ok(format!(
        "ROLE: {}\n\nOUTPUT GUIDELINES: {}\n\n",
        persona.trim(),
        guidelines.trim()
    ))
}
