//! Prompt loader for YAML prompt definitions with compiled-in fallbacks.

use crate::defaults;
use crate::types::PromptDefinition;
use scholar_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt definition by ID.
///
/// Workspace overrides are searched first: a file named `<id>.yml` in
/// `.scholar/prompts/`. When no override exists, the compiled-in default for
/// that ID is returned.
///
/// # Arguments
/// * `workspace_path` - Root workspace directory containing `.scholar/`
/// * `prompt_id` - Prompt identifier (e.g., "agent.critique")
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompts_dir = workspace_path.join(".scholar/prompts");
    let prompt_file = prompts_dir.join(format!("{}.yml", prompt_id));

    if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;

        let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to parse prompt YAML {:?}: {}",
                prompt_file, e
            ))
        })?;

        validate_prompt(&definition)?;

        tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);
        return Ok(definition);
    }

    defaults::builtin(prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))
}

/// List all available prompt IDs: compiled-in plus workspace overrides.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids: Vec<String> = defaults::builtin_ids()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let prompts_dir = workspace_path.join(".scholar/prompts");
    if prompts_dir.exists() {
        for entry in walkdir::WalkDir::new(&prompts_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if !prompt_ids.iter().any(|id| id == stem) {
                        prompt_ids.push(stem.to_string());
                    }
                }
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    // Simple format check on apiVersion
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_override(dir: &Path, id: &str, title: &str) {
        let prompts_dir = dir.join(".scholar/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();

        let content = format!(
            r#"
id: {}
title: "{}"
apiVersion: "1.0"
behavior:
  tone: professional
  style: concise
template: "Override: {{{{query}}}}"
output:
  format: markdown
"#,
            id, title
        );

        fs::write(prompts_dir.join(format!("{}.yml", id)), content).unwrap();
    }

    #[test]
    fn test_builtin_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(temp_dir.path(), "agent.plan").unwrap();
        assert_eq!(prompt.id, "agent.plan");
    }

    #[test]
    fn test_override_takes_precedence() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), "agent.plan", "Custom Plan");

        let prompt = load_prompt(temp_dir.path(), "agent.plan").unwrap();
        assert_eq!(prompt.title, "Custom Plan");
        assert!(prompt.template.starts_with("Override"));
    }

    #[test]
    fn test_unknown_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_prompt(temp_dir.path(), "nonexistent");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_override_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let prompts_dir = temp_dir.path().join(".scholar/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();
        fs::write(prompts_dir.join("broken.yml"), "invalid: yaml: content:").unwrap();

        let result = load_prompt(temp_dir.path(), "broken");
        assert!(result.is_err());
    }

    #[test]
    fn test_list_includes_builtins_and_overrides() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), "custom.extra", "Extra");

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert!(prompts.iter().any(|p| p == "agent.plan"));
        assert!(prompts.iter().any(|p| p == "custom.extra"));
    }
}
