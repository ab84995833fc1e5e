//! Prompt builder for rendering templates with stage variables.

use crate::types::{BuiltPrompt, PromptDefinition};
use scholar_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Renders both the system and user templates using Handlebars and returns a
/// `BuiltPrompt` ready for LLM execution.
///
/// # Example
/// ```no_run
/// use scholar_prompt::{build_prompt, load_prompt};
/// use std::collections::HashMap;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = load_prompt(Path::new("."), "agent.plan")?;
/// let mut vars = HashMap::new();
/// vars.insert("query".to_string(), "What is retrieval-augmented generation?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let system = match definition.system {
        Some(ref template) => Some(render_template(template, &variables)?),
        None => None,
    };

    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_build_plan_prompt() {
        let def = defaults::builtin("agent.plan").unwrap();
        let built = build_prompt(&def, vars(&[("query", "LLM hallucination mitigation")])).unwrap();

        assert!(built.user.contains("LLM hallucination mitigation"));
        assert!(built.system.as_deref().unwrap().contains("research planning"));
        assert_eq!(built.metadata.source_prompt_id, "agent.plan");
    }

    #[test]
    fn test_no_html_escaping() {
        let def = defaults::builtin("agent.answer").unwrap();
        let built = build_prompt(
            &def,
            vars(&[("question", "a < b && b > c?"), ("context", "x")]),
        )
        .unwrap();

        assert!(built.user.contains("a < b && b > c?"));
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let def = defaults::builtin("agent.plan").unwrap();
        // Handlebars renders unknown variables as empty strings
        let built = build_prompt(&def, HashMap::new()).unwrap();
        assert!(built.user.contains("Research Query:"));
    }

    #[test]
    fn test_resolved_variables_are_recorded() {
        let def = defaults::builtin("agent.plan").unwrap();
        let built = build_prompt(&def, vars(&[("query", "q")])).unwrap();
        assert_eq!(built.metadata.resolved_variables.get("query").unwrap(), "q");
    }
}
