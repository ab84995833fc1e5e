//! Prompt system for Scholar.
//!
//! Every pipeline stage (planning, summarization, synthesis, critique,
//! reflection, Q&A) is driven by a named prompt definition. Definitions ship
//! as compiled-in defaults and can be overridden per workspace by dropping a
//! YAML file into `.scholar/prompts/`.

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt};
pub use types::{BuiltPrompt, PromptBehavior, PromptDefinition, PromptOutputSpec};
