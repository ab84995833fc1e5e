//! Configuration management for Scholar.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (.scholar/config.yaml)
//!
//! The configuration is workspace-centric, with most state stored in `.scholar/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Main application configuration.
///
/// This struct holds all global configuration options that affect
/// behavior across the CLI and the HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .scholar/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Default LLM provider (e.g., "openai", "claude", "ollama")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Research pipeline tuning
    pub pipeline: PipelineConfig,

    /// HTTP service settings
    pub server: ServerConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
    },
    Claude {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        #[serde(rename = "apiVersion")]
        api_version: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

/// Research pipeline parameters.
///
/// Defaults mirror the documented behavior of the synthesis workflow:
/// up to 10 papers per search, at most 2 reflection passes, and a 7.0
/// quality bar on the 0-10 critic scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum papers fetched per search
    #[serde(rename = "maxPapers", default = "default_max_papers")]
    pub max_papers: u32,

    /// Maximum critic/reflector iterations
    #[serde(rename = "maxIterations", default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Critic score below which the reflector runs (0-10 scale)
    #[serde(rename = "qualityThreshold", default = "default_quality_threshold")]
    pub quality_threshold: f32,

    /// Chunk size in characters for paper text
    #[serde(rename = "chunkSize", default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between adjacent chunks
    #[serde(rename = "chunkOverlap", default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    /// Chunks retrieved per query
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: u32,

    /// Maximum self-correction passes in document Q&A
    #[serde(rename = "qaMaxIterations", default = "default_qa_max_iterations")]
    pub qa_max_iterations: u32,

    /// Enable the generate/review/refine loop in document Q&A
    #[serde(rename = "selfCorrection", default = "default_true")]
    pub self_correction: bool,

    /// Per-stage sampling temperatures
    #[serde(default)]
    pub temperatures: StageTemperatures,
}

/// Sampling temperature per pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTemperatures {
    #[serde(default = "default_planner_temp")]
    pub planner: f32,
    #[serde(default = "default_summarizer_temp")]
    pub summarizer: f32,
    #[serde(default = "default_synthesizer_temp")]
    pub synthesizer: f32,
    #[serde(default = "default_critic_temp")]
    pub critic: f32,
    #[serde(default = "default_reflector_temp")]
    pub reflector: f32,
}

/// HTTP service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_max_papers() -> u32 {
    10
}

fn default_max_iterations() -> u32 {
    2
}

fn default_quality_threshold() -> f32 {
    7.0
}

fn default_chunk_size() -> u32 {
    1000
}

fn default_chunk_overlap() -> u32 {
    200
}

fn default_top_k() -> u32 {
    5
}

fn default_qa_max_iterations() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_planner_temp() -> f32 {
    0.3
}

fn default_summarizer_temp() -> f32 {
    0.2
}

fn default_synthesizer_temp() -> f32 {
    0.4
}

fn default_critic_temp() -> f32 {
    0.1
}

fn default_reflector_temp() -> f32 {
    0.3
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for StageTemperatures {
    fn default() -> Self {
        Self {
            planner: default_planner_temp(),
            summarizer: default_summarizer_temp(),
            synthesizer: default_synthesizer_temp(),
            critic: default_critic_temp(),
            reflector: default_reflector_temp(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_papers: default_max_papers(),
            max_iterations: default_max_iterations(),
            quality_threshold: default_quality_threshold(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            qa_max_iterations: default_qa_max_iterations(),
            self_correction: default_true(),
            temperatures: StageTemperatures::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    pipeline: Option<PipelineConfig>,
    server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            pipeline: PipelineConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `SCHOLAR_WORKSPACE`: Override workspace path
    /// - `SCHOLAR_CONFIG`: Path to config file
    /// - `SCHOLAR_PROVIDER`: LLM provider
    /// - `SCHOLAR_MODEL`: Model identifier
    /// - `SCHOLAR_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        // Load from environment variables
        if let Ok(workspace) = std::env::var("SCHOLAR_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("SCHOLAR_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        // Validate workspace exists
        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        // Load from YAML config file if it exists
        let config_path = if let Some(ref cf) = config.config_file {
            cf.clone()
        } else {
            config.workspace.join(".scholar/config.yaml")
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("SCHOLAR_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("SCHOLAR_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("SCHOLAR_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        // Merge workspace settings
        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        // Merge logging settings
        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        // Merge LLM settings
        if let Some(llm) = config_file.llm {
            // Set active provider from YAML
            result.provider = llm.active_provider.clone();

            // Set model from active provider config
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(pipeline) = config_file.pipeline {
            result.pipeline = pipeline;
        }

        if let Some(server) = config_file.server {
            result.server = server;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .scholar directory.
    pub fn scholar_dir(&self) -> PathBuf {
        self.workspace.join(".scholar")
    }

    /// Get the directory where run reports are persisted.
    pub fn reports_dir(&self) -> PathBuf {
        self.scholar_dir().join("reports")
    }

    /// Ensure the .scholar directory exists.
    pub fn ensure_scholar_dir(&self) -> AppResult<()> {
        let scholar_dir = self.scholar_dir();
        if !scholar_dir.exists() {
            std::fs::create_dir_all(&scholar_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .scholar directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Get the active provider configuration.
    pub fn get_provider_config(&self, provider: &str) -> AppResult<Option<ProviderConfig>> {
        if let Some(ref llm) = self.llm {
            Ok(llm.providers.get(provider).cloned())
        } else {
            Ok(None)
        }
    }

    /// Resolve the endpoint for a provider, if one is configured.
    pub fn resolve_endpoint(&self, provider: &str) -> AppResult<Option<String>> {
        if let Some(provider_config) = self.get_provider_config(provider)? {
            let endpoint = match provider_config {
                ProviderConfig::Ollama { endpoint, .. } => Some(endpoint),
                ProviderConfig::OpenAI { endpoint, .. } => endpoint,
                ProviderConfig::Claude { endpoint, .. } => endpoint,
            };
            return Ok(endpoint);
        }
        Ok(None)
    }

    /// Resolve API key from environment variable.
    pub fn resolve_api_key(&self, provider: &str) -> AppResult<Option<String>> {
        // Check explicit SCHOLAR_API_KEY first
        if let Some(ref key) = self.api_key {
            return Ok(Some(key.clone()));
        }

        // Try provider-specific config
        if let Some(provider_config) = self.get_provider_config(provider)? {
            let env_var = match provider_config {
                ProviderConfig::OpenAI { api_key_env, .. } => Some(api_key_env),
                ProviderConfig::Claude { api_key_env, .. } => Some(api_key_env),
                ProviderConfig::Ollama { .. } => None,
            };

            if let Some(env_var) = env_var {
                if let Ok(key) = std::env::var(&env_var) {
                    return Ok(Some(key));
                }
            }
        }

        Ok(None)
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = &self.provider;
        let known_providers = ["openai", "claude", "ollama"];

        if !known_providers.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                known_providers.join(", ")
            )));
        }

        // Validate provider-specific requirements
        if let Some(provider_config) = self.get_provider_config(provider)? {
            match provider_config {
                ProviderConfig::OpenAI { api_key_env, .. }
                | ProviderConfig::Claude { api_key_env, .. } => {
                    if self.api_key.is_none() && std::env::var(&api_key_env).is_err() {
                        return Err(AppError::Config(format!(
                            "API key not found in environment variable: {}",
                            api_key_env
                        )));
                    }
                }
                ProviderConfig::Ollama { .. } => {
                    // Ollama doesn't require API keys
                }
            }
        }

        Ok(())
    }
}

impl ProviderConfig {
    /// Get the model name for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } => model,
            Self::Claude { model, .. } => model,
            Self::Ollama { model, .. } => model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert!(!config.verbose);
        assert!(!config.no_color);
        assert_eq!(config.pipeline.max_papers, 10);
        assert_eq!(config.pipeline.max_iterations, 2);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_pipeline_defaults() {
        let pipeline = PipelineConfig::default();
        assert_eq!(pipeline.chunk_size, 1000);
        assert_eq!(pipeline.chunk_overlap, 200);
        assert_eq!(pipeline.top_k, 5);
        assert!((pipeline.quality_threshold - 7.0).abs() < f32::EPSILON);
        assert!(pipeline.self_correction);
    }

    #[test]
    fn test_scholar_dir() {
        let config = AppConfig::default();
        let scholar_dir = config.scholar_dir();
        assert!(scholar_dir.ends_with(".scholar"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("openai".to_string()),
            Some("gpt-4o".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "openai");
        assert_eq!(overridden.model, "gpt-4o");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_yaml_pipeline_section() {
        let dir = std::env::temp_dir().join("scholar-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(
            &path,
            r#"
pipeline:
  maxPapers: 4
  qualityThreshold: 8.5
server:
  port: 9000
"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        let merged = config.merge_yaml(&path).unwrap();
        assert_eq!(merged.pipeline.max_papers, 4);
        assert!((merged.pipeline.quality_threshold - 8.5).abs() < f32::EPSILON);
        assert_eq!(merged.server.port, 9000);

        std::fs::remove_file(&path).ok();
    }
}
