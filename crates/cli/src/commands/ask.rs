//! Ask command handler.
//!
//! Answers a question against a local knowledge base. The plain path streams
//! the answer token by token; with self-correction enabled the full
//! generate/review/refine loop runs and prints the final answer.

use super::make_llm_client;
use clap::Args;
use futures::StreamExt;
use scholar_core::{config::AppConfig, AppError, AppResult};
use scholar_llm::LlmRequest;
use scholar_pipeline::agents::StageLlm;
use scholar_pipeline::qa::{answer_question, QaOptions};
use scholar_prompt::{build_prompt, load_prompt};
use std::collections::HashMap;
use std::io::Write;

/// Ask a question against a knowledge base
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Knowledge base to query
    #[arg(short, long, default_value = "default")]
    pub knowledge_base: String,

    /// Number of chunks to retrieve
    #[arg(long)]
    pub top_k: Option<u32>,

    /// Run the generate/review/refine loop
    #[arg(long)]
    pub self_correct: bool,

    /// Disable streaming output
    #[arg(long)]
    pub no_stream: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let client = make_llm_client(config)?;
        let api_key = config.resolve_api_key(&config.provider)?;
        let top_k = self.top_k.unwrap_or(config.pipeline.top_k);

        if self.self_correct {
            // Reviewed answers need the full text before printing
            let llm = StageLlm::new(client, config.model.as_str(), &config.workspace);
            let options = QaOptions {
                base_name: self.knowledge_base.clone(),
                top_k,
                self_correction: true,
                max_iterations: config.pipeline.qa_max_iterations,
                return_sources: true,
            };

            let result = answer_question(
                &config.workspace,
                &llm,
                &self.question,
                &options,
                api_key.as_deref(),
            )
            .await?;

            if self.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.answer);
                if let Some(ref sources) = result.sources {
                    if !sources.is_empty() {
                        println!("\nSources:");
                        for source in sources {
                            println!("  - {} ({})", source.source, source.location);
                        }
                    }
                }
            }

            return Ok(());
        }

        // Plain path: retrieve once, then answer (streamed unless disabled)
        let retrieved = scholar_knowledge::retrieve_context(
            &config.workspace,
            &self.knowledge_base,
            &self.question,
            top_k,
            api_key.as_deref(),
        )
        .await?;

        if retrieved.is_empty() {
            println!("I could not find this information in the available documents.");
            return Ok(());
        }

        let definition = load_prompt(&config.workspace, "agent.answer")?;
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), self.question.clone());
        variables.insert("context".to_string(), retrieved.context.clone());
        let built = build_prompt(&definition, variables)?;

        let mut request = LlmRequest::new(built.user, &config.model).with_temperature(0.3);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        if self.no_stream || self.json {
            let response = client.complete(&request).await?;

            if self.json {
                let output = serde_json::json!({
                    "question": self.question,
                    "answer": response.content,
                    "model": response.model,
                    "provider": config.provider,
                    "usage": {
                        "promptTokens": response.usage.prompt_tokens,
                        "completionTokens": response.usage.completion_tokens,
                        "totalTokens": response.usage.total_tokens
                    },
                    "sources": retrieved.sources,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", response.content);
            }
        } else {
            let mut stream = client.stream(&request).await?;

            while let Some(result) = stream.next().await {
                let chunk = result?;
                if !chunk.content.is_empty() {
                    print!("{}", chunk.content);
                    std::io::stdout()
                        .flush()
                        .map_err(|e| AppError::Other(format!("stdout error: {}", e)))?;
                }
            }
            println!();
        }

        Ok(())
    }
}
