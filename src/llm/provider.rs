//! Hosted text-generation providers

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analysis::ContextStats;
use crate::config::ProviderConfig;
use crate::error::{AnalystError, Result};

/// Instruction text sent ahead of every conversational question
pub const SYSTEM_PROMPT: &str = "\
Você é um assistente especializado em análise de reclamações de clientes.

Analise com cuidado o que o usuário pergunta:
- Perguntas sobre MAIS/MAIOR/MÁXIMO referem-se à categoria com mais reclamações.
- Perguntas sobre MENOS/MENOR/MÍNIMO referem-se à categoria com menos reclamações.
- Use apenas os dados fornecidos e seja preciso com os números.

Responda somente o que foi perguntado, de forma breve e natural.
Para uma saudação simples, cumprimente e pergunte como pode ajudar.
Não gere relatórios a menos que isso seja pedido explicitamente.";

/// A conversational question plus whatever statistics are available
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub message: String,
    pub context: Option<ContextStats>,
}

impl GenerationRequest {
    pub fn new(message: impl Into<String>, context: Option<ContextStats>) -> Self {
        Self {
            message: message.into(),
            context,
        }
    }

    /// Full prompt for hosted models: instructions, question, serialized context
    pub fn prompt(&self) -> String {
        let mut prompt = format!("{}\n\nPergunta do usuário: {}", SYSTEM_PROMPT, self.message);
        if let Some(context) = &self.context {
            if let Ok(json) = serde_json::to_string_pretty(context) {
                prompt.push_str("\n\nDados disponíveis: ");
                prompt.push_str(&json);
            }
        }
        prompt
    }
}

/// Something that can answer a conversational request
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
    fn name(&self) -> &str;
}

fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Ollama provider (local)
pub struct OllamaProvider {
    client: Client,
    config: ProviderConfig,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            config,
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for OllamaProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let prompt = request.prompt();
        let body = OllamaRequest {
            model: &self.config.model,
            prompt: &prompt,
            stream: false,
        };

        let url = format!("{}/api/generate", self.config.endpoint);
        let response: OllamaResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.response)
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
    api_key: String,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessageResponse,
}

#[derive(Deserialize)]
struct OpenAiMessageResponse {
    content: String,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig, api_key: String, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            config,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let prompt = request.prompt();
        let body = OpenAiRequest {
            model: &self.config.model,
            messages: vec![OpenAiMessage {
                role: "user",
                content: &prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.endpoint);
        let response: OpenAiResponse = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| AnalystError::RemoteUnavailable("No response from OpenAI".to_string()))
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
    api_key: String,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig, api_key: String, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            config,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for AnthropicProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        // Instructions go in the system field, question and context in the turn
        let mut content = format!("Pergunta do usuário: {}", request.message);
        if let Some(context) = &request.context {
            content.push_str("\n\nDados disponíveis: ");
            content.push_str(&serde_json::to_string_pretty(context)?);
        }

        let body = AnthropicRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens.unwrap_or(1000),
            system: SYSTEM_PROMPT,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &content,
            }],
        };

        let url = format!("{}/messages", self.config.endpoint);
        let response: AnthropicResponse = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| {
                AnalystError::RemoteUnavailable("No response from Anthropic".to_string())
            })
    }

    fn name(&self) -> &str {
        "Anthropic"
    }
}

/// Factory function to create provider from config
pub fn create_provider(
    provider_name: &str,
    config: ProviderConfig,
    api_key: Option<String>,
    timeout: Duration,
) -> Result<Box<dyn TextGenerator>> {
    match provider_name {
        "ollama" => Ok(Box::new(OllamaProvider::new(config, timeout))),
        "openai" => {
            let key = api_key.ok_or_else(|| {
                AnalystError::ConfigurationMissing("OpenAI API key required".to_string())
            })?;
            Ok(Box::new(OpenAiProvider::new(config, key, timeout)))
        }
        "anthropic" => {
            let key = api_key.ok_or_else(|| {
                AnalystError::ConfigurationMissing("Anthropic API key required".to_string())
            })?;
            Ok(Box::new(AnthropicProvider::new(config, key, timeout)))
        }
        _ => Err(AnalystError::ConfigurationMissing(format!(
            "Unknown provider: {}",
            provider_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_corpus;
    use crate::config::Config;

    #[test]
    fn test_prompt_without_context() {
        let request = GenerationRequest::new("oi", None);
        let prompt = request.prompt();

        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.contains("Pergunta do usuário: oi"));
        assert!(!prompt.contains("Dados disponíveis"));
    }

    #[test]
    fn test_prompt_with_context() {
        let context = ContextStats::from_corpus(&sample_corpus());
        let prompt = GenerationRequest::new("qual a maior categoria?", Some(context)).prompt();

        assert!(prompt.contains("Dados disponíveis"));
        assert!(prompt.contains("\"total_reclamacoes\": 10"));
        assert!(prompt.contains("\"App\""));
    }

    #[test]
    fn test_create_provider_requires_key() {
        let config = Config::default();
        let openai = config.llm.providers.get("openai").unwrap().clone();

        let result = create_provider("openai", openai, None, Duration::from_secs(1));
        assert!(matches!(result, Err(AnalystError::ConfigurationMissing(_))));
    }

    #[test]
    fn test_create_provider_unknown() {
        let config = Config::default();
        let ollama = config.llm.providers.get("ollama").unwrap().clone();

        assert!(create_provider("bedrock", ollama.clone(), None, Duration::from_secs(1)).is_err());
        let provider = create_provider("ollama", ollama, None, Duration::from_secs(1)).unwrap();
        assert_eq!(provider.name(), "Ollama");
    }
}
