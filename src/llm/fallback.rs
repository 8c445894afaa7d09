//! Response strategy - hosted models first, templates last

use std::time::Duration;

use crate::config::Config;
use crate::llm::provider::{create_provider, GenerationRequest, TextGenerator};
use crate::llm::template::TemplateResponder;

/// Ordered hosted generators backed by the deterministic responder
pub struct ResponseStrategy {
    remotes: Vec<Box<dyn TextGenerator>>,
    template: TemplateResponder,
    timeout: Duration,
}

impl ResponseStrategy {
    pub fn new(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.llm.timeout_secs);
        let mut remotes: Vec<Box<dyn TextGenerator>> = Vec::new();

        if config.llm.enabled {
            for name in config.provider_order() {
                let Some(provider_config) = config.llm.providers.get(&name) else {
                    continue;
                };
                if !provider_config.enabled {
                    continue;
                }

                let api_key = config.resolve_api_key(&name);
                match create_provider(&name, provider_config.clone(), api_key, timeout) {
                    Ok(provider) => remotes.push(provider),
                    Err(e) => {
                        tracing::warn!("Skipping provider {}: {}", name, e);
                    }
                }
            }
        }

        if remotes.is_empty() {
            tracing::info!("No hosted model configured, answering from templates");
        }

        Self::with_remotes(remotes, timeout)
    }

    /// Build a strategy from explicit generators
    pub fn with_remotes(remotes: Vec<Box<dyn TextGenerator>>, timeout: Duration) -> Self {
        Self {
            remotes,
            template: TemplateResponder::new(),
            timeout,
        }
    }

    /// Whether any hosted model is configured
    pub fn has_remote(&self) -> bool {
        !self.remotes.is_empty()
    }

    /// Answer a request; never fails
    pub async fn respond(&self, request: &GenerationRequest) -> String {
        for remote in &self.remotes {
            match tokio::time::timeout(self.timeout, remote.generate(request)).await {
                Ok(Ok(text)) if !text.trim().is_empty() => return text,
                Ok(Ok(_)) => {
                    tracing::warn!("Provider {} returned an empty answer", remote.name());
                }
                Ok(Err(e)) => {
                    tracing::warn!("Provider {} failed: {}", remote.name(), e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Provider {} timed out after {}s",
                        remote.name(),
                        self.timeout.as_secs_f32()
                    );
                }
            }
        }

        self.template
            .respond(&request.message, request.context.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalystError, Result};

    struct Failing;

    #[async_trait::async_trait]
    impl TextGenerator for Failing {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            Err(AnalystError::RemoteUnavailable("quota exceeded".to_string()))
        }

        fn name(&self) -> &str {
            "Failing"
        }
    }

    struct Slow;

    #[async_trait::async_trait]
    impl TextGenerator for Slow {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }

        fn name(&self) -> &str {
            "Slow"
        }
    }

    struct Fixed(&'static str);

    #[async_trait::async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "Fixed"
        }
    }

    fn expected_fallback(message: &str) -> String {
        TemplateResponder::new().respond(message, None)
    }

    #[tokio::test]
    async fn test_remote_answer_wins() {
        let strategy = ResponseStrategy::with_remotes(
            vec![Box::new(Fixed("resposta remota"))],
            Duration::from_secs(5),
        );

        let answer = strategy.respond(&GenerationRequest::new("oi", None)).await;
        assert_eq!(answer, "resposta remota");
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_template() {
        let strategy =
            ResponseStrategy::with_remotes(vec![Box::new(Failing)], Duration::from_secs(5));

        let answer = strategy.respond(&GenerationRequest::new("oi", None)).await;
        assert_eq!(answer, expected_fallback("oi"));
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_template() {
        let strategy =
            ResponseStrategy::with_remotes(vec![Box::new(Slow)], Duration::from_millis(50));

        let answer = strategy.respond(&GenerationRequest::new("oi", None)).await;
        assert_eq!(answer, expected_fallback("oi"));
    }

    #[tokio::test]
    async fn test_tries_next_remote() {
        let strategy = ResponseStrategy::with_remotes(
            vec![Box::new(Failing), Box::new(Fixed("segundo"))],
            Duration::from_secs(5),
        );

        let answer = strategy.respond(&GenerationRequest::new("oi", None)).await;
        assert_eq!(answer, "segundo");
    }

    #[tokio::test]
    async fn test_empty_answer_is_ignored() {
        let strategy =
            ResponseStrategy::with_remotes(vec![Box::new(Fixed("  "))], Duration::from_secs(5));

        let answer = strategy.respond(&GenerationRequest::new("obrigado", None)).await;
        assert_eq!(answer, expected_fallback("obrigado"));
    }

    #[test]
    fn test_disabled_config_has_no_remote() {
        let mut config = Config::default();
        config.llm.enabled = false;

        assert!(!ResponseStrategy::new(&config).has_remote());
    }

    #[test]
    fn test_missing_keys_skip_providers() {
        let mut config = Config::default();
        config.llm.default_provider = "openai".to_string();
        config.llm.fallback_order.clear();
        let openai = config.llm.providers.get_mut("openai").unwrap();
        openai.enabled = true;
        openai.api_key = "$COMPLAINT_LENS_UNSET_OPENAI_KEY".to_string();

        assert!(!ResponseStrategy::new(&config).has_remote());
    }
}
