//! Persona reply generation

use crate::config::ServerConfig;
use crate::error::GenerationError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use sima_core::Persona;
use std::time::Duration;
use tracing::debug;

/// Produces the persona's answer to one user message
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, persona: &Persona, message: &str) -> Result<String, GenerationError>;

    /// Model name reported to clients
    fn model(&self) -> &str;
}

/// OpenAI chat completions
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn new(config: &ServerConfig) -> Result<Self, GenerationError> {
        let api_key = config
            .openai_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingApiKey)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiGenerator {
    async fn generate(&self, persona: &Persona, message: &str) -> Result<String, GenerationError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": persona.system_prompt() },
                { "role": "user", "content": message },
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        debug!("Requesting completion for {} from {}", persona.id, self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == 429 {
            return Err(GenerationError::RateLimit);
        }
        if status == 401 || status == 403 {
            return Err(GenerationError::AuthenticationFailed);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text: String = text.chars().take(500).collect();
            return Err(GenerationError::InvalidResponse(format!("HTTP {}: {}", status, text)));
        }

        let json: serde_json::Value = response.json().await?;
        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| GenerationError::InvalidResponse("no message content in response".to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Offline generator with fixed, persona-flavoured answers
pub struct ScriptedGenerator;

#[async_trait]
impl ReplyGenerator for ScriptedGenerator {
    async fn generate(&self, persona: &Persona, message: &str) -> Result<String, GenerationError> {
        let topic = persona
            .events
            .iter()
            .find(|e| message.to_lowercase().contains(&e.title.to_lowercase()))
            .or_else(|| persona.events.first());

        let answer = match topic {
            Some(event) => format!(
                "Ben {}. \"{}\" diye soruyorsunuz. {} ({}) benim için önemlidir: {}.",
                persona.name,
                message.trim(),
                event.title,
                event.date,
                event.significance
            ),
            None => format!("Ben {}. \"{}\" sorunuzu {} bağlamında düşünelim.", persona.name, message.trim(), persona.era),
        };
        Ok(answer)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sima_core::PersonaCatalog;

    #[tokio::test]
    async fn test_scripted_generator_matches_event() {
        let catalog = PersonaCatalog::builtin();
        let napoleon = catalog.get("napoleon").unwrap();
        let reply = ScriptedGenerator.generate(napoleon, "Waterloo Savaşı nasıldı?").await.unwrap();
        assert!(reply.starts_with("Ben Napolyon Bonaparte."));
        assert!(reply.contains("1815"));
    }

    #[test]
    fn test_scripted_generator_is_deterministic() {
        let catalog = PersonaCatalog::builtin();
        let ataturk = catalog.get("ataturk").unwrap();
        let a = tokio_test::block_on(ScriptedGenerator.generate(ataturk, "Merhaba")).unwrap();
        let b = tokio_test::block_on(ScriptedGenerator.generate(ataturk, "Merhaba")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_openai_generator_needs_key() {
        let config = ServerConfig::default();
        assert!(matches!(OpenAiGenerator::new(&config), Err(GenerationError::MissingApiKey)));
    }
}
