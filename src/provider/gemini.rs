//! Gemini provider

use super::{ChatProvider, GenerateRequest, Generation, ProviderId};
use crate::api::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use crate::client::{header_map, Auth, HttpClient};
use crate::config::ProviderConfig;
use crate::error::{MeshError, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;

/// Client for `POST {base_url}/models/{model}:generateContent`.
///
/// Gemini usage is not read back; the router estimates it.
pub struct GeminiProvider {
    http: HttpClient,
    url: String,
    temperature: f32,
    max_tokens: Option<u32>,
    extra_headers: Option<HeaderMap>,
}

impl GeminiProvider {
    /// Build a provider from its configuration
    pub fn new(http: HttpClient, config: &ProviderConfig) -> Self {
        let base_url = config.get_base_url();
        Self {
            http,
            url: format!(
                "{}/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                config.model
            ),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            extra_headers: header_map(&config.headers),
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn generate(&self, request: &GenerateRequest, api_key: &str) -> Result<Generation> {
        let body = GenerateContentRequest {
            contents: vec![Content::text(Some("user"), request.prompt.clone())],
            system_instruction: Some(Content::text(None, request.system_prompt.clone())),
            generation_config: Some(GenerationConfig {
                temperature: Some(self.temperature),
                max_output_tokens: self.max_tokens,
            }),
        };

        let response: GenerateContentResponse = self
            .http
            .post_json(
                &self.url,
                &body,
                Auth::Header {
                    name: "x-goog-api-key",
                    value: api_key,
                },
                self.extra_headers.as_ref(),
                ProviderId::Gemini.as_str(),
            )
            .await?;

        let text = response
            .text()
            .ok_or_else(|| MeshError::Response("candidate contained no text".to_string()))?;

        Ok(Generation { text, usage: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::collections::HashMap;

    fn provider(base_url: String) -> GeminiProvider {
        let config = ProviderConfig {
            base_url,
            model: "gemini-1.5-flash".to_string(),
            api_key_env: None,
            api_base_env: None,
            temperature: 0.7,
            max_tokens: Some(128),
            headers: HashMap::new(),
        };
        GeminiProvider::new(HttpClient::new(0).unwrap(), &config)
    }

    #[tokio::test]
    async fn test_generate_sends_key_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .match_header("x-goog-api-key", "g-key")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}],
                "systemInstruction": {"parts": [{"text": "sys"}]},
                "generationConfig": {"maxOutputTokens": 128}
            })))
            .with_status(200)
            .with_body(
                json!({
                    "candidates": [{"content": {"role": "model", "parts": [{"text": "hi there"}]}}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let request = GenerateRequest {
            system_prompt: "sys".to_string(),
            prompt: "hello".to_string(),
        };
        let generation = provider(server.url())
            .generate(&request, "g-key")
            .await
            .unwrap();

        assert_eq!(generation.text, "hi there");
        assert_eq!(generation.usage, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_blocked_candidate_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-1.5-flash:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#)
            .create_async()
            .await;

        let request = GenerateRequest {
            system_prompt: String::new(),
            prompt: "q".to_string(),
        };
        let result = provider(server.url()).generate(&request, "k").await;
        assert!(matches!(result, Err(MeshError::Response(_))));
    }
}
