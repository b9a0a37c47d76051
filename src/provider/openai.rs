//! OpenAI-compatible provider

use super::{ChatProvider, GenerateRequest, Generation, ProviderId};
use crate::api::{ChatCompletionRequest, ChatCompletionResponse, Message};
use crate::client::{header_map, Auth, HttpClient};
use crate::config::ProviderConfig;
use crate::error::{MeshError, Result};
use crate::router::TokenUsage;
use async_trait::async_trait;
use reqwest::header::HeaderMap;

/// Client for `POST {base_url}/chat/completions`
pub struct OpenAiProvider {
    http: HttpClient,
    url: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    extra_headers: Option<HeaderMap>,
}

impl OpenAiProvider {
    /// Build a provider from its configuration
    pub fn new(http: HttpClient, config: &ProviderConfig) -> Self {
        let base_url = config.get_base_url();
        Self {
            http,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            extra_headers: header_map(&config.headers),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    async fn generate(&self, request: &GenerateRequest, api_key: &str) -> Result<Generation> {
        let mut body = ChatCompletionRequest::new(
            self.model.clone(),
            vec![
                Message::system(request.system_prompt.clone()),
                Message::user(request.prompt.clone()),
            ],
        )
        .with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            body = body.with_max_tokens(max_tokens);
        }

        let response: ChatCompletionResponse = self
            .http
            .post_json(
                &self.url,
                &body,
                Auth::Bearer(api_key),
                self.extra_headers.as_ref(),
                ProviderId::OpenAi.as_str(),
            )
            .await?;

        let text = response
            .content()
            .ok_or_else(|| MeshError::Response("completion contained no text".to_string()))?
            .to_string();

        Ok(Generation {
            text,
            usage: response
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        })
    }
}
