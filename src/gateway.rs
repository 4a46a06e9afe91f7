//! Access to the hosted generative model service.
//!
//! [`GenerativeModel`] is the transport seam: [`GeminiClient`] speaks HTTP,
//! tests substitute scripted models. [`AiGateway`] shapes prompts for each
//! note-level task and folds whatever comes back into a domain result. Empty
//! or malformed answers degrade to fixed fallbacks; only transport and
//! service failures surface as errors.
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, trace, warn};
use reqwest::Client;

use crate::wire::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};
use crate::{Config, GroundedAnswer, ModelRoster, NovaError, Result};

pub const SUMMARY_FALLBACK: &str = "Failed to summarize.";
pub const TITLE_FALLBACK: &str = "Untitled Note";
pub const SEARCH_FALLBACK: &str = "No information found.";

/// Sends one `generateContent` request to a named model
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

/// HTTP client for the Gemini REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::build(base_url.into(), api_key.into(), None)
    }

    /// Builds a client from the configuration. Fails without an API key.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        Self::build(
            config.api_base_url.clone(),
            api_key,
            config.request_timeout(),
        )
    }

    fn build(
        base_url: String,
        api_key: String,
        timeout: Option<std::time::Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.url(model);
        debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            warn!("Model {} returned {}: {}", model, status, message);
            return Err(NovaError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        trace!("Response body: {}", body);
        Ok(serde_json::from_str(&body)?)
    }
}

/// Note-level AI tasks on top of a [`GenerativeModel`]
#[derive(Clone)]
pub struct AiGateway {
    model: Arc<dyn GenerativeModel>,
    models: ModelRoster,
    aspect_ratio: String,
}

impl AiGateway {
    pub fn new(model: Arc<dyn GenerativeModel>, models: ModelRoster) -> Self {
        Self {
            model,
            models,
            aspect_ratio: "16:9".to_string(),
        }
    }

    pub fn from_config(model: Arc<dyn GenerativeModel>, config: &Config) -> Self {
        Self::new(model, config.models.clone()).with_aspect_ratio(config.cover_aspect_ratio.clone())
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }

    pub fn models(&self) -> &ModelRoster {
        &self.models
    }

    /// Three-bullet summary of `text`.
    ///
    /// Callers skip blank input; an empty answer becomes [`SUMMARY_FALLBACK`].
    pub async fn summarize(&self, text: &str) -> Result<String> {
        info!("Requesting summary ({} chars)", text.len());
        let request = GenerateContentRequest::prompt(format!(
            "Summarize the following note into 3 concise bullet points:\n\n{}",
            text
        ));
        let response = self.model.generate_content(&self.models.text, &request).await?;

        Ok(non_blank(response.text()).unwrap_or_else(|| {
            warn!("Summary came back empty, using fallback");
            SUMMARY_FALLBACK.to_string()
        }))
    }

    /// Action items found in `text`.
    ///
    /// Anything other than a JSON array of strings yields an empty list.
    pub async fn extract_action_items(&self, text: &str) -> Result<Vec<String>> {
        info!("Requesting action items ({} chars)", text.len());
        let request = GenerateContentRequest::prompt(format!(
            "Extract action items from the following text and return them as a JSON array of strings. Content:\n\n{}",
            text
        ))
        .with_string_array_output();
        let response = self.model.generate_content(&self.models.text, &request).await?;

        let Some(payload) = response.text() else {
            debug!("No action item payload returned");
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<String>>(&payload) {
            Ok(items) => {
                debug!("Parsed {} action items", items.len());
                Ok(items)
            }
            Err(e) => {
                warn!("Action item payload is not a string array: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Short title for a note with `text` as content, trimmed.
    ///
    /// An empty answer becomes [`TITLE_FALLBACK`].
    pub async fn generate_title(&self, text: &str) -> Result<String> {
        info!("Requesting title ({} chars)", text.len());
        let request = GenerateContentRequest::prompt(format!(
            "Based on this content, generate a short (3-5 words) catchy title for a note. Return ONLY the title.\n\n{}",
            text
        ));
        let response = self.model.generate_content(&self.models.text, &request).await?;

        Ok(non_blank(response.text())
            .map(|t| t.trim().to_string())
            .unwrap_or_else(|| {
                warn!("Title came back empty, using fallback");
                TITLE_FALLBACK.to_string()
            }))
    }

    /// Header image illustrating `prompt_seed`, as a `data:` URL.
    ///
    /// `None` when the answer holds no inline image.
    pub async fn generate_cover_image(&self, prompt_seed: &str) -> Result<Option<String>> {
        info!("Requesting cover image for '{}'", prompt_seed);
        let request = GenerateContentRequest::prompt(format!(
            "A professional, abstract, artistic header image for a note about: {}",
            prompt_seed
        ))
        .with_aspect_ratio(self.aspect_ratio.clone());
        let response = self.model.generate_content(&self.models.image, &request).await?;

        let image = response.first_inline_image();
        if image.is_none() {
            warn!("Image response carried no inline image");
        }
        Ok(image)
    }

    /// Web-grounded answer to `query` with the sources it cites.
    ///
    /// An empty answer becomes [`SEARCH_FALLBACK`].
    pub async fn grounded_search(&self, query: &str) -> Result<GroundedAnswer> {
        info!("Requesting grounded answer ({} chars)", query.len());
        let request = GenerateContentRequest::prompt(query).with_google_search();
        let response = self
            .model
            .generate_content(&self.models.search, &request)
            .await?;

        let citations = response.citations();
        debug!("Grounded answer cites {} sources", citations.len());
        let text = non_blank(response.text()).unwrap_or_else(|| {
            warn!("Grounded answer came back empty, using fallback");
            SEARCH_FALLBACK.to_string()
        });

        Ok(GroundedAnswer { text, citations })
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}
