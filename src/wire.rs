//! Request and response bodies of the `generateContent` endpoint.
//!
//! Every response field the service may leave out is an `Option` or a
//! defaulted `Vec`, so a sparse or unexpected payload still deserializes and
//! the accessors below decide what a missing piece means.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::Citation;

/// Title given to a citation the service left untitled
pub const UNTITLED_SOURCE: &str = "Source";

const DEFAULT_IMAGE_MIME: &str = "image/png";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

impl GenerateContentRequest {
    /// A single user turn holding `prompt`
    pub fn prompt(prompt: impl Into<String>) -> Self {
        GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            ..Default::default()
        }
    }

    /// Constrains the answer to a JSON array of strings
    pub fn with_string_array_output(mut self) -> Self {
        let config = self.generation_config.get_or_insert_with(Default::default);
        config.response_mime_type = Some("application/json".to_string());
        config.response_schema = Some(json!({
            "type": "ARRAY",
            "items": { "type": "STRING" }
        }));
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        let config = self.generation_config.get_or_insert_with(Default::default);
        config.image_config = Some(ImageConfig {
            aspect_ratio: aspect_ratio.into(),
        });
        self
    }

    /// Lets the service ground its answer on a live web search
    pub fn with_google_search(mut self) -> Self {
        self.tools.push(Tool {
            google_search: Some(GoogleSearch {}),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Content {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Marks model reasoning that is not part of the answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    fn is_thought(&self) -> bool {
        self.thought.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Base64 encoded payload
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GoogleSearch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoogleSearch {}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Error envelope returned with non-success statuses
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

impl GenerateContentResponse {
    /// Builds a response whose first candidate answers with `text`
    pub fn from_text(text: impl Into<String>) -> Self {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part::text(text)],
                }),
                grounding_metadata: None,
            }],
        }
    }

    fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    fn first_parts(&self) -> &[Part] {
        self.first_candidate()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// Answer text of the first candidate.
    ///
    /// Text parts are concatenated and thought parts skipped. `None` when the
    /// candidate carries no text at all.
    pub fn text(&self) -> Option<String> {
        let mut texts = self
            .first_parts()
            .iter()
            .filter(|p| !p.is_thought())
            .filter_map(|p| p.text.as_deref())
            .peekable();

        texts.peek()?;
        Some(texts.collect())
    }

    /// First inline image of the first candidate as a `data:` URL.
    ///
    /// Parts without data, or whose data is not valid base64, are skipped.
    pub fn first_inline_image(&self) -> Option<String> {
        for part in self.first_parts() {
            let Some(inline) = &part.inline_data else {
                continue;
            };
            let Some(data) = inline.data.as_deref().filter(|d| !d.is_empty()) else {
                trace!("Skipping inline part without payload");
                continue;
            };
            if let Err(e) = STANDARD.decode(data) {
                debug!("Skipping inline part with undecodable payload: {}", e);
                continue;
            }

            let mime = inline
                .mime_type
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_IMAGE_MIME);
            return Some(format!("data:{};base64,{}", mime, data));
        }
        None
    }

    /// Web sources the first candidate was grounded on.
    ///
    /// Chunks without a URI are dropped; missing or empty titles become
    /// [`UNTITLED_SOURCE`].
    pub fn citations(&self) -> Vec<Citation> {
        let Some(metadata) = self
            .first_candidate()
            .and_then(|c| c.grounding_metadata.as_ref())
        else {
            return Vec::new();
        };

        metadata
            .grounding_chunks
            .iter()
            .filter_map(|chunk| {
                let web = chunk.web.as_ref()?;
                let uri = web.uri.as_deref().filter(|u| !u.is_empty())?;
                let title = web
                    .title
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .unwrap_or(UNTITLED_SOURCE);
                Some(Citation {
                    title: title.to_string(),
                    uri: uri.to_string(),
                })
            })
            .collect()
    }
}
