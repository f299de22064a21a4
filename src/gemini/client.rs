//! GeminiClient - handles communication with the generative language API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::poll::PollPolicy;
use crate::data_uri::{self, DataUriError};
use crate::keygate::KeyGate;

/// The environment variable name for the provider API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default base URL for the generative language API.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for prompt enhancement.
pub const TEXT_MODEL: &str = "gemini-2.5-flash";

/// Default model for image synthesis and editing.
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Default model for video synthesis.
pub const VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

/// Default timeout for HTTP requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Style suffix appended to text-only image prompts.
const IMAGE_STYLE_SUFFIX: &str = "Surreal, Futuristic, High Definition, Cinematic Lighting";

/// Style suffix appended to video prompts.
const VIDEO_STYLE_SUFFIX: &str = "Cinematic, surreal, futuristic style, high quality";

/// Validate a prompt before sending it to the API.
///
/// Rejects empty or whitespace-only prompts.
pub fn validate_prompt(prompt: &str) -> Result<(), GeminiError> {
    if prompt.trim().is_empty() {
        return Err(GeminiError::EmptyPrompt);
    }
    Ok(())
}

/// Append the caller's API key to a media URI as a query parameter so the
/// content can subsequently be fetched directly.
pub fn with_key_param(uri: &str, api_key: &str) -> String {
    if uri.contains('?') {
        format!("{}&key={}", uri, api_key)
    } else {
        format!("{}?key={}", uri, api_key)
    }
}

/// A user-supplied reference photo, as the API wants it: a base64 payload
/// plus its declared media subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub mime_type: String,
    /// Base64-encoded image bytes, without any data URI prefix.
    pub data: String,
}

impl ReferenceImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Build a reference image from an uploaded data URI.
    pub fn from_data_uri(uri: &str) -> Result<Self, DataUriError> {
        let (mime_type, payload) = data_uri::parse(uri)?;
        Ok(Self::new(mime_type, payload))
    }
}

/// The model identifiers used for each of the three operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSet {
    pub text: String,
    pub image: String,
    pub video: String,
}

impl Default for ModelSet {
    fn default() -> Self {
        Self {
            text: TEXT_MODEL.to_string(),
            image: IMAGE_MODEL.to_string(),
            video: VIDEO_MODEL.to_string(),
        }
    }
}

/// One content part of a multimodal request or response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(image: &ReferenceImage) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            }),
        }
    }
}

/// Inline binary payload, base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// Request body for video job submission.
#[derive(Debug, Serialize)]
struct VideoJobRequest {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
struct VideoInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    sample_count: u32,
    resolution: String,
    aspect_ratio: String,
}

/// A long-running video operation, as returned by submission and by each
/// status fetch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: VideoRef,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: String,
}

/// Client for the hosted generative media provider.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    models: ModelSet,
    poll: PollPolicy,
    http_client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new client by reading the API key from the environment.
    ///
    /// Loads a `.env` file when one is present, then reads the
    /// `GEMINI_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::MissingApiKey` if the variable is not set.
    pub fn new() -> Result<Self, GeminiError> {
        // .env is optional; a missing file is fine
        let _ = dotenv::dotenv();
        let api_key =
            std::env::var(GEMINI_API_KEY_ENV).map_err(|_| GeminiError::MissingApiKey)?;
        Self::with_api_key(api_key)
    }

    /// Create a new client with an explicit API key.
    pub fn with_api_key(api_key: String) -> Result<Self, GeminiError> {
        if api_key.is_empty() {
            return Err(GeminiError::MissingApiKey);
        }

        Ok(Self {
            api_key,
            base_url: GEMINI_API_BASE_URL.to_string(),
            models: ModelSet::default(),
            poll: PollPolicy::default(),
            http_client: build_http_client()?,
        })
    }

    /// Create a new client with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, GeminiError> {
        let mut client = Self::with_api_key(api_key)?;
        client.base_url = base_url;
        Ok(client)
    }

    /// Create a client from the loaded configuration, reading the API key
    /// from the environment.
    pub fn from_config(config: &crate::config::Config) -> Result<Self, GeminiError> {
        let mut client = Self::new()?;
        if let Some(base_url) = &config.api.base_url {
            client.base_url = base_url.clone();
        }
        if let Some(model) = &config.api.text_model {
            client.models.text = model.clone();
        }
        if let Some(model) = &config.api.image_model {
            client.models.image = model.clone();
        }
        if let Some(model) = &config.api.video_model {
            client.models.video = model.clone();
        }
        client.poll = config.video.poll_policy();
        Ok(client)
    }

    /// Replace the video polling policy.
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Rewrite a prompt to be more vivid and surreal.
    ///
    /// Best-effort: on any failure (transport, provider error, empty or
    /// malformed response) the original prompt is returned unchanged and
    /// the failure is only logged. This operation never errors.
    pub async fn enhance_prompt(&self, prompt: &str) -> String {
        match self.request_enhancement(prompt).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => {
                log::warn!("prompt enhancement returned no text, keeping original");
                prompt.to_string()
            }
            Err(err) => {
                log::warn!("prompt enhancement failed: {}", err);
                prompt.to_string()
            }
        }
    }

    async fn request_enhancement(&self, prompt: &str) -> Result<String, GeminiError> {
        let instruction = format!(
            "You are a surrealist art director. Rewrite the following prompt to be \
             more vivid, futuristic, and surreal. Keep it concise but descriptive.\n\
             Original prompt: \"{}\"\n\n\
             Return ONLY the improved prompt text.",
            prompt
        );

        let response = self
            .generate_content(&self.models.text, vec![Part::text(instruction)])
            .await?;

        let text = first_text_part(response).unwrap_or_default();
        Ok(text.trim().to_string())
    }

    /// Generate an image, or edit the supplied reference image.
    ///
    /// With a reference image the request carries the image bytes plus an
    /// editing instruction blended from the prompt; without one it carries
    /// the prompt plus a fixed style suffix. Exactly one of the two
    /// branches is taken.
    ///
    /// Returns the first inline image payload wrapped into a
    /// `data:image/png;base64,` URI.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::EmptyPrompt` for a blank prompt,
    /// `GeminiError::NoImageReturned` if the response carries no inline
    /// image, `GeminiError::Api` for provider error responses, or
    /// `GeminiError::Http` for transport failures. Never retries.
    pub async fn generate_image(
        &self,
        prompt: &str,
        reference: Option<&ReferenceImage>,
    ) -> Result<String, GeminiError> {
        validate_prompt(prompt)?;

        let parts = match reference {
            Some(image) => vec![
                Part::inline(image),
                Part::text(format!(
                    "Transform this image based on the prompt: {}. \
                     Maintain a surreal, futuristic aesthetic.",
                    prompt
                )),
            ],
            None => vec![Part::text(format!(
                "{}. Style: {}.",
                prompt, IMAGE_STYLE_SUFFIX
            ))],
        };

        let response = self.generate_content(&self.models.image, parts).await?;

        let payload = first_inline_part(response).ok_or(GeminiError::NoImageReturned)?;
        Ok(format!("data:image/png;base64,{}", payload.data))
    }

    /// Generate a video from a text prompt.
    ///
    /// Fails fast with `GeminiError::CredentialRequired` when the gate
    /// reports no usable credential. Otherwise submits a long-running job
    /// and polls its status on a fixed interval until it completes, times
    /// out against the poll ceiling, or the returned locator is missing.
    ///
    /// The returned locator carries the caller's API key as a query
    /// parameter so the media can be fetched directly.
    pub async fn generate_video(
        &self,
        prompt: &str,
        gate: &KeyGate,
    ) -> Result<String, GeminiError> {
        self.generate_video_with_cancel(prompt, gate, &CancellationToken::new())
            .await
    }

    /// Like `generate_video`, but abandons the poll loop when `cancel`
    /// fires, returning `GeminiError::Cancelled`.
    pub async fn generate_video_with_cancel(
        &self,
        prompt: &str,
        gate: &KeyGate,
        cancel: &CancellationToken,
    ) -> Result<String, GeminiError> {
        validate_prompt(prompt)?;

        if !gate.has_credential().await {
            return Err(GeminiError::CredentialRequired);
        }

        let mut operation = self.submit_video_job(prompt).await?;
        log::info!("video job submitted, operation: {}", operation.name);

        let mut polls = 0u32;
        while !operation.done {
            if polls >= self.poll.max_polls {
                log::error!(
                    "video job {} still running after {} status checks, giving up",
                    operation.name,
                    polls
                );
                return Err(GeminiError::JobTimedOut { polls });
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("video job {} cancelled while polling", operation.name);
                    return Err(GeminiError::Cancelled);
                }
                _ = tokio::time::sleep(self.poll.interval) => {}
            }

            operation = self.fetch_operation(&operation.name).await?;
            polls += 1;
            log::debug!(
                "poll {} for {}: done={}",
                polls,
                operation.name,
                operation.done
            );
        }

        if let Some(error) = operation.error {
            return Err(GeminiError::Api(format!(
                "video generation failed: {} (code {})",
                error.message, error.code
            )));
        }

        let uri = operation
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .map(|sample| sample.video.uri)
            .ok_or(GeminiError::NoVideoUri)?;

        Ok(with_key_param(&uri, &self.api_key))
    }

    async fn generate_content(
        &self,
        model: &str,
        parts: Vec<Part>,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = GenerateContentRequest {
            contents: vec![Content { parts }],
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        read_json(response).await
    }

    async fn submit_video_job(&self, prompt: &str) -> Result<Operation, GeminiError> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.base_url, self.models.video
        );
        let body = VideoJobRequest {
            instances: vec![VideoInstance {
                prompt: format!("{}. {}.", prompt, VIDEO_STYLE_SUFFIX),
            }],
            parameters: VideoParameters {
                sample_count: 1,
                resolution: "720p".to_string(),
                aspect_ratio: "16:9".to_string(),
            },
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        read_json(response).await
    }

    async fn fetch_operation(&self, name: &str) -> Result<Operation, GeminiError> {
        let url = format!("{}/{}", self.base_url, name);

        let response = self
            .http_client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        read_json(response).await
    }
}

fn build_http_client() -> Result<reqwest::Client, GeminiError> {
    Ok(reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()?)
}

/// Turn a non-2xx response into `GeminiError::Api`, otherwise decode the
/// body as JSON.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GeminiError> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(GeminiError::Api(format!(
            "API request failed with status {}: {}",
            status, error_text
        )));
    }
    Ok(response.json().await?)
}

fn first_text_part(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.text))
}

fn first_inline_part(response: GenerateContentResponse) -> Option<InlineData> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
}

/// Errors that can occur during provider operations.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("API key not configured")]
    MissingApiKey,

    /// Video generation requires a user-selected key; the key gate said
    /// there is none. Surfaced as the blocked UI state, never as a plain
    /// error message.
    #[error("a user-selected API key is required for video generation")]
    CredentialRequired,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("no image data returned by the model")]
    NoImageReturned,

    #[error("video generation completed but no URI returned")]
    NoVideoUri,

    #[error("video job timed out after {polls} status checks")]
    JobTimedOut {
        /// Number of status checks made before giving up.
        polls: u32,
    },

    #[error("video generation cancelled")]
    Cancelled,

    #[error("empty prompt")]
    EmptyPrompt,
}
