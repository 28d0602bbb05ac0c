//! Gemini API client
//!
//! Direct HTTP client for the Gemini REST API. Implements `ProviderClient`
//! on top of `generateContent`, `predict`, `predictLongRunning`, and the
//! Files API.

use crate::config::ProviderConfig;
use crate::provider::gemini_types::{
    extract_video_uri, Content, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, LongRunningOperation, Part, PrebuiltVoiceConfig, PredictResponse,
    SpeechConfig, ThinkingConfig, UploadFileResponse, VoiceConfig,
};
use crate::provider::types::{
    AspectRatio, ChatTurn, Credential, InlineData, Operation, OperationFailure, ProviderError,
    ResponsePart, UploadedFileHandle, VideoAspectRatio,
};
use crate::provider::{ChatSession, ProviderClient};
use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Gemini implementation of `ProviderClient`
///
/// Cheap to clone; the HTTP connection pool is shared.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: Arc<ProviderConfig>,
    credential: Credential,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_base_url", &self.config.api_base_url)
            .field("credential", &self.credential)
            .finish()
    }
}

impl GeminiClient {
    /// Create a client bound to one credential
    ///
    /// # Errors
    /// * Returns `ProviderError` if the credential is blank.
    pub fn new(
        http: reqwest::Client,
        config: ProviderConfig,
        credential: Credential,
    ) -> Result<Self, ProviderError> {
        if credential.is_empty() {
            return Err(ProviderError::new("API key is empty"));
        }
        Ok(Self {
            http,
            config: Arc::new(config),
            credential,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.api_base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    fn resource_url(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            name.trim_start_matches('/')
        )
    }

    /// Attach credential and timeout, send, and turn non-2xx into errors
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = request
            .query(&[("key", self.credential.expose())])
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(ProviderError::transport)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        tracing::debug!(url = %url, "Calling Gemini API");
        let response = self.send(self.http.post(url).json(body)).await?;
        parse_json(response).await
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ProviderError> {
        let url = self.model_url(model, "generateContent");
        let parsed: GenerateContentResponse = self.post_json(&url, request).await?;

        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
        {
            return Err(ProviderError::new(format!(
                "Gemini API blocked the prompt: {}",
                reason
            )));
        }

        Ok(parsed)
    }

    async fn generate_single_text(
        &self,
        model: &str,
        parts: Vec<Part>,
        generation_config: Option<GenerationConfig>,
    ) -> Result<String, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content { role: None, parts }],
            generation_config,
        };
        let response = self.generate_content(model, &request).await?;
        response_text(response)
    }
}

/// Build a `ProviderError` from a non-2xx response, keeping the provider's
/// structured status when the body carries one
async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error body".to_string());

    tracing::error!(
        status_code = status,
        error_body = %body,
        "Gemini API returned error status"
    );

    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => ProviderError::http(
            status,
            envelope.error.status,
            envelope
                .error
                .message
                .unwrap_or_else(|| format!("Gemini API returned error status {}", status)),
        ),
        Err(_) => ProviderError::http(
            status,
            None,
            format!("Gemini API returned error status {}: {}", status, body),
        ),
    }
}

async fn parse_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, ProviderError> {
    let body = response.text().await.map_err(ProviderError::transport)?;
    serde_json::from_str(&body).map_err(|e| {
        ProviderError::decode(format!("{} - Response body: {}", e, body))
    })
}

fn first_candidate_parts(response: GenerateContentResponse) -> Result<Vec<Part>, ProviderError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::new("Gemini API response contains no candidates"))?;
    Ok(candidate.content.map(|c| c.parts).unwrap_or_default())
}

/// Concatenate the text parts of the first candidate
fn response_text(response: GenerateContentResponse) -> Result<String, ProviderError> {
    let text: String = first_candidate_parts(response)?
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.is_empty() {
        return Err(ProviderError::new("Gemini API response text is empty"));
    }
    Ok(text)
}

fn response_parts(response: GenerateContentResponse) -> Result<Vec<ResponsePart>, ProviderError> {
    Ok(first_candidate_parts(response)?
        .into_iter()
        .map(|p| ResponsePart {
            text: p.text,
            inline_data: p.inline_data.map(|b| InlineData {
                mime_type: b.mime_type,
                data: b.data,
            }),
        })
        .collect())
}

fn to_operation(raw: LongRunningOperation) -> Operation {
    let result_uri = raw.response.as_ref().and_then(extract_video_uri);
    Operation {
        name: raw.name,
        done: raw.done,
        result_uri,
        error: raw.error.map(|e| OperationFailure {
            code: e.code,
            message: e
                .message
                .unwrap_or_else(|| "Video generation failed".to_string()),
        }),
    }
}

#[async_trait]
impl ProviderClient for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        self.generate_single_text(&self.config.models.text, vec![Part::text(prompt)], None)
            .await
    }

    fn create_chat(&self, history: Vec<ChatTurn>) -> Box<dyn ChatSession> {
        Box::new(GeminiChatSession {
            client: self.clone(),
            history,
        })
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Option<String>, ProviderError> {
        let url = self.model_url(&self.config.models.image, "predict");
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": aspect_ratio.as_str(),
                "outputMimeType": "image/jpeg",
            }
        });
        let parsed: PredictResponse = self.post_json(&url, &body).await?;
        Ok(parsed
            .predictions
            .into_iter()
            .find_map(|p| p.bytes_base64_encoded))
    }

    async fn generate_video(
        &self,
        prompt: &str,
        image: Option<(&[u8], &str)>,
        aspect_ratio: VideoAspectRatio,
    ) -> Result<Operation, ProviderError> {
        let url = self.model_url(&self.config.models.video, "predictLongRunning");
        let mut instance = json!({ "prompt": prompt });
        if let Some((bytes, mime_type)) = image {
            instance["image"] = json!({
                "bytesBase64Encoded": base64::engine::general_purpose::STANDARD.encode(bytes),
                "mimeType": mime_type,
            });
        }
        let body = json!({
            "instances": [instance],
            "parameters": {
                "aspectRatio": aspect_ratio.as_str(),
                "sampleCount": 1,
            }
        });
        let raw: LongRunningOperation = self.post_json(&url, &body).await?;
        tracing::debug!(operation = %raw.name, "Video generation submitted");
        Ok(to_operation(raw))
    }

    async fn poll_video_operation(
        &self,
        operation: &Operation,
    ) -> Result<Operation, ProviderError> {
        let url = self.resource_url(&operation.name);
        let response = self.send(self.http.get(&url)).await?;
        let raw: LongRunningOperation = parse_json(response).await?;
        Ok(to_operation(raw))
    }

    async fn fetch_video_bytes(&self, result_uri: &str) -> Result<Vec<u8>, ProviderError> {
        let url = reqwest::Url::parse(result_uri)
            .map_err(|e| ProviderError::new(format!("Invalid video URI: {}", e)))?;
        // `send` appends the key, which the download link requires.
        let response = self.send(self.http.get(url)).await?;
        let bytes = response.bytes().await.map_err(ProviderError::transport)?;
        Ok(bytes.to_vec())
    }

    async fn edit_image(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<Vec<ResponsePart>, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![
                    Part::inline(
                        mime_type,
                        base64::engine::general_purpose::STANDARD.encode(image),
                    ),
                    Part::text(prompt),
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["IMAGE".to_string(), "TEXT".to_string()]),
                ..Default::default()
            }),
        };
        let response = self
            .generate_content(&self.config.models.image_edit, &request)
            .await?;
        response_parts(response)
    }

    async fn upload_file(
        &self,
        bytes: &[u8],
        mime_type: &str,
        display_name: &str,
    ) -> Result<UploadedFileHandle, ProviderError> {
        use reqwest::multipart::{Form, Part as FormPart};

        let url = format!(
            "{}/files",
            self.config.upload_base_url.trim_end_matches('/')
        );
        let metadata = json!({ "file": { "display_name": display_name } }).to_string();
        let form = Form::new()
            .part(
                "metadata",
                FormPart::text(metadata)
                    .mime_str("application/json")
                    .map_err(ProviderError::transport)?,
            )
            .part(
                "file",
                FormPart::bytes(bytes.to_vec())
                    .file_name(display_name.to_string())
                    .mime_str(mime_type)
                    .map_err(ProviderError::transport)?,
            );

        tracing::debug!(
            url = %url,
            size = bytes.len(),
            mime_type = %mime_type,
            "Uploading file to Gemini"
        );

        let response = self
            .send(
                self.http
                    .post(&url)
                    .header("X-Goog-Upload-Protocol", "multipart")
                    .multipart(form),
            )
            .await?;
        let uploaded: UploadFileResponse = parse_json(response).await?;

        Ok(UploadedFileHandle {
            remote_name: uploaded.file.name,
            remote_uri: uploaded.file.uri,
            mime_type: uploaded
                .file
                .mime_type
                .unwrap_or_else(|| mime_type.to_string()),
        })
    }

    async fn delete_file(&self, remote_name: &str) -> Result<(), ProviderError> {
        let url = self.resource_url(remote_name);
        self.send(self.http.delete(&url)).await?;
        Ok(())
    }

    async fn generate_content_from_file(
        &self,
        file: &UploadedFileHandle,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        self.generate_single_text(
            &self.config.models.text,
            vec![
                Part::file(&file.mime_type, &file.remote_uri),
                Part::text(prompt),
            ],
            None,
        )
        .await
    }

    async fn generate_with_reasoning(
        &self,
        prompt: &str,
        reasoning_budget: u32,
    ) -> Result<String, ProviderError> {
        self.generate_single_text(
            &self.config.models.reasoning,
            vec![Part::text(prompt)],
            Some(GenerationConfig {
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: reasoning_budget,
                }),
                ..Default::default()
            }),
        )
        .await
    }

    async fn text_to_speech(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<Vec<ResponsePart>, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![Part::text(text)],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                }),
                ..Default::default()
            }),
        };
        let response = self.generate_content(&self.config.models.tts, &request).await?;
        response_parts(response)
    }
}

/// Chat held against `generateContent` by resending the full history
pub struct GeminiChatSession {
    client: GeminiClient,
    history: Vec<ChatTurn>,
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    async fn send(&mut self, message: &str) -> Result<String, ProviderError> {
        let mut contents: Vec<Content> = self
            .history
            .iter()
            .map(|turn| Content {
                role: Some(turn.role.as_str().to_string()),
                parts: vec![Part::text(&turn.text)],
            })
            .collect();
        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![Part::text(message)],
        });

        let request = GenerateContentRequest {
            contents,
            generation_config: None,
        };
        let response = self
            .client
            .generate_content(&self.client.config.models.chat, &request)
            .await?;
        let reply = response_text(response)?;

        self.history.push(ChatTurn::user(message));
        self.history.push(ChatTurn::model(&reply));
        Ok(reply)
    }

    fn history(&self) -> &[ChatTurn] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    fn client_for(server: &Server) -> GeminiClient {
        GeminiClient::new(
            reqwest::Client::new(),
            ProviderConfig::with_base_url(&server.url()),
            Credential::new("test-key"),
        )
        .unwrap()
    }

    fn key_matcher() -> Matcher {
        Matcher::UrlEncoded("key".into(), "test-key".into())
    }

    #[test]
    fn test_new_rejects_empty_api_key() {
        let result = GeminiClient::new(
            reqwest::Client::new(),
            ProviderConfig::default(),
            Credential::new("  "),
        );
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key is empty"));
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_text_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(
                r#"{
                    "candidates": [{
                        "content": {
                            "parts": [{"text": "Hello "}, {"text": "world"}],
                            "role": "model"
                        }
                    }]
                }"#,
            )
            .create_async()
            .await;

        let result = client_for(&server).generate_text("say hello").await;

        mock.assert_async().await;
        assert_eq!(result.unwrap(), "Hello world");
    }

    #[tokio::test]
    #[serial]
    async fn test_blocked_prompt() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .with_status(200)
            .with_body(r#"{"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}}"#)
            .create_async()
            .await;

        let result = client_for(&server).generate_text("test prompt").await;

        mock.assert_async().await;
        let error_msg = result.unwrap_err().to_string();
        assert!(
            error_msg.contains("blocked the prompt"),
            "Error message should contain 'blocked the prompt', got: {}",
            error_msg
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_empty_candidates() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .with_status(200)
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let result = client_for(&server).generate_text("test prompt").await;

        mock.assert_async().await;
        assert!(result.unwrap_err().to_string().contains("no candidates"));
    }

    #[tokio::test]
    #[serial]
    async fn test_entity_not_found_keeps_structured_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/veo-2.0-generate-001:predictLongRunning")
            .match_query(key_matcher())
            .with_status(404)
            .with_body(
                r#"{"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}"#,
            )
            .create_async()
            .await;

        let result = client_for(&server)
            .generate_video("a cat", None, VideoAspectRatio::Landscape)
            .await;

        mock.assert_async().await;
        let err = result.unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(err.code.as_deref(), Some("NOT_FOUND"));
        assert_eq!(err.message, "Requested entity was not found.");
        assert!(err.is_entity_not_found());
    }

    #[tokio::test]
    #[serial]
    async fn test_rate_limit_is_plain_provider_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .with_status(429)
            .with_body(r#"{"error": "Rate limit exceeded"}"#)
            .create_async()
            .await;

        let result = client_for(&server).generate_text("test prompt").await;

        mock.assert_async().await;
        let err = result.unwrap_err();
        assert_eq!(err.status, Some(429));
        assert!(err.to_string().contains("429"));
        assert!(!err.is_entity_not_found());
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_json() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .with_status(200)
            .with_body("This is not JSON")
            .create_async()
            .await;

        let result = client_for(&server).generate_text("test prompt").await;

        mock.assert_async().await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to decode provider response"));
    }

    #[tokio::test]
    #[serial]
    async fn test_generate_image_sends_aspect_ratio() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/imagen-4.0-generate-001:predict")
            .match_query(key_matcher())
            .match_body(Matcher::PartialJson(json!({
                "parameters": {"aspectRatio": "16:9", "outputMimeType": "image/jpeg"}
            })))
            .with_status(200)
            .with_body(r#"{"predictions": [{"bytesBase64Encoded": "/9j/AAAA", "mimeType": "image/jpeg"}]}"#)
            .create_async()
            .await;

        let result = client_for(&server)
            .generate_image("a lighthouse", AspectRatio::Widescreen)
            .await;

        mock.assert_async().await;
        assert_eq!(result.unwrap().as_deref(), Some("/9j/AAAA"));
    }

    #[tokio::test]
    #[serial]
    async fn test_poll_video_operation_extracts_uri() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/operations/op-1")
            .match_query(key_matcher())
            .with_status(200)
            .with_body(
                r#"{
                    "name": "operations/op-1",
                    "done": true,
                    "response": {"generateVideoResponse": {"generatedSamples": [{"video": {"uri": "https://example.com/v.mp4?alt=media"}}]}}
                }"#,
            )
            .create_async()
            .await;

        let op = client_for(&server)
            .poll_video_operation(&Operation::pending("operations/op-1"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(op.done);
        assert_eq!(
            op.result_uri.as_deref(),
            Some("https://example.com/v.mp4?alt=media")
        );
        assert!(op.error.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_fetch_video_bytes_appends_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/download/v.mp4")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("alt".into(), "media".into()),
                key_matcher(),
            ]))
            .with_status(200)
            .with_body(vec![0u8, 1, 2, 3])
            .create_async()
            .await;

        let uri = format!("{}/download/v.mp4?alt=media", server.url());
        let bytes = client_for(&server).fetch_video_bytes(&uri).await.unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, vec![0u8, 1, 2, 3]);
    }

    #[tokio::test]
    #[serial]
    async fn test_upload_and_delete_file() {
        let mut server = Server::new_async().await;
        let upload = server
            .mock("POST", "/upload/files")
            .match_query(key_matcher())
            .match_header("x-goog-upload-protocol", "multipart")
            .with_status(200)
            .with_body(
                r#"{"file": {"name": "files/abc", "uri": "https://files.example/abc", "mimeType": "video/mp4"}}"#,
            )
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/files/abc")
            .match_query(key_matcher())
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = client_for(&server);
        let handle = client
            .upload_file(b"fake video", "video/mp4", "clip.mp4")
            .await
            .unwrap();
        client.delete_file(&handle.remote_name).await.unwrap();

        upload.assert_async().await;
        delete.assert_async().await;
        assert_eq!(handle.remote_name, "files/abc");
        assert_eq!(handle.remote_uri, "https://files.example/abc");
        assert_eq!(handle.mime_type, "video/mp4");
    }

    #[tokio::test]
    #[serial]
    async fn test_text_to_speech_returns_inline_parts() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash-preview-tts:generateContent")
            .match_query(key_matcher())
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {"voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Puck"}}}
                }
            })))
            .with_status(200)
            .with_body(
                r#"{"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AAAA"}}], "role": "model"}}]}"#,
            )
            .create_async()
            .await;

        let parts = client_for(&server)
            .text_to_speech("hello", "Puck")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].inline_data.as_ref().unwrap().data, "AAAA");
    }

    #[tokio::test]
    #[serial]
    async fn test_chat_session_resends_history_and_alternates() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"role": "user", "parts": [{"text": "hi"}]}]
            })))
            .with_status(200)
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "hello!"}], "role": "model"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let mut session = client.create_chat(Vec::new());
        let reply = session.send("hi").await.unwrap();
        first.assert_async().await;
        assert_eq!(reply, "hello!");

        let second = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .match_body(Matcher::PartialJson(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello!"}]},
                    {"role": "user", "parts": [{"text": "how are you"}]}
                ]
            })))
            .with_status(200)
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "fine"}], "role": "model"}}]}"#)
            .create_async()
            .await;

        session.send("how are you").await.unwrap();
        second.assert_async().await;

        let history = session.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], ChatTurn::user("hi"));
        assert_eq!(history[1], ChatTurn::model("hello!"));
        assert_eq!(history[2], ChatTurn::user("how are you"));
        assert_eq!(history[3], ChatTurn::model("fine"));
    }

    #[tokio::test]
    #[serial]
    async fn test_failed_chat_turn_leaves_history_untouched() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(key_matcher())
            .with_status(500)
            .with_body(r#"{"error": {"code": 500, "message": "internal", "status": "INTERNAL"}}"#)
            .create_async()
            .await;

        let mut session = client_for(&server).create_chat(vec![
            ChatTurn::user("earlier"),
            ChatTurn::model("reply"),
        ]);
        let result = session.send("again").await;

        mock.assert_async().await;
        assert!(result.is_err());
        assert_eq!(session.history().len(), 2);
    }
}
