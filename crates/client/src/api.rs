//! Backend API client over reqwest.

use std::path::Path;

use proto::{ApiError, HistoryPage, ModelList, SendReply, SessionId};
use reqwest::multipart::{Form, Part};
use tracing::debug;

/// Sampling temperature used when a request does not specify one.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// A file staged for upload alongside a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Original file name, preserved in the multipart part.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Reads a file from disk into an attachment, keeping its file name.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = std::fs::read(path)?;
        Ok(Self { filename, bytes })
    }
}

/// One outgoing chat message with its full request context.
#[derive(Debug, Clone)]
pub struct SendRequest {
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// Target model id.
    pub model: String,
    /// Raw message text, passed through verbatim.
    pub message: String,
    /// Whether the backend should apply its server-side system instruction.
    pub use_system: bool,
    /// Sampling temperature; [`DEFAULT_TEMPERATURE`] when unset.
    pub temperature: Option<f32>,
    /// Files uploaded with the message.
    pub attachments: Vec<Attachment>,
}

/// HTTP client for the chat backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    /// Creates a client for the given backend base URL and API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Fetches the list of available model identifiers.
    ///
    /// No fallback happens here: transport and parse failures are returned
    /// for the caller to handle.
    pub async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/api/models", self.base_url);
        debug!(url = %url, "Fetching model list");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        Ok(list.models)
    }

    /// Fetches the conversation history for a session.
    ///
    /// A non-success HTTP status reads as an empty history rather than an
    /// error; only network failures and undecodable bodies are returned.
    pub async fn fetch_history(&self, session_id: &SessionId) -> Result<HistoryPage, ApiError> {
        let url = format!("{}/api/history", self.base_url);
        debug!(url = %url, session = %session_id, "Fetching history");

        let response = self
            .http
            .get(&url)
            .query(&[("session_id", session_id.as_str())])
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            debug!(status = %response.status().as_u16(), "History fetch returned non-success, treating as empty");
            return Ok(HistoryPage::default());
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// Sends one message (text plus attachments) and returns the backend
    /// reply verbatim.
    ///
    /// The HTTP status is not inspected: a non-2xx body that still parses as
    /// a reply is a normal, error-bearing reply for the caller to interpret.
    pub async fn send_message(&self, req: SendRequest) -> Result<SendReply, ApiError> {
        let url = format!("{}/api/send", self.base_url);
        let temperature = req.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        debug!(
            url = %url,
            session = %req.session_id,
            model = %req.model,
            use_system = %req.use_system,
            attachments = %req.attachments.len(),
            "Sending message"
        );

        let mut form = Form::new()
            .text("session_id", req.session_id.as_str().to_string())
            .text("model", req.model)
            .text("message", req.message)
            .text("use_system", req.use_system.to_string())
            .text("temperature", temperature.to_string());
        for attachment in req.attachments {
            let part = Part::bytes(attachment.bytes).file_name(attachment.filename);
            form = form.part("files", part);
        }

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!(status = %status.as_u16(), "Send response received");

        serde_json::from_str(&body).map_err(|e| {
            ApiError::InvalidResponse(format!(
                "Deserialization error: {e}; body: {}",
                body.chars().take(200).collect::<String>()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn attachment_from_path_keeps_file_name_and_bytes() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("notes.txt");
        let mut file = std::fs::File::create(&path).expect("create file");
        file.write_all(b"attachment body").expect("write file");

        let attachment = Attachment::from_path(&path).expect("read attachment");
        assert_eq!(attachment.filename, "notes.txt");
        assert_eq!(attachment.bytes, b"attachment body");
    }

    #[test]
    fn attachment_from_missing_path_is_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("does-not-exist.bin");
        assert!(Attachment::from_path(&path).is_err());
    }

    #[test]
    fn default_temperature_matches_backend_default() {
        assert_eq!(DEFAULT_TEMPERATURE, 0.1);
    }

    #[test]
    fn send_request_debug_format_includes_model() {
        let req = SendRequest {
            session_id: SessionId::from("s1"),
            model: "gemini-2.5-pro".to_string(),
            message: "hi".to_string(),
            use_system: false,
            temperature: None,
            attachments: Vec::new(),
        };
        let debug = format!("{req:?}");
        assert!(debug.contains("gemini-2.5-pro"));
    }
}
