//! reqwest implementation of [`PersistenceGateway`].

use super::{DocumentSummary, GatewayError, PersistenceGateway};
use inkdraft_core::models::document::{
    normalize_title, Collaborator, CollaboratorsEnvelope, CreatedEnvelope, DataEnvelope, Document,
    DocumentRecord, InviteRequest, SaveDocumentRequest,
};
use inkdraft_core::{Config, ExportFormat};
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Document store client rooted at the configured API base URL.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpGateway {
    /// Build a gateway from runtime configuration.
    ///
    /// # Errors
    /// [`GatewayError::InvalidUrl`] when the server URL cannot serve as an API
    /// base; [`GatewayError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let server = config.server_url.trim();
        let base = Url::parse(server)
            .map_err(|err| GatewayError::InvalidUrl(format!("'{}': {}", server, err)))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(format!(
                "'{}' cannot be used as an API base",
                server
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self {
            client,
            base,
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append percent-encoded path segments to the base URL.
    pub fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        let mut path = url.path_segments_mut().map_err(|_| {
            GatewayError::InvalidUrl("server URL cannot be used as an API base".to_string())
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
        drop(path);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, GatewayError> {
        let url = self.url(segments)?;
        debug!(%method, %url, "document store request");
        let builder = self.client.request(method, url);
        Ok(match self.token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }
}

/// Pick a readable message out of an error body.
///
/// Prefers a JSON `message` field, then `error`, then the raw body, then the
/// status reason.
pub fn error_message_for_response(status: StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return ["message", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str))
            .unwrap_or(body)
            .to_string();
    }

    body.to_string()
}

async fn ensure_success(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::NOT_FOUND => return Err(GatewayError::NotFound),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(GatewayError::Unauthorized),
        _ => {}
    }
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => format!("failed to read error response body: {}", err),
    };
    Err(GatewayError::Status {
        status: status.as_u16(),
        message: error_message_for_response(status, &body),
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| GatewayError::Decode(err.to_string()))
}

impl PersistenceGateway for HttpGateway {
    async fn fetch(&self, id: &str) -> Result<Document, GatewayError> {
        let response = self.request(Method::GET, &["document", id])?.send().await?;
        let envelope: DataEnvelope<DocumentRecord> = decode(ensure_success(response).await?).await?;
        Ok(Document::from_record(envelope.data, id)?)
    }

    async fn update(&self, id: &str, request: &SaveDocumentRequest) -> Result<(), GatewayError> {
        let response = self
            .request(Method::PUT, &["document", id])?
            .json(request)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn create(&self, request: &SaveDocumentRequest) -> Result<String, GatewayError> {
        let response = self
            .request(Method::POST, &["document"])?
            .json(request)
            .send()
            .await?;
        let envelope: CreatedEnvelope = decode(ensure_success(response).await?).await?;
        envelope
            .created_id()
            .ok_or_else(|| GatewayError::Decode("create response missing document id".to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        let response = self.request(Method::DELETE, &["document", id])?.send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DocumentSummary>, GatewayError> {
        let response = self.request(Method::GET, &["document"])?.send().await?;
        let envelope: DataEnvelope<Vec<DocumentRecord>> =
            decode(ensure_success(response).await?).await?;
        envelope
            .data
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let id = record.id.ok_or_else(|| {
                    GatewayError::Decode(format!("list item {} missing '_id'", index))
                })?;
                Ok(DocumentSummary {
                    id,
                    title: normalize_title(record.title.as_deref().unwrap_or_default()),
                    created_at: record.created_at,
                })
            })
            .collect()
    }

    async fn download_docx(&self, id: &str) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .request(Method::GET, &["document", id, "download"])?
            .header(ACCEPT, ExportFormat::Docx.mime_type())
            .send()
            .await?;
        let bytes = ensure_success(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn invite(&self, id: &str, emails: &[String]) -> Result<Vec<Collaborator>, GatewayError> {
        let body = InviteRequest {
            emails: emails.to_vec(),
        };
        let response = self
            .request(Method::POST, &["document", id, "collaborators"])?
            .json(&body)
            .send()
            .await?;
        let envelope: CollaboratorsEnvelope = decode(ensure_success(response).await?).await?;
        Ok(envelope.into_list())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(server: &str) -> HttpGateway {
        HttpGateway::new(&Config {
            server_url: server.to_string(),
            ..Config::default()
        })
        .expect("gateway")
    }

    #[test]
    fn url_appends_encoded_segments_to_base_path() {
        let gateway = gateway("https://localhost:8000/api/v1/");
        let url = gateway
            .url(&["document", "id/with?reserved#chars"])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://localhost:8000/api/v1/document/id%2Fwith%3Freserved%23chars"
        );
        assert_eq!(
            gateway.url(&["document"]).expect("url").as_str(),
            "https://localhost:8000/api/v1/document"
        );
    }

    #[test]
    fn invalid_server_urls_are_rejected() {
        for server in ["not a url", "mailto:someone@example.com"] {
            let result = HttpGateway::new(&Config {
                server_url: server.to_string(),
                ..Config::default()
            });
            assert!(matches!(result, Err(GatewayError::InvalidUrl(_))), "{}", server);
        }
    }

    #[test]
    fn error_message_prefers_message_then_error_field() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            error_message_for_response(status, r#"{"message":"Title too long"}"#),
            "Title too long"
        );
        assert_eq!(
            error_message_for_response(status, r#"{"error":"Bad payload"}"#),
            "Bad payload"
        );
        assert_eq!(error_message_for_response(status, "plain text"), "plain text");
        assert_eq!(error_message_for_response(status, "  "), "Bad Request");
    }
}
