//! Reqwest-based transport speaking the KodeRunr HTTP API.

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use tracing::{debug, info};

use super::{
    chunk::ChunkDecoder, OutputChunk, OutputStream, Runnable, SessionToken, SnapshotBody, SnapshotId,
    Transport, TransportError,
};
use crate::config::Config;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    site: String,
    api: String,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn from_config(cfg: &Config) -> Result<Self, TransportError> {
        Self::new(&cfg.endpoint(), cfg.connect_timeout(), cfg.request_timeout())
    }

    /// `endpoint` is the site root; API calls go to `<endpoint>api/`.
    pub fn new(endpoint: &str, connect_timeout: Duration, request_timeout: Duration) -> Result<Self, TransportError> {
        let site = format!("{}/", endpoint.trim_end_matches('/'));
        let api = format!("{}api/", site);

        // No client-wide timeout: the output subscription stays open as long as the program runs.
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self { http, site, api, request_timeout })
    }

    /// Browser URL that opens a saved snapshot.
    pub fn share_url(&self, id: &SnapshotId) -> String {
        format!("{}#{}", self.site, id)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api, path)
    }
}

async fn checked(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(TransportError::Status { status: status.as_u16(), body: body.trim().to_string() })
}

fn output_stream(resp: reqwest::Response) -> impl Stream<Item = Result<OutputChunk, TransportError>> + Send {
    try_stream! {
        let mut decoder = ChunkDecoder::new();
        let mut body = Box::pin(resp.bytes_stream());
        while let Some(bytes) = body.next().await {
            let bytes = bytes?;
            if let Some(text) = decoder.feed(&bytes) {
                yield OutputChunk(text);
            }
        }
        if let Some(text) = decoder.finish() {
            yield OutputChunk(text);
        }
    }
}

async fn text_id(resp: reqwest::Response, what: &'static str) -> Result<String, TransportError> {
    let body = checked(resp).await?.text().await?;
    let id = body.trim();
    if id.is_empty() {
        return Err(TransportError::Empty(what));
    }
    Ok(id.to_string())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn register(&self, runnable: &Runnable) -> Result<SessionToken, TransportError> {
        let resp = self
            .http
            .post(self.url("register/"))
            .form(&runnable.form())
            .timeout(self.request_timeout)
            .send()
            .await?;
        let token = text_id(resp, "session token").await?;
        info!(language = %runnable.language, token = %token, "registered run");
        Ok(SessionToken::new(token))
    }

    async fn subscribe(&self, token: &SessionToken) -> Result<OutputStream, TransportError> {
        let resp = self
            .http
            .get(self.url("run/"))
            .query(&[("uuid", token.as_str())])
            .send()
            .await?;
        let resp = checked(resp).await?;
        debug!(token = %token, "output stream open");

        Ok(Box::pin(output_stream(resp)))
    }

    async fn send_input(&self, token: &SessionToken, line: &str) -> Result<(), TransportError> {
        let resp = self
            .http
            .post(self.url("stdin/"))
            .form(&[("uuid", token.as_str()), ("input", line)])
            .timeout(self.request_timeout)
            .send()
            .await?;
        checked(resp).await?;
        debug!(token = %token, bytes = line.len(), "forwarded stdin line");
        Ok(())
    }

    async fn save(&self, runnable: &Runnable, existing: Option<&SnapshotId>) -> Result<SnapshotId, TransportError> {
        let mut params = runnable.form();
        if let Some(id) = existing {
            params.push(("codeID", id.as_str()));
        }
        let resp = self
            .http
            .post(self.url("save/"))
            .form(&params)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let id = text_id(resp, "snapshot id").await?;
        info!(snapshot = %id, updated = existing.is_some(), "saved snapshot");
        Ok(SnapshotId::new(id))
    }

    async fn fetch_snapshot(&self, id: &SnapshotId) -> Result<Runnable, TransportError> {
        let resp = self
            .http
            .get(self.url("fetch/"))
            .query(&[("codeID", id.as_str())])
            .timeout(self.request_timeout)
            .send()
            .await?;
        let text = checked(resp).await?.text().await?;
        let body: SnapshotBody = serde_json::from_str(&text)?;
        Ok(body.into())
    }

    async fn languages(&self) -> Result<String, TransportError> {
        let resp = self
            .http
            .get(self.url("langs/"))
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(checked(resp).await?.text().await?)
    }
}
