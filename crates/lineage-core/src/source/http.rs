//! HttpSourceReader - 外部サイトへの認証つき GET
//!
//! `{base_url}{ancestor_id}` を取得して本文をそのまま返します。
//! 認証情報があれば、401 の `WWW-Authenticate` に応じて Digest（なければ Basic）で再送する。
//! 非 2xx・接続失敗・タイムアウトはすべて `LineageError::Transport`。

use std::time::Duration;

use async_trait::async_trait;
use digest_auth::AuthContext;
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use tracing::debug;

use crate::config::SourceConfig;
use crate::domain::{AncestorId, LineageError};
use crate::ports::SourceReader;

pub struct HttpSourceReader {
    client: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpSourceReader {
    pub fn new(config: &SourceConfig) -> Result<Self, LineageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LineageError::Config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url_for(&self, ancestor_id: AncestorId) -> String {
        format!("{}{}", self.base_url, ancestor_id)
    }

    /// Resend the request with credentials for the scheme the server challenged with.
    async fn answer_challenge(
        &self,
        url: &str,
        username: &str,
        digest_challenge: Option<String>,
    ) -> Result<Response, LineageError> {
        let password = self.password.as_deref().unwrap_or_default();
        let request = match digest_challenge {
            Some(challenge) => {
                let authorization = digest_authorization(&challenge, url, username, password)?;
                debug!(%url, "answering digest challenge");
                self.client.get(url).header(AUTHORIZATION, authorization)
            }
            None => self.client.get(url).basic_auth(username, Some(password)),
        };
        send(request).await
    }
}

/// The first `WWW-Authenticate: Digest ...` challenge of a 401 response.
fn digest_challenge(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.trim_start().to_ascii_lowercase().starts_with("digest"))
        .map(str::to_string)
}

async fn send(request: RequestBuilder) -> Result<Response, LineageError> {
    Ok(request.send().await?)
}

/// `Authorization` value answering one `WWW-Authenticate: Digest ...` challenge for a GET.
fn digest_authorization(
    challenge: &str,
    url: &str,
    username: &str,
    password: &str,
) -> Result<String, LineageError> {
    let mut prompt = digest_auth::parse(challenge)
        .map_err(|e| LineageError::Transport(format!("digest challenge {challenge:?}: {e}")))?;
    let context = AuthContext::new(username, password, request_uri(url)?);
    let answer = prompt
        .respond(&context)
        .map_err(|e| LineageError::Transport(format!("digest response: {e}")))?;
    Ok(answer.to_header_string())
}

/// Path and query of `url`, as digest auth hashes it.
fn request_uri(url: &str) -> Result<String, LineageError> {
    let parsed =
        Url::parse(url).map_err(|e| LineageError::Config(format!("source url {url:?}: {e}")))?;
    Ok(match parsed.query() {
        Some(query) => format!("{}?{query}", parsed.path()),
        None => parsed.path().to_string(),
    })
}

#[async_trait]
impl SourceReader for HttpSourceReader {
    async fn fetch(&self, ancestor_id: AncestorId) -> Result<String, LineageError> {
        let url = self.url_for(ancestor_id);
        let mut response = send(self.client.get(&url)).await?;
        if response.status() == StatusCode::UNAUTHORIZED
            && let Some(username) = &self.username
        {
            let challenge = digest_challenge(&response);
            response = self.answer_challenge(&url, username, challenge).await?;
        }

        let body = response.error_for_status()?.text().await?;
        debug!(%ancestor_id, bytes = body.len(), "source page fetched");
        Ok(body)
    }
}
