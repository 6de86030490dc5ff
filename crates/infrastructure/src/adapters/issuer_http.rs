//! QR login issuer over HTTP.
//!
//! One request per port call, no cookie jar: session cookies are read from
//! each response's `Set-Cookie` headers and handed back to the caller, who
//! owns the per-handshake session.

use async_trait::async_trait;
use chrono::Utc;
use qrslot_application::{ChallengeGrant, IssuerApi, IssuerError, PollReply};
use qrslot_domain::{Credential, IssuerConfig, PollStatus, SetCookie};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct GenerateData {
    url: String,
    qrcode_key: String,
}

#[derive(Debug, Deserialize)]
struct PollData {
    code: Option<i64>,
}

/// Issuer client using reqwest.
pub struct HttpIssuerApi {
    client: Client,
    generate_url: Url,
    poll_url: Url,
    landing_url: Url,
}

impl HttpIssuerApi {
    /// Creates a client with browser-like default headers.
    ///
    /// # Errors
    /// [`IssuerError::Unavailable`] if an endpoint URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &IssuerConfig) -> Result<Self, IssuerError> {
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| IssuerError::Unavailable(format!("invalid issuer URL {raw}: {e}")))
        };
        let landing_url = parse(&config.landing_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        if let Ok(referer) = HeaderValue::from_str(landing_url.as_str()) {
            headers.insert(header::REFERER, referer);
        }
        if let Ok(origin) = HeaderValue::from_str(&landing_url.origin().ascii_serialization()) {
            headers.insert(header::ORIGIN, origin);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| IssuerError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            generate_url: parse(&config.generate_url)?,
            poll_url: parse(&config.poll_url)?,
            landing_url,
        })
    }

    /// Maps reqwest errors to issuer errors.
    fn map_error(error: &reqwest::Error) -> IssuerError {
        if error.is_timeout() {
            return IssuerError::Unavailable(format!("request timed out: {error}"));
        }
        if error.is_connect() {
            return IssuerError::Unavailable(format!("connection failed: {error}"));
        }
        if error.is_decode() {
            return IssuerError::MalformedResponse(error.to_string());
        }
        IssuerError::Unavailable(error.to_string())
    }

    async fn get(&self, url: Url, cookies: Option<&Credential>) -> Result<Response, IssuerError> {
        let mut request = self.client.get(url);
        if let Some(cookies) = cookies.filter(|c| !c.is_empty()) {
            request = request.header(header::COOKIE, cookies.to_cookie_header());
        }
        let response = request.send().await.map_err(|e| Self::map_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(IssuerError::Unavailable(format!("HTTP {status}")));
        }
        Ok(response)
    }

    async fn envelope<T: DeserializeOwned>(response: Response) -> Result<Envelope<T>, IssuerError> {
        let body = response.bytes().await.map_err(|e| Self::map_error(&e))?;
        serde_json::from_slice(&body).map_err(|e| IssuerError::MalformedResponse(e.to_string()))
    }
}

/// Collects the cookies a response sets, skipping ones it clears.
#[must_use]
pub fn collect_set_cookies(headers: &HeaderMap) -> Credential {
    let now = Utc::now();
    let mut credential = Credential::new();
    for cookie in headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(SetCookie::parse)
    {
        if cookie.is_removal(now) {
            credential.remove(&cookie.name);
        } else {
            credential.insert(cookie.name, cookie.value);
        }
    }
    credential
}

#[async_trait]
impl IssuerApi for HttpIssuerApi {
    async fn request_challenge(&self) -> Result<ChallengeGrant, IssuerError> {
        let response = self.get(self.generate_url.clone(), None).await?;
        let envelope: Envelope<GenerateData> = Self::envelope(response).await?;
        if envelope.code != 0 {
            tracing::error!(code = envelope.code, message = %envelope.message, "challenge request refused");
            return Err(IssuerError::Unavailable(format!(
                "issuer returned code {}: {}",
                envelope.code, envelope.message
            )));
        }
        let data = envelope
            .data
            .ok_or_else(|| IssuerError::MalformedResponse("challenge data missing".to_string()))?;
        Ok(ChallengeGrant {
            key: data.qrcode_key,
            url: data.url,
        })
    }

    async fn query_status(&self, key: &str) -> Result<PollReply, IssuerError> {
        let mut url = self.poll_url.clone();
        url.query_pairs_mut().append_pair("qrcode_key", key);
        let response = self.get(url, None).await?;
        let cookies = collect_set_cookies(response.headers());
        let envelope: Envelope<PollData> = Self::envelope(response).await?;
        let inner = envelope.data.and_then(|d| d.code);
        let status = PollStatus::from_codes(envelope.code, inner);
        if envelope.code != 0 {
            tracing::debug!(code = envelope.code, ?inner, "issuer poll returned a non-zero code");
        }
        Ok(PollReply { status, cookies })
    }

    async fn complement(&self, session: &Credential) -> Result<Credential, IssuerError> {
        let response = self.get(self.landing_url.clone(), Some(session)).await?;
        Ok(collect_set_cookies(response.headers()))
    }
}
