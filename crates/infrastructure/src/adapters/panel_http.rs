//! Panel store over HTTP.
//!
//! A stateless transport for the panel's `/open` API. Payloads pass through
//! [`crate::serialization::panel`] on the way in.

use async_trait::async_trait;
use qrslot_application::{PanelError, PanelStore, PanelToken};
use qrslot_domain::{NewRecord, PanelConfig, Record, RecordId};
use reqwest::{Client, RequestBuilder, header};
use url::Url;

use crate::serialization::{parse_ack, parse_record_list, parse_token};

/// Panel client using reqwest.
pub struct HttpPanelClient {
    client: Client,
    config: PanelConfig,
}

impl HttpPanelClient {
    /// Creates a client. Incomplete configuration is reported on first use.
    ///
    /// # Errors
    /// [`PanelError::Unreachable`] if the HTTP client cannot be built.
    pub fn new(config: &PanelConfig) -> Result<Self, PanelError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PanelError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Resolves `path` against the configured base URL.
    fn endpoint(&self, path: &str) -> Result<Url, PanelError> {
        if !self.config.is_complete() {
            return Err(PanelError::Misconfigured(self.config.missing_fields()));
        }
        let base = self.config.url.trim_end_matches('/');
        Url::parse(&format!("{base}{path}")).map_err(|e| {
            tracing::error!(url = %self.config.url, error = %e, "panel URL is invalid");
            PanelError::Misconfigured(vec!["panel.url"])
        })
    }

    /// Maps reqwest errors to panel errors.
    fn map_error(error: &reqwest::Error) -> PanelError {
        if error.is_timeout() {
            return PanelError::Timeout;
        }
        if error.is_connect() {
            return PanelError::Unreachable(error.to_string());
        }
        PanelError::Rejected(error.to_string())
    }

    /// Sends `request` and returns the body of a successful response.
    async fn send(request: RequestBuilder) -> Result<Vec<u8>, PanelError> {
        let response = request.send().await.map_err(|e| Self::map_error(&e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| Self::map_error(&e))?;
        if !status.is_success() {
            return Err(PanelError::Rejected(format!(
                "HTTP {status}: {}",
                String::from_utf8_lossy(&body)
            )));
        }
        Ok(body.to_vec())
    }

    fn authorized(request: RequestBuilder, token: &PanelToken) -> RequestBuilder {
        request.header(header::AUTHORIZATION, token.bearer())
    }
}

#[async_trait]
impl PanelStore for HttpPanelClient {
    async fn acquire_token(&self) -> Result<PanelToken, PanelError> {
        let mut url = self.endpoint("/open/auth/token")?;
        let query = serde_urlencoded::to_string([
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ])
        .map_err(|e| PanelError::Rejected(e.to_string()))?;
        url.set_query(Some(&query));

        let body = Self::send(self.client.get(url))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "panel token request failed"))?;
        let token = parse_token(&body)?;
        tracing::info!("panel access token acquired");
        Ok(token)
    }

    async fn list_records(
        &self,
        token: &PanelToken,
        search: Option<&str>,
    ) -> Result<Vec<Record>, PanelError> {
        let mut url = self.endpoint("/open/envs")?;
        if let Some(search) = search {
            url.query_pairs_mut().append_pair("searchValue", search);
        }
        let body = Self::send(Self::authorized(self.client.get(url), token)).await?;
        let records = parse_record_list(&body)?;
        tracing::debug!(count = records.len(), "panel records listed");
        Ok(records)
    }

    async fn create_records(
        &self,
        token: &PanelToken,
        records: &[NewRecord],
    ) -> Result<(), PanelError> {
        let url = self.endpoint("/open/envs")?;
        let body = Self::send(Self::authorized(self.client.post(url), token).json(records)).await?;
        parse_ack(&body)
    }

    async fn update_record(&self, token: &PanelToken, record: &Record) -> Result<(), PanelError> {
        let url = self.endpoint("/open/envs")?;
        let body = Self::send(Self::authorized(self.client.put(url), token).json(record)).await?;
        parse_ack(&body)
    }

    async fn delete_records(&self, token: &PanelToken, ids: &[RecordId]) -> Result<(), PanelError> {
        let url = self.endpoint("/open/envs")?;
        let body = Self::send(Self::authorized(self.client.delete(url), token).json(ids)).await?;
        parse_ack(&body)
    }
}
