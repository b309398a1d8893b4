use std::sync::Arc;

use reqwest::header::{CONNECTION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::{
    config::UpstreamConfig,
    error::{RelayError, UPSTREAM_FALLBACK_MESSAGE},
    hash::{Clock, DailyHasher, HASH_TIMEZONE},
};

// ── Wire types ───────────────────────────────────────────────────────────────

/// Identity block Mikro expects on every call. `Sifre` is the daily hash.
#[derive(Debug, Serialize)]
pub struct MikroIdentity<'a> {
    #[serde(rename = "FirmaKodu", skip_serializing_if = "Option::is_none")]
    pub company_code: Option<&'a str>,
    #[serde(rename = "CalismaYili", skip_serializing_if = "Option::is_none")]
    pub fiscal_year: Option<&'a str>,
    #[serde(rename = "ApiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<&'a str>,
    #[serde(rename = "KullaniciKodu", skip_serializing_if = "Option::is_none")]
    pub user_code: Option<&'a str>,
    #[serde(rename = "Sifre")]
    pub password: String,
    #[serde(rename = "FirmaNo", skip_serializing_if = "Option::is_none")]
    pub company_no: Option<&'a str>,
    #[serde(rename = "SubeNo", skip_serializing_if = "Option::is_none")]
    pub branch_no: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct SqlEnvelope<'a> {
    #[serde(rename = "Mikro")]
    pub mikro: MikroIdentity<'a>,
    #[serde(rename = "SQLSorgu")]
    pub sql_query: &'a str,
}

// ── MikroClient ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MikroClient {
    http: reqwest::Client,
    config: Arc<UpstreamConfig>,
    hasher: DailyHasher,
}

impl MikroClient {
    pub fn new(config: UpstreamConfig, clock: Arc<dyn Clock>) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let hasher = DailyHasher::new(
            config.credentials.secret_phrase.clone(),
            HASH_TIMEZONE,
            clock,
        );
        Ok(Self {
            http,
            config: Arc::new(config),
            hasher,
        })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    pub fn hasher(&self) -> &DailyHasher {
        &self.hasher
    }

    /// Identity block with a freshly computed daily hash.
    pub fn identity(&self) -> MikroIdentity<'_> {
        let c = &self.config.credentials;
        MikroIdentity {
            company_code: c.company_code.as_deref(),
            fiscal_year: c.fiscal_year.as_deref(),
            api_key: c.api_key.as_deref(),
            user_code: c.user_code.as_deref(),
            password: self.hasher.current(),
            company_no: c.company_no.as_deref(),
            branch_no: c.branch_no.as_deref(),
        }
    }

    /// Runs one query against the SQL endpoint and returns the parsed body
    /// unchanged, unless Mikro reports an error inside it.
    pub async fn execute_sql(&self, sql_query: &str) -> Result<Value, RelayError> {
        let url = self
            .config
            .sql_api_url
            .as_deref()
            .ok_or(RelayError::NotConfigured("SQL_API_URL"))?;

        let envelope = SqlEnvelope {
            mikro: self.identity(),
            sql_query,
        };

        // Set before `.json()`, which leaves an existing content type alone.
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .header(CONNECTION, "close")
            .json(&envelope)
            .send()
            .await?;

        debug!(status = %response.status(), "Mikro SQL response");
        let bytes = response.bytes().await?;
        check_result(&bytes)
    }

    /// Posts the identity block to `{api_base}/APILogin`. Only 200 counts.
    pub async fn login(&self) -> Result<(), RelayError> {
        let base = self
            .config
            .api_base
            .as_deref()
            .ok_or(RelayError::NotConfigured("API_BASE"))?;
        let url = format!("{}/APILogin", base.trim_end_matches('/'));
        let response = self.http.post(&url).json(&self.identity()).send().await?;

        let status = response.status();
        info!(%status, "APILogin status");
        if status != reqwest::StatusCode::OK {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no-body>".to_owned());
            error!(%status, body = %text, "APILogin returned non-200");
            return Err(RelayError::LoginRejected(status.as_u16()));
        }
        Ok(())
    }
}

/// Best-effort startup check. Logs the outcome and never fails the caller.
pub async fn probe_login(client: &MikroClient) -> bool {
    info!("trying APILogin");
    match client.login().await {
        Ok(()) => {
            info!("APILogin succeeded");
            true
        }
        Err(e) => {
            error!(error = %e, "startup login failed");
            false
        }
    }
}

// ── Response checks ──────────────────────────────────────────────────────────

/// Parses a Mikro response body and turns an embedded `IsError` into an error.
pub fn check_result(body: &[u8]) -> Result<Value, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(RelayError::EmptyResponse);
    }
    let data: Value = serde_json::from_slice(body)?;
    if !is_truthy(&data) {
        return Err(RelayError::Upstream(UPSTREAM_FALLBACK_MESSAGE.to_owned()));
    }

    let first = data.get("result").and_then(|r| r.get(0));
    if first
        .and_then(|entry| entry.get("IsError"))
        .is_some_and(is_truthy)
    {
        let message = first
            .and_then(|entry| entry.get("ErrorMessage"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(UPSTREAM_FALLBACK_MESSAGE);
        return Err(RelayError::Upstream(message.to_owned()));
    }
    Ok(data)
}

/// Number of rows in `result[0].Data`, for logging.
pub fn record_count(data: &Value) -> usize {
    data.pointer("/result/0/Data")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
