use std::time::Duration;

/// Default upstream request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Identity fields sent with every Mikro call, plus the phrase the daily
/// hash is derived from.
#[derive(Debug, Clone, Default)]
pub struct MikroCredentials {
    pub company_code: Option<String>,
    pub fiscal_year: Option<String>,
    pub api_key: Option<String>,
    pub user_code: Option<String>,
    pub company_no: Option<String>,
    pub branch_no: Option<String>,
    pub secret_phrase: Option<String>,
}

impl MikroCredentials {
    pub fn from_env() -> Self {
        Self::from_lookup(env_opt)
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            company_code: var("FIRMA_KODU"),
            fiscal_year: var("CALISMA_YILI"),
            api_key: var("API_KEY"),
            user_code: var("KULLANICI_KODU"),
            company_no: var("FIRMA_NO"),
            branch_no: var("SUBE_NO"),
            secret_phrase: var("SIFRE"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL; the login probe posts to `{api_base}/APILogin`.
    pub api_base: Option<String>,
    /// URL of the SQL execution endpoint.
    pub sql_api_url: Option<String>,
    pub credentials: MikroCredentials,
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_opt)
    }

    /// Builds the config from `var`, which must already map empty values to `None`.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_base: var("API_BASE"),
            sql_api_url: var("SQL_API_URL").or_else(|| var("API_URL")),
            credentials: MikroCredentials::from_lookup(&var),
            // A zero timeout would fail every call at once.
            timeout: Duration::from_secs(
                var("MIKRO_TIMEOUT_SECS")
                    .and_then(|s| s.parse::<u64>().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            sql_api_url: None,
            credentials: MikroCredentials::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upstream: UpstreamConfig,
    /// Key required in `X-Secret-Key` for the bulk sync endpoint.
    pub sync_key: Option<String>,
    pub cors_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env_opt("RELAY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: env_opt("RELAY_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            upstream: UpstreamConfig::from_env(),
            sync_key: env_opt("SECRET_SYNC_KEY"),
            cors_origins: env_opt("RELAY_CORS_ORIGINS"),
        }
    }
}

/// Reads an env var, treating an empty value the same as an unset one.
pub fn env_opt(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| non_empty(vars.get(name).cloned())
    }

    #[test]
    fn empty_value_counts_as_unset() {
        let cfg = UpstreamConfig::from_lookup(lookup(&[
            ("API_BASE", ""),
            ("FIRMA_KODU", ""),
            ("SIFRE", ""),
            ("API_KEY", "key-1"),
        ]));
        assert_eq!(cfg.api_base, None);
        assert_eq!(cfg.credentials.company_code, None);
        assert_eq!(cfg.credentials.secret_phrase, None);
        assert_eq!(cfg.credentials.api_key.as_deref(), Some("key-1"));
    }

    #[test]
    fn sql_api_url_falls_back_to_api_url() {
        let cfg = UpstreamConfig::from_lookup(lookup(&[("API_URL", "https://m/legacy")]));
        assert_eq!(cfg.sql_api_url.as_deref(), Some("https://m/legacy"));

        let cfg = UpstreamConfig::from_lookup(lookup(&[
            ("SQL_API_URL", "https://m/sql"),
            ("API_URL", "https://m/legacy"),
        ]));
        assert_eq!(cfg.sql_api_url.as_deref(), Some("https://m/sql"));

        // An empty SQL_API_URL does not shadow API_URL.
        let cfg = UpstreamConfig::from_lookup(lookup(&[
            ("SQL_API_URL", ""),
            ("API_URL", "https://m/legacy"),
        ]));
        assert_eq!(cfg.sql_api_url.as_deref(), Some("https://m/legacy"));
    }

    #[test]
    fn timeout_is_parsed() {
        let cfg = UpstreamConfig::from_lookup(lookup(&[("MIKRO_TIMEOUT_SECS", "5")]));
        assert_eq!(cfg.timeout, Duration::from_secs(5));
    }

    #[test]
    fn zero_or_invalid_timeout_uses_default() {
        for raw in ["0", "abc", "-3"] {
            let cfg = UpstreamConfig::from_lookup(lookup(&[("MIKRO_TIMEOUT_SECS", raw)]));
            assert_eq!(cfg.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS), "{raw}");
        }
        let cfg = UpstreamConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
