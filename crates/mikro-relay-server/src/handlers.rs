use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    error::RelayError,
    mikro::record_count,
    query::{QueryTemplate, ALL_PRODUCTS, PRODUCT_LOOKUP},
    AppState,
};

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// ── Product lookup ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub barcode: Option<String>,
}

pub async fn get_product(
    State(state): State<AppState>,
    body: Result<Json<LookupRequest>, JsonRejection>,
) -> Response {
    let barcode = match body {
        Ok(Json(req)) => req.barcode,
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "unreadable lookup request");
            return RelayError::Validation("barcode is required".into()).into_response();
        }
    };

    info!(barcode = barcode.as_deref().unwrap_or_default(), "product lookup");
    relay(&state, &PRODUCT_LOOKUP, barcode.as_deref()).await
}

// ── Bulk sync ─────────────────────────────────────────────────────────────────

pub async fn get_all_products(State(state): State<AppState>) -> Response {
    info!("bulk sync: fetching full catalog");
    relay(&state, &ALL_PRODUCTS, None).await
}

// ── Env diagnostics ───────────────────────────────────────────────────────────

pub async fn env_test(State(state): State<AppState>) -> Json<Value> {
    let up = state.mikro.config();
    let c = &up.credentials;
    Json(json!({
        "API_BASE": mask(up.api_base.as_deref()),
        "SQL_API_URL": mask(up.sql_api_url.as_deref()),
        "API_KEY": mask(c.api_key.as_deref()),
        "SECRET_SYNC_KEY": mask(state.sync_key.as_deref()),
        "FIRMA_KODU": mask(c.company_code.as_deref()),
        "CALISMA_YILI": mask(c.fiscal_year.as_deref()),
        "KULLANICI_KODU": mask(c.user_code.as_deref()),
        "FIRMA_NO": mask(c.company_no.as_deref()),
        "SUBE_NO": mask(c.branch_no.as_deref()),
    }))
}

/// Characters of a value shown by `/env-test`.
const MASK_PREFIX: usize = 5;

/// First five characters plus the length, or `undefined` when unset.
/// Values no longer than the prefix show only their length.
pub fn mask(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => {
            let len = v.chars().count();
            let head: String = if len > MASK_PREFIX {
                v.chars().take(MASK_PREFIX).collect()
            } else {
                String::new()
            };
            format!("{head}...({len} chars)")
        }
        _ => "undefined".to_owned(),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Render a template, run it against Mikro and relay the result.
async fn relay(state: &AppState, template: &QueryTemplate, input: Option<&str>) -> Response {
    match execute_templated(state, template, input).await {
        Ok(data) => {
            info!(
                query = template.name,
                records = record_count(&data),
                "Mikro response relayed"
            );
            Json(data).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn execute_templated(
    state: &AppState,
    template: &QueryTemplate,
    input: Option<&str>,
) -> Result<Value, RelayError> {
    let sql = template.render(input)?;
    state.mikro.execute_sql(&sql).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_keeps_five_chars_and_length() {
        assert_eq!(mask(Some("abc123")), "abc12...(6 chars)");
        assert_eq!(
            mask(Some("https://mikro.example.com")),
            "https...(25 chars)"
        );
    }

    #[test]
    fn mask_counts_characters_not_bytes() {
        assert_eq!(mask(Some("ŞİRKET01")), "ŞİRKE...(8 chars)");
    }

    #[test]
    fn mask_hides_short_values_entirely() {
        assert_eq!(mask(Some("ab12")), "...(4 chars)");
        assert_eq!(mask(Some("0")), "...(1 chars)");
        assert_eq!(mask(Some("abcde")), "...(5 chars)");
        assert_eq!(mask(Some("abcdef")), "abcde...(6 chars)");
    }

    #[test]
    fn mask_unset_or_empty_is_undefined() {
        assert_eq!(mask(None), "undefined");
        assert_eq!(mask(Some("")), "undefined");
    }
}
