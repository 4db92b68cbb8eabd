//! Relational backend reached through a GraphQL endpoint.
//!
//! Each permission maps onto one boolean query field; the actor travels in the
//! `x-user-id` header and the resource as the `accountId` variable.

use super::Evaluator;
use crate::errors::EvaluatorError;
use crate::model::{Backend, PermissionRequest, PermissionResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Amount used for payment checks when the context carries none.
const DEFAULT_PAYMENT_AMOUNT: f64 = 1000.0;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Map<String, Value>>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Clone)]
pub struct GraphQlEvaluator {
    endpoint: Url,
    client: Client,
}

impl GraphQlEvaluator {
    pub fn new(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            endpoint,
            client: Client::builder()
                .timeout(timeout)
                .user_agent(concat!("entitlement/", env!("CARGO_PKG_VERSION")))
                .build()?,
        })
    }
}

/// Query text and variables for `request`. Unknown permissions fall back to
/// the generic access check.
pub(crate) fn build_query(request: &PermissionRequest) -> (&'static str, Value) {
    let mut variables = Map::new();
    variables.insert("accountId".into(), json!(request.resource));

    let query = match request.permission.as_str() {
        "can_view_transactions" => {
            "query($accountId: ID!) { canViewTransactions(accountId: $accountId) }"
        }
        "can_download_statement" => {
            "query($accountId: ID!) { canDownloadStatement(accountId: $accountId) }"
        }
        "can_initiate_payment" => {
            let amount = request
                .context
                .get("amount")
                .and_then(|raw| raw.trim().parse::<f64>().ok())
                .unwrap_or(DEFAULT_PAYMENT_AMOUNT);
            variables.insert("amount".into(), json!(amount));
            "query($accountId: ID!, $amount: Float!) { canInitiatePayment(accountId: $accountId, amount: $amount) }"
        }
        _ => "query($accountId: ID!) { canAccess(accountId: $accountId) }",
    };
    (query, Value::Object(variables))
}

/// First boolean field of `data`; a payload without one denies.
fn extract_decision(data: &Map<String, Value>) -> bool {
    data.values().find_map(Value::as_bool).unwrap_or(false)
}

#[async_trait]
impl Evaluator for GraphQlEvaluator {
    async fn evaluate(
        &self,
        request: &PermissionRequest,
    ) -> Result<PermissionResponse, EvaluatorError> {
        let started = Instant::now();
        let (query, variables) = build_query(request);

        let resp = self
            .client
            .post(self.endpoint.clone())
            .header("x-user-id", request.actor.as_str())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| EvaluatorError::transport(format!("GraphQL request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| EvaluatorError::transport(format!("failed to read response body: {e}")))?;

        let parsed: GraphQlResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(EvaluatorError::transport(format!("HTTP {status}")));
            }
            Err(e) => {
                return Err(EvaluatorError::invalid_response(format!(
                    "failed to decode GraphQL response: {e}"
                )));
            }
        };

        if !parsed.errors.is_empty() {
            let messages: Vec<&str> = parsed.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(EvaluatorError::rejected(format!(
                "GraphQL errors: {}",
                messages.join("; ")
            )));
        }
        if !status.is_success() {
            return Err(EvaluatorError::transport(format!("HTTP {status}")));
        }

        let allowed = parsed.data.as_ref().map(extract_decision).unwrap_or(false);
        tracing::debug!(
            actor = %request.actor,
            resource = %request.resource,
            permission = %request.permission,
            allowed,
            "graphql decision"
        );

        Ok(PermissionResponse::decided(allowed)
            .with_backend(Backend::Relational)
            .with_elapsed_ms(started.elapsed().as_secs_f64() * 1000.0))
    }

    fn name(&self) -> &'static str {
        "graphql"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_query_parses_amount_from_context() {
        let req = PermissionRequest::new("emma", "acc123", "can_initiate_payment")
            .with_context("amount", "2500.5");
        let (query, vars) = build_query(&req);
        assert!(query.contains("canInitiatePayment"));
        assert_eq!(vars["amount"], json!(2500.5));
        assert_eq!(vars["accountId"], json!("acc123"));
    }

    #[test]
    fn payment_query_defaults_unparseable_amount() {
        let req = PermissionRequest::new("emma", "acc123", "can_initiate_payment")
            .with_context("amount", "lots");
        let (_, vars) = build_query(&req);
        assert_eq!(vars["amount"], json!(1000.0));
    }

    #[test]
    fn unknown_permission_falls_back_to_access_check() {
        let req = PermissionRequest::new("david", "acc123", "can_close_account");
        let (query, vars) = build_query(&req);
        assert!(query.contains("canAccess"));
        assert!(vars.get("amount").is_none());
    }

    #[test]
    fn decision_is_first_boolean_field() {
        let data = json!({ "canAccess": true });
        assert!(extract_decision(data.as_object().unwrap()));

        let data = json!({ "note": "no boolean here" });
        assert!(!extract_decision(data.as_object().unwrap()));
    }
}
