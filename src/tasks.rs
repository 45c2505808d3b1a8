//! Background CRM report job.
//!
//! The job asks a GraphQL endpoint (the in-process schema or a remote server) for
//! `crmReport`, retries failures with exponential backoff, and merges one line per
//! minute into the report log.

use crate::config::ReportConfig;
use crate::domain::CrmTotals;
use crate::error::{CrmError, Result};
use crate::graphql::GraphQLSchema;
use crate::metrics;
use crate::report::{minute_bucket, write_report_line, ReportLine};
use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

pub const REPORT_QUERY: &str = "query CrmReport { crmReport { totalCustomers totalOrders totalRevenue } }";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportTotals {
    total_customers: Option<i64>,
    total_orders: Option<i64>,
    /// Decimal scalars arrive as strings, but plain numbers are accepted too.
    total_revenue: Option<serde_json::Value>,
}

fn revenue_from_json(value: Option<serde_json::Value>) -> Result<Decimal> {
    let text = match value {
        None | Some(serde_json::Value::Null) => return Ok(Decimal::ZERO),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(CrmError::Report(format!("totalRevenue is not a number: {other}")))
        }
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| CrmError::Report(format!("totalRevenue '{text}' is not a decimal: {e}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportData {
    crm_report: Option<ReportTotals>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorMessage {
    message: String,
}

/// Standard GraphQL response body.
#[derive(Debug, Deserialize)]
struct GraphQLEnvelope {
    data: Option<ReportData>,
    #[serde(default)]
    errors: Vec<GraphQLErrorMessage>,
}

impl GraphQLEnvelope {
    fn into_totals(self) -> Result<CrmTotals> {
        if !self.errors.is_empty() {
            let joined = self
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CrmError::Report(joined));
        }
        let totals = self
            .data
            .and_then(|d| d.crm_report)
            .ok_or_else(|| CrmError::Report("response has no crmReport".to_string()))?;
        Ok(CrmTotals {
            total_customers: totals.total_customers.unwrap_or(0),
            total_orders: totals.total_orders.unwrap_or(0),
            total_revenue: revenue_from_json(totals.total_revenue)?,
        })
    }
}

/// Parses a raw GraphQL JSON response body into report totals.
pub fn parse_report_response(body: &[u8]) -> Result<CrmTotals> {
    let envelope: GraphQLEnvelope = serde_json::from_slice(body)?;
    envelope.into_totals()
}

/// Where the report job gets its numbers from.
#[derive(Clone)]
pub enum ReportSource {
    InProcess(GraphQLSchema),
    Http {
        client: reqwest::Client,
        endpoint: String,
    },
}

impl ReportSource {
    pub fn http(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(ReportSource::Http {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn describe(&self) -> String {
        match self {
            ReportSource::InProcess(_) => "in-process schema".to_string(),
            ReportSource::Http { endpoint, .. } => endpoint.clone(),
        }
    }

    pub async fn fetch_totals(&self) -> Result<CrmTotals> {
        match self {
            ReportSource::InProcess(schema) => {
                let response = schema.execute(REPORT_QUERY).await;
                let body = serde_json::to_vec(&response)?;
                parse_report_response(&body)
            }
            ReportSource::Http { client, endpoint } => {
                let body = client
                    .post(endpoint)
                    .json(&serde_json::json!({ "query": REPORT_QUERY }))
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?;
                parse_report_response(&body)
            }
        }
    }
}

/// Bounded retries with capped exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl From<&ReportConfig> for RetryPolicy {
    fn from(config: &ReportConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`, capped at `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `op` until it succeeds or `max_retries` retries are spent.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if retry >= self.max_retries => {
                    error!("{} failed after {} attempts: {}", label, retry + 1, e);
                    return Err(e);
                }
                Err(e) => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    warn!(
                        "{} failed (attempt {}), retrying in {:?}: {}",
                        label, retry, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// What a single report run did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportOutcome {
    pub timestamp: NaiveDateTime,
    pub totals: Option<CrmTotals>,
    pub error: Option<String>,
    /// Whether the line reached the log file.
    pub written: bool,
}

/// Runs the report job for the current local minute.
pub async fn generate_crm_report(
    source: &ReportSource,
    log_path: &Path,
    policy: &RetryPolicy,
) -> ReportOutcome {
    generate_crm_report_at(source, log_path, policy, Local::now().naive_local()).await
}

/// Runs the report job with an explicit timestamp; the log line uses its minute bucket.
pub async fn generate_crm_report_at(
    source: &ReportSource,
    log_path: &Path,
    policy: &RetryPolicy,
    now: NaiveDateTime,
) -> ReportOutcome {
    let started = Instant::now();
    let timestamp = minute_bucket(now);
    info!("Generating CRM report from {}", source.describe());

    let fetched = policy
        .run("crm report fetch", || {
            metrics::record_report_attempt();
            source.fetch_totals()
        })
        .await;

    let (line, totals, error) = match fetched {
        Ok(totals) => (ReportLine::totals(now, totals.clone()), Some(totals), None),
        Err(e) => {
            let message = e.to_string();
            (ReportLine::failure(now, message.clone()), None, Some(message))
        }
    };

    let written = match write_report_line(log_path, &line) {
        Ok(()) => true,
        Err(e) => {
            metrics::record_report_write_error();
            error!(
                "Failed to write report to {}: {}. Report content: {}",
                log_path.display(),
                e,
                line.render()
            );
            false
        }
    };

    let status = if error.is_some() { "error" } else { "ok" };
    metrics::record_report_run(status, started.elapsed());
    info!(status, written, "CRM report: {}", line.render());

    ReportOutcome {
        timestamp,
        totals,
        error,
        written,
    }
}

/// Runs the report job every `interval` until `shutdown` resolves. The first run is immediate.
pub async fn run_periodic<S>(
    source: ReportSource,
    log_path: PathBuf,
    policy: RetryPolicy,
    interval: Duration,
    shutdown: S,
) where
    S: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!(
        "Report worker started: every {:?} into {}",
        interval,
        log_path.display()
    );
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Report worker stopping");
                break;
            }
            _ = ticker.tick() => {
                generate_crm_report(&source, &log_path, &policy).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(7), Duration::from_secs(60));
        assert_eq!(policy.delay_for(40), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(3)
            .run("flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(CrmError::Report("not yet".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast_policy(2)
            .run("always failing", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(CrmError::Report("down".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn parses_string_and_numeric_revenue() {
        let totals = parse_report_response(
            br#"{"data":{"crmReport":{"totalCustomers":3,"totalOrders":2,"totalRevenue":"45.50"}}}"#,
        )
        .unwrap();
        assert_eq!(totals.total_customers, 3);
        assert_eq!(totals.total_revenue.to_string(), "45.50");

        let totals = parse_report_response(
            br#"{"data":{"crmReport":{"totalCustomers":null,"totalOrders":0,"totalRevenue":12}}}"#,
        )
        .unwrap();
        assert_eq!(totals.total_customers, 0);
        assert_eq!(totals.total_revenue, Decimal::from(12));
    }

    #[test]
    fn rejects_non_numeric_revenue() {
        let err = parse_report_response(
            br#"{"data":{"crmReport":{"totalCustomers":1,"totalOrders":1,"totalRevenue":"lots"}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'lots'"));
    }

    #[test]
    fn graphql_errors_fail_the_parse() {
        let err = parse_report_response(
            br#"{"data":null,"errors":[{"message":"boom"},{"message":"bang"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Report error: boom; bang");

        assert!(parse_report_response(b"not json").is_err());
        assert!(parse_report_response(br#"{"data":{}}"#).is_err());
    }
}
