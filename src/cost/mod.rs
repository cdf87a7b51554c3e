//! Token usage and cost accounting.
//!
//! Recording is advisory: generation results never depend on it, and a
//! failed record is logged and swallowed by the caller. Stats are bucketed
//! by local date and month with bounded retention.

use crate::config::Catalog;
use crate::models::TokenUsage;
use chrono::{Datelike, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Fallback pricing (USD per 1M tokens) for models missing from the catalog.
const FALLBACK_PRICING: (f64, f64) = (0.25, 2.0);

/// Daily stats kept for this many days.
const DAILY_RETENTION_DAYS: u64 = 90;

/// Monthly stats kept for this many months.
const MONTHLY_RETENTION_MONTHS: u32 = 24;

/// Aggregated usage for one bucket (day, month, or all time).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageBucket {
    /// Total tokens (input + output).
    pub tokens: u64,
    /// Cost in USD.
    pub cost: f64,
    /// Number of requests.
    pub requests: u64,
}

impl UsageBucket {
    fn record(&mut self, tokens: u64, cost: f64) {
        self.tokens += tokens;
        self.cost += cost;
        self.requests += 1;
    }
}

/// Usage summary across the standard windows.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    /// Today's usage.
    pub today: UsageBucket,
    /// This month's usage.
    pub this_month: UsageBucket,
    /// All-time usage.
    pub all_time: UsageBucket,
}

#[derive(Debug, Default)]
struct Ledger {
    daily: BTreeMap<String, UsageBucket>,
    monthly: BTreeMap<String, UsageBucket>,
    all_time: UsageBucket,
}

/// In-memory cost tracker.
#[derive(Debug, Default)]
pub struct CostTracker {
    ledger: Mutex<Ledger>,
}

impl CostTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one request's usage and returns its cost in USD.
    pub fn record(&self, catalog: &Catalog, model: &str, usage: TokenUsage) -> f64 {
        let cost = calculate_cost(catalog, model, usage.input_tokens, usage.output_tokens);
        let tokens = usage.total();

        let today = local_date_key(Local::now().date_naive());
        let month = local_month_key();

        let mut ledger = self.lock();
        ledger.daily.entry(today).or_default().record(tokens, cost);
        ledger.monthly.entry(month).or_default().record(tokens, cost);
        ledger.all_time.record(tokens, cost);

        Self::prune(&mut ledger);
        cost
    }

    /// Usage summary for today, this month, and all time.
    #[must_use]
    pub fn stats(&self) -> UsageStats {
        let today = local_date_key(Local::now().date_naive());
        let month = local_month_key();

        let ledger = self.lock();
        UsageStats {
            today: ledger.daily.get(&today).copied().unwrap_or_default(),
            this_month: ledger.monthly.get(&month).copied().unwrap_or_default(),
            all_time: ledger.all_time,
        }
    }

    fn prune(ledger: &mut Ledger) {
        let now = Local::now().date_naive();
        if let Some(cutoff) = now.checked_sub_days(chrono::Days::new(DAILY_RETENTION_DAYS)) {
            let cutoff_key = local_date_key(cutoff);
            ledger.daily.retain(|key, _| key.as_str() >= cutoff_key.as_str());
        }
        if let Some(cutoff) = now.checked_sub_months(Months::new(MONTHLY_RETENTION_MONTHS)) {
            let cutoff_key = format!("{:04}-{:02}", cutoff.year(), cutoff.month());
            ledger
                .monthly
                .retain(|key, _| key.as_str() >= cutoff_key.as_str());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.ledger
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Cost of one request in USD, using catalog pricing with a fallback for
/// unknown models.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_cost(catalog: &Catalog, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let (input_rate, output_rate) = catalog
        .model_pricing(model)
        .map_or(FALLBACK_PRICING, |p| (p.input, p.output));

    (input_tokens as f64 / 1_000_000.0).mul_add(
        input_rate,
        (output_tokens as f64 / 1_000_000.0) * output_rate,
    )
}

/// Local date as `YYYY-MM-DD`.
fn local_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Local month as `YYYY-MM`.
fn local_month_key() -> String {
    Local::now().format("%Y-%m").to_string()
}

/// Formats a cost for display, with more precision for small amounts.
#[must_use]
pub fn format_cost(cost: f64) -> String {
    if cost < 0.01 {
        format!("${cost:.4}")
    } else if cost < 1.0 {
        format!("${cost:.3}")
    } else {
        format!("${cost:.2}")
    }
}

/// Formats a token count for display (`1.2K`, `3.40M`).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_tokens(tokens: u64) -> String {
    if tokens >= 1_000_000 {
        format!("{:.2}M", tokens as f64 / 1_000_000.0)
    } else if tokens >= 1_000 {
        format!("{:.1}K", tokens as f64 / 1_000.0)
    } else {
        tokens.to_string()
    }
}
