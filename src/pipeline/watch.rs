// src/pipeline/watch.rs

//! Per-run orchestration.
//!
//! One invocation is one run: scrape, derive keys, diff against the
//! persisted set, send the alert for anything new, then settle the daily
//! summary. State files are only touched after the email they guard went
//! out, so a failed run leaves the previous state intact and the next run
//! retries from it.

use chrono::{DateTime, Local};

use crate::error::Result;
use crate::pipeline::diff::{KeySet, diff};
use crate::pipeline::key::derive_batch;
use crate::services::{Notifier, ResidenceSource, render_html_table};
use crate::storage::{DailyGate, StateStore};

/// Counters for one watch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Rows produced by the record source
    pub scraped: usize,
    /// Keys not present in the persisted set
    pub new_count: usize,
    /// Keys derived from the positional fallback
    pub degraded_keys: usize,
    /// Whether the new-availability alert went out
    pub sent_alert: bool,
    /// Whether the daily summary went out
    pub sent_daily: bool,
}

/// Run the watcher once.
pub async fn run_watch(
    source: &dyn ResidenceSource,
    notifier: &dyn Notifier,
    state: &StateStore,
    gate: &DailyGate,
    now: DateTime<Local>,
) -> Result<RunSummary> {
    log::info!("=== Run at {} ===", now.format("%Y-%m-%d %H:%M:%S"));

    let records = source.fetch().await?;
    log::info!("Scraped {} rows", records.len());

    let (derived, degraded_keys) = derive_batch(&records);
    let current: KeySet = derived.into_iter().map(|d| d.key).collect();
    let previous = state.load().await;
    let new_keys = diff(&current, &previous);

    let mut summary = RunSummary {
        scraped: records.len(),
        new_count: new_keys.len(),
        degraded_keys,
        ..RunSummary::default()
    };

    let html_table = render_html_table(&records);

    // New-availability alert; the key set is persisted only once the
    // alert is actually out.
    if !new_keys.is_empty() {
        let subject = format!(
            "Fac-Habitat : {} résidences disponibles (nouvelles détectées)",
            records.len()
        );
        notifier
            .send(
                &subject,
                "De nouvelles disponibilités ont été trouvées :",
                Some(&html_table),
            )
            .await?;
        state.save(&current).await?;
        summary.sent_alert = true;
        log::info!("Sent NEW availability email ({} new)", new_keys.len());
    }

    // Daily summary, at most once per calendar day.
    let today = now.date_naive();
    if gate.should_send_today(today).await {
        if records.is_empty() {
            let subject = format!("Fac-Habitat – Rapport du {}", now.format("%d/%m/%Y"));
            notifier
                .send(&subject, "Aucune résidence disponible aujourd'hui.", None)
                .await?;
        } else {
            let subject = format!(
                "Fac-Habitat – Rapport du {} ({} dispo)",
                now.format("%d/%m/%Y"),
                records.len()
            );
            notifier
                .send(
                    &subject,
                    "Voici le rapport quotidien des résidences disponibles :",
                    Some(&html_table),
                )
                .await?;
        }
        gate.mark_sent(today).await?;
        summary.sent_daily = true;
        log::info!("Sent DAILY summary email");
    }

    if !summary.sent_alert && !summary.sent_daily {
        log::info!("No new availabilities; no email sent");
    }

    Ok(summary)
}
