// src/services/scrape.rs

//! Fac-Habitat residence scraping service.
//!
//! Pulls the site-wide residence index as JSON, keeps the entries managed by
//! Fac-Habitat in the watched departments, then probes each residence's
//! detail page: availability lives in the text of a reservation iframe, the
//! price in the listing's microdata.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{ResidenceRecord, WatchConfig};
use crate::utils::http;
use crate::utils::resolve;

/// Availability labels as they appear on the reservation widget.
const IMMEDIATE: &str = "Disponibilité immédiate";
const UPCOMING: &str = "Disponibilité à venir";

/// Produces the residence records for one run.
///
/// A transport failure here is fatal for the run; the caller retries from
/// the last saved state on the next invocation.
#[async_trait]
pub trait ResidenceSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<ResidenceRecord>>;
}

/// Scraper for the Fac-Habitat website.
pub struct FacHabitatSource {
    config: WatchConfig,
    client: reqwest::Client,
}

impl FacHabitatSource {
    /// Create a new source with a client built from the watch configuration.
    pub fn new(config: WatchConfig) -> Result<Self> {
        let client = http::create_async_client(&config)?;
        Ok(Self { config, client })
    }

    fn index_url(&self) -> String {
        format!("{}/fr/residences/json", self.config.base_url.trim_end_matches('/'))
    }

    /// Fetch the residence index and keep the watched entries.
    async fn fetch_index(&self) -> Result<Vec<Value>> {
        let url = self.index_url();
        let text = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let data: Value = serde_json::from_str(&text)?;

        let entries = data
            .as_object()
            .ok_or_else(|| AppError::scrape(&url, "expected a JSON object of residences"))?;

        Ok(entries
            .values()
            .filter(|entry| is_watched(entry, &self.config.departments))
            .cloned()
            .collect())
    }

    /// Probe one residence's detail page for availability.
    ///
    /// Returns `Ok(None)` when the residence has no open reservation or no
    /// availability right now; errors are per-residence and skippable.
    async fn probe_residence(&self, entry: &Value) -> Result<Option<ResidenceRecord>> {
        let Some(url) = detail_url(&self.config.base_url, entry) else {
            return Ok(None);
        };

        let detail_html = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        // Parse in a block so the non-Send DOM is dropped before the next await.
        let (iframe_src, price) = {
            let document = Html::parse_document(&detail_html);

            let iframe_sel = parse_selector("iframe.reservation")?;
            let Some(iframe) = document.select(&iframe_sel).next() else {
                return Ok(None);
            };
            let Some(src) = iframe.value().attr("src") else {
                return Ok(None);
            };

            let price_sel = parse_selector(r#"em[itemprop="lowPrice"] strong"#)?;
            let price = document
                .select(&price_sel)
                .next()
                .map(|el| el.text().collect::<String>())
                .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "));

            (src.to_string(), price)
        };

        let iframe_url = resolve(&url, &iframe_src).unwrap_or(iframe_src);
        let iframe_html = self
            .client
            .get(&iframe_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let text = {
            let document = Html::parse_document(&iframe_html);
            document.root_element().text().collect::<String>()
        };

        let Some(label) = availability_label(&text) else {
            return Ok(None);
        };

        Ok(Some(build_record(entry, &url, price.as_deref(), label)))
    }
}

#[async_trait]
impl ResidenceSource for FacHabitatSource {
    async fn fetch(&self) -> Result<Vec<ResidenceRecord>> {
        let entries = self.fetch_index().await?;
        log::info!(
            "Residence index: {} entries in watched departments",
            entries.len()
        );

        let delay = Duration::from_millis(self.config.request_delay_ms);
        let mut records = Vec::new();

        for entry in &entries {
            match self.probe_residence(entry).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(error) => {
                    log::warn!("Skipping residence after fetch failure: {}", error);
                }
            }

            if delay.as_millis() > 0 {
                tokio::time::sleep(delay).await;
            }
        }

        log::info!("{} residences with availability", records.len());
        Ok(records)
    }
}

/// True for entries managed by Fac-Habitat in a watched department.
fn is_watched(entry: &Value, departments: &[String]) -> bool {
    let managed = entry.get("gestionnaire").and_then(Value::as_str) == Some("FACH");

    let in_department = entry
        .get("cp")
        .and_then(Value::as_str)
        .map(|cp| departments.iter().any(|dep| cp.starts_with(dep.as_str())))
        .unwrap_or(false);

    managed && in_department
}

/// Build a residence detail URL: `{base}/fr/residences-etudiantes/id-{id}-{slug}`.
fn detail_url(base_url: &str, entry: &Value) -> Option<String> {
    let id = match entry.get("id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let titre = entry.get("titre_fr").and_then(Value::as_str)?;
    let slug = titre.to_lowercase().replace(' ', "-");

    Some(format!(
        "{}/fr/residences-etudiantes/id-{}-{}",
        base_url.trim_end_matches('/'),
        id,
        slug
    ))
}

/// Classify availability from the reservation widget's text.
///
/// "Disponibilité immédiate" wins over "Disponibilité à venir" when both
/// appear. Matching tolerates arbitrary whitespace between the words.
fn availability_label(text: &str) -> Option<&'static str> {
    static IMMEDIATE_RE: OnceLock<Regex> = OnceLock::new();
    static UPCOMING_RE: OnceLock<Regex> = OnceLock::new();

    let immediate = IMMEDIATE_RE
        .get_or_init(|| Regex::new(r"Disponibilité\s+immédiate").expect("valid regex"));
    let upcoming =
        UPCOMING_RE.get_or_init(|| Regex::new(r"Disponibilité\s+à\s+venir").expect("valid regex"));

    if immediate.is_match(text) {
        Some(IMMEDIATE)
    } else if upcoming.is_match(text) {
        Some(UPCOMING)
    } else {
        None
    }
}

/// Assemble the record for one available residence.
fn build_record(entry: &Value, url: &str, price: Option<&str>, label: &str) -> ResidenceRecord {
    let mut record = ResidenceRecord::new();

    if let Some(titre) = entry.get("titre_fr").and_then(Value::as_str) {
        record.insert("titre", titre);
    }
    if let Some(ville) = entry.get("ville").and_then(Value::as_str) {
        record.insert("ville", ville);
    }
    if let Some(cp) = entry.get("cp").and_then(Value::as_str) {
        record.insert("cp", cp);
    }
    if let Some(price) = price {
        record.insert("prix", price);
    }
    record.insert("url", url);
    if let Some(email) = entry.get("email").and_then(Value::as_str) {
        record.insert("email", email);
    }
    if let Some(tel) = entry.get("tel").and_then(Value::as_str) {
        record.insert("tel", tel);
    }
    record.insert("disponibilité", label);

    record
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn departments() -> Vec<String> {
        vec!["75".into(), "92".into()]
    }

    #[test]
    fn test_is_watched() {
        let entry = json!({"gestionnaire": "FACH", "cp": "75012"});
        assert!(is_watched(&entry, &departments()));

        let other_manager = json!({"gestionnaire": "OTHER", "cp": "75012"});
        assert!(!is_watched(&other_manager, &departments()));

        let other_department = json!({"gestionnaire": "FACH", "cp": "69003"});
        assert!(!is_watched(&other_department, &departments()));

        let missing_cp = json!({"gestionnaire": "FACH"});
        assert!(!is_watched(&missing_cp, &departments()));
    }

    #[test]
    fn test_detail_url() {
        let entry = json!({"id": "42", "titre_fr": "Résidence Étoile"});
        assert_eq!(
            detail_url("https://www.fac-habitat.com/", &entry),
            Some(
                "https://www.fac-habitat.com/fr/residences-etudiantes/id-42-résidence-étoile"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_detail_url_numeric_id() {
        let entry = json!({"id": 7, "titre_fr": "Le Vercors"});
        assert_eq!(
            detail_url("https://example.com", &entry),
            Some("https://example.com/fr/residences-etudiantes/id-7-le-vercors".to_string())
        );
    }

    #[test]
    fn test_detail_url_missing_fields() {
        assert_eq!(detail_url("https://example.com", &json!({"id": "42"})), None);
        assert_eq!(
            detail_url("https://example.com", &json!({"titre_fr": "X"})),
            None
        );
    }

    #[test]
    fn test_availability_label() {
        assert_eq!(
            availability_label("... Disponibilité immédiate ..."),
            Some(IMMEDIATE)
        );
        assert_eq!(
            availability_label("Disponibilité \n à  venir"),
            Some(UPCOMING)
        );
        assert_eq!(availability_label("Complet"), None);
    }

    #[test]
    fn test_immediate_wins_over_upcoming() {
        let text = "Disponibilité à venir ... Disponibilité immédiate";
        assert_eq!(availability_label(text), Some(IMMEDIATE));
    }

    #[test]
    fn test_build_record() {
        let entry = json!({
            "titre_fr": "Résidence Étoile",
            "ville": "Paris",
            "cp": "75012",
            "email": "etoile@example.com",
            "tel": "0102030405",
        });

        let record = build_record(
            &entry,
            "https://example.com/id-42-etoile",
            Some("650 €"),
            IMMEDIATE,
        );

        assert_eq!(record.field(&["titre"]), Some("Résidence Étoile"));
        assert_eq!(record.field(&["ville"]), Some("Paris"));
        assert_eq!(record.field(&["prix"]), Some("650 €"));
        assert_eq!(record.field(&["url"]), Some("https://example.com/id-42-etoile"));
        assert_eq!(record.field(&["disponibilité"]), Some(IMMEDIATE));
    }

    #[test]
    fn test_build_record_without_optional_fields() {
        let entry = json!({"titre_fr": "X", "ville": "Paris", "cp": "75012"});
        let record = build_record(&entry, "https://example.com/x", None, UPCOMING);

        assert_eq!(record.field(&["prix"]), None);
        assert_eq!(record.field(&["email"]), None);
        assert_eq!(record.field(&["disponibilité"]), Some(UPCOMING));
    }
}
