//! Registration submission against Banner.
//!
//! Banner's batch endpoint expects the full summary model it rendered into
//! the registration page, echoed back with a changed action code. Dropping
//! therefore starts by scraping `summaryModels` out of the page HTML; adds
//! go through the cart endpoint which returns a fresh model to submit.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{RegistrationEvent, Result, Section, sources::BannerClient};

/// Action code Banner uses for a drop/withdraw
const ACTION_DROP: &str = "DW";
/// Action code for submitting a cart entry
const ACTION_REGISTER: &str = "RB";

/// Pause between consecutive Banner mutations; the upstream throttles
/// rapid-fire submissions
const SUBMIT_PACING: Duration = Duration::from_millis(500);

/// Per-section failure in an apply run
#[derive(Debug, Clone, Serialize)]
pub struct SectionFailure {
    pub crn: String,
    pub reason: String,
}

/// Outcome of pushing a schedule into Banner, per section.
///
/// Failures are reported, never masked; a partially applied schedule is
/// visible as a mix of entries here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub dropped: Vec<String>,
    pub failed_drops: Vec<SectionFailure>,
    pub registered: Vec<String>,
    pub failed_registrations: Vec<SectionFailure>,
}

impl ApplyReport {
    pub fn fully_applied(&self) -> bool {
        self.failed_drops.is_empty() && self.failed_registrations.is_empty()
    }
}

fn summary_models_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"summaryModels:\s*\[").expect("valid regex"))
}

/// Locate and parse the `summaryModels: [...]` array embedded in the
/// registration page JavaScript. The array is found by bracket counting
/// that honors JSON string escaping, because model fields routinely contain
/// brackets.
pub fn extract_summary_models(html: &str) -> Result<Vec<Value>> {
    let Some(found) = summary_models_re().find(html) else {
        return Ok(Vec::new());
    };
    let start = found.end() - 1;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;

    for (offset, ch) in html[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_string = !in_string,
            '[' if !in_string => depth += 1,
            ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + offset + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let Some(end) = end else {
        return Err(crate::Error::Internal(
            "unterminated summaryModels array in registration page".to_string(),
        ));
    };

    Ok(serde_json::from_str(&html[start..end])?)
}

impl BannerClient {
    /// Current registrations across terms, filtered to `term` when given
    pub async fn current_registrations(&self, term: &str) -> Result<Vec<RegistrationEvent>> {
        // termFilter stays empty on purpose: Banner only returns the full
        // list that way, so filtering happens client-side
        let request = self
            .get("/classRegistration/getRegistrationEvents")
            .query(&[("termFilter", "")]);
        let events: Vec<RegistrationEvent> = self.send_json(request).await?;

        Ok(events
            .into_iter()
            .filter(|e| term.is_empty() || e.term.as_deref() == Some(term))
            .collect())
    }

    /// Scrape the full registration models for the session's selected term,
    /// keyed by CRN
    pub async fn registration_models(&self) -> Result<BTreeMap<String, Value>> {
        let response = self
            .get("/classRegistration/classRegistration")
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| self.base().handle_error_req(e))?;

        if !response.status().is_success() {
            return Err(self
                .base()
                .upstream_error(format!("HTTP {} error", response.status())));
        }

        let html = response
            .text()
            .await
            .map_err(|e| self.base().handle_error_req(e))?;

        let mut by_crn = BTreeMap::new();
        for model in extract_summary_models(&html)? {
            if let Some(crn) = model
                .get("courseReferenceNumber")
                .and_then(model_crn_string)
            {
                by_crn.insert(crn, model);
            }
        }
        Ok(by_crn)
    }

    /// Add one section to the registration cart, returning the model Banner
    /// expects back on submission
    pub async fn add_to_cart(&self, term: &str, crn: &str) -> Result<Value> {
        let request = self.get("/classRegistration/addRegistrationItem").query(&[
            ("term", term),
            ("courseReferenceNumber", crn),
            ("olr", "false"),
        ]);
        let response: Value = self.send_json(request).await?;

        if !response
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            let message = response
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(self
                .base()
                .upstream_error(format!("could not add CRN {} to cart: {}", crn, message)));
        }

        response
            .get("model")
            .cloned()
            .ok_or_else(|| self.base().upstream_error("cart response carried no model"))
    }

    /// Submit a batch of registration models (already tagged with their
    /// action codes)
    pub async fn submit_batch(&self, update: Vec<Value>) -> Result<Value> {
        let payload = json!({
            "create": [],
            "update": update,
            "destroy": [],
            "uniqueSessionId": self.session().session_id(),
        });

        let request = self
            .post("/classRegistration/submitRegistration/batch")
            .json(&payload);
        let response: Value = self.send_json(request).await?;

        if !response
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            let message = response
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(self
                .base()
                .upstream_error(format!("registration submit rejected: {}", message)));
        }
        Ok(response)
    }

    /// Drop one registered section by CRN using its scraped summary model
    pub async fn drop_section(&self, models: &BTreeMap<String, Value>, crn: &str) -> Result<()> {
        let Some(model) = models.get(crn) else {
            return Err(crate::Error::Config(format!(
                "no registration model for CRN {}; is it currently registered?",
                crn
            )));
        };

        let mut model = model.clone();
        set_field(&mut model, "selectedAction", ACTION_DROP)?;
        self.submit_batch(vec![model]).await?;
        Ok(())
    }

    /// Drop several sections, one batch each, reporting per-CRN outcomes
    pub async fn drop_sections(&self, crns: &[String]) -> Result<ApplyReport> {
        let models = self.registration_models().await?;
        let mut report = ApplyReport::default();

        for crn in crns {
            match self.drop_section(&models, crn).await {
                Ok(()) => {
                    tracing::info!("dropped CRN {}", crn);
                    report.dropped.push(crn.clone());
                }
                Err(e) => {
                    tracing::warn!("failed to drop CRN {}: {}", crn, e);
                    report.failed_drops.push(SectionFailure {
                        crn: crn.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            tokio::time::sleep(SUBMIT_PACING).await;
        }

        Ok(report)
    }

    /// Register one section: cart it, then submit the returned model
    pub async fn register_crn(&self, term: &str, crn: &str) -> Result<()> {
        let mut model = self.add_to_cart(term, crn).await?;
        set_field(&mut model, "selectedAction", ACTION_REGISTER)?;
        set_field(&mut model, "recordStatus", "Q")?;
        self.submit_batch(vec![model]).await?;
        Ok(())
    }

    /// Push a chosen schedule into Banner: drop everything currently
    /// registered, register each chosen section one at a time, then retry
    /// any failed drops once.
    pub async fn apply_schedule(&self, term: &str, sections: &[Section]) -> Result<ApplyReport> {
        let models = self.registration_models().await?;
        let current: Vec<String> = models.keys().cloned().collect();
        let mut report = ApplyReport::default();

        tracing::info!(
            "applying schedule: {} currently registered, {} to register",
            current.len(),
            sections.len()
        );

        for crn in &current {
            match self.drop_section(&models, crn).await {
                Ok(()) => report.dropped.push(crn.clone()),
                Err(e) => report.failed_drops.push(SectionFailure {
                    crn: crn.clone(),
                    reason: e.to_string(),
                }),
            }
            tokio::time::sleep(SUBMIT_PACING).await;
        }

        for section in sections {
            match self.register_crn(term, &section.crn).await {
                Ok(()) => {
                    tracing::info!("registered {}", section.label());
                    report.registered.push(section.crn.clone());
                }
                Err(e) => {
                    tracing::warn!("failed to register {}: {}", section.label(), e);
                    report.failed_registrations.push(SectionFailure {
                        crn: section.crn.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            tokio::time::sleep(SUBMIT_PACING).await;
        }

        // One retry pass over drops that failed before the adds went in;
        // a freed seat sometimes unblocks them
        let retry: Vec<SectionFailure> = std::mem::take(&mut report.failed_drops);
        for failure in retry {
            match self.drop_section(&models, &failure.crn).await {
                Ok(()) => report.dropped.push(failure.crn),
                Err(e) => report.failed_drops.push(SectionFailure {
                    crn: failure.crn,
                    reason: e.to_string(),
                }),
            }
            tokio::time::sleep(SUBMIT_PACING).await;
        }

        Ok(report)
    }
}

fn set_field(model: &mut Value, key: &str, value: &str) -> Result<()> {
    model
        .as_object_mut()
        .ok_or_else(|| crate::Error::Internal("registration model is not a JSON object".to_string()))?
        .insert(key.to_string(), Value::String(value.to_string()));
    Ok(())
}

/// Banner serves CRNs as either strings or numbers depending on the page
fn model_crn_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_models_from_page_html() {
        let html = r#"
            window.bootstraps = {
                summaryModels: [
                    {"courseReferenceNumber": "10001", "subject": "ITSC", "title": "Soft [Dev] Security"},
                    {"courseReferenceNumber": 10002, "subject": "CPSY"}
                ],
                other: []
            };
        "#;

        let models = extract_summary_models(html).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0]["subject"], "ITSC");
        // bracket inside a string must not end the scan early
        assert_eq!(models[0]["title"], "Soft [Dev] Security");
    }

    #[test]
    fn escaped_quotes_inside_strings_are_honored() {
        let html = r#"summaryModels: [{"courseReferenceNumber": "1", "note": "say \"hi]\" now"}]"#;
        let models = extract_summary_models(html).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0]["note"], "say \"hi]\" now");
    }

    #[test]
    fn page_without_models_yields_empty() {
        let models = extract_summary_models("<html><body>no models</body></html>").unwrap();
        assert!(models.is_empty());
    }

    #[test]
    fn unterminated_array_is_an_error() {
        let err = extract_summary_models(r#"summaryModels: [{"courseReferenceNumber": "1""#)
            .unwrap_err();
        assert!(matches!(err, crate::Error::Internal(_)));
    }
}
