//! Tier 2: the premium LLM detector, reachable only via the
//! [`crate::orchestrator`]'s quota gate.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DetectorError;
use crate::finding::{Category, DetectorKind, Finding};

use super::CodeSnippet;

/// How the configured endpoint's quota is metered.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuotaType {
    #[default]
    Unlimited,
    Trial,
    UsageBased,
}

/// Configuration for the optional semantic-review endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub quota_type: QuotaType,
    pub remaining_uses: Option<u32>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Name of the process environment variable holding the endpoint's
    /// authentication secret. Never logged or embedded in findings.
    pub auth_env_var: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            quota_type: QuotaType::Unlimited,
            remaining_uses: None,
            expires_at: None,
            auth_env_var: None,
        }
    }
}

impl LlmConfig {
    /// The quota gate: allow a call iff enabled, an endpoint is
    /// configured, the quota hasn't expired (trial quotas only), and uses
    /// remain (when bounded).
    pub fn allows_call(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled || self.endpoint.is_none() {
            return false;
        }

        let quota_live = match self.quota_type {
            QuotaType::Unlimited => true,
            QuotaType::Trial => self.expires_at.is_none_or(|exp| exp > now),
            QuotaType::UsageBased => true,
        };
        if !quota_live {
            return false;
        }

        match self.remaining_uses {
            Some(remaining) => remaining > 0,
            None => true,
        }
    }

    /// Decrements `remaining_uses` by `used`, floor-clamped at 0.
    pub fn record_usage(&mut self, used: u32) {
        if let Some(remaining) = self.remaining_uses {
            self.remaining_uses = Some(remaining.saturating_sub(used));
        }
    }
}

#[derive(Debug, Serialize)]
struct LlmRequest<'a> {
    snippets: &'a [CodeSnippet],
}

#[derive(Debug, Deserialize)]
struct LlmResponseFinding {
    rule_id: String,
    file: String,
    line: u32,
    category: Option<String>,
    severity: Option<String>,
    message: String,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LlmResponse {
    findings: Vec<LlmResponseFinding>,
}

/// Calls a configured semantic-review endpoint with a batch of candidate
/// snippets and maps the response into [`Finding`]s.
pub struct LlmDetector {
    config: Mutex<LlmConfig>,
    client: reqwest::blocking::Client,
}

impl LlmDetector {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config: Mutex::new(config),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn allows_call(&self, now: DateTime<Utc>) -> bool {
        self.config.lock().expect("llm config lock poisoned").allows_call(now)
    }

    /// Sends the full candidate batch in a single request.
    pub fn analyze(&self, snippets: &[CodeSnippet]) -> Result<Vec<Finding>, DetectorError> {
        let (endpoint, secret) = {
            let config = self.config.lock().expect("llm config lock poisoned");
            let endpoint = config
                .endpoint
                .clone()
                .ok_or(DetectorError::QuotaDenied)?;
            let secret = config
                .auth_env_var
                .as_ref()
                .and_then(|var| std::env::var(var).ok());
            (endpoint, secret)
        };

        let mut request = self.client.post(&endpoint).json(&LlmRequest { snippets });
        if let Some(secret) = secret {
            request = request.bearer_auth(secret);
        }

        let response = request
            .send()
            .map_err(|e| DetectorError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| DetectorError::Request(e.to_string()))?;

        let body: LlmResponse = response
            .json()
            .map_err(|e| DetectorError::Request(e.to_string()))?;

        let findings = body.findings.into_iter().map(map_response_finding).collect();

        self.config
            .lock()
            .expect("llm config lock poisoned")
            .record_usage(snippets.len() as u32);

        Ok(findings)
    }
}

fn map_response_finding(raw: LlmResponseFinding) -> Finding {
    let category = map_category(raw.category.as_deref());
    let severity = raw
        .severity
        .as_deref()
        .and_then(parse_severity)
        .unwrap_or(crate::finding::Severity::Medium);
    let confidence = raw.confidence.unwrap_or(0.9);
    let fingerprint = Finding::fingerprint(&raw.rule_id, &raw.file, raw.line);

    Finding {
        id: 0,
        rule_id: raw.rule_id,
        category,
        severity,
        file: raw.file,
        line: raw.line,
        column: None,
        snippet: String::new(),
        message: raw.message,
        suggestion: None,
        legal_reference: None,
        detector: DetectorKind::Llm,
        fingerprint,
        confidence,
    }
}

fn map_category(raw: Option<&str>) -> Category {
    match raw {
        Some("pii-email") => Category::PiiEmail,
        Some("pii-phone") => Category::PiiPhone,
        Some("pii-financial") => Category::PiiFinancial,
        Some("pii-health") => Category::PiiHealth,
        Some("pii-generic") => Category::PiiGeneric,
        Some("hardcoded-secret") => Category::HardcodedSecret,
        Some("logging-pii") => Category::LoggingPii,
        Some("tracking-cookie") => Category::TrackingCookie,
        Some("tracking-analytics-id") => Category::TrackingAnalyticsId,
        Some("unencrypted-storage") => Category::UnencryptedStorage,
        Some("third-party-transfer") => Category::ThirdPartyTransfer,
        _ => Category::UnknownRisk,
    }
}

fn parse_severity(raw: &str) -> Option<crate::finding::Severity> {
    use crate::finding::Severity;
    match raw {
        "critical" => Some(Severity::Critical),
        "high" => Some(Severity::High),
        "medium" => Some(Severity::Medium),
        "low" => Some(Severity::Low),
        "info" => Some(Severity::Info),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn disabled_config_denies_call() {
        let config = LlmConfig::default();
        assert!(!config.allows_call(Utc::now()));
    }

    #[test]
    fn unlimited_quota_allows_call_without_remaining_uses() {
        let config = LlmConfig {
            enabled: true,
            endpoint: Some("https://example.test".into()),
            quota_type: QuotaType::Unlimited,
            remaining_uses: None,
            expires_at: None,
            auth_env_var: None,
        };
        assert!(config.allows_call(Utc::now()));
    }

    #[test]
    fn exhausted_trial_quota_denies_call() {
        let config = LlmConfig {
            enabled: true,
            endpoint: Some("https://example.test".into()),
            quota_type: QuotaType::Trial,
            remaining_uses: Some(0),
            expires_at: None,
            auth_env_var: None,
        };
        assert!(!config.allows_call(Utc::now()));
    }

    #[test]
    fn expired_trial_quota_denies_call() {
        let config = LlmConfig {
            enabled: true,
            endpoint: Some("https://example.test".into()),
            quota_type: QuotaType::Trial,
            remaining_uses: Some(5),
            expires_at: Some(Utc::now() - Duration::days(1)),
            auth_env_var: None,
        };
        assert!(!config.allows_call(Utc::now()));
    }

    #[test]
    fn usage_based_quota_ignores_expiry() {
        let config = LlmConfig {
            enabled: true,
            endpoint: Some("https://example.test".into()),
            quota_type: QuotaType::UsageBased,
            remaining_uses: Some(3),
            expires_at: Some(Utc::now() - Duration::days(1)),
            auth_env_var: None,
        };
        assert!(config.allows_call(Utc::now()));
    }

    #[test]
    fn record_usage_floor_clamps_at_zero() {
        let mut config = LlmConfig {
            remaining_uses: Some(2),
            ..LlmConfig::default()
        };
        config.record_usage(5);
        assert_eq!(config.remaining_uses, Some(0));
    }

    #[test]
    fn unknown_category_maps_to_unknown_risk() {
        assert_eq!(map_category(Some("bogus")), Category::UnknownRisk);
        assert_eq!(map_category(None), Category::UnknownRisk);
    }
}
