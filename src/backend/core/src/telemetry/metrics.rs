//! Access-control counters.
//!
//! Emitted through the `metrics` facade. Without an installed recorder these
//! are no-ops, which keeps the library usable in tests and embedded hosts.

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Register descriptions for every counter this crate emits.
pub fn describe_metrics() {
    describe_counter!("strive_errors_total", "Errors constructed, by code and severity");
    describe_counter!(
        "strive_access_denied_total",
        "Access-control denials, by reason"
    );
    describe_counter!(
        "strive_audit_failures_total",
        "Audit writes that failed after a successful mutation"
    );
    describe_counter!("strive_audit_entries_total", "Audit entries recorded, by action");
}

/// Install the Prometheus recorder and describe every counter.
///
/// Call once per process; a second install fails.
pub fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    Unauthenticated,
    MissingCapability,
    RoleInsufficient,
    TierInsufficient,
    OrganizationRequired,
    Route,
}

impl DenialReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::MissingCapability => "missing_capability",
            Self::RoleInsufficient => "role_insufficient",
            Self::TierInsufficient => "tier_insufficient",
            Self::OrganizationRequired => "organization_required",
            Self::Route => "route",
        }
    }
}

/// Counters for access decisions.
pub struct AccessMetrics;

impl AccessMetrics {
    pub fn denied(reason: DenialReason) {
        counter!("strive_access_denied_total", "reason" => reason.as_str()).increment(1);
    }
}

/// Counters for the audit trail.
pub struct AuditMetrics;

impl AuditMetrics {
    pub fn recorded(action: &'static str) {
        counter!("strive_audit_entries_total", "action" => action).increment(1);
    }

    pub fn failed(action: &'static str) {
        counter!("strive_audit_failures_total", "action" => action).increment(1);
    }
}
