//! Fire-and-forget audit sink for wallet actions.
//!
//! Audit entries bracket any movement of funds: the orchestrator records an
//! approval before a transfer is attempted and the result afterwards. The
//! sink must never block or fail the payment flow, so implementations
//! swallow their own errors.

use async_trait::async_trait;

/// The kinds of wallet actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditKind {
    /// Limit and balance checks passed; a transfer is about to be attempted.
    PaymentApproved,
    /// Proof of payment was produced (authorization signed or funds moved).
    PaymentExecuted,
    /// The payment attempt failed after approval.
    PaymentFailed,
    /// Identity-attestation headers were attached to the retried request.
    AttestationIncluded,
    /// Attestation was unavailable or failed; the payment continued without it.
    AttestationSkipped,
    /// An unexpected error aborted the flow.
    PaymentError,
}

impl AuditKind {
    /// The stable string tag written into audit entries.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentApproved => "payment_approved",
            Self::PaymentExecuted => "payment_executed",
            Self::PaymentFailed => "payment_failed",
            Self::AttestationIncluded => "attestation_headers_included",
            Self::AttestationSkipped => "attestation_headers_skipped",
            Self::PaymentError => "payment_error",
        }
    }
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives audit entries from the payment flow.
///
/// Implementations must be fire-and-forget: they return nothing and must
/// not fail or block the payment on sink trouble.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records one action with structured details.
    async fn log_action(&self, kind: AuditKind, details: serde_json::Value);
}

/// Default sink that emits structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAudit;

#[async_trait]
impl AuditSink for TracingAudit {
    async fn log_action(&self, kind: AuditKind, details: serde_json::Value) {
        tracing::info!(action = kind.as_str(), %details, "wallet audit");
    }
}

/// Sink that discards everything; for tests and opt-out configurations.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudit;

#[async_trait]
impl AuditSink for NullAudit {
    async fn log_action(&self, _kind: AuditKind, _details: serde_json::Value) {}
}

/// Test helper that collects entries in memory.
#[derive(Debug, Default)]
pub struct RecordingAudit {
    entries: tokio::sync::Mutex<Vec<(AuditKind, serde_json::Value)>>,
}

impl RecordingAudit {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded entries in order.
    pub async fn entries(&self) -> Vec<(AuditKind, serde_json::Value)> {
        self.entries.lock().await.clone()
    }

    /// Returns how many entries of `kind` were recorded.
    pub async fn count(&self, kind: AuditKind) -> usize {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn log_action(&self, kind: AuditKind, details: serde_json::Value) {
        self.entries.lock().await.push((kind, details));
    }
}
