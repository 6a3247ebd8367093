//! Approval gate for remote protocol tool calls

use crate::error::{ConductorError, ConductorResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Notify;

/// How staged approval requests are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Auto-approve every request with the configured headers.
    /// Models environments that trust a remote tool server unconditionally.
    AlwaysApprove,
    /// Auto-reject every request
    AlwaysReject,
    /// The caller must resolve each request with [`ApprovalGate::decide`]
    #[default]
    Manual,
}

/// A remote tool call awaiting (or carrying) an approval decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Id of the tool call being approved
    pub call_id: String,
    /// Name of the remote tool
    pub tool_name: String,
    /// `Some(true)` approved, `Some(false)` rejected, `None` pending
    pub approved: Option<bool>,
    /// Authorization metadata attached to the decision (e.g. a secret header)
    pub headers: HashMap<String, String>,
}

impl ApprovalRequest {
    /// Create a pending request
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            approved: None,
            headers: HashMap::new(),
        }
    }

    /// Whether a decision has been recorded
    pub fn is_resolved(&self) -> bool {
        self.approved.is_some()
    }

    /// Whether the request was approved
    pub fn is_approved(&self) -> bool {
        self.approved == Some(true)
    }

    fn resolve(mut self, approved: bool, headers: HashMap<String, String>) -> Self {
        self.approved = Some(approved);
        self.headers = headers;
        self
    }
}

#[derive(Debug, Default)]
struct GateState {
    staged: Vec<ApprovalRequest>,
    resolved: Vec<ApprovalRequest>,
}

/// Checkpoint where remote tool calls are authorized before execution
///
/// The driver stages every approval request of the current action here and
/// waits until all of them are resolved before resubmitting; a staged
/// request left pending when the owning run is cancelled is discarded
/// without effect. `decide` may be called from any task; it is serialized
/// against the driver's drain by the internal lock.
#[derive(Debug)]
pub struct ApprovalGate {
    policy: ApprovalPolicy,
    default_headers: HashMap<String, String>,
    state: Mutex<GateState>,
    notify: Notify,
}

impl ApprovalGate {
    /// Create a gate with the given policy and no default headers
    pub fn new(policy: ApprovalPolicy) -> Self {
        Self {
            policy,
            default_headers: HashMap::new(),
            state: Mutex::new(GateState::default()),
            notify: Notify::new(),
        }
    }

    /// Attach headers added to every auto-approved decision
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.default_headers = headers;
        self
    }

    /// The configured policy
    pub fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    /// Stage a request; auto-resolves under non-manual policies
    pub fn stage(&self, request: ApprovalRequest) {
        let mut state = self.state.lock();
        match self.policy {
            ApprovalPolicy::AlwaysApprove => {
                tracing::debug!(call_id = %request.call_id, tool = %request.tool_name, "auto-approving remote tool call");
                state
                    .resolved
                    .push(request.resolve(true, self.default_headers.clone()));
            }
            ApprovalPolicy::AlwaysReject => {
                state.resolved.push(request.resolve(false, HashMap::new()));
            }
            ApprovalPolicy::Manual => state.staged.push(request),
        }
        drop(state);
        self.notify.notify_waiters();
    }

    /// Record a decision for a staged request
    ///
    /// Headers default to the gate's configured headers when approving.
    pub fn decide(
        &self,
        call_id: &str,
        approved: bool,
        headers: Option<HashMap<String, String>>,
    ) -> ConductorResult<ApprovalRequest> {
        let mut state = self.state.lock();
        let position = state
            .staged
            .iter()
            .position(|request| request.call_id == call_id)
            .ok_or_else(|| {
                ConductorError::invalid_state(format!("no pending approval for call '{call_id}'"))
            })?;
        let request = state.staged.remove(position);
        let headers = match (approved, headers) {
            (_, Some(headers)) => headers,
            (true, None) => self.default_headers.clone(),
            (false, None) => HashMap::new(),
        };
        let resolved = request.resolve(approved, headers);
        state.resolved.push(resolved.clone());
        drop(state);
        self.notify.notify_waiters();
        Ok(resolved)
    }

    /// Number of requests still awaiting a decision
    pub fn pending(&self) -> usize {
        self.state.lock().staged.len()
    }

    /// The staged requests awaiting a decision
    pub fn pending_requests(&self) -> Vec<ApprovalRequest> {
        self.state.lock().staged.clone()
    }

    /// Take every resolved request; each is returned exactly once
    pub fn drain(&self) -> Vec<ApprovalRequest> {
        std::mem::take(&mut self.state.lock().resolved)
    }

    /// Drop staged and resolved requests without effect (run cancelled)
    pub fn discard(&self) {
        let mut state = self.state.lock();
        state.staged.clear();
        state.resolved.clear();
        drop(state);
        self.notify.notify_waiters();
    }

    /// Wait until no staged request is pending
    pub async fn resolved(&self) {
        loop {
            let notified = self.notify.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn secret_headers() -> HashMap<String, String> {
        HashMap::from([("SuperSecret".to_string(), "123456".to_string())])
    }

    #[test]
    fn always_approve_resolves_with_configured_headers() {
        let gate = ApprovalGate::new(ApprovalPolicy::AlwaysApprove).with_headers(secret_headers());
        gate.stage(ApprovalRequest::new("call_1", "search_docs"));
        gate.stage(ApprovalRequest::new("call_2", "search_docs"));

        assert_eq!(gate.pending(), 0);
        let resolved = gate.drain();
        assert_eq!(resolved.len(), 2);
        for request in &resolved {
            assert!(request.is_approved());
            assert_eq!(request.headers.get("SuperSecret").unwrap(), "123456");
        }
        // Consumed exactly once.
        assert!(gate.drain().is_empty());
    }

    #[test]
    fn always_reject_resolves_without_headers() {
        let gate = ApprovalGate::new(ApprovalPolicy::AlwaysReject).with_headers(secret_headers());
        gate.stage(ApprovalRequest::new("call_1", "search_docs"));
        let resolved = gate.drain();
        assert_eq!(resolved.len(), 1);
        assert!(!resolved[0].is_approved());
        assert!(resolved[0].headers.is_empty());
    }

    #[test]
    fn manual_requires_an_explicit_decision() {
        let gate = ApprovalGate::new(ApprovalPolicy::Manual).with_headers(secret_headers());
        gate.stage(ApprovalRequest::new("call_1", "search_docs"));
        assert_eq!(gate.pending(), 1);
        assert!(gate.drain().is_empty());

        let resolved = gate.decide("call_1", true, None).unwrap();
        assert!(resolved.is_approved());
        assert_eq!(resolved.headers, secret_headers());
        assert_eq!(gate.pending(), 0);
        assert_eq!(gate.drain().len(), 1);
    }

    #[test]
    fn deciding_an_unknown_call_is_an_error() {
        let gate = ApprovalGate::new(ApprovalPolicy::Manual);
        let err = gate.decide("call_nope", true, None).unwrap_err();
        assert!(matches!(err, ConductorError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn resolved_waits_for_the_last_decision() {
        let gate = Arc::new(ApprovalGate::new(ApprovalPolicy::Manual));
        gate.stage(ApprovalRequest::new("call_1", "search_docs"));
        gate.stage(ApprovalRequest::new("call_2", "search_docs"));

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.resolved().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        gate.decide("call_1", true, None).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        gate.decide("call_2", false, None).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }

    #[test]
    fn discard_drops_everything() {
        let gate = ApprovalGate::new(ApprovalPolicy::Manual);
        gate.stage(ApprovalRequest::new("call_1", "search_docs"));
        gate.decide("call_1", true, None).unwrap();
        gate.stage(ApprovalRequest::new("call_2", "search_docs"));
        gate.discard();
        assert_eq!(gate.pending(), 0);
        assert!(gate.drain().is_empty());
    }
}
