//! Human-in-the-loop approval workflow.
//!
//! A gated action creates a request and blocks on its [`ApprovalTicket`]
//! until an out-of-band callback resolves it or the TTL expires. The
//! callback, the waiter's own deadline, and the background sweep race to
//! resolve each id; whichever removes the registry entry first owns the
//! oneshot sender, so every id resolves exactly once.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{ApprovalAction, ApprovalDecision, ApprovalId, ApprovalOutcome, PendingApproval};
use crate::error::ApprovalError;
use crate::port::ApprovalNotifier;

struct PendingEntry {
    approval: PendingApproval,
    tx: oneshot::Sender<ApprovalOutcome>,
}

/// Registry of pending approvals plus the notifier used to announce them.
pub struct ApprovalWorkflow {
    registry: DashMap<ApprovalId, PendingEntry>,
    notifier: Arc<dyn ApprovalNotifier>,
}

impl ApprovalWorkflow {
    #[must_use]
    pub fn new(notifier: Arc<dyn ApprovalNotifier>) -> Self {
        Self {
            registry: DashMap::new(),
            notifier,
        }
    }

    /// Create a request and return the ticket the caller blocks on.
    pub async fn create_request(
        self: &Arc<Self>,
        tool_name: &str,
        params: serde_json::Value,
        ttl: Duration,
    ) -> ApprovalTicket {
        let now = Utc::now();
        let approval = PendingApproval {
            id: ApprovalId::generate(),
            tool_name: tool_name.to_string(),
            params,
            created_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero()),
        };
        let (tx, rx) = oneshot::channel();

        info!(id = %approval.id, tool = %approval.tool_name, ttl_secs = ttl.as_secs(), "Approval requested");
        self.notifier.notify_request(&approval).await;
        self.registry
            .insert(approval.id.clone(), PendingEntry { approval: approval.clone(), tx });

        ApprovalTicket {
            approval,
            rx,
            workflow: Arc::clone(self),
            ttl,
        }
    }

    /// Resolve a request from an inbound callback. Returns `false` when the
    /// id is unknown or already resolved; repeated callbacks are no-ops.
    pub async fn resolve(&self, id: &ApprovalId, decision: ApprovalDecision) -> bool {
        let Some((_, entry)) = self.registry.remove(id) else {
            debug!(id = %id, "Approval callback for unknown or already-resolved id");
            return false;
        };
        let outcome = match decision {
            ApprovalDecision::Approve => ApprovalOutcome::Approved,
            ApprovalDecision::Reject => ApprovalOutcome::Rejected,
        };
        info!(id = %id, outcome = ?outcome, "Approval resolved by callback");
        self.notifier.notify_resolved(&entry.approval, outcome).await;
        // Waiter may have given up; a dropped receiver is fine.
        let _ = entry.tx.send(outcome);
        true
    }

    /// Apply an inbound callback payload (`{id, action}` off the wire).
    ///
    /// Returns the outcome applied, or [`ApprovalError::NotFound`] when the
    /// id is unknown, already resolved, or expired.
    pub async fn handle_action(
        &self,
        action: ApprovalAction,
    ) -> std::result::Result<ApprovalOutcome, ApprovalError> {
        let outcome = match action.action {
            ApprovalDecision::Approve => ApprovalOutcome::Approved,
            ApprovalDecision::Reject => ApprovalOutcome::Rejected,
        };
        if self.resolve(&action.id, action.action).await {
            Ok(outcome)
        } else {
            Err(ApprovalError::NotFound {
                id: action.id.to_string(),
            })
        }
    }

    /// Expire every entry past its deadline. Returns how many were expired.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<ApprovalId> = self
            .registry
            .iter()
            .filter(|entry| entry.approval.is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut count = 0;
        for id in expired {
            // remove() may lose the race to a concurrent callback; that is
            // the exactly-once guarantee working as intended.
            if let Some((_, entry)) = self.registry.remove(&id) {
                warn!(id = %id, tool = %entry.approval.tool_name, "Approval expired");
                self.notifier
                    .notify_resolved(&entry.approval, ApprovalOutcome::Expired)
                    .await;
                let _ = entry.tx.send(ApprovalOutcome::Expired);
                count += 1;
            }
        }
        count
    }

    /// Spawn the periodic expiry sweep.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let workflow = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                workflow.sweep().await;
            }
        })
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// Snapshot of pending approvals, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<PendingApproval> {
        let mut pending: Vec<PendingApproval> = self
            .registry
            .iter()
            .map(|entry| entry.approval.clone())
            .collect();
        pending.sort_by_key(|a| a.created_at);
        pending
    }
}

/// Waiter side of one approval request.
pub struct ApprovalTicket {
    approval: PendingApproval,
    rx: oneshot::Receiver<ApprovalOutcome>,
    workflow: Arc<ApprovalWorkflow>,
    ttl: Duration,
}

impl ApprovalTicket {
    #[must_use]
    pub fn id(&self) -> &ApprovalId {
        &self.approval.id
    }

    #[must_use]
    pub fn approval(&self) -> &PendingApproval {
        &self.approval
    }

    /// Block until a callback resolves the request or the TTL elapses.
    ///
    /// On timeout the ticket claims its own entry; if a callback got there
    /// first the callback's outcome is honored.
    pub async fn wait(self) -> ApprovalOutcome {
        let mut rx = self.rx;
        tokio::select! {
            resolved = &mut rx => resolved.unwrap_or(ApprovalOutcome::Expired),
            () = tokio::time::sleep(self.ttl) => {
                if self.workflow.registry.remove(&self.approval.id).is_some() {
                    warn!(id = %self.approval.id, "Approval timed out waiting for operator");
                    self.workflow
                        .notifier
                        .notify_resolved(&self.approval, ApprovalOutcome::Expired)
                        .await;
                    ApprovalOutcome::Expired
                } else {
                    // A callback or sweep won the race; take its outcome.
                    rx.await.unwrap_or(ApprovalOutcome::Expired)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::NullNotifier;
    use serde_json::json;

    fn workflow() -> Arc<ApprovalWorkflow> {
        Arc::new(ApprovalWorkflow::new(Arc::new(NullNotifier)))
    }

    #[tokio::test]
    async fn callback_resolves_waiting_ticket() {
        let wf = workflow();
        let ticket = wf
            .create_request("execute_trade", json!({"token": "SOL"}), Duration::from_secs(5))
            .await;
        let id = ticket.id().clone();

        let resolver = Arc::clone(&wf);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(resolver.resolve(&id, ApprovalDecision::Approve).await);
        });

        assert_eq!(ticket.wait().await, ApprovalOutcome::Approved);
        assert_eq!(wf.pending_count(), 0);
    }

    #[tokio::test]
    async fn second_callback_is_a_no_op() {
        let wf = workflow();
        let ticket = wf
            .create_request("execute_trade", json!({}), Duration::from_secs(5))
            .await;
        let id = ticket.id().clone();

        assert!(wf.resolve(&id, ApprovalDecision::Reject).await);
        assert!(!wf.resolve(&id, ApprovalDecision::Approve).await);
        assert_eq!(ticket.wait().await, ApprovalOutcome::Rejected);
    }

    #[tokio::test]
    async fn ticket_expires_without_callback() {
        let wf = workflow();
        let ticket = wf
            .create_request("execute_trade", json!({}), Duration::from_millis(30))
            .await;

        assert_eq!(ticket.wait().await, ApprovalOutcome::Expired);
        assert_eq!(wf.pending_count(), 0);
    }

    #[tokio::test]
    async fn sweep_expires_abandoned_requests_once() {
        let wf = workflow();
        let ticket = wf
            .create_request("execute_trade", json!({}), Duration::from_millis(10))
            .await;
        let id = ticket.id().clone();
        drop(ticket); // waiter gone; only the sweep can clean up

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(wf.sweep().await, 1);
        assert_eq!(wf.sweep().await, 0);
        assert!(!wf.resolve(&id, ApprovalDecision::Approve).await);
    }

    #[tokio::test]
    async fn approval_beats_late_expiry() {
        let wf = workflow();
        let ticket = wf
            .create_request("execute_trade", json!({}), Duration::from_secs(1))
            .await;
        let id = ticket.id().clone();

        let resolver = Arc::clone(&wf);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            resolver.resolve(&id, ApprovalDecision::Approve).await;
        });

        assert_eq!(ticket.wait().await, ApprovalOutcome::Approved);
        // A sweep after resolution must be a no-op.
        assert_eq!(wf.sweep().await, 0);
    }

    #[tokio::test]
    async fn wire_payload_resolves_request() {
        let wf = workflow();
        let ticket = wf
            .create_request("execute_trade", json!({}), Duration::from_secs(5))
            .await;

        let payload = format!(r#"{{"id":"{}","action":"approve"}}"#, ticket.id());
        let action: ApprovalAction = serde_json::from_str(&payload).unwrap();

        assert_eq!(wf.handle_action(action).await.unwrap(), ApprovalOutcome::Approved);
        assert_eq!(ticket.wait().await, ApprovalOutcome::Approved);
    }

    #[tokio::test]
    async fn wire_payload_for_unknown_id_is_not_found() {
        let wf = workflow();
        let action = ApprovalAction {
            id: "missing".into(),
            action: ApprovalDecision::Reject,
        };

        let err = wf.handle_action(action).await.unwrap_err();
        assert!(matches!(err, ApprovalError::NotFound { id } if id == "missing"));
    }

    #[tokio::test]
    async fn pending_snapshot_lists_open_requests() {
        let wf = workflow();
        let _t1 = wf
            .create_request("execute_trade", json!({}), Duration::from_secs(5))
            .await;
        let _t2 = wf
            .create_request("close_position", json!({}), Duration::from_secs(5))
            .await;

        assert_eq!(wf.pending_count(), 2);
        let tools: Vec<String> = wf.pending().into_iter().map(|a| a.tool_name).collect();
        assert!(tools.contains(&"execute_trade".to_string()));
    }
}
