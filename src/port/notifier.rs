//! Outbound notification port for approval requests.

use async_trait::async_trait;

use crate::domain::{ApprovalOutcome, PendingApproval};

/// Delivers approval requests to a human operator channel.
///
/// The transport (messaging bot, web hook, console) is out of scope; the
/// workflow only needs to announce a new request and its eventual outcome.
/// Notification failures are logged and swallowed; a dead notifier must
/// not block governance.
#[async_trait]
pub trait ApprovalNotifier: Send + Sync {
    /// Announce a newly created approval request.
    async fn notify_request(&self, approval: &PendingApproval);

    /// Announce the terminal outcome for a request.
    async fn notify_resolved(&self, approval: &PendingApproval, outcome: ApprovalOutcome);
}

/// Notifier that does nothing. Default when no operator channel is wired.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl ApprovalNotifier for NullNotifier {
    async fn notify_request(&self, _approval: &PendingApproval) {}

    async fn notify_resolved(&self, _approval: &PendingApproval, _outcome: ApprovalOutcome) {}
}
