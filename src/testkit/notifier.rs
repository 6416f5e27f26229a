//! Recording notifier for asserting approval traffic.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{ApprovalId, ApprovalOutcome, PendingApproval};
use crate::port::ApprovalNotifier;

/// Notifier that records every call for later assertion.
#[derive(Default)]
pub struct RecordingNotifier {
    requests: Mutex<Vec<PendingApproval>>,
    resolutions: Mutex<Vec<(ApprovalId, ApprovalOutcome)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<PendingApproval> {
        self.requests.lock().clone()
    }

    pub fn resolutions(&self) -> Vec<(ApprovalId, ApprovalOutcome)> {
        self.resolutions.lock().clone()
    }
}

#[async_trait]
impl ApprovalNotifier for RecordingNotifier {
    async fn notify_request(&self, approval: &PendingApproval) {
        self.requests.lock().push(approval.clone());
    }

    async fn notify_resolved(&self, approval: &PendingApproval, outcome: ApprovalOutcome) {
        self.resolutions.lock().push((approval.id.clone(), outcome));
    }
}
