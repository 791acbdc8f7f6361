//! Run report returned by [`Launcher::run`](crate::Launcher::run).

use std::path::Path;

use gridboot_core::{JobHandle, Membership};
use serde::Serialize;

use crate::error::{BroadcastError, SlotFailure};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchReport {
    pub requested: usize,
    /// Submissions the scheduler accepted.
    pub submitted: usize,
    /// One entry per requested worker, in submission order.
    pub slots: Vec<SlotReport>,
    pub membership: Membership,
    pub broadcast: BroadcastReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotReport {
    /// 1-based submission index.
    pub slot: usize,
    pub handle: Option<JobHandle>,
    #[serde(flatten)]
    pub outcome: SlotOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotOutcome {
    Started { host: String },
    /// Resolved to a host already in the membership.
    Duplicate { host: String },
    Failed { error: SlotFailure },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BroadcastReport {
    /// Hosts that accepted the membership, in membership order.
    pub delivered: Vec<String>,
    pub failed: Vec<HostFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostFailure {
    pub host: String,
    pub error: BroadcastError,
}

impl LaunchReport {
    /// Workers that started on a distinct host.
    pub fn started(&self) -> usize {
        self.membership.len()
    }

    pub fn failed_slots(&self) -> impl Iterator<Item = &SlotReport> {
        self.slots
            .iter()
            .filter(|s| matches!(s.outcome, SlotOutcome::Failed { .. }))
    }

    /// Every requested worker started and received the membership.
    pub fn is_complete(&self) -> bool {
        self.started() == self.requested
            && self.broadcast.failed.is_empty()
            && self.broadcast.delivered.len() == self.membership.len()
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json + "\n")
    }
}
