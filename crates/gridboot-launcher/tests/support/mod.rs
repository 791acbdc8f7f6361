//! Shared fakes for launcher integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gridboot_core::{JobHandle, JobRequest, JobState, Membership, WorkerEndpoint};
use gridboot_launcher::{BroadcastError, LaunchSettings, PeerTransport, Readiness};
use gridboot_peer::PeerClient;
use gridboot_scheduler::{BatchScheduler, SchedulerError, SchedulerResult};

/// Scripted life of one submitted job.
#[derive(Debug, Clone)]
pub struct JobScript {
    pub reject: Option<String>,
    /// States returned by successive polls; the last one repeats.
    pub states: Vec<JobState>,
    pub host: Option<String>,
}

impl JobScript {
    /// Running after `pending_polls` pending answers, on `host`.
    pub fn runs_on(host: &str, pending_polls: usize) -> Self {
        let mut states = vec![JobState::Pending; pending_polls];
        states.push(JobState::Running);
        Self {
            reject: None,
            states,
            host: Some(host.to_string()),
        }
    }

    pub fn ends_as(state: JobState) -> Self {
        Self {
            reject: None,
            states: vec![JobState::Pending, state],
            host: None,
        }
    }

    pub fn stays_pending() -> Self {
        Self {
            reject: None,
            states: vec![JobState::Pending],
            host: None,
        }
    }

    pub fn rejected(reason: &str) -> Self {
        Self {
            reject: Some(reason.to_string()),
            states: Vec::new(),
            host: None,
        }
    }
}

/// In-memory scheduler. The i-th submission follows the i-th script and is
/// assigned handle `job-<i>`.
pub struct ScriptedScheduler {
    scripts: Vec<JobScript>,
    submissions: AtomicUsize,
    polls: Mutex<HashMap<JobHandle, usize>>,
    resolved: Mutex<Vec<JobHandle>>,
}

impl ScriptedScheduler {
    pub fn new(scripts: Vec<JobScript>) -> Self {
        Self {
            scripts,
            submissions: AtomicUsize::new(0),
            polls: Mutex::new(HashMap::new()),
            resolved: Mutex::new(Vec::new()),
        }
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    fn script(&self, handle: &JobHandle) -> Option<&JobScript> {
        let index: usize = handle.as_str().strip_prefix("job-")?.parse().ok()?;
        self.scripts.get(index - 1)
    }
}

impl BatchScheduler for ScriptedScheduler {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn submit(&self, _request: &JobRequest) -> SchedulerResult<JobHandle> {
        let index = self.submissions.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(index).and_then(|s| s.reject.clone()) {
            Some(reason) => Err(SchedulerError::Submission { reason }),
            None => Ok(JobHandle::new(format!("job-{}", index + 1))),
        }
    }

    async fn poll_state(&self, handle: &JobHandle) -> SchedulerResult<JobState> {
        let Some(script) = self.script(handle) else {
            return Ok(JobState::Done);
        };
        let mut polls = self.polls.lock().unwrap();
        let count = polls.entry(handle.clone()).or_insert(0);
        let state = script
            .states
            .get(*count)
            .or(script.states.last())
            .copied()
            .unwrap_or(JobState::Unknown);
        *count += 1;
        Ok(state)
    }

    async fn resolve_host(&self, handle: &JobHandle) -> SchedulerResult<String> {
        self.resolved.lock().unwrap().push(handle.clone());
        self.script(handle)
            .and_then(|s| s.host.clone())
            .ok_or_else(|| SchedulerError::HostResolution {
                handle: handle.clone(),
                reason: "no queue instance".to_string(),
            })
    }
}

/// Records every ping and delivery. Hosts in `silent` never answer; hosts
/// in `refusing` answer pings but reject the membership.
#[derive(Default)]
pub struct RecordingTransport {
    pub silent: HashSet<String>,
    pub refusing: HashSet<String>,
    pub pinged: Mutex<Vec<String>>,
    pub delivered: Mutex<Vec<(String, Membership)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn silent(mut self, host: &str) -> Self {
        self.silent.insert(host.to_string());
        self
    }

    pub fn refusing(mut self, host: &str) -> Self {
        self.refusing.insert(host.to_string());
        self
    }

    pub fn received_by(&self, host: &str) -> Option<Membership> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .find(|(h, _)| h == host)
            .map(|(_, m)| m.clone())
    }

    pub fn contacted(&self, host: &str) -> bool {
        self.pinged.lock().unwrap().iter().any(|h| h == host)
            || self.received_by(host).is_some()
    }
}

impl PeerTransport for RecordingTransport {
    async fn ping(&self, endpoint: &WorkerEndpoint) -> Result<(), BroadcastError> {
        self.pinged.lock().unwrap().push(endpoint.hostname.clone());
        if self.silent.contains(&endpoint.hostname) {
            return Err(BroadcastError::Connect {
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn deliver(
        &self,
        endpoint: &WorkerEndpoint,
        membership: &Membership,
    ) -> Result<u32, BroadcastError> {
        if self.silent.contains(&endpoint.hostname) {
            return Err(BroadcastError::Connect {
                reason: "connection refused".to_string(),
            });
        }
        if self.refusing.contains(&endpoint.hostname) {
            return Err(BroadcastError::Call {
                code: "Unavailable".to_string(),
                message: "worker shutting down".to_string(),
            });
        }
        self.delivered
            .lock()
            .unwrap()
            .push((endpoint.hostname.clone(), membership.clone()));
        Ok(membership.len() as u32)
    }
}

/// Real gRPC to bootstrap servers on 127.0.0.1, one port per hostname.
pub struct LoopbackTransport {
    pub ports: HashMap<String, u16>,
    pub rpc_timeout: Duration,
}

impl LoopbackTransport {
    fn client(&self, endpoint: &WorkerEndpoint) -> Result<PeerClient, BroadcastError> {
        let port = self
            .ports
            .get(&endpoint.hostname)
            .copied()
            .ok_or_else(|| BroadcastError::Connect {
                reason: format!("unknown host {}", endpoint.hostname),
            })?;
        Ok(PeerClient::new(
            WorkerEndpoint::new("127.0.0.1", port),
            self.rpc_timeout,
        ))
    }
}

impl PeerTransport for LoopbackTransport {
    async fn ping(&self, endpoint: &WorkerEndpoint) -> Result<(), BroadcastError> {
        self.client(endpoint)?.ping().await?;
        Ok(())
    }

    async fn deliver(
        &self,
        endpoint: &WorkerEndpoint,
        membership: &Membership,
    ) -> Result<u32, BroadcastError> {
        Ok(self.client(endpoint)?.set_peers(membership).await?)
    }
}

pub fn request(workers: usize) -> JobRequest {
    JobRequest::new(workers, "/opt/worker/bin/worker").with_args(["serve"])
}

/// Fast settings for paused-clock tests.
pub fn settings() -> LaunchSettings {
    LaunchSettings {
        poll_interval: Duration::from_millis(500),
        readiness: Readiness::Handshake {
            timeout: Duration::from_secs(5),
            interval: Duration::from_millis(250),
        },
        ..LaunchSettings::default()
    }
}

/// Settings for tests that talk to real sockets.
pub fn loopback_settings() -> LaunchSettings {
    LaunchSettings {
        poll_interval: Duration::from_millis(10),
        readiness: Readiness::Handshake {
            timeout: Duration::from_secs(5),
            interval: Duration::from_millis(20),
        },
        rpc_timeout: Duration::from_secs(2),
        ..LaunchSettings::default()
    }
}

pub fn hosts(names: &[&str]) -> Membership {
    Membership::from(names.iter().map(|h| h.to_string()).collect::<Vec<_>>())
}
