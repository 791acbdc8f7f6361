//! The bootstrap sequence: submit, discover, check quorum, wait for
//! readiness, broadcast.

use std::sync::Arc;

use gridboot_core::{ConfigError, JobHandle, JobRequest, Membership, WorkerEndpoint};
use gridboot_scheduler::BatchScheduler;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::broadcast::broadcast_membership;
use crate::discovery::{PollPolicy, discover_host};
use crate::error::{LaunchError, LaunchResult, SlotFailure};
use crate::readiness::await_ready;
use crate::report::{BroadcastReport, HostFailure, LaunchReport, SlotOutcome, SlotReport};
use crate::settings::{LaunchSettings, Readiness};
use crate::transport::{GrpcTransport, PeerTransport};

/// What one discovery task reports back.
struct SlotMessage {
    slot: usize,
    result: Result<String, SlotFailure>,
}

/// Drives one bootstrap run against a scheduler and the workers' peer
/// services.
pub struct Launcher<S, T = GrpcTransport> {
    scheduler: Arc<S>,
    transport: Arc<T>,
    settings: LaunchSettings,
}

impl<S: BatchScheduler + 'static> Launcher<S, GrpcTransport> {
    /// Create a launcher that reaches workers over gRPC.
    pub fn new(scheduler: S, settings: LaunchSettings) -> Self {
        let transport = GrpcTransport::new(settings.rpc_timeout);
        Self::with_transport(scheduler, transport, settings)
    }
}

impl<S, T> Launcher<S, T>
where
    S: BatchScheduler + 'static,
    T: PeerTransport,
{
    /// Create a launcher with a custom transport to the workers.
    pub fn with_transport(scheduler: S, transport: T, settings: LaunchSettings) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
            transport: Arc::new(transport),
            settings,
        }
    }

    pub fn settings(&self) -> &LaunchSettings {
        &self.settings
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run the whole sequence for `request.worker_count` workers.
    ///
    /// Per-job and per-host failures are logged and recorded in the report.
    /// Only an invalid request or an unmet `min_workers` quorum is an error.
    pub async fn run(&self, request: &JobRequest) -> LaunchResult<LaunchReport> {
        self.preflight(request)?;
        let n = request.worker_count;
        info!(
            workers = n,
            scheduler = self.scheduler.name(),
            command = %request.remote_command,
            "launching workers"
        );

        let (handles, mut rx, mut discovery) = self.submit_all(request).await;
        let submitted = handles.iter().flatten().count();

        let mut results: Vec<Option<Result<String, SlotFailure>>> = vec![None; n];
        let mut membership = Membership::new();
        let mut duplicates = vec![false; n];
        let mut received = 0;

        while received < n {
            let Some(SlotMessage { slot, result }) = rx.recv().await else {
                break;
            };
            received += 1;
            match &result {
                Ok(host) => {
                    if membership.push(host.as_str()) {
                        info!("started worker on {host} ({}/{n})", membership.len());
                    } else {
                        warn!(%host, slot = slot + 1, "host already in membership, dropping duplicate");
                        duplicates[slot] = true;
                    }
                }
                Err(e) => warn!(slot = slot + 1, error = %e, "worker failed to start"),
            }
            results[slot] = Some(result);
        }
        discovery.shutdown().await;

        let slots: Vec<SlotReport> = results
            .into_iter()
            .zip(handles)
            .zip(duplicates)
            .enumerate()
            .map(|(i, ((result, handle), duplicate))| SlotReport {
                slot: i + 1,
                handle,
                outcome: match result {
                    Some(Ok(host)) if duplicate => SlotOutcome::Duplicate { host },
                    Some(Ok(host)) => SlotOutcome::Started { host },
                    Some(Err(error)) => SlotOutcome::Failed { error },
                    None => {
                        error!(slot = i + 1, "no outcome reported for worker");
                        SlotOutcome::Failed {
                            error: SlotFailure::TaskLost,
                        }
                    }
                },
            })
            .collect();

        info!(started = membership.len(), requested = n, %membership, "host discovery complete");

        if let Some(required) = self.settings.min_workers
            && membership.len() < required
        {
            error!(required, reached = membership.len(), "quorum not met, not broadcasting");
            return Err(LaunchError::QuorumNotMet {
                required,
                reached: membership.len(),
            });
        }

        let broadcast = if membership.is_empty() {
            warn!("no workers started, nothing to broadcast");
            BroadcastReport::default()
        } else {
            self.distribute(&membership).await
        };

        info!(
            delivered = broadcast.delivered.len(),
            failed = broadcast.failed.len(),
            "bootstrap run finished"
        );

        Ok(LaunchReport {
            requested: n,
            submitted,
            slots,
            membership,
            broadcast,
        })
    }

    fn preflight(&self, request: &JobRequest) -> Result<(), ConfigError> {
        request.validate()?;
        if let Some(min) = self.settings.min_workers
            && min > request.worker_count
        {
            return Err(ConfigError::Invalid(format!(
                "min_workers ({min}) exceeds requested workers ({})",
                request.worker_count
            )));
        }
        Ok(())
    }

    /// Submit every worker in turn and start a discovery task per accepted
    /// job. Rejected submissions report their failure on the channel right
    /// away, so the collector always sees one message per slot.
    async fn submit_all(
        &self,
        request: &JobRequest,
    ) -> (
        Vec<Option<JobHandle>>,
        mpsc::Receiver<SlotMessage>,
        JoinSet<()>,
    ) {
        let n = request.worker_count;
        let (tx, rx) = mpsc::channel(n);
        let mut handles = Vec::with_capacity(n);
        let mut discovery = JoinSet::new();
        let policy = PollPolicy {
            interval: self.settings.poll_interval,
            error_limit: self.settings.poll_error_limit,
            running_timeout: self.settings.running_timeout,
        };

        for slot in 0..n {
            match self.scheduler.submit(request).await {
                Ok(handle) => {
                    info!(slot = slot + 1, %handle, "job submitted");
                    handles.push(Some(handle.clone()));

                    let scheduler = Arc::clone(&self.scheduler);
                    let tx = tx.clone();
                    discovery.spawn(async move {
                        let result = discover_host(scheduler.as_ref(), &handle, policy).await;
                        let _ = tx.send(SlotMessage { slot, result }).await;
                    });
                }
                Err(e) => {
                    warn!(slot = slot + 1, error = %e, "job submission failed");
                    handles.push(None);
                    let failure = SlotFailure::Submission {
                        reason: e.to_string(),
                    };
                    let _ = tx
                        .send(SlotMessage {
                            slot,
                            result: Err(failure),
                        })
                        .await;
                }
            }
        }

        (handles, rx, discovery)
    }

    /// Wait for readiness, then push the membership to every ready worker.
    async fn distribute(&self, membership: &Membership) -> BroadcastReport {
        let endpoints: Vec<WorkerEndpoint> = membership.endpoints(self.settings.peer_port);

        let (targets, mut failed) = match self.settings.readiness {
            Readiness::Handshake { timeout, interval } => {
                let outcome = await_ready(&self.transport, &endpoints, timeout, interval).await;
                let not_ready = outcome
                    .not_ready
                    .into_iter()
                    .map(|(endpoint, error)| HostFailure {
                        host: endpoint.hostname,
                        error,
                    })
                    .collect();
                (outcome.ready, not_ready)
            }
            Readiness::Delay(delay) => {
                info!(delay_secs = delay.as_secs(), "waiting for workers to settle");
                tokio::time::sleep(delay).await;
                (endpoints, Vec::new())
            }
        };

        info!(targets = targets.len(), %membership, "broadcasting membership");
        let results =
            broadcast_membership(&self.transport, &targets, Arc::new(membership.clone())).await;

        let mut delivered = Vec::new();
        for (endpoint, result) in targets.into_iter().zip(results) {
            match result {
                Ok(_) => delivered.push(endpoint.hostname),
                Err(error) => failed.push(HostFailure {
                    host: endpoint.hostname,
                    error,
                }),
            }
        }

        // Report failures in membership order, whichever phase produced them.
        failed.sort_by_key(|f| membership.iter().position(|h| *h == f.host));

        BroadcastReport { delivered, failed }
    }
}
