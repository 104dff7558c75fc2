// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, run loops, shutdown.

use dcc_adapters::{
    ChatAdapter, CoordAdapter, DiscoveryAdapter, MailAdapter, PeerError, PeerRpc,
};
use dcc_core::{BucketId, Clock, WorkerUri};
use dcc_exec::{
    BuildExecutor, Envelope, ErrorContext, ExecConfig, ExecError, Notifier, NotifyConfig,
};
use dcc_scheduler::{
    BucketQueue, Election, LeaderService, Nomination, ProjectScanner, Role, Tyrant,
};
use dcc_store::Store;
use fs2::FileExt;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::client::TcpPeers;
use crate::config::Config;
use crate::listener::{self, RpcState};

/// Errors from daemon startup
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("another worker already holds the lock under {0}")]
    AlreadyLocked(PathBuf),
    #[error("discovery error: {0}")]
    Discovery(#[from] dcc_adapters::DiscoveryError),
}

/// A running worker; dropping it does not stop the loops, call [`DaemonHandle::stop`].
pub struct DaemonHandle {
    uri: WorkerUri,
    shutdown: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    // NOTE(lifetime): held to keep the exclusive state-dir lock; released on drop
    #[allow(dead_code)]
    lock_file: std::fs::File,
}

impl DaemonHandle {
    /// URI peers use to reach this worker.
    pub fn uri(&self) -> &WorkerUri {
        &self.uri
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop all loops, retire the discovery tag, and wait for the tasks.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

/// Start a worker: bind the listener, announce the discovery tag, and
/// spawn the election loop, the RPC listener, and the executor pull loop.
pub async fn launch<S, K, D, M, H, C>(
    config: Config,
    store: S,
    coord: K,
    discovery: D,
    mail: M,
    chat: H,
    clock: C,
) -> Result<DaemonHandle, DaemonError>
where
    S: Store,
    K: CoordAdapter,
    D: DiscoveryAdapter,
    M: MailAdapter,
    H: ChatAdapter,
    C: Clock,
{
    let state_dir = config.resolve_state_dir()?;
    std::fs::create_dir_all(&state_dir)?;
    let lock_file = std::fs::File::create(state_dir.join("worker.lock"))?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| DaemonError::AlreadyLocked(state_dir.clone()))?;

    let tcp = TcpListener::bind(&config.listen_addr).await?;
    let bound = tcp.local_addr()?.to_string();
    let uri = config.self_uri(&bound);
    let group = config.group_name();
    let timing = config.timing.clone();
    let hostname = config.hostname();

    discovery.announce(&group, &uri).await?;
    let neighbours = discovery.find_workers(&group).await?;
    tracing::info!(
        %uri,
        group = %group,
        tyrant = config.tyrant,
        peers = neighbours.len(),
        "worker up"
    );

    let shutdown = CancellationToken::new();
    let queue = Arc::new(Mutex::new(BucketQueue::new()));
    let role = Arc::new(Mutex::new(Role::Follower { leader_uri: None }));
    let leader_cell: Arc<Mutex<Option<WorkerUri>>> = Arc::new(Mutex::new(None));
    let current: Arc<Mutex<Option<BucketId>>> = Arc::new(Mutex::new(None));

    let election: Box<dyn Election> = if config.tyrant {
        Box::new(Tyrant::new(coord.clone(), &group, uri.clone()))
    } else {
        Box::new(Nomination::new(
            coord.clone(),
            &group,
            uri.clone(),
            timing.lease_ttl(),
            timing.tick(),
        ))
    };

    let peers = TcpPeers::new();
    let scanner = ProjectScanner::new(
        store.clone(),
        peers.clone(),
        clock.clone(),
        Arc::clone(&queue),
        uri.clone(),
        timing.reconnect_delay(),
    );
    let leader_service = LeaderService::new(
        store.clone(),
        clock.clone(),
        Arc::clone(&queue),
        timing.back_off(),
        timing.assignment_jitter(),
        timing.reconnect_delay(),
    );

    let notifier = Notifier::new(
        mail.clone(),
        chat,
        NotifyConfig {
            recipients: config.mail.recipients.clone(),
            gui_base_url: config.ui.base_url.clone(),
            cc: config.chat.as_ref().and_then(|c| c.cc.clone()),
        },
    );
    let bucket_envelope = Envelope::new(
        store.clone(),
        mail.clone(),
        clock.clone(),
        uri.clone(),
        Arc::clone(&leader_cell),
        timing.reconnect_delay(),
    );
    let run_envelope = Envelope::new(
        store.clone(),
        mail.clone(),
        clock.clone(),
        uri.clone(),
        Arc::clone(&leader_cell),
        timing.reconnect_delay(),
    );
    let exec_config = ExecConfig::new(state_dir.join("work"), state_dir.join("logs"))
        .poll_interval(timing.log_polling_interval())
        .bucket_timeout(timing.bucket_timeout())
        .reconnect_delay(timing.reconnect_delay());
    let executor = BuildExecutor::new(
        store.clone(),
        notifier,
        bucket_envelope,
        clock.clone(),
        exec_config,
        Arc::clone(&current),
    );

    let mut tasks = Vec::new();

    // RPC listener.
    let rpc_state = Arc::new(RpcState {
        leader: leader_service,
        role: Arc::clone(&role),
        current_bucket: Arc::clone(&current),
    });
    tasks.push(tokio::spawn(listener::serve(tcp, rpc_state, shutdown.clone())));

    // Election loop: elect, then scan while leading.
    {
        let shutdown = shutdown.clone();
        let role = Arc::clone(&role);
        let leader_cell = Arc::clone(&leader_cell);
        let queue = Arc::clone(&queue);
        let uri = uri.clone();
        tasks.push(tokio::spawn(async move {
            let mut was_leader = false;
            loop {
                if shutdown.is_cancelled() {
                    break;
                }
                let elected = election.elect().await;
                *leader_cell.lock() = match &elected {
                    Role::Leader => Some(uri.clone()),
                    Role::Follower { leader_uri } => leader_uri.clone(),
                };
                *role.lock() = elected.clone();
                match elected {
                    Role::Leader => {
                        if !was_leader {
                            tracing::info!("became leader");
                            scanner.reset();
                        }
                        was_leader = true;
                        scanner.scan().await;
                    }
                    Role::Follower { .. } => {
                        if was_leader {
                            tracing::info!("lost leadership, dropping the queue");
                            queue.lock().clear();
                        }
                        was_leader = false;
                    }
                }
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(election.pace()) => {}
                }
            }
        }));
    }

    // Executor pull loop: the leader acts as follower for its own group.
    {
        let shutdown = shutdown.clone();
        let role = Arc::clone(&role);
        let leader_cell = Arc::clone(&leader_cell);
        let peers = peers.clone();
        let uri = uri.clone();
        let tick = timing.tick();
        let admin = config.mail.admin.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                if shutdown.is_cancelled() {
                    break;
                }
                let target = if role.lock().is_leader() {
                    Some(uri.clone())
                } else {
                    leader_cell.lock().clone()
                };
                let wait = match target {
                    None => tick,
                    Some(leader) => match peers.next_bucket(&leader, &uri, &hostname).await {
                        Ok((Some(bucket_id), _)) => {
                            // Shutdown interrupts the bucket; the in-flight
                            // child is killed with the dropped future.
                            tokio::select! {
                                _ = shutdown.cancelled() => break,
                                _ = executor.run_bucket(&bucket_id) => {}
                            }
                            Duration::ZERO
                        }
                        Ok((None, back_off_secs)) => Duration::from_secs(back_off_secs),
                        Err(e) => {
                            tracing::warn!(%leader, error = %e, "assignment request failed");
                            // A malformed exchange is worth the operator's
                            // attention; an absent leader is routine.
                            if let (Some(admin), PeerError::Protocol(_)) = (&admin, &e) {
                                run_envelope
                                    .report(
                                        &ErrorContext::Operator(admin.clone()),
                                        &ExecError::Rpc(e.to_string()),
                                    )
                                    .await;
                            }
                            tick
                        }
                    },
                };
                if !wait.is_zero() {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
            }
        }));
    }

    // Retire the discovery tag on the way out.
    {
        let shutdown = shutdown.clone();
        let uri = uri.clone();
        tasks.push(tokio::spawn(async move {
            shutdown.cancelled().await;
            if let Err(e) = discovery.retire(&group, &uri).await {
                tracing::warn!(error = %e, "discovery tag not retired");
            } else {
                tracing::info!(%uri, "retired discovery tag");
            }
        }));
    }

    Ok(DaemonHandle { uri, shutdown, tasks, lock_file })
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
