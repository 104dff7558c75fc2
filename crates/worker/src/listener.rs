// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP listener answering peer RPC.

use dcc_core::{BucketId, Clock};
use dcc_scheduler::{LeaderService, Role};
use dcc_store::Store;
use dcc_wire::{read_message, write_message, Request, Response};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// Shared state the listener answers from.
pub struct RpcState<S: Store, C: Clock> {
    pub leader: LeaderService<S, C>,
    /// Current role, maintained by the election loop.
    pub role: Arc<Mutex<Role>>,
    /// Bucket currently owned by this worker's executor.
    pub current_bucket: Arc<Mutex<Option<BucketId>>>,
}

/// Accept loop; one framed request/response pair per connection.
pub async fn serve<S: Store, C: Clock>(
    listener: TcpListener,
    state: Arc<RpcState<S, C>>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    tracing::debug!(%addr, "peer connected");
                    let state = Arc::clone(&state);
                    tokio::spawn(async move { handle_connection(stream, state).await });
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            },
        }
    }
}

async fn handle_connection<S: Store, C: Clock>(mut stream: TcpStream, state: Arc<RpcState<S, C>>) {
    let request = match read_message::<Request, _>(&mut stream).await {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "unreadable request");
            return;
        }
    };
    let response = dispatch(&state, request).await;
    if let Err(e) = write_message(&mut stream, &response).await {
        tracing::debug!(error = %e, "response not written");
    }
}

async fn dispatch<S: Store, C: Clock>(state: &RpcState<S, C>, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Processing { bucket_id } => {
            let active = state.current_bucket.lock().as_ref() == Some(&bucket_id);
            Response::Processing { active }
        }

        Request::NextBucket { requestor_uri, hostname } => {
            if !state.role.lock().is_leader() {
                return Response::error("not the leader");
            }
            match state.leader.next_bucket(&requestor_uri, &hostname).await {
                Ok((bucket_id, back_off_secs)) => Response::Assignment { bucket_id, back_off_secs },
                Err(e) => {
                    tracing::error!(requestor = %requestor_uri, error = %e, "assignment failed");
                    Response::error(e.to_string())
                }
            }
        }
    }
}
