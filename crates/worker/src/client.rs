// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer RPC client over TCP.

use async_trait::async_trait;
use dcc_adapters::{PeerError, PeerRpc};
use dcc_core::{BucketId, WorkerUri};
use dcc_wire::{read_message, write_message, Request, Response};
use std::time::Duration;
use tokio::net::TcpStream;

/// One connection per call, framed with the wire codec.
#[derive(Clone)]
pub struct TcpPeers {
    timeout: Duration,
}

impl TcpPeers {
    pub fn new() -> Self {
        Self { timeout: crate::env::rpc_timeout() }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn call(&self, peer: &WorkerUri, request: &Request) -> Result<Response, PeerError> {
        let exchange = async {
            let mut stream = TcpStream::connect(peer.as_str())
                .await
                .map_err(|e| PeerError::Unreachable(format!("{peer}: {e}")))?;
            write_message(&mut stream, request)
                .await
                .map_err(|e| PeerError::Protocol(format!("{peer}: {e}")))?;
            read_message::<Response, _>(&mut stream)
                .await
                .map_err(|e| PeerError::Protocol(format!("{peer}: {e}")))
        };
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(PeerError::Unreachable(format!("{peer}: timed out"))),
        }
    }
}

impl Default for TcpPeers {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeerRpc for TcpPeers {
    async fn next_bucket(
        &self,
        leader: &WorkerUri,
        requestor: &WorkerUri,
        hostname: &str,
    ) -> Result<(Option<BucketId>, u64), PeerError> {
        let request = Request::NextBucket {
            requestor_uri: requestor.clone(),
            hostname: hostname.to_string(),
        };
        match self.call(leader, &request).await? {
            Response::Assignment { bucket_id, back_off_secs } => Ok((bucket_id, back_off_secs)),
            Response::Error { message } => Err(PeerError::Refused(message)),
            other => Err(PeerError::Protocol(format!("unexpected answer: {other:?}"))),
        }
    }

    async fn processing(&self, peer: &WorkerUri, bucket_id: &BucketId) -> Result<bool, PeerError> {
        let request = Request::Processing { bucket_id: bucket_id.clone() };
        match self.call(peer, &request).await? {
            Response::Processing { active } => Ok(active),
            Response::Error { message } => Err(PeerError::Refused(message)),
            other => Err(PeerError::Protocol(format!("unexpected answer: {other:?}"))),
        }
    }

    async fn ping(&self, peer: &WorkerUri) -> Result<(), PeerError> {
        match self.call(peer, &Request::Ping).await? {
            Response::Pong => Ok(()),
            Response::Error { message } => Err(PeerError::Refused(message)),
            other => Err(PeerError::Protocol(format!("unexpected answer: {other:?}"))),
        }
    }
}
