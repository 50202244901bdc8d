use dbx_protocol::{read_frame, write_frame, FrameCodec, Request};
use dbx_sync::SyncEngine;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::AgentConfig;
use crate::error::AgentResult;
use crate::handler::handle;

/// Counters for one control-process connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub handled: u64,
    pub skipped: u64,
    /// The agent closed the connection after a failed batch.
    pub torn_down: bool,
}

/// Serves requests from a control process, one at a time.
///
/// Each frame is handled to completion, response written, before the next
/// frame is read, so batches from one connection never overlap.
pub struct Agent {
    engine: SyncEngine,
    teardown_on_failure: bool,
}

impl Agent {
    pub fn new(engine: SyncEngine, config: &AgentConfig) -> Self {
        Self {
            engine,
            teardown_on_failure: config.teardown_on_failure,
        }
    }

    /// Connect to the control process at `addr` and serve until it hangs up.
    pub async fn connect(&self, addr: &str) -> AgentResult<ConnectionSummary> {
        let stream = TcpStream::connect(addr).await?;
        tracing::info!(addr, "connected to control process");
        self.serve(stream).await
    }

    pub async fn serve<S>(&self, stream: S) -> AgentResult<ConnectionSummary>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut summary = ConnectionSummary::default();

        while let Some(payload) = read_frame(&mut reader).await? {
            let request = match FrameCodec::parse_request(&payload) {
                Ok(request) => request,
                Err(e) if e.is_skippable() => {
                    tracing::warn!(error = %e, bytes = payload.len(), "skipping frame");
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let batch = matches!(request, Request::Synchronize { .. });
            let response = handle(&self.engine, request).await;
            write_frame(&mut writer, &response).await?;
            summary.handled += 1;

            if batch && response.is_failure() && self.teardown_on_failure {
                tracing::warn!(handle = %response.handle(), "batch failed, closing connection");
                writer.shutdown().await?;
                summary.torn_down = true;
                return Ok(summary);
            }
        }

        tracing::info!(
            handled = summary.handled,
            skipped = summary.skipped,
            "control process closed the connection"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dbx_ledger::InMemoryLedger;
    use dbx_naming::{LedgerNameService, Session};
    use dbx_protocol::{ProtocolError, Response};
    use dbx_store::LocalContentStore;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    use super::*;
    use crate::error::AgentError;

    fn agent(teardown_on_failure: bool) -> Agent {
        let engine = SyncEngine::new(
            Arc::new(LocalContentStore::in_memory()),
            Arc::new(LedgerNameService::new(
                Arc::new(InMemoryLedger::new()),
                Session::generate(),
            )),
        );
        let config = AgentConfig {
            teardown_on_failure,
            ..AgentConfig::default()
        };
        Agent::new(engine, &config)
    }

    async fn exchange(socket: &mut TcpStream, request: Value) -> Response {
        write_frame(socket, &request).await.unwrap();
        let payload = read_frame(socket).await.unwrap().unwrap();
        FrameCodec::parse_response(&payload).unwrap()
    }

    #[tokio::test]
    async fn serves_until_a_failed_batch_tears_down() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"alpha").unwrap();
        let path = file.display().to_string();
        let ghost = dir.path().join("ghost.txt").display().to_string();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let control = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let synced = exchange(
                &mut socket,
                json!({"label": "synchronize", "handle": 1, "payload": [{"path": path}]}),
            )
            .await;

            write_frame(&mut socket, &json!({"label": "dance", "handle": 2}))
                .await
                .unwrap();

            let uploaded = exchange(
                &mut socket,
                json!({"label": "upload", "handle": 3, "path": path}),
            )
            .await;

            let failed = exchange(
                &mut socket,
                json!({"label": "synchronize", "handle": 4, "payload": [{"path": ghost}]}),
            )
            .await;

            let closed = read_frame(&mut socket).await.unwrap().is_none();
            (path, synced, uploaded, failed, closed)
        });

        let summary = agent(true).connect(&addr).await.unwrap();
        let (path, synced, uploaded, failed, closed) = control.await.unwrap();

        let Response::Synchronized { handle, payload } = synced else {
            panic!("expected synchronized, got {synced:?}");
        };
        assert_eq!(handle, json!(1));
        let entry = payload.get(&path).unwrap();

        let Response::Uploaded { handle, payload } = uploaded else {
            panic!("expected uploaded, got {uploaded:?}");
        };
        assert_eq!(handle, json!(3));
        assert_eq!(payload.root().unwrap().address, entry.address);

        assert!(matches!(failed, Response::Failed { ref request, .. } if request == "synchronize"));
        assert_eq!(failed.handle(), &json!(4));
        assert!(closed);
        assert_eq!(
            summary,
            ConnectionSummary {
                handled: 3,
                skipped: 1,
                torn_down: true,
            }
        );
    }

    #[tokio::test]
    async fn failed_batch_keeps_connection_when_teardown_disabled() {
        let (mut control, agent_side) = tokio::io::duplex(4096);
        let agent = agent(false);
        let serving = agent.serve(agent_side);

        let script = async move {
            write_frame(
                &mut control,
                &json!({"label": "synchronize", "handle": "x", "payload": [{"path": "/no/such/file"}]}),
            )
            .await
            .unwrap();
            let first = FrameCodec::parse_response(&read_frame(&mut control).await.unwrap().unwrap())
                .unwrap();
            write_frame(
                &mut control,
                &json!({"label": "synchronize", "handle": "y", "payload": []}),
            )
            .await
            .unwrap();
            let second = FrameCodec::parse_response(&read_frame(&mut control).await.unwrap().unwrap())
                .unwrap();
            drop(control);
            (first, second)
        };

        let (summary, (first, second)) = tokio::join!(serving, script);
        let summary = summary.unwrap();
        assert!(first.is_failure());
        assert!(matches!(second, Response::Synchronized { ref payload, .. } if payload.is_empty()));
        assert!(!summary.torn_down);
        assert_eq!(summary.handled, 2);
    }

    #[tokio::test]
    async fn oversized_frame_ends_the_connection() {
        let (mut control, agent_side) = tokio::io::duplex(64);
        let agent = agent(true);
        control
            .write_all(&(dbx_protocol::MAX_MESSAGE_SIZE as u32 + 1).to_be_bytes())
            .await
            .unwrap();
        let err = agent.serve(agent_side).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Protocol(ProtocolError::MessageTooLarge { .. })
        ));
    }
}
