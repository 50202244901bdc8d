use std::path::Path;

use dbx_protocol::{Request, Response};
use dbx_sync::SyncEngine;

/// Run one request against the engine. Failures become `failed` responses.
pub async fn handle(engine: &SyncEngine, request: Request) -> Response {
    let outcome = match &request {
        Request::Synchronize { handle, payload } => engine
            .synchronize(payload)
            .await
            .map(|result| Response::Synchronized {
                handle: handle.clone(),
                payload: result,
            }),
        Request::Upload {
            handle,
            path,
            options,
        } => engine
            .upload(Path::new(path), options)
            .await
            .map(|outcome| Response::Uploaded {
                handle: handle.clone(),
                payload: outcome,
            }),
        Request::Remove {
            handle,
            path,
            address,
            options,
        } => engine
            .remove(Path::new(path), address, options)
            .await
            .map(|address| Response::Removed {
                handle: handle.clone(),
                payload: address,
            }),
    };

    match outcome {
        Ok(response) => {
            tracing::debug!(label = request.label(), handle = %request.handle(), "request handled");
            response
        }
        Err(e) => {
            tracing::error!(label = request.label(), handle = %request.handle(), error = %e, "request failed");
            Response::failed(&request, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dbx_ledger::InMemoryLedger;
    use dbx_naming::{LedgerNameService, Session};
    use dbx_store::LocalContentStore;
    use dbx_sync::{FileDescriptor, RemoveOptions, UploadOptions};
    use dbx_types::Address;
    use serde_json::json;

    use super::*;

    fn engine() -> SyncEngine {
        SyncEngine::new(
            Arc::new(LocalContentStore::in_memory()),
            Arc::new(LedgerNameService::new(
                Arc::new(InMemoryLedger::new()),
                Session::generate(),
            )),
        )
    }

    #[tokio::test]
    async fn synchronize_echoes_handle() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"a").unwrap();
        let path = file.display().to_string();

        let response = handle(
            &engine(),
            Request::Synchronize {
                handle: json!(42),
                payload: vec![FileDescriptor::new(path.clone())],
            },
        )
        .await;
        let Response::Synchronized { handle, payload } = response else {
            panic!("expected synchronized, got {response:?}");
        };
        assert_eq!(handle, json!(42));
        assert!(payload.get(&path).is_some());
    }

    #[tokio::test]
    async fn upload_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"a").unwrap();
        let path = file.display().to_string();
        let engine = engine();

        let response = handle(
            &engine,
            Request::Upload {
                handle: json!("u"),
                path: path.clone(),
                options: UploadOptions::default(),
            },
        )
        .await;
        let Response::Uploaded { payload, .. } = response else {
            panic!("expected uploaded, got {response:?}");
        };
        let address = payload.root().unwrap().address;

        let response = handle(
            &engine,
            Request::Remove {
                handle: json!("r"),
                path,
                address,
                options: RemoveOptions { local: true },
            },
        )
        .await;
        assert_eq!(
            response,
            Response::Removed {
                handle: json!("r"),
                payload: address,
            }
        );
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn failures_carry_label_and_message() {
        let response = handle(
            &engine(),
            Request::Remove {
                handle: json!(1),
                path: "nowhere".into(),
                address: Address::from_bytes(b"unknown"),
                options: RemoveOptions::default(),
            },
        )
        .await;
        let Response::Failed {
            handle,
            request,
            error,
        } = response
        else {
            panic!("expected failed");
        };
        assert_eq!(handle, json!(1));
        assert_eq!(request, "remove");
        assert!(error.contains("is_directory"));
    }
}
