//! Operation dispatch.
//!
//! Maps one decoded request to collaborator calls and builds the reply.
//! Installations are re-discovered for every request; nothing is cached
//! between requests.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{Span, debug};

use vencord_installer_discord::{InstallSource, Installation, Rebuilder};
use vencord_installer_protocol::{Envelope, InstallRecord, Operation, ProtocolError};

use crate::error::DispatchError;

/// Routes requests to the installation collaborators.
///
/// Cheap to clone; every connection holds its own copy.
#[derive(Clone)]
pub struct Dispatcher {
    source: Arc<dyn InstallSource>,
    rebuilder: Arc<dyn Rebuilder>,
    operation_timeout: Option<Duration>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher over the given collaborators.
    pub fn new(source: Arc<dyn InstallSource>, rebuilder: Arc<dyn Rebuilder>) -> Self {
        Self {
            source,
            rebuilder,
            operation_timeout: None,
        }
    }

    /// Builder: bound the cancellable stages of every operation by
    /// `timeout`.
    ///
    /// Discovery and rebuild count against the limit. A filesystem mutation
    /// runs to completion once started, and its own result is reported.
    pub fn with_operation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Handles one request with a non-empty nonce and returns its reply.
    ///
    /// The reply always echoes the request's nonce.
    #[tracing::instrument(skip(self, request), fields(nonce = %request.nonce, op = %request.op, duration_ms))]
    pub async fn dispatch(&self, request: &Envelope) -> Envelope {
        let start = Instant::now();

        let result = match request.operation() {
            Some(op) => self.run(op, request).await,
            None => Err(DispatchError::UnknownOp(request.op.clone())),
        };

        let duration = start.elapsed();
        Span::current().record("duration_ms", duration.as_millis());

        match result {
            Ok(data) => {
                debug!(duration_ms = duration.as_millis(), "Request handled");
                Envelope::ok(&request.nonce, data)
            }
            Err(e) => {
                debug!(error = %e, duration_ms = duration.as_millis(), "Request failed");
                Envelope::error(&request.nonce, e.to_string())
            }
        }
    }

    async fn run(&self, op: Operation, request: &Envelope) -> Result<Value, DispatchError> {
        let deadline = Deadline::new(op, self.operation_timeout);
        let locate = || deadline.bound(self.resolve(request));

        match op {
            Operation::ListInstalls => return deadline.bound(self.list_installs()).await,
            Operation::Patch => locate().await?.patch().await?,
            Operation::Unpatch => locate().await?.unpatch().await?,
            Operation::Repair => {
                let install = locate().await?;
                deadline
                    .bound(async { Ok(self.rebuilder.rebuild().await?) })
                    .await?;
                install.patch().await?;
            }
            Operation::InstallOpenAsar => locate().await?.install_openasar().await?,
            Operation::UninstallOpenAsar => locate().await?.uninstall_openasar().await?,
        }
        Ok(Value::Null)
    }

    async fn list_installs(&self) -> Result<Value, DispatchError> {
        let records: Vec<InstallRecord> = self
            .source
            .discover()
            .await
            .iter()
            .map(|install| install_record(install.as_ref()))
            .collect();
        debug!(count = records.len(), "Listing installs");
        serde_json::to_value(records)
            .map_err(|e| DispatchError::Protocol(ProtocolError::Serialization(e)))
    }

    /// Finds the installation whose path equals the payload exactly.
    async fn resolve(&self, request: &Envelope) -> Result<Box<dyn Installation>, DispatchError> {
        let path = request
            .string_payload()
            .ok_or(DispatchError::ExpectedString)?;

        self.source
            .discover()
            .await
            .into_iter()
            .find(|install| install.path() == path)
            .ok_or_else(|| DispatchError::NoSuchInstall(path.to_string()))
    }
}

/// Time left for the cancellable stages of one operation.
struct Deadline {
    op: Operation,
    limit: Option<(tokio::time::Instant, Duration)>,
}

impl Deadline {
    fn new(op: Operation, limit: Option<Duration>) -> Self {
        Self {
            op,
            limit: limit.map(|limit| (tokio::time::Instant::now() + limit, limit)),
        }
    }

    /// Drops `stage` if the deadline passes first.
    async fn bound<T, F>(&self, stage: F) -> Result<T, DispatchError>
    where
        F: Future<Output = Result<T, DispatchError>>,
    {
        match self.limit {
            None => stage.await,
            Some((at, limit)) => tokio::time::timeout_at(at, stage)
                .await
                .unwrap_or(Err(DispatchError::Timeout { op: self.op, limit })),
        }
    }
}

/// Builds the wire record for one installation.
pub fn install_record(install: &dyn Installation) -> InstallRecord {
    InstallRecord {
        branch: install.branch().to_string(),
        path: install.path().to_string(),
        is_patched: install.is_patched(),
        is_open_asar: install.is_openasar(),
    }
}
