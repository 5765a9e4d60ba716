//! Request queue: the single admission point to the generative service.
//!
//! Calls are admitted one at a time through a single-permit semaphore, whose
//! waiters are served in FIFO order. Every call leaves a [`QueuedRequest`]
//! record that moves from `pending` to `succeeded` or `failed` exactly once,
//! before `enqueue` returns.

use crate::drivers::CompletionClient;
use crate::str_utils::preview;
use chrono::Utc;
use futures::FutureExt;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use synapse_types::completion::{
    CompletionRequest, CompletionResponse, QueueStats, QueuedRequest, RequestMeta, RequestStatus,
};
use synapse_types::config::QueueConfig;
use synapse_types::error::{SynapseError, SynapseResult};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Serialized, recorded access to a [`CompletionClient`].
pub struct RequestQueue {
    client: Result<Arc<dyn CompletionClient>, String>,
    admission: Semaphore,
    records: Mutex<VecDeque<QueuedRequest>>,
    next_seq: AtomicU64,
    history_limit: usize,
    summary_chars: usize,
}

impl RequestQueue {
    /// A queue in front of `client` with default limits.
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self::with_config(Ok(client), &QueueConfig::default())
    }

    /// A queue whose every call fails with `UninitializedService(reason)`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::with_config(Err(reason.into()), &QueueConfig::default())
    }

    /// A queue with explicit limits. `Err` carries the reason the client
    /// could not be built.
    pub fn with_config(
        client: Result<Arc<dyn CompletionClient>, String>,
        config: &QueueConfig,
    ) -> Self {
        Self {
            client,
            admission: Semaphore::new(1),
            records: Mutex::new(VecDeque::new()),
            next_seq: AtomicU64::new(0),
            history_limit: config.history_limit.max(1),
            summary_chars: config.summary_chars,
        }
    }

    /// Whether a client is configured.
    pub fn is_available(&self) -> bool {
        self.client.is_ok()
    }

    /// Submit a request and wait for its turn and its result.
    ///
    /// Provider errors and client panics become `UpstreamFailure`; a queue
    /// without a client fails with `UninitializedService`. No retries.
    pub async fn enqueue(
        &self,
        payload: CompletionRequest,
        meta: RequestMeta,
    ) -> SynapseResult<CompletionResponse> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.push_record(QueuedRequest {
            seq,
            model: payload.model.clone(),
            payload: payload.clone(),
            issued_at: Utc::now(),
            completed_at: None,
            status: RequestStatus::Pending,
            agent_label: meta.agent_label.clone(),
            error: None,
            result_summary: None,
        });

        let client = match &self.client {
            Ok(client) => client.clone(),
            Err(reason) => {
                self.finish(seq, Err(reason.clone()));
                return Err(SynapseError::UninitializedService(reason.clone()));
            }
        };

        let _permit = match self.admission.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                let msg = "request queue is closed".to_string();
                self.finish(seq, Err(msg.clone()));
                return Err(SynapseError::UpstreamFailure(msg));
            }
        };
        debug!(seq, agent = %meta.agent_label, model = %payload.model, provider = client.name(), "Request admitted");

        let result = match AssertUnwindSafe(client.complete(payload)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err("completion client panicked".to_string()),
        };

        match result {
            Ok(response) => {
                self.finish(seq, Ok(preview(&response.text, self.summary_chars)));
                Ok(response)
            }
            Err(e) => {
                warn!(seq, agent = %meta.agent_label, error = %e, "Queued request failed");
                self.finish(seq, Err(e.clone()));
                Err(SynapseError::UpstreamFailure(e))
            }
        }
    }

    fn push_record(&self, record: QueuedRequest) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.len() >= self.history_limit {
            // Evict the oldest finished record, or the oldest overall.
            match records.iter().position(|r| r.status.is_terminal()) {
                Some(idx) => {
                    records.remove(idx);
                }
                None => {
                    records.pop_front();
                }
            }
        }
        records.push_back(record);
    }

    fn finish(&self, seq: u64, result: Result<String, String>) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let Some(record) = records.iter_mut().find(|r| r.seq == seq) else {
            return;
        };
        if record.status.is_terminal() {
            return;
        }
        record.completed_at = Some(Utc::now());
        match result {
            Ok(summary) => {
                record.status = RequestStatus::Succeeded;
                record.result_summary = Some(summary);
            }
            Err(e) => {
                record.status = RequestStatus::Failed;
                record.error = Some(e);
            }
        }
    }

    /// All retained records, oldest first.
    pub fn records(&self) -> Vec<QueuedRequest> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.iter().cloned().collect()
    }

    /// Up to `n` most recent failed records, newest first.
    pub fn recent_failures(&self, n: usize) -> Vec<QueuedRequest> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records
            .iter()
            .rev()
            .filter(|r| r.status == RequestStatus::Failed)
            .take(n)
            .cloned()
            .collect()
    }

    /// Record counts by status.
    pub fn stats(&self) -> QueueStats {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records
            .iter()
            .fold(QueueStats::default(), |mut stats, r| {
                match r.status {
                    RequestStatus::Pending => stats.pending += 1,
                    RequestStatus::Succeeded => stats.succeeded += 1,
                    RequestStatus::Failed => stats.failed += 1,
                }
                stats
            })
    }
}
