//! Append-only, hash-chained audit log.
//!
//! Every store mutation and every tool outcome is appended here. Each entry
//! carries the SHA-256 hash of its own fields concatenated with the hash of
//! the previous entry, so any later edit to a recorded event breaks the chain.
//! There is no deletion API.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex, OnceLock};
use synapse_types::audit::{AuditDomain, AuditEvent};
use tracing::info;

static GLOBAL: OnceLock<Arc<AuditLog>> = OnceLock::new();

/// The process-wide audit log, created on first use.
pub fn global() -> Arc<AuditLog> {
    GLOBAL.get_or_init(|| Arc::new(AuditLog::new())).clone()
}

fn genesis() -> String {
    "0".repeat(64)
}

fn compute_event_hash(
    seq: u64,
    timestamp: &str,
    domain: AuditDomain,
    action: &str,
    details: &str,
    prev_hash: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seq.to_string().as_bytes());
    hasher.update(timestamp.as_bytes());
    hasher.update(domain.to_string().as_bytes());
    hasher.update(action.as_bytes());
    hasher.update(details.as_bytes());
    hasher.update(prev_hash.as_bytes());
    hex::encode(hasher.finalize())
}

struct Chain {
    events: Vec<AuditEvent>,
    tip: String,
}

/// Append-only audit sink.
///
/// Thread-safe: appends are serialised through one internal mutex so the
/// sequence number and the chain tip always advance together.
pub struct AuditLog {
    chain: Mutex<Chain>,
}

impl AuditLog {
    /// Creates a new empty audit log with the all-zeros genesis tip.
    pub fn new() -> Self {
        Self {
            chain: Mutex::new(Chain {
                events: Vec::new(),
                tip: genesis(),
            }),
        }
    }

    /// Appends an event and returns its hash.
    pub fn record(
        &self,
        domain: AuditDomain,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> String {
        let action = action.into();
        let details = details.into();
        let timestamp = Utc::now().to_rfc3339();

        let mut chain = self.chain.lock().unwrap_or_else(|e| e.into_inner());
        let seq = chain.events.len() as u64;
        let prev_hash = chain.tip.clone();
        let hash = compute_event_hash(seq, &timestamp, domain, &action, &details, &prev_hash);

        info!(seq, %domain, action = %action, details = %details, "audit");

        chain.events.push(AuditEvent {
            seq,
            timestamp,
            domain,
            action,
            details,
            prev_hash,
            hash: hash.clone(),
        });
        chain.tip = hash.clone();
        hash
    }

    /// Recomputes every hash in the chain.
    ///
    /// Returns `Err(msg)` describing the first inconsistency found.
    pub fn verify_integrity(&self) -> Result<(), String> {
        let chain = self.chain.lock().unwrap_or_else(|e| e.into_inner());
        let mut expected_prev = genesis();

        for event in &chain.events {
            if event.prev_hash != expected_prev {
                return Err(format!(
                    "chain break at seq {}: expected prev_hash {} but found {}",
                    event.seq, expected_prev, event.prev_hash
                ));
            }
            let recomputed = compute_event_hash(
                event.seq,
                &event.timestamp,
                event.domain,
                &event.action,
                &event.details,
                &event.prev_hash,
            );
            if recomputed != event.hash {
                return Err(format!(
                    "hash mismatch at seq {}: expected {} but found {}",
                    event.seq, recomputed, event.hash
                ));
            }
            expected_prev = event.hash.clone();
        }
        Ok(())
    }

    /// Hash of the most recent event, or the genesis sentinel.
    pub fn tip_hash(&self) -> String {
        self.chain
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .tip
            .clone()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.chain
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .events
            .len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to the most recent `n` events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<AuditEvent> {
        let chain = self.chain.lock().unwrap_or_else(|e| e.into_inner());
        let start = chain.events.len().saturating_sub(n);
        chain.events[start..].to_vec()
    }

    /// Events recorded from sequence number `seq` onwards.
    pub fn since(&self, seq: u64) -> Vec<AuditEvent> {
        let chain = self.chain.lock().unwrap_or_else(|e| e.into_inner());
        let start = (seq as usize).min(chain.events.len());
        chain.events[start..].to_vec()
    }

    /// All events of one domain, oldest first.
    pub fn by_domain(&self, domain: AuditDomain) -> Vec<AuditEvent> {
        let chain = self.chain.lock().unwrap_or_else(|e| e.into_inner());
        chain
            .events
            .iter()
            .filter(|e| e.domain == domain)
            .cloned()
            .collect()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_chain_integrity() {
        let log = AuditLog::new();
        log.record(AuditDomain::Vfs, "write_file", "/a/b.txt");
        log.record(AuditDomain::Graph, "create_link", "root -> x");
        log.record(AuditDomain::AgentAction, "read_file", "ok");

        assert_eq!(log.len(), 3);
        assert!(log.verify_integrity().is_ok());

        let events = log.recent(3);
        assert_eq!(events[0].prev_hash, "0".repeat(64));
        assert_eq!(events[1].prev_hash, events[0].hash);
        assert_eq!(events[2].prev_hash, events[1].hash);
    }

    #[test]
    fn test_audit_tamper_detection() {
        let log = AuditLog::new();
        log.record(AuditDomain::Vfs, "write_file", "/a");
        log.record(AuditDomain::Vfs, "write_file", "/b");

        {
            let mut chain = log.chain.lock().unwrap();
            chain.events[1].details = "/c".to_string();
        }

        let result = log.verify_integrity();
        assert!(result.unwrap_err().contains("hash mismatch at seq 1"));
    }

    #[test]
    fn test_domain_filter_and_since() {
        let log = AuditLog::new();
        assert!(log.is_empty());
        log.record(AuditDomain::Vfs, "mkdir", "/a");
        log.record(AuditDomain::Graph, "upsert_node", "x");
        log.record(AuditDomain::Vfs, "write_file", "/a/b");

        assert_eq!(log.by_domain(AuditDomain::Vfs).len(), 2);
        assert_eq!(log.by_domain(AuditDomain::AgentAction).len(), 0);
        let tail = log.since(1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].action, "upsert_node");
        assert!(log.since(99).is_empty());
    }

    #[test]
    fn test_tip_advances() {
        let log = AuditLog::new();
        assert_eq!(log.tip_hash(), "0".repeat(64));
        let h1 = log.record(AuditDomain::Graph, "a", "");
        assert_eq!(log.tip_hash(), h1);
        let h2 = log.record(AuditDomain::Graph, "b", "");
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_global_is_shared() {
        let a = global();
        let b = global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
