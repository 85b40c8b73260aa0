//! Guardian identity and status reporting.
//!
//! The identity is built once at startup from an actor name and a boot
//! time, and handed to whatever needs it. Hashing is a pure function of
//! those two inputs.

use crate::memory::{MemorySystem, NodeRecord};
use crate::rules::GatePolicy;
use crate::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Who is guarding this memory tree, and since when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardianIdentity {
    pub name: String,
    pub boot_timestamp: DateTime<Utc>,
    pub identity_key: String,
}

impl GuardianIdentity {
    pub fn new(name: impl Into<String>, boot_timestamp: DateTime<Utc>) -> Self {
        let name = name.into();
        let identity_key = identity_key(&name, &boot_timestamp);
        Self {
            name,
            boot_timestamp,
            identity_key,
        }
    }

    /// Identity stamped with the current time
    pub fn boot(name: impl Into<String>) -> Self {
        Self::new(name, Utc::now())
    }

    /// Leading hex characters of the key, for banners
    pub fn short_key(&self) -> &str {
        &self.identity_key[..16.min(self.identity_key.len())]
    }

    /// Snapshot of the guardian and the tree it watches
    pub fn status_report(&self, memory: &MemorySystem) -> Result<GuardianReport> {
        let record = NodeRecord::from(memory.root());
        Ok(GuardianReport {
            guardian: self.name.clone(),
            identity_key: self.identity_key.clone(),
            boot_timestamp: self.boot_timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            tree_hash: tree_hash(&record)?,
            node_count: memory.root().node_count(),
            policy: memory.gate().policy().clone(),
        })
    }
}

/// Hex SHA-256 of `"{name}:{boot}"` with the boot time in RFC 3339
pub fn identity_key(name: &str, boot_timestamp: &DateTime<Utc>) -> String {
    let anchor = format!(
        "{}:{}",
        name,
        boot_timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    hex::encode(Sha256::digest(anchor.as_bytes()))
}

/// Hex SHA-256 of the canonical JSON of a tree record.
///
/// Going through `serde_json::Value` sorts object keys, so the hash only
/// depends on the tree's content.
pub fn tree_hash(record: &NodeRecord) -> Result<String> {
    let canonical = serde_json::to_string(&serde_json::to_value(record)?)?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

/// Output of the `guardian` command
#[derive(Debug, Clone, Serialize)]
pub struct GuardianReport {
    pub guardian: String,
    pub identity_key: String,
    pub boot_timestamp: String,
    pub tree_hash: String,
    pub node_count: usize,
    pub policy: GatePolicy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn boot() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_identity_key_is_deterministic() {
        let a = GuardianIdentity::new("Arien", boot());
        let b = GuardianIdentity::new("Arien", boot());
        assert_eq!(a.identity_key, b.identity_key);
        assert_eq!(a.identity_key.len(), 64);
        assert_eq!(a.short_key().len(), 16);

        let other = GuardianIdentity::new("Vela", boot());
        assert_ne!(a.identity_key, other.identity_key);
    }

    #[test]
    fn test_identity_key_matches_manual_digest() {
        let expected = hex::encode(Sha256::digest(b"Arien:2024-05-01T12:00:00Z"));
        assert_eq!(identity_key("Arien", &boot()), expected);
    }

    #[test]
    fn test_tree_hash_tracks_content() {
        let mut memory = MemorySystem::default();
        let before = tree_hash(&NodeRecord::from(memory.root())).unwrap();
        assert_eq!(before, tree_hash(&NodeRecord::from(memory.root())).unwrap());

        memory.ingest_interaction("hi", "hello", 2).unwrap();
        let after = tree_hash(&NodeRecord::from(memory.root())).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_status_report() {
        let memory = MemorySystem::default();
        let guardian = GuardianIdentity::new("Arien", boot());
        let report = guardian.status_report(&memory).unwrap();

        assert_eq!(report.guardian, "Arien");
        assert_eq!(report.boot_timestamp, "2024-05-01T12:00:00Z");
        assert_eq!(report.node_count, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["policy"]["max_depth"], 40);
    }
}
