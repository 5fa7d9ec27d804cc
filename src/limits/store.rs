//! Persisted multi-client threshold store
//!
//! One JSON document holds every client's computed limits. A pipeline run
//! only ever replaces its own client's subtree; other clients' entries pass
//! through a save/load cycle untouched. That per-client merge is the store's
//! whole contract — there is no partial merge within a client.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use super::{ClientLimits, ThresholdKey, ThresholdSet};

/// Schema version for persistence compatibility.
pub const STORE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Schema version mismatch: file has v{0}, expected v{1}")]
    SchemaMismatch(u32, u32),
}

// ============================================================================
// Persisted form
// ============================================================================

/// One row of a client's threshold table in the persisted document.
///
/// The on-disk form is a flat list of rows rather than nested maps so the
/// composite key stays explicit and diffable.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ThresholdRow {
    machine: String,
    component: String,
    essay: String,
    #[serde(flatten)]
    thresholds: ThresholdSet,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreState {
    schema_version: u32,
    clients: HashMap<String, Vec<ThresholdRow>>,
}

// ============================================================================
// Store
// ============================================================================

/// In-memory view of the multi-client threshold store.
#[derive(Debug, Clone, Default)]
pub struct ThresholdStore {
    clients: HashMap<String, ClientLimits>,
}

impl ThresholdStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace exactly one client's subtree, leaving every other client's
    /// entries untouched. This is the only mutation the store supports.
    pub fn replace_client(&mut self, client: &str, limits: ClientLimits) {
        info!(
            client = %client,
            thresholds = limits.len(),
            "Replacing client threshold subtree"
        );
        self.clients.insert(client.to_uppercase(), limits);
    }

    /// A client's limits. Unknown clients get an empty table — a missing
    /// subtree is expected on first run, not an error.
    pub fn client_limits(&self, client: &str) -> ClientLimits {
        self.clients
            .get(&client.to_uppercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Look up one threshold set directly.
    pub fn get(&self, client: &str, key: &ThresholdKey) -> Option<&ThresholdSet> {
        self.clients.get(&client.to_uppercase())?.get(key)
    }

    /// Clients present in the store.
    pub fn clients(&self) -> impl Iterator<Item = &String> {
        self.clients.keys()
    }

    /// Total threshold count across all clients.
    pub fn len(&self) -> usize {
        self.clients.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Save the whole store as pretty JSON, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> Result<(), StoreError> {
        let mut clients = HashMap::new();
        for (client, limits) in &self.clients {
            let mut rows: Vec<ThresholdRow> = limits
                .iter()
                .map(|(key, set)| ThresholdRow {
                    machine: key.machine.clone(),
                    component: key.component.clone(),
                    essay: key.essay.clone(),
                    thresholds: *set,
                })
                .collect();
            // Stable row order keeps the file diffable between runs.
            rows.sort_by(|a, b| {
                (&a.machine, &a.component, &a.essay).cmp(&(&b.machine, &b.component, &b.essay))
            });
            clients.insert(client.clone(), rows);
        }

        let state = StoreState {
            schema_version: STORE_SCHEMA_VERSION,
            clients,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&state)?;
        std::fs::write(path, json)?;

        info!(path = %path.display(), thresholds = self.len(), "Threshold store saved");
        Ok(())
    }

    /// Load a store from disk.
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)?;
        let state: StoreState = serde_json::from_str(&json)?;

        if state.schema_version != STORE_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch(
                state.schema_version,
                STORE_SCHEMA_VERSION,
            ));
        }

        let mut clients = HashMap::new();
        for (client, rows) in state.clients {
            let mut limits = ClientLimits::new();
            for row in rows {
                limits.insert(
                    ThresholdKey {
                        machine: row.machine,
                        component: row.component,
                        essay: row.essay,
                    },
                    row.thresholds,
                );
            }
            clients.insert(client, limits);
        }

        let store = Self { clients };
        info!(path = %path.display(), thresholds = store.len(), "Threshold store loaded");
        Ok(store)
    }

    /// Load a store, or start empty when the file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "No threshold store on disk, starting empty");
            return Self::new();
        }
        match Self::load_from_file(path) {
            Ok(store) => store,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load threshold store, starting empty");
                Self::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits_with(machine: &str, essay: &str, normal: f64) -> ClientLimits {
        let mut limits = ClientLimits::new();
        limits.insert(
            ThresholdKey {
                machine: machine.to_string(),
                component: "motor".to_string(),
                essay: essay.to_string(),
            },
            ThresholdSet::from_percentiles(normal, normal + 5.0, normal + 10.0),
        );
        limits
    }

    #[test]
    fn test_replace_client_preserves_others() {
        let mut store = ThresholdStore::new();
        store.replace_client("CDA", limits_with("camion", "hierro", 30.0));
        store.replace_client("EMIN", limits_with("pala", "cobre", 15.0));

        // Recompute CDA with different limits.
        store.replace_client("CDA", limits_with("camion", "hierro", 40.0));

        let key = ThresholdKey {
            machine: "pala".to_string(),
            component: "motor".to_string(),
            essay: "cobre".to_string(),
        };
        // EMIN's subtree survived the CDA rewrite.
        assert_eq!(store.get("EMIN", &key).map(|s| s.normal), Some(15.0));
        let cda_key = ThresholdKey {
            machine: "camion".to_string(),
            component: "motor".to_string(),
            essay: "hierro".to_string(),
        };
        assert_eq!(store.get("CDA", &cda_key).map(|s| s.normal), Some(40.0));
    }

    #[test]
    fn test_unknown_client_is_empty_not_error() {
        let store = ThresholdStore::new();
        assert!(store.client_limits("NOBODY").is_empty());
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("stewart_limits.json");

        let mut store = ThresholdStore::new();
        store.replace_client("CDA", limits_with("camion", "hierro", 30.0));
        store.replace_client("EMIN", limits_with("pala", "cobre", 15.0));
        store.save_to_file(&path).unwrap();

        let loaded = ThresholdStore::load_from_file(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        let key = ThresholdKey {
            machine: "camion".to_string(),
            component: "motor".to_string(),
            essay: "hierro".to_string(),
        };
        let set = loaded.get("CDA", &key).unwrap();
        assert_eq!(set.normal, 30.0);
        assert_eq!(set.alert, 35.0);
        assert_eq!(set.critic, 40.0);
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"schema_version": 99, "clients": {}}"#).unwrap();
        match ThresholdStore::load_from_file(&path) {
            Err(StoreError::SchemaMismatch(99, v)) => assert_eq!(v, STORE_SCHEMA_VERSION),
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThresholdStore::load_or_default(&dir.path().join("nope.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_case_insensitive_client_keys() {
        let mut store = ThresholdStore::new();
        store.replace_client("cda", limits_with("camion", "hierro", 30.0));
        assert_eq!(store.client_limits("CDA").len(), 1);
    }
}
