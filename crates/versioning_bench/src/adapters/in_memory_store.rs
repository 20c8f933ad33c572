// Rust guideline compliant 2026-02-23

//! In-memory adapter for the `BulkLoader` and `QueryEngine` ports.
//!
//! Intended for proof-of-concept runs and unit tests only. Triples are
//! stored as raw lines per named graph; `- <line>` entries delete the
//! first matching line from any graph.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use domain::{BulkLoader, DataPayload, QueryEngine, StoreError};

/// `BulkLoader` and `QueryEngine` adapter backed by an in-memory map of
/// named graphs.
///
/// Queries use a two-form protocol: `count:<graph-uri>` returns the row
/// count of one graph, `graph:<graph-uri>` returns its lines. Unknown
/// graphs answer as empty rather than failing, matching a triple store's
/// behavior for an absent named graph.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    graphs: RefCell<BTreeMap<String, Vec<String>>>,
    bytes: Cell<u64>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of triple data currently held.
    #[must_use]
    pub fn bytes_held(&self) -> u64 {
        self.bytes.get()
    }

    /// Total triples across all graphs.
    #[must_use]
    pub fn triple_count(&self) -> u64 {
        self.graphs
            .borrow()
            .values()
            .map(|lines| lines.len() as u64)
            .sum()
    }

    fn remove_line(&self, graphs: &mut BTreeMap<String, Vec<String>>, target: &str) {
        for lines in graphs.values_mut() {
            if let Some(position) = lines.iter().position(|line| line == target) {
                let removed = lines.remove(position);
                self.bytes.set(self.bytes.get() - removed.len() as u64);
                return;
            }
        }
    }
}

impl BulkLoader for InMemoryStore {
    /// Apply all payloads of `version` and return the store's total triple
    /// count afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LoadFailed`] when a payload is not UTF-8.
    async fn load(&self, version: usize, payloads: Vec<DataPayload>) -> Result<u64, StoreError> {
        let mut graphs = self.graphs.borrow_mut();
        for payload in payloads {
            let text = std::str::from_utf8(&payload.content).map_err(|e| {
                StoreError::LoadFailed {
                    reason: format!("version {version} payload is not UTF-8: {e}"),
                }
            })?;
            for line in text.lines().filter(|line| !line.is_empty()) {
                if let Some(target) = line.strip_prefix("- ") {
                    self.remove_line(&mut graphs, target);
                } else {
                    self.bytes.set(self.bytes.get() + line.len() as u64);
                    graphs
                        .entry(payload.graph_uri.clone())
                        .or_default()
                        .push(line.to_owned());
                }
            }
        }
        Ok(graphs.values().map(|lines| lines.len() as u64).sum())
    }
}

impl QueryEngine for InMemoryStore {
    /// Execute one `count:` or `graph:` query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::QueryFailed`] for any other query form.
    async fn execute(&self, query: &str) -> Result<Vec<u8>, StoreError> {
        let graphs = self.graphs.borrow();
        if let Some(uri) = query.strip_prefix("count:") {
            let count = graphs.get(uri).map_or(0, Vec::len);
            Ok(count.to_string().into_bytes())
        } else if let Some(uri) = query.strip_prefix("graph:") {
            let lines = graphs.get(uri).map_or(&[][..], Vec::as_slice);
            Ok(lines.join("\n").into_bytes())
        } else {
            Err(StoreError::QueryFailed {
                reason: format!("unsupported query form: {query}"),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::InMemoryStore;
    use domain::{BulkLoader as _, DataPayload, QueryEngine as _, StoreError};

    fn payload(graph: &str, lines: &str) -> DataPayload {
        DataPayload {
            graph_uri: graph.to_owned(),
            content: lines.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn load_appends_and_counts() {
        let store = InMemoryStore::new();
        let total = store
            .load(0, vec![payload("g0", "<a> <b> <c> .\n<d> <e> <f> .")])
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(store.triple_count(), 2);
        assert!(store.bytes_held() > 0);
    }

    #[tokio::test]
    async fn deletion_lines_remove_earlier_triples() {
        let store = InMemoryStore::new();
        store
            .load(0, vec![payload("g0", "<a> <b> <c> .")])
            .await
            .unwrap();
        let total = store
            .load(1, vec![payload("g1", "- <a> <b> <c> .\n<x> <y> <z> .")])
            .await
            .unwrap();
        assert_eq!(total, 1);

        let g0 = store.execute("count:g0").await.unwrap();
        assert_eq!(g0, b"0");
        let g1 = store.execute("graph:g1").await.unwrap();
        assert_eq!(g1, b"<x> <y> <z> .");
    }

    #[tokio::test]
    async fn absent_graph_answers_empty() {
        let store = InMemoryStore::new();
        assert_eq!(store.execute("count:missing").await.unwrap(), b"0");
        assert!(store.execute("graph:missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_query_fails() {
        let store = InMemoryStore::new();
        let result = store.execute("SELECT * WHERE { ?s ?p ?o }").await;
        assert!(matches!(result, Err(StoreError::QueryFailed { .. })));
    }

    #[tokio::test]
    async fn non_utf8_payload_fails_the_load() {
        let store = InMemoryStore::new();
        let bad = DataPayload {
            graph_uri: "g0".to_owned(),
            content: vec![0xff, 0xfe],
        };
        let result = store.load(0, vec![bad]).await;
        assert!(matches!(result, Err(StoreError::LoadFailed { .. })));
    }

    #[tokio::test]
    async fn bytes_shrink_on_deletion() {
        let store = InMemoryStore::new();
        store
            .load(0, vec![payload("g0", "<a> <b> <c> .")])
            .await
            .unwrap();
        let before = store.bytes_held();
        store
            .load(1, vec![payload("g1", "- <a> <b> <c> .")])
            .await
            .unwrap();
        assert!(store.bytes_held() < before);
        assert_eq!(store.bytes_held(), 0);
    }
}
