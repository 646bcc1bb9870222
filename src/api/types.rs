//! Shared state for the HTTP layer.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::face::FaceEmbedder;
use crate::push::PushTransport;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Cloned into every handler. The connection mutex is only held for
/// synchronous SQLite calls, never across an `.await`.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Arc<Mutex<Connection>>,
    /// Absent when VAPID keys are not configured; dispatch then answers 503.
    pub transport: Option<Arc<dyn PushTransport>>,
    /// Absent unless a face model is loaded; embedding then answers 503.
    pub embedder: Option<Arc<dyn FaceEmbedder>>,
    /// Where `?save=true` document requests also keep a copy.
    pub output_dir: PathBuf,
}

impl ApiContext {
    pub fn new(db: Connection, output_dir: PathBuf) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            transport: None,
            embedder: None,
            output_dir,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn PushTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn FaceEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    /// Context over an in-memory database; the temp dir holds saved PDFs.
    pub fn context() -> (ApiContext, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ApiContext::new(open_memory_database().unwrap(), tmp.path().to_path_buf());
        (ctx, tmp)
    }
}
