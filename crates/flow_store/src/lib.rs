//! # flow_store
//!
//! Session-scoped document store for FlowMaster.
//!
//! Each session holds independent JSON documents (workflow, artifact bundle,
//! simulation progress, pending artifact job). Documents are wrapped in a
//! versioned envelope and replaced atomically, so one document can be
//! rewritten without touching the others.

pub mod backend;
pub mod error;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, StoreBackend};
pub use error::{StoreError, StoreResult};
pub use store::{Document, SessionSink, SessionStore, SessionSummary};
