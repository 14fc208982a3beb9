//! Persistence: connection pooling and the hybrid stores. Every store
//! exposes one API whether or not the durable backend is attached.

pub mod analysis;
pub mod audit;
pub mod database;
pub mod policy;
pub mod webhook;

pub use analysis::{AnalysisRecord, AnalysisStore};
pub use audit::AuditStore;
pub use database::DatabasePool;
pub use policy::{default_policies, PolicyStore, SharedPolicyStore};
pub use webhook::WebhookStore;
