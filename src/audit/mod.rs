//! Audit event capture: structured logging of security-relevant actions,
//! HTTP auto-capture middleware, and compliance reporting.

pub mod compliance;
pub mod logger;
pub mod middleware;

pub use compliance::ComplianceEngine;
pub use logger::AuditLogger;
pub use middleware::audit_middleware;
