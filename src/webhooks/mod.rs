//! Reliable webhook dispatch: event emission, signed delivery with retries,
//! and the background retry scanner.

pub mod delivery;
pub mod events;
pub mod tasks;

pub use delivery::{sign_payload, WebhookDeliveryService};
pub use events::{spawn_anomaly_detection, WebhookEventService};
pub use tasks::WebhookTaskService;
