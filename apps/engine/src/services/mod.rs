//! Engine services.
//!
//! Each service owns one slice of the job aggregate's behavior and shares
//! the same [`Database`](moowwee_db::Database) handle.

pub mod request_service;
pub mod review_service;
pub mod settlement_service;

pub use request_service::{Quote, RequestService};
pub use review_service::ReviewService;
pub use settlement_service::{PaymentSession, SettlementService};
