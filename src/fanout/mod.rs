//! Bounded concurrent fan-out.
//!
//! # Data Flow
//! ```text
//! inbound batch
//!     → deadline.rs (root RequestScope, now + request timeout)
//!     → admission.rs (wait for a ticket within the scope's deadline)
//!     → validator.rs (size limits, absolute http(s) URLs)
//!     → orchestrator.rs (one unit per URL under a child scope)
//!     → ordered bodies | one terminal BatchError
//! ```
//!
//! # Design Decisions
//! - Scopes are passed by argument, never held in ambient state
//! - Each unit writes only its own slot; the slot vector is owned by the join loop
//! - Admission capacity is the only state shared between requests
//! - All-or-nothing: no partial results leave the orchestrator

pub mod admission;
pub mod deadline;
pub mod error;
pub mod orchestrator;
pub mod scope;
pub mod validator;

pub use admission::{AdmissionController, AdmissionTicket};
pub use deadline::DeadlinePropagator;
pub use error::{BatchError, FetchError};
pub use orchestrator::{FanOut, FetchedUrl};
pub use scope::{RequestScope, ScopeEnd};
pub use validator::{validate, ValidatedBatch, ValidatedUrl};
