//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, body limit, trace layer)
//!     → request.rs (add request ID)
//!     → handlers.rs (decode JSON, run the pipeline)
//!     → response.rs (encode data or error, pick status)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{ApiError, ErrorResponse, HandleUrlsResponse, UrlData};
pub use server::{HttpServer, ServerError, HANDLE_URLS_PATH, STATUS_PATH};
