//! Concurrent URL fan-out fetch service library.

pub mod config;
pub mod fanout;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod service;
pub mod upstream;

pub use config::schema::ServiceConfig;
pub use fanout::{BatchError, FanOut, FetchError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
