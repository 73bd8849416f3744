//! Reverse proxy functionality
//!
//! Forwards gateway-approved requests to the single configured backend and
//! streams the backend's response back. Nothing is retried.

pub mod upstream;

pub use upstream::{BodyFraming, Delivery, ProxyHandler, ResponseHead};
