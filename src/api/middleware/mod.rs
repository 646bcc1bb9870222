//! API middleware.
//!
//! Every request gets an `X-Request-Id` (kept when the caller sends
//! one) and an access log line with method, path, status, and latency.

pub mod request_id;
