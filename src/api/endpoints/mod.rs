//! API endpoint handlers.
//!
//! Handlers stay thin: parse, call into `documents`, `push`, or `face`,
//! and map the result to JSON (or PDF bytes).

pub mod documents;
pub mod face;
pub mod health;
pub mod push;
