//! Reqwest-backed client for the portal REST API.
//!
//! `ApiClient` owns transport concerns: base URL, bearer token, timeout, and
//! the mapping of transport and status failures onto [`PaymentError`].
//!
//! [`PaymentError`]: crate::error::PaymentError

pub mod assistant;
pub mod client;
pub mod gateway;
pub mod resources;
