//! Application layer: the redirect-based payment workflow.
//!
//! `PaymentInitiator` creates remote payments and records the pending marker,
//! `PaymentVerifier` drives the per-appointment verification state machine, and
//! `PaymentWorkflow` combines them behind the single "pay" action a patient sees.

pub mod engine;
pub mod initiation;
pub mod verification;
