//! Domain layer: payment and appointment types, the pending-payment marker,
//! and the ports the application layer is written against.

pub mod marker;
pub mod payment;
pub mod ports;
