//! Adapters to the outside world: the portal's REST API and the console.

pub mod console;
pub mod http;
