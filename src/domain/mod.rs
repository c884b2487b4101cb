//! Domain types and ports for the payment terminal.
//!
//! Nothing in here performs I/O or owns timers; adapters live in
//! `infrastructure` and the session lifecycle lives in `application`.

pub mod amount;
pub mod method;
pub mod ports;
pub mod quote;
pub mod status;
pub mod tap;
pub mod verifier;
