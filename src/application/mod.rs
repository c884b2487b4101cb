//! Application layer: payment session lifecycle and terminal orchestration.
//!
//! A `PaymentSession` runs as an actor on its own tokio task, owning its
//! timers and tap subscription, and is driven through a `SessionHandle`.
//! The `Terminal` turns submitted requests into card prompts or sessions.

pub mod session;
pub mod terminal;
pub mod timer;
