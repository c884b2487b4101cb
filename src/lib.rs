//! Smart EFTPOS: a point-of-sale terminal with simulated card, Lightning and
//! eCash payment flows.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod logging;
