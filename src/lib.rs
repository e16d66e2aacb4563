//! Orchestration layer for engine-backed multinomial logistic regression.
//!
//! The numeric optimization is delegated to an external matrix-computation
//! engine invoked as a batch script; this crate owns the decision logic
//! around it: validating the training configuration, encoding the engine's
//! argument protocol, reshaping raw outputs into a typed [`model::Model`],
//! and choosing between scoring-only and evaluation modes at prediction
//! time.
//!
//! Lifecycle: [`train::train`] runs configure → validate →
//! dispatch-to-engine → hydrate; [`predict::predict`] runs the mode
//! decision → dispatch-to-engine → hydrate again. The engine itself sits
//! behind the [`engine::Engine`] trait and is never inspected beyond that
//! contract.

#![deny(dead_code)]
#![deny(unused_imports)]

pub mod args;
pub mod config;
pub mod engine;
pub mod frame;
pub mod model;
pub mod predict;
pub mod table;
pub mod train;
