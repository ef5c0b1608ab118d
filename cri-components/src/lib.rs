//! Interpretive components for the Climate Risk Interpreter.
//!
//! These turn the statistics of `cri-core` into regional context, impact
//! cards, the Risk Pulse early-warning signals and policy text.

pub mod assessment;
pub mod parameters;
pub mod policy;
pub mod regions;
pub mod risk_pulse;
