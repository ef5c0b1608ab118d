//! Climate Risk Interpreter.
//!
//! Ties the statistics of [`cri_core`] and the interpretation layer of
//! [`cri_components`] into a configurable report: load a temperature record,
//! pick a region and sector, and render the resulting dashboard as text,
//! Markdown or JSON.

pub mod config;
pub mod dashboard;
pub mod render;

pub use cri_components;
pub use cri_core;

pub use config::Config;
pub use dashboard::{Dashboard, Notice, PanelKind, Selection};
pub use render::{render, Format};
