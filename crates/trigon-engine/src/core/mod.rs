//! Core engine-facing contracts.
//!
//! This module defines the interface between the window runtime and the code
//! that owns pipelines and buffers, plus the lifecycle the runtime enforces
//! between them.

mod app;
mod lifecycle;

pub use app::{App, AppControl};
pub use lifecycle::{Lifecycle, Stage, StageEvent};
