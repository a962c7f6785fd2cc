//! Trigon engine crate.
//!
//! Draws a single triangle through wgpu: a surface context ([`device::Gpu`]),
//! a checked pipeline builder ([`pipeline`]), bounds-checked geometry buffers
//! ([`geometry`]) and a one-pass frame renderer ([`render`]), driven by a
//! winit runtime ([`window`]).

pub mod device;
pub mod window;
pub mod core;

pub mod error;
pub mod logging;
pub mod geometry;
pub mod pipeline;
pub mod render;
pub mod scene;

pub use error::{GfxError, Result};
