//! GPU device + surface management.
//!
//! This module is responsible for:
//! - probing the host and acquiring the adapter/device/queue
//! - creating & (re)configuring the presentation surface
//! - acquiring frames and submitting their commands

mod frame;
mod gpu;
pub mod headless;
mod init;
mod surface;
mod target;

pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::{parse_power_preference, check_host, GpuInit, POWER_PREFERENCE_ENV};
pub use surface::SurfaceSpec;
pub use target::{physical_size, OutputTarget};
