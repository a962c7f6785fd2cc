//! Frame recording and submission.
//!
//! One frame is one render pass: clear, bind pipeline, vertex buffer and
//! (optionally) bind group, one draw, submit.

mod frame;
mod target;

pub use frame::{DrawRecord, FrameRenderer};
pub use target::RenderTarget;
