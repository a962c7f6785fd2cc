//! Error types.
//!
//! Every fallible engine operation returns [`Result<T>`], an alias for
//! `std::result::Result<T, GfxError>`.
//!
//! Only surface loss and skipped frames are recoverable. Everything else is
//! either a host limitation (`Unsupported`, `AdapterUnavailable`) or a broken
//! contract between buffers, layouts and shaders, and is expected to halt the
//! render loop.

use thiserror::Error;

use crate::pipeline::ShaderRole;

#[derive(Error, Debug)]
pub enum GfxError {
    // ========================================================================
    // Host & device
    // ========================================================================
    /// The host exposes no usable graphics capability.
    #[error("graphics is not supported on this host: {0}")]
    Unsupported(String),

    /// No adapter satisfies the requested power preference.
    #[error("no graphics adapter available for {power_preference:?}: {reason}")]
    AdapterUnavailable {
        power_preference: wgpu::PowerPreference,
        reason: String,
    },

    /// The adapter refused to create a logical device.
    #[error("failed to create device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    // ========================================================================
    // Pipeline contracts
    // ========================================================================
    /// Shader text was rejected by the compiler. `diagnostic` is verbatim.
    #[error("{role} shader failed to compile:\n{diagnostic}")]
    ShaderCompile { role: ShaderRole, diagnostic: String },

    /// Vertex or bind-group layout disagrees with the shader interface.
    #[error("layout mismatch: {0}")]
    LayoutMismatch(String),

    /// A bound resource does not fit the pipeline's resolved binding slots.
    #[error("binding slot error: {0}")]
    BindingSlot(String),

    // ========================================================================
    // Buffers
    // ========================================================================
    /// A write would end past the buffer's declared length.
    #[error(
        "write of {len} bytes at offset {offset} overruns buffer `{label}` of {byte_length} bytes"
    )]
    BufferOverrun {
        label: String,
        offset: u64,
        len: u64,
        byte_length: u64,
    },

    /// Queue writes must be aligned to `wgpu::COPY_BUFFER_ALIGNMENT`.
    #[error("write of {len} bytes at offset {offset} is not 4-byte aligned")]
    MisalignedWrite { offset: u64, len: u64 },

    /// A buffer is used in a way its usage flags do not allow.
    #[error("buffer `{label}` lacks required usage {required}")]
    UsageMismatch { label: String, required: String },

    /// Reading a buffer back to the host failed.
    #[error("buffer readback failed: {0}")]
    Readback(String),

    // ========================================================================
    // Surface & frames
    // ========================================================================
    /// The surface is unconfigured, lost, or outdated.
    #[error("surface lost: {0}")]
    SurfaceLost(String),

    /// A transient acquisition failure; the frame was dropped.
    #[error("frame skipped: {0}")]
    FrameSkipped(String),

    /// The surface could not allocate a presentable texture.
    #[error("surface out of memory")]
    SurfaceOutOfMemory,

    /// A lifecycle transition was requested from the wrong state.
    #[error("`{event}` is not valid in state {from}")]
    OutOfOrder { from: String, event: String },
}

impl GfxError {
    /// Returns `true` for errors the render loop may survive.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GfxError::SurfaceLost(_) | GfxError::FrameSkipped(_))
    }
}

/// Alias for `Result<T, GfxError>`.
pub type Result<T> = std::result::Result<T, GfxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_surface_errors_are_recoverable() {
        assert!(GfxError::SurfaceLost("outdated".into()).is_recoverable());
        assert!(GfxError::FrameSkipped("timeout".into()).is_recoverable());

        assert!(!GfxError::SurfaceOutOfMemory.is_recoverable());
        assert!(!GfxError::Unsupported("no backends".into()).is_recoverable());
        assert!(!GfxError::BindingSlot("slot 1".into()).is_recoverable());
        assert!(
            !GfxError::BufferOverrun {
                label: "vbo".into(),
                offset: 0,
                len: 40,
                byte_length: 36,
            }
            .is_recoverable()
        );
    }

    #[test]
    fn shader_diagnostic_is_kept_verbatim() {
        let diagnostic = "error: expected ';'\n  ┌─ wgsl:3:5".to_string();
        let err = GfxError::ShaderCompile {
            role: ShaderRole::Fragment,
            diagnostic: diagnostic.clone(),
        };
        let text = err.to_string();
        assert!(text.starts_with("fragment shader failed to compile"));
        assert!(text.ends_with(&diagnostic));
    }
}
