use std::fmt;
use std::sync::mpsc;

use bitflags::bitflags;

use crate::error::{GfxError, Result};

bitflags! {
    /// Buffer usage flags.
    ///
    /// A closed set: the engine only ever reads vertices, uniform and storage
    /// bindings, and copies.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct BufferUsage: u8 {
        const VERTEX   = 1 << 0;
        const UNIFORM  = 1 << 1;
        const STORAGE  = 1 << 2;
        const COPY_DST = 1 << 3;
        /// Needed for [`read_buffer`].
        const COPY_SRC = 1 << 4;
    }
}

impl BufferUsage {
    pub fn to_wgpu(self) -> wgpu::BufferUsages {
        [
            (Self::VERTEX, wgpu::BufferUsages::VERTEX),
            (Self::UNIFORM, wgpu::BufferUsages::UNIFORM),
            (Self::STORAGE, wgpu::BufferUsages::STORAGE),
            (Self::COPY_DST, wgpu::BufferUsages::COPY_DST),
            (Self::COPY_SRC, wgpu::BufferUsages::COPY_SRC),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .fold(wgpu::BufferUsages::empty(), |acc, (_, usage)| acc | usage)
    }
}

impl fmt::Display for BufferUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        f.write_str(&names.join(" | "))
    }
}

/// A GPU buffer with a fixed declared length and usage.
#[derive(Debug)]
pub struct GpuBuffer {
    raw: wgpu::Buffer,
    label: String,
    byte_length: u64,
    usage: BufferUsage,
}

impl GpuBuffer {
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.raw
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn byte_length(&self) -> u64 {
        self.byte_length
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Fails with [`GfxError::UsageMismatch`] unless every flag in `required` is set.
    pub fn require_usage(&self, required: BufferUsage) -> Result<()> {
        require_usage(&self.label, self.usage, required)
    }
}

/// Creates an uninitialized (zeroed) buffer of `byte_length` bytes.
pub fn create_buffer(
    device: &wgpu::Device,
    label: &str,
    byte_length: u64,
    usage: BufferUsage,
) -> GpuBuffer {
    let raw = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: byte_length,
        usage: usage.to_wgpu(),
        mapped_at_creation: false,
    });

    log::debug!("created buffer `{label}`: {byte_length} bytes, {usage}");

    GpuBuffer {
        raw,
        label: label.to_string(),
        byte_length,
        usage,
    }
}

/// Creates a buffer sized exactly to `bytes` and queues their upload.
///
/// `COPY_DST` is added to `usage`.
pub fn create_buffer_init(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    usage: BufferUsage,
    bytes: &[u8],
) -> Result<GpuBuffer> {
    let buffer = create_buffer(device, label, bytes.len() as u64, usage | BufferUsage::COPY_DST);
    write_buffer(queue, &buffer, 0, bytes)?;
    Ok(buffer)
}

/// Queues an upload of `bytes` at `offset`.
///
/// Returns once the write is queued; it lands before any later submission on
/// the same queue. Nothing is written when a check fails.
pub fn write_buffer(
    queue: &wgpu::Queue,
    buffer: &GpuBuffer,
    offset: u64,
    bytes: &[u8],
) -> Result<()> {
    check_write(buffer, offset, bytes.len() as u64)?;
    if bytes.is_empty() {
        return Ok(());
    }

    queue.write_buffer(&buffer.raw, offset, bytes);
    Ok(())
}

fn check_write(buffer: &GpuBuffer, offset: u64, len: u64) -> Result<()> {
    check_write_bounds(&buffer.label, buffer.byte_length, offset, len)?;
    require_usage(&buffer.label, buffer.usage, BufferUsage::COPY_DST)
}

fn check_write_bounds(label: &str, byte_length: u64, offset: u64, len: u64) -> Result<()> {
    let end = offset.checked_add(len);
    if end.is_none_or(|end| end > byte_length) {
        return Err(GfxError::BufferOverrun {
            label: label.to_string(),
            offset,
            len,
            byte_length,
        });
    }

    if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
        return Err(GfxError::MisalignedWrite { offset, len });
    }

    Ok(())
}

fn require_usage(label: &str, usage: BufferUsage, required: BufferUsage) -> Result<()> {
    if usage.contains(required) {
        Ok(())
    } else {
        Err(GfxError::UsageMismatch {
            label: label.to_string(),
            required: required.to_string(),
        })
    }
}

/// Copies `buffer` into host memory. Blocks until the GPU has finished.
pub fn read_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &GpuBuffer,
) -> Result<Vec<u8>> {
    buffer.require_usage(BufferUsage::COPY_SRC)?;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("trigon readback staging"),
        size: buffer.byte_length,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("trigon readback encoder"),
    });
    encoder.copy_buffer_to_buffer(&buffer.raw, 0, &staging, 0, buffer.byte_length);
    queue.submit(std::iter::once(encoder.finish()));

    map_read(device, &staging)
}

/// Maps a `MAP_READ` buffer and returns its contents, blocking on the device
/// until the mapping resolves.
pub(crate) fn map_read(device: &wgpu::Device, staging: &wgpu::Buffer) -> Result<Vec<u8>> {
    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| GfxError::Readback(format!("device poll failed: {e}")))?;

    rx.recv()
        .map_err(|_| GfxError::Readback("mapping callback was dropped".to_string()))?
        .map_err(|e| GfxError::Readback(e.to_string()))?;

    let bytes = slice.get_mapped_range().to_vec();
    staging.unmap();
    Ok(bytes)
}
