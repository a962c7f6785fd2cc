//! Surface-less device acquisition and offscreen color targets.
//!
//! Used for offscreen rendering and by GPU-backed tests, which skip when the
//! host has no adapter.

use crate::error::{GfxError, Result};
use crate::geometry::map_read;

use super::gpu::{request_adapter, request_device};
use super::{check_host, GpuInit};

/// A device and queue with no presentation surface.
pub struct Headless {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

/// Acquires an adapter and device without binding a surface.
pub async fn request_headless(init: &GpuInit) -> Result<Headless> {
    let backends = check_host(init)?;

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    });

    let adapter = request_adapter(&instance, init.power_preference, None).await?;
    let (device, queue) = request_device(&adapter, init).await?;

    Ok(Headless {
        adapter,
        device,
        queue,
    })
}

/// A texture that can stand in for a surface texture.
pub struct OffscreenTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

impl OffscreenTarget {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("trigon offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            format,
            width,
            height,
        }
    }

    /// Reads the texture back as tightly packed rows.
    ///
    /// Only 4-byte-per-texel formats are supported.
    pub fn read_pixels(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<u8>> {
        const TEXEL: u32 = 4;
        if self.format.block_copy_size(None) != Some(TEXEL) {
            return Err(GfxError::Readback(format!(
                "unsupported readback format {:?}",
                self.format
            )));
        }

        let row = self.width * TEXEL;
        let padded_row = row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("trigon offscreen readback"),
            size: u64::from(padded_row) * u64::from(self.height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("trigon offscreen readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let padded = map_read(device, &staging)?;
        let pixels = padded
            .chunks(padded_row as usize)
            .flat_map(|r| &r[..row as usize])
            .copied()
            .collect();

        Ok(pixels)
    }

    /// RGBA bytes of the texel at `(x, y)` from a `read_pixels` result.
    pub fn texel(&self, pixels: &[u8], x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    }
}

/// Headless device for tests; `None` (with a note on stderr) when the host
/// has no adapter.
#[cfg(test)]
pub(crate) fn test_device() -> Option<Headless> {
    match pollster::block_on(request_headless(&GpuInit::default())) {
        Ok(headless) => Some(headless),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}
