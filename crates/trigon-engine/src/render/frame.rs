use crate::device::Gpu;
use crate::error::{GfxError, Result};
use crate::geometry::{BufferUsage, GpuBuffer, VertexLayout};
use crate::pipeline::{BindGroup, Pipeline, PipelineId};

use super::RenderTarget;

/// What one recorded frame drew.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawRecord {
    pub vertex_count: u32,
    pub instance_count: u32,
    /// Whether a bind group was attached at group 0.
    pub bind_group: bool,
}

/// Records and submits single-draw frames.
///
/// Holds no GPU resources, so `render` can be called any number of times
/// against the same pipeline and buffers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameRenderer {
    /// Every frame starts by clearing to this color.
    pub clear: wgpu::Color,
}

impl Default for FrameRenderer {
    fn default() -> Self {
        Self {
            clear: wgpu::Color::BLACK,
        }
    }
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clear(clear: wgpu::Color) -> Self {
        Self { clear }
    }

    /// Acquires the surface texture, draws into it, submits and presents.
    ///
    /// Inputs are checked before the texture is acquired, so a contract
    /// violation never consumes a frame.
    pub fn render(
        &self,
        gpu: &mut Gpu<'_>,
        pipeline: &Pipeline,
        vertex_buffer: &GpuBuffer,
        bind_group: Option<&BindGroup>,
    ) -> Result<()> {
        check_contract(pipeline, vertex_buffer, bind_group)?;

        let mut frame = gpu.begin_frame()?;
        let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
        let record = self.record(&mut target, pipeline, vertex_buffer, bind_group)?;
        gpu.submit(frame);

        log::debug!("frame submitted: {record:?}");
        Ok(())
    }

    /// [`render`](Self::render), reconfiguring and retrying once if the
    /// surface was lost. A second loss is returned to the caller.
    pub fn render_with_recovery(
        &self,
        gpu: &mut Gpu<'_>,
        pipeline: &Pipeline,
        vertex_buffer: &GpuBuffer,
        bind_group: Option<&BindGroup>,
    ) -> Result<()> {
        match self.render(gpu, pipeline, vertex_buffer, bind_group) {
            Err(GfxError::SurfaceLost(reason)) => {
                log::warn!("surface lost ({reason}); reconfiguring and retrying once");
                if !gpu.reconfigure() {
                    return Err(GfxError::FrameSkipped(
                        "surface has zero area after reconfiguration".to_string(),
                    ));
                }
                self.render(gpu, pipeline, vertex_buffer, bind_group)
            }
            other => other,
        }
    }

    /// Draws into any color view and submits, without a surface.
    pub fn render_to_view(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        pipeline: &Pipeline,
        vertex_buffer: &GpuBuffer,
        bind_group: Option<&BindGroup>,
    ) -> Result<DrawRecord> {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("trigon offscreen encoder"),
        });
        let mut target = RenderTarget::new(&mut encoder, view);
        let record = self.record(&mut target, pipeline, vertex_buffer, bind_group)?;
        queue.submit(std::iter::once(encoder.finish()));
        Ok(record)
    }

    /// Encodes one cleared render pass with a single draw into `target`.
    pub fn record(
        &self,
        target: &mut RenderTarget<'_>,
        pipeline: &Pipeline,
        vertex_buffer: &GpuBuffer,
        bind_group: Option<&BindGroup>,
    ) -> Result<DrawRecord> {
        let vertex_count = check_contract(pipeline, vertex_buffer, bind_group)?;

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("trigon frame pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline.raw());
        rpass.set_vertex_buffer(0, vertex_buffer.raw().slice(..));
        if let Some(group) = bind_group {
            rpass.set_bind_group(0, group.raw(), &[]);
        }
        rpass.draw(0..vertex_count, 0..1);

        Ok(DrawRecord {
            vertex_count,
            instance_count: 1,
            bind_group: bind_group.is_some(),
        })
    }
}

/// Validates the draw inputs and returns the vertex count.
fn check_contract(
    pipeline: &Pipeline,
    vertex_buffer: &GpuBuffer,
    bind_group: Option<&BindGroup>,
) -> Result<u32> {
    check_draw(
        DrawPipeline {
            id: pipeline.id(),
            requires_bind_group: pipeline.requires_bind_group(),
            layout: pipeline.vertex_layout(),
        },
        DrawBuffer {
            label: vertex_buffer.label(),
            usage: vertex_buffer.usage(),
            byte_length: vertex_buffer.byte_length(),
        },
        bind_group.map(BindGroup::pipeline),
    )
}

struct DrawPipeline<'a> {
    id: PipelineId,
    requires_bind_group: bool,
    layout: &'a VertexLayout,
}

struct DrawBuffer<'a> {
    label: &'a str,
    usage: BufferUsage,
    byte_length: u64,
}

fn check_draw(
    pipeline: DrawPipeline<'_>,
    vertices: DrawBuffer<'_>,
    bind_group: Option<PipelineId>,
) -> Result<u32> {
    match (pipeline.requires_bind_group, bind_group) {
        (true, None) => {
            return Err(GfxError::BindingSlot(
                "pipeline declares binding slots but no bind group was supplied".to_string(),
            ));
        }
        (false, Some(_)) => {
            return Err(GfxError::BindingSlot(
                "bind group supplied for a pipeline without binding slots".to_string(),
            ));
        }
        (true, Some(owner)) if owner != pipeline.id => {
            return Err(GfxError::BindingSlot(
                "bind group was built for a different pipeline".to_string(),
            ));
        }
        _ => {}
    }

    if !vertices.usage.contains(BufferUsage::VERTEX) {
        return Err(GfxError::UsageMismatch {
            label: vertices.label.to_string(),
            required: BufferUsage::VERTEX.to_string(),
        });
    }

    pipeline.layout.vertex_count(vertices.byte_length)
}
