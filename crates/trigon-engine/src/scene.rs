//! One triangle, fully described by data.
//!
//! The flat, interpolated and transformed variants differ only in their
//! [`SceneDesc`]: shader pair, vertex layout and whether uniforms are bound.

use crate::core::{App, Stage};
use crate::device::Gpu;
use crate::error::{GfxError, Result};
use crate::geometry::{
    create_buffer_init, write_buffer, BufferUsage, GpuBuffer, VertexLayout, VertexRecord,
};
use crate::pipeline::{
    build_bind_group, build_pipeline, BindGroup, BindLayout, Binding, BindingDecl, BindingKind,
    Pipeline, ShaderSource,
};
use crate::render::{DrawRecord, FrameRenderer};

/// Initial contents of a uniform buffer bound at `slot`.
#[derive(Debug, Clone)]
pub struct UniformDesc {
    pub slot: u32,
    pub bytes: Vec<u8>,
}

/// Everything needed to build a [`TriangleScene`].
#[derive(Debug, Clone)]
pub struct SceneDesc {
    pub label: String,
    pub vertex_shader: ShaderSource,
    pub fragment_shader: ShaderSource,
    pub vertex_layout: VertexLayout,
    /// Raw vertex records laid out per `vertex_layout`.
    pub vertices: Vec<u8>,
    pub uniforms: Vec<UniformDesc>,
    /// `None` derives the bind group layout from the shaders.
    pub bind_layout: Option<BindLayout>,
}

impl SceneDesc {
    /// A scene drawing `vertices` with no bound resources.
    pub fn new<V: VertexRecord>(
        label: impl Into<String>,
        vertex_shader: ShaderSource,
        fragment_shader: ShaderSource,
        vertices: &[V],
    ) -> Self {
        Self {
            label: label.into(),
            vertex_shader,
            fragment_shader,
            vertex_layout: V::layout(),
            vertices: bytemuck::cast_slice(vertices).to_vec(),
            uniforms: Vec::new(),
            bind_layout: None,
        }
    }

    /// Adds a uniform buffer at `slot` and declares it in the bind layout.
    pub fn with_uniform(mut self, slot: u32, bytes: &[u8]) -> Self {
        self.uniforms.push(UniformDesc {
            slot,
            bytes: bytes.to_vec(),
        });

        let mut entries = self
            .bind_layout
            .map(|layout| layout.entries().to_vec())
            .unwrap_or_default();
        entries.push(BindingDecl {
            slot,
            kind: BindingKind::Uniform,
        });
        self.bind_layout = Some(BindLayout::new(entries));
        self
    }
}

/// GPU resources for one triangle. Built once, drawn any number of times.
#[derive(Debug)]
pub struct TriangleScene {
    pipeline: Pipeline,
    vertex_buffer: GpuBuffer,
    uniform_buffers: Vec<(u32, GpuBuffer)>,
    bind_group: Option<BindGroup>,
}

impl TriangleScene {
    pub async fn build(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        desc: &SceneDesc,
    ) -> Result<Self> {
        // Reject empty or partial vertex data before touching the device.
        desc.vertex_layout.vertex_count(desc.vertices.len() as u64)?;

        let pipeline = build_pipeline(
            device,
            &desc.vertex_shader,
            &desc.fragment_shader,
            &desc.vertex_layout,
            color_format,
            desc.bind_layout.as_ref(),
        )
        .await?;

        let vertex_buffer = create_buffer_init(
            device,
            queue,
            &format!("{} vertices", desc.label),
            BufferUsage::VERTEX,
            &desc.vertices,
        )?;

        let mut uniform_buffers = Vec::with_capacity(desc.uniforms.len());
        for uniform in &desc.uniforms {
            let buffer = create_buffer_init(
                device,
                queue,
                &format!("{} uniform {}", desc.label, uniform.slot),
                BufferUsage::UNIFORM,
                &uniform.bytes,
            )?;
            uniform_buffers.push((uniform.slot, buffer));
        }

        let bind_group = if uniform_buffers.is_empty() && !pipeline.requires_bind_group() {
            None
        } else {
            let bindings: Vec<Binding<'_>> = uniform_buffers
                .iter()
                .map(|(slot, buffer)| Binding {
                    slot: *slot,
                    resource: buffer,
                })
                .collect();
            Some(build_bind_group(device, &pipeline, &bindings)?)
        };

        log::info!(
            "scene `{}` ready: {} bytes of vertices, {} uniform buffer(s)",
            desc.label,
            vertex_buffer.byte_length(),
            uniform_buffers.len()
        );

        Ok(Self {
            pipeline,
            vertex_buffer,
            uniform_buffers,
            bind_group,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn vertex_buffer(&self) -> &GpuBuffer {
        &self.vertex_buffer
    }

    pub fn bind_group(&self) -> Option<&BindGroup> {
        self.bind_group.as_ref()
    }

    /// Overwrites part of the uniform buffer bound at `slot`.
    pub fn write_uniform(
        &self,
        queue: &wgpu::Queue,
        slot: u32,
        offset: u64,
        bytes: &[u8],
    ) -> Result<()> {
        let (_, buffer) = self
            .uniform_buffers
            .iter()
            .find(|(s, _)| *s == slot)
            .ok_or_else(|| GfxError::BindingSlot(format!("scene has no uniform at slot {slot}")))?;
        write_buffer(queue, buffer, offset, bytes)
    }

    /// Draws to the surface, recovering once from surface loss.
    pub fn draw(&self, renderer: &FrameRenderer, gpu: &mut Gpu<'_>) -> Result<()> {
        renderer.render_with_recovery(
            gpu,
            &self.pipeline,
            &self.vertex_buffer,
            self.bind_group.as_ref(),
        )
    }

    pub fn draw_to_view(
        &self,
        renderer: &FrameRenderer,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
    ) -> Result<DrawRecord> {
        renderer.render_to_view(
            device,
            queue,
            view,
            &self.pipeline,
            &self.vertex_buffer,
            self.bind_group.as_ref(),
        )
    }
}

/// Drives a [`TriangleScene`] from the window runtime.
pub struct SceneApp {
    desc: SceneDesc,
    renderer: FrameRenderer,
    scene: Option<TriangleScene>,
}

impl SceneApp {
    pub fn new(desc: SceneDesc) -> Self {
        Self::with_renderer(desc, FrameRenderer::default())
    }

    pub fn with_renderer(desc: SceneDesc, renderer: FrameRenderer) -> Self {
        Self {
            desc,
            renderer,
            scene: None,
        }
    }

    pub fn scene(&self) -> Option<&TriangleScene> {
        self.scene.as_ref()
    }
}

impl App for SceneApp {
    fn init(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let scene = pollster::block_on(TriangleScene::build(
            gpu.device(),
            gpu.queue(),
            gpu.surface_format(),
            &self.desc,
        ))?;
        self.scene = Some(scene);
        Ok(())
    }

    fn render(&mut self, gpu: &mut Gpu<'_>) -> Result<()> {
        let Some(scene) = &self.scene else {
            return Err(GfxError::OutOfOrder {
                from: Stage::Configured.to_string(),
                event: "render".to_string(),
            });
        };
        scene.draw(&self.renderer, gpu)
    }
}
