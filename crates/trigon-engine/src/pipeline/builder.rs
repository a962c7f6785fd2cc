use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{GfxError, Result};
use crate::geometry::VertexLayout;

use super::layout::{
    bind_group_layout_entries, check_declared, check_vertex_inputs, resolve_slots, BindLayout,
    BindingSlot,
};
use super::reflect::reflect;
use super::shader::{check_compilation, create_module, ShaderRole, ShaderSource};

/// Identifies a built pipeline; bind groups remember which one they target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PipelineId(pub(crate) u64);

impl PipelineId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where the pipeline's binding slots came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LayoutMode {
    /// Derived from the shaders alone.
    Auto,
    /// Declared by the caller and checked against the shaders.
    Declared,
}

/// Everything [`build_pipeline`] decides before touching the device.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelinePlan {
    pub slots: Vec<BindingSlot>,
    pub layout_mode: LayoutMode,
}

impl PipelinePlan {
    /// Whether the builder creates the pipeline layout itself. Only a declared
    /// layout with at least one slot does; everything else is `layout: None`.
    pub fn authors_layout(&self) -> bool {
        self.layout_mode == LayoutMode::Declared && !self.slots.is_empty()
    }
}

/// An immutable render pipeline plus the interface it was built against.
#[derive(Debug)]
pub struct Pipeline {
    id: PipelineId,
    raw: wgpu::RenderPipeline,
    vertex_layout: VertexLayout,
    color_format: wgpu::TextureFormat,
    slots: Vec<BindingSlot>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    layout_mode: LayoutMode,
}

impl Pipeline {
    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn raw(&self) -> &wgpu::RenderPipeline {
        &self.raw
    }

    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.vertex_layout
    }

    pub fn vertex_stride(&self) -> u64 {
        self.vertex_layout.stride()
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    /// Resolved binding slots, sorted by slot number.
    pub fn slots(&self) -> &[BindingSlot] {
        &self.slots
    }

    pub fn requires_bind_group(&self) -> bool {
        !self.slots.is_empty()
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.layout_mode
    }

    pub(crate) fn bind_group_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.bind_group_layout.as_ref()
    }
}

/// Checks the shaders against the vertex layout and resolves binding slots.
///
/// Runs entirely on the CPU through naga; [`build_pipeline`] calls it before
/// creating any GPU object.
pub fn plan_pipeline(
    vertex_shader: &ShaderSource,
    fragment_shader: &ShaderSource,
    vertex_layout: &VertexLayout,
    bind_layout: Option<&BindLayout>,
) -> Result<PipelinePlan> {
    check_role(vertex_shader, ShaderRole::Vertex)?;
    check_role(fragment_shader, ShaderRole::Fragment)?;

    let vs = reflect(vertex_shader)?;
    let fs = reflect(fragment_shader)?;

    check_vertex_inputs(vertex_layout, &vs.inputs)?;
    let slots = resolve_slots(&vs, &fs)?;

    let layout_mode = match bind_layout {
        Some(declared) => {
            check_declared(declared, &slots)?;
            LayoutMode::Declared
        }
        None => LayoutMode::Auto,
    };

    Ok(PipelinePlan { slots, layout_mode })
}

fn check_role(source: &ShaderSource, expected: ShaderRole) -> Result<()> {
    if source.role() == expected {
        return Ok(());
    }
    Err(GfxError::LayoutMismatch(format!(
        "`{}` is a {} shader but was passed as the {expected} stage",
        source.label(),
        source.role()
    )))
}

/// Compiles both shaders and links them into a triangle-list pipeline that
/// writes `color_format`.
pub async fn build_pipeline(
    device: &wgpu::Device,
    vertex_shader: &ShaderSource,
    fragment_shader: &ShaderSource,
    vertex_layout: &VertexLayout,
    color_format: wgpu::TextureFormat,
    bind_layout: Option<&BindLayout>,
) -> Result<Pipeline> {
    let plan = plan_pipeline(vertex_shader, fragment_shader, vertex_layout, bind_layout)?;

    let vs_module = create_module(device, vertex_shader);
    check_compilation(&vs_module, vertex_shader).await?;
    let fs_module = create_module(device, fragment_shader);
    check_compilation(&fs_module, fragment_shader).await?;

    // Declared layouts with slots are built from the checked slot table;
    // otherwise wgpu derives group 0 from the shaders and it is read back.
    let declared_layout = if plan.authors_layout() {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("trigon bind group layout"),
            entries: &bind_group_layout_entries(&plan.slots),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("trigon pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });
        Some((bind_group_layout, pipeline_layout))
    } else {
        None
    };

    let attributes = vertex_layout.wgpu_attributes();
    let vertex_buffers = [wgpu::VertexBufferLayout {
        array_stride: vertex_layout.stride(),
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &attributes,
    }];

    let raw = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(vertex_shader.label()),
        layout: declared_layout.as_ref().map(|(_, layout)| layout),

        vertex: wgpu::VertexState {
            module: &vs_module,
            entry_point: Some(vertex_shader.entry_point()),
            compilation_options: Default::default(),
            buffers: &vertex_buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: &fs_module,
            entry_point: Some(fragment_shader.entry_point()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    let bind_group_layout = match declared_layout {
        Some((bind_group_layout, _)) => Some(bind_group_layout),
        None => (!plan.slots.is_empty()).then(|| raw.get_bind_group_layout(0)),
    };

    let pipeline = Pipeline {
        id: PipelineId::next(),
        raw,
        vertex_layout: vertex_layout.clone(),
        color_format,
        slots: plan.slots,
        bind_group_layout,
        layout_mode: plan.layout_mode,
    };

    log::info!(
        "built pipeline `{}` + `{}`: stride {}, {} binding slot(s), {:?} layout, {:?}",
        vertex_shader.label(),
        fragment_shader.label(),
        pipeline.vertex_stride(),
        pipeline.slots.len(),
        pipeline.layout_mode,
        color_format
    );

    Ok(pipeline)
}
