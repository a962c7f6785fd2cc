//! Shader compilation, interface checks and render pipeline construction.
//!
//! A pipeline is built from one vertex and one fragment shader (both exporting
//! `main`), a [`VertexLayout`](crate::geometry::VertexLayout) and a color
//! format. The shaders are reflected before anything reaches the device, so
//! layout disagreements surface as [`GfxError::LayoutMismatch`] instead of a
//! validation panic inside wgpu.
//!
//! [`GfxError::LayoutMismatch`]: crate::error::GfxError::LayoutMismatch

mod bind;
mod builder;
mod layout;
mod reflect;
mod shader;

pub use bind::{build_bind_group, BindGroup, Binding};
pub use builder::{build_pipeline, plan_pipeline, LayoutMode, Pipeline, PipelineId, PipelinePlan};
pub use layout::{
    check_declared, check_vertex_inputs, resolve_slots, BindLayout, BindingDecl, BindingKind,
    BindingSlot,
};
pub use reflect::{reflect, ReflectedBinding, ShaderInterface, StageInput};
pub use shader::{ShaderRole, ShaderSource, ENTRY_POINT};
