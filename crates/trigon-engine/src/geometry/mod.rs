//! Geometry resources: GPU buffers and the vertex record contract.
//!
//! Vertex records are plain `#[repr(C)]` structs; their [`VertexLayout`] is
//! derived from the same struct so the CPU byte layout and the pipeline's
//! declared layout cannot drift apart.

mod buffer;
mod transform;
mod vertex;

pub use buffer::{create_buffer, create_buffer_init, read_buffer, write_buffer, BufferUsage, GpuBuffer};
pub(crate) use buffer::map_read;
pub use transform::Transform;
pub use vertex::{
    ColorVertex, PositionVertex, ScalarKind, VertexAttribute, VertexFormat, VertexLayout,
    VertexRecord,
};
