use crate::error::{GfxError, Result};
use crate::geometry::{BufferUsage, GpuBuffer};

use super::builder::{Pipeline, PipelineId};
use super::layout::BindingSlot;

/// Attaches a buffer to one binding slot.
#[derive(Debug, Copy, Clone)]
pub struct Binding<'a> {
    pub slot: u32,
    pub resource: &'a GpuBuffer,
}

/// A bind group tied to the pipeline it was built for.
#[derive(Debug)]
pub struct BindGroup {
    raw: wgpu::BindGroup,
    pipeline: PipelineId,
    slots: Vec<u32>,
}

impl BindGroup {
    pub fn raw(&self) -> &wgpu::BindGroup {
        &self.raw
    }

    pub fn pipeline(&self) -> PipelineId {
        self.pipeline
    }

    pub fn slots(&self) -> &[u32] {
        &self.slots
    }
}

/// The parts of a bound buffer the slot check looks at.
#[derive(Debug, Clone)]
struct BoundResource<'a> {
    slot: u32,
    label: &'a str,
    usage: BufferUsage,
    byte_length: u64,
}

/// Builds the group-0 bind group for `pipeline`.
///
/// Every slot the pipeline resolved must be bound exactly once, and nothing
/// else may be.
pub fn build_bind_group(
    device: &wgpu::Device,
    pipeline: &Pipeline,
    bindings: &[Binding<'_>],
) -> Result<BindGroup> {
    let bound: Vec<BoundResource<'_>> = bindings
        .iter()
        .map(|b| BoundResource {
            slot: b.slot,
            label: b.resource.label(),
            usage: b.resource.usage(),
            byte_length: b.resource.byte_length(),
        })
        .collect();
    check_bindings(pipeline.slots(), &bound)?;

    let Some(layout) = pipeline.bind_group_layout() else {
        return Err(GfxError::BindingSlot(
            "pipeline has no binding slots".to_string(),
        ));
    };

    let entries: Vec<wgpu::BindGroupEntry<'_>> = bindings
        .iter()
        .map(|b| wgpu::BindGroupEntry {
            binding: b.slot,
            resource: b.resource.raw().as_entire_binding(),
        })
        .collect();

    let raw = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("trigon bind group"),
        layout,
        entries: &entries,
    });

    let mut slots: Vec<u32> = bindings.iter().map(|b| b.slot).collect();
    slots.sort_unstable();

    log::debug!("built bind group for slots {slots:?}");

    Ok(BindGroup {
        raw,
        pipeline: pipeline.id(),
        slots,
    })
}

fn check_bindings(slots: &[BindingSlot], bound: &[BoundResource<'_>]) -> Result<()> {
    if slots.is_empty() {
        return Err(GfxError::BindingSlot(
            "pipeline has no binding slots".to_string(),
        ));
    }

    for (i, resource) in bound.iter().enumerate() {
        let Some(slot) = slots.iter().find(|s| s.slot == resource.slot) else {
            return Err(GfxError::BindingSlot(format!(
                "buffer `{}` bound to slot {}, which the pipeline does not declare",
                resource.label, resource.slot
            )));
        };

        if bound[..i].iter().any(|other| other.slot == resource.slot) {
            return Err(GfxError::BindingSlot(format!(
                "slot {} is bound more than once",
                resource.slot
            )));
        }

        let required = slot.kind.required_usage();
        if !resource.usage.contains(required) {
            return Err(GfxError::UsageMismatch {
                label: resource.label.to_string(),
                required: required.to_string(),
            });
        }

        if resource.byte_length < slot.min_size {
            return Err(GfxError::BindingSlot(format!(
                "buffer `{}` is {} bytes but slot {} needs at least {}",
                resource.label, resource.byte_length, slot.slot, slot.min_size
            )));
        }
    }

    if let Some(missing) = slots
        .iter()
        .find(|s| !bound.iter().any(|r| r.slot == s.slot))
    {
        return Err(GfxError::BindingSlot(format!(
            "slot {} ({}) has no resource bound",
            missing.slot, missing.kind
        )));
    }

    Ok(())
}
