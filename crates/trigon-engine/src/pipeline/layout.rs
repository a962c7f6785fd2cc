//! Checks that a pipeline's declared layouts agree with its shaders.
//!
//! All checks here are pure: they compare reflected shader interfaces with
//! caller-provided layouts and never touch the device.

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU64;

use crate::error::{GfxError, Result};
use crate::geometry::{BufferUsage, VertexLayout};

use super::reflect::{ReflectedBinding, ShaderInterface, StageInput};

/// Resource kinds a binding slot can hold.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BindingKind {
    Uniform,
    Storage { read_only: bool },
}

impl BindingKind {
    /// Buffer usage a resource needs to be bound to a slot of this kind.
    pub fn required_usage(self) -> BufferUsage {
        match self {
            Self::Uniform => BufferUsage::UNIFORM,
            Self::Storage { .. } => BufferUsage::STORAGE,
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform => f.write_str("uniform"),
            Self::Storage { read_only: true } => f.write_str("read-only storage"),
            Self::Storage { read_only: false } => f.write_str("storage"),
        }
    }
}

/// A resolved binding slot of a pipeline (always in group 0).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BindingSlot {
    pub slot: u32,
    pub kind: BindingKind,
    /// Smallest buffer size the shaders accept.
    pub min_size: u64,
    /// Stages that read the slot.
    pub visibility: wgpu::ShaderStages,
}

/// One caller-declared binding.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BindingDecl {
    pub slot: u32,
    pub kind: BindingKind,
}

/// Caller-declared bind group layout, checked against the shaders.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BindLayout {
    entries: Vec<BindingDecl>,
}

impl BindLayout {
    pub fn new(entries: Vec<BindingDecl>) -> Self {
        Self { entries }
    }

    /// A layout with a single uniform buffer at `slot`.
    pub fn uniform(slot: u32) -> Self {
        Self::new(vec![BindingDecl {
            slot,
            kind: BindingKind::Uniform,
        }])
    }

    /// A layout with a single storage buffer at `slot`.
    pub fn storage(slot: u32, read_only: bool) -> Self {
        Self::new(vec![BindingDecl {
            slot,
            kind: BindingKind::Storage { read_only },
        }])
    }

    pub fn entries(&self) -> &[BindingDecl] {
        &self.entries
    }
}

/// Every vertex shader input must be fed by an attribute of matching type.
///
/// Attributes the shader never reads are allowed.
pub fn check_vertex_inputs(layout: &VertexLayout, inputs: &[StageInput]) -> Result<()> {
    layout.validate()?;

    for input in inputs {
        let Some(attr) = layout.attribute_at(input.location) else {
            return Err(GfxError::LayoutMismatch(format!(
                "vertex shader reads @location({}) as {} but the vertex layout has no attribute there",
                input.location,
                input.type_name()
            )));
        };

        let matches =
            input.scalar == Some(attr.format.scalar()) && input.components == attr.format.components();
        if !matches {
            return Err(GfxError::LayoutMismatch(format!(
                "@location({}) is {:?} in the vertex layout but {} in the vertex shader",
                input.location,
                attr.format,
                input.type_name()
            )));
        }
    }

    for attr in layout.attributes() {
        if !inputs.iter().any(|i| i.location == attr.shader_location) {
            log::debug!(
                "vertex attribute @location({}) is not read by the vertex shader",
                attr.shader_location
            );
        }
    }

    Ok(())
}

/// Merges the bindings of both stages into the pipeline's slot table.
pub fn resolve_slots(vs: &ShaderInterface, fs: &ShaderInterface) -> Result<Vec<BindingSlot>> {
    let mut slots: BTreeMap<u32, BindingSlot> = BTreeMap::new();

    for (iface, binding) in [vs, fs]
        .into_iter()
        .flat_map(|iface| iface.bindings.iter().map(move |b| (iface, b)))
    {
        let ReflectedBinding {
            group,
            binding: slot,
            kind,
            min_size,
        } = *binding;

        if group != 0 {
            return Err(GfxError::LayoutMismatch(format!(
                "{} shader binds @group({group}) @binding({slot}); only group 0 is supported",
                iface.role
            )));
        }

        let stage = iface.role.stages();
        match slots.get_mut(&slot) {
            Some(existing) if existing.kind != kind => {
                return Err(GfxError::LayoutMismatch(format!(
                    "binding slot {slot} is {} in one stage and {kind} in another",
                    existing.kind
                )));
            }
            Some(existing) => {
                existing.visibility |= stage;
                existing.min_size = existing.min_size.max(min_size);
            }
            None => {
                slots.insert(
                    slot,
                    BindingSlot {
                        slot,
                        kind,
                        min_size,
                        visibility: stage,
                    },
                );
            }
        }
    }

    Ok(slots.into_values().collect())
}

/// A declared layout must name exactly the slots the shaders use.
pub fn check_declared(declared: &BindLayout, slots: &[BindingSlot]) -> Result<()> {
    for decl in declared.entries() {
        match slots.iter().find(|s| s.slot == decl.slot) {
            None => {
                return Err(GfxError::LayoutMismatch(format!(
                    "bind layout declares slot {} but neither shader uses it",
                    decl.slot
                )));
            }
            Some(slot) if slot.kind != decl.kind => {
                return Err(GfxError::LayoutMismatch(format!(
                    "bind layout declares slot {} as {} but the shaders use it as {}",
                    decl.slot, decl.kind, slot.kind
                )));
            }
            Some(_) => {}
        }
    }

    for slot in slots {
        let declared_count = declared
            .entries()
            .iter()
            .filter(|d| d.slot == slot.slot)
            .count();
        match declared_count {
            0 => {
                return Err(GfxError::LayoutMismatch(format!(
                    "shaders use binding slot {} but the bind layout does not declare it",
                    slot.slot
                )));
            }
            1 => {}
            _ => {
                return Err(GfxError::LayoutMismatch(format!(
                    "bind layout declares slot {} more than once",
                    slot.slot
                )));
            }
        }
    }

    Ok(())
}

pub(crate) fn bind_group_layout_entries(slots: &[BindingSlot]) -> Vec<wgpu::BindGroupLayoutEntry> {
    slots
        .iter()
        .map(|slot| wgpu::BindGroupLayoutEntry {
            binding: slot.slot,
            visibility: slot.visibility,
            ty: wgpu::BindingType::Buffer {
                ty: match slot.kind {
                    BindingKind::Uniform => wgpu::BufferBindingType::Uniform,
                    BindingKind::Storage { read_only } => {
                        wgpu::BufferBindingType::Storage { read_only }
                    }
                },
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(slot.min_size),
            },
            count: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ColorVertex, PositionVertex, ScalarKind, VertexRecord};
    use crate::pipeline::ShaderRole;

    fn input(location: u32, components: u32) -> StageInput {
        StageInput {
            location,
            scalar: Some(ScalarKind::Float),
            components,
        }
    }

    fn iface(role: ShaderRole, bindings: Vec<ReflectedBinding>) -> ShaderInterface {
        ShaderInterface {
            role,
            inputs: Vec::new(),
            bindings,
        }
    }

    fn uniform(group: u32, binding: u32, min_size: u64) -> ReflectedBinding {
        ReflectedBinding {
            group,
            binding,
            kind: BindingKind::Uniform,
            min_size,
        }
    }

    // ── vertex inputs ─────────────────────────────────────────────────────

    #[test]
    fn matching_inputs_pass() {
        assert!(check_vertex_inputs(&PositionVertex::layout(), &[input(0, 3)]).is_ok());
        assert!(check_vertex_inputs(&ColorVertex::layout(), &[input(0, 3), input(1, 3)]).is_ok());
    }

    #[test]
    fn unread_attributes_are_allowed() {
        assert!(check_vertex_inputs(&ColorVertex::layout(), &[input(0, 3)]).is_ok());
    }

    #[test]
    fn missing_attribute_is_a_mismatch() {
        let err = check_vertex_inputs(&PositionVertex::layout(), &[input(0, 3), input(1, 3)])
            .unwrap_err();
        assert!(matches!(err, GfxError::LayoutMismatch(ref m) if m.contains("@location(1)")));
    }

    #[test]
    fn component_count_mismatch_names_types() {
        let err = check_vertex_inputs(&PositionVertex::layout(), &[input(0, 4)]).unwrap_err();
        assert!(matches!(err, GfxError::LayoutMismatch(ref m) if m.contains("vec4<f32>")));
    }

    #[test]
    fn scalar_kind_mismatch_is_rejected() {
        let uint = StageInput {
            location: 0,
            scalar: Some(ScalarKind::Uint),
            components: 3,
        };
        assert!(check_vertex_inputs(&PositionVertex::layout(), &[uint]).is_err());
    }

    // ── slots ─────────────────────────────────────────────────────────────

    #[test]
    fn shared_slot_merges_visibility_and_size() {
        let vs = iface(ShaderRole::Vertex, vec![uniform(0, 1, 64)]);
        let fs = iface(ShaderRole::Fragment, vec![uniform(0, 1, 16)]);

        let slots = resolve_slots(&vs, &fs).unwrap();
        assert_eq!(
            slots,
            vec![BindingSlot {
                slot: 1,
                kind: BindingKind::Uniform,
                min_size: 64,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            }]
        );
    }

    #[test]
    fn slots_are_sorted() {
        let vs = iface(ShaderRole::Vertex, vec![uniform(0, 3, 16)]);
        let fs = iface(ShaderRole::Fragment, vec![uniform(0, 0, 16)]);

        let slots = resolve_slots(&vs, &fs).unwrap();
        let numbers: Vec<u32> = slots.iter().map(|s| s.slot).collect();
        assert_eq!(numbers, vec![0, 3]);
    }

    #[test]
    fn non_zero_group_is_rejected() {
        let vs = iface(ShaderRole::Vertex, vec![uniform(1, 0, 16)]);
        let fs = iface(ShaderRole::Fragment, Vec::new());
        assert!(matches!(resolve_slots(&vs, &fs), Err(GfxError::LayoutMismatch(_))));
    }

    // ── declared layouts ──────────────────────────────────────────────────

    #[test]
    fn declared_layout_must_match_exactly() {
        let slots = vec![BindingSlot {
            slot: 1,
            kind: BindingKind::Uniform,
            min_size: 64,
            visibility: wgpu::ShaderStages::VERTEX,
        }];

        assert!(check_declared(&BindLayout::uniform(1), &slots).is_ok());
        assert!(check_declared(&BindLayout::uniform(2), &slots).is_err());
        assert!(check_declared(&BindLayout::default(), &slots).is_err());
        assert!(check_declared(&BindLayout::uniform(0), &[]).is_err());
    }

    #[test]
    fn duplicate_declaration_is_rejected() {
        let slots = vec![BindingSlot {
            slot: 1,
            kind: BindingKind::Uniform,
            min_size: 64,
            visibility: wgpu::ShaderStages::VERTEX,
        }];
        let twice = BindLayout::new(vec![
            BindingDecl { slot: 1, kind: BindingKind::Uniform },
            BindingDecl { slot: 1, kind: BindingKind::Uniform },
        ]);
        assert!(check_declared(&twice, &slots).is_err());
    }

    #[test]
    fn layout_entries_carry_min_size() {
        let entries = bind_group_layout_entries(&[BindingSlot {
            slot: 1,
            kind: BindingKind::Uniform,
            min_size: 64,
            visibility: wgpu::ShaderStages::VERTEX,
        }]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].binding, 1);
        match entries[0].ty {
            wgpu::BindingType::Buffer { min_binding_size, .. } => {
                assert_eq!(min_binding_size.map(NonZeroU64::get), Some(64));
            }
            _ => panic!("expected a buffer binding"),
        }
    }

    #[test]
    fn storage_slot_keeps_its_access() {
        let entries = bind_group_layout_entries(&[BindingSlot {
            slot: 0,
            kind: BindingKind::Storage { read_only: true },
            min_size: 16,
            visibility: wgpu::ShaderStages::FRAGMENT,
        }]);
        assert!(matches!(
            entries[0].ty,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                ..
            }
        ));
        assert_eq!(
            BindingKind::Storage { read_only: false }.required_usage(),
            BufferUsage::STORAGE
        );
    }

    #[test]
    fn storage_and_uniform_cannot_share_a_slot() {
        let vs = iface(ShaderRole::Vertex, vec![uniform(0, 2, 16)]);
        let fs = iface(
            ShaderRole::Fragment,
            vec![ReflectedBinding {
                group: 0,
                binding: 2,
                kind: BindingKind::Storage { read_only: true },
                min_size: 16,
            }],
        );
        let err = resolve_slots(&vs, &fs).unwrap_err();
        assert!(matches!(err, GfxError::LayoutMismatch(ref m) if m.contains("read-only storage")));
    }

    #[test]
    fn declared_storage_access_must_match() {
        let slots = vec![BindingSlot {
            slot: 0,
            kind: BindingKind::Storage { read_only: true },
            min_size: 16,
            visibility: wgpu::ShaderStages::FRAGMENT,
        }];
        assert!(check_declared(&BindLayout::storage(0, true), &slots).is_ok());
        assert!(check_declared(&BindLayout::storage(0, false), &slots).is_err());
        assert!(check_declared(&BindLayout::uniform(0), &slots).is_err());
    }
}
