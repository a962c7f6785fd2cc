//! Shader interface reflection.
//!
//! The shader text is handed to naga's WGSL front end (the compiler wgpu
//! itself uses); everything here reads the compiled module, never the text.

use wgpu::naga;

use crate::error::{GfxError, Result};
use crate::geometry::ScalarKind;

use super::layout::BindingKind;
use super::shader::{ShaderRole, ShaderSource};

/// A `@location(n)` input of the vertex entry point.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StageInput {
    pub location: u32,
    /// `None` when the input type cannot be fed by any vertex format.
    pub scalar: Option<ScalarKind>,
    pub components: u32,
}

impl StageInput {
    /// WGSL spelling of the input type, for diagnostics.
    pub fn type_name(&self) -> String {
        let scalar = match self.scalar {
            Some(ScalarKind::Float) => "f32",
            Some(ScalarKind::Uint) => "u32",
            Some(ScalarKind::Sint) => "i32",
            None => return "<unsupported>".to_string(),
        };
        match self.components {
            1 => scalar.to_string(),
            n => format!("vec{n}<{scalar}>"),
        }
    }
}

/// A resource binding used by the entry point.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ReflectedBinding {
    pub group: u32,
    pub binding: u32,
    pub kind: BindingKind,
    /// Size of the bound type in bytes.
    pub min_size: u64,
}

/// What one shader stage expects from the pipeline.
#[derive(Debug, Clone)]
pub struct ShaderInterface {
    pub role: ShaderRole,
    /// Vertex inputs, sorted by location. Always empty for fragment shaders.
    pub inputs: Vec<StageInput>,
    /// Bindings used by the entry point, sorted by `(group, binding)`.
    pub bindings: Vec<ReflectedBinding>,
}

/// Compiles `source` with naga and reflects its `main` entry point.
///
/// Parse and validation failures become [`GfxError::ShaderCompile`] carrying
/// the compiler's diagnostic.
pub fn reflect(source: &ShaderSource) -> Result<ShaderInterface> {
    let module = naga::front::wgsl::parse_str(source.code())
        .map_err(|e| source.compile_error(e.emit_to_string(source.code())))?;

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|e| source.compile_error(error_chain(&e)))?;

    let (index, entry) = module
        .entry_points
        .iter()
        .enumerate()
        .find(|(_, ep)| ep.name == source.entry_point())
        .ok_or_else(|| {
            source.compile_error(format!(
                "`{}` declares no entry point named `{}`",
                source.label(),
                source.entry_point()
            ))
        })?;

    if entry.stage != source.role().naga_stage() {
        return Err(source.compile_error(format!(
            "entry point `{}` in `{}` is a {:?} stage, expected {}",
            entry.name,
            source.label(),
            entry.stage,
            source.role()
        )));
    }

    let inputs = match source.role() {
        ShaderRole::Vertex => vertex_inputs(&module, &entry.function),
        ShaderRole::Fragment => Vec::new(),
    };

    let usage = info.get_entry_point(index);
    let mut bindings = Vec::new();
    for (handle, var) in module.global_variables.iter() {
        if usage[handle].is_empty() {
            continue;
        }
        let Some(rb) = &var.binding else { continue };

        let kind = match var.space {
            naga::AddressSpace::Uniform => BindingKind::Uniform,
            naga::AddressSpace::Storage { access } => BindingKind::Storage {
                read_only: !access.contains(naga::StorageAccess::STORE),
            },
            other => {
                return Err(GfxError::LayoutMismatch(format!(
                    "@group({}) @binding({}) in `{}` lives in {other:?} space; only buffers can be bound",
                    rb.group,
                    rb.binding,
                    source.label()
                )));
            }
        };

        bindings.push(ReflectedBinding {
            group: rb.group,
            binding: rb.binding,
            kind,
            min_size: u64::from(module.types[var.ty].inner.size(module.to_ctx())),
        });
    }
    bindings.sort_by_key(|b| (b.group, b.binding));

    Ok(ShaderInterface {
        role: source.role(),
        inputs,
        bindings,
    })
}

fn vertex_inputs(module: &naga::Module, function: &naga::Function) -> Vec<StageInput> {
    let mut inputs = Vec::new();

    for arg in &function.arguments {
        match &arg.binding {
            Some(binding) => push_location(module, &mut inputs, binding, arg.ty),
            // Struct arguments carry the bindings on their members.
            None => {
                if let naga::TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
                    for member in members {
                        if let Some(binding) = &member.binding {
                            push_location(module, &mut inputs, binding, member.ty);
                        }
                    }
                }
            }
        }
    }

    inputs.sort_by_key(|i| i.location);
    inputs
}

fn push_location(
    module: &naga::Module,
    inputs: &mut Vec<StageInput>,
    binding: &naga::Binding,
    ty: naga::Handle<naga::Type>,
) {
    let naga::Binding::Location { location, .. } = binding else {
        return;
    };

    let (scalar, components) = match &module.types[ty].inner {
        naga::TypeInner::Scalar(s) => (scalar_kind(s), 1),
        naga::TypeInner::Vector { size, scalar } => (scalar_kind(scalar), *size as u32),
        _ => (None, 0),
    };

    inputs.push(StageInput {
        location: *location,
        scalar,
        components,
    });
}

fn scalar_kind(scalar: &naga::Scalar) -> Option<ScalarKind> {
    if scalar.width != 4 {
        return None;
    }
    match scalar.kind {
        naga::ScalarKind::Float => Some(ScalarKind::Float),
        naga::ScalarKind::Uint => Some(ScalarKind::Uint),
        naga::ScalarKind::Sint => Some(ScalarKind::Sint),
        _ => None,
    }
}

/// Renders an error and its sources, one per line.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str("\n  caused by: ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_shaders::*;

    #[test]
    fn position_shader_reads_one_vec3() {
        let iface = reflect(&ShaderSource::vertex("position", POSITION_VS)).unwrap();
        assert_eq!(
            iface.inputs,
            vec![StageInput {
                location: 0,
                scalar: Some(ScalarKind::Float),
                components: 3
            }]
        );
        assert!(iface.bindings.is_empty());
        assert_eq!(iface.inputs[0].type_name(), "vec3<f32>");
    }

    #[test]
    fn transform_shader_declares_uniform_at_slot_one() {
        let iface = reflect(&ShaderSource::vertex("transform", TRANSFORM_VS)).unwrap();
        assert_eq!(iface.inputs.len(), 2);
        assert_eq!(
            iface.bindings,
            vec![ReflectedBinding {
                group: 0,
                binding: 1,
                kind: BindingKind::Uniform,
                min_size: 64
            }]
        );
    }

    #[test]
    fn read_only_storage_is_reflected() {
        let iface = reflect(&ShaderSource::fragment("tint", TINT_FS)).unwrap();
        assert_eq!(
            iface.bindings,
            vec![ReflectedBinding {
                group: 0,
                binding: 0,
                kind: BindingKind::Storage { read_only: true },
                min_size: 16
            }]
        );
    }

    #[test]
    fn struct_inputs_are_flattened() {
        let iface = reflect(&ShaderSource::vertex("struct-input", STRUCT_INPUT_VS)).unwrap();
        let locations: Vec<u32> = iface.inputs.iter().map(|i| i.location).collect();
        assert_eq!(locations, vec![0, 1]);
    }

    #[test]
    fn fragment_shader_has_no_vertex_inputs() {
        let iface = reflect(&ShaderSource::fragment("color", COLOR_FS)).unwrap();
        assert_eq!(iface.role, ShaderRole::Fragment);
        assert!(iface.inputs.is_empty());
    }

    #[test]
    fn syntax_error_carries_diagnostic() {
        let err = reflect(&ShaderSource::fragment("broken", BROKEN_FS)).unwrap_err();
        match err {
            GfxError::ShaderCompile { role, diagnostic } => {
                assert_eq!(role, ShaderRole::Fragment);
                assert!(!diagnostic.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_main_is_a_compile_error() {
        let err = reflect(&ShaderSource::vertex("no-main", NO_MAIN_VS)).unwrap_err();
        assert!(matches!(err, GfxError::ShaderCompile { role: ShaderRole::Vertex, .. }));
    }

    #[test]
    fn wrong_stage_is_a_compile_error() {
        let err = reflect(&ShaderSource::vertex("red", RED_FS)).unwrap_err();
        assert!(matches!(err, GfxError::ShaderCompile { role: ShaderRole::Vertex, .. }));
    }
}
