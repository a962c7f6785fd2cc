//! The three triangles the viewer can show.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use trigon_engine::geometry::{ColorVertex, PositionVertex, Transform};
use trigon_engine::pipeline::ShaderSource;
use trigon_engine::scene::SceneDesc;

const POSITION_VS: &str = include_str!("shaders/position.vert.wgsl");
const RED_FS: &str = include_str!("shaders/red.frag.wgsl");
const COLOR_VS: &str = include_str!("shaders/color.vert.wgsl");
const TRANSFORM_VS: &str = include_str!("shaders/transform.vert.wgsl");
const COLOR_FS: &str = include_str!("shaders/color.frag.wgsl");

/// Slot the model matrix is bound to in `transform.vert.wgsl`.
const MODEL_SLOT: u32 = 1;

const POSITIONS: [PositionVertex; 3] = [
    PositionVertex::new(0.0, 0.5, 0.0),
    PositionVertex::new(-0.5, -0.5, 0.0),
    PositionVertex::new(0.5, -0.5, 0.0),
];

const COLORED: [ColorVertex; 3] = [
    ColorVertex::new([0.0, 0.5, 0.0], [1.0, 1.0, 0.0]),
    ColorVertex::new([-0.5, -0.5, 0.0], [1.0, 0.0, 1.0]),
    ColorVertex::new([0.5, -0.5, 0.0], [0.0, 0.0, 1.0]),
];

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Variant {
    /// Position-only vertices, solid red.
    #[default]
    Flat,
    /// Interleaved position + color, interpolated across the face.
    Interpolated,
    /// `Interpolated` scaled by half through a uniform model matrix.
    Transformed,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Flat, Variant::Interpolated, Variant::Transformed];

    pub fn name(self) -> &'static str {
        match self {
            Variant::Flat => "flat",
            Variant::Interpolated => "interpolated",
            Variant::Transformed => "transformed",
        }
    }

    pub fn scene_desc(self) -> SceneDesc {
        match self {
            Variant::Flat => SceneDesc::new(
                self.name(),
                ShaderSource::vertex("position.vert", POSITION_VS),
                ShaderSource::fragment("red.frag", RED_FS),
                &POSITIONS,
            ),
            Variant::Interpolated => SceneDesc::new(
                self.name(),
                ShaderSource::vertex("color.vert", COLOR_VS),
                ShaderSource::fragment("color.frag", COLOR_FS),
                &COLORED,
            ),
            Variant::Transformed => SceneDesc::new(
                self.name(),
                ShaderSource::vertex("transform.vert", TRANSFORM_VS),
                ShaderSource::fragment("color.frag", COLOR_FS),
                &COLORED,
            )
            .with_uniform(MODEL_SLOT, Transform::scale(0.5).as_bytes()),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown variant `{0}` (expected one of: {choices})", choices = choices())]
pub struct UnknownVariant(pub String);

fn choices() -> String {
    let names: Vec<&str> = Variant::ALL.iter().map(|v| v.name()).collect();
    names.join(", ")
}

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trigon_engine::pipeline::{plan_pipeline, LayoutMode};

    #[test]
    fn names_round_trip() {
        for variant in Variant::ALL {
            assert_eq!(variant.name().parse::<Variant>(), Ok(variant));
        }
        assert_eq!("FLAT".parse::<Variant>(), Ok(Variant::Flat));
    }

    #[test]
    fn unknown_name_lists_choices() {
        let err = "wireframe".parse::<Variant>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown variant `wireframe` (expected one of: flat, interpolated, transformed)"
        );
    }

    #[test]
    fn unknown_variant_is_a_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(UnknownVariant("wire".to_string()));
        assert!(err.source().is_none());
        assert!(err.to_string().starts_with("unknown variant `wire`"));
    }

    #[test]
    fn flat_is_three_packed_positions() {
        let desc = Variant::Flat.scene_desc();
        assert_eq!(desc.vertex_layout.stride(), 12);
        assert_eq!(desc.vertices.len(), 36);
        assert!(desc.uniforms.is_empty());
    }

    #[test]
    fn transformed_binds_a_64_byte_matrix_at_slot_one() {
        let desc = Variant::Transformed.scene_desc();
        assert_eq!(desc.vertex_layout.stride(), 24);
        assert_eq!(desc.uniforms.len(), 1);
        assert_eq!(desc.uniforms[0].slot, 1);
        assert_eq!(desc.uniforms[0].bytes.len(), 64);
    }

    #[test]
    fn every_variant_plans_cleanly() {
        for variant in Variant::ALL {
            let desc = variant.scene_desc();
            let plan = plan_pipeline(
                &desc.vertex_shader,
                &desc.fragment_shader,
                &desc.vertex_layout,
                desc.bind_layout.as_ref(),
            )
            .unwrap_or_else(|e| panic!("{variant}: {e}"));

            let slots: Vec<u32> = plan.slots.iter().map(|s| s.slot).collect();
            match variant {
                Variant::Transformed => {
                    assert_eq!(slots, vec![1]);
                    assert_eq!(plan.layout_mode, LayoutMode::Declared);
                }
                _ => assert!(slots.is_empty()),
            }
        }
    }
}
