use bytemuck::{Pod, Zeroable};

/// A 4×4 `f32` matrix uploaded to a uniform buffer exactly as authored.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Transform {
    pub rows: [[f32; 4]; 4],
}

const _: () = assert!(std::mem::size_of::<Transform>() == 64);

impl Transform {
    pub const IDENTITY: Self = Self::scale(1.0);

    /// Uniform scale on x, y and z.
    pub const fn scale(s: f32) -> Self {
        Self {
            rows: [
                [s, 0.0, 0.0, 0.0],
                [0.0, s, 0.0, 0.0],
                [0.0, 0.0, s, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_matrix_is_64_bytes_as_authored() {
        let m = Transform::scale(0.5);
        let floats: &[f32] = bytemuck::cast_slice(m.as_bytes());
        assert_eq!(m.as_bytes().len(), 64);
        assert_eq!(
            floats,
            &[
                0.5, 0.0, 0.0, 0.0, //
                0.0, 0.5, 0.0, 0.0, //
                0.0, 0.0, 0.5, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ]
        );
    }
}
