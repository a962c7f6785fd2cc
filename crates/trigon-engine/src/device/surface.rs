use winit::dpi::PhysicalSize;

use crate::error::GfxError;

/// The observable surface configuration.
///
/// Two specs that compare equal configure the surface identically, which is
/// what makes reconfiguration idempotent.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceSpec {
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
    pub alpha_mode: wgpu::CompositeAlphaMode,
    pub present_mode: wgpu::PresentMode,
}

impl SurfaceSpec {
    /// Returns the same spec with new physical dimensions.
    pub fn with_size(self, size: PhysicalSize<u32>) -> Self {
        Self {
            width: size.width,
            height: size.height,
            ..self
        }
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.width, self.height)
    }

    /// wgpu cannot configure a surface with a zero dimension.
    pub fn is_presentable(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn to_config(&self, desired_maximum_frame_latency: u32) -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: self.format,
            width: self.width,
            height: self.height,
            present_mode: self.present_mode,
            alpha_mode: self.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency,
        }
    }
}

/// What [`SurfaceState::request`] decided for a requested size.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum ConfigureStep {
    /// Zero area: the size is recorded but the surface is left unconfigured.
    Defer,
    /// Configure the surface with the new spec. `changed` is false when an
    /// identical, already applied spec is reapplied.
    Apply { changed: bool },
}

/// The last requested spec plus whether it is applied to the surface.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct SurfaceState {
    pub spec: SurfaceSpec,
    pub configured: bool,
}

impl SurfaceState {
    pub fn new(spec: SurfaceSpec) -> Self {
        Self {
            spec,
            configured: false,
        }
    }

    /// Records `size` and decides whether the surface must be configured.
    pub fn request(&mut self, size: PhysicalSize<u32>) -> ConfigureStep {
        let next = self.spec.with_size(size);

        if !next.is_presentable() {
            self.spec = next;
            self.configured = false;
            return ConfigureStep::Defer;
        }

        let changed = !(self.configured && next == self.spec);
        self.spec = next;
        self.configured = true;
        ConfigureStep::Apply { changed }
    }
}

pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let first = *formats.first()?;

    let preferred = formats
        .iter()
        .copied()
        .find(|f| f.is_srgb() == prefer_srgb);

    Some(preferred.unwrap_or(first))
}

pub(crate) fn choose_alpha_mode(
    supported: &[wgpu::CompositeAlphaMode],
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| supported.contains(m))
        .or_else(|| supported.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Maps a texture acquisition failure onto the engine taxonomy.
pub(crate) fn map_surface_error(err: wgpu::SurfaceError) -> GfxError {
    match err {
        wgpu::SurfaceError::Lost => GfxError::SurfaceLost("surface was lost".to_string()),
        wgpu::SurfaceError::Outdated => {
            GfxError::SurfaceLost("surface configuration is outdated".to_string())
        }
        wgpu::SurfaceError::OutOfMemory => GfxError::SurfaceOutOfMemory,
        wgpu::SurfaceError::Timeout => {
            GfxError::FrameSkipped("timed out acquiring surface texture".to_string())
        }
        wgpu::SurfaceError::Other => {
            GfxError::FrameSkipped("surface texture acquisition failed".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::OutputTarget;
    use winit::dpi::LogicalSize;
    use wgpu::{CompositeAlphaMode, TextureFormat};

    /// A drawable whose logical size and density are set by the test.
    struct Canvas {
        logical: LogicalSize<f64>,
        scale: f64,
    }

    impl OutputTarget for Canvas {
        fn logical_size(&self) -> LogicalSize<f64> {
            self.logical
        }

        fn scale_factor(&self) -> f64 {
            self.scale
        }
    }

    fn spec(width: u32, height: u32) -> SurfaceSpec {
        SurfaceSpec {
            format: TextureFormat::Bgra8Unorm,
            width,
            height,
            alpha_mode: CompositeAlphaMode::Opaque,
            present_mode: wgpu::PresentMode::Fifo,
        }
    }

    #[test]
    fn linear_format_preferred_by_default() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm];
        assert_eq!(
            choose_surface_format(&formats, false),
            Some(TextureFormat::Bgra8Unorm)
        );
        assert_eq!(
            choose_surface_format(&formats, true),
            Some(TextureFormat::Bgra8UnormSrgb)
        );
    }

    #[test]
    fn format_falls_back_to_first() {
        let formats = [TextureFormat::Rgba8UnormSrgb];
        assert_eq!(
            choose_surface_format(&formats, false),
            Some(TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(choose_surface_format(&[], false), None);
    }

    #[test]
    fn opaque_alpha_used_when_supported() {
        let modes = [CompositeAlphaMode::PreMultiplied, CompositeAlphaMode::Opaque];
        assert_eq!(
            choose_alpha_mode(&modes, Some(CompositeAlphaMode::Opaque)),
            CompositeAlphaMode::Opaque
        );
    }

    #[test]
    fn unsupported_alpha_falls_back_to_first_supported() {
        let modes = [CompositeAlphaMode::Inherit];
        assert_eq!(
            choose_alpha_mode(&modes, Some(CompositeAlphaMode::Opaque)),
            CompositeAlphaMode::Inherit
        );
        assert_eq!(choose_alpha_mode(&[], None), CompositeAlphaMode::Auto);
    }

    #[test]
    fn config_reflects_spec() {
        let config = spec(800, 600).to_config(2);
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 600);
        assert_eq!(config.format, TextureFormat::Bgra8Unorm);
        assert_eq!(config.alpha_mode, CompositeAlphaMode::Opaque);
        assert_eq!(config.usage, wgpu::TextureUsages::RENDER_ATTACHMENT);
    }

    #[test]
    fn zero_area_is_not_presentable() {
        assert!(!spec(0, 600).is_presentable());
        assert!(!spec(800, 0).is_presentable());
        assert!(spec(1, 1).is_presentable());
    }

    #[test]
    fn lost_and_outdated_map_to_surface_lost() {
        assert!(matches!(
            map_surface_error(wgpu::SurfaceError::Lost),
            GfxError::SurfaceLost(_)
        ));
        assert!(matches!(
            map_surface_error(wgpu::SurfaceError::Outdated),
            GfxError::SurfaceLost(_)
        ));
    }

    #[test]
    fn transient_errors_skip_the_frame() {
        assert!(matches!(
            map_surface_error(wgpu::SurfaceError::Timeout),
            GfxError::FrameSkipped(_)
        ));
        assert!(matches!(
            map_surface_error(wgpu::SurfaceError::OutOfMemory),
            GfxError::SurfaceOutOfMemory
        ));
    }

    // ── configuration state ───────────────────────────────────────────────

    #[test]
    fn identical_configure_is_idempotent() {
        let mut state = SurfaceState::new(spec(0, 0));

        assert_eq!(
            state.request(PhysicalSize::new(800, 600)),
            ConfigureStep::Apply { changed: true }
        );
        let once = state;

        assert_eq!(
            state.request(PhysicalSize::new(800, 600)),
            ConfigureStep::Apply { changed: false }
        );
        assert_eq!(state, once);
        assert_eq!(state.spec.size(), PhysicalSize::new(800, 600));
    }

    #[test]
    fn zero_area_defers_and_unconfigures() {
        let mut state = SurfaceState::new(spec(0, 0));
        state.request(PhysicalSize::new(800, 600));

        assert_eq!(state.request(PhysicalSize::new(0, 600)), ConfigureStep::Defer);
        assert!(!state.configured);
        assert_eq!(state.spec.size(), PhysicalSize::new(0, 600));

        // Coming back to the earlier size is a real reconfiguration.
        assert_eq!(
            state.request(PhysicalSize::new(800, 600)),
            ConfigureStep::Apply { changed: true }
        );
        assert!(state.configured);
    }

    #[test]
    fn last_of_many_resizes_wins() {
        let mut state = SurfaceState::new(spec(0, 0));
        let mut canvas = Canvas {
            logical: LogicalSize::new(800.0, 600.0),
            scale: 1.0,
        };

        let steps = [
            (LogicalSize::new(1024.0, 768.0), 1.0),
            (LogicalSize::new(0.0, 768.0), 1.0),
            (LogicalSize::new(640.0, 480.0), 2.0),
            (LogicalSize::new(333.0, 250.0), 1.5),
            (LogicalSize::new(500.0, 400.0), 1.25),
        ];
        for (logical, scale) in steps {
            canvas.logical = logical;
            canvas.scale = scale;
            state.request(canvas.physical_size());
        }

        assert!(state.configured);
        assert_eq!(state.spec.size(), PhysicalSize::new(625, 500));
        assert_eq!(state.spec.format, TextureFormat::Bgra8Unorm);
    }
}
