use crate::error::{GfxError, Result};

/// Environment variable selecting the adapter power preference
/// (`high`, `low` or `none`).
pub const POWER_PREFERENCE_ENV: &str = "TRIGON_POWER_PREFERENCE";

/// Initialization parameters for the GPU layer.
///
/// Defaults mirror a browser canvas setup: a high-performance adapter, an
/// opaque surface and FIFO presentation.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Adapter power preference.
    pub power_preference: wgpu::PowerPreference,

    /// Backends the instance may use. An empty set means the host has no
    /// graphics capability and initialization fails before anything is created.
    pub backends: wgpu::Backends,

    /// Prefer an sRGB surface format when available.
    ///
    /// Off by default: the first linear format is closest to what a canvas
    /// context reports as its preferred format.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    pub present_mode: wgpu::PresentMode,

    /// Alpha compositing preference. Falls back to a supported mode when the
    /// surface cannot honour it.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface. A hint only.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            backends: wgpu::Backends::all(),
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: Some(wgpu::CompositeAlphaMode::Opaque),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Defaults overlaid with `TRIGON_POWER_PREFERENCE` and `WGPU_BACKEND`.
    pub fn from_env() -> Self {
        let mut init = Self::default();

        if let Ok(value) = std::env::var(POWER_PREFERENCE_ENV) {
            match parse_power_preference(&value) {
                Some(pref) => init.power_preference = pref,
                None => log::warn!("ignoring {POWER_PREFERENCE_ENV}={value:?}; expected high, low or none"),
            }
        }

        if let Some(backends) = wgpu::Backends::from_env() {
            init.backends = backends;
        }

        init
    }
}

/// Parses a power preference name.
pub fn parse_power_preference(value: &str) -> Option<wgpu::PowerPreference> {
    match value.trim().to_ascii_lowercase().as_str() {
        "high" | "high-performance" => Some(wgpu::PowerPreference::HighPerformance),
        "low" | "low-power" => Some(wgpu::PowerPreference::LowPower),
        "none" => Some(wgpu::PowerPreference::None),
        _ => None,
    }
}

/// Host capability check.
///
/// Runs before any instance, surface or device is constructed and returns the
/// requested backends this build of wgpu can actually drive.
pub fn check_host(init: &GpuInit) -> Result<wgpu::Backends> {
    usable_backends(init.backends, wgpu::Instance::enabled_backend_features())
}

fn usable_backends(requested: wgpu::Backends, compiled: wgpu::Backends) -> Result<wgpu::Backends> {
    if requested.is_empty() {
        return Err(GfxError::Unsupported(
            "no graphics backend is enabled for this host".to_string(),
        ));
    }

    let usable = requested & compiled;
    if usable.is_empty() {
        return Err(GfxError::Unsupported(format!(
            "requested backends {requested:?} are not available in this build (have {compiled:?})"
        )));
    }

    if usable != requested {
        log::debug!("backends {:?} not compiled in; using {usable:?}", requested - compiled);
    }
    Ok(usable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_canvas_setup() {
        let init = GpuInit::default();
        assert_eq!(init.power_preference, wgpu::PowerPreference::HighPerformance);
        assert_eq!(init.alpha_mode, Some(wgpu::CompositeAlphaMode::Opaque));
        assert_eq!(init.present_mode, wgpu::PresentMode::Fifo);
        assert!(!init.prefer_srgb);
    }

    #[test]
    fn empty_backend_set_is_unsupported() {
        let init = GpuInit {
            backends: wgpu::Backends::empty(),
            ..GpuInit::default()
        };
        let err = check_host(&init).unwrap_err();
        assert!(matches!(err, GfxError::Unsupported(_)));
    }

    #[test]
    fn usable_backends_are_the_compiled_subset() {
        let usable = usable_backends(
            wgpu::Backends::VULKAN | wgpu::Backends::METAL,
            wgpu::Backends::VULKAN | wgpu::Backends::GL,
        )
        .unwrap();
        assert_eq!(usable, wgpu::Backends::VULKAN);
    }

    #[test]
    fn backend_missing_from_build_is_unsupported() {
        let err = usable_backends(
            wgpu::Backends::DX12,
            wgpu::Backends::NOOP | wgpu::Backends::VULKAN | wgpu::Backends::GL,
        )
        .unwrap_err();
        assert!(matches!(err, GfxError::Unsupported(ref m) if m.contains("DX12")));
    }

    #[test]
    fn host_check_never_returns_uncompiled_backends() {
        let compiled = wgpu::Instance::enabled_backend_features();
        match check_host(&GpuInit::default()) {
            Ok(backends) => assert!(compiled.contains(backends)),
            Err(err) => assert!(matches!(err, GfxError::Unsupported(_))),
        }
    }

    #[test]
    fn power_preference_names() {
        assert_eq!(
            parse_power_preference("High"),
            Some(wgpu::PowerPreference::HighPerformance)
        );
        assert_eq!(
            parse_power_preference(" low-power "),
            Some(wgpu::PowerPreference::LowPower)
        );
        assert_eq!(parse_power_preference("none"), Some(wgpu::PowerPreference::None));
        assert_eq!(parse_power_preference("turbo"), None);
    }
}
