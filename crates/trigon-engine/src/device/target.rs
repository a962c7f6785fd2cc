use winit::dpi::{LogicalSize, PhysicalSize};
use winit::window::Window;

/// An externally owned drawable the surface presents into.
///
/// The engine only reads the logical size and pixel density; the target's
/// lifecycle belongs to the caller.
pub trait OutputTarget {
    /// Size in logical (density-independent) pixels.
    fn logical_size(&self) -> LogicalSize<f64>;

    /// Display pixel density.
    fn scale_factor(&self) -> f64;

    /// Current size in physical pixels, recomputed on every call.
    fn physical_size(&self) -> PhysicalSize<u32> {
        physical_size(self.logical_size(), self.scale_factor())
    }
}

/// Scales a logical size by `scale`, rounding to whole pixels.
pub fn physical_size(logical: LogicalSize<f64>, scale: f64) -> PhysicalSize<u32> {
    logical.to_physical(scale)
}

impl OutputTarget for Window {
    fn logical_size(&self) -> LogicalSize<f64> {
        self.inner_size().to_logical(self.scale_factor())
    }

    fn scale_factor(&self) -> f64 {
        Window::scale_factor(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canvas {
        width: f64,
        height: f64,
        dpr: f64,
    }

    impl OutputTarget for Canvas {
        fn logical_size(&self) -> LogicalSize<f64> {
            LogicalSize::new(self.width, self.height)
        }

        fn scale_factor(&self) -> f64 {
            self.dpr
        }
    }

    #[test]
    fn physical_size_scales_by_density() {
        let canvas = Canvas { width: 640.0, height: 480.0, dpr: 2.0 };
        assert_eq!(canvas.physical_size(), PhysicalSize::new(1280, 960));
    }

    #[test]
    fn physical_size_rounds_fractional_density() {
        let canvas = Canvas { width: 101.0, height: 50.0, dpr: 1.5 };
        assert_eq!(canvas.physical_size(), PhysicalSize::new(152, 75));
    }

    #[test]
    fn physical_size_is_not_cached() {
        let mut canvas = Canvas { width: 300.0, height: 200.0, dpr: 1.0 };
        assert_eq!(canvas.physical_size(), PhysicalSize::new(300, 200));

        canvas.dpr = 2.0;
        assert_eq!(canvas.physical_size(), PhysicalSize::new(600, 400));
    }
}
