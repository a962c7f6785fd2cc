use std::fmt;

use crate::error::{GfxError, Result};

/// Where the renderer is in its lifecycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Stage {
    Uninitialized,
    /// Device acquired and surface configured.
    Configured,
    /// Pipeline and static resources built.
    PipelineReady,
    /// At least one frame submitted since the last configuration.
    Rendering,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StageEvent {
    SurfaceConfigured,
    ResourcesBuilt,
    FrameSubmitted,
    Resized,
}

impl fmt::Display for StageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks `Uninitialized → Configured → PipelineReady → Rendering`.
///
/// A resize drops back to `Configured`; the next submitted frame returns to
/// `Rendering` without passing through `PipelineReady` again, since resources
/// are built exactly once.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    stage: Stage,
    resources_built: bool,
    frames_submitted: u64,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            stage: Stage::Uninitialized,
            resources_built: false,
            frames_submitted: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn resources_built(&self) -> bool {
        self.resources_built
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Applies `event`, returning the new stage.
    pub fn apply(&mut self, event: StageEvent) -> Result<Stage> {
        use Stage::*;
        use StageEvent::*;

        let next = match (self.stage, event) {
            (Uninitialized | Configured, SurfaceConfigured) => Configured,
            (Configured, ResourcesBuilt) if !self.resources_built => PipelineReady,
            (PipelineReady | Rendering, FrameSubmitted) => Rendering,
            (Configured, FrameSubmitted) if self.resources_built => Rendering,
            (Configured | PipelineReady | Rendering, Resized) => Configured,
            (from, event) => {
                return Err(GfxError::OutOfOrder {
                    from: from.to_string(),
                    event: event.to_string(),
                });
            }
        };

        match event {
            ResourcesBuilt => self.resources_built = true,
            FrameSubmitted => self.frames_submitted += 1,
            _ => {}
        }

        if next != self.stage {
            log::debug!("lifecycle: {} --{event}--> {next}", self.stage);
        }
        self.stage = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendering() -> Lifecycle {
        let mut lc = Lifecycle::new();
        lc.apply(StageEvent::SurfaceConfigured).unwrap();
        lc.apply(StageEvent::ResourcesBuilt).unwrap();
        lc.apply(StageEvent::FrameSubmitted).unwrap();
        lc
    }

    #[test]
    fn happy_path_reaches_rendering() {
        let lc = rendering();
        assert_eq!(lc.stage(), Stage::Rendering);
        assert!(lc.resources_built());
        assert_eq!(lc.frames_submitted(), 1);
    }

    #[test]
    fn rendering_is_re_entered_per_frame() {
        let mut lc = rendering();
        assert_eq!(lc.apply(StageEvent::FrameSubmitted).unwrap(), Stage::Rendering);
        assert_eq!(lc.frames_submitted(), 2);
    }

    #[test]
    fn resize_round_trips_through_configured() {
        let mut lc = rendering();
        assert_eq!(lc.apply(StageEvent::Resized).unwrap(), Stage::Configured);
        assert_eq!(lc.apply(StageEvent::FrameSubmitted).unwrap(), Stage::Rendering);
    }

    #[test]
    fn consecutive_resizes_coalesce() {
        let mut lc = rendering();
        for _ in 0..5 {
            assert_eq!(lc.apply(StageEvent::Resized).unwrap(), Stage::Configured);
        }
        assert_eq!(lc.apply(StageEvent::FrameSubmitted).unwrap(), Stage::Rendering);
    }

    #[test]
    fn resources_are_built_once() {
        let mut lc = rendering();
        lc.apply(StageEvent::Resized).unwrap();
        let err = lc.apply(StageEvent::ResourcesBuilt).unwrap_err();
        assert!(matches!(err, GfxError::OutOfOrder { .. }));
        assert_eq!(lc.stage(), Stage::Configured);
    }

    #[test]
    fn rendering_before_resources_is_out_of_order() {
        let mut lc = Lifecycle::new();
        assert!(lc.apply(StageEvent::FrameSubmitted).is_err());

        lc.apply(StageEvent::SurfaceConfigured).unwrap();
        let err = lc.apply(StageEvent::FrameSubmitted).unwrap_err();
        assert_eq!(
            err.to_string(),
            "`FrameSubmitted` is not valid in state Configured"
        );
    }

    #[test]
    fn resize_before_configuration_is_out_of_order() {
        let mut lc = Lifecycle::new();
        assert!(lc.apply(StageEvent::Resized).is_err());
        assert_eq!(lc.stage(), Stage::Uninitialized);
    }
}
