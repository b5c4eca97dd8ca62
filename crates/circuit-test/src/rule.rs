use std::rc::Rc;

use circuit::{ContentContainer, ContentHost, RenderError};
use circuit_runtime::Composer;

/// Headless harness around a [`ContentHost`].
///
/// Frames are stamped with a virtual clock that only moves when the test
/// advances it, so animations and frame-deferred effects are deterministic.
pub struct CircuitTestRule {
    host: ContentHost,
    frame_time_nanos: u64,
}

impl CircuitTestRule {
    /// Virtual time between two frames.
    pub const FRAME_INTERVAL_NANOS: u64 = 16_666_667;
    /// Frames [`CircuitTestRule::pump_until_idle`] runs before giving up.
    pub const MAX_PUMPED_FRAMES: usize = 240;

    pub fn new() -> Result<Self, RenderError> {
        Ok(Self::with_host(ContentHost::new()?))
    }

    pub fn with_host(host: ContentHost) -> Self {
        Self {
            host,
            frame_time_nanos: 0,
        }
    }

    pub fn host(&self) -> &ContentHost {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut ContentHost {
        &mut self.host
    }

    pub fn container(&self) -> Rc<dyn ContentContainer> {
        self.host.container()
    }

    pub fn frame_time_nanos(&self) -> u64 {
        self.frame_time_nanos
    }

    /// Installs `content` and renders until idle.
    pub fn set_content(
        &mut self,
        content: impl Fn(&mut Composer<'_>) + 'static,
    ) -> Result<(), RenderError> {
        self.host.container().render(Rc::new(content));
        self.pump_until_idle()
    }

    /// Moves the clock one frame interval forward and renders once.
    pub fn advance_frame(&mut self) -> Result<(), RenderError> {
        self.advance_time_by(Self::FRAME_INTERVAL_NANOS)
    }

    /// Moves the clock by `nanos` and renders once.
    pub fn advance_time_by(&mut self, nanos: u64) -> Result<(), RenderError> {
        self.frame_time_nanos = self.frame_time_nanos.saturating_add(nanos);
        self.host.frame(self.frame_time_nanos)
    }

    /// Renders frame after frame while anything keeps requesting one.
    pub fn pump_until_idle(&mut self) -> Result<(), RenderError> {
        for _ in 0..Self::MAX_PUMPED_FRAMES {
            if !self.host.take_frame_request() {
                return Ok(());
            }
            self.advance_frame()?;
        }
        log::warn!(
            "content still requesting frames after {} frames",
            Self::MAX_PUMPED_FRAMES
        );
        Ok(())
    }

    /// Forwards a back press and renders until idle.
    pub fn press_back(&mut self) -> Result<bool, RenderError> {
        let handled = self.host.back_pressed();
        self.pump_until_idle()?;
        Ok(handled)
    }

    /// Recreates the composition and renders until idle.
    pub fn recreate(&mut self) -> Result<(), RenderError> {
        self.host.recreate()?;
        self.pump_until_idle()
    }
}
