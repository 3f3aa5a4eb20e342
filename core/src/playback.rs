//! At most one video plays at a time.

/// Something that can be started and stopped, typically a video player.
///
/// Handles are compared with `PartialEq` to tell whether the same player is
/// asking again.
pub trait Playable {
    fn play(&self);
    fn pause(&self);
}

/// Tracks which handle is playing and pauses it before another starts.
///
/// Each feed owns its own coordinator. The switch happens inside one
/// synchronous call, so two handles never play at once.
#[derive(Debug)]
pub struct PlaybackCoordinator<H> {
    current: Option<H>,
}

impl<H> Default for PlaybackCoordinator<H> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<H: Playable + PartialEq> PlaybackCoordinator<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> Option<&H> {
        self.current.as_ref()
    }

    /// Start `handle`, pausing whatever was playing. Returns the paused handle.
    pub fn request_play(&mut self, handle: H) -> Option<H> {
        if self.current.as_ref() == Some(&handle) {
            handle.play();
            return None;
        }
        let previous = self.current.take();
        if let Some(previous) = &previous {
            previous.pause();
        }
        handle.play();
        self.current = Some(handle);
        previous
    }

    /// Pause `handle` if it is the one playing. Returns whether it was.
    pub fn release(&mut self, handle: &H) -> bool {
        if self.current.as_ref() != Some(handle) {
            return false;
        }
        if let Some(current) = self.current.take() {
            current.pause();
        }
        true
    }

    /// Pause whatever is playing.
    pub fn stop(&mut self) -> Option<H> {
        let current = self.current.take()?;
        current.pause();
        Some(current)
    }
}
