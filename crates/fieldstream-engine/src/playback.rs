//! The playback cursor advanced by the consumer loop.

use fieldstream_core::EndPolicy;

/// Result of one [`PlaybackCursor::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing is buffered.
    Idle,
    /// Playback is paused.
    Paused,
    /// The cursor moved to this index.
    Advanced(usize),
    /// At the last frame while the producer may still add more.
    Holding,
    /// At the last frame of a finished stream; playback stopped.
    Halted,
    /// At the last frame of a finished stream; restarted from 0.
    Wrapped,
}

/// Index of the displayed frame, plus the play/pause flag.
///
/// The position is `None` while nothing is buffered. Every operation
/// takes the current buffer length and clamps to it, so the position
/// never points past the end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackCursor {
    position: Option<usize>,
    playing: bool,
}

impl PlaybackCursor {
    /// A cursor with nothing to show.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current index, if any frame is buffered.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Whether ticks advance the cursor.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Show frame 0 and start playing. Called when a session's first
    /// frames land.
    pub fn start(&mut self) {
        self.position = Some(0);
        self.playing = true;
    }

    /// Advance one frame.
    ///
    /// `producing` is whether more frames may still arrive. At the last
    /// frame the cursor holds while producing; once the stream is over
    /// `end` decides between stopping and wrapping to frame 0.
    pub fn tick(&mut self, len: usize, producing: bool, end: EndPolicy) -> TickOutcome {
        if len == 0 {
            self.position = None;
            return TickOutcome::Idle;
        }
        let pos = self.position.unwrap_or(0).min(len - 1);
        self.position = Some(pos);
        if !self.playing {
            return TickOutcome::Paused;
        }
        if pos + 1 < len {
            self.position = Some(pos + 1);
            return TickOutcome::Advanced(pos + 1);
        }
        if producing {
            return TickOutcome::Holding;
        }
        match end {
            EndPolicy::Halt => {
                self.playing = false;
                TickOutcome::Halted
            }
            EndPolicy::Loop => {
                self.position = Some(0);
                TickOutcome::Wrapped
            }
        }
    }

    /// Jump to `index`, clamped to the buffer, and pause.
    pub fn set(&mut self, index: usize, len: usize) -> Option<usize> {
        self.playing = false;
        self.position = len.checked_sub(1).map(|last| index.min(last));
        self.position
    }

    /// Move by `delta` frames, clamped to the buffer, and pause.
    pub fn step(&mut self, delta: isize, len: usize) -> Option<usize> {
        let from = self.position.unwrap_or(0);
        let target = if delta.is_negative() {
            from.saturating_sub(delta.unsigned_abs())
        } else {
            from.saturating_add(delta.unsigned_abs())
        };
        self.set(target, len)
    }

    /// Resume or pause.
    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Back to the empty, paused state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
