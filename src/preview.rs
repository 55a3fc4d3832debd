// ============================================================================
// PREVIEW SCHEDULING - debounce window + generation-token staleness
// ============================================================================
//
// Every edit bumps a shared generation counter and hands the caller a token
// carrying the generation captured at dispatch. A debounced token waits out
// the quiescence window before rendering; a token that is no longer current
// when it wakes up (or when its decode completes) is superseded and its
// render is silently dropped. Supersession is the cancellation mechanism:
// scheduling a newer refresh invalidates every older token.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use image::RgbaImage;

/// Quiescence window between the last slider tick and the preview render.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Result of a preview render attempt. A superseded render is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The render completed and is now the displayed preview.
    Rendered,
    /// A newer refresh was scheduled first; this render was dropped.
    Superseded,
}

/// The transient, recomputable bitmap shown to the user. Never part of the
/// timeline until a commit bakes it in.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub image: RgbaImage,
    /// Generation of the refresh that produced this frame.
    pub generation: u64,
}

impl PreviewFrame {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Issues refresh tokens against a monotonically increasing generation.
#[derive(Debug)]
pub struct RefreshScheduler {
    latest: Arc<AtomicU64>,
    debounce: Duration,
}

impl RefreshScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            latest: Arc::new(AtomicU64::new(0)),
            debounce,
        }
    }

    /// Schedule a refresh after the quiescence window. Invalidates every
    /// previously issued token.
    pub fn debounced(&self) -> RefreshToken {
        self.issue(self.debounce)
    }

    /// Schedule a refresh with no delay (cursor change, filter selection,
    /// explicit reset). Invalidates every previously issued token.
    pub fn immediate(&self) -> RefreshToken {
        self.issue(Duration::ZERO)
    }

    pub fn current_generation(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn debounce_window(&self) -> Duration {
        self.debounce
    }

    fn issue(&self, delay: Duration) -> RefreshToken {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        RefreshToken {
            generation,
            delay,
            latest: Arc::clone(&self.latest),
        }
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

/// One scheduled preview refresh: the generation captured at dispatch plus
/// the delay it has to wait out.
#[derive(Debug)]
pub struct RefreshToken {
    generation: u64,
    delay: Duration,
    latest: Arc<AtomicU64>,
}

impl RefreshToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while no newer refresh has been scheduled.
    pub fn is_current(&self) -> bool {
        self.generation == self.latest.load(Ordering::SeqCst)
    }

    /// Wait out the quiescence window. Returns `false` if a newer refresh
    /// superseded this one while it slept.
    pub async fn quiesce(&self) -> bool {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.is_current()
    }
}
