use isoterra_geom::{Aabb, Vec3};

/// Receiver for streaming visualization.
pub trait DebugSink {
    /// Callers skip building primitives when this is false.
    fn enabled(&self) -> bool {
        true
    }
    fn text(&mut self, at: Vec3, text: &str);
    fn line(&mut self, a: Vec3, b: Vec3);
    fn aabb(&mut self, aabb: &Aabb);
}

/// Used when nothing is attached.
pub struct NullDebugSink;

impl DebugSink for NullDebugSink {
    fn enabled(&self) -> bool {
        false
    }
    fn text(&mut self, _at: Vec3, _text: &str) {}
    fn line(&mut self, _a: Vec3, _b: Vec3) {}
    fn aabb(&mut self, _aabb: &Aabb) {}
}

/// Writes every primitive to the `debug` log target at trace level.
#[derive(Default)]
pub struct LogDebugSink {
    pub primitives: usize,
}

impl DebugSink for LogDebugSink {
    fn text(&mut self, at: Vec3, text: &str) {
        self.primitives += 1;
        log::trace!(target: "debug", "text {:?} {}", at, text);
    }

    fn line(&mut self, a: Vec3, b: Vec3) {
        self.primitives += 1;
        log::trace!(target: "debug", "line {:?} -> {:?}", a, b);
    }

    fn aabb(&mut self, aabb: &Aabb) {
        self.primitives += 1;
        log::trace!(target: "debug", "aabb {:?}..{:?}", aabb.min, aabb.max);
    }
}

/// Per-tick streaming counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamingStats {
    pub resident: usize,
    pub active: usize,
    /// Submitted jobs whose results have not been drained yet.
    pub in_flight: usize,
    pub queued: usize,
    pub started: usize,
    pub completed: usize,
    pub discarded: usize,
    /// Candidates skipped because their count is known empty or interior.
    pub cache_hits: usize,
    pub evicted: usize,
}
