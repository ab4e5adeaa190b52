//! Hierarchical heading numbers.

/// Deepest heading level that gets its own counter.
pub const DEPTH_MAX: usize = 6;

/// Heading counters: a fixed array with an active-length cursor.
///
/// Entries past `len` are always zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadingCounters {
    counts: [u32; DEPTH_MAX],
    len: usize,
}

impl HeadingCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters after a heading at `depth` (clamped to `1..=DEPTH_MAX`).
    ///
    /// Going deeper pads skipped levels with zero, so depth 3 directly after
    /// depth 1 yields `x.0.1`. Going shallower drops the deeper levels.
    #[must_use]
    pub fn next(self, depth: usize) -> Self {
        let depth = depth.clamp(1, DEPTH_MAX);
        let mut counts = self.counts;
        for slot in counts.iter_mut().skip(depth) {
            *slot = 0;
        }
        counts[depth - 1] += 1;
        Self { counts, len: depth }
    }

    /// Active depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Active counters, outermost first.
    #[must_use]
    pub fn active(&self) -> &[u32] {
        &self.counts[..self.len]
    }

    /// Dotted number such as `2.0.1`.
    #[must_use]
    pub fn number(&self) -> String {
        self.active()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}
