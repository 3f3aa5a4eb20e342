//! Keeping the reader's place when the content under the viewport reflows.

/// Snapshot of a scroll container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    /// Largest valid `scroll_top`, or `None` when the content fits the viewport.
    fn scrollable(&self) -> Option<f64> {
        let range = self.scroll_height - self.viewport_height;
        (range.is_finite() && range > 0.0).then_some(range)
    }
}

/// Relative scroll position in `0.0..=1.0`.
///
/// Capture before the window mutates (eviction, prepend), restore after the
/// new layout is measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRatio(f64);

impl ScrollRatio {
    pub const TOP: Self = Self(0.0);

    #[must_use]
    pub fn capture(metrics: ScrollMetrics) -> Self {
        match metrics.scrollable() {
            Some(range) if metrics.scroll_top.is_finite() => {
                Self((metrics.scroll_top / range).clamp(0.0, 1.0))
            }
            _ => Self::TOP,
        }
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// New `scroll_top` for the reflowed container.
    #[must_use]
    pub fn restore(self, metrics: ScrollMetrics) -> f64 {
        metrics.scrollable().map_or(0.0, |range| self.0 * range)
    }
}
