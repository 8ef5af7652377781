//! Layout work counters.
//!
//! Records what the engine actually did: how often the wrapped line counter
//! ran, which reconcile case each edit took, and how often the table had to be
//! rebuilt from scratch. Tests use the counter invocation total to prove that
//! edits above the viewport are handled without scanning.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::reconcile::EditPlacement;

#[derive(Debug, Default)]
pub struct LayoutMetrics {
    /// Wrapped line counter scans started (including nested line-start lookups).
    pub counter_invocations: AtomicU64,
    /// Edits wholly above the first visible line (shift only).
    pub edits_before_viewport: AtomicU64,
    /// Edits that deleted across the first visible line (re-anchored).
    pub edits_overlapping_top: AtomicU64,
    /// Edits inside the visible range (salvage + partial recount).
    pub edits_interior: AtomicU64,
    /// Edits that filled blank rows below the end of the text.
    pub edits_ghost_lines: AtomicU64,
    /// Edits with no visible effect.
    pub edits_beyond: AtomicU64,
    /// Deletions measured before the edit because widths are proportional.
    pub pre_measured_deletes: AtomicU64,
    /// Table repopulations after a failed consistency check or a text reset.
    pub full_rebuilds: AtomicU64,
    /// Consistency checks that failed.
    pub consistency_failures: AtomicU64,
    /// Vertical or horizontal scroll position changes.
    pub scrolls: AtomicU64,
    /// Whole-buffer re-wraps (wrap mode, tab distance, width or style change).
    pub relayouts: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutMetricsSnapshot {
    pub counter_invocations: u64,
    pub edits_before_viewport: u64,
    pub edits_overlapping_top: u64,
    pub edits_interior: u64,
    pub edits_ghost_lines: u64,
    pub edits_beyond: u64,
    pub pre_measured_deletes: u64,
    pub full_rebuilds: u64,
    pub consistency_failures: u64,
    pub scrolls: u64,
    pub relayouts: u64,
}

impl LayoutMetrics {
    pub fn snapshot(&self) -> LayoutMetricsSnapshot {
        LayoutMetricsSnapshot {
            counter_invocations: self.counter_invocations.load(Ordering::Relaxed),
            edits_before_viewport: self.edits_before_viewport.load(Ordering::Relaxed),
            edits_overlapping_top: self.edits_overlapping_top.load(Ordering::Relaxed),
            edits_interior: self.edits_interior.load(Ordering::Relaxed),
            edits_ghost_lines: self.edits_ghost_lines.load(Ordering::Relaxed),
            edits_beyond: self.edits_beyond.load(Ordering::Relaxed),
            pre_measured_deletes: self.pre_measured_deletes.load(Ordering::Relaxed),
            full_rebuilds: self.full_rebuilds.load(Ordering::Relaxed),
            consistency_failures: self.consistency_failures.load(Ordering::Relaxed),
            scrolls: self.scrolls.load(Ordering::Relaxed),
            relayouts: self.relayouts.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_placement(&self, placement: EditPlacement) {
        let counter = match placement {
            EditPlacement::BeforeViewport => &self.edits_before_viewport,
            EditPlacement::OverlapsTop => &self.edits_overlapping_top,
            EditPlacement::Interior { .. } => &self.edits_interior,
            EditPlacement::GhostLines { .. } => &self.edits_ghost_lines,
            EditPlacement::Beyond => &self.edits_beyond,
        };
        Self::bump(counter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_placements() {
        let m = LayoutMetrics::default();
        m.record_placement(EditPlacement::Interior { line: 2 });
        m.record_placement(EditPlacement::Interior { line: 0 });
        m.record_placement(EditPlacement::BeforeViewport);
        LayoutMetrics::bump(&m.scrolls);
        let snap = m.snapshot();
        assert_eq!(snap.edits_interior, 2);
        assert_eq!(snap.edits_before_viewport, 1);
        assert_eq!(snap.scrolls, 1);
        assert_eq!(snap.counter_invocations, 0);
    }
}
