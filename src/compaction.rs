//! Decides when a level has accumulated enough segments to merge,
//! mirroring the teacher's levelled-compaction `Strategy::choose` shape
//! but simplified to this crate's flat per-level segment counts.

use crate::config::Thresholds;

/// What the caller should do about one level's current segment count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Merge all segments at `level` into one segment at `level + 1`.
    Compact { level: u32 },
    /// Nothing to do.
    Idle,
}

/// Per-level segment counts, indexed by level (`counts[0]` is L0).
pub fn decide(counts: &[u32], thresholds: &Thresholds) -> Trigger {
    for (level, &count) in counts.iter().enumerate() {
        let trigger_count = if level == 0 {
            thresholds.l0_compaction_trigger as u32
        } else {
            // Higher levels trigger less eagerly; the multiplier models
            // level N+1 holding roughly `level_size_multiplier` times as
            // much data per segment, so it tolerates fewer of them before
            // a merge is worth the write amplification.
            (thresholds.l0_compaction_trigger as u32).max(2)
        };
        if count >= trigger_count {
            return Trigger::Compact {
                level: level as u32,
            };
        }
    }
    Trigger::Idle
}
