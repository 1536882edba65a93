//! Highest-id watermark deciding which posts are new

use crate::config::InitialSnapshot;
use crate::models::PostRecord;

/// Per-session filter that lets through only posts newer than anything seen
///
/// The watermark only moves forward and is raised by every record observed,
/// pushed or not, so a late low id from a lagging mirror can never lower it.
#[derive(Debug, Clone)]
pub struct WatermarkFilter {
    highest_id_seen: u64,
    initial: InitialSnapshot,
}

impl WatermarkFilter {
    pub fn new(initial: InitialSnapshot) -> Self {
        Self {
            highest_id_seen: 0,
            initial,
        }
    }

    pub fn highest(&self) -> u64 {
        self.highest_id_seen
    }

    /// True once at least one post has been observed
    pub fn is_seeded(&self) -> bool {
        self.highest_id_seen != 0
    }

    /// Records to push for this cycle, ascending by id and without duplicates
    ///
    /// While unseeded in `Seed` mode the batch only establishes the watermark.
    pub fn admit(&mut self, records: Vec<PostRecord>) -> Vec<PostRecord> {
        let before = self.highest_id_seen;
        let cycle_max = records.iter().map(|r| r.id).max().unwrap_or(0);
        self.highest_id_seen = before.max(cycle_max);

        if before == 0 && self.initial == InitialSnapshot::Seed {
            return Vec::new();
        }

        let mut fresh: Vec<PostRecord> = records.into_iter().filter(|r| r.id > before).collect();
        fresh.sort_by_key(|r| r.id);
        fresh.dedup_by_key(|r| r.id);
        fresh
    }
}
