use crate::types::{Emotion, CHANNEL_COUNT};
use std::collections::BTreeMap;

/// Per-channel occurrence counts and summed confidences of the primary
/// face's dominant channel.
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    counts: [u64; CHANNEL_COUNT],
    confidence_sums: [f64; CHANNEL_COUNT],
}

impl FrequencyTable {
    pub fn record(&mut self, emotion: Emotion, confidence: f32) {
        let i = emotion as usize;
        self.counts[i] += 1;
        self.confidence_sums[i] += f64::from(confidence);
    }

    pub fn count(&self, emotion: Emotion) -> u64 {
        self.counts[emotion as usize]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Channel with the highest count; ties go to the earlier channel.
    /// `None` before any sample.
    pub fn most_frequent(&self) -> Option<Emotion> {
        let mut best = None;
        let mut best_count = 0u64;
        for e in Emotion::ALL {
            let count = self.count(e);
            if count > best_count {
                best_count = count;
                best = Some(e);
            }
        }
        best
    }

    /// Mean confidence for one channel, or across all channels when `None`.
    /// 0 when there are no samples.
    pub fn average_confidence(&self, emotion: Option<Emotion>) -> f64 {
        let (count, sum) = match emotion {
            Some(e) => (self.count(e), self.confidence_sums[e as usize]),
            None => (self.total(), self.confidence_sums.iter().sum()),
        };
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    /// Counts for every channel, in channel order.
    pub fn breakdown(&self) -> BTreeMap<Emotion, u64> {
        Emotion::ALL.iter().map(|&e| (e, self.count(e))).collect()
    }
}
