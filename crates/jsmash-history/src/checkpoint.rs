//! Checkpoint lookup for resuming generation.

use jsmash_core::PrngState;

use crate::entry::ReplayLogEntry;
use crate::{HistoryError, Result};

/// Where regeneration can pick up.
///
/// `state` is the PRNG state right after step `sequence` was generated, so
/// importing it and generating yields step `sequence + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    /// Sequence number of the checkpointed step
    pub sequence: u64,
    /// Position of that step in the entry list
    pub index: usize,
    /// Exported PRNG state
    pub state: PrngState,
}

impl ResumePoint {
    /// The last checkpoint in `entries`, validated.
    pub fn latest(entries: &[ReplayLogEntry]) -> Result<Option<Self>> {
        Self::latest_at_or_before(entries, u64::MAX)
    }

    /// The last checkpoint whose sequence is at most `sequence`.
    pub fn latest_at_or_before(entries: &[ReplayLogEntry], sequence: u64) -> Result<Option<Self>> {
        let found = entries
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, e)| e.sequence <= sequence)
            .find_map(|(index, e)| e.checkpoint.as_ref().map(|state| (index, e.sequence, state)));

        match found {
            None => Ok(None),
            Some((_, sequence, state)) if !state.is_well_formed() => {
                Err(HistoryError::InvalidCheckpoint(sequence))
            }
            Some((index, sequence, state)) => Ok(Some(Self {
                sequence,
                index,
                state: state.clone(),
            })),
        }
    }
}

/// Iterate over `(sequence, state)` for every checkpointed entry.
pub fn checkpoints(entries: &[ReplayLogEntry]) -> impl Iterator<Item = (u64, &PrngState)> {
    entries
        .iter()
        .filter_map(|e| e.checkpoint.as_ref().map(|state| (e.sequence, state)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsmash_core::Mt19937;

    fn sample_entries() -> Vec<ReplayLogEntry> {
        let mut rng = Mt19937::new(1);
        (1..=25u64)
            .map(|seq| {
                rng.next_u32();
                let entry = ReplayLogEntry::new(seq, format!("s{seq};"));
                if seq % 10 == 0 {
                    entry.with_checkpoint(rng.export_state())
                } else {
                    entry
                }
            })
            .collect()
    }

    #[test]
    fn test_latest_checkpoint() {
        let entries = sample_entries();
        let point = ResumePoint::latest(&entries).unwrap().unwrap();
        assert_eq!(point.sequence, 20);
        assert_eq!(point.index, 19);

        let earlier = ResumePoint::latest_at_or_before(&entries, 15).unwrap().unwrap();
        assert_eq!(earlier.sequence, 10);

        assert!(ResumePoint::latest_at_or_before(&entries, 9).unwrap().is_none());
        assert_eq!(checkpoints(&entries).count(), 2);
    }

    #[test]
    fn test_malformed_checkpoint_rejected() {
        let entries = vec![ReplayLogEntry::new(1, ";").with_checkpoint(PrngState {
            words: vec![1, 2, 3],
            index: 0,
        })];
        assert!(matches!(
            ResumePoint::latest(&entries),
            Err(HistoryError::InvalidCheckpoint(1))
        ));
    }
}
