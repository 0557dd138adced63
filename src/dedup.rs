use std::collections::HashMap;

use crate::error::RowError;
use crate::row::SongRow;

/// What happens to a row whose UNIQUE_ID was already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Forward every row; repeats are only counted.
    Keep,
    /// Forward the first row for each id and drop the rest.
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// First row carrying this id.
    First,
    /// A repeat that is still forwarded (policy is `Keep`).
    Repeat { first_line: u64 },
    /// A repeat that must not be forwarded.
    Dropped(RowError),
}

impl Admission {
    pub fn forwards(&self) -> bool {
        !matches!(self, Admission::Dropped(_))
    }
}

/// Tracks the UNIQUE_IDs seen during one run, together with the line they
/// first appeared on.
#[derive(Debug)]
pub struct Deduplicator {
    policy: DuplicatePolicy,
    seen: HashMap<String, u64>,
    repeats: u64,
}

impl Deduplicator {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            seen: HashMap::new(),
            repeats: 0,
        }
    }

    /// Rows seen whose id had already appeared, whether dropped or not.
    pub fn repeats(&self) -> u64 {
        self.repeats
    }

    pub fn admit(&mut self, row: &SongRow) -> Admission {
        let Some(first_line) = self.seen.get(&row.unique_id).copied() else {
            self.seen.insert(row.unique_id.clone(), row.line);
            return Admission::First;
        };

        self.repeats += 1;
        match self.policy {
            DuplicatePolicy::Keep => Admission::Repeat { first_line },
            DuplicatePolicy::Remove => Admission::Dropped(RowError::Duplicate {
                unique_id: row.unique_id.clone(),
                first_line,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::song_row;

    #[test]
    fn keep_policy_forwards_every_distinct_row() {
        let mut dedup = Deduplicator::new(DuplicatePolicy::Keep);
        let rows: Vec<SongRow> = (0..20)
            .map(|i| song_row(i + 2, &format!("ID{i}"), "Band"))
            .collect();

        let forwarded = rows.iter().filter(|r| dedup.admit(r).forwards()).count();

        assert_eq!(forwarded, rows.len());
        assert_eq!(dedup.repeats(), 0);
    }

    #[test]
    fn keep_policy_counts_but_forwards_repeats() {
        let mut dedup = Deduplicator::new(DuplicatePolicy::Keep);
        assert_eq!(dedup.admit(&song_row(2, "A", "x")), Admission::First);
        assert_eq!(
            dedup.admit(&song_row(3, "A", "x")),
            Admission::Repeat { first_line: 2 }
        );
        assert_eq!(dedup.repeats(), 1);
    }

    #[test]
    fn remove_policy_forwards_only_the_first_occurrence() {
        let mut dedup = Deduplicator::new(DuplicatePolicy::Remove);
        let rows = [
            song_row(2, "ID1", "first"),
            song_row(3, "ID2", "other"),
            song_row(4, "ID1", "second"),
            song_row(5, "ID1", "third"),
        ];

        let forwarded: Vec<&SongRow> = rows.iter().filter(|r| dedup.admit(r).forwards()).collect();

        assert_eq!(forwarded.len(), 2);
        assert_eq!(forwarded[0].artist_clean, "first");
        assert_eq!(forwarded[1].unique_id, "ID2");
        assert_eq!(dedup.repeats(), 2);
    }

    #[test]
    fn dropped_rows_reference_first_line() {
        let mut dedup = Deduplicator::new(DuplicatePolicy::Remove);
        dedup.admit(&song_row(7, "ID1", "a"));
        match dedup.admit(&song_row(9, "ID1", "a")) {
            Admission::Dropped(RowError::Duplicate { unique_id, first_line }) => {
                assert_eq!(unique_id, "ID1");
                assert_eq!(first_line, 7);
            }
            other => panic!("expected drop, got {other:?}"),
        }
    }
}
