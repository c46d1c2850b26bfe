//! Move-Average Sampling Technique (MAST) statistics.
//!
//! A per-player table from action identity to accumulated value, independent
//! of where in the tree the action was taken. Rollouts can sample from it
//! with a Boltzmann distribution, and it is decayed between decisions so old
//! evidence fades.

use engine_core::PlayerId;
use std::collections::HashMap;
use std::hash::Hash;

/// Accumulated evidence for one action.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MastEntry {
    pub visits: u32,
    pub total_value: f64,
}

/// Per-player MAST table.
#[derive(Debug, Clone)]
pub struct MastTable<A> {
    tables: Vec<HashMap<A, MastEntry>>,
    default_value: f64,
}

impl<A: Eq + Hash> PartialEq for MastTable<A> {
    fn eq(&self, other: &Self) -> bool {
        self.default_value == other.default_value && self.tables == other.tables
    }
}

impl<A: Clone + Eq + Hash> MastTable<A> {
    pub fn new(n_players: usize, default_value: f64) -> Self {
        Self {
            tables: (0..n_players).map(|_| HashMap::new()).collect(),
            default_value,
        }
    }

    pub fn n_players(&self) -> usize {
        self.tables.len()
    }

    /// Record that `player` took `action` in a simulation worth `value` to them.
    pub fn update(&mut self, player: PlayerId, action: &A, value: f64) {
        if player >= self.tables.len() {
            self.tables.resize_with(player + 1, HashMap::new);
        }
        let entry = self.tables[player].entry(action.clone()).or_default();
        entry.visits += 1;
        entry.total_value += value;
    }

    /// Scale every stored value by `gamma`; visit counts are left alone.
    pub fn decay(&mut self, gamma: f64) {
        for table in &mut self.tables {
            for entry in table.values_mut() {
                entry.total_value *= gamma;
            }
        }
    }

    pub fn entry(&self, player: PlayerId, action: &A) -> Option<&MastEntry> {
        self.tables.get(player).and_then(|t| t.get(action))
    }

    /// Average value of `action` for `player`, or the default when unseen.
    pub fn value(&self, player: PlayerId, action: &A) -> f64 {
        match self.entry(player, action) {
            Some(e) if e.visits > 0 => e.total_value / e.visits as f64,
            _ => self.default_value,
        }
    }

    /// Number of distinct actions recorded for `player`.
    pub fn len(&self, player: PlayerId) -> usize {
        self.tables.get(player).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.iter().all(HashMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_value() {
        let mut mast = MastTable::new(2, 0.5);
        mast.update(0, &'a', 1.0);
        mast.update(0, &'a', 0.0);
        mast.update(1, &'b', 1.0);

        assert!((mast.value(0, &'a') - 0.5).abs() < 1e-12);
        assert_eq!(mast.value(1, &'b'), 1.0);
        // unseen actions fall back to the default
        assert_eq!(mast.value(0, &'b'), 0.5);
        assert_eq!(mast.len(0), 1);
    }

    #[test]
    fn test_decay_scales_values_only() {
        let mut mast = MastTable::new(1, 0.0);
        for _ in 0..4 {
            mast.update(0, &7u8, 1.0);
        }

        mast.decay(0.5);

        let entry = mast.entry(0, &7).unwrap();
        assert_eq!(entry.visits, 4);
        assert!((entry.total_value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_update_grows_player_tables() {
        let mut mast = MastTable::new(0, 0.0);
        assert!(mast.is_empty());
        mast.update(2, &1u8, 1.0);
        assert_eq!(mast.n_players(), 3);
        assert!(!mast.is_empty());
    }

    #[test]
    fn test_tables_compare_by_content() {
        let mut a = MastTable::new(2, 0.0);
        let mut b = MastTable::new(2, 0.0);
        a.update(1, &3u8, 1.0);
        assert_ne!(a, b);
        b.update(1, &3u8, 1.0);
        assert_eq!(a, b);
        assert_ne!(a, MastTable::new(2, 0.5));
    }
}
