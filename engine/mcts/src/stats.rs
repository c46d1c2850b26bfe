//! Per-action statistics held at a node, and the running value range used to
//! normalise them.

/// Visit and value totals of one action at one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStats {
    /// Times the action was chosen here
    pub visits: u32,

    /// Times the action was available when the node was visited. Under
    /// redeterminization this can be smaller than the node's visits.
    pub valid_visits: u32,

    /// Sum of backed-up values, per player
    pub total_value: Vec<f64>,

    /// Sum of squared backed-up values, per player (for UCB-tuned)
    pub square_value: Vec<f64>,
}

impl ActionStats {
    pub fn new(n_players: usize) -> Self {
        Self {
            visits: 0,
            valid_visits: 0,
            total_value: vec![0.0; n_players],
            square_value: vec![0.0; n_players],
        }
    }

    /// Add one visit carrying `values` (one per player).
    pub fn update(&mut self, values: &[f64]) {
        if self.total_value.len() < values.len() {
            self.total_value.resize(values.len(), 0.0);
            self.square_value.resize(values.len(), 0.0);
        }
        self.visits += 1;
        for (i, v) in values.iter().enumerate() {
            self.total_value[i] += v;
            self.square_value[i] += v * v;
        }
    }

    /// Mean value for `player`; 0 before the first visit.
    #[inline]
    pub fn mean(&self, player: usize) -> f64 {
        if self.visits == 0 {
            return 0.0;
        }
        self.total_value.get(player).copied().unwrap_or(0.0) / self.visits as f64
    }

    /// Population variance of `player`'s values; 0 before the first visit.
    pub fn variance(&self, player: usize) -> f64 {
        if self.visits == 0 {
            return 0.0;
        }
        let n = self.visits as f64;
        let mean = self.mean(player);
        let sq = self.square_value.get(player).copied().unwrap_or(0.0) / n;
        (sq - mean * mean).max(0.0)
    }
}

/// Smallest and largest value seen during a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ValueBounds {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl ValueBounds {
    pub fn observe(&mut self, value: f64) {
        if value.is_finite() {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
    }

    /// Width of the observed range; 0 until two different values were seen.
    pub fn range(&self) -> f64 {
        if self.max > self.min {
            self.max - self.min
        } else {
            0.0
        }
    }

    /// Map `value` into [0, 1]; values are returned unchanged until a range exists.
    pub fn normalise(&self, value: f64) -> f64 {
        let range = self.range();
        if range > 0.0 {
            (value - self.min) / range
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_mean() {
        let mut stats = ActionStats::new(2);
        assert_eq!(stats.mean(0), 0.0);

        stats.update(&[1.0, 0.0]);
        stats.update(&[0.0, 1.0]);
        stats.update(&[1.0, 0.0]);

        assert_eq!(stats.visits, 3);
        assert!((stats.mean(0) - 2.0 / 3.0).abs() < 1e-12);
        assert!((stats.mean(1) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_variance() {
        let mut stats = ActionStats::new(1);
        stats.update(&[1.0]);
        stats.update(&[0.0]);
        assert!((stats.variance(0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_update_grows_player_vectors() {
        let mut stats = ActionStats::new(0);
        stats.update(&[0.5, 0.25, 0.25]);
        assert_eq!(stats.total_value.len(), 3);
        assert!((stats.mean(2) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_bounds_normalise() {
        let mut bounds = ValueBounds::default();
        assert_eq!(bounds.normalise(3.0), 3.0);

        bounds.observe(-2.0);
        bounds.observe(2.0);
        bounds.observe(f64::NAN);
        assert_eq!(bounds.range(), 4.0);
        assert!((bounds.normalise(0.0) - 0.5).abs() < 1e-12);
        assert!((bounds.normalise(2.0) - 1.0).abs() < 1e-12);
    }
}
