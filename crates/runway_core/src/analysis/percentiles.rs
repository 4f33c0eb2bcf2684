//! Percentile tables at 1% increments

use serde::{Deserialize, Serialize};

/// Linear-interpolated percentile of an ascending slice
///
/// `p` is in percent and clamped to `[0, 100]`. The rank is `p / 100 * (n - 1)`
/// with linear interpolation between neighbours, the common default of numeric
/// libraries. Returns NaN for an empty slice.
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let Some(&last) = sorted.last() else {
        return f64::NAN;
    };
    if sorted.len() == 1 {
        return last;
    }

    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let below = rank.floor() as usize;
    let above = rank.ceil() as usize;
    let weight = rank - below as f64;

    let (low, high) = (sorted[below], sorted[above]);
    // Rounding must not step outside the bracketing pair
    (low + (high - low) * weight).max(low).min(high)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileRow {
    pub percentile: u8,
    pub value: f64,
}

/// Percentiles 0 through 100 of a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileTable {
    pub rows: Vec<PercentileRow>,
}

impl PercentileTable {
    /// Build the table, or `None` for an empty sample
    ///
    /// NaN values sort after every number, so they only surface at the top
    /// percentiles.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut sorted: Vec<f64> = values.into_iter().collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let rows = (0..=100u8)
            .map(|p| PercentileRow {
                percentile: p,
                value: percentile(&sorted, f64::from(p)),
            })
            .collect();
        Some(Self { rows })
    }

    /// Same table with every value multiplied by `factor`
    #[must_use]
    pub fn scaled(mut self, factor: f64) -> Self {
        for row in &mut self.rows {
            row.value *= factor;
        }
        self
    }

    #[must_use]
    pub fn value_at(&self, percentile: u8) -> Option<f64> {
        self.rows
            .get(usize::from(percentile))
            .map(|row| row.value)
    }

    #[must_use]
    pub fn median(&self) -> Option<f64> {
        self.value_at(50)
    }

    /// First `n` rows, for console previews
    #[must_use]
    pub fn head(&self, n: usize) -> &[PercentileRow] {
        &self.rows[..n.min(self.rows.len())]
    }
}
