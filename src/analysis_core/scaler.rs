//! Per-column standardization fit on the data being segmented

use super::moments::RunningMoments;

#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations. A constant
    /// column gets scale 1, so it is centered but not divided by zero.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let mut moments = vec![RunningMoments::new(); width];

        for row in rows {
            for (col, value) in row.iter().enumerate() {
                moments[col].push(*value);
            }
        }

        let means = moments.iter().map(|m| m.mean().unwrap_or(0.0)).collect();
        let scales = moments
            .iter()
            .map(|m| match m.population_std_dev() {
                Some(std) if std > 0.0 && std.is_finite() => std,
                _ => 1.0,
            })
            .collect();

        Self { means, scales }
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(value, (mean, scale))| (value - mean) / scale)
                    .collect()
            })
            .collect()
    }

    pub fn fit_transform(rows: &[Vec<f64>]) -> (Self, Vec<Vec<f64>>) {
        let scaler = Self::fit(rows);
        let scaled = scaler.transform(rows);
        (scaler, scaled)
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_scaled_independently() {
        let rows = vec![vec![1.0, 100.0], vec![2.0, 200.0], vec![3.0, 300.0]];
        let (scaler, scaled) = StandardScaler::fit_transform(&rows);

        assert_eq!(scaler.means(), &[2.0, 200.0]);
        for col in 0..2 {
            let mean: f64 = scaled.iter().map(|r| r[col]).sum::<f64>() / 3.0;
            let var: f64 = scaled.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
        // Both columns are the same shape once standardized
        assert!((scaled[0][0] - scaled[0][1]).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_only_centered() {
        let rows = vec![vec![5.0, 1.0], vec![5.0, 3.0]];
        let (scaler, scaled) = StandardScaler::fit_transform(&rows);

        assert_eq!(scaler.scales()[0], 1.0);
        assert_eq!(scaled[0][0], 0.0);
        assert_eq!(scaled[1][0], 0.0);
        assert_eq!(scaled[0][1], -1.0);
        assert_eq!(scaled[1][1], 1.0);
    }
}
