use crate::error::ScoringError;

pub const FEATURE_COUNT: usize = 41;

/// Canonical slot order. Scorers are trained against exactly this order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "lag_1_admissions",
    "lag_7_admissions",
    "rolling_14_admissions",
    "aqi",
    "temp",
    "humidity",
    "rainfall",
    "wind_speed",
    "mobility_index",
    "outbreak_index",
    "festival_flag",
    "holiday_flag",
    "weekday",
    "is_weekend",
    "population_density",
    "hospital_beds",
    "staff_count",
    "city_id",
    "hospital_id_enc",
    "month",
    "week_of_year",
    "quarter",
    "season",
    "day_sin",
    "day_cos",
    "month_sin",
    "month_cos",
    "aqi_above_150",
    "aqi_above_200",
    "aqi_above_300",
    "aqi_severity",
    "temp_humidity",
    "rainfall_injury_risk",
    "aqi_respiratory_ratio",
    "aqi_temp",
    "mobility_outbreak",
    "temp_rainfall",
    "aqi_mobility",
    "lag1_aqi",
    "lag7_outbreak",
    "rolling_aqi",
];

/// Fixed-width feature row. NaN marks a missing value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f32; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn from_slice(values: &[f32]) -> Result<Self, ScoringError> {
        let arr: [f32; FEATURE_COUNT] =
            values
                .try_into()
                .map_err(|_| ScoringError::WidthMismatch {
                    expected: FEATURE_COUNT,
                    found: values.len(),
                })?;
        Ok(Self(arr))
    }

    pub fn zeros() -> Self {
        Self([0.0; FEATURE_COUNT])
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn get(&self, slot: usize) -> Option<f32> {
        self.0.get(slot).copied()
    }

    pub fn width(&self) -> usize {
        FEATURE_COUNT
    }
}

/// One unit of processing: ordered rows with their identifying keys.
/// Percentile tiers are computed over a batch's own distribution.
#[derive(Debug, Clone, Default)]
pub struct FeatureBatch {
    keys: Vec<String>,
    rows: Vec<FeatureVector>,
}

impl FeatureBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, row: FeatureVector) {
        self.keys.push(key.into());
        self.rows.push(row);
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Consecutive sub-batches of at most `size` rows, order preserved.
    pub fn chunks(&self, size: usize) -> Vec<FeatureBatch> {
        let size = size.max(1);
        self.keys
            .chunks(size)
            .zip(self.rows.chunks(size))
            .map(|(keys, rows)| FeatureBatch {
                keys: keys.to_vec(),
                rows: rows.to_vec(),
            })
            .collect()
    }
}

impl FromIterator<(String, FeatureVector)> for FeatureBatch {
    fn from_iter<T: IntoIterator<Item = (String, FeatureVector)>>(iter: T) -> Self {
        let mut batch = FeatureBatch::new();
        for (key, row) in iter {
            batch.push(key, row);
        }
        batch
    }
}
