use serde::Serialize;

/// `lower <= median <= upper` holds only after consistency enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantileTriple {
    pub lower: f64,
    pub median: f64,
    pub upper: f64,
}

impl QuantileTriple {
    pub fn new(lower: f64, median: f64, upper: f64) -> Self {
        Self {
            lower,
            median,
            upper,
        }
    }

    pub fn center(&self) -> f64 {
        (self.upper + self.lower) / 2.0
    }

    pub fn half_width(&self) -> f64 {
        (self.upper - self.lower) / 2.0
    }

    pub fn is_ordered(&self) -> bool {
        self.lower <= self.median && self.median <= self.upper
    }

    /// Same shift applied to all three bounds.
    pub fn shifted(&self, delta: f64) -> Self {
        Self::new(self.lower + delta, self.median + delta, self.upper + delta)
    }

    /// Band scaled by `factor` around its own center; median untouched.
    pub fn widened(&self, factor: f64) -> Self {
        let center = self.center();
        let half = self.half_width();
        Self::new(center - factor * half, self.median, center + factor * half)
    }
}
