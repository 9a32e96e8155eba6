//! Metric families and percentile containers

use serde::{Deserialize, Serialize};

/// One of the three independently reported percentile families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFamily {
    /// Total Cash Compensation (currency)
    Tcc,
    /// Work Relative Value Units (productivity)
    Wrvu,
    /// Conversion Factor, TCC per wRVU (ratio)
    Cf,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 3] = [MetricFamily::Tcc, MetricFamily::Wrvu, MetricFamily::Cf];

    /// Flat-field prefix (`tcc_p50`, `wrvu_n_orgs`, ...)
    pub fn prefix(self) -> &'static str {
        match self {
            MetricFamily::Tcc => "tcc",
            MetricFamily::Wrvu => "wrvu",
            MetricFamily::Cf => "cf",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.prefix() == prefix)
    }
}

impl std::fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MetricFamily::Tcc => "TCC",
            MetricFamily::Wrvu => "wRVU",
            MetricFamily::Cf => "CF",
        };
        f.write_str(label)
    }
}

/// Reported percentile point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Percentile {
    P25,
    P50,
    P75,
    P90,
}

impl Percentile {
    pub const ALL: [Percentile; 4] = [Percentile::P25, Percentile::P50, Percentile::P75, Percentile::P90];

    /// Flat-field suffix (`p25` ... `p90`)
    pub fn suffix(self) -> &'static str {
        match self {
            Percentile::P25 => "p25",
            Percentile::P50 => "p50",
            Percentile::P75 => "p75",
            Percentile::P90 => "p90",
        }
    }

    /// Numeric rank as it appears in column names
    pub fn rank(self) -> &'static str {
        match self {
            Percentile::P25 => "25",
            Percentile::P50 => "50",
            Percentile::P75 => "75",
            Percentile::P90 => "90",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.suffix() == suffix)
    }
}

/// The four percentile values of one family
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Percentiles {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl Percentiles {
    pub fn get(&self, p: Percentile) -> f64 {
        match p {
            Percentile::P25 => self.p25,
            Percentile::P50 => self.p50,
            Percentile::P75 => self.p75,
            Percentile::P90 => self.p90,
        }
    }

    pub fn set(&mut self, p: Percentile, value: f64) {
        match p {
            Percentile::P25 => self.p25 = value,
            Percentile::P50 => self.p50 = value,
            Percentile::P75 => self.p75 = value,
            Percentile::P90 => self.p90 = value,
        }
    }

    /// A family carries data only when its median is positive
    pub fn has_data(&self) -> bool {
        self.p50 > 0.0
    }

    /// Whether the non-zero percentiles are non-decreasing
    pub fn is_ordered(&self) -> bool {
        let present: Vec<f64> = Percentile::ALL
            .iter()
            .map(|p| self.get(*p))
            .filter(|v| *v > 0.0)
            .collect();
        present.windows(2).all(|w| w[0] <= w[1])
    }
}

/// Percentiles plus the sample sizes they were reported with
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FamilyMetrics {
    pub n_orgs: f64,
    pub n_incumbents: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl FamilyMetrics {
    pub fn from_parts(n_orgs: f64, n_incumbents: f64, percentiles: &Percentiles) -> Self {
        Self {
            n_orgs,
            n_incumbents,
            p25: percentiles.p25,
            p50: percentiles.p50,
            p75: percentiles.p75,
            p90: percentiles.p90,
        }
    }

    pub fn percentiles(&self) -> Percentiles {
        Percentiles {
            p25: self.p25,
            p50: self.p50,
            p75: self.p75,
            p90: self.p90,
        }
    }

    pub fn set_percentiles(&mut self, percentiles: &Percentiles) {
        self.p25 = percentiles.p25;
        self.p50 = percentiles.p50;
        self.p75 = percentiles.p75;
        self.p90 = percentiles.p90;
    }

    pub fn has_data(&self) -> bool {
        self.p50 > 0.0
    }
}

/// Fixed map from [`MetricFamily`] to a per-family value
///
/// Every row and record carries all three families; absent families hold
/// `T::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Families<T> {
    pub tcc: T,
    pub wrvu: T,
    pub cf: T,
}

impl<T> Families<T> {
    pub fn get(&self, family: MetricFamily) -> &T {
        match family {
            MetricFamily::Tcc => &self.tcc,
            MetricFamily::Wrvu => &self.wrvu,
            MetricFamily::Cf => &self.cf,
        }
    }

    pub fn get_mut(&mut self, family: MetricFamily) -> &mut T {
        match family {
            MetricFamily::Tcc => &mut self.tcc,
            MetricFamily::Wrvu => &mut self.wrvu,
            MetricFamily::Cf => &mut self.cf,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricFamily, &T)> {
        MetricFamily::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}
