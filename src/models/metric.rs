//! Metric descriptors and the compiler that turns metric names into them.
//!
//! A metric name is either a bare family (`MAE`, `MAPE`, `MSE`, `RMSE`) or
//! `<outer>_<family>` with `outer` one of `mean`, `median`, `std`. Every
//! metric splits into an elementwise deviation applied once per time window
//! and a chain of reductions applied once per station and ring.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-cell deviation between an observed value `a` and a reference value `b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviationKind {
    /// `|a - b|`
    Absolute,
    /// `|a - b| / b * 100`
    AbsolutePercentage,
    /// `(a - b)^2`
    Squared,
}

impl DeviationKind {
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            DeviationKind::Absolute => (a - b).abs(),
            DeviationKind::AbsolutePercentage => (a - b).abs() / b * 100.0,
            DeviationKind::Squared => (a - b).powi(2),
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            DeviationKind::Absolute => "AE",
            DeviationKind::AbsolutePercentage => "APE",
            DeviationKind::Squared => "SE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricFamily {
    Mae,
    Mape,
    Mse,
    Rmse,
}

impl MetricFamily {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "MAE" => Some(MetricFamily::Mae),
            "MAPE" => Some(MetricFamily::Mape),
            "MSE" => Some(MetricFamily::Mse),
            "RMSE" => Some(MetricFamily::Rmse),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricFamily::Mae => "MAE",
            MetricFamily::Mape => "MAPE",
            MetricFamily::Mse => "MSE",
            MetricFamily::Rmse => "RMSE",
        }
    }

    pub fn deviation(self) -> DeviationKind {
        match self {
            MetricFamily::Mae => DeviationKind::Absolute,
            MetricFamily::Mape => DeviationKind::AbsolutePercentage,
            MetricFamily::Mse | MetricFamily::Rmse => DeviationKind::Squared,
        }
    }

    /// The family's own reduction chain, in application order
    pub fn reductions(self) -> Vec<Reduction> {
        match self {
            MetricFamily::Rmse => vec![Reduction::Mean, Reduction::Sqrt],
            _ => vec![Reduction::Mean],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OuterStatistic {
    Mean,
    Median,
    Std,
}

impl OuterStatistic {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "mean" => Some(OuterStatistic::Mean),
            "median" => Some(OuterStatistic::Median),
            "std" => Some(OuterStatistic::Std),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OuterStatistic::Mean => "mean",
            OuterStatistic::Median => "median",
            OuterStatistic::Std => "std",
        }
    }

    pub fn reduction(self) -> Reduction {
        match self {
            OuterStatistic::Mean => Reduction::Mean,
            OuterStatistic::Median => Reduction::Median,
            OuterStatistic::Std => Reduction::Std,
        }
    }
}

/// One step of a final reduction chain.
///
/// Statistics collapse an array to a single value; `Sqrt` maps a value.
/// Non-finite inputs are ignored and an empty input reduces to NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reduction {
    Mean,
    Median,
    /// Population standard deviation
    Std,
    Sqrt,
}

impl Reduction {
    pub fn apply(self, values: &[f64]) -> Vec<f64> {
        match self {
            Reduction::Mean => vec![nan_mean(values)],
            Reduction::Median => vec![nan_median(values)],
            Reduction::Std => vec![nan_std(values)],
            Reduction::Sqrt => values.iter().map(|v| v.sqrt()).collect(),
        }
    }
}

fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite())
}

pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = finite(values).fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

pub fn nan_median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = finite(values).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub fn nan_std(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    let (sum_sq, count) = finite(values).fold((0.0, 0usize), |(s, c), v| (s + (v - mean).powi(2), c + 1));
    (sum_sq / count as f64).sqrt()
}

/// Compiled metric: one elementwise deviation plus its final reduction chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetricSpec {
    pub name: String,
    pub family: MetricFamily,
    pub outer: Option<OuterStatistic>,
}

impl MetricSpec {
    pub fn new(family: MetricFamily, outer: Option<OuterStatistic>) -> Self {
        let name = match outer {
            Some(outer) => format!("{}_{}", outer.as_str(), family.as_str()),
            None => family.as_str().to_string(),
        };
        Self {
            name,
            family,
            outer,
        }
    }

    pub fn deviation(&self) -> DeviationKind {
        self.family.deviation()
    }

    /// An outer statistic replaces the family's own reductions
    pub fn reductions(&self) -> Vec<Reduction> {
        match self.outer {
            Some(outer) => vec![outer.reduction()],
            None => self.family.reductions(),
        }
    }

    /// Apply the final reduction chain to one accumulated array
    pub fn reduce(&self, values: &[f64]) -> f64 {
        let mut current = values.to_vec();
        for step in self.reductions() {
            current = step.apply(&current);
        }
        current.first().copied().unwrap_or(f64::NAN)
    }
}

impl FromStr for MetricSpec {
    type Err = AnalysisError;

    fn from_str(name: &str) -> Result<Self> {
        let (outer, family_token) = match name.split_once('_') {
            Some((outer_token, rest)) => {
                let outer = OuterStatistic::parse(outer_token).ok_or_else(|| {
                    AnalysisError::unsupported_metric(
                        name,
                        format!(
                            "unknown outer statistic '{}' (expected mean, median or std)",
                            outer_token
                        ),
                    )
                })?;
                (Some(outer), rest)
            }
            None => (None, name),
        };

        let family = MetricFamily::parse(family_token).ok_or_else(|| {
            AnalysisError::unsupported_metric(
                name,
                format!(
                    "unknown metric family '{}' (expected MAE, MAPE, MSE or RMSE)",
                    family_token
                ),
            )
        })?;

        Ok(Self::new(family, outer))
    }
}

impl TryFrom<String> for MetricSpec {
    type Error = AnalysisError;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

impl From<MetricSpec> for String {
    fn from(spec: MetricSpec) -> Self {
        spec.name
    }
}

impl fmt::Display for MetricSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Ordered, duplicate-free set of compiled metrics
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricSet {
    specs: Vec<MetricSpec>,
}

impl MetricSet {
    /// Compile metric names; fails as a whole if any single name is invalid
    pub fn compile<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut specs: Vec<MetricSpec> = Vec::with_capacity(names.len());
        for name in names {
            let spec: MetricSpec = name.as_ref().parse()?;
            if !specs.iter().any(|s| s.name == spec.name) {
                specs.push(spec);
            }
        }
        Ok(Self { specs })
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSpec> {
        self.specs.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    /// Distinct deviation kinds needed by the set, in a stable order
    pub fn deviations(&self) -> Vec<DeviationKind> {
        let mut kinds: Vec<DeviationKind> = self.specs.iter().map(|s| s.deviation()).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_families() {
        let rmse: MetricSpec = "RMSE".parse().unwrap();
        assert_eq!(rmse.deviation(), DeviationKind::Squared);
        assert_eq!(rmse.reductions(), vec![Reduction::Mean, Reduction::Sqrt]);

        let mape: MetricSpec = "MAPE".parse().unwrap();
        assert_eq!(mape.deviation(), DeviationKind::AbsolutePercentage);
        assert_eq!(mape.reductions(), vec![Reduction::Mean]);
        assert_eq!(mape.outer, None);
    }

    #[test]
    fn test_outer_statistic_replaces_family_chain() {
        let spec: MetricSpec = "median_RMSE".parse().unwrap();
        assert_eq!(spec.outer, Some(OuterStatistic::Median));
        assert_eq!(spec.deviation(), DeviationKind::Squared);
        assert_eq!(spec.reductions(), vec![Reduction::Median]);

        let spec: MetricSpec = "std_MAE".parse().unwrap();
        assert_eq!(spec.deviation(), DeviationKind::Absolute);
        assert_eq!(spec.reductions(), vec![Reduction::Std]);
    }

    #[test]
    fn test_unsupported_names() {
        for name in ["", "RMAE", "mae", "mode_MAE", "mean_", "mean_MAE_x", "_MAE", "MEAN_MAE"] {
            let err = name.parse::<MetricSpec>().unwrap_err();
            assert!(
                matches!(err, AnalysisError::UnsupportedMetric { .. }),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_compile_fails_as_a_whole() {
        assert!(MetricSet::compile(&["MAE", "RMSE", "bogus"]).is_err());

        let set = MetricSet::compile(&["MAE", "RMSE", "MAE", "mean_MAPE"]).unwrap();
        assert_eq!(set.names(), vec!["MAE", "RMSE", "mean_MAPE"]);
        assert_eq!(
            set.deviations(),
            vec![
                DeviationKind::Absolute,
                DeviationKind::AbsolutePercentage,
                DeviationKind::Squared
            ]
        );
    }

    #[test]
    fn test_compile_is_deterministic() {
        let names = ["MAE", "MAPE", "MSE", "RMSE", "mean_MSE", "median_MAPE", "std_RMSE"];
        assert_eq!(MetricSet::compile(&names).unwrap(), MetricSet::compile(&names).unwrap());
    }

    #[test]
    fn test_deviation_ops() {
        assert_eq!(DeviationKind::Absolute.apply(3.0, 5.0), 2.0);
        assert_eq!(DeviationKind::Squared.apply(3.0, 5.0), 4.0);
        assert_eq!(DeviationKind::AbsolutePercentage.apply(3.0, 4.0), 25.0);
        assert!(!DeviationKind::AbsolutePercentage.apply(3.0, 0.0).is_finite());
    }

    #[test]
    fn test_absolute_and_squared_never_negative() {
        let samples = [-1e6, -273.15, -3.5, -1.0, -1e-9, 0.0, 1e-9, 0.25, 7.0, 1e6];
        for a in samples {
            for b in samples {
                assert!(DeviationKind::Absolute.apply(a, b) >= 0.0, "|{} - {}|", a, b);
                assert!(DeviationKind::Squared.apply(a, b) >= 0.0, "({} - {})^2", a, b);
            }
        }
    }

    #[test]
    fn test_reduce() {
        let rmse: MetricSpec = "RMSE".parse().unwrap();
        assert_eq!(rmse.reduce(&[4.0, 4.0, f64::NAN]), 2.0);

        let median: MetricSpec = "median_MAE".parse().unwrap();
        assert_eq!(median.reduce(&[1.0, 9.0, 3.0, 4.0]), 3.5);

        let std: MetricSpec = "std_MAE".parse().unwrap();
        assert_eq!(std.reduce(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);

        let mae: MetricSpec = "MAE".parse().unwrap();
        assert!(mae.reduce(&[]).is_nan());
    }

    #[test]
    fn test_serde_validates_names() {
        let specs: Vec<MetricSpec> = serde_json::from_str(r#"["MAE", "std_MSE"]"#).unwrap();
        assert_eq!(specs[1].outer, Some(OuterStatistic::Std));
        assert!(serde_json::from_str::<Vec<MetricSpec>>(r#"["XAE"]"#).is_err());
    }
}
