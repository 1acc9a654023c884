use serde::{Deserialize, Serialize};

/// Finite deviation values of one window, indexed `[ring][kind]` with kinds
/// in `MetricSet::deviations` order
pub type WindowRingValues = Vec<Vec<Vec<f64>>>;

/// Reduced statistics for one station over one reference period.
///
/// Rows are rings (ascending outer radius), columns are metrics in the
/// order they were requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationResult {
    pub station_id: u32,
    pub period: String,
    pub index: Vec<f64>,
    pub columns: Vec<MetricColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricColumn {
    pub name: String,
    pub values: Vec<f64>,
}

impl StationResult {
    pub fn new(station_id: u32, period: String, index: Vec<f64>) -> Self {
        Self {
            station_id,
            period,
            index,
            columns: Vec::new(),
        }
    }

    pub fn push_column(&mut self, name: &str, values: Vec<f64>) {
        self.columns.push(MetricColumn {
            name: name.to_string(),
            values,
        });
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "Station {:05} ({}) - {} rings\n{:>10}",
            self.station_id,
            self.period,
            self.row_count(),
            "index"
        );
        for column in &self.columns {
            out.push_str(&format!(" {:>12}", column.name));
        }
        for (row, radius) in self.index.iter().enumerate() {
            out.push_str(&format!("\n{:>10.2}", radius));
            for column in &self.columns {
                out.push_str(&format!(" {:>12.4}", column.values[row]));
            }
        }
        out
    }
}
