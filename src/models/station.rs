use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationMetadata {
    pub station_id: u32,

    pub from_date: NaiveDate,

    pub to_date: NaiveDate,

    pub height: i32,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate(length(min = 1))]
    pub name: String,

    pub state: String,
}

impl StationMetadata {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        station_id: u32,
        from_date: NaiveDate,
        to_date: NaiveDate,
        height: i32,
        latitude: f64,
        longitude: f64,
        name: String,
        state: String,
    ) -> Self {
        Self {
            station_id,
            from_date,
            to_date,
            height,
            latitude,
            longitude,
            name,
            state,
        }
    }

    /// Whether the station was reporting at any point of the given date range
    pub fn is_active_between(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.from_date <= end && self.to_date >= start
    }
}
