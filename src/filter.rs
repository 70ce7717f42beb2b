use crate::types::{Booking, BookingStatus};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// What the user has narrowed the dataset down to. `None` on any axis means
/// "no restriction".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub vehicle_types: Option<BTreeSet<String>>,
    pub statuses: Option<BTreeSet<String>>,
}

impl FilterSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// An empty list leaves the axis unrestricted, like an untouched
    /// multiselect.
    pub fn with_vehicle_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vehicle_types = non_empty(types);
        self
    }

    /// Statuses are matched on their canonical label, so `completed` and
    /// `Completed` select the same rows.
    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses = non_empty(statuses).map(|set| {
            set.iter()
                .map(|s| BookingStatus::parse(s).label().to_string())
                .collect()
        });
        self
    }

    pub fn matches(&self, b: &Booking) -> bool {
        if self.from.is_some_and(|from| b.date < from) {
            return false;
        }
        if self.to.is_some_and(|to| b.date > to) {
            return false;
        }
        if let Some(types) = &self.vehicle_types {
            if !types.contains(&b.vehicle_type) {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(b.status.label()) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, data: &'a [Booking]) -> Vec<&'a Booking> {
        data.iter().filter(|b| self.matches(b)).collect()
    }

    pub fn describe(&self) -> String {
        let fmt_date = |d: Option<NaiveDate>| {
            d.map(|d| d.format("%b %d, %Y").to_string())
                .unwrap_or_else(|| "…".to_string())
        };
        let fmt_set = |s: &Option<BTreeSet<String>>| match s {
            Some(set) => set.iter().cloned().collect::<Vec<_>>().join(", "),
            None => "all".to_string(),
        };
        format!(
            "{} - {} | vehicles: {} | statuses: {}",
            fmt_date(self.from),
            fmt_date(self.to),
            fmt_set(&self.vehicle_types),
            fmt_set(&self.statuses)
        )
    }
}

fn non_empty<I, S>(items: I) -> Option<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let set: BTreeSet<String> = items
        .into_iter()
        .map(|s| s.into().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

/// The choices a dataset offers for each filter axis.
#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub vehicle_types: Vec<String>,
    pub statuses: Vec<String>,
}

impl FilterOptions {
    pub fn from_bookings(data: &[Booking]) -> Option<Self> {
        let min_date = data.iter().map(|b| b.date).min()?;
        let max_date = data.iter().map(|b| b.date).max()?;
        let vehicle_types: BTreeSet<&str> = data.iter().map(|b| b.vehicle_type.as_str()).collect();
        let statuses: BTreeSet<&str> = data.iter().map(|b| b.status.label()).collect();
        Some(FilterOptions {
            min_date,
            max_date,
            vehicle_types: vehicle_types.into_iter().map(str::to_string).collect(),
            statuses: statuses.into_iter().map(str::to_string).collect(),
        })
    }

    /// Selection covering the whole dataset, with explicit date bounds.
    pub fn default_selection(&self) -> FilterSelection {
        FilterSelection::all().with_date_range(Some(self.min_date), Some(self.max_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(day: u32, vehicle: &str, status: &str) -> Booking {
        Booking {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            time: None,
            booking_id: None,
            vehicle_type: vehicle.to_string(),
            status: BookingStatus::parse(status),
            fare: None,
            arrival_minutes: None,
            distance_km: None,
            customer_reason: None,
            driver_reason: None,
        }
    }

    #[test]
    fn date_range_is_inclusive() {
        let data = vec![
            booking(1, "Auto", "Completed"),
            booking(2, "Auto", "Completed"),
            booking(3, "Auto", "Completed"),
        ];
        let sel = FilterSelection::all().with_date_range(
            NaiveDate::from_ymd_opt(2024, 1, 2),
            NaiveDate::from_ymd_opt(2024, 1, 3),
        );
        assert_eq!(sel.apply(&data).len(), 2);
    }

    #[test]
    fn category_sets_restrict_rows() {
        let data = vec![
            booking(1, "Auto", "Completed"),
            booking(1, "Bike", "Completed"),
            booking(1, "Bike", "Cancelled by Driver"),
        ];
        let sel = FilterSelection::all()
            .with_vehicle_types(["Bike"])
            .with_statuses(["Completed"]);
        let rows = sel.apply(&data);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vehicle_type, "Bike");

        let empty_list: Vec<String> = Vec::new();
        let unrestricted = FilterSelection::all().with_vehicle_types(empty_list);
        assert_eq!(unrestricted.apply(&data).len(), 3);
    }

    #[test]
    fn status_filter_ignores_case() {
        let data = vec![
            booking(1, "Auto", "Completed"),
            booking(1, "Auto", "Cancelled by Driver"),
        ];
        let sel = FilterSelection::all().with_statuses(["completed", "CANCELLED BY DRIVER"]);
        assert_eq!(sel.apply(&data).len(), 2);
        let sel = FilterSelection::all().with_statuses(["completed"]);
        let rows = sel.apply(&data);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].status.is_completed());
    }

    #[test]
    fn options_are_sorted_and_distinct() {
        let data = vec![
            booking(5, "Prime", "Completed"),
            booking(2, "Auto", "Incomplete"),
            booking(9, "Auto", "Completed"),
        ];
        let opts = FilterOptions::from_bookings(&data).unwrap();
        assert_eq!(opts.min_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(opts.max_date, NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert_eq!(opts.vehicle_types, vec!["Auto", "Prime"]);
        assert_eq!(opts.statuses, vec!["Completed", "Incomplete"]);
        assert!(FilterOptions::from_bookings(&[]).is_none());
    }
}
