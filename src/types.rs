use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

use crate::util::{format_money, format_number, format_opt};

/// One CSV row exactly as it appears in the bookings export.
///
/// Everything is kept as an optional string; the loader decides what is
/// fatal, what is dropped and what simply becomes `None`.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Time")]
    pub time: Option<String>,
    #[serde(rename = "Booking ID", default)]
    pub booking_id: Option<String>,
    #[serde(rename = "Booking Status")]
    pub booking_status: Option<String>,
    #[serde(rename = "Vehicle Type")]
    pub vehicle_type: Option<String>,
    #[serde(rename = "Booking Value")]
    pub booking_value: Option<String>,
    #[serde(rename = "Avg VTAT")]
    pub avg_vtat: Option<String>,
    #[serde(rename = "Ride Distance")]
    pub ride_distance: Option<String>,
    #[serde(rename = "Reason for cancelling by Customer")]
    pub customer_reason: Option<String>,
    #[serde(rename = "Driver Cancellation Reason")]
    pub driver_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BookingStatus {
    Completed,
    CancelledByDriver,
    CancelledByCustomer,
    NoDriverFound,
    Incomplete,
    Other(String),
}

impl BookingStatus {
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "completed" => BookingStatus::Completed,
            "cancelled by driver" => BookingStatus::CancelledByDriver,
            "cancelled by customer" => BookingStatus::CancelledByCustomer,
            "no driver found" => BookingStatus::NoDriverFound,
            "incomplete" => BookingStatus::Incomplete,
            _ => BookingStatus::Other(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            BookingStatus::Completed => "Completed",
            BookingStatus::CancelledByDriver => "Cancelled by Driver",
            BookingStatus::CancelledByCustomer => "Cancelled by Customer",
            BookingStatus::NoDriverFound => "No Driver Found",
            BookingStatus::Incomplete => "Incomplete",
            BookingStatus::Other(s) => s,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, BookingStatus::Completed)
    }

    /// Any status whose label mentions a cancellation, including
    /// unrecognised ones such as "Cancelled (Other)".
    pub fn is_cancelled(&self) -> bool {
        self.label().to_ascii_lowercase().contains("cancel")
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct Booking {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub booking_id: Option<String>,
    pub vehicle_type: String,
    pub status: BookingStatus,
    pub fare: Option<f64>,
    pub arrival_minutes: Option<f64>,
    pub distance_km: Option<f64>,
    pub customer_reason: Option<String>,
    pub driver_reason: Option<String>,
}

impl Booking {
    /// Fare counted towards revenue: only completed rides earn.
    pub fn revenue(&self) -> Option<f64> {
        if self.status.is_completed() {
            self.fare
        } else {
            None
        }
    }

    pub fn cancellation_reason(&self) -> String {
        self.customer_reason
            .as_deref()
            .or(self.driver_reason.as_deref())
            .unwrap_or_else(|| self.status.label())
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KpiSummary {
    pub total_revenue: f64,
    pub total_bookings: usize,
    pub completed_bookings: usize,
    pub cancelled_bookings: usize,
    pub completion_rate: f64,
    pub avg_order_value: Option<f64>,
    pub avg_arrival_minutes: Option<f64>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DailyTrendRow {
    #[serde(rename = "Date")]
    #[tabled(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue", display_with = "money")]
    pub revenue: f64,
    #[serde(rename = "Bookings")]
    #[tabled(rename = "Bookings")]
    pub bookings: usize,
    #[serde(rename = "Revenue7dAvg")]
    #[tabled(rename = "Revenue (7d Avg)", display_with = "money")]
    pub revenue_avg: f64,
    #[serde(rename = "Bookings7dAvg")]
    #[tabled(rename = "Bookings (7d Avg)", display_with = "format_two")]
    pub bookings_avg: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct VehicleRevenueRow {
    #[serde(rename = "VehicleType")]
    #[tabled(rename = "Vehicle Type")]
    pub vehicle_type: String,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue", display_with = "money")]
    pub revenue: f64,
    #[serde(rename = "Rides")]
    #[tabled(rename = "Rides")]
    pub rides: usize,
    #[serde(rename = "AvgFare")]
    #[tabled(rename = "Avg Fare", display_with = "format_opt_two")]
    pub avg_fare: Option<f64>,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct HourlyDemandRow {
    #[serde(rename = "Hour")]
    #[tabled(rename = "Hour")]
    pub hour: u32,
    #[serde(rename = "Bookings")]
    #[tabled(rename = "Bookings")]
    pub bookings: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ParetoRow {
    #[serde(rename = "Reason")]
    #[tabled(rename = "Reason")]
    pub reason: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "Share %", display_with = "format_two")]
    pub share_pct: f64,
    #[serde(rename = "CumulativePct")]
    #[tabled(rename = "Cumulative %", display_with = "format_two")]
    pub cumulative_pct: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DistanceBin {
    #[serde(rename = "LowerKm")]
    #[tabled(rename = "From (km)", display_with = "format_two")]
    pub lower_km: f64,
    #[serde(rename = "UpperKm")]
    #[tabled(rename = "To (km)", display_with = "format_two")]
    pub upper_km: f64,
    #[serde(rename = "Rides")]
    #[tabled(rename = "Rides")]
    pub rides: usize,
}

/// Bookings per (weekday, hour). `counts[0]` is Monday, `counts[d][h]` is
/// hour `h` of that day.
#[derive(Debug, Clone, Serialize)]
pub struct DemandHeatmap {
    pub days: [&'static str; 7],
    pub counts: [[usize; 24]; 7],
    pub unplaced: usize,
}

/// Flat CSV form of a heatmap cell.
#[derive(Debug, Serialize)]
pub struct HeatmapCell<'a> {
    #[serde(rename = "DayOfWeek")]
    pub day: &'a str,
    #[serde(rename = "Hour")]
    pub hour: u32,
    #[serde(rename = "Bookings")]
    pub bookings: usize,
}

fn format_two(v: &f64) -> String {
    format_number(*v, 2)
}

fn format_opt_two(v: &Option<f64>) -> String {
    format_opt(*v, 2)
}

fn money(v: &f64) -> String {
    format_money(*v)
}
