use crate::error::LoadError;
use crate::types::{Booking, BookingStatus, RawRow};
use crate::util::{clean_text, parse_date_safe, parse_f64_safe, parse_time_safe};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Columns the bookings file must carry. `Booking ID` is read when present.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "Date",
    "Time",
    "Booking Status",
    "Vehicle Type",
    "Booking Value",
    "Avg VTAT",
    "Ride Distance",
    "Reason for cancelling by Customer",
    "Driver Cancellation Reason",
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub dropped_rows: usize,
    pub missing_time: usize,
    pub missing_fare: usize,
    pub missing_arrival: usize,
    pub missing_distance: usize,
}

pub fn load_bookings(path: impl AsRef<Path>) -> Result<(Vec<Booking>, LoadReport), LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(file);
    let headers = rdr.headers()?.clone();
    check_schema(&headers)?;

    let mut report = LoadReport::default();
    let mut bookings: Vec<Booking> = Vec::new();

    for result in rdr.records() {
        report.total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "skipping undecodable row");
                report.dropped_rows += 1;
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: RawRow = match record.deserialize(Some(&headers)) {
            Ok(r) => r,
            Err(e) => {
                debug!(line, error = %e, "skipping row that does not match the header");
                report.dropped_rows += 1;
                continue;
            }
        };

        let date = match parse_date_safe(row.date.as_deref()) {
            Some(d) => d,
            None => {
                return Err(LoadError::InvalidDate {
                    line,
                    value: row.date.unwrap_or_default(),
                })
            }
        };

        // Without a category or status the row cannot be placed in any
        // filter, so it is dropped rather than guessed.
        let (vehicle_type, status) = match (
            clean_text(row.vehicle_type.as_deref()),
            clean_text(row.booking_status.as_deref()),
        ) {
            (Some(v), Some(s)) => (v, BookingStatus::parse(&s)),
            _ => {
                report.dropped_rows += 1;
                continue;
            }
        };

        let time = parse_time_safe(row.time.as_deref());
        let fare = parse_f64_safe(row.booking_value.as_deref());
        let arrival_minutes = parse_f64_safe(row.avg_vtat.as_deref());
        let distance_km = parse_f64_safe(row.ride_distance.as_deref());
        report.missing_time += usize::from(time.is_none());
        report.missing_fare += usize::from(fare.is_none());
        report.missing_arrival += usize::from(arrival_minutes.is_none());
        report.missing_distance += usize::from(distance_km.is_none());

        bookings.push(Booking {
            date,
            time,
            booking_id: clean_text(row.booking_id.as_deref()),
            vehicle_type,
            status,
            fare,
            arrival_minutes,
            distance_km,
            customer_reason: clean_text(row.customer_reason.as_deref()),
            driver_reason: clean_text(row.driver_reason.as_deref()),
        });
    }

    report.loaded_rows = bookings.len();
    if report.dropped_rows > 0 {
        warn!(dropped = report.dropped_rows, "rows dropped while loading");
    }
    info!(
        path = %path.display(),
        total = report.total_rows,
        loaded = report.loaded_rows,
        "bookings loaded"
    );
    Ok((bookings, report))
}

fn check_schema(headers: &StringRecord) -> Result<(), LoadError> {
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(LoadError::MissingColumn { column });
        }
    }
    Ok(())
}
