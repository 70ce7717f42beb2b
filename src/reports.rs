use crate::filter::FilterSelection;
use crate::types::{
    Booking, DailyTrendRow, DemandHeatmap, DistanceBin, HourlyDemandRow, KpiSummary, ParetoRow,
    VehicleRevenueRow,
};
use crate::util::{mean_opt, percent, trailing_mean};
use chrono::{Datelike, NaiveDate, Timelike};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, Copy)]
pub struct DashboardSettings {
    pub rolling_window: usize,
    pub distance_bins: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            rolling_window: 7,
            distance_bins: 50,
        }
    }
}

/// Everything the dashboard shows for one filter selection.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub selection: String,
    pub kpis: KpiSummary,
    pub daily_trend: Vec<DailyTrendRow>,
    pub vehicle_mix: Vec<VehicleRevenueRow>,
    pub demand_heatmap: DemandHeatmap,
    pub hourly_profile: Vec<HourlyDemandRow>,
    pub cancellation_pareto: Vec<ParetoRow>,
    pub distance_histogram: Vec<DistanceBin>,
}

pub fn build_dashboard(
    data: &[Booking],
    selection: &FilterSelection,
    settings: DashboardSettings,
) -> Dashboard {
    let rows = selection.apply(data);
    debug!(
        total = data.len(),
        matched = rows.len(),
        "filter applied"
    );
    Dashboard {
        selection: selection.describe(),
        kpis: kpi_summary(&rows),
        daily_trend: daily_trend(&rows, settings.rolling_window),
        vehicle_mix: vehicle_mix(&rows),
        demand_heatmap: demand_heatmap(&rows),
        hourly_profile: hourly_profile(&rows),
        cancellation_pareto: cancellation_pareto(&rows),
        distance_histogram: distance_histogram(&rows, settings.distance_bins),
    }
}

pub fn kpi_summary(rows: &[&Booking]) -> KpiSummary {
    let total_bookings = rows.len();
    let completed_bookings = rows.iter().filter(|b| b.status.is_completed()).count();
    let cancelled_bookings = rows.iter().filter(|b| b.status.is_cancelled()).count();
    let fares: Vec<f64> = rows.iter().filter_map(|b| b.revenue()).collect();
    let arrivals: Vec<f64> = rows.iter().filter_map(|b| b.arrival_minutes).collect();
    KpiSummary {
        total_revenue: fares.iter().sum(),
        total_bookings,
        completed_bookings,
        cancelled_bookings,
        completion_rate: percent(completed_bookings, total_bookings),
        avg_order_value: mean_opt(&fares),
        avg_arrival_minutes: mean_opt(&arrivals),
    }
}

/// Per-day revenue and bookings with a trailing average over `window` days
/// that have data. The first `window - 1` points average what is available.
pub fn daily_trend(rows: &[&Booking], window: usize) -> Vec<DailyTrendRow> {
    let mut by_day: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for b in rows {
        let e = by_day.entry(b.date).or_insert((0.0, 0));
        e.0 += b.revenue().unwrap_or(0.0);
        e.1 += 1;
    }
    let revenue: Vec<f64> = by_day.values().map(|(r, _)| *r).collect();
    let bookings: Vec<f64> = by_day.values().map(|(_, c)| *c as f64).collect();
    let revenue_avg = trailing_mean(&revenue, window);
    let bookings_avg = trailing_mean(&bookings, window);

    by_day
        .into_iter()
        .zip(revenue_avg.into_iter().zip(bookings_avg))
        .map(|((date, (revenue, bookings)), (revenue_avg, bookings_avg))| DailyTrendRow {
            date,
            revenue,
            bookings,
            revenue_avg,
            bookings_avg,
        })
        .collect()
}

pub fn vehicle_mix(rows: &[&Booking]) -> Vec<VehicleRevenueRow> {
    #[derive(Default)]
    struct Acc {
        fares: Vec<f64>,
        rides: usize,
    }
    let mut map: HashMap<&str, Acc> = HashMap::new();
    for b in rows {
        let e = map.entry(b.vehicle_type.as_str()).or_default();
        e.rides += 1;
        if let Some(fare) = b.revenue() {
            e.fares.push(fare);
        }
    }
    let mut out: Vec<VehicleRevenueRow> = map
        .into_iter()
        .map(|(vehicle, acc)| VehicleRevenueRow {
            vehicle_type: vehicle.to_string(),
            revenue: acc.fares.iter().sum(),
            rides: acc.rides,
            avg_fare: mean_opt(&acc.fares),
        })
        .collect();
    out.sort_by(|a, b| {
        b.revenue
            .partial_cmp(&a.revenue)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.vehicle_type.cmp(&b.vehicle_type))
    });
    out
}

pub fn demand_heatmap(rows: &[&Booking]) -> DemandHeatmap {
    let mut counts = [[0usize; 24]; 7];
    let mut unplaced = 0usize;
    for b in rows {
        match b.time {
            Some(t) => {
                let day = b.date.weekday().num_days_from_monday() as usize;
                counts[day][t.hour() as usize] += 1;
            }
            None => unplaced += 1,
        }
    }
    DemandHeatmap {
        days: WEEKDAYS,
        counts,
        unplaced,
    }
}

pub fn hourly_profile(rows: &[&Booking]) -> Vec<HourlyDemandRow> {
    let mut counts = [0usize; 24];
    for t in rows.iter().filter_map(|b| b.time) {
        counts[t.hour() as usize] += 1;
    }
    counts
        .iter()
        .enumerate()
        .map(|(hour, bookings)| HourlyDemandRow {
            hour: hour as u32,
            bookings: *bookings,
        })
        .collect()
}

pub fn cancellation_pareto(rows: &[&Booking]) -> Vec<ParetoRow> {
    let mut map: HashMap<String, usize> = HashMap::new();
    for b in rows.iter().filter(|b| b.status.is_cancelled()) {
        *map.entry(b.cancellation_reason()).or_default() += 1;
    }
    let total: usize = map.values().sum();
    let mut ranked: Vec<(String, usize)> = map.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut running = 0usize;
    ranked
        .into_iter()
        .map(|(reason, count)| {
            running += count;
            ParetoRow {
                reason,
                count,
                share_pct: percent(count, total),
                // Integer running count keeps the final row at exactly 100.
                cumulative_pct: percent(running, total),
            }
        })
        .collect()
}

/// Upper bound on histogram bins; larger requests are clamped.
pub const MAX_DISTANCE_BINS: usize = 1000;

/// Equal-width histogram of completed-ride distances.
pub fn distance_histogram(rows: &[&Booking], bins: usize) -> Vec<DistanceBin> {
    let distances: Vec<f64> = rows
        .iter()
        .filter(|b| b.status.is_completed())
        .filter_map(|b| b.distance_km)
        .collect();
    let Some(min) = distances.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max = distances.iter().copied().fold(min, f64::max);
    let span = max - min;
    if span <= 0.0 {
        return vec![DistanceBin {
            lower_km: min,
            upper_km: max,
            rides: distances.len(),
        }];
    }

    let bins = bins.clamp(1, MAX_DISTANCE_BINS);
    let width = span / bins as f64;
    let mut counts = vec![0usize; bins];
    for d in &distances {
        let idx = (((d - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, rides)| DistanceBin {
            lower_km: min + width * i as f64,
            upper_km: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            rides,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookingStatus;
    use chrono::NaiveTime;

    fn ride(date: (i32, u32, u32), hour: Option<u32>, status: &str, fare: Option<f64>) -> Booking {
        Booking {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time: hour.map(|h| NaiveTime::from_hms_opt(h, 15, 0).unwrap()),
            booking_id: None,
            vehicle_type: "Auto".to_string(),
            status: BookingStatus::parse(status),
            fare,
            arrival_minutes: None,
            distance_km: None,
            customer_reason: None,
            driver_reason: None,
        }
    }

    #[test]
    fn three_row_scenario() {
        let data = vec![
            ride((2024, 3, 1), Some(9), "Completed", Some(100.0)),
            ride((2024, 3, 1), Some(10), "Completed", Some(200.0)),
            ride((2024, 3, 2), Some(18), "Cancelled by Customer", None),
        ];
        let rows: Vec<&Booking> = data.iter().collect();

        let kpis = kpi_summary(&rows);
        assert_eq!(kpis.total_revenue, 300.0);
        assert_eq!(kpis.total_bookings, 3);
        assert!((kpis.completion_rate - 66.666).abs() < 0.01);
        assert_eq!(format!("{:.1}", kpis.completion_rate), "66.7");

        let pareto = cancellation_pareto(&rows);
        assert_eq!(pareto.len(), 1);
        assert_eq!(pareto[0].reason, "Cancelled by Customer");
        assert_eq!(pareto[0].count, 1);
        assert_eq!(pareto[0].cumulative_pct, 100.0);
    }

    #[test]
    fn empty_selection_yields_zero_state() {
        let rows: Vec<&Booking> = Vec::new();
        let kpis = kpi_summary(&rows);
        assert_eq!(kpis.total_revenue, 0.0);
        assert_eq!(kpis.completion_rate, 0.0);
        assert!(kpis.avg_order_value.is_none());
        assert!(kpis.avg_arrival_minutes.is_none());
        assert!(daily_trend(&rows, 7).is_empty());
        assert!(cancellation_pareto(&rows).is_empty());
        assert!(distance_histogram(&rows, 10).is_empty());
        assert_eq!(hourly_profile(&rows).len(), 24);
        let heat = demand_heatmap(&rows);
        assert_eq!(heat.counts.iter().flatten().sum::<usize>(), 0);
    }

    #[test]
    fn heatmap_places_rows_by_weekday_and_hour() {
        // 2024-03-04 is a Monday.
        let data = vec![
            ride((2024, 3, 4), Some(8), "Completed", Some(50.0)),
            ride((2024, 3, 10), Some(23), "Completed", Some(50.0)),
            ride((2024, 3, 10), None, "Incomplete", None),
        ];
        let rows: Vec<&Booking> = data.iter().collect();
        let heat = demand_heatmap(&rows);
        assert_eq!(heat.counts[0][8], 1);
        assert_eq!(heat.counts[6][23], 1);
        assert_eq!(heat.unplaced, 1);
        let placed: usize = heat.counts.iter().flatten().sum();
        assert_eq!(placed + heat.unplaced, rows.len());
    }

    #[test]
    fn daily_trend_averages_trailing_days() {
        let data: Vec<Booking> = (1..=9)
            .map(|d| ride((2024, 3, d), Some(12), "Completed", Some(d as f64 * 10.0)))
            .collect();
        let rows: Vec<&Booking> = data.iter().collect();
        let trend = daily_trend(&rows, 7);
        assert_eq!(trend.len(), 9);
        assert_eq!(trend[0].revenue_avg, 10.0);
        assert_eq!(trend[1].revenue_avg, 15.0);
        // Days 2..=8 -> fares 20..=80.
        assert!((trend[7].revenue_avg - 50.0).abs() < 1e-9);
        assert!((trend[8].revenue_avg - 60.0).abs() < 1e-9);
        assert!(trend.iter().all(|r| r.bookings_avg == 1.0));
    }

    #[test]
    fn pareto_prefers_customer_reason_then_driver() {
        let mut a = ride((2024, 3, 1), None, "Cancelled by Customer", None);
        a.customer_reason = Some("Driver is not moving".into());
        let mut b = ride((2024, 3, 1), None, "Cancelled by Driver", None);
        b.driver_reason = Some("Personal & Car related issues".into());
        let mut c = ride((2024, 3, 1), None, "Cancelled by Driver", None);
        c.driver_reason = Some("Personal & Car related issues".into());
        let d = ride((2024, 3, 1), None, "No Driver Found", None);
        let data = vec![a, b, c, d];
        let rows: Vec<&Booking> = data.iter().collect();
        let pareto = cancellation_pareto(&rows);
        assert_eq!(pareto.len(), 2);
        assert_eq!(pareto[0].reason, "Personal & Car related issues");
        assert_eq!(pareto[0].count, 2);
        assert!((pareto[0].cumulative_pct - 66.666).abs() < 0.01);
        assert_eq!(pareto[1].cumulative_pct, 100.0);
    }

    #[test]
    fn histogram_covers_every_completed_distance() {
        let mut data = Vec::new();
        for (i, km) in [1.0, 2.5, 4.0, 10.0, 10.0].iter().enumerate() {
            let mut r = ride((2024, 3, 1 + i as u32), None, "Completed", Some(10.0));
            r.distance_km = Some(*km);
            data.push(r);
        }
        let mut cancelled = ride((2024, 3, 1), None, "Cancelled by Driver", None);
        cancelled.distance_km = Some(40.0);
        data.push(cancelled);
        let rows: Vec<&Booking> = data.iter().collect();

        let hist = distance_histogram(&rows, 3);
        assert_eq!(hist.len(), 3);
        assert_eq!(hist[0].lower_km, 1.0);
        assert_eq!(hist[2].upper_km, 10.0);
        assert_eq!(hist.iter().map(|b| b.rides).sum::<usize>(), 5);
        assert_eq!(hist[2].rides, 2);

        let same: Vec<&Booking> = rows[3..5].to_vec();
        let single = distance_histogram(&same, 50);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].rides, 2);
    }

    #[test]
    fn vehicle_mix_sums_to_total_revenue() {
        let mut data = vec![
            ride((2024, 3, 1), None, "Completed", Some(120.0)),
            ride((2024, 3, 1), None, "Completed", Some(80.0)),
            ride((2024, 3, 1), None, "Completed", Some(500.0)),
            ride((2024, 3, 1), None, "Cancelled by Driver", Some(999.0)),
        ];
        data[2].vehicle_type = "Prime".into();
        data[3].vehicle_type = "Bike".into();
        let rows: Vec<&Booking> = data.iter().collect();
        let mix = vehicle_mix(&rows);
        assert_eq!(mix[0].vehicle_type, "Prime");
        assert_eq!(mix[1].vehicle_type, "Auto");
        assert_eq!(mix[1].avg_fare, Some(100.0));
        assert_eq!(mix[2].vehicle_type, "Bike");
        assert_eq!(mix[2].revenue, 0.0);
        assert_eq!(mix[2].avg_fare, None);
        let sum: f64 = mix.iter().map(|r| r.revenue).sum();
        assert_eq!(sum, kpi_summary(&rows).total_revenue);
    }

    #[test]
    fn oversized_bin_count_is_clamped() {
        let mut data = vec![
            ride((2024, 3, 1), None, "Completed", None),
            ride((2024, 3, 1), None, "Completed", None),
        ];
        data[0].distance_km = Some(1.0);
        data[1].distance_km = Some(9.0);
        let rows: Vec<&Booking> = data.iter().collect();
        let hist = distance_histogram(&rows, usize::MAX);
        assert_eq!(hist.len(), MAX_DISTANCE_BINS);
        assert_eq!(hist.iter().map(|b| b.rides).sum::<usize>(), 2);
        assert_eq!(hist.last().unwrap().upper_km, 9.0);
    }
}
