use crate::reports::Dashboard;
use crate::types::{DemandHeatmap, HeatmapCell, KpiSummary};
use crate::util::{format_int, format_money, format_number};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing::info;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("### {}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn kpi_table(kpis: &KpiSummary) -> String {
    let mut b = Builder::default();
    b.push_record(["KPI", "Value"]);
    b.push_record(["Total Revenue".to_string(), format_money(kpis.total_revenue)]);
    b.push_record(["Total Bookings".to_string(), format_int(kpis.total_bookings)]);
    b.push_record([
        "Completion Rate".to_string(),
        format!("{:.1}%", kpis.completion_rate),
    ]);
    b.push_record([
        "Avg Order Value".to_string(),
        kpis.avg_order_value
            .map_or_else(|| "n/a".to_string(), format_money),
    ]);
    b.push_record([
        "Avg Arrival Time".to_string(),
        kpis.avg_arrival_minutes
            .map_or_else(|| "n/a".to_string(), |m| format!("{} min", format_number(m, 1))),
    ]);
    b.push_record(["Cancelled".to_string(), format_int(kpis.cancelled_bookings)]);
    b.build().with(Style::markdown()).to_string()
}

/// Weekday rows by hour columns, the terminal stand-in for the heatmap chart.
pub fn heatmap_table(heat: &DemandHeatmap) -> String {
    let mut b = Builder::default();
    let mut header = vec!["Day".to_string()];
    header.extend((0..24).map(|h| format!("{:02}", h)));
    b.push_record(header);
    for (day, row) in heat.days.iter().zip(heat.counts.iter()) {
        let mut rec = vec![day[..3].to_string()];
        rec.extend(row.iter().map(|c| c.to_string()));
        b.push_record(rec);
    }
    b.build().with(Style::markdown()).to_string()
}

pub fn print_dashboard(dash: &Dashboard, preview_rows: usize) {
    println!("## Operations & Performance Overview\n");
    println!(
        "Data Snapshot: {} | Total Records: {}\n",
        dash.selection,
        format_int(dash.kpis.total_bookings)
    );
    println!("{}\n", kpi_table(&dash.kpis));

    let recent = dash.daily_trend.len().saturating_sub(preview_rows);
    preview_table(
        "Revenue & Booking Trends (Smoothed)",
        Some("most recent days"),
        &dash.daily_trend[recent..],
        preview_rows,
    );
    preview_table("Revenue Mix by Vehicle", None, &dash.vehicle_mix, usize::MAX);

    println!("### Temporal Demand Patterns\n");
    println!("{}", heatmap_table(&dash.demand_heatmap));
    if dash.demand_heatmap.unplaced > 0 {
        println!(
            "({} bookings without a time of day)",
            format_int(dash.demand_heatmap.unplaced)
        );
    }
    println!();
    preview_table("Hourly Demand Profile", None, &dash.hourly_profile, 24);
    preview_table(
        "Cancellation Reasons (Pareto Analysis)",
        Some("top friction points"),
        &dash.cancellation_pareto,
        preview_rows,
    );
    preview_table(
        "Trip Distance Distribution",
        Some("completed rides, km"),
        &dash.distance_histogram,
        usize::MAX,
    );
}

/// Write every dashboard table as CSV plus the whole bundle as JSON.
pub fn export_dashboard(dir: &Path, dash: &Dashboard) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let mut written = Vec::new();

    written.push(export_csv(dir, "daily_trend.csv", &dash.daily_trend)?);
    written.push(export_csv(dir, "vehicle_mix.csv", &dash.vehicle_mix)?);
    written.push(export_csv(
        dir,
        "demand_heatmap.csv",
        &heatmap_cells(&dash.demand_heatmap),
    )?);
    written.push(export_csv(dir, "hourly_profile.csv", &dash.hourly_profile)?);
    written.push(export_csv(
        dir,
        "cancellation_pareto.csv",
        &dash.cancellation_pareto,
    )?);
    written.push(export_csv(
        dir,
        "distance_histogram.csv",
        &dash.distance_histogram,
    )?);

    let json_path = dir.join("dashboard.json");
    write_json(&json_path, dash)?;
    written.push(json_path);

    info!(dir = %dir.display(), files = written.len(), "dashboard exported");
    Ok(written)
}

fn export_csv<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<PathBuf> {
    let path = dir.join(name);
    write_csv(&path, rows)?;
    Ok(path)
}

fn heatmap_cells(heat: &DemandHeatmap) -> Vec<HeatmapCell<'_>> {
    heat.days
        .iter()
        .zip(heat.counts.iter())
        .flat_map(|(day, row)| {
            row.iter().enumerate().map(move |(hour, c)| HeatmapCell {
                day: *day,
                hour: hour as u32,
                bookings: *c,
            })
        })
        .collect()
}
