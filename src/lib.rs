//! Descriptive analytics over a ride-booking export: KPIs, daily trends,
//! vehicle revenue mix, weekday/hour demand, cancellation Pareto and trip
//! distance distribution for a chosen filter selection.

pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use error::LoadError;
pub use filter::{FilterOptions, FilterSelection};
pub use loader::{load_bookings, LoadReport};
pub use reports::{build_dashboard, Dashboard, DashboardSettings};
pub use types::{Booking, BookingStatus};
