pub mod error;
pub mod pnl;
pub mod stats;
pub mod types;
pub mod window;

pub use error::*;
pub use pnl::{total_pnl, trade_pnl};
pub use stats::{reduce_period, whole_units, GoalContext, PeriodStats, StatsDisplay};
pub use types::*;
pub use window::{is_last_day_of_month, ReportWindow, WindowKind};
