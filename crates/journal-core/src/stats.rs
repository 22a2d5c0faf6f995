use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::error::EngineError;
use crate::pnl::{checked_sum, trade_pnl};
use crate::types::{Setup, Trade};

/// Year-to-date figures needed for the monthly goal line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalContext {
    pub year_to_date_pnl: Decimal,
    pub yearly_target: Decimal,
}

impl GoalContext {
    pub fn new(year_to_date_pnl: Decimal, yearly_target: Decimal) -> Self {
        Self {
            year_to_date_pnl,
            yearly_target,
        }
    }

    /// `ytd / target * 100`, or `None` when no usable target is configured.
    pub fn progress(&self) -> Option<Decimal> {
        if self.yearly_target <= Decimal::ZERO {
            return None;
        }
        self.year_to_date_pnl
            .checked_div(self.yearly_target)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
    }
}

/// Statistics for one user over one reporting window.
///
/// All values are unrounded. Use [`PeriodStats::display`] to get the figures
/// that go into emails and notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub total_pnl: Decimal,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub best_day: Decimal,
    pub worst_day: Decimal,
    pub trading_days: usize,
    pub avg_per_day: Decimal,
    pub top_setup: Option<String>,
    pub goal_progress: Option<Decimal>,
}

/// Presentation view of [`PeriodStats`]: currency in whole units, win rate at
/// the configured precision, goal progress as a whole percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDisplay {
    pub total_pnl: i64,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: Decimal,
    pub win_rate_precision: u32,
    pub avg_win: i64,
    pub avg_loss: i64,
    pub best_day: i64,
    pub worst_day: i64,
    pub trading_days: usize,
    pub avg_per_day: i64,
    pub top_setup: Option<String>,
    pub goal_progress: Option<i64>,
}

impl StatsDisplay {
    /// Win rate formatted with exactly `win_rate_precision` decimals, e.g. `50.0`.
    pub fn win_rate_label(&self) -> String {
        format!("{:.*}", self.win_rate_precision as usize, self.win_rate)
    }
}

impl PeriodStats {
    pub fn display(&self, win_rate_precision: u32) -> StatsDisplay {
        StatsDisplay {
            total_pnl: whole_units(self.total_pnl),
            total_trades: self.total_trades,
            wins: self.wins,
            losses: self.losses,
            win_rate: self
                .win_rate
                .round_dp_with_strategy(win_rate_precision, RoundingStrategy::MidpointAwayFromZero),
            win_rate_precision,
            avg_win: whole_units(self.avg_win),
            avg_loss: whole_units(self.avg_loss),
            best_day: whole_units(self.best_day),
            worst_day: whole_units(self.worst_day),
            trading_days: self.trading_days,
            avg_per_day: whole_units(self.avg_per_day),
            top_setup: self.top_setup.clone(),
            goal_progress: self.goal_progress.map(whole_units),
        }
    }
}

/// Round a currency amount to whole units (midpoint away from zero).
pub fn whole_units(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Reduce the trades of one window into [`PeriodStats`].
///
/// `trades` must already be filtered to the window and must not be empty;
/// an empty window is the caller's defect and yields
/// [`EngineError::EmptyWindow`]. Totals too large for `Decimal` yield
/// [`EngineError::Overflow`]. `setups` resolves `setupId` to a display
/// name. `goal` is only supplied for monthly reports.
pub fn reduce_period<'a, I>(
    trades: I,
    setups: &[Setup],
    goal: Option<&GoalContext>,
) -> Result<PeriodStats, EngineError>
where
    I: IntoIterator<Item = &'a Trade>,
{
    let mut total_pnl = Decimal::ZERO;
    let mut total_trades = 0usize;
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut win_sum = Decimal::ZERO;
    let mut loss_sum = Decimal::ZERO;

    let mut daily: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    // Insertion-ordered so ties go to the first setup encountered.
    let mut setup_totals: Vec<(&str, Decimal)> = Vec::new();
    let mut setup_index: HashMap<&str, usize> = HashMap::new();

    for trade in trades {
        let pnl = trade_pnl(trade);
        total_trades += 1;
        total_pnl = checked_sum(total_pnl, pnl)?;

        if pnl > Decimal::ZERO {
            wins += 1;
            win_sum = checked_sum(win_sum, pnl)?;
        } else if pnl < Decimal::ZERO {
            losses += 1;
            loss_sum = checked_sum(loss_sum, pnl)?;
        }

        if let Some(date) = trade.entry_date {
            let day_total = daily.entry(date).or_insert(Decimal::ZERO);
            *day_total = checked_sum(*day_total, pnl)?;
        }

        if let Some(setup_id) = trade.setup_id.as_deref() {
            match setup_index.get(setup_id) {
                Some(&idx) => setup_totals[idx].1 = checked_sum(setup_totals[idx].1, pnl)?,
                None => {
                    setup_index.insert(setup_id, setup_totals.len());
                    setup_totals.push((setup_id, pnl));
                }
            }
        }
    }

    if total_trades == 0 {
        return Err(EngineError::EmptyWindow);
    }

    let best_day = daily.values().copied().fold(Decimal::ZERO, Decimal::max);
    let worst_day = daily.values().copied().fold(Decimal::ZERO, Decimal::min);
    let trading_days = daily.len();

    let avg_per_day = if trading_days > 0 {
        total_pnl / Decimal::from(trading_days)
    } else {
        Decimal::ZERO
    };

    let win_rate = Decimal::from(wins) * Decimal::ONE_HUNDRED / Decimal::from(total_trades);
    let avg_win = if wins > 0 {
        win_sum / Decimal::from(wins)
    } else {
        Decimal::ZERO
    };
    let avg_loss = if losses > 0 {
        loss_sum / Decimal::from(losses)
    } else {
        Decimal::ZERO
    };

    let mut top: Option<(&str, Decimal)> = None;
    for &(id, total) in &setup_totals {
        let beats = match top {
            Some((_, best)) => total > best,
            None => total > Decimal::ZERO,
        };
        if beats {
            top = Some((id, total));
        }
    }
    let top_setup = top.and_then(|(id, _)| {
        setups
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.clone())
    });

    Ok(PeriodStats {
        total_pnl,
        total_trades,
        wins,
        losses,
        win_rate,
        avg_win,
        avg_loss,
        best_day,
        worst_day,
        trading_days,
        avg_per_day,
        top_setup,
        goal_progress: goal.and_then(GoalContext::progress),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PositionType;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn long(d: u32, entry: Decimal, exit: Decimal, shares: Decimal) -> Trade {
        Trade::new(day(d), PositionType::Long, entry, Some(exit), shares)
    }

    #[test]
    fn test_end_to_end_scenario() {
        let trades = vec![
            long(3, dec!(100), dec!(110), dec!(10)),
            long(4, dec!(50), dec!(40), dec!(5)),
        ];

        let stats = reduce_period(&trades, &[], None).unwrap();
        assert_eq!(stats.total_pnl, dec!(50));
        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.win_rate, dec!(50));
        assert_eq!(stats.trading_days, 2);
        assert_eq!(stats.best_day, dec!(100));
        assert_eq!(stats.worst_day, dec!(-50));
        assert_eq!(stats.avg_per_day, dec!(25));
        assert_eq!(stats.avg_win, dec!(100));
        assert_eq!(stats.avg_loss, dec!(-50));
        assert_eq!(stats.top_setup, None);
        assert_eq!(stats.goal_progress, None);

        let display = stats.display(1);
        assert_eq!(display.win_rate_label(), "50.0");
        assert_eq!(display.total_pnl, 50);
    }

    #[test]
    fn test_empty_window_is_rejected() {
        let trades: Vec<Trade> = Vec::new();
        assert_eq!(
            reduce_period(&trades, &[], None),
            Err(EngineError::EmptyWindow)
        );
    }

    #[test]
    fn test_undated_trades_have_no_trading_days() {
        let mut a = long(3, dec!(100), dec!(110), dec!(10));
        let mut b = long(4, dec!(50), dec!(40), dec!(5));
        a.entry_date = None;
        b.entry_date = None;

        let stats = reduce_period(&[a, b], &[], None).unwrap();
        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.total_pnl, dec!(50));
        assert_eq!(stats.trading_days, 0);
        assert_eq!(stats.avg_per_day, Decimal::ZERO);
        assert_eq!(stats.best_day, Decimal::ZERO);
        assert_eq!(stats.worst_day, Decimal::ZERO);
    }

    #[test]
    fn test_overflowing_totals_are_an_error() {
        let huge = Decimal::from_str_exact("40000000000000000000000000000").unwrap();
        let trades = vec![
            long(3, dec!(1), huge, dec!(1)),
            long(4, dec!(1), huge, dec!(1)),
        ];
        assert_eq!(
            reduce_period(&trades, &[], None),
            Err(EngineError::Overflow)
        );
    }

    #[test]
    fn test_zero_pnl_is_neither_win_nor_loss() {
        let trades = vec![
            long(3, dec!(100), dec!(100), dec!(10)),
            long(3, dec!(100), dec!(101), dec!(1)),
        ];
        let stats = reduce_period(&trades, &[], None).unwrap();
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 0);
        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.win_rate, dec!(50));
    }

    #[test]
    fn test_best_and_worst_day_clamp_at_zero() {
        let losing = vec![
            long(3, dec!(100), dec!(90), dec!(1)),
            long(4, dec!(100), dec!(95), dec!(1)),
        ];
        let stats = reduce_period(&losing, &[], None).unwrap();
        assert_eq!(stats.best_day, Decimal::ZERO);
        assert_eq!(stats.worst_day, dec!(-10));

        let winning = vec![
            long(3, dec!(100), dec!(110), dec!(1)),
            long(4, dec!(100), dec!(105), dec!(1)),
        ];
        let stats = reduce_period(&winning, &[], None).unwrap();
        assert_eq!(stats.best_day, dec!(10));
        assert_eq!(stats.worst_day, Decimal::ZERO);
    }

    #[test]
    fn test_days_are_summed_before_extremes() {
        let trades = vec![
            long(3, dec!(100), dec!(110), dec!(1)),
            long(3, dec!(100), dec!(94), dec!(1)),
            long(4, dec!(100), dec!(107), dec!(1)),
        ];
        let stats = reduce_period(&trades, &[], None).unwrap();
        assert_eq!(stats.trading_days, 2);
        assert_eq!(stats.best_day, dec!(7));
        assert_eq!(stats.worst_day, Decimal::ZERO);
        assert_eq!(stats.avg_per_day, dec!(5.5));
    }

    #[test]
    fn test_top_setup_strictly_positive_first_wins_ties() {
        let setups = vec![
            Setup::new("a", "Opening Range"),
            Setup::new("b", "VWAP Reclaim"),
            Setup::new("c", "Bull Flag"),
        ];
        let trades = vec![
            long(3, dec!(100), dec!(90), dec!(1)).with_setup("c"),
            long(3, dec!(100), dec!(120), dec!(1)).with_setup("b"),
            long(4, dec!(100), dec!(120), dec!(1)).with_setup("a"),
            long(4, dec!(100), dec!(150), dec!(1)),
        ];
        let stats = reduce_period(&trades, &setups, None).unwrap();
        assert_eq!(stats.top_setup.as_deref(), Some("VWAP Reclaim"));

        let losers = vec![
            long(3, dec!(100), dec!(90), dec!(1)).with_setup("a"),
            long(3, dec!(100), dec!(100), dec!(1)).with_setup("b"),
        ];
        let stats = reduce_period(&losers, &setups, None).unwrap();
        assert_eq!(stats.top_setup, None);
    }

    #[test]
    fn test_unresolved_top_setup_is_none() {
        let trades = vec![long(3, dec!(100), dec!(120), dec!(1)).with_setup("ghost")];
        let stats = reduce_period(&trades, &[Setup::new("a", "Opening Range")], None).unwrap();
        assert_eq!(stats.top_setup, None);
    }

    #[test]
    fn test_goal_progress() {
        let trades = vec![long(3, dec!(100), dec!(110), dec!(10))];
        let goal = GoalContext::new(dec!(2500), dec!(10000));
        let stats = reduce_period(&trades, &[], Some(&goal)).unwrap();
        assert_eq!(stats.goal_progress, Some(dec!(25)));

        let unset = GoalContext::new(dec!(2500), Decimal::ZERO);
        let stats = reduce_period(&trades, &[], Some(&unset)).unwrap();
        assert_eq!(stats.goal_progress, None);
    }

    #[test]
    fn test_display_rounds_after_aggregation() {
        // Three trades of 0.4 each: rounding first would report 0, not 1.
        let trades = vec![
            long(3, dec!(10), dec!(10.4), dec!(1)),
            long(4, dec!(10), dec!(10.4), dec!(1)),
            long(5, dec!(10), dec!(10.4), dec!(1)),
        ];
        let stats = reduce_period(&trades, &[], None).unwrap();
        assert_eq!(stats.total_pnl, dec!(1.2));
        let display = stats.display(1);
        assert_eq!(display.total_pnl, 1);
        assert_eq!(display.best_day, 0);
        assert_eq!(display.win_rate_label(), "100.0");

        let one_of_three = vec![
            long(3, dec!(10), dec!(11), dec!(1)),
            long(4, dec!(10), dec!(9), dec!(1)),
            long(5, dec!(10), dec!(9), dec!(1)),
        ];
        let display = reduce_period(&one_of_three, &[], None).unwrap().display(1);
        assert_eq!(display.win_rate_label(), "33.3");
    }

    #[test]
    fn test_reduction_is_idempotent() {
        let trades = vec![
            long(3, dec!(100), dec!(110), dec!(10)).with_setup("a"),
            long(4, dec!(50), dec!(40), dec!(5)),
        ];
        let setups = vec![Setup::new("a", "Opening Range")];
        let first = reduce_period(&trades, &setups, None).unwrap();
        let second = reduce_period(&trades, &setups, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_whole_units_rounds_midpoint_away_from_zero() {
        assert_eq!(whole_units(dec!(49.5)), 50);
        assert_eq!(whole_units(dec!(-49.5)), -50);
        assert_eq!(whole_units(dec!(-0.4)), 0);
    }
}
