//! Supply schedule simulator
//!
//! Lays out how total supply evolves when the block reward is halved every
//! `split_interval` blocks, down to a single minor unit. Informational only:
//! block validation pays the fixed `block_reward` from the consensus
//! parameters.

use serde::Serialize;

/// Defaults used by the reference node
pub const DEFAULT_DECIMAL_PLACES: u32 = 2;
pub const DEFAULT_STARTING_REWARD: u64 = 1000;
pub const DEFAULT_SPLIT_INTERVAL: u64 = 1000;
pub const DEFAULT_BLOCK_TIME_SECS: u64 = 1800;

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// One reward era
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupplyEra {
    /// 1-based split number
    pub split: u32,
    /// Reward per block during this era, in minor units
    pub reward: u64,
    /// Cumulative supply at the end of this era, in minor units
    pub total_supply: u64,
}

/// Result of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplySchedule {
    pub decimal_places: u32,
    pub split_interval: u64,
    pub block_time_secs: u64,
    pub eras: Vec<SupplyEra>,
}

impl SupplySchedule {
    /// Simulate the schedule.
    ///
    /// `starting_reward` is in whole coins; all arithmetic is done in minor
    /// units and halving rounds down. Totals saturate instead of wrapping.
    pub fn simulate(
        decimal_places: u32,
        starting_reward: u64,
        split_interval: u64,
        block_time_secs: u64,
    ) -> Self {
        let unit = 10u64.saturating_pow(decimal_places);
        let mut reward = starting_reward.saturating_mul(unit);
        let mut total: u64 = 0;
        let mut eras = Vec::new();

        while reward >= 1 {
            total = total.saturating_add(reward.saturating_mul(split_interval));
            eras.push(SupplyEra {
                split: eras.len() as u32 + 1,
                reward,
                total_supply: total,
            });
            if reward == 1 {
                break;
            }
            reward /= 2;
        }

        Self {
            decimal_places,
            split_interval,
            block_time_secs,
            eras,
        }
    }

    /// Simulate with the reference parameters
    pub fn with_defaults() -> Self {
        Self::simulate(
            DEFAULT_DECIMAL_PLACES,
            DEFAULT_STARTING_REWARD,
            DEFAULT_SPLIT_INTERVAL,
            DEFAULT_BLOCK_TIME_SECS,
        )
    }

    /// Number of halvings until the reward reaches one minor unit
    pub fn splits(&self) -> u32 {
        self.eras.len() as u32
    }

    /// Total supply in minor units
    pub fn total_supply(&self) -> u64 {
        self.eras.last().map(|era| era.total_supply).unwrap_or(0)
    }

    /// Blocks needed to mine the whole supply
    pub fn total_blocks(&self) -> u64 {
        u64::from(self.splits()).saturating_mul(self.split_interval)
    }

    /// Seconds needed to mine the whole supply
    pub fn total_time_secs(&self) -> u64 {
        self.total_blocks().saturating_mul(self.block_time_secs)
    }

    /// Years needed to mine the whole supply
    pub fn total_time_years(&self) -> f64 {
        self.total_time_secs() as f64 / SECONDS_PER_DAY / DAYS_PER_YEAR
    }

    /// Days between two halvings
    pub fn days_per_split(&self) -> f64 {
        self.split_interval.saturating_mul(self.block_time_secs) as f64 / SECONDS_PER_DAY
    }

    /// Render a minor-unit amount as a decimal coin string
    pub fn format_amount(&self, minor_units: u64) -> String {
        format_minor_units(minor_units, self.decimal_places)
    }
}

/// Render `minor_units` with `decimal_places` fractional digits
pub fn format_minor_units(minor_units: u64, decimal_places: u32) -> String {
    if decimal_places == 0 {
        return minor_units.to_string();
    }
    let unit = 10u64.saturating_pow(decimal_places);
    format!(
        "{}.{:0width$}",
        minor_units / unit,
        minor_units % unit,
        width = decimal_places as usize
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let schedule = SupplySchedule::with_defaults();
        assert_eq!(schedule.splits(), 17);
        assert_eq!(schedule.total_supply(), 199_994_000);
        assert_eq!(schedule.format_amount(schedule.total_supply()), "1999940.00");
        assert_eq!(schedule.total_blocks(), 17_000);
        assert_eq!(schedule.total_time_secs(), 17_000 * 1800);

        let rewards: Vec<u64> = schedule.eras.iter().map(|era| era.reward).collect();
        assert_eq!(
            rewards,
            vec![
                100_000, 50_000, 25_000, 12_500, 6250, 3125, 1562, 781, 390, 195, 97, 48, 24, 12,
                6, 3, 1
            ]
        );
    }

    #[test]
    fn test_zero_reward_has_no_eras() {
        let schedule = SupplySchedule::simulate(2, 0, 1000, 600);
        assert_eq!(schedule.splits(), 0);
        assert_eq!(schedule.total_supply(), 0);
    }

    #[test]
    fn test_format_minor_units() {
        assert_eq!(format_minor_units(5, 2), "0.05");
        assert_eq!(format_minor_units(12345, 3), "12.345");
        assert_eq!(format_minor_units(7, 0), "7");
    }
}
