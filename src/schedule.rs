use std::time::Duration;

use crate::error::BuildError;

/// The unit a [`ReloadSchedule`] is expressed in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    #[default]
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Convert a non-negative count of this unit into a [`Duration`], saturating on overflow
    pub fn to_duration(self, count: u64) -> Duration {
        match self {
            TimeUnit::Nanoseconds => Duration::from_nanos(count),
            TimeUnit::Microseconds => Duration::from_micros(count),
            TimeUnit::Milliseconds => Duration::from_millis(count),
            TimeUnit::Seconds => Duration::from_secs(count),
            TimeUnit::Minutes => Duration::from_secs(count.saturating_mul(60)),
            TimeUnit::Hours => Duration::from_secs(count.saturating_mul(60 * 60)),
            TimeUnit::Days => Duration::from_secs(count.saturating_mul(24 * 60 * 60)),
        }
    }
}

/// When the first reload happens and how long to wait between the end of one reload and the start of the next
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReloadSchedule {
    initial_delay: i64,
    period: i64,
    unit: TimeUnit,
}

impl ReloadSchedule {
    /// # Errors
    /// [`BuildError::NonPositiveTtl`] if `period <= 0`, [`BuildError::NegativeDelay`] if `initial_delay < 0`
    pub fn new(initial_delay: i64, period: i64, unit: TimeUnit) -> Result<Self, BuildError> {
        if period <= 0 {
            return Err(BuildError::NonPositiveTtl(period));
        }

        if initial_delay < 0 {
            return Err(BuildError::NegativeDelay(initial_delay));
        }

        Ok(ReloadSchedule {
            initial_delay,
            period,
            unit,
        })
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn initial_delay(&self) -> Duration {
        // validated non-negative in `new`
        self.unit.to_duration(self.initial_delay.unsigned_abs())
    }

    pub fn period(&self) -> Duration {
        self.unit.to_duration(self.period.unsigned_abs())
    }
}
