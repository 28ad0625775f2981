//! Hour-of-day bucketing
//!
//! The single derivation of the hourly bucket. The store registers this same
//! function as the SQL scalar `hour_of_day(time)`, so SQL aggregation and
//! in-process segmentation can never disagree on rounding or modulo.

pub const SECS_PER_HOUR: f64 = 3600.0;
pub const HOURS_PER_DAY: i64 = 24;

/// `floor(time / 3600) mod 24`, always in `[0, 23]`
pub fn hour_of_day(time: f64) -> i64 {
    let hours = (time / SECS_PER_HOUR).floor() as i64;
    hours.rem_euclid(HOURS_PER_DAY)
}
