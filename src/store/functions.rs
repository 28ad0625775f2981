//! SQL functions registered on every store connection
//!
//! - `hour_of_day(time)`: the shared bucketing function
//! - `stddev_pop(x)`: population standard deviation aggregate (SQLite has none)

use crate::analysis_core::hour::hour_of_day;
use crate::analysis_core::moments::RunningMoments;
use rusqlite::functions::{Aggregate, Context, FunctionFlags};
use rusqlite::Connection;

pub fn register_analysis_functions(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("hour_of_day", 1, flags, |ctx| {
        let time: Option<f64> = ctx.get(0)?;
        Ok(time.map(hour_of_day))
    })?;

    conn.create_aggregate_function("stddev_pop", 1, flags, PopulationStdDev)?;

    log::debug!("🔧 Registered SQL functions: hour_of_day, stddev_pop");
    Ok(())
}

struct PopulationStdDev;

impl Aggregate<RunningMoments, Option<f64>> for PopulationStdDev {
    fn init(&self, _ctx: &mut Context<'_>) -> rusqlite::Result<RunningMoments> {
        Ok(RunningMoments::new())
    }

    fn step(&self, ctx: &mut Context<'_>, acc: &mut RunningMoments) -> rusqlite::Result<()> {
        // NULLs are skipped, matching the built-in aggregates
        if let Some(value) = ctx.get::<Option<f64>>(0)? {
            acc.push(value);
        }
        Ok(())
    }

    fn finalize(
        &self,
        _ctx: &mut Context<'_>,
        acc: Option<RunningMoments>,
    ) -> rusqlite::Result<Option<f64>> {
        Ok(acc.and_then(|m| m.population_std_dev()))
    }
}
