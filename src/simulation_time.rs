use crate::core::schedule::DayType;
use crate::core::units::{DAYS_PER_YEAR, SECONDS_PER_DAY, SECONDS_PER_HOUR};
use crate::errors::{ConfigError, ValidationReport};
use chrono::{Datelike, NaiveDate};

// Any non-leap year will do: the engine always works on a 365 day calendar.
const CALENDAR_YEAR: i32 = 2017;

/// Simulation clock definition: start date, duration and the two time steps.
#[derive(Clone, Debug, PartialEq)]
pub struct SimParam {
    /// simulation step, in seconds
    dt: f64,
    /// weather step, in seconds
    weather_step: f64,
    start_month: u32,
    start_day: u32,
    days: u32,
    /// zero-based day of year of the first simulated day
    start_julian: u32,
}

impl SimParam {
    /// Arguments:
    /// * `dt` - simulation step, in seconds
    /// * `weather_step` - step of the weather records, in seconds
    /// * `month` - start month (1-12)
    /// * `day` - start day of month
    /// * `days` - number of simulated days
    pub fn new(
        dt: f64,
        weather_step: f64,
        month: u32,
        day: u32,
        days: u32,
    ) -> Result<Self, ConfigError> {
        let mut report = ValidationReport::new();
        let start_julian = Self::collect_violations(
            dt,
            weather_step,
            month,
            day,
            days,
            "simulation",
            &mut report,
        );
        report.into_result()?;

        Ok(Self {
            dt,
            weather_step,
            start_month: month,
            start_day: day,
            days,
            start_julian: start_julian.unwrap_or_default(),
        })
    }

    /// Check the clock definition, returning the start day of year when the date itself is valid.
    pub(crate) fn collect_violations(
        dt: f64,
        weather_step: f64,
        month: u32,
        day: u32,
        days: u32,
        path: &str,
        report: &mut ValidationReport,
    ) -> Option<u32> {
        report.check_positive(format!("{path}.timestep"), dt);
        report.check_positive(format!("{path}.weather_timestep"), weather_step);
        if dt > 0. && weather_step > 0. {
            if dt > weather_step {
                report.push(
                    format!("{path}.timestep"),
                    dt,
                    format!("no longer than the weather timestep ({weather_step})"),
                );
            } else if (weather_step / dt).fract().abs() > 1e-9 {
                report.push(
                    format!("{path}.weather_timestep"),
                    weather_step,
                    format!("an integer multiple of the timestep ({dt})"),
                );
            }
            if (SECONDS_PER_DAY as f64 / weather_step).fract().abs() > 1e-9 {
                report.push(
                    format!("{path}.weather_timestep"),
                    weather_step,
                    "a whole fraction of a day",
                );
            }
        }
        if days == 0 {
            report.push(format!("{path}.days"), days, "at least 1");
        }

        let Some(start) = NaiveDate::from_ymd_opt(CALENDAR_YEAR, month, day) else {
            report.push(
                format!("{path}.start"),
                format!("{month}/{day}"),
                "a valid month/day of a non-leap year",
            );
            return None;
        };
        let start_julian = start.ordinal0();
        if start_julian + days > DAYS_PER_YEAR {
            report.push(
                format!("{path}.days"),
                days,
                format!(
                    "at most {} when starting on {month}/{day}",
                    DAYS_PER_YEAR - start_julian
                ),
            );
        }
        Some(start_julian)
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn weather_step(&self) -> f64 {
        self.weather_step
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    pub fn start_day(&self) -> u32 {
        self.start_day
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    /// Number of simulation steps in the run (the initial state is not a step).
    pub fn total_steps(&self) -> usize {
        (self.days as f64 * SECONDS_PER_DAY as f64 / self.dt).round() as usize
    }

    pub fn steps_per_weather_record(&self) -> usize {
        (self.weather_step / self.dt).round() as usize
    }

    pub fn weather_records_per_day(&self) -> usize {
        (SECONDS_PER_DAY as f64 / self.weather_step).round() as usize
    }

    /// Index of the first weather record covered by the simulation
    pub fn first_weather_record(&self) -> usize {
        self.start_julian as usize * self.weather_records_per_day()
    }

    /// Number of weather records covered by the simulation
    pub fn weather_records(&self) -> usize {
        self.days as usize * self.weather_records_per_day()
    }

    pub fn iter(&self) -> SimParamIterator {
        SimParamIterator {
            sim_param: self.clone(),
            current_index: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SimParamIterator {
    sim_param: SimParam,
    current_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationTimeIteration {
    /// one-based step number
    pub index: usize,
    pub timestep: f64,
    pub weather_step: f64,
    /// zero-based day of year
    pub julian_day: u32,
    pub month: u32,
    pub day: u32,
    /// seconds elapsed since midnight at the end of this step
    pub seconds_of_day: f64,
}

impl SimulationTimeIteration {
    /// Day of year and seconds since midnight at the start of this step.
    /// The step ending at midnight starts on the previous day.
    fn start_of_step(&self) -> (u32, f64) {
        let start = self.seconds_of_day - self.timestep;
        if start < -1e-6 {
            (
                self.julian_day.saturating_sub(1),
                start + SECONDS_PER_DAY as f64,
            )
        } else {
            (self.julian_day, start.max(0.))
        }
    }

    /// Hour (0-23) the step lies in. The step closing an hour belongs to that hour.
    pub fn hour_of_day(&self) -> usize {
        let (_, start) = self.start_of_step();
        ((start + 1e-6) / SECONDS_PER_HOUR as f64).floor() as usize
    }

    /// Day type of the day the step lies in, on a calendar whose first day of
    /// year is a Sunday
    pub fn day_type(&self) -> DayType {
        let (julian_day, _) = self.start_of_step();
        match julian_day % 7 {
            0 => DayType::Sunday,
            6 => DayType::Saturday,
            _ => DayType::Weekday,
        }
    }

    /// Index, relative to the first simulated record, of the weather record covering this step
    pub fn weather_index(&self) -> usize {
        ((self.index as f64 * self.timestep / self.weather_step).ceil() as usize).saturating_sub(1)
    }

    /// Whether this step closes a weather period, so its state should be recorded
    pub fn closes_weather_period(&self) -> bool {
        let remainder = self.seconds_of_day % self.weather_step;
        remainder < 1e-6 || self.weather_step - remainder < 1e-6
    }
}

impl Iterator for SimParamIterator {
    type Item = SimulationTimeIteration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_index >= self.sim_param.total_steps() {
            return None;
        }
        self.current_index += 1;

        let elapsed = self.current_index as f64 * self.sim_param.dt;
        let day_seconds = SECONDS_PER_DAY as f64;
        // guard against accumulated rounding just below a day boundary
        let elapsed_days = ((elapsed + 1e-6) / day_seconds).floor();
        let seconds_of_day = (elapsed - elapsed_days * day_seconds).max(0.);
        let julian_day = self.sim_param.start_julian + elapsed_days as u32;

        // the step ending at midnight after the last day of the year stays on 31 December
        let date = NaiveDate::from_yo_opt(CALENDAR_YEAR, julian_day.min(DAYS_PER_YEAR - 1) + 1)
            .unwrap_or(NaiveDate::MAX);

        Some(SimulationTimeIteration {
            index: self.current_index,
            timestep: self.sim_param.dt,
            weather_step: self.sim_param.weather_step,
            julian_day,
            month: date.month(),
            day: date.day(),
            seconds_of_day,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.sim_param.total_steps() - self.current_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SimParamIterator {}
