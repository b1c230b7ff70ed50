#![allow(clippy::too_many_arguments)]

pub mod core;
pub mod errors;
pub mod input;
pub mod output;
pub mod read_weather_file;
mod simulation_time;
mod statistics;
pub mod uwg;

#[cfg(test)]
mod tests;

#[macro_use]
extern crate is_close;

pub use crate::errors::UwgError;
pub use crate::uwg::{CancellationToken, HourlyRecord, Progress, RunState, Uwg};

use crate::input::{ingest_for_processing, UwgInput};
use crate::output::{FileOutput, Output, EPW_OUTPUT_KEY, HOURLY_OUTPUT_KEY};
use crate::statistics::{max, mean};
#[cfg(feature = "progress")]
use indicatif::ProgressBar;
use indexmap::IndexMap;
use itertools::Itertools;
use rayon::prelude::*;
use std::io::Read;
use tracing::{error, info};

/// Headline figures of a completed run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    pub hours: usize,
    pub mean_canyon_temp_c: f64,
    pub mean_rural_temp_c: f64,
    /// largest hourly canyon excess over the rural site, in K
    pub peak_heat_island: f64,
    pub unconverged_hours: usize,
}

impl RunSummary {
    fn from_results(results: &[HourlyRecord]) -> Self {
        Self {
            hours: results.len(),
            mean_canyon_temp_c: mean(results.iter().map(|r| r.canyon_temp_c)),
            mean_rural_temp_c: mean(results.iter().map(|r| r.rural_temp_c)),
            peak_heat_island: max(results.iter().map(|r| r.canyon_temp_c - r.rural_temp_c)),
            unconverged_hours: results.iter().filter(|r| !r.converged).count(),
        }
    }

    /// Mean canyon temperature excess over the rural site, in K
    pub fn heat_island_intensity(&self) -> f64 {
        self.mean_canyon_temp_c - self.mean_rural_temp_c
    }
}

/// Read a JSON configuration, morph the rural weather and write the urban
/// weather file (and optionally the hourly canyon results) to `output`.
///
/// Arguments:
/// * `input` - JSON configuration
/// * `epw_text` - contents of the rural EPW file
/// * `output` - destination of the `epw` and `csv` outputs
/// * `write_hourly` - whether to also write the hourly results
pub fn run_project(
    input: impl Read,
    epw_text: &str,
    output: impl Output,
    write_hourly: bool,
) -> anyhow::Result<RunSummary> {
    let input = ingest_for_processing(input)?;
    run_configured(input, epw_text, output, write_hourly)
}

fn run_configured(
    input: UwgInput,
    epw_text: &str,
    output: impl Output,
    write_hourly: bool,
) -> anyhow::Result<RunSummary> {
    let mut uwg = Uwg::from_epw_text(epw_text, input)?;

    #[cfg(feature = "progress")]
    let bar = ProgressBar::no_length();
    uwg.run_with(
        |progress| {
            #[cfg(feature = "progress")]
            {
                bar.set_length(progress.total_hours as u64);
                bar.set_position(progress.completed_hours as u64);
            }
            #[cfg(not(feature = "progress"))]
            let _ = progress;
        },
        &CancellationToken::new(),
    )?;
    #[cfg(feature = "progress")]
    bar.finish_and_clear();

    if !output.is_noop() {
        uwg.write_epw_to(output.writer_for_location_key(EPW_OUTPUT_KEY)?)?;
        if write_hourly {
            uwg.write_hourly_csv(output.writer_for_location_key(HOURLY_OUTPUT_KEY)?)?;
        }
    }

    let summary = RunSummary::from_results(uwg.hourly_results());
    info!(
        "Urban heat island intensity {:.2} K (peak {:.2} K) over {} hours",
        summary.heat_island_intensity(),
        summary.peak_heat_island,
        summary.hours
    );
    Ok(summary)
}

/// Run several independent configurations against the same rural weather in
/// parallel. Each case writes through its own output, and a failing case
/// does not stop the others; results come back in input order.
pub fn run_batch(
    cases: IndexMap<String, (UwgInput, FileOutput)>,
    epw_text: &str,
    write_hourly: bool,
) -> IndexMap<String, anyhow::Result<RunSummary>> {
    cases
        .into_iter()
        .collect_vec()
        .into_par_iter()
        .map(|(name, (input, output))| {
            let result = run_configured(input, epw_text, &output, write_hourly);
            if let Err(e) = &result {
                error!("Case '{name}' failed: {e:#}");
            }
            (name, result)
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}
