// Whole-run scenarios on a synthetic year of Boston weather.

use crate::errors::UwgError;
use crate::input::tests::summer_day_input;
use crate::input::UwgInput;
use crate::output::{FileOutput, SinkOutput};
use crate::uwg::{RunState, Uwg};
use crate::{run_batch, run_project};
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use itertools::Itertools;
use pretty_assertions::assert_eq;
use rstest::*;
use std::f64::consts::PI;
use std::fs;

const HEADER: [&str; 8] = [
    "LOCATION,Boston Logan Intl Arpt,MA,USA,TMY3,725090,42.37,-71.02,-5.0,6.0",
    "DESIGN CONDITIONS,0",
    "TYPICAL/EXTREME PERIODS,0",
    "GROUND TEMPERATURES,3,.5,,,,2.1,1.2,2.9,6.6,12.5,17.8,22.0,22.6,19.9,15.2,9.6,4.8,2,,,,4.4,3.1,3.6,5.6,9.7,14.3,18.1,20.0,19.2,16.3,12.1,7.6,4,,,,7.1,5.8,5.7,6.6,9.0,12.1,15.1,17.0,17.4,16.1,13.3,10.1",
    "HOLIDAYS/DAYLIGHT SAVINGS,No,0,0,0",
    "COMMENTS 1,synthetic clear-sky year",
    "COMMENTS 2,seasonal cycle peaking mid July",
    "DATA PERIODS,1,1,Data,Sunday, 1/ 1,12/31",
];

/// Daily mean dry bulb, reaching 25 deg C in mid July and crossing
/// 10 deg C between March and April and again in October and November.
fn seasonal_mean(day_of_year: u32) -> f64 {
    11. + 14. * (2. * PI * (day_of_year as f64 - 105.) / 365.).sin()
}

/// A full year of hourly records on the 2017 calendar. Each day follows a
/// +/- 5 deg C cycle peaking at 15:00 under clear skies with a steady
/// westerly wind.
pub(crate) fn full_year_epw() -> String {
    let mut text = HEADER.iter().map(|line| format!("{line}\n")).join("");
    let days = NaiveDate::from_ymd_opt(2017, 1, 1)
        .into_iter()
        .flat_map(|first| first.iter_days())
        .take_while(|date| date.year() == 2017);
    for date in days {
        let mean = seasonal_mean(date.ordinal());
        for hour in 1..=24 {
            let h = (hour - 1) as f64;
            let dry_bulb = mean + 5. * (2. * PI * (h - 9.) / 24.).sin();
            let sun = if h > 6. && h < 20. {
                (PI * (h - 6.) / 14.).sin()
            } else {
                0.
            };
            let (direct, diffuse) = (700. * sun, 120. * sun);
            text.push_str(&format!(
                "2017,{},{},{hour},60,?9?9?9?9E0?9?9?9?9?9?9?9?9?9?9?9?9?9?9?9*9*9?9?9?9,{dry_bulb:.1},{:.1},60,101325,0,1415,380,{:.0},{direct:.0},{diffuse:.0},0,0,0,0,270,3.0,0,0,16.1,77777,9,999999999,60,0.0530,0,88,0.000,0.0,0.0\n",
                date.month(),
                date.day(),
                dry_bulb - 8.,
                diffuse + 0.6 * direct,
            ));
        }
    }
    text
}

pub(crate) fn summer_day_uwg() -> Uwg {
    let input: UwgInput = serde_json::from_value(summer_day_input()).unwrap();
    Uwg::from_epw_text(&full_year_epw(), input).unwrap()
}

#[fixture]
fn completed_summer_day() -> Uwg {
    let mut uwg = summer_day_uwg();
    uwg.run().unwrap();
    uwg
}

#[rstest]
fn should_hold_a_full_year_of_records() {
    let text = full_year_epw();
    assert_eq!(text.lines().count(), 8 + 8760);
    assert!(text
        .lines()
        .nth(8 + 195 * 24)
        .unwrap()
        .starts_with("2017,7,15,1,"));
}

#[rstest]
fn should_produce_a_heat_island_on_a_clear_summer_day(completed_summer_day: Uwg) {
    assert_eq!(completed_summer_day.state(), RunState::Completed);
    let results = completed_summer_day.hourly_results();
    assert_eq!(results.len(), 24);
    assert_eq!((results[0].month, results[0].day, results[0].hour), (7, 15, 1));
    assert_eq!(results[23].hour, 24);

    let canyon: f64 = results.iter().map(|r| r.canyon_temp_c).sum::<f64>() / 24.;
    let rural: f64 = results.iter().map(|r| r.rural_temp_c).sum::<f64>() / 24.;
    assert!(canyon > rural, "canyon {canyon} should be warmer than rural {rural}");

    for record in results {
        assert!(record.converged, "hour {} did not converge", record.hour);
        let difference = record.canyon_temp_c - record.rural_temp_c;
        assert!(
            (-1. ..=10.).contains(&difference),
            "hour {}: canyon differs from rural by {difference}",
            record.hour
        );
        assert!((0. ..=100.).contains(&record.canyon_rel_hum));
        assert!(record.canyon_dew_point_c <= record.canyon_temp_c + 1e-9);
        assert_eq!(record.wind_speed, 3.);
    }
}

#[rstest]
fn should_leave_everything_outside_the_morphed_fields_untouched(completed_summer_day: Uwg) {
    let source = full_year_epw();
    let morphed = completed_summer_day.morphed_epw().unwrap();
    let first_line = 8 + 195 * 24;
    let morphed_columns = [6, 7, 8, 21];

    assert_eq!(source.lines().count(), morphed.lines().count());
    for (i, (original, written)) in source.lines().zip(morphed.lines()).enumerate() {
        if !(first_line..first_line + 24).contains(&i) {
            assert_eq!(original, written, "line {} changed", i + 1);
            continue;
        }
        for (column, (a, b)) in original.split(',').zip(written.split(',')).enumerate() {
            if !morphed_columns.contains(&column) {
                assert_eq!(a, b, "line {} column {column} changed", i + 1);
            }
        }
    }

    let record = &completed_summer_day.hourly_results()[13];
    let line = morphed.lines().nth(first_line + 13).unwrap();
    let fields = line.split(',').collect_vec();
    assert_eq!(fields[6], format!("{:.1}", record.canyon_temp_c));
    assert_eq!(fields[8], format!("{:.1}", record.canyon_rel_hum));
}

#[rstest]
fn should_write_hourly_results_as_csv(completed_summer_day: Uwg) {
    let mut buffer = vec![];
    completed_summer_day.write_hourly_csv(&mut buffer).unwrap();
    let csv = String::from_utf8(buffer).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "month,day,hour,canyon_temp_c,canyon_spec_hum,canyon_rel_hum,canyon_dew_point_c,ubl_temp_c,rural_temp_c,wind_speed,converged,iterations"
    );
    assert_eq!(lines.count(), 24);
}

#[rstest]
fn should_report_every_configuration_problem_at_once() {
    let mut value = summer_day_input();
    value["typologies"][0]["wall_albedo"] = 1.5.into();
    value["pavement"] = serde_json::json!({ "thickness": -0.2 });
    let input: UwgInput = serde_json::from_value(value).unwrap();
    let mut uwg = Uwg::from_epw_text(&full_year_epw(), input).unwrap();

    let Err(UwgError::Config(error)) = uwg.run() else {
        panic!("configuration should have been rejected");
    };
    let message = error.to_string();
    let wall = message.find("typologies[0].wall_albedo").unwrap();
    let pavement = message.find("pavement.thickness").unwrap();
    assert!(wall < pavement);
    assert_eq!(uwg.state(), RunState::Failed);
    assert!(uwg.hourly_results().is_empty());
}

#[rstest]
fn should_run_a_project_from_json() {
    let json = serde_json::to_vec(&summer_day_input()).unwrap();
    let summary = run_project(json.as_slice(), &full_year_epw(), SinkOutput, true).unwrap();
    assert_eq!(summary.hours, 24);
    assert_eq!(summary.unconverged_hours, 0);
    assert!(summary.heat_island_intensity() > 0.);
    assert!(summary.peak_heat_island > summary.heat_island_intensity());
}

#[rstest]
fn should_reject_malformed_json() {
    let result = run_project(&b"{\"city\": "[..], &full_year_epw(), SinkOutput, false);
    assert!(result.is_err());
}

#[rstest]
fn should_run_cases_independently_and_in_order() {
    let directory = std::env::temp_dir().join(format!("uwg-batch-{}", std::process::id()));
    fs::create_dir_all(&directory).unwrap();

    let valid: UwgInput = serde_json::from_value(summer_day_input()).unwrap();
    let mut invalid = valid.clone();
    invalid.pavement.thickness = 0.;
    let cases: IndexMap<String, (UwgInput, FileOutput)> = [("good", valid), ("bad", invalid)]
        .into_iter()
        .map(|(name, input)| {
            let output = FileOutput::new(directory.clone(), format!("{name}_UWG.{{}}"));
            (name.to_string(), (input, output))
        })
        .collect();

    let results = run_batch(cases, &full_year_epw(), true);
    assert_eq!(results.keys().collect_vec(), vec!["good", "bad"]);
    assert_eq!(results["good"].as_ref().unwrap().hours, 24);
    assert!(results["bad"].is_err());

    let hourly = fs::read_to_string(directory.join("good_UWG.csv")).unwrap();
    assert_eq!(hourly.lines().count(), 25);
    assert!(directory.join("good_UWG.epw").exists());
    assert!(!directory.join("bad_UWG.epw").exists());
    fs::remove_dir_all(&directory).unwrap();
}
