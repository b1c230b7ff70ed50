// Reference (rural) weather series and the per-step forcing derived from it.

use crate::core::units::{
    celsius_to_kelvin, saturation_vapour_pressure, specific_humidity_from_relative,
    STEFAN_BOLTZMANN,
};
use crate::errors::EpwError;
use crate::read_weather_file::{EpwFile, EpwRecord, GroundTemperature};
use crate::statistics::mean;
use tracing::debug;

const MISSING_PRESSURE: f64 = 999_999.;
const MISSING_RADIATION: f64 = 9_999.;
const MISSING_INFRARED: f64 = 9_999.;
const MISSING_WIND_SPEED: f64 = 999.;
const STANDARD_PRESSURE: f64 = 101_325.;

/// Weather forcing of a single weather period, in SI units and Kelvin
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Forcing {
    /// dry bulb temperature, in K
    pub temp: f64,
    /// specific humidity, in kg/kg
    pub hum: f64,
    /// station pressure, in Pa
    pub pres: f64,
    /// wind speed at the measurement height, in m/s (never below the configured minimum)
    pub wind: f64,
    pub wind_dir: f64,
    /// direct normal irradiance, in W/m2
    pub dir: f64,
    /// diffuse horizontal irradiance, in W/m2
    pub dif: f64,
    /// downwelling long-wave radiation, in W/m2
    pub infra: f64,
    /// precipitation, in mm
    pub prec: f64,
}

/// The rural weather covering the simulated period, read once before the run.
#[derive(Clone, Debug)]
pub struct Weather {
    forcing: Vec<Forcing>,
    records: Vec<EpwRecord>,
}

impl Weather {
    /// Arguments:
    /// * `epw` - parsed rural weather file
    /// * `first_record` - index of the first simulated record
    /// * `records` - number of simulated records
    /// * `wind_min` - lower bound applied to the wind speed, in m/s
    pub fn new(
        epw: &EpwFile,
        first_record: usize,
        records: usize,
        wind_min: f64,
    ) -> Result<Self, EpwError> {
        let needed = first_record + records;
        if epw.records().len() < needed {
            return Err(EpwError::TooShort {
                needed,
                found: epw.records().len(),
            });
        }

        let slice = &epw.records()[first_record..needed];
        let forcing = slice
            .iter()
            .enumerate()
            .map(|(i, record)| {
                forcing_from_record(record, wind_min).map_err(|e| EpwError::Malformed {
                    line: crate::read_weather_file::EPW_HEADER_LINES + first_record + i + 1,
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "Loaded {} weather records starting at record {first_record}",
            forcing.len()
        );

        Ok(Self {
            forcing,
            records: slice.to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.forcing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forcing.is_empty()
    }

    pub fn forcing(&self, index: usize) -> Forcing {
        self.forcing[index.min(self.forcing.len() - 1)]
    }

    pub fn record(&self, index: usize) -> &EpwRecord {
        &self.records[index.min(self.records.len() - 1)]
    }

    /// Mean dry bulb temperature over the period, in K
    pub fn mean_temperature(&self) -> f64 {
        mean(self.forcing.iter().map(|f| f.temp))
    }

    /// Deep soil temperature under a layer of the given depth for a month (1-12), in K.
    /// Uses the tabulated depth closest to `depth`, or the period mean when the
    /// file carries no ground temperatures.
    pub fn deep_soil_temperature(
        &self,
        ground_temperatures: &[GroundTemperature],
        depth: f64,
        month: u32,
    ) -> f64 {
        ground_temperatures
            .iter()
            .min_by(|a, b| (a.depth - depth).abs().total_cmp(&(b.depth - depth).abs()))
            .and_then(|ground| celsius_to_kelvin(ground.monthly[(month as usize).clamp(1, 12) - 1]).ok())
            .unwrap_or_else(|| self.mean_temperature())
    }
}

fn forcing_from_record(record: &EpwRecord, wind_min: f64) -> anyhow::Result<Forcing> {
    let temp = celsius_to_kelvin(record.dry_bulb)?;
    let pres = if record.pressure >= MISSING_PRESSURE || record.pressure <= 0. {
        STANDARD_PRESSURE
    } else {
        record.pressure
    };
    let hum = if (0. ..=100.).contains(&record.relative_humidity) {
        specific_humidity_from_relative(record.relative_humidity, record.dry_bulb, pres)
    } else {
        let vapour_pressure = saturation_vapour_pressure(record.dew_point.min(record.dry_bulb));
        0.62198 * vapour_pressure / (pres - vapour_pressure)
    };
    let infra = if record.horizontal_infrared >= MISSING_INFRARED || record.horizontal_infrared <= 0.
    {
        sky_infrared(temp, celsius_to_kelvin(record.dew_point.min(record.dry_bulb))?)
    } else {
        record.horizontal_infrared
    };
    let wind = if record.wind_speed >= MISSING_WIND_SPEED {
        0.
    } else {
        record.wind_speed
    };
    let radiation = |value: f64| {
        if value >= MISSING_RADIATION {
            0.
        } else {
            value.max(0.)
        }
    };

    Ok(Forcing {
        temp,
        hum,
        pres,
        wind: wind.max(wind_min),
        wind_dir: record.wind_direction,
        dir: radiation(record.direct_normal),
        dif: radiation(record.diffuse_horizontal),
        infra,
        prec: record.precipitation.max(0.),
    })
}

/// Clear-sky downwelling long-wave radiation, used when the weather file omits it
fn sky_infrared(temperature: f64, dew_point: f64) -> f64 {
    let emissivity = (0.787 + 0.764 * (dew_point / 273.).ln()).clamp(0., 1.);
    emissivity * STEFAN_BOLTZMANN * temperature.powi(4)
}
