use thiserror::Error;

pub const SECONDS_PER_HOUR: u32 = 3_600;
pub const SECONDS_PER_DAY: u32 = 86_400;
pub const HOURS_PER_DAY: u32 = 24;
pub const DAYS_PER_YEAR: u32 = 365;
pub const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
pub const PASCALS_PER_KILOPASCAL: f64 = 1_000.;
pub const ABSOLUTE_ZERO_CELSIUS: f64 = -273.15;

/// Stefan-Boltzmann constant in W/(m2.K4)
pub const STEFAN_BOLTZMANN: f64 = 5.67e-8;
/// Gravitational acceleration in m/s2
pub const GRAVITY: f64 = 9.81;
/// Specific heat of air at constant pressure in J/(kg.K)
pub const CP_AIR: f64 = 1004.;
/// Latent heat of evaporation in J/kg
pub const LATENT_HEAT_EVAPORATION: f64 = 2.26e6;
pub const VON_KARMAN: f64 = 0.4;
/// Gas constant of dry air in J/(kg.K)
pub const R_DRY_AIR: f64 = 287.04;

// ASHRAE Handbook of Fundamentals (2009) ch. 1 saturation pressure coefficients
const C1: f64 = -5.674_535_9e3;
const C2: f64 = 6.392_524_7;
const C3: f64 = -9.677_843e-3;
const C4: f64 = 6.221_570_1e-7;
const C5: f64 = 2.074_782_5e-9;
const C6: f64 = -9.484_024e-13;
const C7: f64 = 4.163_501_9;
const C8: f64 = -5.800_220_6e3;
const C9: f64 = 1.391_499_3;
const C10: f64 = -4.864_023_9e-2;
const C11: f64 = 4.176_476_8e-5;
const C12: f64 = -1.445_209_3e-8;
const C13: f64 = 6.545_967_3;
// dew point coefficients, valid for pw in kPa
const C14: f64 = 6.54;
const C15: f64 = 14.526;
const C16: f64 = 0.7389;
const C17: f64 = 0.09486;
const C18: f64 = 0.4569;

/// Ratio of molecular weights of water vapour and dry air
const EPSILON_VAPOUR: f64 = 0.621_945;

pub(crate) fn celsius_to_kelvin(temp_c: f64) -> Result<f64, BelowAbsoluteZeroError> {
    if temp_c < ABSOLUTE_ZERO_CELSIUS {
        Err(BelowAbsoluteZeroError::from_c(temp_c))
    } else {
        Ok(temp_c - ABSOLUTE_ZERO_CELSIUS)
    }
}

pub(crate) fn kelvin_to_celsius(temp_k: f64) -> Result<f64, BelowAbsoluteZeroError> {
    if temp_k < 0.0 {
        Err(BelowAbsoluteZeroError::from_k(temp_k))
    } else {
        Ok(temp_k + ABSOLUTE_ZERO_CELSIUS)
    }
}

#[derive(Debug, Error)]
#[error("A temperature of {k}ºK/{}ºC was encountered, which is less than absolute zero", k - 273.15)]
pub struct BelowAbsoluteZeroError {
    k: f64,
}

impl BelowAbsoluteZeroError {
    fn from_k(k: f64) -> Self {
        Self { k }
    }

    fn from_c(c: f64) -> Self {
        Self { k: c + 273.15 }
    }
}

/// Density of moist air in kg/m3
///
/// Arguments:
/// * `pressure` - air pressure, in Pa
/// * `temperature` - air temperature, in K
/// * `specific_humidity` - in kg/kg
pub fn moist_air_density(pressure: f64, temperature: f64, specific_humidity: f64) -> f64 {
    pressure / (R_DRY_AIR * temperature * (1. + 1.607_858 * specific_humidity))
}

/// Saturation vapour pressure over water (or ice below freezing), in Pa
///
/// Arguments:
/// * `temp_c` - dry bulb temperature, in deg C
pub fn saturation_vapour_pressure(temp_c: f64) -> f64 {
    let t = temp_c - ABSOLUTE_ZERO_CELSIUS;
    let ln_pws = if temp_c < 0. {
        C1 / t + C2 + C3 * t + C4 * t.powi(2) + C5 * t.powi(3) + C6 * t.powi(4) + C7 * t.ln()
    } else {
        C8 / t + C9 + C10 * t + C11 * t.powi(2) + C12 * t.powi(3) + C13 * t.ln()
    };
    ln_pws.exp()
}

/// Specific humidity (humidity ratio), in kg/kg, from relative humidity
///
/// Arguments:
/// * `relative_humidity` - in %
/// * `temp_c` - dry bulb temperature, in deg C
/// * `pressure` - in Pa
pub fn specific_humidity_from_relative(relative_humidity: f64, temp_c: f64, pressure: f64) -> f64 {
    let vapour_pressure = relative_humidity / 100. * saturation_vapour_pressure(temp_c);
    0.62198 * vapour_pressure / (pressure - vapour_pressure)
}

/// Relative humidity and dew point of moist air
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoistAirState {
    /// relative humidity, in %, clamped to [0, 100]
    pub relative_humidity: f64,
    /// dew point temperature, in deg C, never above the dry bulb temperature
    pub dew_point: f64,
}

/// Arguments:
/// * `temperature` - dry bulb temperature, in K
/// * `specific_humidity` - in kg/kg
/// * `pressure` - in Pa
pub fn psychrometrics(temperature: f64, specific_humidity: f64, pressure: f64) -> MoistAirState {
    let temp_c = temperature + ABSOLUTE_ZERO_CELSIUS;
    let humidity = specific_humidity.max(1e-9);
    let vapour_pressure = humidity * pressure / (EPSILON_VAPOUR + humidity);
    let relative_humidity =
        (vapour_pressure / saturation_vapour_pressure(temp_c) * 100.).clamp(0., 100.);

    let pw_kpa = vapour_pressure / PASCALS_PER_KILOPASCAL;
    let alpha = pw_kpa.ln();
    let mut dew_point = C14
        + C15 * alpha
        + C16 * alpha.powi(2)
        + C17 * alpha.powi(3)
        + C18 * pw_kpa.powf(0.1984);
    if dew_point < 0. {
        dew_point = 6.09 + 12.608 * alpha + 0.4959 * alpha.powi(2);
    }

    MoistAirState {
        relative_humidity,
        dew_point: dew_point.min(temp_c),
    }
}
