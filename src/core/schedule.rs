use crate::core::units::{celsius_to_kelvin, HOURS_PER_DAY};
use crate::errors::ValidationReport;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, IntoStaticStr};

#[derive(Clone, Copy, Debug, Display, EnumIter, Eq, Hash, IntoStaticStr, PartialEq)]
pub enum DayType {
    Weekday,
    Saturday,
    Sunday,
}

/// Hourly profile for each of the three day types.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WeeklySchedule {
    pub weekday: [f64; HOURS_PER_DAY as usize],
    pub saturday: [f64; HOURS_PER_DAY as usize],
    pub sunday: [f64; HOURS_PER_DAY as usize],
}

impl WeeklySchedule {
    pub fn new(
        weekday: [f64; HOURS_PER_DAY as usize],
        saturday: [f64; HOURS_PER_DAY as usize],
        sunday: [f64; HOURS_PER_DAY as usize],
    ) -> Self {
        Self {
            weekday,
            saturday,
            sunday,
        }
    }

    pub fn constant(value: f64) -> Self {
        let day = [value; HOURS_PER_DAY as usize];
        Self::new(day, day, day)
    }

    pub fn day(&self, day_type: DayType) -> &[f64; HOURS_PER_DAY as usize] {
        match day_type {
            DayType::Weekday => &self.weekday,
            DayType::Saturday => &self.saturday,
            DayType::Sunday => &self.sunday,
        }
    }

    /// Value for the given day type and hour of day (0-23; later hours wrap).
    pub fn value(&self, day_type: DayType, hour_of_day: usize) -> f64 {
        self.day(day_type)[hour_of_day % HOURS_PER_DAY as usize]
    }

    pub(crate) fn collect_fraction_violations(&self, path: &str, report: &mut ValidationReport) {
        for (label, day) in [
            ("weekday", &self.weekday),
            ("saturday", &self.saturday),
            ("sunday", &self.sunday),
        ] {
            for (hour, value) in day.iter().enumerate() {
                report.check_range(format!("{path}.{label}[{hour}]"), *value, 0., 1.);
            }
        }
    }
}

/// Fractions used to split internal gains into radiant and latent parts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InternalGainFractions {
    /// sensible heat per occupant, in W
    pub sensible_per_occupant: f64,
    pub occupant_latent: f64,
    pub occupant_radiant: f64,
    pub equipment_radiant: f64,
    pub lighting_radiant: f64,
}

impl Default for InternalGainFractions {
    fn default() -> Self {
        Self {
            sensible_per_occupant: 100.,
            occupant_latent: 0.3,
            occupant_radiant: 0.2,
            equipment_radiant: 0.5,
            lighting_radiant: 0.7,
        }
    }
}

/// Internal gains of one hour, per m2 of floor area
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InternalGains {
    /// total internal heat gain, in W/m2
    pub total: f64,
    pub radiant_fraction: f64,
    pub latent_fraction: f64,
}

/// Schedules and peak loads of one building typology
#[derive(Clone, Debug, PartialEq)]
pub struct SchDef {
    pub equipment: WeeklySchedule,
    pub lighting: WeeklySchedule,
    pub occupancy: WeeklySchedule,
    /// cooling setpoint, in deg C
    pub cooling_setpoint: WeeklySchedule,
    /// heating setpoint, in deg C
    pub heating_setpoint: WeeklySchedule,
    /// peak equipment gain, in W/m2
    pub equipment_gain: f64,
    /// peak lighting gain, in W/m2
    pub lighting_gain: f64,
    /// peak occupant density, in people/m2
    pub occupant_density: f64,
}

impl SchDef {
    pub fn internal_gains(
        &self,
        day_type: DayType,
        hour_of_day: usize,
        fractions: &InternalGainFractions,
    ) -> InternalGains {
        let equipment = self.equipment_gain * self.equipment.value(day_type, hour_of_day);
        let lighting = self.lighting_gain * self.lighting.value(day_type, hour_of_day);
        let occupants = self.occupant_density * self.occupancy.value(day_type, hour_of_day);
        let occupant_heat = fractions.sensible_per_occupant * occupants;
        let occupant_sensible = occupant_heat * (1. - fractions.occupant_latent);

        let total = equipment + lighting + occupant_sensible;
        if total <= 0. {
            return Default::default();
        }

        InternalGains {
            total,
            radiant_fraction: (fractions.lighting_radiant * lighting
                + fractions.equipment_radiant * equipment
                + fractions.occupant_radiant * occupant_sensible)
                / total,
            latent_fraction: fractions.occupant_latent * occupant_heat / total,
        }
    }

    /// Cooling and heating setpoints, in K
    pub fn setpoints(&self, day_type: DayType, hour_of_day: usize) -> anyhow::Result<(f64, f64)> {
        Ok((
            celsius_to_kelvin(self.cooling_setpoint.value(day_type, hour_of_day))?,
            celsius_to_kelvin(self.heating_setpoint.value(day_type, hour_of_day))?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use strum::IntoEnumIterator;

    #[fixture]
    fn office() -> SchDef {
        let mut weekday = [0.1; 24];
        weekday[8..18].fill(0.9);
        SchDef {
            equipment: WeeklySchedule::new(weekday, [0.1; 24], [0.1; 24]),
            lighting: WeeklySchedule::new(weekday, [0.1; 24], [0.1; 24]),
            occupancy: WeeklySchedule::new(weekday, [0.; 24], [0.; 24]),
            cooling_setpoint: WeeklySchedule::constant(24.),
            heating_setpoint: WeeklySchedule::constant(21.),
            equipment_gain: 10.,
            lighting_gain: 8.,
            occupant_density: 0.05,
        }
    }

    #[rstest]
    fn should_look_up_hourly_values(office: SchDef) {
        assert_eq!(office.equipment.value(DayType::Weekday, 9), 0.9);
        assert_eq!(office.equipment.value(DayType::Weekday, 33), 0.9);
        assert_eq!(office.equipment.value(DayType::Sunday, 9), 0.1);
        assert_eq!(DayType::iter().count(), 3);
    }

    #[rstest]
    fn should_split_internal_gains(office: SchDef) {
        let fractions = InternalGainFractions::default();
        let gains = office.internal_gains(DayType::Weekday, 10, &fractions);
        // 9 W equipment + 7.2 W lighting + 0.045 people * 70 W sensible
        assert_relative_eq!(gains.total, 19.35, max_relative = 1e-12);
        assert_relative_eq!(gains.latent_fraction, 0.3 * 4.5 / 19.35, max_relative = 1e-12);
        assert_relative_eq!(
            gains.radiant_fraction,
            (0.7 * 7.2 + 0.5 * 9. + 0.2 * 3.15) / 19.35,
            max_relative = 1e-12
        );
    }

    #[rstest]
    fn should_return_no_gains_when_everything_is_off(mut office: SchDef) {
        office.equipment_gain = 0.;
        office.lighting_gain = 0.;
        let gains = office.internal_gains(DayType::Sunday, 3, &Default::default());
        assert_eq!(gains, InternalGains::default());
    }

    #[rstest]
    fn should_convert_setpoints_to_kelvin(office: SchDef) {
        let (cool, heat) = office.setpoints(DayType::Saturday, 12).unwrap();
        assert_relative_eq!(cool, 297.15);
        assert_relative_eq!(heat, 294.15);
    }

    #[rstest]
    fn should_report_out_of_range_schedule_values() {
        let mut schedule = WeeklySchedule::constant(0.5);
        schedule.saturday[3] = 1.5;
        let mut report = ValidationReport::new();
        schedule.collect_fraction_violations("traffic.schedule", &mut report);
        assert_eq!(report.len(), 1);
        assert_eq!(report.violations()[0].field, "traffic.schedule.saturday[3]");
    }
}
