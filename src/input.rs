use crate::core::schedule::WeeklySchedule;
use crate::core::units::HOURS_PER_DAY;
use crate::errors::{ConfigError, ValidationReport};
use crate::simulation_time::SimParam;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::fmt::{Display, Formatter};
use std::io::Read;
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

pub fn ingest_for_processing(json: impl Read) -> Result<UwgInput, ConfigError> {
    Ok(serde_json::from_reader(json)?)
}

/// Validated-construction contract shared by every parameter object: report
/// every offending field under `path` rather than stopping at the first.
pub trait ParameterSet {
    fn collect_violations(&self, path: &str, report: &mut ValidationReport);

    fn validate_parameters(&self, path: &str) -> Result<(), ConfigError> {
        let mut report = ValidationReport::new();
        self.collect_violations(path, &mut report);
        report.into_result()
    }
}

/// A value in the closed range [0, 1]: albedos, coverages and ratios.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, PartialOrd, Serialize, Validate)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Fraction(
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    f64,
);

impl Fraction {
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        let fraction = Self(value);
        let mut report = ValidationReport::new();
        fraction.collect("fraction", &mut report);
        report.into_result().map(|_| fraction)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Record a violation when the value lies outside [0, 1]. Deserialization
    /// does not enforce the range, so every holder of a Fraction calls this.
    pub(crate) fn collect(&self, field: impl Into<String>, report: &mut ValidationReport) {
        if self.0.is_nan() || self.validate().is_err() {
            report.push(field, self.0, "within [0, 1]");
        }
    }
}

impl Display for Fraction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    PartialEq,
    Serialize,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive)]
pub enum BuildingProgram {
    FullServiceRestaurant,
    Hospital,
    LargeHotel,
    LargeOffice,
    #[serde(alias = "MedOffice")]
    #[strum(to_string = "MediumOffice", serialize = "MedOffice")]
    MediumOffice,
    MidRiseApartment,
    OutPatient,
    PrimarySchool,
    QuickServiceRestaurant,
    SecondarySchool,
    SmallHotel,
    SmallOffice,
    StandAloneRetail,
    StripMall,
    SuperMarket,
    Warehouse,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    PartialEq,
    Serialize,
    StrumDisplay,
)]
pub enum BuiltEra {
    Pre1980s,
    #[serde(rename = "1980sPresent", alias = "1980s-Present")]
    #[strum(to_string = "1980sPresent", serialize = "1980s-Present")]
    Post1980s,
    NewConstruction,
}

/// ASHRAE climate zones. Moisture sub-zones without their own reference
/// data are accepted as aliases of the closest zone.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    PartialEq,
    Serialize,
    StrumDisplay,
)]
pub enum ClimateZone {
    #[serde(rename = "1A", alias = "1", alias = "1B", alias = "1C")]
    #[strum(to_string = "1A", serialize = "1", serialize = "1B", serialize = "1C")]
    Zone1A,
    #[serde(rename = "2A", alias = "2", alias = "2C")]
    #[strum(to_string = "2A", serialize = "2", serialize = "2C")]
    Zone2A,
    #[serde(rename = "2B")]
    #[strum(to_string = "2B")]
    Zone2B,
    #[serde(rename = "3A", alias = "3")]
    #[strum(to_string = "3A", serialize = "3")]
    Zone3A,
    #[serde(rename = "3B-CA")]
    #[strum(to_string = "3B-CA")]
    Zone3BCoast,
    #[serde(rename = "3B")]
    #[strum(to_string = "3B")]
    Zone3B,
    #[serde(rename = "3C")]
    #[strum(to_string = "3C")]
    Zone3C,
    #[serde(rename = "4A", alias = "4")]
    #[strum(to_string = "4A", serialize = "4")]
    Zone4A,
    #[serde(rename = "4B")]
    #[strum(to_string = "4B")]
    Zone4B,
    #[serde(rename = "4C")]
    #[strum(to_string = "4C")]
    Zone4C,
    #[serde(rename = "5A", alias = "5", alias = "5C")]
    #[strum(to_string = "5A", serialize = "5", serialize = "5C")]
    Zone5A,
    #[serde(rename = "5B")]
    #[strum(to_string = "5B")]
    Zone5B,
    #[serde(rename = "6A", alias = "6", alias = "6C")]
    #[strum(to_string = "6A", serialize = "6", serialize = "6C")]
    Zone6A,
    #[serde(rename = "6B")]
    #[strum(to_string = "6B")]
    Zone6B,
    #[serde(rename = "7", alias = "7A", alias = "7B", alias = "7C")]
    #[strum(to_string = "7", serialize = "7A", serialize = "7B", serialize = "7C")]
    Zone7,
    #[serde(rename = "8", alias = "8A", alias = "8B", alias = "8C")]
    #[strum(to_string = "8", serialize = "8A", serialize = "8B", serialize = "8C")]
    Zone8,
}

/// Complete run configuration, as read from JSON.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UwgInput {
    pub city: City,
    pub typologies: Vec<TypologyInput>,
    pub traffic: TrafficPar,
    #[serde(default)]
    pub vegetation: VegetationPar,
    #[serde(default)]
    pub pavement: PavementPar,
    #[serde(default)]
    pub reference_site: RefEpwSitePar,
    #[serde(default)]
    pub boundary_layer: BoundaryLayerPar,
    #[serde(default)]
    pub simulation: SimulationInput,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl ParameterSet for UwgInput {
    fn collect_violations(&self, _path: &str, report: &mut ValidationReport) {
        self.city.collect_violations("city", report);
        if self.typologies.is_empty() {
            report.push("typologies", "an empty list", "at least one typology");
        }
        for (i, typology) in self.typologies.iter().enumerate() {
            typology.collect_violations(&format!("typologies[{i}]"), report);
        }
        if self.city.typology_ratios.len() != self.typologies.len() {
            report.push(
                "city.typology_ratios",
                format!("{} ratios", self.city.typology_ratios.len()),
                format!("one ratio per typology ({})", self.typologies.len()),
            );
        }
        self.traffic.collect_violations("traffic", report);
        self.vegetation.collect_violations("vegetation", report);
        self.pavement.collect_violations("pavement", report);
        self.reference_site
            .collect_violations("reference_site", report);
        self.boundary_layer
            .collect_violations("boundary_layer", report);
        self.simulation.collect_violations("simulation", report);
        self.solver.collect_violations("solver", report);

        // the canyon top must sit well inside the rural diffusion column
        let inversion = self.boundary_layer.inversion_height;
        if self.city.average_height > 0. && 2. * self.city.average_height >= inversion {
            report.push(
                "city.average_height",
                self.city.average_height,
                format!("below half the inversion height ({inversion})"),
            );
        }
    }
}

fn default_characteristic_length() -> f64 {
    500.
}

/// Neighbourhood morphology and land cover.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct City {
    /// floor-area weighted average building height, in m
    pub average_height: f64,
    /// building footprint over site area
    pub site_coverage_ratio: Fraction,
    /// facade area over site area
    pub facade_to_site_ratio: f64,
    /// floor-area fraction of each typology, in the order of `typologies`
    pub typology_ratios: Vec<Fraction>,
    pub climate_zone: ClimateZone,
    #[serde(default = "default_characteristic_length")]
    pub characteristic_length: f64,
    #[serde(default)]
    pub tree_coverage: Fraction,
    #[serde(default)]
    pub grass_coverage: Fraction,
}

impl ParameterSet for City {
    fn collect_violations(&self, path: &str, report: &mut ValidationReport) {
        report.check_positive(format!("{path}.average_height"), self.average_height);
        self.site_coverage_ratio
            .collect(format!("{path}.site_coverage_ratio"), report);
        report.check_positive(
            format!("{path}.site_coverage_ratio"),
            self.site_coverage_ratio.value(),
        );
        if self.site_coverage_ratio.value() >= 1. {
            report.push(
                format!("{path}.site_coverage_ratio"),
                self.site_coverage_ratio,
                "below 1, leaving room for streets",
            );
        }
        report.check_positive(
            format!("{path}.facade_to_site_ratio"),
            self.facade_to_site_ratio,
        );
        for (i, ratio) in self.typology_ratios.iter().enumerate() {
            ratio.collect(format!("{path}.typology_ratios[{i}]"), report);
        }
        let total: f64 = self.typology_ratios.iter().map(Fraction::value).sum();
        if !self.typology_ratios.is_empty() && !is_close!(total, 1., abs_tol = 1e-3) {
            report.push(format!("{path}.typology_ratios"), format!("summing to {total}"), "summing to 1");
        }
        report.check_positive(
            format!("{path}.characteristic_length"),
            self.characteristic_length,
        );
        self.tree_coverage
            .collect(format!("{path}.tree_coverage"), report);
        self.grass_coverage
            .collect(format!("{path}.grass_coverage"), report);
        let vegetated = self.tree_coverage.value() + self.grass_coverage.value();
        if vegetated > 1. {
            report.push(
                format!("{path}.tree_coverage"),
                vegetated,
                "at most 1 together with grass_coverage",
            );
        }
    }
}

fn default_floor_to_floor() -> f64 {
    3.05
}

fn default_fraction_to_canyon() -> Fraction {
    Fraction(0.5)
}

/// One building archetype. Unset envelope properties come from the
/// reference building of the program and era.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TypologyInput {
    pub program: BuildingProgram,
    pub era: BuiltEra,
    /// in m
    #[serde(default = "default_floor_to_floor")]
    pub floor_to_floor: f64,
    #[serde(default)]
    pub glazing_ratio: Option<Fraction>,
    #[serde(default)]
    pub shgc: Option<Fraction>,
    #[serde(default)]
    pub wall_albedo: Option<Fraction>,
    #[serde(default)]
    pub roof_albedo: Option<Fraction>,
    #[serde(default)]
    pub roof_vegetation: Fraction,
    /// share of the HVAC waste heat rejected into the canyon rather than above the roofs
    #[serde(default = "default_fraction_to_canyon")]
    pub fraction_to_canyon: Fraction,
}

impl TypologyInput {
    pub fn name(&self) -> String {
        format!("{} {}", self.program, self.era)
    }
}

impl ParameterSet for TypologyInput {
    fn collect_violations(&self, path: &str, report: &mut ValidationReport) {
        report.check_positive(format!("{path}.floor_to_floor"), self.floor_to_floor);
        for (field, value) in [
            ("glazing_ratio", self.glazing_ratio),
            ("shgc", self.shgc),
            ("wall_albedo", self.wall_albedo),
            ("roof_albedo", self.roof_albedo),
            ("roof_vegetation", Some(self.roof_vegetation)),
            ("fraction_to_canyon", Some(self.fraction_to_canyon)),
        ] {
            if let Some(fraction) = value {
                fraction.collect(format!("{path}.{field}"), report);
            }
        }
    }
}

const DEFAULT_TRAFFIC_WEEKDAY: [f64; HOURS_PER_DAY as usize] = [
    0.2, 0.2, 0.2, 0.2, 0.2, 0.4, 0.7, 0.9, 0.9, 0.6, 0.6, 0.6, 0.6, 0.6, 0.7, 0.8, 0.9, 0.9, 0.8,
    0.8, 0.7, 0.3, 0.2, 0.2,
];
const DEFAULT_TRAFFIC_SATURDAY: [f64; HOURS_PER_DAY as usize] = [
    0.2, 0.2, 0.2, 0.2, 0.2, 0.3, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.6, 0.7, 0.7, 0.7, 0.7,
    0.5, 0.4, 0.3, 0.2, 0.2,
];
const DEFAULT_TRAFFIC_SUNDAY: [f64; HOURS_PER_DAY as usize] = [
    0.2, 0.2, 0.2, 0.2, 0.2, 0.3, 0.4, 0.4, 0.4, 0.4, 0.4, 0.4, 0.4, 0.4, 0.4, 0.4, 0.4, 0.4, 0.4,
    0.4, 0.3, 0.3, 0.2, 0.2,
];

fn default_traffic_schedule() -> WeeklySchedule {
    WeeklySchedule::new(
        DEFAULT_TRAFFIC_WEEKDAY,
        DEFAULT_TRAFFIC_SATURDAY,
        DEFAULT_TRAFFIC_SUNDAY,
    )
}

/// Anthropogenic heat from traffic, in W/m2 of urban area at peak.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TrafficPar {
    pub sensible_heat: f64,
    #[serde(default)]
    pub latent_heat: f64,
    #[serde(default = "default_traffic_schedule")]
    pub schedule: WeeklySchedule,
}

impl ParameterSet for TrafficPar {
    fn collect_violations(&self, path: &str, report: &mut ValidationReport) {
        report.check_non_negative(format!("{path}.sensible_heat"), self.sensible_heat);
        report.check_non_negative(format!("{path}.latent_heat"), self.latent_heat);
        self.schedule
            .collect_fraction_violations(&format!("{path}.schedule"), report);
    }
}

/// Urban vegetation. A start or end month of 0 is derived from the weather file.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VegetationPar {
    pub albedo: Fraction,
    pub start_month: u32,
    pub end_month: u32,
    pub tree_latent_fraction: Fraction,
    pub grass_latent_fraction: Fraction,
}

impl Default for VegetationPar {
    fn default() -> Self {
        Self {
            albedo: Fraction(0.25),
            start_month: 0,
            end_month: 0,
            tree_latent_fraction: Fraction(0.7),
            grass_latent_fraction: Fraction(0.5),
        }
    }
}

impl VegetationPar {
    pub fn autocalculated(&self) -> bool {
        self.start_month == 0 || self.end_month == 0
    }
}

impl ParameterSet for VegetationPar {
    fn collect_violations(&self, path: &str, report: &mut ValidationReport) {
        self.albedo.collect(format!("{path}.albedo"), report);
        for (field, month) in [("start_month", self.start_month), ("end_month", self.end_month)] {
            if month > 12 {
                report.push(format!("{path}.{field}"), month, "within [0, 12], 0 to autocalculate");
            }
        }
        self.tree_latent_fraction
            .collect(format!("{path}.tree_latent_fraction"), report);
        self.grass_latent_fraction
            .collect(format!("{path}.grass_latent_fraction"), report);
    }
}

/// Road construction: one homogeneous layer over deep soil.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PavementPar {
    pub albedo: Fraction,
    /// in m
    pub thickness: f64,
    /// in W/(m.K)
    pub conductivity: f64,
    /// in J/(m3.K)
    pub volumetric_heat_capacity: f64,
}

impl Default for PavementPar {
    fn default() -> Self {
        Self {
            albedo: Fraction(0.1),
            thickness: 0.5,
            conductivity: 1.,
            volumetric_heat_capacity: 1.6e6,
        }
    }
}

impl ParameterSet for PavementPar {
    fn collect_violations(&self, path: &str, report: &mut ValidationReport) {
        self.albedo.collect(format!("{path}.albedo"), report);
        report.check_positive(format!("{path}.thickness"), self.thickness);
        report.check_positive(format!("{path}.conductivity"), self.conductivity);
        report.check_positive(
            format!("{path}.volumetric_heat_capacity"),
            self.volumetric_heat_capacity,
        );
    }
}

/// The rural site where the weather file was recorded.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefEpwSitePar {
    /// in m
    pub obstacle_height: f64,
    pub vegetation_coverage: Fraction,
    /// in m
    pub temperature_height: f64,
    /// in m
    pub wind_height: f64,
}

impl Default for RefEpwSitePar {
    fn default() -> Self {
        Self {
            obstacle_height: 0.1,
            vegetation_coverage: Fraction(0.9),
            temperature_height: 10.,
            wind_height: 10.,
        }
    }
}

impl ParameterSet for RefEpwSitePar {
    fn collect_violations(&self, path: &str, report: &mut ValidationReport) {
        report.check_positive(format!("{path}.obstacle_height"), self.obstacle_height);
        self.vegetation_coverage
            .collect(format!("{path}.vegetation_coverage"), report);
        report.check_positive(
            format!("{path}.temperature_height"),
            self.temperature_height,
        );
        // the log wind profile starts above displacement height plus roughness length
        if self.wind_height.is_nan() || self.wind_height <= self.obstacle_height {
            report.push(
                format!("{path}.wind_height"),
                self.wind_height,
                format!("above the obstacle height ({})", self.obstacle_height),
            );
        }
    }
}

/// Heights and mixing coefficients of the urban boundary layer.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoundaryLayerPar {
    /// in m
    pub day_height: f64,
    /// in m
    pub night_height: f64,
    /// top of the rural diffusion column, in m
    pub inversion_height: f64,
    pub circulation_coefficient: f64,
    pub exchange_coefficient: f64,
}

impl Default for BoundaryLayerPar {
    fn default() -> Self {
        Self {
            day_height: 1000.,
            night_height: 80.,
            inversion_height: 150.,
            circulation_coefficient: 1.2,
            exchange_coefficient: 1.,
        }
    }
}

/// Shallowest column that still leaves three rural layers above the surface one
const MIN_INVERSION_HEIGHT: f64 = 10.;

impl ParameterSet for BoundaryLayerPar {
    fn collect_violations(&self, path: &str, report: &mut ValidationReport) {
        report.check_positive(format!("{path}.day_height"), self.day_height);
        report.check_positive(format!("{path}.night_height"), self.night_height);
        if self.night_height > self.day_height {
            report.push(
                format!("{path}.night_height"),
                self.night_height,
                format!("at most the day height ({})", self.day_height),
            );
        }
        if self.inversion_height.is_nan() || self.inversion_height < MIN_INVERSION_HEIGHT {
            report.push(
                format!("{path}.inversion_height"),
                self.inversion_height,
                format!("at least {MIN_INVERSION_HEIGHT}"),
            );
        }
        report.check_positive(
            format!("{path}.circulation_coefficient"),
            self.circulation_coefficient,
        );
        report.check_positive(
            format!("{path}.exchange_coefficient"),
            self.exchange_coefficient,
        );
    }
}

/// Simulated period and time steps.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationInput {
    pub start_month: u32,
    pub start_day: u32,
    pub days: u32,
    /// in seconds
    pub timestep: f64,
    /// in seconds
    pub weather_timestep: f64,
    /// size HVAC capacities so that loads are always met
    pub autosize: bool,
}

impl Default for SimulationInput {
    fn default() -> Self {
        Self {
            start_month: 1,
            start_day: 1,
            days: 365,
            timestep: 300.,
            weather_timestep: 3600.,
            autosize: false,
        }
    }
}

impl SimulationInput {
    pub fn sim_param(&self) -> Result<SimParam, ConfigError> {
        SimParam::new(
            self.timestep,
            self.weather_timestep,
            self.start_month,
            self.start_day,
            self.days,
        )
    }
}

impl ParameterSet for SimulationInput {
    fn collect_violations(&self, path: &str, report: &mut ValidationReport) {
        SimParam::collect_violations(
            self.timestep,
            self.weather_timestep,
            self.start_month,
            self.start_day,
            self.days,
            path,
            report,
        );
    }
}

/// Canyon fixed-point iteration controls.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// largest change of canyon air temperature between iterations accepted as converged, in K
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_iterations: 40,
        }
    }
}

impl ParameterSet for SolverConfig {
    fn collect_violations(&self, path: &str, report: &mut ValidationReport) {
        report.check_positive(format!("{path}.tolerance"), self.tolerance);
        if self.max_iterations == 0 {
            report.push(format!("{path}.max_iterations"), 0, "at least 1");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;
    use std::str::FromStr;

    /// The single-typology neighbourhood used by the scenario tests.
    pub(crate) fn summer_day_input() -> serde_json::Value {
        json!({
            "city": {
                "average_height": 20.0,
                "site_coverage_ratio": 0.45,
                "facade_to_site_ratio": 0.8,
                "typology_ratios": [1.0],
                "climate_zone": "5A"
            },
            "typologies": [
                {"program": "MidRiseApartment", "era": "1980sPresent"}
            ],
            "traffic": {"sensible_heat": 8.0},
            "boundary_layer": {
                "day_height": 1000.0,
                "night_height": 80.0,
                "inversion_height": 150.0,
                "circulation_coefficient": 1.2,
                "exchange_coefficient": 1.0
            },
            "simulation": {"start_month": 7, "start_day": 15, "days": 1}
        })
    }

    #[fixture]
    fn input() -> UwgInput {
        serde_json::from_value(summer_day_input()).unwrap()
    }

    #[rstest]
    fn should_fill_in_documented_defaults(input: UwgInput) {
        assert_eq!(input.vegetation.albedo.value(), 0.25);
        assert!(input.vegetation.autocalculated());
        assert_eq!(input.pavement.albedo.value(), 0.1);
        assert_eq!(input.pavement.thickness, 0.5);
        assert_eq!(input.reference_site.vegetation_coverage.value(), 0.9);
        assert_eq!(input.city.characteristic_length, 500.);
        assert_eq!(input.typologies[0].floor_to_floor, 3.05);
        assert_eq!(input.typologies[0].fraction_to_canyon.value(), 0.5);
        assert_eq!(input.typologies[0].glazing_ratio, None);
        assert_eq!(input.traffic.latent_heat, 0.);
        assert_eq!(input.traffic.schedule.weekday[7], 0.9);
        assert_eq!(input.traffic.schedule.sunday[20], 0.3);
        assert_eq!(input.solver.max_iterations, 40);
        assert!(input.validate_parameters("").is_ok());
    }

    #[rstest]
    #[case(0., "greater than 0")]
    #[case(1., "below 1, leaving room for streets")]
    fn should_reject_site_coverage_without_buildings_or_streets(
        mut input: UwgInput,
        #[case] coverage: f64,
        #[case] expected: &str,
    ) {
        input.city.site_coverage_ratio = Fraction(coverage);

        let Err(ConfigError::Invalid(report)) = input.validate_parameters("") else {
            panic!("site coverage of {coverage} should have been rejected");
        };
        let violations = report.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "city.site_coverage_ratio");
        assert_eq!(violations[0].expected, expected);
    }

    #[rstest]
    fn should_report_both_violations_at_once(mut input: UwgInput) {
        input.pavement.thickness = -0.5;
        input.typologies[0].wall_albedo = Some(Fraction(1.3));

        let Err(ConfigError::Invalid(report)) = input.validate_parameters("") else {
            panic!("configuration should have been rejected");
        };
        let fields: Vec<_> = report.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["typologies[0].wall_albedo", "pavement.thickness"]);
        assert_eq!(report.violations()[0].expected, "within [0, 1]");
    }

    #[rstest]
    fn should_reject_mismatched_typology_ratios(mut input: UwgInput) {
        input.city.typology_ratios = vec![Fraction(0.5), Fraction(0.3)];
        let Err(ConfigError::Invalid(report)) = input.validate_parameters("") else {
            panic!("configuration should have been rejected");
        };
        let fields: Vec<_> = report.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["city.typology_ratios", "city.typology_ratios"]);
    }

    #[rstest]
    fn should_reject_unknown_fields() {
        let mut value = summer_day_input();
        value["pavement"] = json!({"albedo": 0.2, "colour": "grey"});
        assert!(serde_json::from_value::<UwgInput>(value).is_err());
    }

    #[rstest]
    #[case("1", ClimateZone::Zone1A)]
    #[case("1C", ClimateZone::Zone1A)]
    #[case("3B-CA", ClimateZone::Zone3BCoast)]
    #[case("5C", ClimateZone::Zone5A)]
    #[case("7B", ClimateZone::Zone7)]
    #[case("8", ClimateZone::Zone8)]
    fn should_parse_climate_zone_aliases(#[case] label: &str, #[case] zone: ClimateZone) {
        assert_eq!(ClimateZone::from_str(label).unwrap(), zone);
        assert_eq!(
            serde_json::from_value::<ClimateZone>(json!(label)).unwrap(),
            zone
        );
    }

    #[rstest]
    fn should_name_enumerations_as_the_reference_data_does() {
        assert_eq!(ClimateZone::Zone3BCoast.to_string(), "3B-CA");
        assert_eq!(BuiltEra::Post1980s.to_string(), "1980sPresent");
        assert_eq!(
            BuildingProgram::from_str("MedOffice").unwrap(),
            BuildingProgram::MediumOffice
        );
        assert_eq!(
            BuildingProgram::from_str("largeoffice").unwrap(),
            BuildingProgram::LargeOffice
        );
        assert_eq!(
            serde_json::from_value::<BuiltEra>(json!("1980sPresent")).unwrap(),
            BuiltEra::Post1980s
        );
    }

    #[rstest]
    fn should_bound_fractions() {
        assert!(Fraction::new(0.3).is_ok());
        assert!(Fraction::new(-0.1).is_err());
        assert!(Fraction::new(f64::NAN).is_err());
    }
}
