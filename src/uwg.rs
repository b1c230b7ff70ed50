// Top-level orchestration of a run: reads the rural weather, builds every
// sub-model from the input parameter objects, marches through the simulated
// period and writes the morphed weather file.

use crate::core::building::{BemDef, Building, BuildingParameters};
use crate::core::element::Element;
use crate::core::forcing::Weather;
use crate::core::material_properties::Material;
use crate::core::param::Param;
use crate::core::reference_buildings::{reference_building, Construction};
use crate::core::rsm::RsmDef;
use crate::core::solar_calcs::{SiteLocation, SolarCalcs};
use crate::core::ubl::UblDef;
use crate::core::ucm::{CanyonGeometry, UcmDef};
use crate::core::units::{kelvin_to_celsius, psychrometrics};
use crate::core::urbflux::UrbanSystem;
use crate::errors::{UwgCoreError, UwgError};
use crate::input::{Fraction, ParameterSet, TypologyInput, UwgInput};
use crate::read_weather_file::{EpwFile, MorphedRecord};
use crate::simulation_time::SimParam;
use crate::statistics::{mean, monthly_means};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strum_macros::{Display, IntoStaticStr};
use tracing::{debug, info, warn};

/// Building envelope and indoor air start at 20 deg C
const INITIAL_BUILDING_TEMPERATURE: f64 = 293.15; // K
const GROUND_EMISSIVITY: f64 = 0.95;
/// Monthly mean temperature above which vegetation is taken to be active, in deg C
const VEGETATION_THRESHOLD: f64 = 10.;
const OUTPUT_SUFFIX: &str = "_UWG";

#[derive(Clone, Copy, Debug, Display, Eq, IntoStaticStr, PartialEq)]
pub enum RunState {
    Uninitialized,
    Initialized,
    Stepping,
    Completed,
    Failed,
}

/// Cooperative cancellation flag, checked once per simulated hour.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    pub completed_hours: usize,
    pub total_hours: usize,
}

/// Canyon air state at the end of one weather period.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HourlyRecord {
    pub month: u32,
    pub day: u32,
    /// EPW hour, 1-24
    pub hour: u32,
    pub canyon_temp_c: f64,
    pub canyon_spec_hum: f64,
    pub canyon_rel_hum: f64,
    pub canyon_dew_point_c: f64,
    pub ubl_temp_c: f64,
    pub rural_temp_c: f64,
    pub wind_speed: f64,
    /// whether every step of the hour met the canyon iteration tolerance
    pub converged: bool,
    /// most canyon iterations needed by a step of the hour
    pub iterations: usize,
}

/// Envelope properties of the whole neighbourhood, weighted by floor-area fraction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CityAverages {
    pub floor_height: f64,
    pub fraction_to_canyon: f64,
    pub glazing_ratio: f64,
    pub shgc: f64,
    pub wall_albedo: f64,
    pub roof_albedo: f64,
    pub roof_vegetation: f64,
}

#[derive(Debug)]
pub struct Uwg {
    epw_path: Option<PathBuf>,
    input: UwgInput,
    state: RunState,
    epw: Option<EpwFile>,
    sim: Option<SimParam>,
    weather: Option<Weather>,
    param: Option<Param>,
    bems: Vec<BemDef>,
    averages: CityAverages,
    system: Option<UrbanSystem>,
    results: Vec<HourlyRecord>,
}

impl Uwg {
    pub fn new(epw_path: impl Into<PathBuf>, input: UwgInput) -> Self {
        Self::with_parts(Some(epw_path.into()), None, input)
    }

    /// Build from weather file contents already in memory.
    pub fn from_epw_text(text: &str, input: UwgInput) -> Result<Self, UwgError> {
        let epw = EpwFile::parse(text)?;
        Ok(Self::with_parts(None, Some(epw), input))
    }

    fn with_parts(epw_path: Option<PathBuf>, epw: Option<EpwFile>, input: UwgInput) -> Self {
        Self {
            epw_path,
            input,
            state: RunState::Uninitialized,
            epw,
            sim: None,
            weather: None,
            param: None,
            bems: vec![],
            averages: Default::default(),
            system: None,
            results: vec![],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn input(&self) -> &UwgInput {
        &self.input
    }

    pub fn param(&self) -> Option<&Param> {
        self.param.as_ref()
    }

    pub fn city_averages(&self) -> &CityAverages {
        &self.averages
    }

    pub fn system(&self) -> Option<&UrbanSystem> {
        self.system.as_ref()
    }

    pub fn hourly_results(&self) -> &[HourlyRecord] {
        &self.results
    }

    fn require(&self, expected: RunState) -> Result<(), UwgError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(UwgError::InvalidState {
                expected: expected.into(),
                found: self.state.into(),
            })
        }
    }

    /// Mark the run as failed on the way out of an erroring operation
    fn fail<T>(&mut self, result: Result<T, UwgError>) -> Result<T, UwgError> {
        if result.is_err() {
            self.state = RunState::Failed;
        }
        result
    }

    pub fn read_epw(&mut self) -> Result<(), UwgError> {
        self.require(RunState::Uninitialized)?;
        if self.epw.is_some() {
            return Ok(());
        }
        let Some(path) = self.epw_path.clone() else {
            return Err(UwgError::InvalidState {
                expected: "given a weather file",
                found: self.state.into(),
            });
        };
        let epw = EpwFile::from_path(&path).map_err(UwgError::from);
        let epw = self.fail(epw)?;
        info!(
            "Read {} weather records from {}",
            epw.records().len(),
            path.display()
        );
        self.epw = Some(epw);
        Ok(())
    }

    /// Validate every parameter object, reporting all offending fields at once.
    pub fn check_required_inputs(&mut self) -> Result<(), UwgError> {
        self.require(RunState::Uninitialized)?;
        let checked = self
            .input
            .validate_parameters("")
            .and_then(|_| self.input.simulation.sim_param())
            .map_err(UwgError::from);
        let sim = self.fail(checked)?;
        debug!(
            "Configuration valid: {} typologies over {} days",
            self.input.typologies.len(),
            sim.days()
        );
        self.sim = Some(sim);
        Ok(())
    }

    /// Build one building energy model per typology from the reference data
    /// of its program, era and the city's climate zone.
    pub fn init_bem_obj(&mut self) -> Result<(), UwgError> {
        self.require(RunState::Uninitialized)?;
        let (Some(epw), Some(sim)) = (&self.epw, &self.sim) else {
            return Err(UwgError::InvalidState {
                expected: "read and validated",
                found: self.state.into(),
            });
        };
        let weather = Weather::new(
            epw,
            sim.first_weather_record(),
            sim.weather_records(),
            Param::default().wind_min,
        )
        .map_err(UwgError::from);
        let weather = self.fail(weather)?;
        let initial_humidity = weather.forcing(0).hum;

        let bems = self
            .input
            .typologies
            .iter()
            .zip(&self.input.city.typology_ratios)
            .map(|(typology, ratio)| {
                build_bem(
                    typology,
                    ratio.value(),
                    &self.input,
                    initial_humidity,
                )
            })
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(|e| UwgError::FailureInCalculation(UwgCoreError::new(e)));
        self.bems = self.fail(bems)?;
        self.averages = city_averages(&self.input, &self.bems);
        self.weather = Some(weather);
        debug!("Built {} building energy models", self.bems.len());
        Ok(())
    }

    /// Assemble the run constants and the canyon, rural and boundary layer
    /// models, leaving the run ready to simulate.
    pub fn instantiate_input(&mut self) -> Result<(), UwgError> {
        self.require(RunState::Uninitialized)?;
        let assembled = self.assemble();
        let (ucm, rsm, rural, param) = self.fail(assembled)?;
        let start = ucm.canyon_temperature();
        let humidity = ucm.canyon_humidity();
        self.system = Some(UrbanSystem {
            ucm,
            ubl: UblDef::new(param.char_length, start, humidity),
            rsm,
            bems: std::mem::take(&mut self.bems),
            rural,
            solar: SolarCalcs::default(),
        });
        self.param = Some(param);
        self.state = RunState::Initialized;
        Ok(())
    }

    fn assemble(&self) -> Result<(UcmDef, RsmDef, Element, Param), UwgError> {
        let (Some(epw), Some(weather)) = (&self.epw, &self.weather) else {
            return Err(UwgError::InvalidState {
                expected: "provided with building models",
                found: self.state.into(),
            });
        };
        let core_error = |e: anyhow::Error| UwgError::FailureInCalculation(UwgCoreError::new(e));
        let input = &self.input;
        let (veg_start, veg_end) = vegetation_season(input, epw);
        let bl = &input.boundary_layer;
        let site = &input.reference_site;
        let param = Param {
            day_bl_height: bl.day_height,
            night_bl_height: bl.night_height,
            ref_height: bl.inversion_height,
            temp_height: site.temperature_height,
            wind_height: site.wind_height,
            rural_obstacle_height: site.obstacle_height,
            circ_coeff: bl.circulation_coefficient,
            ex_coeff: bl.exchange_coefficient,
            char_length: input.city.characteristic_length,
            veg_albedo: input.vegetation.albedo.value(),
            tree_latent_fraction: input.vegetation.tree_latent_fraction.value(),
            grass_latent_fraction: input.vegetation.grass_latent_fraction.value(),
            veg_start,
            veg_end,
            tolerance: input.solver.tolerance,
            max_iterations: input.solver.max_iterations,
            ..Default::default()
        };

        let start = weather.forcing(0);
        let pavement = &input.pavement;
        let material = Arc::new(Material::new(
            "pavement",
            pavement.conductivity,
            pavement.volumetric_heat_capacity,
        ));
        let ground = |name: &str, vegetation: Fraction| {
            Element::new(
                name,
                pavement.albedo.value(),
                GROUND_EMISSIVITY,
                &[pavement.thickness],
                &[Arc::clone(&material)],
                vegetation.value(),
                true,
                start.temp,
            )
            .map_err(|e| core_error(e.into()))
        };
        let road = ground("road", input.city.grass_coverage)?;
        let rural = ground("rural", site.vegetation_coverage)?;

        let ucm = UcmDef::new(
            CanyonGeometry {
                bld_height: input.city.average_height,
                bld_density: input.city.site_coverage_ratio.value(),
                ver_to_hor: input.city.facade_to_site_ratio,
                tree_coverage: input.city.tree_coverage.value(),
            },
            self.averages.wall_albedo,
            road,
            start.temp,
            start.hum,
            start.wind,
        );
        let location = epw.location();
        let rsm = RsmDef::new(
            SiteLocation {
                latitude: location.latitude,
                longitude: location.longitude,
                gmt_offset: location.time_zone,
            },
            site.obstacle_height,
            start.temp,
            &param,
        )
        .map_err(core_error)?;

        info!(
            "Canyon aspect ratio {:.2}, width {:.1} m, vegetation active from month {veg_start} to {veg_end}",
            ucm.aspect_ratio(),
            ucm.canyon_width()
        );
        Ok((ucm, rsm, rural, param))
    }

    /// Give every typology enough HVAC capacity to meet its loads, when the
    /// configuration asks for it.
    pub fn hvac_autosize(&mut self) -> Result<(), UwgError> {
        self.require(RunState::Initialized)?;
        if !self.input.simulation.autosize {
            return Ok(());
        }
        if let Some(system) = self.system.as_mut() {
            for bem in system.bems.iter_mut() {
                bem.building.autosize();
                info!(
                    "Autosized HVAC of {} to {} W/m2",
                    bem.name(),
                    bem.building.cooling_capacity()
                );
            }
        }
        Ok(())
    }

    pub fn simulate(&mut self) -> Result<(), UwgError> {
        self.simulate_with(|_| {}, &CancellationToken::new())
    }

    /// Run the time loop, reporting each completed hour to `progress` and
    /// stopping between hours once `cancel` is set.
    pub fn simulate_with(
        &mut self,
        progress: impl FnMut(&Progress),
        cancel: &CancellationToken,
    ) -> Result<(), UwgError> {
        self.require(RunState::Initialized)?;
        self.state = RunState::Stepping;
        let result = self.run_time_loop(progress, cancel);
        match result {
            Ok(()) => self.state = RunState::Completed,
            Err(_) => self.state = RunState::Failed,
        }
        result
    }

    fn run_time_loop(
        &mut self,
        mut progress: impl FnMut(&Progress),
        cancel: &CancellationToken,
    ) -> Result<(), UwgError> {
        let (Some(epw), Some(sim), Some(weather), Some(param), Some(system)) = (
            &self.epw,
            &self.sim,
            &self.weather,
            &self.param,
            self.system.as_mut(),
        ) else {
            return Err(UwgError::InvalidState {
                expected: "fully instantiated",
                found: self.state.into(),
            });
        };
        let core_error = |e: anyhow::Error| UwgError::FailureInCalculation(UwgCoreError::new(e));
        let traffic = &self.input.traffic;
        let pavement_depth = self.input.pavement.thickness;
        let total_hours = sim.weather_records();
        let records_per_day = sim.weather_records_per_day();
        info!(
            "Simulating {} days from {}/{} in {} steps of {} s",
            sim.days(),
            sim.start_month(),
            sim.start_day(),
            sim.total_steps(),
            sim.dt()
        );

        self.results.clear();
        self.results.reserve(total_hours);
        let mut hour_converged = true;
        let mut hour_iterations = 0;

        for clock in sim.iter() {
            let index = clock.weather_index();
            let forcing = weather.forcing(index);
            let day_type = clock.day_type();
            let hour = clock.hour_of_day();

            let traffic_fraction = traffic.schedule.value(day_type, hour);
            system.ucm.set_traffic(
                traffic.sensible_heat * traffic_fraction,
                traffic.latent_heat * traffic_fraction,
            );
            for bem in system.bems.iter_mut() {
                bem.update_schedules(&clock, param).map_err(core_error)?;
            }
            let deep_soil = weather.deep_soil_temperature(
                epw.ground_temperatures(),
                pavement_depth,
                clock.month,
            );

            let outcome = system
                .urbflux(&forcing, param, &clock, deep_soil)
                .map_err(core_error)?;
            hour_converged &= outcome.converged;
            hour_iterations = hour_iterations.max(outcome.iterations);

            if !clock.closes_weather_period() {
                continue;
            }
            let record = weather.record(index);
            let canyon_temp = system.ucm.canyon_temperature();
            let canyon_hum = system.ucm.canyon_humidity();
            let moist_air = psychrometrics(canyon_temp, canyon_hum, forcing.pres);
            let celsius = |k: f64| kelvin_to_celsius(k).map_err(|e| core_error(e.into()));
            if !hour_converged {
                warn!(
                    "Canyon temperature did not converge within {} iterations on {}/{} hour {}",
                    param.max_iterations, record.month, record.day, record.hour
                );
            }
            self.results.push(HourlyRecord {
                month: record.month,
                day: record.day,
                hour: record.hour,
                canyon_temp_c: celsius(canyon_temp)?,
                canyon_spec_hum: canyon_hum,
                canyon_rel_hum: moist_air.relative_humidity,
                canyon_dew_point_c: moist_air.dew_point,
                ubl_temp_c: celsius(system.ubl.temperature())?,
                rural_temp_c: celsius(forcing.temp)?,
                wind_speed: forcing.wind,
                converged: hour_converged,
                iterations: hour_iterations,
            });
            hour_converged = true;
            hour_iterations = 0;

            let completed_hours = self.results.len();
            if completed_hours % records_per_day == 0 {
                debug!(
                    "Simulated day {} of {}",
                    completed_hours / records_per_day,
                    sim.days()
                );
            }
            progress(&Progress {
                completed_hours,
                total_hours,
            });
            if cancel.is_cancelled() && completed_hours < total_hours {
                warn!("Simulation cancelled after {completed_hours} hours");
                return Err(UwgError::Cancelled { completed_hours });
            }
        }

        let unconverged = self.results.iter().filter(|r| !r.converged).count();
        info!(
            "Simulation complete: mean canyon {:.2} C against rural {:.2} C, {unconverged} unconverged hours",
            mean(self.results.iter().map(|r| r.canyon_temp_c)),
            mean(self.results.iter().map(|r| r.rural_temp_c)),
        );
        Ok(())
    }

    /// The rural weather file with the simulated period replaced by canyon conditions
    pub fn morphed_epw(&self) -> Result<String, UwgError> {
        self.require(RunState::Completed)?;
        let (Some(epw), Some(sim)) = (&self.epw, &self.sim) else {
            return Err(UwgError::InvalidState {
                expected: "read and validated",
                found: self.state.into(),
            });
        };
        let morphed: Vec<MorphedRecord> = self
            .results
            .iter()
            .map(|record| MorphedRecord {
                dry_bulb: record.canyon_temp_c,
                dew_point: record.canyon_dew_point_c,
                relative_humidity: record.canyon_rel_hum,
                wind_speed: record.wind_speed,
            })
            .collect();
        Ok(epw.render(sim.first_weather_record(), &morphed))
    }

    pub fn write_epw_to(&self, mut writer: impl Write) -> Result<(), UwgError> {
        writer.write_all(self.morphed_epw()?.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Write the morphed file next to the rural one, with a `_UWG` suffix.
    pub fn write_epw(&self) -> Result<PathBuf, UwgError> {
        let Some(source) = &self.epw_path else {
            return Err(UwgError::InvalidState {
                expected: "given a weather file path",
                found: self.state.into(),
            });
        };
        let destination = default_output_path(source);
        self.write_epw_to(std::io::BufWriter::new(std::fs::File::create(&destination)?))?;
        info!("Wrote urban weather file {}", destination.display());
        Ok(destination)
    }

    pub fn write_hourly_csv(&self, writer: impl Write) -> Result<(), UwgError> {
        self.require(RunState::Completed)?;
        let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
        for record in &self.results {
            csv_writer
                .serialize(record)
                .map_err(|e| UwgError::Io(e.into()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Every step from reading the weather file to the end of the simulation.
    pub fn run(&mut self) -> Result<(), UwgError> {
        self.run_with(|_| {}, &CancellationToken::new())
    }

    pub fn run_with(
        &mut self,
        progress: impl FnMut(&Progress),
        cancel: &CancellationToken,
    ) -> Result<(), UwgError> {
        self.read_epw()?;
        self.check_required_inputs()?;
        self.init_bem_obj()?;
        self.instantiate_input()?;
        self.hvac_autosize()?;
        self.simulate_with(progress, cancel)
    }
}

pub fn default_output_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}{OUTPUT_SUFFIX}.epw"))
}

fn element_from(
    name: &str,
    construction: &Construction,
    albedo: f64,
    vegetation: f64,
    horizontal: bool,
) -> anyhow::Result<Element> {
    Ok(Element::new(
        name,
        albedo,
        construction.emissivity,
        &construction.thicknesses,
        &construction.materials,
        vegetation,
        horizontal,
        INITIAL_BUILDING_TEMPERATURE,
    )?)
}

fn build_bem(
    typology: &TypologyInput,
    floor_area_fraction: f64,
    input: &UwgInput,
    initial_humidity: f64,
) -> anyhow::Result<BemDef> {
    let reference = reference_building(typology.program, typology.era, input.city.climate_zone);
    let or_reference =
        |value: Option<Fraction>, default: f64| value.map_or(default, |v| v.value());

    let wall = element_from(
        "wall",
        &reference.wall,
        or_reference(typology.wall_albedo, reference.wall.albedo),
        0.,
        false,
    )?;
    let roof = element_from(
        "roof",
        &reference.roof,
        or_reference(typology.roof_albedo, reference.roof.albedo),
        typology.roof_vegetation.value(),
        true,
    )?;
    let mass = element_from("mass", &reference.mass, reference.mass.albedo, 0., true)?;

    let building = Building::new(
        BuildingParameters {
            floor_height: typology.floor_to_floor,
            infiltration: reference.infiltration,
            ventilation: reference.ventilation,
            glazing_ratio: or_reference(typology.glazing_ratio, reference.glazing_ratio),
            u_window: reference.u_window,
            shgc: or_reference(typology.shgc, reference.shgc),
            cop: reference.cop,
            cool_cap: reference.cool_cap,
            heat_cap: reference.heat_cap,
            heat_eff: reference.heat_eff,
            canyon_fraction: typology.fraction_to_canyon.value(),
        },
        INITIAL_BUILDING_TEMPERATURE,
        initial_humidity,
    );
    Ok(BemDef::new(
        &typology.name(),
        building,
        wall,
        roof,
        mass,
        floor_area_fraction,
        reference.schedule,
    ))
}

fn city_averages(input: &UwgInput, bems: &[BemDef]) -> CityAverages {
    bems.iter()
        .zip(&input.typologies)
        .fold(CityAverages::default(), |mut averages, (bem, typology)| {
            let weight = bem.floor_area_fraction();
            let building = bem.building();
            averages.floor_height += weight * building.floor_height;
            averages.fraction_to_canyon += weight * building.canyon_fraction;
            averages.glazing_ratio += weight * building.glazing_ratio;
            averages.shgc += weight * building.shgc;
            averages.wall_albedo += weight * bem.wall().albedo();
            averages.roof_albedo += weight * bem.roof().albedo();
            averages.roof_vegetation += weight * typology.roof_vegetation.value();
            averages
        })
}

/// Configured vegetation season, with unset (0) months found from the
/// monthly mean temperatures of the weather file.
fn vegetation_season(input: &UwgInput, epw: &EpwFile) -> (u32, u32) {
    let vegetation = &input.vegetation;
    if !vegetation.autocalculated() {
        return (vegetation.start_month, vegetation.end_month);
    }
    let monthly = monthly_means(epw.records().iter().map(|r| (r.month, r.dry_bulb)));
    let (start, end) = season_from_monthly_means(&monthly);
    info!("Vegetation season from weather file: months {start} to {end}");
    (
        if vegetation.start_month == 0 { start } else { vegetation.start_month },
        if vegetation.end_month == 0 { end } else { vegetation.end_month },
    )
}

/// First month warmer than the threshold and the month it is next crossed
/// downwards; the whole year when no crossing exists.
fn season_from_monthly_means(monthly: &[Option<f64>; 12]) -> (u32, u32) {
    let mut start = 1;
    let mut end = 12;
    let mut started = false;
    for (month, temperature) in (1..).zip(monthly) {
        let Some(temperature) = *temperature else {
            continue;
        };
        if temperature > VEGETATION_THRESHOLD && !started {
            start = month;
            started = true;
        } else if temperature < VEGETATION_THRESHOLD && started {
            end = month;
            started = false;
        }
    }
    (start, end)
}
