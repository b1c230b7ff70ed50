use crate::core::element::{Element, InnerBoundary};
use crate::core::forcing::Forcing;
use crate::core::param::Param;
use crate::core::schedule::SchDef;
use crate::core::ucm::UcmDef;
use crate::core::units::{moist_air_density, CP_AIR, LATENT_HEAT_EVAPORATION};
use crate::simulation_time::SimulationTimeIteration;

// convective coefficients of the indoor faces, in W/(m2.K)
const INDOOR_WALL_CONVECTION: f64 = 3.076;
const INDOOR_MASS_CONVECTION: f64 = 3.076;
const CEILING_CONVECTION_STABLE: f64 = 0.948;
const CEILING_CONVECTION_UNSTABLE: f64 = 4.040;

/// HVAC only cools above, and only heats below, this canyon temperature (K)
const HVAC_SWITCH_TEMPERATURE: f64 = 288.;
const SUPPLY_AIR_TEMPERATURE: f64 = 283.15;
/// specific humidity of the air leaving the cooling coil, in kg/kg
const SUPPLY_AIR_HUMIDITY: f64 = 0.9 * 0.0078;
/// capacity assigned by autosizing, in W/m2 of floor
pub(crate) const AUTOSIZED_CAPACITY: f64 = 9999.;

/// Envelope, indoor air and HVAC state of one building typology.
/// Areas and loads are per m2 of building footprint unless noted.
#[derive(Clone, Debug)]
pub struct Building {
    /// floor to floor height, in m
    pub(crate) floor_height: f64,
    /// infiltration, in air changes per hour
    pub(crate) infiltration: f64,
    /// ventilation, in m3/s per m2 of floor
    pub(crate) ventilation: f64,
    pub(crate) glazing_ratio: f64,
    /// window U-value, in W/(m2.K)
    pub(crate) u_window: f64,
    pub(crate) shgc: f64,
    pub(crate) cop: f64,
    /// cooling capacity, in W/m2 of floor
    pub(crate) cool_cap: f64,
    /// heating capacity, in W/m2 of floor
    pub(crate) heat_cap: f64,
    pub(crate) heat_eff: f64,
    /// fraction of waste heat released into the canyon, the rest leaves at roof level
    pub(crate) canyon_fraction: f64,
    pub(crate) n_floor: f64,

    pub(crate) indoor_temp: f64,
    pub(crate) indoor_hum: f64,
    pub(crate) cool_setpoint: f64,
    pub(crate) heat_setpoint: f64,
    /// internal gains, in W/m2 of floor
    pub(crate) int_heat: f64,
    pub(crate) int_frad: f64,
    pub(crate) int_flat: f64,

    pub(crate) sens_waste: f64,
    pub(crate) lat_waste: f64,
    pub(crate) cooling_demand: f64,
    pub(crate) heating_demand: f64,
    pub(crate) cooling_consumption: f64,
    pub(crate) heating_consumption: f64,
    pub(crate) dehumidification: f64,
    pub(crate) flux_wall: f64,
    pub(crate) flux_roof: f64,
    pub(crate) flux_mass: f64,
}

/// Construction and HVAC parameters of a building typology
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildingParameters {
    pub floor_height: f64,
    pub infiltration: f64,
    pub ventilation: f64,
    pub glazing_ratio: f64,
    pub u_window: f64,
    pub shgc: f64,
    pub cop: f64,
    pub cool_cap: f64,
    pub heat_cap: f64,
    pub heat_eff: f64,
    pub canyon_fraction: f64,
}

impl Building {
    pub fn new(
        parameters: BuildingParameters,
        initial_temperature: f64,
        initial_humidity: f64,
    ) -> Self {
        Self {
            floor_height: parameters.floor_height,
            infiltration: parameters.infiltration,
            ventilation: parameters.ventilation,
            glazing_ratio: parameters.glazing_ratio,
            u_window: parameters.u_window,
            shgc: parameters.shgc,
            cop: parameters.cop,
            cool_cap: parameters.cool_cap,
            heat_cap: parameters.heat_cap,
            heat_eff: parameters.heat_eff,
            canyon_fraction: parameters.canyon_fraction,
            n_floor: 1.,
            indoor_temp: initial_temperature,
            indoor_hum: initial_humidity,
            cool_setpoint: initial_temperature,
            heat_setpoint: initial_temperature,
            int_heat: 0.,
            int_frad: 0.,
            int_flat: 0.,
            sens_waste: 0.,
            lat_waste: 0.,
            cooling_demand: 0.,
            heating_demand: 0.,
            cooling_consumption: 0.,
            heating_consumption: 0.,
            dehumidification: 0.,
            flux_wall: 0.,
            flux_roof: 0.,
            flux_mass: 0.,
        }
    }

    pub fn indoor_temperature(&self) -> f64 {
        self.indoor_temp
    }

    pub fn indoor_humidity(&self) -> f64 {
        self.indoor_hum
    }

    /// Sensible waste heat of the HVAC system, in W/m2 of footprint
    pub fn sensible_waste(&self) -> f64 {
        self.sens_waste
    }

    pub fn cooling_demand(&self) -> f64 {
        self.cooling_demand
    }

    pub fn heating_demand(&self) -> f64 {
        self.heating_demand
    }

    pub fn cooling_capacity(&self) -> f64 {
        self.cool_cap
    }

    /// Capacity per m2 of floor large enough to meet any load
    pub(crate) fn autosize(&mut self) {
        self.cool_cap = AUTOSIZED_CAPACITY;
        self.heat_cap = AUTOSIZED_CAPACITY;
    }

    /// Indoor heat balance with ideal setpoint control for one step.
    ///
    /// Arguments:
    /// * `ucm` - canyon state of the current iteration
    /// * `wall`, `roof`, `mass` - the typology's elements (read only)
    /// * `forcing` - rural weather, for the pressure
    /// * `dt` - step length, in seconds
    pub(crate) fn bem_calc(
        &mut self,
        ucm: &UcmDef,
        wall: &Element,
        roof: &Element,
        mass: &Element,
        forcing: &Forcing,
        dt: f64,
    ) {
        self.n_floor = (ucm.bld_height / self.floor_height).max(1.);
        self.sens_waste = 0.;
        self.lat_waste = 0.;
        self.dehumidification = 0.;
        self.cooling_consumption = 0.;
        self.heating_consumption = 0.;

        let dens = moist_air_density(forcing.pres, self.indoor_temp, self.indoor_hum);
        let vol_vent = self.ventilation * self.n_floor;
        let vol_infil = self.infiltration * ucm.bld_height / 3600.;

        let t_wall = wall.inner_temperature();
        let t_ceil = roof.inner_temperature();
        let t_mass = mass.surface_temperature();
        let t_indoor = self.indoor_temp;
        let t_canyon = ucm.can_temp;

        let facade_area = ucm.ver_to_hor / ucm.bld_density;
        let wall_area = facade_area * (1. - self.glazing_ratio);
        let window_area = facade_area * self.glazing_ratio;
        let mass_area = 2. * self.n_floor - 1.;
        let int_heat = self.int_heat * self.n_floor;

        let zc = if t_ceil > t_indoor {
            CEILING_CONVECTION_STABLE
        } else {
            CEILING_CONVECTION_UNSTABLE
        };
        let win_trans = wall.solar_received() * self.shgc * window_area;

        let latent_infiltration =
            vol_infil * dens * LATENT_HEAT_EVAPORATION * (ucm.can_hum - self.indoor_hum);
        let latent_ventilation =
            vol_vent * dens * LATENT_HEAT_EVAPORATION * (ucm.can_hum - self.indoor_hum);
        let latent_internal = int_heat * self.int_flat;

        let air_exchange = (vol_infil + vol_vent) * dens * CP_AIR;
        let load = |setpoint: f64| {
            wall_area * INDOOR_WALL_CONVECTION * (t_wall - setpoint)
                + mass_area * INDOOR_MASS_CONVECTION * (t_mass - setpoint)
                + window_area * self.u_window * (t_canyon - setpoint)
                + zc * (t_ceil - setpoint)
                + int_heat
                + air_exchange * (t_canyon - setpoint)
                + win_trans
        };
        let mut cooling = load(self.cool_setpoint).max(0.);
        let heating_need = (-load(self.heat_setpoint)).max(0.);

        let mut heat_supplied = 0.;
        let mut latent_removed = 0.;
        if cooling > 0. && t_canyon > HVAC_SWITCH_TEMPERATURE {
            let mut vol_cool = if t_indoor > SUPPLY_AIR_TEMPERATURE + 1e-6 {
                cooling / (dens * CP_AIR * (t_indoor - SUPPLY_AIR_TEMPERATURE))
            } else {
                0.
            };
            let mut dehum = (vol_cool
                * dens
                * (self.indoor_hum - SUPPLY_AIR_HUMIDITY)
                * LATENT_HEAT_EVAPORATION)
                .max(0.);
            let capacity = self.cool_cap * self.n_floor;
            if dehum + cooling > capacity {
                let scale = capacity / (dehum + cooling);
                vol_cool *= scale;
                cooling *= scale;
                dehum *= scale;
            }
            latent_removed =
                vol_cool * dens * LATENT_HEAT_EVAPORATION * (self.indoor_hum - SUPPLY_AIR_HUMIDITY);
            self.dehumidification = dehum;
            self.cooling_consumption = (cooling + dehum).max(0.) / self.cop;
            // air-cooled condenser: everything is rejected as sensible heat
            self.sens_waste = (cooling + dehum).max(0.) + self.cooling_consumption;
            self.heating_demand = 0.;
            self.cooling_demand = cooling;
        } else if heating_need > 0. && t_canyon < HVAC_SWITCH_TEMPERATURE {
            heat_supplied = heating_need.min(self.heat_cap * self.n_floor);
            self.heating_consumption = heat_supplied / self.heat_eff;
            self.sens_waste = self.heating_consumption - heat_supplied;
            self.heating_demand = heat_supplied;
            self.cooling_demand = 0.;
            cooling = 0.;
        } else {
            self.cooling_demand = 0.;
            self.heating_demand = 0.;
            cooling = 0.;
        }

        let q = int_heat + win_trans + heat_supplied - cooling;
        let h1 = t_wall * wall_area * INDOOR_WALL_CONVECTION
            + t_mass * mass_area * INDOOR_MASS_CONVECTION
            + t_ceil * zc
            + t_canyon * window_area * self.u_window
            + t_canyon * air_exchange;
        let h2 = wall_area * INDOOR_WALL_CONVECTION
            + mass_area * INDOOR_MASS_CONVECTION
            + zc
            + window_area * self.u_window
            + air_exchange;
        self.indoor_temp = (h1 + q) / h2;
        self.indoor_hum = (self.indoor_hum
            + dt / (dens * LATENT_HEAT_EVAPORATION * ucm.bld_height)
                * (latent_internal + latent_infiltration + latent_ventilation - latent_removed))
            .max(0.);

        // heat flowing from the indoor air into each element's inner face
        self.flux_wall = INDOOR_WALL_CONVECTION * (t_indoor - t_wall);
        self.flux_roof = zc * (t_indoor - t_ceil);
        self.flux_mass =
            INDOOR_MASS_CONVECTION * (t_indoor - t_mass) + int_heat * self.int_frad / mass_area;
    }
}

/// A building typology of the urban area: its envelope elements, indoor
/// model, schedules, and share of the total floor area.
#[derive(Clone, Debug)]
pub struct BemDef {
    pub(crate) name: String,
    pub(crate) building: Building,
    pub(crate) wall: Element,
    pub(crate) roof: Element,
    pub(crate) mass: Element,
    /// share of the urban floor area
    pub(crate) frac: f64,
    pub(crate) schedule: SchDef,
}

/// Element temperatures and indoor air state, saved before a canyon
/// iteration so each iteration restarts from the same point.
#[derive(Clone, Debug)]
pub(crate) struct BemSnapshot {
    wall: Vec<f64>,
    roof: Vec<f64>,
    mass: Vec<f64>,
    indoor_temp: f64,
    indoor_hum: f64,
}

impl BemDef {
    pub fn new(
        name: &str,
        building: Building,
        wall: Element,
        roof: Element,
        mass: Element,
        frac: f64,
        schedule: SchDef,
    ) -> Self {
        Self {
            name: name.to_string(),
            building,
            wall,
            roof,
            mass,
            frac,
            schedule,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn building(&self) -> &Building {
        &self.building
    }

    pub fn wall(&self) -> &Element {
        &self.wall
    }

    pub fn roof(&self) -> &Element {
        &self.roof
    }

    pub fn floor_area_fraction(&self) -> f64 {
        self.frac
    }

    /// Load the internal gains and setpoints of the current hour
    pub(crate) fn update_schedules(
        &mut self,
        clock: &SimulationTimeIteration,
        param: &Param,
    ) -> anyhow::Result<()> {
        let day_type = clock.day_type();
        let hour = clock.hour_of_day();
        let gains = self
            .schedule
            .internal_gains(day_type, hour, &param.gain_fractions);
        self.building.int_heat = gains.total;
        self.building.int_frad = gains.radiant_fraction;
        self.building.int_flat = gains.latent_fraction;
        (self.building.cool_setpoint, self.building.heat_setpoint) =
            self.schedule.setpoints(day_type, hour)?;
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> BemSnapshot {
        BemSnapshot {
            wall: self.wall.temperatures().to_vec(),
            roof: self.roof.temperatures().to_vec(),
            mass: self.mass.temperatures().to_vec(),
            indoor_temp: self.building.indoor_temp,
            indoor_hum: self.building.indoor_hum,
        }
    }

    pub(crate) fn restore(&mut self, snapshot: &BemSnapshot) {
        self.wall.restore_temperatures(&snapshot.wall);
        self.roof.restore_temperatures(&snapshot.roof);
        self.mass.restore_temperatures(&snapshot.mass);
        self.building.indoor_temp = snapshot.indoor_temp;
        self.building.indoor_hum = snapshot.indoor_hum;
    }

    /// Indoor balance, then conduction through wall, roof and internal mass
    /// against the canyon air.
    pub(crate) fn advance(
        &mut self,
        ucm: &UcmDef,
        forcing: &Forcing,
        param: &Param,
        month: u32,
        dt: f64,
    ) -> anyhow::Result<()> {
        self.building
            .bem_calc(ucm, &self.wall, &self.roof, &self.mass, forcing, dt);

        self.wall
            .set_inner_boundary(InnerBoundary::HeatFlux(self.building.flux_wall));
        self.wall
            .exchange_with_air(ucm.can_temp, ucm.can_wind, dt)?;

        self.roof
            .set_inner_boundary(InnerBoundary::HeatFlux(self.building.flux_roof));
        self.roof.set_vegetation_season(param.grass_exchange(month));
        self.roof
            .exchange_with_air(ucm.can_temp, ucm.can_wind, dt)?;

        // internal mass is heated from both faces
        self.mass
            .set_inner_boundary(InnerBoundary::HeatFlux(self.building.flux_mass));
        self.mass.conduct(self.building.flux_mass, dt)?;
        Ok(())
    }
}
