// Coupling of the sub-models for one simulation step: radiation, the
// canyon fixed-point iteration, then the rural column and the urban
// boundary layer.

use crate::core::building::BemDef;
use crate::core::element::{Element, InnerBoundary};
use crate::core::forcing::Forcing;
use crate::core::param::Param;
use crate::core::rsm::RsmDef;
use crate::core::solar_calcs::SolarCalcs;
use crate::core::ubl::UblDef;
use crate::core::ucm::UcmDef;
use crate::core::units::{moist_air_density, CP_AIR, GRAVITY, STEFAN_BOLTZMANN, VON_KARMAN};
use crate::simulation_time::SimulationTimeIteration;
use anyhow::bail;
use tracing::trace;

/// How the canyon iteration of one step ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub converged: bool,
    pub iterations: usize,
}

/// Every sub-model of one urban area, exclusively owned for a run.
#[derive(Clone, Debug)]
pub struct UrbanSystem {
    pub(crate) ucm: UcmDef,
    pub(crate) ubl: UblDef,
    pub(crate) rsm: RsmDef,
    pub(crate) bems: Vec<BemDef>,
    pub(crate) rural: Element,
    pub(crate) solar: SolarCalcs,
}

impl UrbanSystem {
    pub fn ucm(&self) -> &UcmDef {
        &self.ucm
    }

    pub fn ubl(&self) -> &UblDef {
        &self.ubl
    }

    pub fn rsm(&self) -> &RsmDef {
        &self.rsm
    }

    pub fn bems(&self) -> &[BemDef] {
        &self.bems
    }

    pub fn rural(&self) -> &Element {
        &self.rural
    }

    /// Advance the whole system by one step.
    ///
    /// Arguments:
    /// * `forcing` - rural weather of the step
    /// * `param` - run constants, including the iteration tolerance and cap
    /// * `clock` - the step being simulated
    /// * `deep_soil` - temperature under the road and the rural ground, in K
    pub(crate) fn urbflux(
        &mut self,
        forcing: &Forcing,
        param: &Param,
        clock: &SimulationTimeIteration,
        deep_soil: f64,
    ) -> anyhow::Result<StepOutcome> {
        let dt = clock.timestep;
        let grass = param.grass_exchange(clock.month);

        self.solar.solarcalcs(
            &mut self.ucm,
            &mut self.bems,
            &mut self.rural,
            forcing,
            param,
            clock,
            &self.rsm.location,
        );

        for ground in [&mut self.ucm.road, &mut self.rural] {
            ground.set_inner_boundary(InnerBoundary::FixedTemperature(deep_soil));
            ground.set_vegetation_season(grass);
        }

        let bem_snapshots: Vec<_> = self.bems.iter().map(BemDef::snapshot).collect();
        let road_snapshot = self.ucm.road.temperatures().to_vec();

        let mut outcome = StepOutcome {
            converged: false,
            iterations: 0,
        };
        for iteration in 1..=param.max_iterations {
            for (bem, snapshot) in self.bems.iter_mut().zip(&bem_snapshots) {
                bem.restore(snapshot);
            }
            self.ucm.road.restore_temperatures(&road_snapshot);
            let previous = self.ucm.can_temp;

            exchange_velocity(&mut self.ucm, forcing, param, self.rsm.z0r, self.ubl.temperature);
            infracalcs(&mut self.ucm, &mut self.bems, forcing.infra);

            for bem in self.bems.iter_mut() {
                bem.advance(&self.ucm, forcing, param, clock.month, dt)?;
            }
            let (can_temp, can_wind) = (self.ucm.can_temp, self.ucm.can_wind);
            self.ucm.road.exchange_with_air(can_temp, can_wind, dt)?;

            self.ucm
                .ucm_model(&self.bems, self.ubl.temperature, self.ubl.humidity, forcing);
            if !(self.ucm.can_temp.is_finite() && self.ucm.can_hum.is_finite()) {
                bail!(
                    "Canyon air state became non-finite at step {} (iteration {iteration}): {} K, {} kg/kg",
                    clock.index,
                    self.ucm.can_temp,
                    self.ucm.can_hum
                );
            }

            outcome.iterations = iteration;
            if (self.ucm.can_temp - previous).abs() < param.tolerance {
                outcome.converged = true;
                break;
            }
        }
        trace!(
            "Step {}: canyon at {:.3} K after {} iterations",
            clock.index,
            self.ucm.can_temp,
            outcome.iterations
        );

        self.rural.set_infrared(
            forcing.infra
                - self.rural.emissivity() * STEFAN_BOLTZMANN * self.rural.surface_temperature().powi(4),
        );
        self.rural.exchange_with_air(forcing.temp, forcing.wind, dt)?;

        self.rsm
            .vdm(forcing, self.rural.sensible_heat(), param, dt)?;
        self.ubl.ubl_model(
            &self.ucm,
            &self.rsm,
            &self.rural,
            forcing,
            param,
            self.ucm.sol_rec_roof,
            dt,
        );

        Ok(outcome)
    }
}

/// Wind at the canyon top and the exchange velocity between canyon and
/// boundary layer, from the rural wind carried through both roughness layers.
pub(crate) fn exchange_velocity(
    ucm: &mut UcmDef,
    forcing: &Forcing,
    param: &Param,
    rural_roughness: f64,
    ubl_temperature: f64,
) {
    let z_urban = 2. * ucm.bld_height;
    let z_ref = param.ref_height;

    let wind_urban = forcing.wind * (z_ref / rural_roughness).ln()
        / (param.wind_height / rural_roughness).ln()
        * (z_urban / ucm.z0u).ln()
        / (z_ref / ucm.z0u).ln();
    let ustar = VON_KARMAN * wind_urban / ((z_urban - ucm.l_disp) / ucm.z0u).ln();

    let dens = moist_air_density(forcing.pres, ucm.can_temp, ucm.can_hum);
    let wstar =
        (GRAVITY * ucm.sens_heat.max(0.) * z_ref / dens / CP_AIR / ubl_temperature).cbrt();

    ucm.u_exch = param.ex_coeff * ustar.max(wstar);
    ucm.can_wind = ustar.max(wstar) * (ucm.ver_to_hor / 8.).powf(-0.5);
}

/// Net long-wave radiation on the road, the walls and the roofs.
/// Road and walls see the sky through their view factors and each other
/// through the rest of the hemisphere; roofs see only the sky.
pub(crate) fn infracalcs(ucm: &mut UcmDef, bems: &mut [BemDef], sky_infrared: f64) {
    let road_conf = ucm.road_conf;
    let wall_conf = ucm.wall_conf;
    let unshaded = 1. - ucm.road_shad;
    let road_emissivity = ucm.road.emissivity();
    let road_radiation = STEFAN_BOLTZMANN * ucm.road.surface_temperature().powi(4);

    let total_frac: f64 = bems.iter().map(|bem| bem.frac).sum();
    let (wall_radiation, wall_emissivity) = if total_frac > 0. {
        bems.iter().fold((0., 0.), |(radiation, emissivity), bem| {
            (
                radiation
                    + bem.frac / total_frac
                        * STEFAN_BOLTZMANN
                        * bem.wall.surface_temperature().powi(4),
                emissivity + bem.frac / total_frac * bem.wall.emissivity(),
            )
        })
    } else {
        (road_radiation, road_emissivity)
    };

    ucm.road.set_infrared(
        road_emissivity * road_conf * unshaded * (sky_infrared - road_radiation)
            + unshaded
                * (1. - road_conf)
                * wall_emissivity
                * road_emissivity
                * (wall_radiation - road_radiation),
    );

    for bem in bems.iter_mut() {
        let emissivity = bem.wall.emissivity();
        let radiation = STEFAN_BOLTZMANN * bem.wall.surface_temperature().powi(4);
        bem.wall.set_infrared(
            emissivity * wall_conf * (sky_infrared - radiation)
                + emissivity * road_emissivity * wall_conf * unshaded * (road_radiation - radiation),
        );

        let roof_radiation = STEFAN_BOLTZMANN * bem.roof.surface_temperature().powi(4);
        bem.roof
            .set_infrared(bem.roof.emissivity() * (sky_infrared - roof_radiation));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tests::{summer_forcing, urban_system};
    use approx::assert_relative_eq;
    use rstest::*;

    fn clock(index: usize, seconds_of_day: f64) -> SimulationTimeIteration {
        SimulationTimeIteration {
            index,
            timestep: 300.,
            weather_step: 3600.,
            julian_day: 195,
            month: 7,
            day: 15,
            seconds_of_day,
        }
    }

    #[rstest]
    fn should_exchange_nothing_radiatively_at_uniform_temperature() {
        let mut system = urban_system();
        let temperature: f64 = 295.;
        let UrbanSystem { ucm, bems, .. } = &mut system;
        let nodes = vec![temperature; ucm.road.node_count()];
        ucm.road.restore_temperatures(&nodes);
        for bem in bems.iter_mut() {
            for element in [&mut bem.wall, &mut bem.roof] {
                let nodes = vec![temperature; element.node_count()];
                element.restore_temperatures(&nodes);
            }
        }
        // a sky radiating like a black body at the same temperature
        let sky = STEFAN_BOLTZMANN * temperature.powi(4);
        infracalcs(ucm, bems, sky);
        assert_relative_eq!(ucm.road.infrared(), 0., epsilon = 1e-6);
        assert_relative_eq!(bems[0].wall.infrared(), 0., epsilon = 1e-6);
        assert_relative_eq!(
            bems[0].roof.infrared(),
            0.,
            epsilon = 1e-6
        );

        infracalcs(ucm, bems, 0.8 * sky);
        assert!(ucm.road.infrared() < 0.);
        assert!(bems[0].roof.infrared() < bems[0].wall.infrared());
    }

    #[rstest]
    fn should_scale_the_exchange_velocity_with_the_coefficient() {
        let mut system = urban_system();
        let forcing = summer_forcing(14);
        let mut param = Param::default();
        exchange_velocity(&mut system.ucm, &forcing, &param, system.rsm.z0r, 298.);
        let reference = system.ucm.u_exch;
        assert!(reference > 0.);
        assert!(system.ucm.can_wind > reference);

        param.ex_coeff = 2.;
        exchange_velocity(&mut system.ucm, &forcing, &param, system.rsm.z0r, 298.);
        assert_relative_eq!(system.ucm.u_exch, 2. * reference, max_relative = 1e-12);
    }

    #[rstest]
    fn should_converge_within_the_iteration_cap() {
        let mut system = urban_system();
        let param = Param::default();
        for step in 1..=24 {
            let hour = (step * 300 - 1) / 3600;
            let outcome = system
                .urbflux(&summer_forcing(hour), &param, &clock(step, step as f64 * 300.), 297.15)
                .unwrap();
            assert!(outcome.converged, "step {step} did not converge");
            assert!(outcome.iterations <= param.max_iterations);
        }
        assert!(system.ucm.canyon_temperature().is_finite());
    }

    #[rstest]
    fn should_fail_the_step_when_the_canyon_state_is_not_finite() {
        let mut system = urban_system();
        system.ucm.set_traffic(f64::NAN, 0.);
        let error = system
            .urbflux(&summer_forcing(12), &Param::default(), &clock(1, 43_500.), 297.15)
            .unwrap_err();
        assert!(error.to_string().contains("non-finite at step 1"));
    }

    #[rstest]
    fn should_report_an_unconverged_step() {
        let mut system = urban_system();
        let param = Param {
            max_iterations: 1,
            tolerance: 0.,
            ..Default::default()
        };
        let outcome = system
            .urbflux(&summer_forcing(12), &param, &clock(1, 43_500.), 297.15)
            .unwrap();
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 1);
    }
}
