// Urban canopy model: canyon geometry and the air energy and moisture
// balance of the street canyon.

use crate::core::building::BemDef;
use crate::core::element::Element;
use crate::core::forcing::Forcing;
use crate::core::units::{moist_air_density, CP_AIR, LATENT_HEAT_EVAPORATION};

/// Urban morphology used to derive the canyon geometry
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanyonGeometry {
    /// average building height, in m
    pub bld_height: f64,
    /// site coverage ratio (building footprint per urban area)
    pub bld_density: f64,
    /// facade to site ratio (vertical wall area per urban area)
    pub ver_to_hor: f64,
    /// fraction of the urban area covered by trees
    pub tree_coverage: f64,
}

#[derive(Clone, Debug)]
pub struct UcmDef {
    pub(crate) bld_height: f64,
    pub(crate) bld_density: f64,
    pub(crate) ver_to_hor: f64,
    pub(crate) tree_coverage: f64,

    pub(crate) bld_width: f64,
    pub(crate) can_width: f64,
    pub(crate) can_aspect: f64,
    /// sky view factor of the road
    pub(crate) road_conf: f64,
    /// sky view factor of the walls
    pub(crate) wall_conf: f64,
    /// fraction of the road shaded by trees
    pub(crate) road_shad: f64,
    pub(crate) roof_area: f64,
    pub(crate) road_area: f64,
    /// urban roughness length, in m
    pub(crate) z0u: f64,
    /// urban displacement height, in m
    pub(crate) l_disp: f64,
    /// floor-area weighted wall albedo
    pub(crate) alb_wall: f64,

    /// traffic heat of the current hour, in W/m2 of urban area
    pub(crate) sens_anthrop: f64,
    pub(crate) lat_anthrop: f64,

    pub(crate) road: Element,

    pub(crate) can_temp: f64,
    pub(crate) can_hum: f64,
    pub(crate) can_wind: f64,
    /// exchange velocity between the canyon and the boundary layer, in m/s
    pub(crate) u_exch: f64,
    /// sensible heat released to the boundary layer, in W/m2 of urban area
    pub(crate) sens_heat: f64,
    pub(crate) lat_heat: f64,
    /// sensible heat crossing the canyon top, in W/m2 of urban area
    pub(crate) q_ubl: f64,
    /// vegetation heat, per m2 of vegetation
    pub(crate) tree_sens: f64,
    pub(crate) tree_lat: f64,
    pub(crate) sol_rec_road: f64,
    pub(crate) sol_rec_roof: f64,
    pub(crate) sol_rec_wall: f64,
}

impl UcmDef {
    /// Arguments:
    /// * `geometry` - urban morphology
    /// * `alb_wall` - wall albedo weighted over the typologies
    /// * `road` - road element, including its vegetation coverage
    /// * `temperature`, `humidity` - initial canyon air state, in K and kg/kg
    /// * `wind` - initial canyon wind speed, in m/s
    pub fn new(
        geometry: CanyonGeometry,
        alb_wall: f64,
        road: Element,
        temperature: f64,
        humidity: f64,
        wind: f64,
    ) -> Self {
        let CanyonGeometry {
            bld_height,
            bld_density,
            ver_to_hor,
            tree_coverage,
        } = geometry;

        let bld_width = 4. * bld_height * bld_density / ver_to_hor;
        let can_width = bld_width / bld_density.sqrt() - bld_width;
        let can_aspect = bld_height / can_width;
        let road_conf = (can_aspect.powi(2) + 1.).sqrt() - can_aspect;
        let wall_conf =
            0.5 * (can_aspect + 1. - (can_aspect.powi(2) + 1.).sqrt()) / can_aspect;

        // frontal density
        let frontal = ver_to_hor / 4.;
        let z0u = if frontal < 0.15 {
            frontal * bld_height
        } else {
            0.15 * bld_height
        };
        let l_disp = if frontal < 0.05 {
            3. * frontal * bld_height
        } else if frontal < 0.15 {
            (0.15 + 5.5 * (frontal - 0.05)) * bld_height
        } else if frontal < 1. {
            (0.7 + 0.35 * (frontal - 0.15)) * bld_height
        } else {
            0.5 * bld_height
        };

        Self {
            bld_height,
            bld_density,
            ver_to_hor,
            tree_coverage,
            bld_width,
            can_width,
            can_aspect,
            road_conf,
            wall_conf,
            road_shad: (tree_coverage / (1. - bld_density)).min(1.),
            roof_area: bld_density,
            road_area: 1. - bld_density,
            z0u,
            l_disp,
            alb_wall,
            sens_anthrop: 0.,
            lat_anthrop: 0.,
            road,
            can_temp: temperature,
            can_hum: humidity,
            can_wind: wind,
            u_exch: 0.1,
            sens_heat: 0.,
            lat_heat: 0.,
            q_ubl: 0.,
            tree_sens: 0.,
            tree_lat: 0.,
            sol_rec_road: 0.,
            sol_rec_roof: 0.,
            sol_rec_wall: 0.,
        }
    }

    /// Canyon air temperature, in K
    pub fn canyon_temperature(&self) -> f64 {
        self.can_temp
    }

    /// Canyon specific humidity, in kg/kg
    pub fn canyon_humidity(&self) -> f64 {
        self.can_hum
    }

    pub fn canyon_wind(&self) -> f64 {
        self.can_wind
    }

    /// Building height over street width
    pub fn aspect_ratio(&self) -> f64 {
        self.can_aspect
    }

    pub fn road_conf(&self) -> f64 {
        self.road_conf
    }

    pub fn wall_conf(&self) -> f64 {
        self.wall_conf
    }

    pub fn canyon_width(&self) -> f64 {
        self.can_width
    }

    pub fn road(&self) -> &Element {
        &self.road
    }

    /// Sensible heat released to the boundary layer, in W/m2 of urban area
    pub fn sensible_heat(&self) -> f64 {
        self.sens_heat
    }

    pub(crate) fn set_traffic(&mut self, sensible: f64, latent: f64) {
        self.sens_anthrop = sensible;
        self.lat_anthrop = latent;
    }

    /// Solve the canyon air heat and moisture balance against the boundary layer.
    ///
    /// Arguments:
    /// * `bems` - typologies, already advanced for this iteration
    /// * `ubl_temp`, `ubl_hum` - boundary layer air state, in K and kg/kg
    /// * `forcing` - rural weather, for the pressure
    pub(crate) fn ucm_model(
        &mut self,
        bems: &[BemDef],
        ubl_temp: f64,
        ubl_hum: f64,
        forcing: &Forcing,
    ) {
        let dens = moist_air_density(forcing.pres, self.can_temp, self.can_hum);
        let dens_ubl = moist_air_density(forcing.pres, ubl_temp, ubl_hum);

        let road_temp = self.road.surface_temperature();
        let road_convection = self.road.convection_coefficient();
        let exchange = self.road_area * self.u_exch * dens_ubl;

        let mut h1 = road_temp * road_convection * self.road_area + ubl_temp * exchange * CP_AIR;
        let mut h2 = road_convection * self.road_area + exchange * CP_AIR;
        let mut q = (self.roof_area + self.road_area)
            * (self.sens_anthrop + self.tree_sens * self.tree_coverage);
        let mut m1 = ubl_hum * exchange;
        let mut m2 = exchange;
        let mut latent = (self.lat_anthrop
            + self.tree_lat * self.tree_coverage
            + self.road.latent_heat() * self.road_area)
            / LATENT_HEAT_EVAPORATION;

        let mut roof_sensible = 0.;
        let mut roof_latent = 0.;
        for bem in bems {
            let building = &bem.building;
            let wall_area = (1. - building.glazing_ratio) * self.ver_to_hor;
            let window_area = building.glazing_ratio * self.ver_to_hor;
            let flow = self.roof_area
                * (building.ventilation * building.n_floor
                    + building.infiltration * self.bld_height / 3600.);

            h1 += bem.frac
                * (building.indoor_temp * window_area * building.u_window
                    + bem.wall.surface_temperature() * wall_area * bem.wall.convection_coefficient()
                    + building.indoor_temp * flow * CP_AIR * dens);
            h2 += bem.frac
                * (window_area * building.u_window
                    + wall_area * bem.wall.convection_coefficient()
                    + flow * CP_AIR * dens);
            q += bem.frac * self.roof_area * building.sens_waste * building.canyon_fraction;
            m1 += bem.frac * building.indoor_hum * flow * dens;
            m2 += bem.frac * flow * dens;
            latent += bem.frac * self.roof_area * building.lat_waste * building.canyon_fraction
                / LATENT_HEAT_EVAPORATION;

            roof_sensible += bem.frac
                * self.roof_area
                * (bem.roof.sensible_heat() + building.sens_waste * (1. - building.canyon_fraction));
            roof_latent += bem.frac
                * self.roof_area
                * (bem.roof.latent_heat() + building.lat_waste * (1. - building.canyon_fraction));
        }

        self.can_temp = (h1 + q) / h2;
        self.can_hum = (m1 + latent) / m2;

        self.q_ubl = exchange * CP_AIR * (self.can_temp - ubl_temp);
        self.sens_heat = self.q_ubl + roof_sensible;
        self.lat_heat =
            exchange * (self.can_hum - ubl_hum) * LATENT_HEAT_EVAPORATION + roof_latent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tests::canyon_fixture;
    use approx::assert_relative_eq;
    use rstest::*;

    fn forcing() -> Forcing {
        Forcing {
            pres: 101_325.,
            ..Default::default()
        }
    }

    #[rstest]
    fn should_derive_canyon_geometry() {
        let (ucm, _, _) = canyon_fixture();
        assert_relative_eq!(ucm.bld_width, 45., max_relative = 1e-12);
        assert_relative_eq!(ucm.canyon_width(), 45. / 0.45_f64.sqrt() - 45., max_relative = 1e-12);
        assert_relative_eq!(ucm.aspect_ratio(), 20. / ucm.can_width, max_relative = 1e-12);
        // every ray leaving the road hits the sky or one of the two walls
        assert_relative_eq!(
            ucm.road_conf() + 2. * ucm.aspect_ratio() * ucm.wall_conf(),
            1.,
            max_relative = 1e-12
        );
        assert_relative_eq!(ucm.z0u, 3., max_relative = 1e-12);
        assert_relative_eq!(ucm.l_disp, 14.35, max_relative = 1e-12);
    }

    #[rstest]
    fn should_stay_at_equilibrium_without_heat_sources() {
        let (mut ucm, mut bems, _) = canyon_fixture();
        let temperature = 295.;
        let humidity = 0.01;
        for bem in bems.iter_mut() {
            for element in [&mut bem.wall, &mut bem.roof] {
                let nodes = vec![temperature; element.node_count()];
                element.restore_temperatures(&nodes);
                element.advance(temperature, 0., 10., 300.).unwrap();
            }
            bem.building.indoor_temp = temperature;
            bem.building.indoor_hum = humidity;
        }
        let nodes = vec![temperature; ucm.road.node_count()];
        ucm.road.restore_temperatures(&nodes);
        ucm.road.advance(temperature, 0., 10., 300.).unwrap();

        ucm.ucm_model(&bems, temperature, humidity, &forcing());
        assert_relative_eq!(ucm.canyon_temperature(), temperature, max_relative = 1e-9);
        assert_relative_eq!(ucm.canyon_humidity(), humidity, max_relative = 1e-9);
        assert_relative_eq!(ucm.sensible_heat(), 0., epsilon = 1e-6);
    }

    #[rstest]
    fn should_warm_the_canyon_with_traffic_and_waste_heat() {
        let (mut ucm, mut bems, _) = canyon_fixture();
        let (ubl_temp, ubl_hum) = (ucm.can_temp, ucm.can_hum);
        ucm.road.advance(ubl_temp, 0., 10., 300.).unwrap();
        ucm.ucm_model(&bems, ubl_temp, ubl_hum, &forcing());
        let reference = ucm.canyon_temperature();

        ucm.set_traffic(20., 0.);
        bems[0].building.sens_waste = 30.;
        ucm.ucm_model(&bems, ubl_temp, ubl_hum, &forcing());
        assert!(ucm.canyon_temperature() > reference);
        assert!(ucm.sensible_heat() > 0.);
    }
}
