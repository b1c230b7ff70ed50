// Short-wave radiation received by the canyon surfaces, the roofs and the
// rural reference surface, including wall/road inter-reflections.

use crate::core::building::BemDef;
use crate::core::element::Element;
use crate::core::forcing::Forcing;
use crate::core::param::Param;
use crate::core::ucm::UcmDef;
use crate::core::units::DAYS_IN_MONTH;
use crate::simulation_time::SimulationTimeIteration;
use std::f64::consts::PI;
use tracing::trace;

const ZENITH_TOLERANCE: f64 = 1e-6;

/// Geographic position of the site, in degrees and hours from GMT
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SiteLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub gmt_offset: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolarAngles {
    /// solar zenith angle, in radians
    pub zenith: f64,
    /// bounded tangent of the zenith angle
    pub tanzen: f64,
    /// critical canyon orientation beyond which direct sun no longer reaches the road, in radians
    pub crit_orient: f64,
}

/// Intermediate values of the last radiation calculation, kept for inspection.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolarCalcs {
    pub angles: SolarAngles,
    /// direct radiation on a horizontal plane, in W/m2
    pub hor_sol: f64,
    pub kw_term: f64,
    pub kr_term: f64,
    /// radiation received by the walls before reflections, in W/m2
    pub bld_sol: f64,
    /// radiation received by the road before reflections, in W/m2
    pub road_sol: f64,
    /// total radiation reflected by the road, in W/m2
    pub mr: f64,
    /// total radiation reflected by the walls, in W/m2
    pub mw: f64,
}

impl SolarCalcs {
    /// Distribute the radiation of `forcing` over the road, every typology's
    /// wall and roof, and the rural surface. Vegetation heat on the road is
    /// updated on the canyon as well.
    pub fn solarcalcs(
        &mut self,
        ucm: &mut UcmDef,
        bems: &mut [BemDef],
        rural: &mut Element,
        forcing: &Forcing,
        param: &Param,
        clock: &SimulationTimeIteration,
        site: &SiteLocation,
    ) {
        let dir = forcing.dir;
        let dif = forcing.dif;

        if dir + dif <= 0. {
            trace!("No solar radiation at step {}", clock.index);
            *self = Self::default();
            ucm.road.set_solar_received(0.);
            rural.set_solar_received(0.);
            for bem in bems.iter_mut() {
                bem.roof.set_solar_received(0.);
                bem.wall.set_solar_received(0.);
            }
            ucm.sol_rec_road = 0.;
            ucm.sol_rec_roof = 0.;
            ucm.sol_rec_wall = 0.;
            ucm.tree_sens = 0.;
            ucm.tree_lat = 0.;
            return;
        }

        self.angles = solar_angles(
            clock.month,
            clock.day,
            clock.seconds_of_day,
            site,
            ucm.can_aspect,
        );
        self.hor_sol = (self.angles.zenith.cos() * dir).max(0.);
        (self.kw_term, self.kr_term) = exposure_terms(
            ucm.can_aspect,
            self.angles.tanzen,
            self.angles.crit_orient,
        );

        // trees are assumed shorter than the buildings
        self.bld_sol = self.hor_sol * self.kw_term + ucm.wall_conf * dif;
        self.road_sol = self.hor_sol * self.kr_term + ucm.road_conf * dif;

        let alb_road = if param.vegetation_active(clock.month) {
            ucm.road.albedo() * (1. - ucm.road.vegetation_coverage())
                + param.veg_albedo * ucm.road.vegetation_coverage()
        } else {
            ucm.road.albedo()
        };

        (self.mr, self.mw) = reflection_bounces(
            alb_road * self.road_sol,
            ucm.alb_wall * self.bld_sol,
            alb_road,
            ucm.alb_wall,
            ucm.road_conf,
            ucm.wall_conf,
        );

        let road_received = self.road_sol + (1. - ucm.road_conf) * self.mw;
        let roof_received = self.hor_sol + dif;
        let wall_received =
            self.bld_sol + (1. - 2. * ucm.wall_conf) * self.mw + ucm.wall_conf * self.mr;

        ucm.road.set_solar_received(road_received);
        for bem in bems.iter_mut() {
            bem.roof.set_solar_received(roof_received);
            bem.wall.set_solar_received(wall_received);
        }
        rural.set_solar_received(roof_received);

        ucm.sol_rec_roof = roof_received;
        ucm.sol_rec_road = road_received;
        ucm.sol_rec_wall =
            self.bld_sol + (1. - 2. * ucm.wall_conf) * ucm.road.albedo() * self.road_sol;

        // per m2 of vegetation
        ucm.tree_sens = (1. - param.veg_albedo) * (1. - param.tree_latent_fraction) * road_received;
        ucm.tree_lat = (1. - param.veg_albedo) * param.tree_latent_fraction * road_received;
    }
}

/// Solar position following the NOAA approximations.
///
/// Arguments:
/// * `month` - month of year (1-12)
/// * `day` - day of month
/// * `seconds_of_day` - seconds elapsed since midnight
/// * `site` - geographic position
/// * `can_aspect` - canyon height to width ratio
pub fn solar_angles(
    month: u32,
    day: u32,
    seconds_of_day: f64,
    site: &SiteLocation,
    can_aspect: f64,
) -> SolarAngles {
    let ut = (24. + (seconds_of_day.trunc() / 3600. % 24.)) % 24.;
    let first_of_month: u32 = DAYS_IN_MONTH[..(month as usize).clamp(1, 12) - 1].iter().sum();
    let date = (day + first_of_month) as f64 - 1.;
    // fractional year, in radians
    let ad = 2. * PI / 365. * (date - 1. + (ut - 12. / 24.));

    let eqtime = 229.18
        * (0.000075 + 0.001868 * ad.cos()
            - 0.032077 * ad.sin()
            - 0.01461 * (2. * ad).cos()
            - 0.040849 * (2. * ad).sin());
    let decsol = 0.006918 - 0.399912 * ad.cos() + 0.070257 * ad.sin()
        - 0.006758 * (2. * ad).cos()
        + 0.000907 * (2. * ad).sin()
        - 0.002697 * (3. * ad).cos()
        + 0.00148 * (3. * ad).sin();

    let time_offset = eqtime - 4. * site.longitude + 60. * site.gmt_offset;
    let tst = seconds_of_day + time_offset * 60.;
    let ha = (tst / 4. / 60. - 180.) * PI / 180.;
    let zlat = site.latitude.to_radians();

    let zenith = (zlat.sin() * decsol.sin() + zlat.cos() * decsol.cos() * ha.cos())
        .clamp(-1., 1.)
        .acos();
    let tanzen = zenith_tangent(zenith);

    SolarAngles {
        zenith,
        tanzen,
        crit_orient: ((1. / tanzen).abs() / can_aspect).min(1.).asin(),
    }
}

/// Tangent of the zenith angle, held finite near the horizon and the zenith
pub fn zenith_tangent(zenith: f64) -> f64 {
    let from_horizon = 0.5 * PI - zenith;
    if from_horizon.abs() < ZENITH_TOLERANCE {
        if from_horizon > 0. {
            (0.5 * PI - ZENITH_TOLERANCE).tan()
        } else {
            (0.5 * PI + ZENITH_TOLERANCE).tan()
        }
    } else if zenith.abs() < ZENITH_TOLERANCE {
        // tan -> 0 would put the critical orientation at 1/0
        ZENITH_TOLERANCE
    } else {
        zenith.tan()
    }
}

/// Fractions of horizontal direct radiation reaching the walls and the road
pub fn exposure_terms(can_aspect: f64, tanzen: f64, crit_orient: f64) -> (f64, f64) {
    let kw_term = (1. / can_aspect * (0.5 - crit_orient / PI)
        + 1. / PI * tanzen * (1. - crit_orient.cos()))
    .abs()
    .min(1.);
    let kr_term = (2. * crit_orient / PI
        - (2. / PI * can_aspect * tanzen) * (1. - crit_orient.cos()))
    .abs()
    .min(1. - 2. * can_aspect * kw_term);
    (kw_term, kr_term)
}

/// Closed-form sum of the infinite series of reflections between road and
/// walls. Returns the total radiation reflected by the road and by the walls.
///
/// Arguments:
/// * `rr` - first reflection off the road, in W/m2
/// * `rw` - first reflection off the walls, in W/m2
/// * `alb_road`, `alb_wall` - albedos
/// * `road_conf`, `wall_conf` - sky view factors of road and wall
pub fn reflection_bounces(
    rr: f64,
    rw: f64,
    alb_road: f64,
    alb_wall: f64,
    road_conf: f64,
    wall_conf: f64,
) -> (f64, f64) {
    let fr = 1. - (1. - 2. * wall_conf) * alb_wall
        + (1. - road_conf) * wall_conf * alb_road * alb_wall;
    let mr = (rr + (1. - road_conf) * alb_road * (rw + wall_conf * alb_wall * rr)) / fr;
    let mw = (rw + wall_conf * alb_wall * rr) / fr;
    (mr, mw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tests::{boston, canyon_fixture};
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn clock(month: u32, day: u32, seconds_of_day: f64) -> SimulationTimeIteration {
        SimulationTimeIteration {
            index: 1,
            timestep: 300.,
            weather_step: 3600.,
            julian_day: 195,
            month,
            day,
            seconds_of_day,
        }
    }

    #[rstest]
    fn should_receive_nothing_without_radiation() {
        let (mut ucm, mut bems, mut rural) = canyon_fixture();
        let mut calcs = SolarCalcs::default();
        let noon = Forcing {
            dir: 700.,
            dif: 120.,
            ..Default::default()
        };
        calcs.solarcalcs(&mut ucm, &mut bems, &mut rural, &noon, &Param::default(), &clock(7, 15, 61_200.), &boston());
        assert!(ucm.road.solar_received() > 0.);
        assert!(ucm.tree_sens > 0.);

        let night = Forcing::default();
        calcs.solarcalcs(&mut ucm, &mut bems, &mut rural, &night, &Param::default(), &clock(7, 15, 7_200.), &boston());
        assert_eq!(ucm.road.solar_received(), 0.);
        assert_eq!(rural.solar_received(), 0.);
        for bem in &bems {
            assert_eq!(bem.wall.solar_received(), 0.);
            assert_eq!(bem.roof.solar_received(), 0.);
        }
        assert_eq!((ucm.tree_sens, ucm.tree_lat), (0., 0.));
        assert_eq!((ucm.sol_rec_road, ucm.sol_rec_wall, ucm.sol_rec_roof), (0., 0., 0.));
    }

    #[rstest]
    #[case(0.5 * PI - 1e-6)]
    #[case(0.5 * PI + 1e-6)]
    #[case(0.5 * PI)]
    #[case(0.)]
    #[case(1e-7)]
    #[case(PI)]
    fn should_keep_the_zenith_tangent_finite(#[case] zenith: f64) {
        let tanzen = zenith_tangent(zenith);
        assert!(tanzen.is_finite());
        assert!(((1. / tanzen).abs() / 1.).min(1.).asin().is_finite());
    }

    #[rstest]
    fn should_bound_exposure_terms() {
        for aspect in [0.1, 0.25, 0.5, 1., 2., 3., 5.] {
            for degrees in 0..=180 {
                let tanzen = zenith_tangent((degrees as f64).to_radians());
                let crit_orient = ((1. / tanzen).abs() / aspect).min(1.).asin();
                let (kw, kr) = exposure_terms(aspect, tanzen, crit_orient);
                assert!((0. ..=1.).contains(&kw), "kw {kw} at {aspect} {degrees}");
                assert!((0. ..=1.).contains(&kr), "kr {kr} at {aspect} {degrees}");
            }
        }
    }

    #[rstest]
    fn should_sum_the_reflection_series_for_a_square_canyon() {
        let aspect: f64 = 1.;
        let road_conf = (aspect * aspect + 1.).sqrt() - aspect;
        let wall_conf = 0.5 * (aspect + 1. - (aspect * aspect + 1.).sqrt()) / aspect;
        assert_relative_eq!(road_conf, 0.41421356237309515, max_relative = 1e-14);
        assert_relative_eq!(wall_conf, 0.2928932188134524, max_relative = 1e-14);

        let (mr, mw) = reflection_bounces(60., 30., 0.2, 0.2, road_conf, wall_conf);
        assert_relative_eq!(mr, 69.18300417128842, max_relative = 1e-12);
        assert_relative_eq!(mw, 36.27054747698833, max_relative = 1e-12);

        // the closed form satisfies both reflection balances exactly
        let alb = 0.2;
        let fr = 1. - (1. - 2. * wall_conf) * alb + (1. - road_conf) * wall_conf * alb * alb;
        assert_relative_eq!(mw * fr - wall_conf * alb * 60., 30., max_relative = 1e-12);
        assert_relative_eq!(mr, 60. / fr + (1. - road_conf) * alb * mw, max_relative = 1e-12);
    }

    #[rstest]
    fn should_find_the_sun_high_at_summer_noon() {
        let site = boston();
        // solar noon falls near 12:22 local standard time in mid July
        let solar_noon = solar_angles(7, 15, 12.37 * 3600., &site, 1.);
        assert!(solar_noon.zenith < 0.4);
        assert!(solar_noon.zenith < solar_angles(7, 15, 11.5 * 3600., &site, 1.).zenith);
        assert!(solar_noon.zenith < solar_angles(7, 15, 13. * 3600., &site, 1.).zenith);
        assert!(solar_angles(7, 15, 0., &site, 1.).zenith > 0.5 * PI);
    }
}
