use crate::core::element::VegetationExchange;
use crate::core::schedule::InternalGainFractions;

/// Simulation-wide physical and empirical constants, fixed for a run once
/// built from the input parameter objects.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    /// daytime urban boundary layer height, in m
    pub day_bl_height: f64,
    /// night-time urban boundary layer height, in m
    pub night_bl_height: f64,
    /// inversion (reference) height, top of the rural diffusion column, in m
    pub ref_height: f64,
    /// rural temperature measurement height, in m
    pub temp_height: f64,
    /// rural wind measurement height, in m
    pub wind_height: f64,
    /// average obstacle height at the rural site, in m
    pub rural_obstacle_height: f64,
    pub circ_coeff: f64,
    pub ex_coeff: f64,
    /// characteristic length of the urban area, in m
    pub char_length: f64,
    pub veg_albedo: f64,
    pub tree_latent_fraction: f64,
    pub grass_latent_fraction: f64,
    /// first month (1-12) of the vegetation-active season
    pub veg_start: u32,
    /// last month (1-12) of the vegetation-active season
    pub veg_end: u32,
    /// roof-level solar radiation above which the boundary layer switches to daytime, in W/m2
    pub max_day: f64,
    /// roof-level solar radiation below which the boundary layer switches to night-time, in W/m2
    pub max_night: f64,
    /// minimum wind speed, in m/s
    pub wind_min: f64,
    /// convergence tolerance on canyon air temperature, in K
    pub tolerance: f64,
    pub max_iterations: usize,
    pub gain_fractions: InternalGainFractions,
}

impl Param {
    /// Whether trees and grass exchange latent heat in the given month (1-12)
    pub fn vegetation_active(&self, month: u32) -> bool {
        !(month < self.veg_start || month > self.veg_end)
    }

    pub fn grass_exchange(&self, month: u32) -> Option<VegetationExchange> {
        self.vegetation_active(month).then_some(VegetationExchange {
            albedo: self.veg_albedo,
            latent_fraction: self.grass_latent_fraction,
        })
    }
}

impl Default for Param {
    fn default() -> Self {
        Self {
            day_bl_height: 1000.,
            night_bl_height: 80.,
            ref_height: 150.,
            temp_height: 10.,
            wind_height: 10.,
            rural_obstacle_height: 0.1,
            circ_coeff: 1.2,
            ex_coeff: 1.0,
            char_length: 500.,
            veg_albedo: 0.25,
            tree_latent_fraction: 0.7,
            grass_latent_fraction: 0.5,
            veg_start: 4,
            veg_end: 10,
            max_day: 150.,
            max_night: 20.,
            wind_min: 1.,
            tolerance: 1e-3,
            max_iterations: 40,
            gain_fractions: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case(3, false)]
    #[case(4, true)]
    #[case(7, true)]
    #[case(10, true)]
    #[case(11, false)]
    fn should_know_the_vegetation_season(#[case] month: u32, #[case] active: bool) {
        let param = Param::default();
        assert_eq!(param.vegetation_active(month), active);
        assert_eq!(param.grass_exchange(month).is_some(), active);
    }
}
