use crate::core::element::Element;
use crate::core::forcing::Forcing;
use crate::core::param::Param;
use crate::core::rsm::RsmDef;
use crate::core::ucm::UcmDef;
use crate::core::units::{moist_air_density, CP_AIR, GRAVITY, LATENT_HEAT_EVAPORATION};
use tracing::trace;

/// Well-mixed urban boundary layer over the neighbourhood, fed by the
/// canyon from below and by rural air advected through its sides.
#[derive(Clone, Debug)]
pub struct UblDef {
    /// characteristic length of the urban area, in m
    char_length: f64,
    pub(crate) temperature: f64,
    pub(crate) humidity: f64,
    /// whether the daytime boundary layer height applies
    pub(crate) daytime: bool,
}

impl UblDef {
    pub fn new(char_length: f64, temperature: f64, humidity: f64) -> Self {
        Self {
            char_length,
            temperature,
            humidity,
            daytime: false,
        }
    }

    /// Boundary layer temperature, in K
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    pub fn is_daytime(&self) -> bool {
        self.daytime
    }

    /// Advance the boundary layer by one step.
    ///
    /// Arguments:
    /// * `ucm` - converged canyon state
    /// * `rsm` - rural profile of this step
    /// * `rural` - rural surface element
    /// * `forcing` - rural weather
    /// * `param` - boundary layer heights and coefficients
    /// * `roof_solar` - solar radiation on the roofs, drives the day/night switch
    /// * `dt` - step length, in seconds
    pub(crate) fn ubl_model(
        &mut self,
        ucm: &UcmDef,
        rsm: &RsmDef,
        rural: &Element,
        forcing: &Forcing,
        param: &Param,
        roof_solar: f64,
        dt: f64,
    ) {
        // hysteresis between the two thresholds keeps the regime steady at dawn and dusk
        if roof_solar > param.max_day {
            if !self.daytime {
                trace!("Urban boundary layer switches to daytime");
            }
            self.daytime = true;
        } else if roof_solar < param.max_night {
            self.daytime = false;
        }
        let height = if self.daytime {
            param.day_bl_height
        } else {
            param.night_bl_height
        };

        let dens = moist_air_density(forcing.pres, self.temperature, forcing.hum);
        let heat_dif = (ucm.sens_heat - rural.sensible_heat()).max(0.);
        let circulation = if self.daytime {
            param.circ_coeff * (GRAVITY * heat_dif * height / dens / CP_AIR / forcing.temp).cbrt()
        } else {
            0.
        };

        // rural air entering through the sides, level by level up to the layer top
        let faces = rsm.faces();
        let mut advected = 0.;
        let mut advected_temperature = 0.;
        for (i, (&density, (&wind, &temperature))) in rsm
            .densities
            .iter()
            .zip(rsm.wind.iter().zip(&rsm.temperatures))
            .enumerate()
        {
            let bottom = faces[i];
            let top = faces[i + 1].min(height);
            if top <= bottom {
                break;
            }
            let inflow = density * wind.max(circulation) * (top - bottom) / self.char_length;
            advected += inflow;
            advected_temperature += inflow * temperature;
        }
        let inversion = faces[faces.len() - 1];
        if height > inversion {
            let last = rsm.layer_count() - 1;
            let inflow = rsm.densities[last] * rsm.wind[last].max(circulation) * (height - inversion)
                / self.char_length;
            advected += inflow;
            advected_temperature += inflow * rsm.temperatures[last];
        }

        let storage = dens * CP_AIR * height / dt;
        self.temperature = (storage * self.temperature + ucm.sens_heat + CP_AIR * advected_temperature)
            / (storage + CP_AIR * advected);

        let moisture_storage = dens * height / dt;
        self.humidity = (moisture_storage * self.humidity
            + ucm.lat_heat / LATENT_HEAT_EVAPORATION
            + advected * forcing.hum)
            / (moisture_storage + advected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tests::{boston, canyon_fixture};
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn forcing() -> Forcing {
        Forcing {
            temp: 298.,
            hum: 0.012,
            pres: 101_325.,
            wind: 3.,
            ..Default::default()
        }
    }

    fn rural_profile(param: &Param) -> RsmDef {
        let mut rsm = RsmDef::new(boston(), 0.1, 298., param).unwrap();
        rsm.vdm(&forcing(), -5., param, 300.).unwrap();
        rsm
    }

    #[rstest]
    fn should_switch_regime_with_hysteresis() {
        let param = Param::default();
        let (ucm, _, rural) = canyon_fixture();
        let rsm = rural_profile(&param);
        let mut ubl = UblDef::new(500., 298., 0.012);

        for (solar, daytime) in [(100., false), (200., true), (100., true), (10., false), (100., false)] {
            ubl.ubl_model(&ucm, &rsm, &rural, &forcing(), &param, solar, 300.);
            assert_eq!(ubl.is_daytime(), daytime, "at {solar} W/m2");
        }
    }

    #[rstest]
    fn should_relax_towards_rural_air_without_urban_heat() {
        let param = Param::default();
        let (mut ucm, _, rural) = canyon_fixture();
        ucm.sens_heat = 0.;
        ucm.lat_heat = 0.;
        let rsm = rural_profile(&param);
        let mut ubl = UblDef::new(500., 302., 0.012);
        for _ in 0..12 {
            ubl.ubl_model(&ucm, &rsm, &rural, &forcing(), &param, 0., 300.);
        }
        assert!(ubl.temperature() < 302.);
        assert!(ubl.temperature() > 298.);
        assert_relative_eq!(ubl.humidity(), 0.012, max_relative = 1e-12);
    }

    #[rstest]
    fn should_warm_with_urban_sensible_heat() {
        let param = Param::default();
        let (mut ucm, _, rural) = canyon_fixture();
        let rsm = rural_profile(&param);
        let mut ubl = UblDef::new(500., 298., 0.012);
        ucm.sens_heat = 100.;
        ucm.lat_heat = 0.;
        ubl.ubl_model(&ucm, &rsm, &rural, &forcing(), &param, 0., 300.);
        assert!(ubl.temperature() > 298.);
    }
}
