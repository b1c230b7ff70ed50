// Rural site model: vertical diffusion of heat over the reference (rural)
// site on a stretched grid running from the ground to the inversion height.

use crate::core::forcing::Forcing;
use crate::core::param::Param;
use crate::core::solar_calcs::SiteLocation;
use crate::core::solvers::solve_tridiagonal;
use crate::core::units::{CP_AIR, GRAVITY, R_DRY_AIR, VON_KARMAN};
use anyhow::bail;

const FIRST_LAYER_THICKNESS: f64 = 2.; // m
const LAYER_STRETCH: f64 = 1.2;
/// rural sensible heat above which the surface layer is treated as unstable, in W/m2
const UNSTABLE_SENSIBLE_HEAT: f64 = 1e-2;
const MIN_TURBULENT_ENERGY: f64 = 0.01;
const STABLE_MIXING_LENGTH: f64 = 40.; // m
const MIN_OBUKHOV_LENGTH: f64 = -50.; // m

#[derive(Clone, Debug)]
pub struct RsmDef {
    pub(crate) location: SiteLocation,
    /// rural roughness length, in m
    pub(crate) z0r: f64,
    /// rural displacement height, in m
    pub(crate) disp: f64,
    /// heights of the cell faces, from the ground to the inversion height
    faces: Vec<f64>,
    /// heights of the cell centres
    heights: Vec<f64>,
    thicknesses: Vec<f64>,
    pub(crate) temperatures: Vec<f64>,
    pub(crate) wind: Vec<f64>,
    pub(crate) densities: Vec<f64>,
    pub(crate) ustar: f64,
}

impl RsmDef {
    /// Arguments:
    /// * `location` - geographic position of the site
    /// * `obstacle_height` - average obstacle height at the rural site, in m
    /// * `initial_temperature` - uniform initial profile, in K
    /// * `param` - supplies the inversion height
    pub fn new(
        location: SiteLocation,
        obstacle_height: f64,
        initial_temperature: f64,
        param: &Param,
    ) -> anyhow::Result<Self> {
        let faces = stretched_faces(param.ref_height);
        if faces.len() < 4 {
            bail!(
                "Inversion height of {} m leaves fewer than three rural layers",
                param.ref_height
            );
        }
        let heights: Vec<f64> = faces.windows(2).map(|f| 0.5 * (f[0] + f[1])).collect();
        let thicknesses: Vec<f64> = faces.windows(2).map(|f| f[1] - f[0]).collect();
        let layers = heights.len();

        Ok(Self {
            location,
            z0r: 0.1 * obstacle_height,
            disp: 0.5 * obstacle_height,
            faces,
            heights,
            thicknesses,
            temperatures: vec![initial_temperature; layers],
            wind: vec![0.; layers],
            densities: vec![1.2; layers],
            ustar: 0.,
        })
    }

    pub fn location(&self) -> &SiteLocation {
        &self.location
    }

    pub fn faces(&self) -> &[f64] {
        &self.faces
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    pub fn wind(&self) -> &[f64] {
        &self.wind
    }

    pub fn layer_count(&self) -> usize {
        self.heights.len()
    }

    /// Advance the rural profile by one step.
    ///
    /// Arguments:
    /// * `forcing` - rural weather; its temperature fixes the lowest layer
    /// * `rural_sensible` - sensible heat of the rural surface, in W/m2
    /// * `param` - supplies the measurement and boundary layer heights
    /// * `dt` - step length, in seconds
    pub(crate) fn vdm(
        &mut self,
        forcing: &Forcing,
        rural_sensible: f64,
        param: &Param,
        dt: f64,
    ) -> anyhow::Result<()> {
        let n = self.layer_count();
        self.temperatures[0] = forcing.temp;

        self.densities = self
            .heights
            .iter()
            .zip(&self.temperatures)
            .map(|(z, t)| {
                forcing.pres * (-GRAVITY * z / (R_DRY_AIR * t)).exp()
                    / (R_DRY_AIR * (t - GRAVITY / CP_AIR * z))
            })
            .collect();
        let mut face_density = vec![self.densities[0]; n + 1];
        for i in 1..n {
            face_density[i] = (self.densities[i - 1] * self.thicknesses[i]
                + self.densities[i] * self.thicknesses[i - 1])
                / (self.thicknesses[i - 1] + self.thicknesses[i]);
        }
        face_density[n] = self.densities[n - 1];

        let ustar = VON_KARMAN * forcing.wind / ((param.wind_height - self.disp) / self.z0r).ln();
        let rho = self.densities[0];
        let t0 = self.temperatures[0];
        let unstable = rural_sensible > UNSTABLE_SENSIBLE_HEAT;
        let h_day = param.day_bl_height;

        let (mixing_length, turbulent_energy): (f64, Box<dyn Fn(f64) -> f64>) = if unstable {
            let obukhov = (-rho * CP_AIR * ustar.powi(3) * t0
                / VON_KARMAN
                / GRAVITY
                / rural_sensible)
                .max(MIN_OBUKHOV_LENGTH);
            let wstar = (GRAVITY * rural_sensible * h_day / rho / CP_AIR / t0).cbrt();
            let phim = (1. - 8. * 0.1 * h_day / obukhov).powf(-1. / 3.);
            (
                0.15 * h_day,
                Box::new(move |z: f64| {
                    (ustar.powi(3) + phim * VON_KARMAN * wstar.powi(3) * z / h_day)
                        .powf(2. / 3.)
                        .max(MIN_TURBULENT_ENERGY)
                }),
            )
        } else {
            (
                STABLE_MIXING_LENGTH,
                Box::new(move |_| (ustar.powi(2) / 0.3_f64.powi(2)).max(MIN_TURBULENT_ENERGY)),
            )
        };

        // diffusivity at each inner face, Blackadar mixing length
        let mut conductance = vec![0.; n + 1];
        for (j, value) in conductance.iter_mut().enumerate().take(n).skip(1) {
            let z = self.faces[j];
            let length = VON_KARMAN * z / (1. + VON_KARMAN * z / mixing_length);
            let diffusivity = 0.4 * length * turbulent_energy(z).sqrt();
            *value = 2. * face_density[j] * diffusivity
                / (self.thicknesses[j] + self.thicknesses[j - 1]);
        }

        let mut lower = vec![0.; n];
        let mut diagonal = vec![0.; n];
        let mut upper = vec![0.; n];
        let mut rhs = vec![0.; n];
        diagonal[0] = 1.;
        rhs[0] = self.temperatures[0];
        for i in 1..n - 1 {
            let scale = dt / self.thicknesses[i] / self.densities[i];
            lower[i] = -conductance[i] * scale;
            upper[i] = -conductance[i + 1] * scale;
            diagonal[i] = 1. + (conductance[i] + conductance[i + 1]) * scale;
            rhs[i] = self.temperatures[i];
        }
        // zero gradient at the inversion height
        lower[n - 1] = -1.;
        diagonal[n - 1] = 1.;

        self.temperatures = solve_tridiagonal(&lower, &diagonal, &upper, &rhs)
            .map_err(|e| e.context("rural vertical diffusion"))?;

        // a heated surface keeps the rural column well mixed: no layer stays
        // colder than the surface layer
        if unstable {
            let surface = self.temperatures[0];
            for temperature in self.temperatures.iter_mut() {
                *temperature = temperature.max(surface);
            }
        }

        self.wind = self
            .heights
            .iter()
            .map(|z| ustar / VON_KARMAN * ((z - self.disp) / self.z0r).max(1.).ln())
            .collect();
        self.ustar = ustar;
        Ok(())
    }
}

/// Faces of a grid whose layers start at FIRST_LAYER_THICKNESS and grow by
/// LAYER_STRETCH up to `top`. A thin last layer is merged into the one below.
fn stretched_faces(top: f64) -> Vec<f64> {
    let mut faces = vec![0.];
    let mut thickness = FIRST_LAYER_THICKNESS;
    while faces[faces.len() - 1] + thickness < top {
        faces.push(faces[faces.len() - 1] + thickness);
        thickness *= LAYER_STRETCH;
    }
    faces.push(top);
    let n = faces.len();
    if n >= 3 && faces[n - 1] - faces[n - 2] < 0.5 * (faces[n - 2] - faces[n - 3]) {
        faces.remove(n - 2);
    }
    faces
}
