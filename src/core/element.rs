// This module provides the layered 1-D conduction model shared by walls,
// roofs, internal mass, the road and the rural reference surface.
// Layers are split into nodes no thicker than MAX_NODE_THICKNESS and
// integrated with a Crank-Nicolson scheme.

use crate::core::material_properties::Material;
use crate::core::solvers::solve_tridiagonal;
use crate::errors::ElementError;
use std::sync::Arc;

const MAX_NODE_THICKNESS: f64 = 0.05; // m
const IMPLICIT_WEIGHT: f64 = 0.5;
const EXPLICIT_WEIGHT: f64 = 1. - IMPLICIT_WEIGHT;

/// Condition applied at the face of the element away from the exposed surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InnerBoundary {
    /// heat flux into the element, in W/m2
    HeatFlux(f64),
    /// fixed temperature, in K (e.g. deep soil under a road)
    FixedTemperature(f64),
}

/// Partitioning of short-wave radiation on vegetated horizontal surfaces
/// during the vegetation-active season.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VegetationExchange {
    pub albedo: f64,
    pub latent_fraction: f64,
}

#[derive(Clone, Debug)]
pub struct Element {
    name: String,
    albedo: f64,
    emissivity: f64,
    vegetation_coverage: f64,
    horizontal: bool,
    node_thicknesses: Vec<f64>,
    node_materials: Vec<Arc<Material>>,
    temperatures: Vec<f64>,
    inner_boundary: InnerBoundary,
    vegetation: Option<VegetationExchange>,
    solar_received: f64,
    solar_absorbed: f64,
    infrared: f64,
    sensible_heat: f64,
    latent_heat: f64,
    convection_coefficient: f64,
    surface_flux: f64,
}

impl Element {
    /// Arguments:
    /// * `name` - used in error messages and logs
    /// * `albedo` - short-wave reflectivity of the exposed surface
    /// * `emissivity` - long-wave emissivity of the exposed surface
    /// * `thicknesses` - layer thicknesses from the exposed surface inwards, in m
    /// * `materials` - one material per layer
    /// * `vegetation_coverage` - fraction of the surface covered by vegetation
    /// * `horizontal` - true for roofs, roads and ground; false for walls
    /// * `initial_temperature` - uniform initial temperature, in K
    pub fn new(
        name: &str,
        albedo: f64,
        emissivity: f64,
        thicknesses: &[f64],
        materials: &[Arc<Material>],
        vegetation_coverage: f64,
        horizontal: bool,
        initial_temperature: f64,
    ) -> Result<Self, ElementError> {
        if thicknesses.is_empty() {
            return Err(ElementError::NoLayers {
                name: name.to_string(),
            });
        }
        if thicknesses.len() != materials.len() {
            return Err(ElementError::LengthMismatch {
                name: name.to_string(),
                thicknesses: thicknesses.len(),
                materials: materials.len(),
            });
        }
        for (layer, (thickness, material)) in thicknesses.iter().zip(materials).enumerate() {
            let checks = [
                ("thickness", *thickness),
                ("thermal conductivity", material.thermal_conductivity()),
                ("heat capacity", material.volumetric_heat_capacity()),
            ];
            if let Some((quantity, value)) = checks.into_iter().find(|(_, v)| !(*v > 0.)) {
                return Err(ElementError::NonPositive {
                    name: name.to_string(),
                    layer,
                    quantity,
                    value,
                });
            }
        }

        let mut node_thicknesses = vec![];
        let mut node_materials = vec![];
        for (thickness, material) in thicknesses.iter().zip(materials) {
            let nodes = ((thickness / MAX_NODE_THICKNESS) - 1e-9).ceil().max(1.) as usize;
            for _ in 0..nodes {
                node_thicknesses.push(thickness / nodes as f64);
                node_materials.push(Arc::clone(material));
            }
        }
        let temperatures = vec![initial_temperature; node_thicknesses.len()];

        Ok(Self {
            name: name.to_string(),
            albedo,
            emissivity,
            vegetation_coverage,
            horizontal,
            node_thicknesses,
            node_materials,
            temperatures,
            inner_boundary: InnerBoundary::HeatFlux(0.),
            vegetation: None,
            solar_received: 0.,
            solar_absorbed: 0.,
            infrared: 0.,
            sensible_heat: 0.,
            latent_heat: 0.,
            convection_coefficient: 0.,
            surface_flux: 0.,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn albedo(&self) -> f64 {
        self.albedo
    }

    pub fn emissivity(&self) -> f64 {
        self.emissivity
    }

    pub fn vegetation_coverage(&self) -> f64 {
        self.vegetation_coverage
    }

    pub(crate) fn set_vegetation_coverage(&mut self, vegetation_coverage: f64) {
        self.vegetation_coverage = vegetation_coverage;
    }

    pub fn is_horizontal(&self) -> bool {
        self.horizontal
    }

    pub fn total_thickness(&self) -> f64 {
        self.node_thicknesses.iter().sum()
    }

    pub fn node_count(&self) -> usize {
        self.temperatures.len()
    }

    /// Temperature of the exposed surface node, in K
    pub fn surface_temperature(&self) -> f64 {
        self.temperatures[0]
    }

    /// Temperature of the innermost node, in K
    pub fn inner_temperature(&self) -> f64 {
        self.temperatures[self.temperatures.len() - 1]
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    pub(crate) fn restore_temperatures(&mut self, temperatures: &[f64]) {
        self.temperatures.copy_from_slice(temperatures);
    }

    pub fn solar_received(&self) -> f64 {
        self.solar_received
    }

    pub(crate) fn set_solar_received(&mut self, solar_received: f64) {
        self.solar_received = solar_received;
    }

    pub fn solar_absorbed(&self) -> f64 {
        self.solar_absorbed
    }

    /// Net long-wave radiation absorbed at the exposed surface, in W/m2
    pub fn infrared(&self) -> f64 {
        self.infrared
    }

    pub(crate) fn set_infrared(&mut self, infrared: f64) {
        self.infrared = infrared;
    }

    pub(crate) fn set_inner_boundary(&mut self, inner_boundary: InnerBoundary) {
        self.inner_boundary = inner_boundary;
    }

    /// Set the vegetation exchange used while vegetation is active, `None` out of season.
    pub(crate) fn set_vegetation_season(&mut self, vegetation: Option<VegetationExchange>) {
        self.vegetation = vegetation;
    }

    /// Sensible heat released from the surface to the air, in W/m2
    pub fn sensible_heat(&self) -> f64 {
        self.sensible_heat
    }

    /// Latent heat released by surface vegetation, in W/m2
    pub fn latent_heat(&self) -> f64 {
        self.latent_heat
    }

    /// Convective heat transfer coefficient of the last step, in W/(m2.K)
    pub fn convection_coefficient(&self) -> f64 {
        self.convection_coefficient
    }

    /// Net heat flux into the exposed surface during the last step, in W/m2
    pub fn surface_flux(&self) -> f64 {
        self.surface_flux
    }

    /// Exchange heat with adjacent air moving at `wind_speed` (m/s) and advance conduction.
    pub fn exchange_with_air(
        &mut self,
        air_temperature: f64,
        wind_speed: f64,
        dt: f64,
    ) -> anyhow::Result<f64> {
        let convection_coefficient = 5.8 + 3.7 * wind_speed;
        self.advance(air_temperature, self.solar_received, convection_coefficient, dt)
    }

    /// Advance the element by one step and return the new surface temperature.
    ///
    /// Arguments:
    /// * `air_temperature` - temperature of the adjacent air, in K
    /// * `received_solar` - short-wave radiation incident on the surface, in W/m2
    /// * `convection_coefficient` - in W/(m2.K)
    /// * `dt` - step length, in seconds
    pub fn advance(
        &mut self,
        air_temperature: f64,
        received_solar: f64,
        convection_coefficient: f64,
        dt: f64,
    ) -> anyhow::Result<f64> {
        self.solar_received = received_solar;
        self.convection_coefficient = convection_coefficient;

        let (vegetation_sensible, vegetation_latent) = match self.vegetation {
            Some(vegetation) if self.horizontal => {
                let leaf_absorbed =
                    self.vegetation_coverage * (1. - vegetation.albedo) * received_solar;
                self.solar_absorbed = (1. - self.vegetation_coverage)
                    * (1. - self.albedo)
                    * received_solar
                    + leaf_absorbed;
                (
                    (1. - vegetation.latent_fraction) * leaf_absorbed,
                    vegetation.latent_fraction * leaf_absorbed,
                )
            }
            _ => {
                self.solar_absorbed = (1. - self.albedo) * received_solar;
                (0., 0.)
            }
        };

        self.latent_heat = vegetation_latent;
        self.sensible_heat = vegetation_sensible
            + convection_coefficient * (self.surface_temperature() - air_temperature);
        self.surface_flux =
            -self.sensible_heat + self.solar_absorbed + self.infrared - self.latent_heat;

        self.conduct(self.surface_flux, dt)?;
        Ok(self.surface_temperature())
    }

    /// Integrate conduction through the slab for one step given the heat flux
    /// entering the exposed surface, in W/m2.
    pub fn conduct(&mut self, surface_flux: f64, dt: f64) -> anyhow::Result<()> {
        let n = self.temperatures.len();
        let t = &self.temperatures;
        let capacity: Vec<f64> = self
            .node_thicknesses
            .iter()
            .zip(&self.node_materials)
            .map(|(d, m)| m.areal_heat_capacity(*d) / dt)
            .collect();

        // conductance between node j-1 and node j, in W/(m2.K)
        let mut conductance = vec![0.; n];
        for j in 1..n {
            conductance[j] = 2.
                / (self.node_materials[j - 1].thermal_resistance(self.node_thicknesses[j - 1])
                    + self.node_materials[j].thermal_resistance(self.node_thicknesses[j]));
        }

        let mut lower = vec![0.; n];
        let mut diagonal = vec![0.; n];
        let mut upper = vec![0.; n];
        let mut rhs = vec![0.; n];

        if n == 1 {
            match self.inner_boundary {
                InnerBoundary::HeatFlux(inner_flux) => {
                    diagonal[0] = capacity[0];
                    rhs[0] = capacity[0] * t[0] + surface_flux + inner_flux;
                }
                InnerBoundary::FixedTemperature(temperature) => {
                    diagonal[0] = 1.;
                    rhs[0] = temperature;
                }
            }
        } else {
            diagonal[0] = capacity[0] + IMPLICIT_WEIGHT * conductance[1];
            upper[0] = -IMPLICIT_WEIGHT * conductance[1];
            rhs[0] = capacity[0] * t[0] - EXPLICIT_WEIGHT * conductance[1] * (t[0] - t[1])
                + surface_flux;

            for j in 1..n - 1 {
                lower[j] = -IMPLICIT_WEIGHT * conductance[j];
                diagonal[j] = capacity[j] + IMPLICIT_WEIGHT * (conductance[j] + conductance[j + 1]);
                upper[j] = -IMPLICIT_WEIGHT * conductance[j + 1];
                rhs[j] = capacity[j] * t[j]
                    + EXPLICIT_WEIGHT
                        * (conductance[j] * (t[j - 1] - t[j])
                            + conductance[j + 1] * (t[j + 1] - t[j]));
            }

            let last = n - 1;
            match self.inner_boundary {
                InnerBoundary::HeatFlux(inner_flux) => {
                    lower[last] = -IMPLICIT_WEIGHT * conductance[last];
                    diagonal[last] = capacity[last] + IMPLICIT_WEIGHT * conductance[last];
                    rhs[last] = capacity[last] * t[last]
                        + EXPLICIT_WEIGHT * conductance[last] * (t[last - 1] - t[last])
                        + inner_flux;
                }
                InnerBoundary::FixedTemperature(temperature) => {
                    diagonal[last] = 1.;
                    rhs[last] = temperature;
                }
            }
        }

        self.temperatures = solve_tridiagonal(&lower, &diagonal, &upper, &rhs)
            .map_err(|e| e.context(format!("conduction through element '{}'", self.name)))?;
        Ok(())
    }

    /// Heat stored in the slab relative to 0 K, in J/m2
    pub fn heat_content(&self) -> f64 {
        self.temperatures
            .iter()
            .zip(self.node_thicknesses.iter().zip(&self.node_materials))
            .map(|(t, (d, m))| t * m.areal_heat_capacity(*d))
            .sum()
    }
}
