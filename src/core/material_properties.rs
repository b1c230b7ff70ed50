use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

/// This module contains data on the thermal properties of construction
/// materials, and the shared library of materials used by the reference
/// buildings and the pavement.

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Material {
    name: String,
    thermal_conductivity: f64,     // W/(m.K)
    volumetric_heat_capacity: f64, // J/(m3.K)
}

impl Material {
    pub fn new(name: &str, thermal_conductivity: f64, volumetric_heat_capacity: f64) -> Self {
        Self {
            name: name.to_string(),
            thermal_conductivity,
            volumetric_heat_capacity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thermal_conductivity(&self) -> f64 {
        self.thermal_conductivity
    }

    pub fn volumetric_heat_capacity(&self) -> f64 {
        self.volumetric_heat_capacity
    }

    /// Return thermal resistance of a layer of this material, in (m2.K)/W
    ///
    /// Arguments:
    /// * `thickness` - layer thickness, in m
    pub fn thermal_resistance(&self, thickness: f64) -> f64 {
        thickness / self.thermal_conductivity
    }

    /// Return areal heat capacity of a layer of this material, in J/(m2.K)
    ///
    /// Arguments:
    /// * `thickness` - layer thickness, in m
    pub fn areal_heat_capacity(&self, thickness: f64) -> f64 {
        thickness * self.volumetric_heat_capacity
    }
}

// Properties from the DOE commercial reference building constructions
pub static STUCCO: LazyLock<Arc<Material>> =
    LazyLock::new(|| Arc::new(Material::new("Stucco", 0.6918, 1_543_000.)));
pub static CONCRETE: LazyLock<Arc<Material>> =
    LazyLock::new(|| Arc::new(Material::new("Concrete", 1.311, 2_096_400.)));
pub static INSULATION: LazyLock<Arc<Material>> =
    LazyLock::new(|| Arc::new(Material::new("Insulation", 0.049, 36_000.)));
pub static GYPSUM: LazyLock<Arc<Material>> =
    LazyLock::new(|| Arc::new(Material::new("Gypsum", 0.16, 654_400.)));
pub static WOOD: LazyLock<Arc<Material>> =
    LazyLock::new(|| Arc::new(Material::new("Wood", 0.12, 869_600.)));
pub static BRICK: LazyLock<Arc<Material>> =
    LazyLock::new(|| Arc::new(Material::new("Brick", 0.89, 1_504_000.)));
pub static ROOF_MEMBRANE: LazyLock<Arc<Material>> =
    LazyLock::new(|| Arc::new(Material::new("RoofMembrane", 0.16, 1_461_000.)));
pub static STEEL: LazyLock<Arc<Material>> =
    LazyLock::new(|| Arc::new(Material::new("Steel", 45.006, 3_912_250.)));

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    pub fn asphalt() -> Material {
        Material::new("Asphalt", 1.0, 1.6e6)
    }

    #[rstest]
    pub fn should_have_correct_properties(asphalt: Material) {
        assert_eq!(asphalt.name(), "Asphalt");
        assert_eq!(
            asphalt.thermal_conductivity(),
            1.0,
            "incorrect thermal conductivity returned"
        );
        assert_eq!(
            asphalt.volumetric_heat_capacity(),
            1.6e6,
            "incorrect volumetric heat capacity returned"
        );
    }

    #[rstest]
    pub fn should_calculate_layer_properties(asphalt: Material) {
        assert_relative_eq!(asphalt.thermal_resistance(0.5), 0.5);
        assert_relative_eq!(asphalt.areal_heat_capacity(0.5), 8.0e5);
        assert_relative_eq!(INSULATION.thermal_resistance(0.05), 1.020408163, max_relative = 1e-9);
    }

    #[rstest]
    pub fn should_share_library_materials() {
        let first = Arc::clone(&CONCRETE);
        let second = Arc::clone(&CONCRETE);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
