// Shared fixtures: a mid-rise neighbourhood in Boston on a clear July day.

use crate::core::building::{BemDef, Building, BuildingParameters};
use crate::core::element::Element;
use crate::core::forcing::Forcing;
use crate::core::material_properties::Material;
use crate::core::param::Param;
use crate::core::rsm::RsmDef;
use crate::core::schedule::{SchDef, WeeklySchedule};
use crate::core::solar_calcs::{SiteLocation, SolarCalcs};
use crate::core::ubl::UblDef;
use crate::core::ucm::{CanyonGeometry, UcmDef};
use crate::core::units::specific_humidity_from_relative;
use crate::core::urbflux::UrbanSystem;
use std::f64::consts::PI;
use std::sync::Arc;

pub(crate) fn boston() -> SiteLocation {
    SiteLocation {
        latitude: 42.37,
        longitude: -71.02,
        gmt_offset: -5.,
    }
}

/// Rural weather of the given hour (0-23): a 25 +/- 5 deg C daily cycle and clear sky
pub(crate) fn summer_forcing(hour: usize) -> Forcing {
    let hour = hour as f64;
    let temp_c = 25. + 5. * (2. * PI * (hour - 9.) / 24.).sin();
    let sun = if hour > 6. && hour < 20. {
        (PI * (hour - 6.) / 14.).sin()
    } else {
        0.
    };
    Forcing {
        temp: temp_c + 273.15,
        hum: specific_humidity_from_relative(60., temp_c, 101_325.),
        pres: 101_325.,
        wind: 3.,
        wind_dir: 270.,
        dir: 700. * sun,
        dif: 120. * sun,
        infra: 380.,
        prec: 0.,
    }
}

fn layers(properties: &[(f64, f64, f64)]) -> (Vec<f64>, Vec<Arc<Material>>) {
    properties.iter()
        .enumerate()
        .map(|(i, (thickness, conductivity, capacity))| {
            (
                *thickness,
                Arc::new(Material::new(&format!("layer {i}"), *conductivity, *capacity)),
            )
        })
        .unzip()
}

fn ground(name: &str, vegetation: f64, temperature: f64) -> Element {
    let (thicknesses, materials) = layers(&[(0.5, 1., 1.6e6)]);
    Element::new(name, 0.1, 0.95, &thicknesses, &materials, vegetation, true, temperature).unwrap()
}

pub(crate) fn office_bem(humidity: f64) -> BemDef {
    let (thicknesses, materials) = layers(&[
        (0.01, 0.692, 1.5e6),
        (0.2, 1.311, 1.874e6),
        (0.05, 0.049, 0.265e6),
        (0.0127, 0.16, 0.8e6),
    ]);
    let wall = Element::new("wall", 0.25, 0.9, &thicknesses, &materials, 0., false, 293.).unwrap();
    let (thicknesses, materials) =
        layers(&[(0.01, 0.16, 1.46e6), (0.1, 0.049, 0.265e6), (0.1, 1.311, 1.874e6)]);
    let roof = Element::new("roof", 0.2, 0.9, &thicknesses, &materials, 0., true, 293.).unwrap();
    let (thicknesses, materials) = layers(&[(0.1, 1.311, 1.874e6)]);
    let mass = Element::new("mass", 0., 0.9, &thicknesses, &materials, 0., true, 293.).unwrap();

    let mut building = Building::new(
        BuildingParameters {
            floor_height: 3.05,
            infiltration: 0.5,
            ventilation: 0.0006,
            glazing_ratio: 0.3,
            u_window: 3.5,
            shgc: 0.4,
            cop: 3.,
            cool_cap: 150.,
            heat_cap: 150.,
            heat_eff: 0.8,
            canyon_fraction: 0.5,
        },
        293.,
        humidity,
    );
    building.int_heat = 8.;
    building.int_frad = 0.5;
    building.int_flat = 0.2;
    building.cool_setpoint = 297.15;
    building.heat_setpoint = 294.15;

    let schedule = SchDef {
        equipment: WeeklySchedule::constant(1.),
        lighting: WeeklySchedule::constant(0.),
        occupancy: WeeklySchedule::constant(0.),
        cooling_setpoint: WeeklySchedule::constant(24.),
        heating_setpoint: WeeklySchedule::constant(21.),
        equipment_gain: 8.,
        lighting_gain: 0.,
        occupant_density: 0.,
    };
    BemDef::new("office", building, wall, roof, mass, 1., schedule)
}

/// Canyon, typologies and rural surface, starting from the midnight weather
pub(crate) fn canyon_fixture() -> (UcmDef, Vec<BemDef>, Element) {
    let start = summer_forcing(0);
    let road = ground("road", 0., start.temp);
    let ucm = UcmDef::new(
        CanyonGeometry {
            bld_height: 20.,
            bld_density: 0.45,
            ver_to_hor: 0.8,
            tree_coverage: 0.,
        },
        0.25,
        road,
        start.temp,
        start.hum,
        3.,
    );
    (ucm, vec![office_bem(start.hum)], ground("rural", 0.9, start.temp))
}

pub(crate) fn urban_system() -> UrbanSystem {
    let start = summer_forcing(0);
    let param = Param::default();
    let (ucm, bems, rural) = canyon_fixture();
    UrbanSystem {
        ucm,
        ubl: UblDef::new(param.char_length, start.temp, start.hum),
        rsm: RsmDef::new(boston(), param.rural_obstacle_height, start.temp, &param).unwrap(),
        bems,
        rural,
        solar: SolarCalcs::default(),
    }
}
