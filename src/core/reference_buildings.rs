// Built-in defaults for the commercial and residential reference buildings,
// keyed by program and construction era and scaled by climate zone.

use crate::core::material_properties::{
    Material, BRICK, CONCRETE, GYPSUM, INSULATION, ROOF_MEMBRANE, STEEL, STUCCO, WOOD,
};
use crate::core::schedule::{SchDef, WeeklySchedule};
use crate::input::{BuildingProgram, BuiltEra, ClimateZone};
use std::sync::Arc;

/// Layers of one envelope element, outermost first
#[derive(Clone, Debug)]
pub struct Construction {
    pub albedo: f64,
    pub emissivity: f64,
    pub thicknesses: Vec<f64>,
    pub materials: Vec<Arc<Material>>,
}

impl Construction {
    fn new(albedo: f64, layers: &[(f64, &Arc<Material>)]) -> Self {
        Self {
            albedo,
            emissivity: 0.9,
            thicknesses: layers.iter().map(|(t, _)| *t).collect(),
            materials: layers.iter().map(|(_, m)| Arc::clone(m)).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReferenceBuilding {
    pub wall: Construction,
    pub roof: Construction,
    pub mass: Construction,
    pub glazing_ratio: f64,
    /// window U-value, in W/(m2.K)
    pub u_window: f64,
    pub shgc: f64,
    /// in air changes per hour
    pub infiltration: f64,
    /// in m3/s per m2 of floor
    pub ventilation: f64,
    pub cop: f64,
    pub heat_eff: f64,
    /// in W/m2 of floor
    pub cool_cap: f64,
    pub heat_cap: f64,
    pub schedule: SchDef,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum WallType {
    Mass,
    SteelFrame,
    WoodFrame,
    Masonry,
}

/// Opening hours (start, end) per day type; `None` means closed all day
#[derive(Clone, Copy, Debug)]
struct Occupancy {
    weekday: Option<(usize, usize)>,
    saturday: Option<(usize, usize)>,
    sunday: Option<(usize, usize)>,
    /// fraction of peak loads while closed
    closed_load: f64,
    /// whether the setpoints are relaxed outside opening hours
    setback: bool,
}

const ALWAYS: Occupancy = Occupancy {
    weekday: Some((0, 24)),
    saturday: Some((0, 24)),
    sunday: Some((0, 24)),
    closed_load: 1.,
    setback: false,
};
const OFFICE_HOURS: Occupancy = Occupancy {
    weekday: Some((7, 19)),
    saturday: Some((8, 13)),
    sunday: None,
    closed_load: 0.1,
    setback: true,
};
const SCHOOL_HOURS: Occupancy = Occupancy {
    weekday: Some((7, 17)),
    saturday: None,
    sunday: None,
    closed_load: 0.05,
    setback: true,
};
const SHOP_HOURS: Occupancy = Occupancy {
    weekday: Some((9, 21)),
    saturday: Some((9, 21)),
    sunday: Some((10, 18)),
    closed_load: 0.15,
    setback: true,
};
const RESTAURANT_HOURS: Occupancy = Occupancy {
    weekday: Some((10, 23)),
    saturday: Some((10, 23)),
    sunday: Some((10, 22)),
    closed_load: 0.2,
    setback: true,
};
const HOME: Occupancy = Occupancy {
    weekday: Some((17, 24)),
    saturday: Some((8, 24)),
    sunday: Some((8, 24)),
    closed_load: 0.45,
    setback: false,
};
const HOTEL: Occupancy = Occupancy {
    weekday: Some((16, 24)),
    saturday: Some((14, 24)),
    sunday: Some((14, 24)),
    closed_load: 0.4,
    setback: false,
};
const WAREHOUSE_HOURS: Occupancy = Occupancy {
    weekday: Some((6, 18)),
    saturday: Some((6, 12)),
    sunday: None,
    closed_load: 0.1,
    setback: true,
};

struct ProgramData {
    /// peak equipment, lighting gains in W/m2 and occupant density in people/m2
    equipment: f64,
    lighting: f64,
    occupants: f64,
    occupancy: Occupancy,
    glazing_ratio: f64,
    ventilation: f64,
    cool_cap: f64,
    wall_type: WallType,
}

// indexed by BuildingProgram
const PROGRAMS: [ProgramData; 16] = [
    ProgramData { equipment: 20., lighting: 14., occupants: 0.1, occupancy: RESTAURANT_HOURS, glazing_ratio: 0.17, ventilation: 0.0035, cool_cap: 300., wall_type: WallType::WoodFrame },
    ProgramData { equipment: 16., lighting: 12., occupants: 0.05, occupancy: ALWAYS, glazing_ratio: 0.16, ventilation: 0.0025, cool_cap: 200., wall_type: WallType::Mass },
    ProgramData { equipment: 10., lighting: 11., occupants: 0.03, occupancy: HOTEL, glazing_ratio: 0.27, ventilation: 0.0008, cool_cap: 150., wall_type: WallType::Mass },
    ProgramData { equipment: 8.1, lighting: 10.8, occupants: 0.054, occupancy: OFFICE_HOURS, glazing_ratio: 0.38, ventilation: 0.0004, cool_cap: 160., wall_type: WallType::Mass },
    ProgramData { equipment: 8.1, lighting: 10.8, occupants: 0.054, occupancy: OFFICE_HOURS, glazing_ratio: 0.33, ventilation: 0.0004, cool_cap: 140., wall_type: WallType::SteelFrame },
    ProgramData { equipment: 5.4, lighting: 6.5, occupants: 0.028, occupancy: HOME, glazing_ratio: 0.15, ventilation: 0.0003, cool_cap: 100., wall_type: WallType::SteelFrame },
    ProgramData { equipment: 10.8, lighting: 11.8, occupants: 0.054, occupancy: OFFICE_HOURS, glazing_ratio: 0.19, ventilation: 0.0012, cool_cap: 180., wall_type: WallType::SteelFrame },
    ProgramData { equipment: 10.8, lighting: 13., occupants: 0.25, occupancy: SCHOOL_HOURS, glazing_ratio: 0.35, ventilation: 0.0021, cool_cap: 180., wall_type: WallType::Masonry },
    ProgramData { equipment: 30., lighting: 16., occupants: 0.15, occupancy: RESTAURANT_HOURS, glazing_ratio: 0.14, ventilation: 0.004, cool_cap: 350., wall_type: WallType::WoodFrame },
    ProgramData { equipment: 10.8, lighting: 12., occupants: 0.25, occupancy: SCHOOL_HOURS, glazing_ratio: 0.33, ventilation: 0.0021, cool_cap: 180., wall_type: WallType::Masonry },
    ProgramData { equipment: 5., lighting: 10., occupants: 0.02, occupancy: HOTEL, glazing_ratio: 0.11, ventilation: 0.0006, cool_cap: 120., wall_type: WallType::SteelFrame },
    ProgramData { equipment: 6.8, lighting: 10.8, occupants: 0.054, occupancy: OFFICE_HOURS, glazing_ratio: 0.21, ventilation: 0.0004, cool_cap: 130., wall_type: WallType::WoodFrame },
    ProgramData { equipment: 2.7, lighting: 16., occupants: 0.15, occupancy: SHOP_HOURS, glazing_ratio: 0.07, ventilation: 0.0012, cool_cap: 150., wall_type: WallType::Masonry },
    ProgramData { equipment: 2.7, lighting: 16., occupants: 0.15, occupancy: SHOP_HOURS, glazing_ratio: 0.11, ventilation: 0.0012, cool_cap: 150., wall_type: WallType::SteelFrame },
    ProgramData { equipment: 9., lighting: 16., occupants: 0.1, occupancy: SHOP_HOURS, glazing_ratio: 0.11, ventilation: 0.0015, cool_cap: 200., wall_type: WallType::Masonry },
    ProgramData { equipment: 2., lighting: 5., occupants: 0.005, occupancy: WAREHOUSE_HOURS, glazing_ratio: 0.006, ventilation: 0.0002, cool_cap: 50., wall_type: WallType::SteelFrame },
];

struct EraData {
    /// insulation thickness of walls and roofs in climate zone 4, in m
    wall_insulation: f64,
    roof_insulation: f64,
    u_window: f64,
    shgc: f64,
    infiltration: f64,
    cop: f64,
    heat_eff: f64,
    wall_albedo: f64,
    roof_albedo: f64,
}

// indexed by BuiltEra
const ERAS: [EraData; 3] = [
    EraData { wall_insulation: 0.02, roof_insulation: 0.05, u_window: 5.8, shgc: 0.6, infiltration: 0.6, cop: 2.5, heat_eff: 0.7, wall_albedo: 0.2, roof_albedo: 0.15 },
    EraData { wall_insulation: 0.05, roof_insulation: 0.1, u_window: 3.5, shgc: 0.4, infiltration: 0.4, cop: 3., heat_eff: 0.8, wall_albedo: 0.25, roof_albedo: 0.2 },
    EraData { wall_insulation: 0.075, roof_insulation: 0.15, u_window: 2.4, shgc: 0.3, infiltration: 0.25, cop: 3.5, heat_eff: 0.9, wall_albedo: 0.3, roof_albedo: 0.3 },
];

/// Insulation multiplier of each climate zone, relative to zone 4, indexed by ClimateZone
const ZONE_INSULATION: [f64; 16] = [
    0.5, 0.6, 0.6, 0.8, 0.7, 0.8, 0.7, 1., 1., 1., 1.2, 1.2, 1.4, 1.4, 1.6, 1.8,
];

const COOLING_SETPOINT: f64 = 24.; // deg C
const HEATING_SETPOINT: f64 = 21.; // deg C
const COOLING_SETBACK: f64 = 26.7; // deg C
const HEATING_SETBACK: f64 = 15.6; // deg C
/// Hours during which setpoints are relaxed whatever the opening hours
const NIGHT_SETBACK: (usize, usize) = (19, 5);

pub fn reference_building(
    program: BuildingProgram,
    era: BuiltEra,
    zone: ClimateZone,
) -> ReferenceBuilding {
    let program_data = &PROGRAMS[program as usize];
    let era_data = &ERAS[era as usize];
    let insulation_scale = ZONE_INSULATION[zone as usize];
    let wall_insulation = era_data.wall_insulation * insulation_scale;
    let roof_insulation = era_data.roof_insulation * insulation_scale;

    let wall = match program_data.wall_type {
        WallType::Mass => Construction::new(
            era_data.wall_albedo,
            &[(0.025, &STUCCO), (0.2, &CONCRETE), (wall_insulation, &INSULATION), (0.0127, &GYPSUM)],
        ),
        WallType::Masonry => Construction::new(
            era_data.wall_albedo,
            &[(0.1, &BRICK), (0.2, &CONCRETE), (wall_insulation, &INSULATION), (0.0127, &GYPSUM)],
        ),
        WallType::SteelFrame => Construction::new(
            era_data.wall_albedo,
            &[(0.025, &STUCCO), (0.001, &STEEL), (wall_insulation, &INSULATION), (0.0127, &GYPSUM)],
        ),
        WallType::WoodFrame => Construction::new(
            era_data.wall_albedo,
            &[(0.02, &WOOD), (wall_insulation, &INSULATION), (0.0127, &GYPSUM)],
        ),
    };
    let roof = Construction::new(
        era_data.roof_albedo,
        &[(0.01, &ROOF_MEMBRANE), (roof_insulation, &INSULATION), (0.1, &CONCRETE)],
    );
    let mass = Construction::new(0.2, &[(0.1, &CONCRETE)]);

    ReferenceBuilding {
        wall,
        roof,
        mass,
        glazing_ratio: program_data.glazing_ratio,
        u_window: era_data.u_window / insulation_scale.max(1.).sqrt(),
        shgc: era_data.shgc,
        infiltration: era_data.infiltration,
        ventilation: program_data.ventilation,
        cop: era_data.cop,
        heat_eff: era_data.heat_eff,
        cool_cap: program_data.cool_cap,
        heat_cap: program_data.cool_cap,
        schedule: schedule_for(program_data),
    }
}

fn schedule_for(program: &ProgramData) -> SchDef {
    let occupancy = &program.occupancy;
    let loads = |open: Option<(usize, usize)>| {
        let mut day = [occupancy.closed_load; 24];
        if let Some((start, end)) = open {
            day[start..end].fill(1.);
        }
        day
    };
    let setpoints = |open: Option<(usize, usize)>, occupied: f64, setback: f64| {
        let mut day = [occupied; 24];
        if occupancy.setback {
            let (night_start, night_end) = NIGHT_SETBACK;
            for (hour, value) in day.iter_mut().enumerate() {
                let is_open = open.is_some_and(|(start, end)| (start..end).contains(&hour));
                if !is_open || hour >= night_start || hour < night_end {
                    *value = setback;
                }
            }
        }
        day
    };
    let weekly_loads = WeeklySchedule::new(
        loads(occupancy.weekday),
        loads(occupancy.saturday),
        loads(occupancy.sunday),
    );
    let weekly_setpoints = |occupied: f64, setback: f64| {
        WeeklySchedule::new(
            setpoints(occupancy.weekday, occupied, setback),
            setpoints(occupancy.saturday, occupied, setback),
            setpoints(occupancy.sunday, occupied, setback),
        )
    };

    SchDef {
        equipment: weekly_loads.clone(),
        lighting: weekly_loads.clone(),
        occupancy: weekly_loads,
        cooling_setpoint: weekly_setpoints(COOLING_SETPOINT, COOLING_SETBACK),
        heating_setpoint: weekly_setpoints(HEATING_SETPOINT, HEATING_SETBACK),
        equipment_gain: program.equipment,
        lighting_gain: program.lighting,
        occupant_density: program.occupants,
    }
}
