pub mod building;
pub mod element;
pub mod forcing;
pub mod material_properties;
pub mod param;
pub mod reference_buildings;
pub mod rsm;
pub mod schedule;
pub mod solar_calcs;
pub(crate) mod solvers;
pub mod ubl;
pub mod ucm;
pub mod units;
pub mod urbflux;

#[cfg(test)]
pub(crate) mod tests;
