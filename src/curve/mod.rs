#[allow(clippy::module_inception)]
pub mod curve;
pub mod fx_section;
pub mod node;
pub mod overlap;
pub mod set;
