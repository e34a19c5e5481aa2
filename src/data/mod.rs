pub mod compat;
pub mod model;
