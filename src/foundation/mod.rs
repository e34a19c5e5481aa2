pub mod core;
pub mod error;
pub mod events;
pub mod math;
pub mod status;
