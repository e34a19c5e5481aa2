#[allow(clippy::module_inception)]
pub mod channel;
pub mod item;
