pub mod builtin;
pub mod definition;
pub(crate) mod pass;
pub mod registry;
