#[allow(clippy::module_inception)]
pub mod automaton;
pub mod editor;
