pub mod diff;
pub mod graph;
pub mod lookup;
pub mod synth;
pub mod validate;
