pub mod affinity;
pub mod bakery;
pub mod spin;
