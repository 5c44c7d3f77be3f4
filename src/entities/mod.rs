// Entity Models
// Residential entities are the sources of every live feed and member query.

pub mod residential;

pub use residential::{Residential, ResidentialRegistry};
