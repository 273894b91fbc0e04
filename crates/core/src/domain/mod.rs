//! Domain boundary: repository traits owned by the catalog store and
//! capability traits consumed from external collaborators.

pub mod capabilities;
pub mod repositories;

pub use capabilities::*;
pub use repositories::*;

