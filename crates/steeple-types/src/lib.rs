//! Domain and wire types shared by the Steeple crates.

pub mod api;
pub mod models;
