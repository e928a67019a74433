//! geotiles - Generate assemblable 3D-printable hexagonal terrain tiles from
//! elevation contours, OpenStreetMap roads and land use

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod geometry;
pub mod layers;
pub mod mesh;
pub mod osm;
pub mod pipeline;
pub mod tile;

#[cfg(test)]
mod testing;
