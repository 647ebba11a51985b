pub mod error;
pub mod grid_point;
pub mod spatial_index;
