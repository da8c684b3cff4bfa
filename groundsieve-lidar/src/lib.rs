pub mod bi_layer;
pub mod dem_layer;
pub mod error;
pub mod filter;
pub mod ground_filter;
pub mod io;
pub mod point;
pub mod voxel_grid;

pub use bi_layer::{BiCell, BiLayer};
pub use dem_layer::{DemCell, DemLayer};
pub use error::GroundFilterError;
pub use filter::{Filter, ThresholdPolicy};
pub use ground_filter::{GroundFilter, GroundFilterParams, GroundFilterRun, IterationReport, PolicyKind};
pub use point::{Point, PointStore, StoreMetrics};
pub use voxel_grid::VoxelGrid;
