pub mod collection;
pub mod geometry;
pub mod result;

pub use collection::{Dataset, SpatialCollection, SpatialEntity, Table};
pub use geometry::{Crs, Geometry, GeometryType};
pub use result::{MatchRow, MatchTable, DISTANCE_COLUMN, NEAREST_POINT_COLUMN, ORIGIN_COLUMN};
