pub mod shape;

// Convex shape primitives
pub mod sphere;
pub mod cuboid;
pub mod convex_hull;
pub mod convex_hull_builder;

// Flat shapes in the local XY plane
pub mod circle;
pub mod box_shape;
pub mod polygon;

pub use box_shape::BoxShape;
pub use circle::Circle;
pub use convex_hull::ConvexHull;
pub use convex_hull_builder::{HullBuildSettings, HullBuilder};
pub use cuboid::Cuboid;
pub use polygon::Polygon;
pub use shape::{IConvexShape, Shape, ShapeError, ShapeKind};
pub use sphere::Sphere;
