pub mod bounding_box;
pub mod linear_equations_solver;
pub mod math_helper;
pub mod matrix3x3;
pub mod matrix_mn;
pub mod memory;
pub mod quaternion_ex;
pub mod task_scheduling;

pub use self::bounding_box::BoundingBox;
pub use self::matrix3x3::Matrix3x3;
pub use self::matrix_mn::{MatrixMN, VectorN};
