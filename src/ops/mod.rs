pub mod fill;
pub mod transform;
