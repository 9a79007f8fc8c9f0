pub mod digest;
pub mod uuid;
