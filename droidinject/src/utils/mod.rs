pub mod fs;
pub use fs::*;

pub mod class_name;
pub use class_name::*;
