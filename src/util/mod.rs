// Utility modules

pub mod capture_file;
pub mod encode;
