pub mod case_sensitivity;

pub use case_sensitivity::*;
