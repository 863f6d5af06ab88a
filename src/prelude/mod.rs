#[macro_use]
pub mod err;

pub mod consts;

pub use consts::*;
pub use err::*;
