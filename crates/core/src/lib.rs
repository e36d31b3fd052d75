#![forbid(unsafe_code)]

mod filter;
mod model;
mod office_key;

pub use filter::*;
pub use model::*;
pub use office_key::*;
