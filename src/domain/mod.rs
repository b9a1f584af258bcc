mod date;
mod draft;
mod expense;
mod money;

pub use date::*;
pub use draft::*;
pub use expense::*;
pub use money::*;
