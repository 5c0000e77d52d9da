mod config;
mod plan;
mod result;
mod tool;

pub use config::*;
pub use plan::*;
pub use result::*;
pub use tool::*;
