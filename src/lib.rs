pub mod cli_interface;
pub mod device;
mod fs;
pub mod mkfs;
pub mod shell;
pub mod utils;
pub use fs::*;
