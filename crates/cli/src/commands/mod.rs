//! Command implementations.

mod info;
mod probe;
mod replay;
mod save;
mod validate;

pub use info::run_info;
pub use probe::run_probe;
pub use replay::run_replay;
pub use save::run_save;
pub use validate::run_validate;
