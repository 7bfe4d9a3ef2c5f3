//! Process lifecycle: graceful shutdown and background maintenance.

pub mod housekeeping;
pub mod shutdown;

pub use housekeeping::Housekeeping;
pub use shutdown::Shutdown;
