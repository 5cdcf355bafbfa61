//! Runtime components for process supervision

pub mod launcher;
pub mod mode;
pub mod process;
pub mod session;

pub use launcher::*;
pub use mode::*;
pub use process::*;
pub use session::*;
