//! Command implementations.

mod init;
mod serve;
mod tools;

pub use init::init;
pub use serve::{check_facilitator, serve};
pub use tools::tools;
