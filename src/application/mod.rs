// Application layer - use cases, drafts and change notification.
// Every client (CLI, tests, a future TUI) goes through ExpenseService.

pub mod error;
mod observer;
mod service;

pub use error::*;
pub use observer::*;
pub use service::*;
