//! # Services
//!
//! Units of work that span several repositories and must commit or roll
//! back together.
//!
//! - [`checkout`] - Sale transaction processor
//! - [`register`] - Register sessions and shifts
//! - [`directory`] - Employee profiles and who may edit them

pub mod checkout;
pub mod directory;
pub mod register;

pub use checkout::SaleProcessor;
pub use directory::EmployeeDirectory;
pub use register::{ClosedRegister, OpenedRegister, RegisterManager};
