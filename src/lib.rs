//! Account authorization and delegated execution engine: owner/oracle
//! protected accounts, 2-of-2 deferred mutations, oracle-signed forwards
//! and swappable backend logic.

pub mod account;
pub mod backend;
pub mod error;
pub mod events;
pub mod factory;
pub mod gate;
pub mod identity;
pub mod multisig;
pub mod registry;
pub mod signature;
pub mod vault;

#[cfg(test)]
mod testkit;

pub use account::{Action, AccountRouter};
pub use error::{ResultCode, WardenError};
pub use identity::Identity;
