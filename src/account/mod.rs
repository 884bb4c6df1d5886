//! The account engine: deferred actions and the router that gates them.

pub mod action;
pub mod router;

pub use action::Action;
pub use router::AccountRouter;
