//! Event store abstraction
//!
//! The [`EventStore`] trait and the factory that builds the configured
//! backend.

pub mod factory;
pub mod traits;

pub use factory::create_event_store;
pub use traits::EventStore;
