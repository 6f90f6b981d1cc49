//! Read-only profile data owned by the external identity service.

pub mod model;

pub use model::Profile;
