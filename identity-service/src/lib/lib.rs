pub mod config;
pub mod domain;
pub mod maintenance;
pub mod outbound;

pub use domain::identity;
