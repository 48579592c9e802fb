pub mod annotations;
pub mod backup;
pub mod core;
pub mod schedule;
pub mod selection;
pub mod setup;
