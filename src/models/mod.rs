pub mod api;
pub mod job;
pub mod tracking;
pub mod ups;
