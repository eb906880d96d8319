//! Parcel Tracking API
//!
//! Asynchronous "submit now, poll later" tracking lookups. A submission is
//! stored as a `Pending` job and queued; a background dispatcher runs the
//! carrier lookup with bounded concurrency and writes the outcome back to an
//! expiring in-memory store that clients poll.

pub mod app_state;
pub mod config;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
