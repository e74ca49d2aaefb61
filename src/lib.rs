//! Parking session lifecycle and billing engine.
//!
//! A booking creates a [`models::session::ParkingSession`]; its countdown and overtime
//! penalty are derived from the clock on every observation, and ending it produces a
//! [`models::bill::FinalBill`] that is either paid at once or deferred onto the
//! account, which then blocks further bookings until the dues are cleared.

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod managers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;
