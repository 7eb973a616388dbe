// kalman_core/src/lib.rs

//! Steady-state Kalman filtering for linear, time-invariant systems.
//!
//! Given a continuous-time model `ẋ = Ax`, `y = Cx` with white process and
//! measurement noise, the filter discretizes the model for a nominal sample
//! period, verifies observability with a PBH test, solves the discrete
//! algebraic Riccati equation once for a constant gain `K`, and then runs
//! cheap predict/correct cycles on the state estimate.

pub mod config;
pub mod error;
pub mod estimation;
pub mod models;
pub mod prelude;
pub mod types;
