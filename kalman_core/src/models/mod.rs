// kalman_core/src/models/mod.rs

pub mod covariance;
