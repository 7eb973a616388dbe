// kalman_core/src/estimation/filters/mod.rs

pub mod steady_state;
