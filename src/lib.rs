//! Freight Planner Library
//!
//! Multi-modal route selection and per-leg vehicle capacity allocation.

pub mod planner;
