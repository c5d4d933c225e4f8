//! HTTP front end for the `dance_live` competition engine.
//!
//! The binary wires [`config`], [`logging`] and [`metrics`] together and
//! serves the router from [`api`].

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
