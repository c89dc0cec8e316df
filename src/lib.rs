//! Crime Dashboard - exploration and hourly forecasting of municipal crime data
//!
//! The library holds the data pipeline, the forecaster and the chart layer;
//! the binary wraps them in an eframe window.

pub mod charts;
pub mod config;
pub mod data;
pub mod forecast;
pub mod gui;
