//! Core library for the magsteer application.
//!
//! This library contains the control engine, routine catalog, and hardware
//! boundary traits for driving a triaxial electromagnet array. It is used by
//! the headless runner binary and by any GUI front-end layered on top.

pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod gamepad;
pub mod hardware;
pub mod routine;
pub mod vision;
