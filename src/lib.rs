//! # Tracker Agent Library
//!
//! GPS and battery telemetry agent for a vehicle tracker.
//!
//! This library provides the core functionality for joining the network,
//! keeping a device token valid, sampling the GPS receiver and power inputs,
//! and uploading status and location reports to the tracking server.

pub mod agent;
pub mod auth;
pub mod config;
pub mod error;
pub mod gps;
pub mod http;
pub mod network;
pub mod power;
pub mod scheduler;
pub mod serial;
pub mod storage;
pub mod telemetry;
