//! Core types and definitions for the guardfire fire-control engine.
//!
//! This crate defines the vocabulary shared across the other crates:
//! geometry, weapon descriptors, target records, configuration, commands,
//! events, snapshots and constants. It runs no decision logic.

pub mod commands;
pub mod components;
pub mod config;
pub mod constants;
pub mod enums;
pub mod events;
pub mod settings;
pub mod state;
pub mod target;
pub mod types;
pub mod weapon;
