//! Dataflow graph editing core.
//!
//! This crate keeps an ordered sequence of modules and the wires between
//! their terminals consistent under editing. Modules get stable identities,
//! wires are rewired whenever positions shift, dangling wires are dropped,
//! and new wires are drawn through an explicit gesture state machine. Combined
//! modules can be laid out as a left-to-right flow of their inner modules.
//!
//! The binary `rustyflow` normalizes, checks and lays out graph documents.

pub mod catalog;
pub mod config;
pub mod editor;
pub mod error;
pub mod layout;
pub mod model;
