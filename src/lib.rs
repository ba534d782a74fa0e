//! Agent-facing automation service for WoW addon development projects:
//! a typed command surface over a workflow engine, proposal and performance
//! stores, and external tool integrations.

pub mod cli;
pub mod commands;
pub mod config;
pub mod handlers;
pub mod perf;
pub mod proposal;
pub mod runtime;
pub mod server;
pub mod shared;
pub mod workflow;

pub use server::{MechanicServer, ServerParts};
