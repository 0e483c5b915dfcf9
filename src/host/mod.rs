//! Host-framework collaborators.
//!
//! The game logic in this crate runs inside a larger host runtime that owns
//! player sessions, world loading and the platform backend. This module is the
//! explicit seam to that runtime: an in-process session registry, the game
//! world with its named data points, and HTTP clients for the platform
//! services (stats, leaderboards, structured data storage, world storage).

pub mod api;
pub mod data;
pub mod session;
pub mod stats;
pub mod world;
