//! RewardCraft Core Types
//!
//! This crate defines the fundamental data structures shared by the balance
//! tree, the distributor engine and the off-chain publisher.

mod config;
mod error;
mod types;

pub use config::*;
pub use error::*;
pub use types::*;
