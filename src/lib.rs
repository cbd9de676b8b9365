//! Native-asset wallet layer for an EVM test network: balance lookups with
//! caching and retry policy, validated transfers with a wallet fallback path,
//! transaction lookups and a read-only HTTP surface.

pub mod amount;
pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod explorer;
pub mod integrations;
pub mod models;
pub mod query;
pub mod services;

#[cfg(test)]
mod testing;
