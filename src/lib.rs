//! Set-associative cache model driven by load/store address traces.
//!
//! Addresses are split by [`decoder::AddressDecoder`], looked up and replaced
//! by [`cache::ReplacementEngine`] over a [`cache::SetStore`], and counted by
//! [`stats::StatsCollector`]. [`simulator::Simulator`] ties them together.

pub mod cache;
pub mod config;
pub mod decoder;
pub mod experiments;
pub mod simulator;
pub mod stats;
pub mod trace;
