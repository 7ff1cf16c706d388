#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(clippy::module_name_repetitions)]

//! # Curve Arena
//!
//! Authoritative server and bridge client for a real-time multiplayer trail
//! game played over UDP. The server simulates a shared 2-D board at a fixed
//! tick rate and broadcasts a totally-ordered, append-only event log to every
//! connected peer; the client deduplicates and re-orders that log and forwards
//! it to an interactive front-end over a TCP stream.

/// Bridge client: demultiplexer, heartbeat, front-end text protocol
pub mod client;

/// Runtime configuration and validation
pub mod config;

/// Structured logging setup
pub mod logging;

/// Binary wire protocol (framing, CRC-32, datagram packing)
pub mod protocol;

/// Deterministic generator driving game starts
pub mod rng;

/// Authoritative server: state machine, tick loop, event fan-out
pub mod server;
