//! Chat protocol layer: transport, line parsing, and the connection lifecycle.

pub mod commands;
pub mod connection;
pub mod parser;
pub mod transport;
