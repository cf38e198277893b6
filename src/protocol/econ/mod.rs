//! Teeworlds/DDNet external console (ECON) client.
//!
//! - `codec`: line framing over the raw TCP stream
//! - `commands`: command syntax (`say`, `sv_name`) and reply parsing
//! - `session`: connection lifecycle and the login handshake

pub mod codec;
pub mod commands;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use session::{ConsoleOptions, ConsoleReader, ConsoleSession, ConsoleWriter};
