//! clipforge - convert media files into upload-ready formats
//!
//! This library crate exposes the configuration layer for the binary and
//! for integration testing. The conversion engine lives in `clipforge-av`.

pub mod config;
