//! Library wrapper around the `jakartify` binary.
//!
//! The binary crate root is compiled as a module here so that
//! `cargo test -p jakartify-cli --lib` typechecks the CLI without building
//! the integration test suite.

#[allow(dead_code)]
#[path = "main.rs"]
mod main_bin;
