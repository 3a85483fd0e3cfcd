//! tscheck CLI library.
//!
//! This crate provides the `tscheck` command-line front end: argument
//! parsing, the `check` and `watch` commands, and report rendering.

pub mod cli;
pub mod commands;
pub mod output;
