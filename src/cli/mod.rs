//! CLI module for prerollr - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for applying, previewing
//! and inspecting the pre-roll schedule.

pub mod commands;

pub use commands::Cli;
