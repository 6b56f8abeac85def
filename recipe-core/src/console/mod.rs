//! Debug console shared by every host.
//!
//! The console grammar lives in [`grammar`] and is implemented with a
//! token/parse pipeline that stays compatible with `no_std`. Commands are
//! dispatched by [`commands::CommandExecutor`] and the `status` output is
//! rendered by [`status::StatusFormatter`].

pub mod catalog;
pub mod commands;
pub mod grammar;
pub mod status;
