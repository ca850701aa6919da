//! coursetrack command-line client.
//!
//! Opens a course through the HTTP backend, then shows module completion or
//! reports a single learner action.

pub mod cli;
pub mod commands;
