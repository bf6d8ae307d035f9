//! UCP Ajax - control panel request dispatcher
//!
//! Resolves inbound requests to a module and command, runs the module
//! handler protocol and answers in JSON or XML.

pub mod ajax;
pub mod config;
pub mod http;
pub mod modules;
pub mod panel;
pub mod server;
