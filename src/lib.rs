//! Client for provisioning and connecting to remotely hosted VCL sessions.

pub mod catalog;
pub mod config;
pub mod console;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod model;
pub mod output;
pub mod poller;
pub mod retry;
pub mod rpc;
pub mod selector;

pub use controller::{ControllerSettings, RequestOutcome, SessionController};
pub use error::{Result, VclError};
