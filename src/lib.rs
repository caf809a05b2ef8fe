//! A blocking client over an asynchronous Matter interaction model engine.
//!
//! The engine accepts requests and reports their outcome later through callbacks on its
//! own threads. This crate correlates those callbacks with the requests that caused them
//! by handle, so that application code can send a command or read attributes and simply
//! wait for the result.

#[macro_use]
extern crate num_derive;

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod interaction_model;
pub mod message;
pub mod native;
pub mod tlv;

pub use client::InteractionClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use interaction_model::{AttributeRead, CommandHandle, ReadHandle};
