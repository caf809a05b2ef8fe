//! The boundary to the native interaction model engine.
//!
//! The engine is driven through [`NativeEngine`] and reports back through the single
//! [`InteractionDelegate`] registered with it. Callbacks arrive on threads owned by the
//! engine and must return promptly.

use std::sync::Arc;

use bytes::Bytes;

use crate::interaction_model::{CommandHandle, ReadHandle};

/// Error code returned by the engine, zero on success.
pub type NativeStatus = u32;

/// A command whose arguments have already been encoded for its cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeCommand {
    pub endpoint_id: u8,
    pub cluster_id: u16,
    pub command_id: u8,
    pub arguments: Bytes,
}

impl InvokeCommand {
    pub fn new(endpoint_id: u8, cluster_id: u16, command_id: u8, arguments: Bytes) -> Self {
        Self {
            endpoint_id,
            cluster_id,
            command_id,
            arguments,
        }
    }
}

pub trait NativeEngine: Send + Sync {
    /// Register the callbacks the engine reports through. Called once per session.
    fn set_delegate(&self, delegate: Arc<dyn InteractionDelegate>);

    /// Stop reporting through the registered delegate.
    fn clear_delegate(&self);

    /// Allocate a command sender and return its handle.
    fn new_command_sender(&self) -> Result<CommandHandle, NativeStatus>;

    fn send_command(&self, handle: CommandHandle, command: &InvokeCommand) -> NativeStatus;

    /// Issue a read of `path_count` packed attribute paths. Reports for it carry `handle`.
    fn send_read_request(
        &self,
        node_id: u64,
        admin_id: u16,
        paths: &[u8],
        path_count: usize,
        handle: ReadHandle,
    ) -> NativeStatus;
}

/// Callbacks invoked by the engine.
pub trait InteractionDelegate: Send + Sync {
    /// A status for one command of a batched invoke. `status` is a packed command status record.
    fn on_command_response_status_code_received(&self, handle: CommandHandle, status: &[u8]);

    fn on_command_response_protocol_error(&self, handle: CommandHandle, error_code: u8);

    /// The terminal result of an invoke.
    fn on_command_response(&self, handle: CommandHandle, error_code: u32);

    /// One attribute report. `info` is a packed attribute info record and `data` a TLV element.
    fn on_report_data(&self, handle: ReadHandle, info: &[u8], data: &[u8], status: u8);

    /// The end of a read, after its last report.
    fn on_report_end(&self, handle: ReadHandle, error_code: u32);
}
