use std::sync::Arc;

use tracing::{trace, warn};

use crate::{
    constants::{READ_HANDLE_BASE, REPORT_DATA_BUFFER_LEN},
    message::{AttributeInfo, CommandStatusRecord},
    native::InteractionDelegate,
    tlv::{AttributeDecoder, TlvDecoder, TlvValue},
};

use super::{CommandHandle, CommandStatusTable, ReadCallbackRegistry, ReadHandle};

/// Routes engine callbacks to the status table and read registry by handle.
///
/// Runs on the engine's threads: it decodes, records and returns, and never blocks on
/// anything but the short table locks.
pub struct NativeCallbackAdapter<D = TlvDecoder> {
    command_status: Arc<CommandStatusTable>,
    read_callbacks: Arc<ReadCallbackRegistry>,
    decoder: D,
}

impl<D: AttributeDecoder> NativeCallbackAdapter<D> {
    pub fn new(
        command_status: Arc<CommandStatusTable>,
        read_callbacks: Arc<ReadCallbackRegistry>,
        decoder: D,
    ) -> Self {
        Self {
            command_status,
            read_callbacks,
            decoder,
        }
    }
}

impl<D: AttributeDecoder> InteractionDelegate for NativeCallbackAdapter<D> {
    fn on_command_response_status_code_received(&self, handle: CommandHandle, status: &[u8]) {
        match CommandStatusRecord::from_payload(status) {
            Ok(record) => {
                self.command_status
                    .set_index_status(handle, record.command_index, record)
            }
            Err(e) => warn!(
                handle,
                payload = hex::encode(status),
                "discarding command status: {e}"
            ),
        }
    }

    fn on_command_response_protocol_error(&self, handle: CommandHandle, error_code: u8) {
        // The terminal response that follows carries the outcome
        warn!(handle, error_code, "command response protocol error");
    }

    fn on_command_response(&self, handle: CommandHandle, error_code: u32) {
        self.command_status.set_status(handle, error_code);
    }

    fn on_report_data(&self, handle: ReadHandle, info: &[u8], data: &[u8], status: u8) {
        if handle < READ_HANDLE_BASE {
            // Reads the engine issued for itself
            trace!(handle, "ignoring report for reserved read handle");
            return;
        }
        let info = match AttributeInfo::from_payload(info) {
            Ok(info) => info,
            Err(e) => {
                warn!(handle, payload = hex::encode(info), "discarding report: {e}");
                return;
            }
        };
        trace!(handle, %info, status, data = hex::encode(data), "report data");
        let value = if data.len() > REPORT_DATA_BUFFER_LEN {
            warn!(handle, %info, len = data.len(), "attribute data exceeds report buffer");
            TlvValue::Null
        } else {
            match self.decoder.decode(data) {
                Ok(value) => value,
                Err(e) => {
                    warn!(handle, %info, "undecodable attribute data: {e}");
                    TlvValue::Null
                }
            }
        };
        self.read_callbacks.dispatch_data(handle, &info, value, status);
    }

    fn on_report_end(&self, handle: ReadHandle, error_code: u32) {
        if handle < READ_HANDLE_BASE {
            trace!(handle, "ignoring end for reserved read handle");
            return;
        }
        self.read_callbacks.dispatch_end(handle, error_code);
    }
}
