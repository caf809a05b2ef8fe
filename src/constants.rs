//! Handle numbering and buffer sizes shared with the native engine.

/// A command handle of zero means no command sender was allocated.
pub const NULL_COMMAND_HANDLE: u64 = 0;
/// The legacy command handle, used when a command is sent without correlation.
/// Waiting on it returns immediately.
pub const PLACEHOLDER_COMMAND_HANDLE: u64 = 1;
/// Handles below this value are reserved for reads the engine issues for itself.
pub const READ_HANDLE_BASE: u64 = 256;

/// Size of the buffer the engine copies a single attribute report into.
pub const REPORT_DATA_BUFFER_LEN: usize = 1536;
/// Maximum container nesting accepted when decoding attribute data.
pub const MAX_TLV_DEPTH: usize = 16;

// Packed record sizes
pub const COMMAND_STATUS_RECORD_LEN: usize = 4 + 2 + 1 + 2 + 1 + 1;
pub const ATTRIBUTE_INFO_RECORD_LEN: usize = 2 + 2 + 1;
