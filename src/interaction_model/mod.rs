use crate::{
    message::{status::ImStatus, AttributeInfo},
    tlv::TlvValue,
};
use num::FromPrimitive;

pub mod command_status;
pub mod delegate;
pub mod handle;
pub mod read_callback;

pub use command_status::{CommandStatus, CommandStatusTable};
pub use delegate::NativeCallbackAdapter;
pub use handle::HandleAllocator;
pub use read_callback::{ReadCallback, ReadCallbackRegistry};

/// Identifies an outstanding invoke, as issued by the engine.
pub type CommandHandle = u64;
/// Identifies an outstanding read, as issued by a [`HandleAllocator`].
pub type ReadHandle = u64;

/// One attribute reported during a read.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRead {
    pub path: AttributeInfo,
    pub value: TlvValue,
    pub status: u8,
    /// Reports carry no data version, so this is always 0.
    pub version: u32,
}

impl AttributeRead {
    pub fn im_status(&self) -> Option<ImStatus> {
        ImStatus::from_u8(self.status)
    }
}
