/// Interaction model status codes carried in command status and attribute reports.
#[repr(u16)]
#[derive(FromPrimitive, PartialEq, Eq, Debug, Clone, Copy)]
pub enum ImStatus {
    Success = 0x00,
    Failure = 0x01,
    InvalidSubscription = 0x7D,
    UnsupportedAccess = 0x7E,
    UnsupportedEndpoint = 0x7F,
    InvalidAction = 0x80,
    UnsupportedCommand = 0x81,
    InvalidCommand = 0x85,
    UnsupportedAttribute = 0x86,
    ConstraintError = 0x87,
    UnsupportedWrite = 0x88,
    ResourceExhausted = 0x89,
    NotFound = 0x8B,
    UnreportableAttribute = 0x8C,
    InvalidDataType = 0x8D,
    UnsupportedRead = 0x8F,
    DataVersionMismatch = 0x92,
    Timeout = 0x94,
    Busy = 0x9C,
    UnsupportedCluster = 0xC3,
    NoUpstreamSubscription = 0xC5,
    NeedsTimedInteraction = 0xC6,
    UnsupportedEvent = 0xC7,
    PathsExhausted = 0xC8,
    TimedRequestMismatch = 0xC9,
    FailsafeRequired = 0xCA,
}

impl ImStatus {
    pub const fn is_success(&self) -> bool {
        matches!(self, ImStatus::Success)
    }
}

#[cfg(test)]
mod tests {
    use num::FromPrimitive;

    use super::*;

    #[test]
    fn test_from_report_status() {
        assert_eq!(ImStatus::from_u8(0x00), Some(ImStatus::Success));
        assert_eq!(ImStatus::from_u8(0x86), Some(ImStatus::UnsupportedAttribute));
        assert_eq!(ImStatus::from_u8(0x02), None);
        assert!(!ImStatus::Busy.is_success());
    }
}
