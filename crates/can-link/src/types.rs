use core::fmt;
use time::OffsetDateTime;

/// Largest valid 29-bit extended identifier.
pub const MAX_FRAME_ID: u32 = 0x1FFF_FFFF;

/// One message captured off the telemetry bus: a 29-bit identifier and up
/// to 8 payload bytes. Frames are transient; they live for one dispatch
/// cycle and are never stored.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BusFrame {
    pub id: u32,
    pub len: u8,
    pub data: [u8; 8],
    pub timestamp: Option<OffsetDateTime>,
}

impl BusFrame {
    pub fn new(id: u32, data: &[u8]) -> Option<Self> {
        if id > MAX_FRAME_ID || data.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf[..data.len()].copy_from_slice(data);
        Some(Self {
            id,
            len: data.len() as u8,
            data: buf,
            timestamp: None,
        })
    }

    /// Build a frame whose identifier carries the given register number in
    /// bits 18..29. Handy for scripting the mock backend.
    pub fn for_register(register: u16, data: &[u8]) -> Option<Self> {
        Self::new(u32::from(register & 0x7FF) << 18, data)
    }

    /// Register number the decoders route on.
    pub fn register(&self) -> u16 {
        ((self.id >> 18) & 0x7FF) as u16
    }

    /// The valid portion of the payload, never past the declared length.
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.len.min(8))]
    }
}

impl fmt::Display for BusFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{id:08X} [{len}]", id = self.id, len = self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_extraction_matches_identifier_layout() {
        let frame = BusFrame::new(0x0A0 << 18 | 0x3FF, &[0x01]).unwrap();
        assert_eq!(frame.register(), 0x0A0);
        let frame = BusFrame::for_register(0x2A3, &[]).unwrap();
        assert_eq!(frame.register(), 0x2A3);
    }

    #[test]
    fn rejects_oversized_payload_and_id() {
        assert!(BusFrame::new(0, &[0u8; 9]).is_none());
        assert!(BusFrame::new(MAX_FRAME_ID + 1, &[]).is_none());
    }

    #[test]
    fn payload_is_bounded_by_declared_length() {
        let frame = BusFrame::for_register(0x081, &[0x00, 0xC9]).unwrap();
        assert_eq!(frame.payload(), &[0x00, 0xC9]);
    }
}
