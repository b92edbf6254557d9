use crate::{BusFrame, FrameSource, LinkError, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::trace;

/// SLCAN (serial-line CAN) receive backend for USB dongles. The
/// charge-controller bus runs at 250 kbit/s, so that is the default.
pub struct SlcanLink {
    port: Box<dyn SerialPort>,
    acc: Vec<u8>,
}

impl SlcanLink {
    pub fn open_with(path: &str, bitrate: SlcanBitrate) -> Result<Self> {
        let mut port = serialport::new(path, 115_200)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| LinkError::Io(e.to_string()))?;
        // Close any stale channel, set the bitrate, then open.
        write_cmd(&mut *port, b"C\r")?;
        write_cmd(&mut *port, &[b'S', bitrate.code(), b'\r'])?;
        write_cmd(&mut *port, b"O\r")?;
        Ok(Self {
            port,
            acc: Vec::with_capacity(64),
        })
    }
}

impl FrameSource for SlcanLink {
    fn open(name: &str) -> Result<Self> {
        Self::open_with(name, SlcanBitrate::B250k)
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<BusFrame>> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| LinkError::Io(e.to_string()))?;
        let mut buf = [0u8; 128];
        loop {
            if let Some(pos) = self.acc.iter().position(|&b| b == b'\r') {
                let line: Vec<u8> = self.acc.drain(..=pos).collect();
                let body = &line[..line.len().saturating_sub(1)];
                match parse_line(body) {
                    Some(frame) => return Ok(Some(frame)),
                    // Status replies and RTR frames are not telemetry.
                    None => {
                        trace!(len = body.len(), "skipping non-data slcan line");
                        continue;
                    }
                }
            }
            match self.port.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(n) => self.acc.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(None),
                Err(e) => return Err(LinkError::Io(e.to_string())),
            }
        }
    }
}

fn write_cmd(port: &mut dyn SerialPort, cmd: &[u8]) -> Result<()> {
    port.write_all(cmd).map_err(|e| LinkError::Io(e.to_string()))
}

fn parse_line(line: &[u8]) -> Option<BusFrame> {
    let (&kind, rest) = line.split_first()?;
    let id_digits = match kind {
        b't' => 3,
        b'T' => 8,
        _ => return None,
    };
    let id = hex_field(rest.get(..id_digits)?)?;
    let dlc = usize::from(rest.get(id_digits)?.wrapping_sub(b'0'));
    if dlc > 8 {
        return None;
    }
    let mut data = [0u8; 8];
    let mut at = id_digits + 1;
    for slot in data.iter_mut().take(dlc) {
        *slot = hex_field(rest.get(at..at + 2)?)? as u8;
        at += 2;
    }
    let mut frame = BusFrame::new(id, &data[..dlc])?;
    frame.timestamp = Some(OffsetDateTime::now_utc());
    Some(frame)
}

fn hex_field(digits: &[u8]) -> Option<u32> {
    u32::from_str_radix(std::str::from_utf8(digits).ok()?, 16).ok()
}

/// SLCAN bitrates seen on these buses, mapped to `Sx` codes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SlcanBitrate {
    B125k,
    B250k,
    B500k,
    B1M,
}

impl SlcanBitrate {
    pub fn code(self) -> u8 {
        match self {
            SlcanBitrate::B125k => b'4',
            SlcanBitrate::B250k => b'5',
            SlcanBitrate::B500k => b'6',
            SlcanBitrate::B1M => b'8',
        }
    }
}
