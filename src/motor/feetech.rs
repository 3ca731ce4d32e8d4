// Feetech STS serial bus protocol
//
// Dynamixel 1.0 style framing:
// [0xFF, 0xFF, ID, Length, Instruction, Params..., Checksum]
// where Length counts Instruction + Params + Checksum and the checksum is the
// inverted low byte of the sum of ID..Params.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::debug;

pub const DEFAULT_BAUDRATE: u32 = 1_000_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

const HEADER: [u8; 2] = [0xFF, 0xFF];

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Instruction {
    Ping = 0x01,
    Read = 0x02,
    Write = 0x03,
}

/// STS3215 control table addresses used by the wheel driver
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Register {
    OperatingMode = 33,   // 1 byte: 0=position, 1=velocity
    TorqueEnable = 40,    // 1 byte
    GoalPosition = 42,    // 2 bytes, 0..=4095 in position mode
    GoalSpeed = 46,       // 2 bytes, sign-magnitude; speed cap in position mode
    Lock = 55,            // 1 byte
    PresentPosition = 56, // 2 bytes
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatingMode {
    /// Single-turn absolute positioning
    Position = 0,
    Velocity = 1,
}

#[derive(Debug, thiserror::Error)]
pub enum FeetechError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response from motor {id}: {reason}")]
    InvalidResponse { id: u8, reason: String },

    #[error("Checksum mismatch for motor {id}")]
    ChecksumMismatch { id: u8 },

    #[error("Motor {id} returned error status: 0x{status:02X}")]
    MotorError { id: u8, status: u8 },

    #[error("Timeout waiting for response from motor {id}")]
    Timeout { id: u8 },

    #[error("Goal {goal} for motor {id} is outside the single-turn range 0..=4095")]
    GoalOutOfRange { id: u8, goal: i32 },

    #[error("Motor bus lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, FeetechError>;

/// A Feetech servo bus over any byte stream (serial port in production)
pub struct FeetechBus<P = Box<dyn SerialPort>> {
    port: P,
}

impl FeetechBus {
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        debug!("Opening Feetech bus on {} at {} baud", port_name, baudrate);
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;
        Ok(Self { port })
    }
}

impl<P: Read + Write> FeetechBus<P> {
    /// Wrap an already-open byte stream
    pub fn from_port(port: P) -> Self {
        Self { port }
    }

    pub fn into_port(self) -> P {
        self.port
    }

    pub fn ping(&mut self, id: u8) -> Result<bool> {
        self.send(id, Instruction::Ping, &[])?;
        match self.receive(id) {
            Ok(_) => Ok(true),
            Err(FeetechError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn write_u8(&mut self, id: u8, register: Register, value: u8) -> Result<()> {
        debug!("Motor {}: {:?} <- {}", id, register, value);
        self.send(id, Instruction::Write, &[register as u8, value])?;
        self.receive(id).map(|_| ())
    }

    pub fn write_u16(&mut self, id: u8, register: Register, value: u16) -> Result<()> {
        debug!("Motor {}: {:?} <- {}", id, register, value);
        let [lo, hi] = value.to_le_bytes();
        self.send(id, Instruction::Write, &[register as u8, lo, hi])?;
        self.receive(id).map(|_| ())
    }

    /// Signed registers use bit 15 as the sign
    pub fn write_i16(&mut self, id: u8, register: Register, value: i16) -> Result<()> {
        self.write_u16(id, register, encode_sign_magnitude(value))
    }

    pub fn read_u16(&mut self, id: u8, register: Register) -> Result<u16> {
        let data = self.read(id, register, 2)?;
        Ok(u16::from_le_bytes([data[0], data[1]]))
    }

    pub fn read_i16(&mut self, id: u8, register: Register) -> Result<i16> {
        Ok(decode_sign_magnitude(self.read_u16(id, register)?))
    }

    fn read(&mut self, id: u8, register: Register, len: u8) -> Result<Vec<u8>> {
        self.send(id, Instruction::Read, &[register as u8, len])?;
        let data = self.receive(id)?;
        if data.len() < len as usize {
            return Err(FeetechError::InvalidResponse {
                id,
                reason: format!("expected {} bytes, got {}", len, data.len()),
            });
        }
        Ok(data)
    }

    pub fn enable_torque(&mut self, id: u8) -> Result<()> {
        self.write_u8(id, Register::TorqueEnable, 1)?;
        self.write_u8(id, Register::Lock, 1)
    }

    pub fn disable_torque(&mut self, id: u8) -> Result<()> {
        self.write_u8(id, Register::TorqueEnable, 0)?;
        self.write_u8(id, Register::Lock, 0)
    }

    /// Torque is cycled around the mode write, as the servo requires
    pub fn switch_mode(&mut self, id: u8, mode: OperatingMode) -> Result<()> {
        self.disable_torque(id)?;
        self.write_u8(id, Register::OperatingMode, mode as u8)?;
        self.enable_torque(id)
    }

    fn send(&mut self, id: u8, instruction: Instruction, params: &[u8]) -> Result<()> {
        let packet = build_packet(id, instruction, params);
        self.port.write_all(&packet)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read one status packet and return its parameter bytes
    fn receive(&mut self, expected_id: u8) -> Result<Vec<u8>> {
        let mut head = [0u8; 4];
        self.port.read_exact(&mut head).map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::UnexpectedEof => {
                FeetechError::Timeout { id: expected_id }
            }
            _ => FeetechError::Io(e),
        })?;

        if head[..2] != HEADER {
            return Err(FeetechError::InvalidResponse {
                id: expected_id,
                reason: format!("bad header {:02X?}", &head[..2]),
            });
        }
        let (id, length) = (head[2], head[3] as usize);
        if id != expected_id {
            return Err(FeetechError::InvalidResponse {
                id: expected_id,
                reason: format!("reply from motor {}", id),
            });
        }
        if length < 2 {
            return Err(FeetechError::InvalidResponse {
                id,
                reason: format!("length {} too short", length),
            });
        }

        // status byte + params + checksum
        let mut body = vec![0u8; length];
        self.port.read_exact(&mut body)?;
        let (payload, checksum) = body.split_at(length - 1);

        let mut summed = vec![id, length as u8];
        summed.extend_from_slice(payload);
        if checksum[0] != checksum_of(&summed) {
            return Err(FeetechError::ChecksumMismatch { id });
        }
        if payload[0] != 0 {
            return Err(FeetechError::MotorError {
                id,
                status: payload[0],
            });
        }
        Ok(payload[1..].to_vec())
    }
}

fn checksum_of(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    !sum
}

fn build_packet(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(6 + params.len());
    packet.extend_from_slice(&HEADER);
    packet.push(id);
    packet.push((params.len() + 2) as u8);
    packet.push(instruction as u8);
    packet.extend_from_slice(params);
    let checksum = checksum_of(&packet[2..]);
    packet.push(checksum);
    packet
}

fn encode_sign_magnitude(value: i16) -> u16 {
    let magnitude = value.unsigned_abs() & 0x7FFF;
    if value < 0 { 0x8000 | magnitude } else { magnitude }
}

fn decode_sign_magnitude(raw: u16) -> i16 {
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 { -magnitude } else { magnitude }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Byte stream that records writes and replays queued replies
    #[derive(Default)]
    pub(crate) struct ScriptedPort {
        pub written: Vec<u8>,
        pub replies: VecDeque<u8>,
    }

    impl ScriptedPort {
        /// Queue an OK status packet carrying `params`
        pub fn reply(&mut self, id: u8, params: &[u8]) {
            let mut body = vec![id, (params.len() + 2) as u8, 0];
            body.extend_from_slice(params);
            let checksum = checksum_of(&body);
            self.replies.extend(HEADER);
            self.replies.extend(body);
            self.replies.push_back(checksum);
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.replies.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.replies.pop_front().unwrap_or_default();
            }
            Ok(n)
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_checksum() {
        // ID=1, Length=4, WRITE, Addr=30, Data=0, 2
        let data = [1u8, 4, 0x03, 30, 0, 2];
        assert_eq!(checksum_of(&data), 215);
    }

    #[test]
    fn test_sign_magnitude() {
        assert_eq!(encode_sign_magnitude(100), 100);
        assert_eq!(encode_sign_magnitude(-100), 0x8064);
        assert_eq!(decode_sign_magnitude(0x8064), -100);
        assert_eq!(decode_sign_magnitude(0x0FFF), 4095);
    }

    #[test]
    fn test_ping_packet_layout() {
        let packet = build_packet(1, Instruction::Ping, &[]);
        assert_eq!(packet, vec![0xFF, 0xFF, 1, 2, 0x01, !4u8]);
    }

    #[test]
    fn test_read_i16_parses_reply() {
        let mut port = ScriptedPort::default();
        port.reply(7, &encode_sign_magnitude(-1234).to_le_bytes());
        let mut bus = FeetechBus::from_port(port);

        assert_eq!(bus.read_i16(7, Register::PresentPosition).unwrap(), -1234);
        let port = bus.into_port();
        assert_eq!(port.written[4], Instruction::Read as u8);
        assert_eq!(port.written[5], Register::PresentPosition as u8);
    }

    #[test]
    fn test_missing_reply_is_timeout() {
        let mut bus = FeetechBus::from_port(ScriptedPort::default());
        assert!(!bus.ping(3).unwrap());
    }

    #[test]
    fn test_corrupt_checksum_rejected() {
        let mut port = ScriptedPort::default();
        port.reply(2, &[]);
        let last = port.replies.len() - 1;
        port.replies[last] ^= 0xFF;
        let mut bus = FeetechBus::from_port(port);
        assert!(matches!(
            bus.write_u8(2, Register::Lock, 1),
            Err(FeetechError::ChecksumMismatch { id: 2 })
        ));
    }
}
