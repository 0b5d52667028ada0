//! Binary framing for gossip datagrams.
//!
//! ## Wire Format
//!
//! All fields are unsigned 16-bit integers in network byte order (big-endian),
//! regardless of host endianness.
//!
//! | Message   | Opcode | Layout |
//! |-----------|--------|--------|
//! | Identity  | 100    | `[opcode:2][ring position:2][process handle:2]` |
//! | Count     | 200    | `[opcode:2][count:2][tick millis:2]` |
//! | Terminate | 300    | `[opcode:2]` |
//!
//! Process handles and counts wider than 16 bits are truncated to their low
//! 16 bits on the wire. This is a precision limit of the legacy protocol kept
//! for bit-compatibility; widening the fields would be a versioned protocol
//! change.

use crate::error::{Result, RingError};

pub const OPCODE_IDENTITY: u16 = 100;
pub const OPCODE_COUNT: u16 = 200;
pub const OPCODE_TERMINATE: u16 = 300;

/// A decoded gossip message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// A participant announcing which ring position it holds
    Identity { position: u16, handle: u16 },
    /// The owner's latest counter state
    Count { count: u16, tick_ms: u16 },
    /// The target was reached; every receiver stops
    Terminate,
}

impl Message {
    /// Encode into a fixed-size datagram
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(6);
        match *self {
            Message::Identity { position, handle } => {
                put_u16(&mut buf, OPCODE_IDENTITY);
                put_u16(&mut buf, position);
                put_u16(&mut buf, handle);
            }
            Message::Count { count, tick_ms } => {
                put_u16(&mut buf, OPCODE_COUNT);
                put_u16(&mut buf, count);
                put_u16(&mut buf, tick_ms);
            }
            Message::Terminate => {
                put_u16(&mut buf, OPCODE_TERMINATE);
            }
        }
        buf
    }

    /// Decode one datagram. Returns `Ok(None)` for unknown opcodes, which the
    /// protocol ignores.
    pub fn decode(buf: &[u8]) -> Result<Option<Message>> {
        if buf.len() < 2 {
            return Err(RingError::MissingOpcode(buf.len()));
        }
        let opcode = take_u16(buf, 0);
        match opcode {
            OPCODE_IDENTITY => {
                check_len(opcode, 6, buf.len())?;
                Ok(Some(Message::Identity {
                    position: take_u16(buf, 2),
                    handle: take_u16(buf, 4),
                }))
            }
            OPCODE_COUNT => {
                check_len(opcode, 6, buf.len())?;
                Ok(Some(Message::Count {
                    count: take_u16(buf, 2),
                    tick_ms: take_u16(buf, 4),
                }))
            }
            OPCODE_TERMINATE => Ok(Some(Message::Terminate)),
            _ => Ok(None),
        }
    }
}

/// Truncate a wide value to its low 16 bits for the wire
pub fn to_wire(v: u32) -> u16 {
    v as u16
}

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn take_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([buf[at], buf[at + 1]])
}

fn check_len(opcode: u16, need: usize, got: usize) -> Result<()> {
    if got < need {
        return Err(RingError::ShortDatagram { opcode, need, got });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_round_trip() {
        let msg = Message::Identity {
            position: 2,
            handle: 41833,
        };
        let buf = msg.encode();
        assert_eq!(buf.len(), 6);
        assert_eq!(Message::decode(&buf).unwrap(), Some(msg));
    }

    #[test]
    fn test_count_round_trip_full_range() {
        for count in [0u16, 1, 100, u16::MAX] {
            let msg = Message::Count {
                count,
                tick_ms: 59_999,
            };
            assert_eq!(Message::decode(&msg.encode()).unwrap(), Some(msg));
        }
    }

    #[test]
    fn test_terminate_is_two_bytes() {
        let buf = Message::Terminate.encode();
        assert_eq!(buf.len(), 2);
        assert_eq!(Message::decode(&buf).unwrap(), Some(Message::Terminate));
    }

    #[test]
    fn test_byte_order_is_fixed_big_endian() {
        let buf = Message::Count {
            count: 0x0102,
            tick_ms: 0x0304,
        }
        .encode();
        assert_eq!(buf, [0x00, 0xC8, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_truncation_is_deterministic() {
        assert_eq!(to_wire(0x0001_FFFF), 0xFFFF);
        assert_eq!(to_wire(0x0003_0001), 0x0001);
        assert_eq!(to_wire(65535), 65535);
        assert_eq!(to_wire(65536), 0);
    }

    #[test]
    fn test_unknown_opcode_is_ignored() {
        let buf = 400u16.to_be_bytes().to_vec();
        assert_eq!(Message::decode(&buf).unwrap(), None);
    }

    #[test]
    fn test_short_datagram_is_an_error() {
        assert!(matches!(
            Message::decode(&[0x00]),
            Err(RingError::MissingOpcode(1))
        ));
        // Identity with a missing handle field
        let mut buf = Message::Identity {
            position: 1,
            handle: 7,
        }
        .encode();
        buf.truncate(4);
        assert!(matches!(
            Message::decode(&buf),
            Err(RingError::ShortDatagram {
                opcode: OPCODE_IDENTITY,
                need: 6,
                got: 4
            })
        ));
    }
}
