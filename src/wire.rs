//! Wire codec for lps datagrams.
//!
//! Every datagram carries exactly one frame:
//!
//! ```text
//! ┌─────────────┬──────────┬────────────────────┬───────────────────┐
//! │ Domain (3)  │ Kind (1) │ Value (8)          │ Topic (variable)  │
//! │ raw bytes   │ 0, 1, 2  │ f64, native order  │ no terminator     │
//! └─────────────┴──────────┴────────────────────┴───────────────────┘
//! ```
//!
//! The value is copied verbatim in the sender's native byte order, so peers
//! of different endianness do not interoperate. Topic length is the
//! datagram length minus the 12 header bytes; a NUL byte ends the topic
//! early, matching peers that send C strings.

use crate::error::{LpsError, Result};
use crate::types::{DomainTag, Kind, Sample, DOMAIN_LEN};
use thiserror::Error;

/// Bytes before the value: domain tag plus kind.
pub const MIN_HEADER_LEN: usize = DOMAIN_LEN + 1;

/// Size of the encoded value.
pub const VALUE_LEN: usize = std::mem::size_of::<f64>();

/// Bytes before the topic.
pub const FRAME_HEADER_LEN: usize = MIN_HEADER_LEN + VALUE_LEN;

/// Longest topic a publisher may send.
pub const MAX_TOPIC_LEN: usize = 255;

/// Why a received datagram was discarded.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("datagram too short: {len} bytes")]
    TooShort { len: usize },

    #[error("domain mismatch: got {got:?}")]
    DomainMismatch { got: DomainTag },

    #[error("unknown kind byte {0}")]
    UnknownKind(u8),

    #[error("truncated value: {len} bytes")]
    TruncatedValue { len: usize },

    #[error("topic is not valid UTF-8")]
    InvalidTopic,

    #[error("datagram exceeds receive capacity of {capacity} bytes")]
    Oversized { capacity: usize },
}

/// A decoded frame borrowing its topic from the receive buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame<'a> {
    pub domain: DomainTag,
    pub sample: Sample,
    pub topic: &'a str,
}

impl<'a> Frame<'a> {
    /// Decode a datagram addressed to `domain`.
    ///
    /// Checks are applied in wire order: length, domain, kind, value.
    pub fn decode(
        datagram: &'a [u8],
        domain: &DomainTag,
    ) -> std::result::Result<Self, DecodeError> {
        if datagram.len() < MIN_HEADER_LEN {
            return Err(DecodeError::TooShort {
                len: datagram.len(),
            });
        }

        let mut tag = [0u8; DOMAIN_LEN];
        tag.copy_from_slice(&datagram[..DOMAIN_LEN]);
        let got = DomainTag::from_bytes(tag);
        if &got != domain {
            return Err(DecodeError::DomainMismatch { got });
        }

        let kind_byte = datagram[DOMAIN_LEN];
        let kind = Kind::from_u8(kind_byte).ok_or(DecodeError::UnknownKind(kind_byte))?;

        if datagram.len() < FRAME_HEADER_LEN {
            return Err(DecodeError::TruncatedValue {
                len: datagram.len(),
            });
        }

        let mut value = [0u8; VALUE_LEN];
        value.copy_from_slice(&datagram[MIN_HEADER_LEN..FRAME_HEADER_LEN]);
        let value = f64::from_ne_bytes(value);

        let raw_topic = &datagram[FRAME_HEADER_LEN..];
        let end = raw_topic
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(raw_topic.len());
        let topic = std::str::from_utf8(&raw_topic[..end]).map_err(|_| DecodeError::InvalidTopic)?;

        Ok(Frame {
            domain: got,
            sample: Sample::new(kind, value),
            topic,
        })
    }
}

/// Encode a frame into `out`, replacing its contents.
///
/// Rejects topics longer than [`MAX_TOPIC_LEN`] bytes, and topics holding
/// a NUL byte, which receivers would cut short.
pub fn encode_frame(
    domain: &DomainTag,
    topic: &str,
    sample: Sample,
    out: &mut Vec<u8>,
) -> Result<()> {
    let topic = topic.as_bytes();
    if topic.len() > MAX_TOPIC_LEN {
        return Err(LpsError::TopicTooLong {
            len: topic.len(),
            max: MAX_TOPIC_LEN,
        });
    }
    if let Some(offset) = topic.iter().position(|&b| b == 0) {
        return Err(LpsError::TopicContainsNul { offset });
    }

    out.clear();
    out.reserve(FRAME_HEADER_LEN + topic.len());
    out.extend_from_slice(domain.as_bytes());
    out.push(sample.kind().as_u8());
    out.extend_from_slice(&sample.value().to_ne_bytes());
    out.extend_from_slice(topic);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> DomainTag {
        DomainTag::new("lps").unwrap()
    }

    fn encode(topic: &str, sample: Sample) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_frame(&domain(), topic, sample, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_layout() {
        let buf = encode("a.b", Sample::Counter(1.5));
        assert_eq!(buf.len(), FRAME_HEADER_LEN + 3);
        assert_eq!(&buf[..3], b"lps");
        assert_eq!(buf[3], 1);
        assert_eq!(&buf[4..12], &1.5f64.to_ne_bytes());
        assert_eq!(&buf[12..], b"a.b");
    }

    #[test]
    fn test_decode_frame() {
        let buf = encode("sensor.kitchen.temp", Sample::RequestValue(21.0));
        let frame = Frame::decode(&buf, &domain()).unwrap();
        assert_eq!(frame.topic, "sensor.kitchen.temp");
        assert_eq!(frame.sample, Sample::RequestValue(21.0));
    }

    #[test]
    fn test_empty_topic() {
        let buf = encode("", Sample::Value(0.0));
        let frame = Frame::decode(&buf, &domain()).unwrap();
        assert_eq!(frame.topic, "");
    }

    #[test]
    fn test_topic_length_limit() {
        let mut buf = Vec::new();
        let ok = "x".repeat(MAX_TOPIC_LEN);
        assert!(encode_frame(&domain(), &ok, Sample::Value(1.0), &mut buf).is_ok());

        let too_long = "x".repeat(MAX_TOPIC_LEN + 1);
        let result = encode_frame(&domain(), &too_long, Sample::Value(1.0), &mut buf);
        assert!(matches!(
            result,
            Err(LpsError::TopicTooLong { len: 256, max: 255 })
        ));
    }

    #[test]
    fn test_nul_in_topic_rejected() {
        let mut buf = b"untouched".to_vec();
        let result = encode_frame(&domain(), "a\0b", Sample::Value(1.0), &mut buf);
        assert!(matches!(result, Err(LpsError::TopicContainsNul { offset: 1 })));
        assert_eq!(buf, b"untouched");
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            Frame::decode(b"lps", &domain()),
            Err(DecodeError::TooShort { len: 3 })
        );
    }

    #[test]
    fn test_domain_mismatch() {
        let buf = encode("t", Sample::Value(1.0));
        let other = DomainTag::new("abc").unwrap();
        assert!(matches!(
            Frame::decode(&buf, &other),
            Err(DecodeError::DomainMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_kind() {
        let mut buf = encode("t", Sample::Value(1.0));
        buf[3] = 9;
        assert_eq!(Frame::decode(&buf, &domain()), Err(DecodeError::UnknownKind(9)));
    }

    #[test]
    fn test_truncated_value() {
        let buf = encode("t", Sample::Value(1.0));
        assert_eq!(
            Frame::decode(&buf[..8], &domain()),
            Err(DecodeError::TruncatedValue { len: 8 })
        );
    }

    #[test]
    fn test_nul_ends_topic() {
        let mut buf = encode("abc", Sample::Value(1.0));
        buf.extend_from_slice(b"\0garbage");
        let frame = Frame::decode(&buf, &domain()).unwrap();
        assert_eq!(frame.topic, "abc");
    }

    #[test]
    fn test_invalid_utf8_topic() {
        let mut buf = encode("", Sample::Value(1.0));
        buf.extend_from_slice(&[0xff, 0xfe]);
        assert_eq!(Frame::decode(&buf, &domain()), Err(DecodeError::InvalidTopic));
    }

    #[test]
    fn test_nan_bits_preserved() {
        let nan = f64::from_bits(0x7ff8_dead_beef_0001);
        let buf = encode("n", Sample::Value(nan));
        let frame = Frame::decode(&buf, &domain()).unwrap();
        assert_eq!(frame.sample.value().to_bits(), nan.to_bits());
    }
}
