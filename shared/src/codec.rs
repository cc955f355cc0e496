//! Wire codec for relay messages
//!
//! Each message is a bincode payload behind a 4-byte little-endian length
//! prefix. The relay forwards frames verbatim, so every peer decodes exactly
//! what another peer encoded.

use crate::Message;
use bincode::{deserialize, serialize};

/// Largest payload accepted in one frame.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed message: {0}")]
    Decode(#[source] bincode::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[source] bincode::Error),
    #[error("frame too large: {0} bytes (max {1})")]
    FrameTooLarge(usize, usize),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn encode_message(message: &Message) -> Result<Vec<u8>, CodecError> {
    serialize(message).map_err(CodecError::Encode)
}

/// Encodes a message together with its length prefix.
pub fn encode_frame(message: &Message) -> Result<Vec<u8>, CodecError> {
    let payload = encode_message(message)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge(payload.len(), MAX_FRAME_SIZE));
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes one frame payload (without its length prefix).
pub fn decode_message(payload: &[u8]) -> Result<Message, CodecError> {
    deserialize(payload).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BulletRecord, PlayerRecord};

    #[test]
    fn test_frame_prefix_matches_payload() {
        let message = Message::Restart { seed: 12345 };
        let frame = encode_frame(&message).unwrap();

        let len = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(len, frame.len() - 4);

        let decoded = decode_message(&frame[4..]).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_player_record_survives_codec() {
        let record = PlayerRecord {
            id: 4,
            username: "alice".to_string(),
            position: [1.0, 1.0, -12.5],
            rotation: 270.0,
            joined: true,
            left: false,
            health: 100,
        };
        let payload = encode_message(&Message::Player(record.clone())).unwrap();

        match decode_message(&payload).unwrap() {
            Message::Player(decoded) => assert_eq!(decoded, record),
            other => panic!("Wrong message type after decoding: {:?}", other),
        }
    }

    #[test]
    fn test_bullet_record_survives_codec() {
        let record = BulletRecord {
            position: [0.0, 2.5, 0.0],
            direction: 90.0,
            x_direction: -5.0,
            damage: 17,
            speed: 95.0,
        };
        let payload = encode_message(&Message::Bullet(record.clone())).unwrap();

        assert_eq!(decode_message(&payload).unwrap(), Message::Bullet(record));
    }

    #[test]
    fn test_garbage_payload_is_decode_error() {
        let result = decode_message(&[0xff, 0xff, 0xff, 0xff, 0x01]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_truncated_payload_is_decode_error() {
        let payload = encode_message(&Message::Hello {
            username: "bob".to_string(),
        })
        .unwrap();

        let result = decode_message(&payload[..payload.len() - 1]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let message = Message::Hello {
            username: "x".repeat(MAX_FRAME_SIZE + 1),
        };
        assert!(matches!(
            encode_frame(&message),
            Err(CodecError::FrameTooLarge(_, MAX_FRAME_SIZE))
        ));
    }
}
