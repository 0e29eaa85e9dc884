//! Shared encoding contract for command types.

use crate::error::EncodeError;
use crate::header::{MsgHeader, OpCode, HEADER_SIZE};
use crate::limits::SizeLimitPolicy;
use crate::writer::WireWriter;
use bytes::{Bytes, BytesMut};

/// A command that can be framed into a single wire message.
///
/// The envelope (length, request id, opcode) is written by
/// [`encode_command`]; implementors only describe their body.
pub trait WireCommand {
    /// Opcode identifying this command type.
    fn op_code(&self) -> OpCode;

    /// Request identifier already assigned to this command.
    fn request_id(&self) -> i32;

    /// Rejects malformed input before any length computation.
    fn validate(&self) -> Result<(), EncodeError>;

    /// Number of bytes the body occupies after the header.
    fn body_len(&self) -> Result<usize, EncodeError>;

    /// Writes the body starting right after the header.
    fn write_body(&self, w: &mut WireWriter<'_>) -> Result<(), EncodeError>;
}

/// Encodes `cmd` into a complete wire message.
///
/// Validation and the size check run before the buffer is allocated. The
/// buffer is sized exactly to the computed length, and its last byte is
/// always 0 (document terminator).
pub fn encode_command<C>(cmd: &C, policy: &SizeLimitPolicy) -> Result<Bytes, EncodeError>
where
    C: WireCommand + ?Sized,
{
    cmd.validate()?;

    let total = HEADER_SIZE + cmd.body_len()?;
    policy.check(total)?;
    let message_length = i32::try_from(total).map_err(|_| EncodeError::MessageTooLarge {
        size: total,
        max: i32::MAX as usize,
    })?;

    let mut buf = BytesMut::zeroed(total);
    {
        let mut w = WireWriter::new(&mut buf[..]);
        MsgHeader::new(message_length, cmd.request_id(), cmd.op_code()).write(&mut w)?;
        cmd.write_body(&mut w)?;
        if w.position() != total {
            return Err(EncodeError::LengthMismatch {
                expected: total,
                actual: w.position(),
            });
        }
    }

    buf[total - 1] = 0;
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal command with a fixed body, used to exercise the envelope.
    struct FixedBody {
        body: Vec<u8>,
        declared: usize,
    }

    impl WireCommand for FixedBody {
        fn op_code(&self) -> OpCode {
            OpCode::KillCursors
        }

        fn request_id(&self) -> i32 {
            7
        }

        fn validate(&self) -> Result<(), EncodeError> {
            Ok(())
        }

        fn body_len(&self) -> Result<usize, EncodeError> {
            Ok(self.declared)
        }

        fn write_body(&self, w: &mut WireWriter<'_>) -> Result<(), EncodeError> {
            w.put_slice(&self.body)
        }
    }

    #[test]
    fn test_envelope() {
        let cmd = FixedBody {
            body: vec![1, 2, 3, 4],
            declared: 4,
        };
        let bytes = encode_command(&cmd, &SizeLimitPolicy::default()).unwrap();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[0..4], &20i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &7i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &[0, 0, 0, 0]);
        assert_eq!(&bytes[12..16], &2007i32.to_le_bytes());
        // Last byte is forced to the terminator
        assert_eq!(&bytes[16..], &[1, 2, 3, 0]);
    }

    #[test]
    fn test_short_body_is_length_mismatch() {
        let cmd = FixedBody {
            body: vec![1, 2],
            declared: 4,
        };
        let result = encode_command(&cmd, &SizeLimitPolicy::default());
        assert!(matches!(
            result,
            Err(EncodeError::LengthMismatch {
                expected: 20,
                actual: 18
            })
        ));
    }

    #[test]
    fn test_long_body_is_overrun() {
        let cmd = FixedBody {
            body: vec![1, 2, 3, 4, 5],
            declared: 4,
        };
        let result = encode_command(&cmd, &SizeLimitPolicy::default());
        assert!(matches!(result, Err(EncodeError::BufferOverrun { .. })));
    }

    #[test]
    fn test_policy_checked_on_total_length() {
        let cmd = FixedBody {
            body: vec![0; 4],
            declared: 4,
        };
        assert!(encode_command(&cmd, &SizeLimitPolicy::new(20, 20)).is_ok());
        assert!(matches!(
            encode_command(&cmd, &SizeLimitPolicy::new(19, 100)),
            Err(EncodeError::DocumentTooLarge { size: 20, max: 19 })
        ));
    }
}
