//! Frame reader for parsing protocol messages from a stream

use std::io;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::time::timeout;

use super::error::FrameError;
use super::frame::RawFrame;
use super::limits::{is_known_message_type, max_payload_for_type};
use super::message_id::MessageId;
use super::{
    DELIMITER, MAGIC, MAX_PAYLOAD_LENGTH_DIGITS, MAX_TYPE_LENGTH, MAX_TYPE_LENGTH_DIGITS,
    MSG_ID_LENGTH, TERMINATOR,
};

/// Default timeout for completing a frame once the first byte is received
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(60);

/// Reads protocol frames from an async reader
pub struct FrameReader<R> {
    reader: R,
}

impl<R> FrameReader<R> {
    /// Create a new frame reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Get a mutable reference to the underlying reader
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consume the frame reader and return the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: AsyncReadExt + Unpin> FrameReader<R> {
    /// Read the next frame from the stream
    ///
    /// Returns `Ok(None)` if the connection is cleanly closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is malformed or an I/O error occurs.
    ///
    /// # Note
    ///
    /// This method has no timeout - it will wait indefinitely for data.
    /// For production use, prefer [`read_frame_with_timeout`](Self::read_frame_with_timeout).
    pub async fn read_frame(&mut self) -> Result<Option<RawFrame>, FrameError> {
        let first_byte = match self.read_byte_allow_eof().await? {
            Some(b) => b,
            None => return Ok(None), // Clean disconnect
        };

        self.read_frame_after_first_byte(first_byte).await
    }

    /// Read the next frame from the stream with a timeout
    ///
    /// Waits indefinitely for the first byte (allowing idle connections),
    /// but once the first byte is received the entire frame must complete
    /// within the given timeout. This protects against slowloris-style
    /// clients while still letting registered peers idle.
    ///
    /// Returns `Ok(None)` if the connection is cleanly closed.
    pub async fn read_frame_with_timeout(
        &mut self,
        frame_timeout: Duration,
    ) -> Result<Option<RawFrame>, FrameError> {
        let first_byte = match self.read_byte_allow_eof().await? {
            Some(b) => b,
            None => return Ok(None), // Clean disconnect
        };

        match timeout(frame_timeout, self.read_frame_after_first_byte(first_byte)).await {
            Ok(result) => result,
            Err(_) => Err(FrameError::FrameTimeout),
        }
    }

    /// Complete reading a frame after the first byte has been received
    async fn read_frame_after_first_byte(
        &mut self,
        first_byte: u8,
    ) -> Result<Option<RawFrame>, FrameError> {
        // Step 1: Complete reading magic bytes (we already have the first one)
        if first_byte != MAGIC[0] {
            return Err(FrameError::InvalidMagic);
        }

        let mut magic_rest = [0u8; 2];
        self.reader.read_exact(&mut magic_rest).await?;
        if magic_rest != MAGIC[1..] {
            return Err(FrameError::InvalidMagic);
        }

        // Step 2: Read type length
        let type_length = self
            .read_length_field(
                MAX_TYPE_LENGTH_DIGITS,
                FrameError::InvalidTypeLength,
                FrameError::TypeLengthTooManyDigits,
            )
            .await?;
        if type_length == 0 || type_length > MAX_TYPE_LENGTH as u64 {
            return Err(FrameError::TypeLengthOutOfRange);
        }

        // Step 3: Read message type
        let mut type_bytes = vec![0u8; type_length as usize];
        self.reader.read_exact(&mut type_bytes).await?;
        let message_type = String::from_utf8(type_bytes)
            .map_err(|_| FrameError::UnknownMessageType("<invalid utf8>".to_string()))?;

        // Step 4: Reject unknown message types early
        if !is_known_message_type(&message_type) {
            return Err(FrameError::UnknownMessageType(message_type));
        }

        // Step 5: Read delimiter
        let delimiter = self.read_byte().await?;
        if delimiter != DELIMITER {
            return Err(FrameError::MissingDelimiter);
        }

        // Step 6: Read message ID
        let mut msg_id_bytes = [0u8; MSG_ID_LENGTH];
        self.reader.read_exact(&mut msg_id_bytes).await?;
        let message_id = MessageId::from_bytes(&msg_id_bytes)?;

        // Step 7: Read delimiter
        let delimiter = self.read_byte().await?;
        if delimiter != DELIMITER {
            return Err(FrameError::MissingDelimiter);
        }

        // Step 8: Read payload length and validate against the per-type
        // maximum (0 = unlimited)
        let payload_length = self
            .read_length_field(
                MAX_PAYLOAD_LENGTH_DIGITS,
                FrameError::InvalidPayloadLength,
                FrameError::PayloadLengthTooManyDigits,
            )
            .await?;
        let max_for_type = max_payload_for_type(&message_type);
        if max_for_type > 0 && payload_length > max_for_type {
            return Err(FrameError::PayloadLengthExceedsTypeMax {
                message_type,
                length: payload_length,
                max: max_for_type,
            });
        }

        // Step 9: Read payload
        let mut payload = vec![0u8; payload_length as usize];
        self.reader.read_exact(&mut payload).await?;

        // Step 10: Read terminator
        let terminator = self.read_byte().await?;
        if terminator != TERMINATOR {
            return Err(FrameError::MissingTerminator);
        }

        Ok(Some(RawFrame::new(message_id, message_type, payload)))
    }

    /// Read a single byte, returning None on clean EOF
    async fn read_byte_allow_eof(&mut self) -> Result<Option<u8>, FrameError> {
        let mut buf = [0u8; 1];
        match self.reader.read_exact(&mut buf).await {
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a single byte
    async fn read_byte(&mut self) -> Result<u8, FrameError> {
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf).await?;
        Ok(buf[0])
    }

    /// Read a length field (digits terminated by delimiter)
    ///
    /// # Arguments
    ///
    /// * `max_digits` - Maximum number of digits allowed
    /// * `invalid_err` - Error if the field is empty, non-digit, or unparseable
    /// * `too_many_err` - Error if the field exceeds max_digits
    async fn read_length_field(
        &mut self,
        max_digits: usize,
        invalid_err: FrameError,
        too_many_err: FrameError,
    ) -> Result<u64, FrameError> {
        let mut digits = Vec::with_capacity(max_digits);

        for _ in 0..=max_digits {
            let byte = self.read_byte().await?;

            if byte == DELIMITER {
                if digits.is_empty() {
                    return Err(invalid_err);
                }
                let s = std::str::from_utf8(&digits).map_err(|_| invalid_err.clone())?;
                return s.parse().map_err(|_| invalid_err.clone());
            }

            if !byte.is_ascii_digit() {
                return Err(invalid_err);
            }

            digits.push(byte);
        }

        // Read max_digits + 1 without finding a delimiter
        Err(too_many_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::{AsyncWriteExt, BufReader};

    fn reader_for(data: &[u8]) -> FrameReader<BufReader<Cursor<Vec<u8>>>> {
        FrameReader::new(BufReader::new(Cursor::new(data.to_vec())))
    }

    #[tokio::test]
    async fn test_read_valid_frame() {
        let mut reader = reader_for(b"CR|8|Register|a1b2c3d4e5f6|16|{\"name\":\"Alice\"}\n");

        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.message_type, "Register");
        assert_eq!(
            frame.message_id,
            MessageId::from_bytes(b"a1b2c3d4e5f6").unwrap()
        );
        assert_eq!(frame.payload, b"{\"name\":\"Alice\"}");
    }

    #[tokio::test]
    async fn test_read_empty_payload() {
        let mut reader = reader_for(b"CR|10|StreamData|a1b2c3d4e5f6|0|\n");

        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.message_type, "StreamData");
        assert!(frame.payload.is_empty());
    }

    #[tokio::test]
    async fn test_read_multiple_frames() {
        let mut reader = reader_for(
            b"CR|4|Deny|a1b2c3d4e5f6|8|{\"id\":0}\nCR|11|ReceiveDone|b2c3d4e5f6a1|8|{\"id\":0}\n",
        );

        let frame1 = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame1.message_type, "Deny");

        let frame2 = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame2.message_type, "ReceiveDone");
    }

    #[tokio::test]
    async fn test_clean_disconnect() {
        let mut reader = reader_for(b"");
        assert!(reader.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_magic() {
        let mut reader = reader_for(b"XX|8|Register|a1b2c3d4e5f6|2|{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::InvalidMagic)
        ));
    }

    #[tokio::test]
    async fn test_magic_wrong_second_byte() {
        let mut reader = reader_for(b"CA|8|Register|a1b2c3d4e5f6|2|{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::InvalidMagic)
        ));
    }

    #[tokio::test]
    async fn test_invalid_message_id() {
        let mut reader = reader_for(b"CR|8|Register|not_hex_chars|2|{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::InvalidMessageId)
        ));
    }

    #[tokio::test]
    async fn test_type_length_zero() {
        let mut reader = reader_for(b"CR|0||a1b2c3d4e5f6|2|{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::TypeLengthOutOfRange)
        ));
    }

    #[tokio::test]
    async fn test_type_length_too_many_digits() {
        let mut reader = reader_for(b"CR|123|X|a1b2c3d4e5f6|2|{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::TypeLengthTooManyDigits)
        ));
    }

    #[tokio::test]
    async fn test_type_length_non_digit() {
        let mut reader = reader_for(b"CR|1a|X|a1b2c3d4e5f6|2|{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::InvalidTypeLength)
        ));
    }

    #[tokio::test]
    async fn test_type_length_empty() {
        let mut reader = reader_for(b"CR||Register|a1b2c3d4e5f6|2|{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::InvalidTypeLength)
        ));
    }

    #[tokio::test]
    async fn test_rejects_unknown_type() {
        let mut reader = reader_for(b"CR|11|UnknownType|a1b2c3d4e5f6|2|{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::UnknownMessageType(t)) if t == "UnknownType"
        ));
    }

    #[tokio::test]
    async fn test_payload_length_empty() {
        let mut reader = reader_for(b"CR|8|Register|a1b2c3d4e5f6||{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::InvalidPayloadLength)
        ));
    }

    #[tokio::test]
    async fn test_payload_length_non_digit() {
        let mut reader = reader_for(b"CR|8|Register|a1b2c3d4e5f6|1x|{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::InvalidPayloadLength)
        ));
    }

    #[tokio::test]
    async fn test_payload_length_too_many_digits() {
        // 21 digits exceeds MAX_PAYLOAD_LENGTH_DIGITS (20)
        let mut reader = reader_for(b"CR|8|Register|a1b2c3d4e5f6|123456789012345678901|{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::PayloadLengthTooManyDigits)
        ));
    }

    #[tokio::test]
    async fn test_payload_exceeds_type_max() {
        // Deny has a base limit of 64 bytes, padded 20% to 76
        let mut reader = reader_for(b"CR|4|Deny|a1b2c3d4e5f6|500|");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::PayloadLengthExceedsTypeMax {
                message_type,
                length: 500,
                max: 76
            }) if message_type == "Deny"
        ));
    }

    #[tokio::test]
    async fn test_payload_at_type_limit() {
        // Deny padded limit is 76; exactly 76 bytes must pass
        let payload = format!("{{\"id\":0,\"pad\":\"{}\"}}", "x".repeat(76 - 17));
        assert_eq!(payload.len(), 76);
        let data = format!("CR|4|Deny|a1b2c3d4e5f6|76|{payload}\n");
        let mut reader = reader_for(data.as_bytes());

        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.payload.len(), 76);
    }

    #[tokio::test]
    async fn test_unlimited_payload_type() {
        // CommandResponse has no limit (0 = unlimited)
        let payload = format!("{{\"names\":[{}]}}", "\"x\",".repeat(1000));
        let data = format!(
            "CR|15|CommandResponse|a1b2c3d4e5f6|{}|{}\n",
            payload.len(),
            payload
        );
        let mut reader = reader_for(data.as_bytes());

        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.message_type, "CommandResponse");
        assert_eq!(frame.payload.len(), payload.len());
    }

    #[tokio::test]
    async fn test_missing_delimiter_after_type() {
        let mut reader = reader_for(b"CR|8|RegisterXa1b2c3d4e5f6|2|{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::MissingDelimiter)
        ));
    }

    #[tokio::test]
    async fn test_missing_delimiter_after_message_id() {
        let mut reader = reader_for(b"CR|8|Register|a1b2c3d4e5f6X2|{}\n");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::MissingDelimiter)
        ));
    }

    #[tokio::test]
    async fn test_wrong_terminator() {
        let mut reader = reader_for(b"CR|8|Register|a1b2c3d4e5f6|2|{} ");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::MissingTerminator)
        ));
    }

    #[tokio::test]
    async fn test_eof_mid_magic() {
        let mut reader = reader_for(b"CR");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_eof_mid_type() {
        let mut reader = reader_for(b"CR|8|Regi");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_eof_mid_payload() {
        let mut reader = reader_for(b"CR|8|Register|a1b2c3d4e5f6|10|short");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_eof_before_terminator() {
        let mut reader = reader_for(b"CR|8|Register|a1b2c3d4e5f6|2|{}");
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8_in_message_type() {
        let mut data = b"CR|8|".to_vec();
        data.extend_from_slice(&[0xFF, 0xFE, 0x80, 0x81, 0x82, 0x83, 0x84, 0x85]);
        data.extend_from_slice(b"|a1b2c3d4e5f6|2|{}\n");
        let mut reader = FrameReader::new(BufReader::new(Cursor::new(data)));

        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::UnknownMessageType(_))
        ));
    }

    // =========================================================================
    // Timeout tests
    // =========================================================================

    #[tokio::test]
    async fn test_with_timeout_valid_frame() {
        let mut reader = reader_for(b"CR|8|Register|a1b2c3d4e5f6|16|{\"name\":\"Alice\"}\n");

        let frame = reader
            .read_frame_with_timeout(DEFAULT_FRAME_TIMEOUT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.message_type, "Register");
    }

    #[tokio::test]
    async fn test_with_timeout_clean_disconnect() {
        let mut reader = reader_for(b"");
        let result = reader
            .read_frame_with_timeout(DEFAULT_FRAME_TIMEOUT)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_with_timeout_frame_timeout() {
        use tokio::io::duplex;

        let (client, server) = duplex(64);
        let mut reader = FrameReader::new(BufReader::new(server));

        // Write the first byte to start the frame, then stall
        let mut client = client;
        client.write_all(b"C").await.unwrap();

        let result = reader
            .read_frame_with_timeout(Duration::from_millis(10))
            .await;
        assert!(matches!(result, Err(FrameError::FrameTimeout)));
    }

    #[tokio::test]
    async fn test_with_timeout_completes_before_timeout() {
        use tokio::io::duplex;

        let (client, server) = duplex(256);
        let mut reader = FrameReader::new(BufReader::new(server));

        let mut client = client;
        tokio::spawn(async move {
            client.write_all(b"CR|8|Register|").await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
            client
                .write_all(b"a1b2c3d4e5f6|16|{\"name\":\"Alice\"}\n")
                .await
                .unwrap();
        });

        let frame = reader
            .read_frame_with_timeout(Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.message_type, "Register");
    }
}
