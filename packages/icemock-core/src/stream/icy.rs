//! ICY (Shoutcast) protocol encoding.
//!
//! This module encapsulates the two byte-exact pieces of the protocol: the
//! response header block sent at connection start, and the in-band metadata
//! frame injected between audio chunks.

use std::fmt::Write as _;

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::StreamConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::protocol_constants::{
    ICY_BLOCK_SIZE, ICY_GENRE, ICY_MAX_METADATA_LEN, ICY_STATUS_LINE,
};

/// Formats stream titles into ICY metadata frames.
///
/// Stateless; the caller decides when a frame is due.
pub struct IcyFormatter;

impl IcyFormatter {
    /// Encodes a title as `StreamTitle='<title>';` in an ICY metadata frame.
    ///
    /// The first byte is the number of 16-byte blocks, followed by the UTF-8
    /// payload zero-padded to that length. Titles whose payload would need
    /// more than 255 blocks are rejected rather than truncated.
    pub fn format_metadata(title: &str) -> ConfigResult<Bytes> {
        let meta_str = format!("StreamTitle='{}';", title);
        let meta_bytes = meta_str.as_bytes();

        let num_blocks = meta_bytes.len().div_ceil(ICY_BLOCK_SIZE);
        let padded_len = num_blocks * ICY_BLOCK_SIZE;
        if padded_len > ICY_MAX_METADATA_LEN {
            return Err(ConfigError::MetadataTooLong {
                title: title.to_string(),
                encoded_len: meta_bytes.len(),
            });
        }

        log::trace!("[ICY] {} -> {} block(s)", meta_str, num_blocks);

        let mut frame = BytesMut::with_capacity(padded_len + 1);
        frame.put_u8(num_blocks as u8);
        frame.put_slice(meta_bytes);
        frame.resize(padded_len + 1, 0);
        Ok(frame.freeze())
    }
}

/// Builds the header block written before any audio bytes.
///
/// The status line is `ICY 200 OK`, not an HTTP/1.x status line. `icy-metaint`
/// is only advertised when the client asked for in-band metadata.
#[must_use]
pub fn encode_handshake(config: &StreamConfig, wants_metadata: bool) -> Bytes {
    let mut head = String::with_capacity(192);
    head.push_str(ICY_STATUS_LINE);
    head.push_str("\r\n");

    // Writing into a String cannot fail.
    let _ = write!(head, "icy-name:{}\r\n", config.station_name);
    let _ = write!(head, "icy-url:{}\r\n", config.station_url);
    let _ = write!(head, "icy-br:{}\r\n", config.bitrate);
    let _ = write!(head, "icy-genre:{}\r\n", ICY_GENRE);
    let _ = write!(head, "Content-Type:{}\r\n", config.content_type);
    if wants_metadata {
        let _ = write!(head, "icy-metaint:{}\r\n", config.meta_interval);
    }
    head.push_str("\r\n");

    Bytes::from(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_title_encodes_to_three_blocks() {
        let frame = IcyFormatter::format_metadata("Test Artist - Test Song").unwrap();
        let payload = b"StreamTitle='Test Artist - Test Song';";

        assert_eq!(frame[0], 3);
        assert_eq!(frame.len(), 1 + 48);
        assert_eq!(&frame[1..1 + payload.len()], payload);
        assert!(frame[1 + payload.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn payload_of_exact_block_multiple_has_no_padding() {
        // "StreamTitle='';" is 15 bytes; one more char makes 16
        let frame = IcyFormatter::format_metadata("x").unwrap();
        assert_eq!(frame[0], 1);
        assert_eq!(frame.len(), 17);
        assert_eq!(&frame[1..], b"StreamTitle='x';");
    }

    #[test]
    fn multibyte_titles_are_measured_in_bytes() {
        let frame = IcyFormatter::format_metadata("Café").unwrap();
        // 15 framing bytes + 5 UTF-8 bytes = 20 -> 2 blocks
        assert_eq!(frame[0], 2);
        assert_eq!(frame.len(), 33);
    }

    #[test]
    fn largest_encodable_title_is_accepted() {
        let title = "a".repeat(ICY_MAX_METADATA_LEN - 15);
        let frame = IcyFormatter::format_metadata(&title).unwrap();
        assert_eq!(frame[0], 255);
        assert_eq!(frame.len(), ICY_MAX_METADATA_LEN + 1);
    }

    #[test]
    fn oversized_title_is_a_config_error() {
        let title = "a".repeat(ICY_MAX_METADATA_LEN);
        let err = IcyFormatter::format_metadata(&title).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MetadataTooLong { encoded_len, .. } if encoded_len == ICY_MAX_METADATA_LEN + 15
        ));
    }

    #[test]
    fn handshake_without_metadata_omits_metaint() {
        let config = StreamConfig::default();
        let head = encode_handshake(&config, false);
        assert_eq!(
            &head[..],
            b"ICY 200 OK\r\n\
              icy-name:Test Radio Station\r\n\
              icy-url:http://localhost:8765\r\n\
              icy-br:128\r\n\
              icy-genre:Test\r\n\
              Content-Type:audio/mpeg\r\n\
              \r\n"
        );
    }

    #[test]
    fn handshake_with_metadata_advertises_interval() {
        let config = StreamConfig::builder()
            .station_name("Night Owl FM")
            .bitrate(64)
            .content_type("application/ogg")
            .meta_interval(16000)
            .build()
            .unwrap();
        let head = String::from_utf8(encode_handshake(&config, true).to_vec()).unwrap();

        assert!(head.starts_with("ICY 200 OK\r\n"));
        assert!(head.contains("icy-name:Night Owl FM\r\n"));
        assert!(head.contains("icy-br:64\r\n"));
        assert!(head.contains("Content-Type:application/ogg\r\n"));
        assert!(head.ends_with("icy-metaint:16000\r\n\r\n"));
        assert!(!head.contains("HTTP/"));
    }
}
