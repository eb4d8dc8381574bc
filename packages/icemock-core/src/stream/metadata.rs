//! Repeating sequence of stream titles injected as ICY metadata.

use bytes::Bytes;

use super::icy::IcyFormatter;
use crate::error::ConfigResult;
use crate::protocol_constants::DEFAULT_STREAM_TITLE;

/// Ordered, repeating list of titles with their pre-encoded ICY frames.
///
/// Frames are encoded once at construction so an oversized title fails when
/// the server is configured, never mid-stream. An empty cycle always yields
/// [`DEFAULT_STREAM_TITLE`].
#[derive(Debug, Clone)]
pub struct MetadataCycle {
    titles: Vec<String>,
    frames: Vec<Bytes>,
    default_frame: Bytes,
}

impl MetadataCycle {
    /// Creates a cycle, encoding every title.
    pub fn new(titles: Vec<String>) -> ConfigResult<Self> {
        let frames = titles
            .iter()
            .map(|t| IcyFormatter::format_metadata(t))
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self {
            titles,
            frames,
            default_frame: IcyFormatter::format_metadata(DEFAULT_STREAM_TITLE)?,
        })
    }

    /// Creates an empty cycle that always yields the default title.
    pub fn empty() -> Self {
        Self {
            titles: Vec::new(),
            frames: Vec::new(),
            default_frame: Bytes::from_static(DEFAULT_FRAME),
        }
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Returns the title at `index`, or the default title for an empty cycle.
    pub fn title_at(&self, index: usize) -> &str {
        self.titles
            .get(index)
            .map(String::as_str)
            .unwrap_or(DEFAULT_STREAM_TITLE)
    }

    /// Returns the encoded frame at `index`, or the default frame.
    ///
    /// The returned `Bytes` is a cheap reference-counted clone.
    pub fn frame_at(&self, index: usize) -> Bytes {
        self.frames
            .get(index)
            .cloned()
            .unwrap_or_else(|| self.default_frame.clone())
    }

    /// Advances `index`, wrapping at the end. Always 0 for an empty cycle.
    pub fn next_index(&self, index: usize) -> usize {
        if self.titles.is_empty() {
            0
        } else {
            (index + 1) % self.titles.len()
        }
    }
}

impl Default for MetadataCycle {
    fn default() -> Self {
        Self::empty()
    }
}

/// `StreamTitle='Test Artist - Test Song';` in three zero-padded blocks.
const DEFAULT_FRAME: &[u8; 49] = b"\x03StreamTitle='Test Artist - Test Song';\0\0\0\0\0\0\0\0\0\0";

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(titles: &[&str]) -> MetadataCycle {
        MetadataCycle::new(titles.iter().map(|t| t.to_string()).collect()).unwrap()
    }

    #[test]
    fn static_default_frame_matches_formatter() {
        let encoded = IcyFormatter::format_metadata(DEFAULT_STREAM_TITLE).unwrap();
        assert_eq!(&encoded[..], &DEFAULT_FRAME[..]);
        assert_eq!(MetadataCycle::empty().frame_at(0), encoded);
    }

    #[test]
    fn empty_cycle_stays_on_default() {
        let cycle = MetadataCycle::empty();
        assert!(cycle.is_empty());
        assert_eq!(cycle.title_at(0), DEFAULT_STREAM_TITLE);
        assert_eq!(cycle.next_index(0), 0);
    }

    #[test]
    fn index_wraps_after_last_entry() {
        let cycle = cycle(&["One", "Two", "Three"]);
        let mut index = 0;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(cycle.title_at(index).to_string());
            index = cycle.next_index(index);
        }
        assert_eq!(seen, ["One", "Two", "Three", "One"]);
        assert_eq!(cycle.frame_at(3 % cycle.len()), cycle.frame_at(0));
    }

    #[test]
    fn oversized_title_rejected_at_construction() {
        let result = MetadataCycle::new(vec!["ok".into(), "z".repeat(5000)]);
        assert!(result.is_err());
    }
}
