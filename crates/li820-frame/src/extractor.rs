use std::io::Read;
use std::ops::Range;

use tracing::debug;

use crate::config::{FrameConfig, LeftoverPolicy};
use crate::error::Result;
use crate::reader::FrameReader;
use crate::tag::{find, rfind, FrameTag, Markers};

/// Locate the most recently completed frame in `buf`.
///
/// Picks the last start marker that is followed by an end marker, and ends the
/// frame at the first end marker after it. Stale opens and earlier complete
/// frames are skipped. The result only depends on `buf`, so calling it again on
/// an unchanged buffer returns the same range.
pub fn locate_frame(buf: &[u8], markers: &Markers) -> Option<Range<usize>> {
    let mut search_end = buf.len();
    while let Some(start) = rfind(&buf[..search_end], &markers.start) {
        let body = start + markers.start.len();
        if let Some(end) = find(&buf[body..], &markers.end) {
            return Some(start..body + end + markers.end.len());
        }
        search_end = start;
    }
    None
}

/// Slices complete `<tag>...</tag>` frames out of a byte stream.
pub struct FrameExtractor<T> {
    reader: FrameReader<T>,
    tag: FrameTag,
    markers: Markers,
    leftover: LeftoverPolicy,
}

impl<T: Read> FrameExtractor<T> {
    /// Create an extractor for `tag` frames with default configuration.
    pub fn new(inner: T, tag: FrameTag) -> Self {
        Self::with_config(inner, tag, FrameConfig::default())
    }

    /// Create an extractor with explicit configuration.
    pub fn with_config(inner: T, tag: FrameTag, config: FrameConfig) -> Self {
        let markers = tag.markers();
        let leftover = config.leftover;
        Self {
            reader: FrameReader::with_config(inner, config),
            tag,
            markers,
            leftover,
        }
    }

    /// Wait for a start marker and anchor the accumulator on it.
    ///
    /// Everything ahead of the anchor is dropped: line noise, and opens that
    /// were never closed. If a complete frame is already buffered, the anchor
    /// is that frame's start. Returns the accumulator from the anchor on.
    pub fn wait_for_start(&mut self) -> Result<&[u8]> {
        let buf = self.reader.read_until(&self.markers.start)?;
        let anchor = locate_frame(buf, &self.markers)
            .map(|frame| frame.start)
            .or_else(|| rfind(buf, &self.markers.start))
            .unwrap_or(0);

        if anchor > 0 {
            debug!(dropped = anchor, tag = %self.tag, "discarding bytes ahead of frame start");
            self.reader.consume(anchor);
        }
        Ok(self.reader.buffer())
    }

    /// Wait for an end marker and take the most recently completed frame.
    ///
    /// The frame is removed from the accumulator. What follows it is kept or
    /// dropped according to the [`LeftoverPolicy`].
    pub fn wait_for_end(&mut self) -> Result<String> {
        loop {
            let buf = self
                .reader
                .read_until_or_restart(&self.markers.end, &self.markers.start)?;
            if let Some(frame) = locate_frame(buf, &self.markers) {
                return Ok(self.take(frame));
            }

            // Every end marker in the buffer precedes every start marker.
            let orphan_end = rfind(buf, &self.markers.end)
                .map(|pos| pos + self.markers.end.len())
                .unwrap_or(buf.len());
            debug!(dropped = orphan_end, tag = %self.tag, "discarding end tag without a start");
            self.reader.consume(orphan_end);
        }
    }

    /// Block until the next complete frame is available and return it.
    pub fn next_frame(&mut self) -> Result<String> {
        self.wait_for_start()?;
        self.wait_for_end()
    }

    fn take(&mut self, frame: Range<usize>) -> String {
        let buf = self.reader.buffer();
        let text = String::from_utf8_lossy(&buf[frame.clone()]).into_owned();
        let trailing = buf.len() - frame.end;

        match self.leftover {
            LeftoverPolicy::CarryForward => self.reader.consume(frame.end),
            LeftoverPolicy::Discard => {
                if trailing > 0 {
                    debug!(dropped = trailing, tag = %self.tag, "discarding bytes after frame");
                }
                self.reader.clear();
            }
        }
        text
    }

    /// Tag this extractor frames on.
    pub fn tag(&self) -> &FrameTag {
        &self.tag
    }

    /// Bytes buffered but not yet part of an extracted frame.
    pub fn buffered(&self) -> &[u8] {
        self.reader.buffer()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        self.reader.get_ref()
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        self.reader.get_mut()
    }

    /// Consume the extractor and return the inner stream.
    pub fn into_inner(self) -> T {
        self.reader.into_inner()
    }
}
