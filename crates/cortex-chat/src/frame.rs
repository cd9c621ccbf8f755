//! Line-oriented SSE framing.
//!
//! The agent endpoint writes one `event:` or `data:` field per line. An
//! `event:` line sets the context for every following `data:` line until the
//! next `event:` line; each `data:` line is one frame.

const DONE_SENTINEL: &str = "[DONE]";

/// One `data:` line together with the event type in effect when it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event_type: Option<String>,
    pub raw_payload: String,
}

impl Frame {
    pub fn new(event_type: Option<&str>, raw_payload: impl Into<String>) -> Self {
        Self {
            event_type: event_type.map(ToOwned::to_owned),
            raw_payload: raw_payload.into(),
        }
    }

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }
}

/// Output of the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameItem {
    Frame(Frame),
    /// `data: [DONE]` was read; nothing after it is consumed.
    Done,
}

/// Incremental reader state for one response body.
#[derive(Debug, Default)]
pub struct FrameReader {
    current_event: Option<String>,
    saw_data: bool,
    done: bool,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line. Returns the frame it produced, if any.
    ///
    /// After `FrameItem::Done` every further line is ignored.
    pub fn push_line(&mut self, line: &str) -> Option<FrameItem> {
        if self.done {
            return None;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return None;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            self.current_event = Some(rest.trim().to_string()).filter(|e| !e.is_empty());
            return None;
        }
        let rest = line.strip_prefix("data:")?;
        self.saw_data = true;
        let payload = rest.trim();
        if payload == DONE_SENTINEL {
            self.done = true;
            return Some(FrameItem::Done);
        }
        Some(FrameItem::Frame(Frame::new(
            self.current_event.as_deref(),
            payload,
        )))
    }

    /// True once the `[DONE]` sentinel has been read.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// True if at least one `data:` line was seen.
    pub fn saw_data(&self) -> bool {
        self.saw_data
    }

    pub fn current_event(&self) -> Option<&str> {
        self.current_event.as_deref()
    }
}

/// Lazy frame sequence over any line source.
pub struct Frames<I> {
    lines: I,
    reader: FrameReader,
}

impl<I, S> Iterator for Frames<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = FrameItem;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.is_done() {
            return None;
        }
        for line in self.lines.by_ref() {
            if let Some(item) = self.reader.push_line(line.as_ref()) {
                return Some(item);
            }
        }
        None
    }
}

/// Frames the given lines. The sequence ends at `[DONE]` or when the lines
/// run out.
pub fn frames<I, S>(lines: I) -> Frames<I::IntoIter>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Frames {
        lines: lines.into_iter(),
        reader: FrameReader::new(),
    }
}

/// True if any line is a `data:` field.
pub fn has_data_lines<S: AsRef<str>>(lines: &[S]) -> bool {
    lines
        .iter()
        .any(|line| line.as_ref().trim_start().starts_with("data:"))
}
