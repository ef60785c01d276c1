//! Streaming XML record scanner.
//!
//! Every element whose *local* name equals the record tag becomes one flat
//! [`Record`]: its attributes (by local name, namespace declarations skipped)
//! and, when enabled, the trimmed text of its direct child elements. Event
//! buffers are cleared after each element, so memory use does not grow with
//! the size of the document.

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::data::Record;
use crate::errors::PipelineError;
use crate::types::{RecordTag, SourceId};

/// Lazy, non-restartable iterator over the records of one XML document.
pub struct XmlScanner<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    source_id: SourceId,
    tag: RecordTag,
    capture_child_text: bool,
    depth: usize,
    root: RootState,
    finished: bool,
}

/// Progress through the single root element of the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RootState {
    Pending,
    Open,
    Closed,
}

impl<R: BufRead> XmlScanner<R> {
    /// Scan `input` for elements whose local name is `tag`.
    pub fn new(input: R, source_id: impl Into<SourceId>, tag: impl Into<RecordTag>) -> Self {
        Self {
            reader: Reader::from_reader(input),
            buf: Vec::new(),
            source_id: source_id.into(),
            tag: tag.into(),
            capture_child_text: false,
            depth: 0,
            root: RootState::Pending,
            finished: false,
        }
    }

    /// Also copy the text of direct child elements into each record.
    pub fn with_child_text(mut self, capture: bool) -> Self {
        self.capture_child_text = capture;
        self
    }

    fn malformed(&self, position: u64, reason: impl Into<String>) -> PipelineError {
        PipelineError::MalformedSource {
            source_id: self.source_id.clone(),
            position,
            reason: reason.into(),
        }
    }

    fn parse_error(&self, err: quick_xml::Error) -> PipelineError {
        self.malformed(self.reader.error_position() as u64, err.to_string())
    }

    /// Consume the body of a matched record element up to its end tag.
    fn read_record_body(&mut self, record: &mut Record) -> Result<(), PipelineError> {
        let mut body_buf = Vec::new();
        let mut inner_depth = 0usize;
        // Name, text so far, and whether a nested element already ended the text.
        let mut child: Option<(String, String, bool)> = None;
        loop {
            body_buf.clear();
            let event = match self.reader.read_event_into(&mut body_buf) {
                Ok(event) => event,
                Err(err) => return Err(self.parse_error(err)),
            };
            match event {
                Event::Start(e) => {
                    inner_depth += 1;
                    if inner_depth == 1 && self.capture_child_text {
                        let name = local_name_of(&e);
                        child = Some((name, String::new(), false));
                    } else if let Some((_, _, done)) = child.as_mut() {
                        *done = true;
                    }
                }
                Event::Empty(e) => {
                    if inner_depth == 0 && self.capture_child_text {
                        record.insert(local_name_of(&e), String::new());
                    } else if let Some((_, _, done)) = child.as_mut() {
                        *done = true;
                    }
                }
                Event::Text(text) => {
                    if inner_depth == 1 {
                        if let Some((_, value, false)) = child.as_mut() {
                            let unescaped = text.unescape().map_err(|err| {
                                self.malformed(self.reader.buffer_position() as u64, err.to_string())
                            })?;
                            value.push_str(&unescaped);
                        }
                    }
                }
                Event::CData(data) => {
                    if inner_depth == 1 {
                        if let Some((_, value, false)) = child.as_mut() {
                            value.push_str(&String::from_utf8_lossy(&data));
                        }
                    }
                }
                Event::End(_) => {
                    if inner_depth == 0 {
                        return Ok(());
                    }
                    if inner_depth == 1 {
                        if let Some((name, value, _)) = child.take() {
                            record.insert(name, value.trim().to_string());
                        }
                    }
                    inner_depth -= 1;
                }
                Event::Eof => {
                    return Err(self.malformed(
                        self.reader.buffer_position() as u64,
                        format!("document ended inside a '{}' element", self.tag),
                    ));
                }
                _ => {}
            }
        }
    }

    /// Account for an element starting at the current depth.
    fn enter_element(&mut self, position: u64) -> Result<(), PipelineError> {
        if self.depth > 0 {
            return Ok(());
        }
        match self.root {
            RootState::Pending => {
                self.root = RootState::Open;
                Ok(())
            }
            RootState::Open => Ok(()),
            RootState::Closed => {
                Err(self.malformed(position, "content after the root element"))
            }
        }
    }

    fn next_record(&mut self) -> Result<Option<Record>, PipelineError> {
        loop {
            self.buf.clear();
            let read = self.reader.read_event_into(&mut self.buf);
            let step = match read {
                Err(err) => Step::Failed(err),
                Ok(Event::Empty(e)) if e.local_name().as_ref() == self.tag.as_bytes() => {
                    Step::Record {
                        attributes: attributes_of(&e),
                        has_body: false,
                    }
                }
                Ok(Event::Start(e)) if e.local_name().as_ref() == self.tag.as_bytes() => {
                    Step::Record {
                        attributes: attributes_of(&e),
                        has_body: true,
                    }
                }
                Ok(Event::Start(_)) => Step::Open,
                Ok(Event::Empty(_)) => Step::Leaf,
                Ok(Event::End(_)) => Step::Close,
                Ok(Event::Text(text)) => Step::Text {
                    blank: text.iter().all(u8::is_ascii_whitespace),
                },
                Ok(Event::CData(_)) => Step::Text { blank: false },
                Ok(Event::Eof) => Step::Eof,
                Ok(_) => Step::Skip,
            };
            let position = self.reader.buffer_position() as u64;
            match step {
                Step::Failed(err) => return Err(self.parse_error(err)),
                Step::Record {
                    attributes,
                    has_body,
                } => {
                    let top_level = self.depth == 0;
                    self.enter_element(position)?;
                    let mut record =
                        attributes.map_err(|reason| self.malformed(position, reason))?;
                    if has_body {
                        self.read_record_body(&mut record)?;
                    }
                    if top_level {
                        self.root = RootState::Closed;
                    }
                    return Ok(Some(record));
                }
                Step::Open => {
                    self.enter_element(position)?;
                    self.depth += 1;
                }
                Step::Leaf => {
                    let top_level = self.depth == 0;
                    self.enter_element(position)?;
                    if top_level {
                        self.root = RootState::Closed;
                    }
                }
                Step::Close => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        self.root = RootState::Closed;
                    }
                }
                Step::Text { blank } => {
                    if self.depth == 0 && !blank {
                        return Err(self.malformed(position, "text outside the root element"));
                    }
                }
                Step::Eof => {
                    if self.depth > 0 {
                        return Err(self.malformed(
                            position,
                            "document ended before all elements were closed",
                        ));
                    }
                    if self.root == RootState::Pending {
                        return Err(self.malformed(position, "document has no root element"));
                    }
                    return Ok(None);
                }
                Step::Skip => {}
            }
        }
    }
}

/// Owned outcome of one top-level event, detached from the event buffer.
enum Step {
    Failed(quick_xml::Error),
    Record {
        attributes: Result<Record, String>,
        has_body: bool,
    },
    Open,
    Leaf,
    Close,
    Text {
        blank: bool,
    },
    Eof,
    Skip,
}

impl<R: BufRead> Iterator for XmlScanner<R> {
    type Item = Result<Record, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

fn local_name_of(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attributes_of(e: &BytesStart<'_>) -> Result<Record, String> {
    let mut record = Record::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|err| err.to_string())?;
        record.insert(name, value.into_owned());
    }
    Ok(record)
}
