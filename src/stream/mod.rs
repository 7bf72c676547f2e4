//! Streaming ingest of bulk campaign documents.
//!
//! This module provides:
//! - `NotificationRecord`, the per-client message handed to the transport
//! - `XmlRecordStreamer`, a forward-only, single-pass cursor that emits one
//!   record per well-formed `Client` element without materializing the
//!   document
//!
//! Expected document shape:
//!
//! ```xml
//! <Clients>
//!     <Client ID="12345">
//!         <Template Id="1">
//!             <Name>TemplateName.html</Name>
//!             <MarketingData>{"title":"..."}</MarketingData>
//!         </Template>
//!     </Client>
//!     <!-- More clients -->
//! </Clients>
//! ```
//!
//! An incomplete client (missing `ID`, `Template`, `Name` or
//! `MarketingData`) is skipped with a warning and scanning continues with
//! the next sibling; a structurally malformed document aborts the pass.

use std::collections::HashMap;

use futures::Stream;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncBufRead;

/// Result type for streaming operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Streaming-specific error type. Structural errors are fatal for the
/// whole import pass.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Malformed XML document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
}

/// One per-client notification message, consumed immediately downstream
/// and never persisted or mutated after emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationRecord {
    /// Source `ID` attribute value, verbatim; always non-empty
    pub client_id: String,
    /// Source `Template` `Id` attribute value; may be empty
    pub template_id: String,
    /// Template file name from the `Name` element
    pub template_name: String,
    /// Campaign-level email subject
    pub subject: String,
    /// Campaign-level sender address
    pub sender_email: String,
    /// Raw JSON marketing payload; may be empty
    pub data: String,
}

/// An element start captured with owned attribute values, so the shared
/// event buffer can be reused for the next read.
struct ElementStart {
    attributes: HashMap<String, String>,
    empty: bool,
}

impl ElementStart {
    fn attribute(&self, name: &str) -> String {
        self.attributes.get(name).cloned().unwrap_or_default()
    }
}

/// Forward-only cursor over a campaign document.
///
/// Lazy, finite and non-restartable: exactly one consumer drives it via
/// `next_record` (or the `Stream` adapter), and consumed input is never
/// revisited. Memory use is O(1) beyond the currently buffered event.
pub struct XmlRecordStreamer<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    depth: usize,
    subject: String,
    sender_email: String,
    skipped: usize,
    finished: bool,
}

impl<R: AsyncBufRead + Unpin> XmlRecordStreamer<R> {
    /// Create a streamer over an XML source. `subject` and `sender_email`
    /// are campaign-level values stamped onto every emitted record.
    pub fn new(source: R, subject: impl Into<String>, sender_email: impl Into<String>) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);

        Self {
            reader,
            buf: Vec::new(),
            depth: 0,
            subject: subject.into(),
            sender_email: sender_email.into(),
            skipped: 0,
            finished: false,
        }
    }

    /// Number of clients skipped so far because they were incomplete.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Advance to the next well-formed client and emit its record.
    ///
    /// Returns `Ok(None)` once the document is exhausted. Incomplete
    /// clients are skipped; only structural XML errors fail.
    pub async fn next_record(&mut self) -> StreamResult<Option<NotificationRecord>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let Some(client) = self.descend_to(b"Client", 0).await? else {
                self.finished = true;
                return Ok(None);
            };
            let client_depth = self.depth;
            let client_id = client.attribute("ID");

            if client_id.is_empty() {
                tracing::warn!("Skipping client element without an ID attribute");
                self.skip_client(&client, client_depth).await?;
                continue;
            }
            if client.empty {
                tracing::warn!(client_id = %client_id, "Skipping client without a Template element");
                self.skipped += 1;
                continue;
            }

            let Some(template) = self.descend_to(b"Template", client_depth).await? else {
                tracing::warn!(client_id = %client_id, "Skipping client without a Template element");
                self.skipped += 1;
                continue;
            };
            let template_depth = self.depth;
            let template_id = template.attribute("Id");

            let template_name = match self.read_child_text(b"Name", template_depth).await? {
                Some(text) => text,
                None => {
                    tracing::warn!(client_id = %client_id, "Skipping client without a template Name");
                    self.skipped += 1;
                    self.skip_subtree(client_depth).await?;
                    continue;
                }
            };

            let data = match self.read_child_text(b"MarketingData", template_depth).await? {
                Some(text) => text,
                None => {
                    tracing::warn!(client_id = %client_id, "Skipping client without MarketingData");
                    self.skipped += 1;
                    self.skip_subtree(client_depth).await?;
                    continue;
                }
            };

            // Resume the outer scan from the client's closing boundary.
            self.skip_subtree(client_depth).await?;

            return Ok(Some(NotificationRecord {
                client_id,
                template_id,
                template_name,
                subject: self.subject.clone(),
                sender_email: self.sender_email.clone(),
                data,
            }));
        }
    }

    /// Adapt the streamer into a lazy `Stream` of records.
    pub fn into_stream(mut self) -> impl Stream<Item = StreamResult<NotificationRecord>> {
        async_stream::try_stream! {
            while let Some(record) = self.next_record().await? {
                yield record;
            }
        }
    }

    async fn skip_client(&mut self, client: &ElementStart, client_depth: usize) -> StreamResult<()> {
        self.skipped += 1;
        if !client.empty {
            self.skip_subtree(client_depth).await?;
        }
        Ok(())
    }

    /// Advance until an element named `name` starts at or below the current
    /// nesting level. Stops without backtracking when the enclosing element
    /// at `boundary` depth closes, or at end of input.
    async fn descend_to(
        &mut self,
        name: &[u8],
        boundary: usize,
    ) -> StreamResult<Option<ElementStart>> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into_async(&mut self.buf).await? {
                Event::Start(start) => {
                    self.depth += 1;
                    if start.local_name().as_ref() == name {
                        return Ok(Some(Self::capture(&start, false)?));
                    }
                }
                Event::Empty(start) => {
                    if start.local_name().as_ref() == name {
                        return Ok(Some(Self::capture(&start, true)?));
                    }
                }
                Event::End(_) => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth < boundary {
                        return Ok(None);
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    fn capture(start: &BytesStart<'_>, empty: bool) -> StreamResult<ElementStart> {
        let mut attributes = HashMap::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(quick_xml::Error::from)?
                .into_owned();
            attributes.insert(key, value);
        }
        Ok(ElementStart { attributes, empty })
    }

    /// Descend to a named child and collect its text content, trimmed.
    /// `None` when the child is absent within the bounding subtree.
    async fn read_child_text(
        &mut self,
        name: &[u8],
        boundary: usize,
    ) -> StreamResult<Option<String>> {
        let Some(element) = self.descend_to(name, boundary).await? else {
            return Ok(None);
        };
        if element.empty {
            return Ok(Some(String::new()));
        }

        let target = self.depth;
        let mut text = String::new();
        loop {
            self.buf.clear();
            match self.reader.read_event_into_async(&mut self.buf).await? {
                Event::Text(chunk) => {
                    text.push_str(&chunk.unescape().map_err(quick_xml::Error::from)?)
                }
                Event::CData(chunk) => {
                    text.push_str(&String::from_utf8_lossy(chunk.as_ref()));
                }
                Event::Start(_) => self.depth += 1,
                Event::End(_) => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth < target {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(Some(text.trim().to_string()))
    }

    /// Consume events until the element whose content depth is `below`
    /// closes.
    async fn skip_subtree(&mut self, below: usize) -> StreamResult<()> {
        while self.depth >= below {
            self.buf.clear();
            match self.reader.read_event_into_async(&mut self.buf).await? {
                Event::Start(_) => self.depth += 1,
                Event::End(_) => self.depth = self.depth.saturating_sub(1),
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(())
    }
}
