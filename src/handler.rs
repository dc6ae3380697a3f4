//! Content handler (spec component H / §6): the callback surface a decoder
//! drives and an encoder is driven through.
//!
//! Grounded on spec.md §6's 19-callback struct (`startDocument`, `endElement`,
//! `intData`, ...), modeled as a trait rather than a struct of function
//! pointers — each method defaults to `Ok(Flow::Continue)` so an application
//! only overrides the events it cares about, the way the teacher's
//! `h3`/`settings` modules favor small trait surfaces over configuration
//! structs threaded everywhere.

use crate::codec::{DateTime, Decimal, ExiFloat};
use crate::error::Result;
use crate::qname::QNameId;

/// A callback's request to keep going or unwind the stream, mirroring the
/// `{OK, STOP}` pair §6 specifies in place of a bare `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Receives one callback per grammar-engine step. Decoders call these as
/// they walk an EXI body; encoders call the matching `ExiEvent`-emitting
/// methods on [`crate::stream::Encoder`], which drive the same events in
/// reverse. An opaque application context isn't threaded through these
/// methods the way the C reference does it (`void *app_data`) — a `&mut
/// Self` implementor already carries whatever state the application needs.
pub trait ContentHandler {
    fn start_document(&mut self) -> Result<Flow> {
        Ok(Flow::Continue)
    }

    fn end_document(&mut self) -> Result<Flow> {
        Ok(Flow::Continue)
    }

    fn start_element(&mut self, qname: QNameId) -> Result<Flow> {
        let _ = qname;
        Ok(Flow::Continue)
    }

    fn end_element(&mut self) -> Result<Flow> {
        Ok(Flow::Continue)
    }

    fn attribute(&mut self, qname: QNameId) -> Result<Flow> {
        let _ = qname;
        Ok(Flow::Continue)
    }

    fn int_data(&mut self, value: i64) -> Result<Flow> {
        let _ = value;
        Ok(Flow::Continue)
    }

    fn boolean_data(&mut self, value: bool) -> Result<Flow> {
        let _ = value;
        Ok(Flow::Continue)
    }

    fn string_data(&mut self, value: &str) -> Result<Flow> {
        let _ = value;
        Ok(Flow::Continue)
    }

    fn float_data(&mut self, value: ExiFloat) -> Result<Flow> {
        let _ = value;
        Ok(Flow::Continue)
    }

    fn binary_data(&mut self, value: &[u8]) -> Result<Flow> {
        let _ = value;
        Ok(Flow::Continue)
    }

    fn date_time_data(&mut self, value: &DateTime) -> Result<Flow> {
        let _ = value;
        Ok(Flow::Continue)
    }

    fn decimal_data(&mut self, value: Decimal) -> Result<Flow> {
        let _ = value;
        Ok(Flow::Continue)
    }

    /// `exiType` is the value type shared by every item of the list; items
    /// are reported one at a time through the matching `*_data` callback
    /// rather than batched, so this only announces the count up front.
    fn list_data(&mut self, exi_type: crate::event::ValueType, count: usize) -> Result<Flow> {
        let (_, _) = (exi_type, count);
        Ok(Flow::Continue)
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<Flow> {
        let (_, _) = (target, data);
        Ok(Flow::Continue)
    }

    fn namespace_declaration(&mut self, uri: &str, prefix: &str, is_local: bool) -> Result<Flow> {
        let (_, _, _) = (uri, prefix, is_local);
        Ok(Flow::Continue)
    }

    fn comment(&mut self, text: &str) -> Result<Flow> {
        let _ = text;
        Ok(Flow::Continue)
    }

    fn doc_type(&mut self, name: &str, public: &str, system: &str, text: &str) -> Result<Flow> {
        let (_, _, _, _) = (name, public, system, text);
        Ok(Flow::Continue)
    }

    fn entity_reference(&mut self, name: &str) -> Result<Flow> {
        let _ = name;
        Ok(Flow::Continue)
    }

    fn self_contained(&mut self) -> Result<Flow> {
        Ok(Flow::Continue)
    }

    fn warning(&mut self, code: crate::error::ErrorCode, message: &str) {
        let (_, _) = (code, message);
    }

    fn error(&mut self, code: crate::error::ErrorCode, message: &str) {
        let (_, _) = (code, message);
    }

    fn fatal_error(&mut self, code: crate::error::ErrorCode, message: &str) {
        let (_, _) = (code, message);
    }
}

/// A handler that records every callback it receives, in order, as a flat
/// event log — the collaborator the `stream` module's round-trip tests
/// decode into, in place of a full application.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    StartDocument,
    EndDocument,
    StartElement(QNameId),
    EndElement,
    Attribute(QNameId),
    IntData(i64),
    BooleanData(bool),
    StringData(String),
    FloatData(ExiFloat),
    BinaryData(Vec<u8>),
    DateTimeData(DateTime),
    DecimalData(Decimal),
    SelfContained,
}

#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub events: Vec<Recorded>,
}

impl ContentHandler for RecordingHandler {
    fn start_document(&mut self) -> Result<Flow> {
        self.events.push(Recorded::StartDocument);
        Ok(Flow::Continue)
    }

    fn end_document(&mut self) -> Result<Flow> {
        self.events.push(Recorded::EndDocument);
        Ok(Flow::Continue)
    }

    fn start_element(&mut self, qname: QNameId) -> Result<Flow> {
        self.events.push(Recorded::StartElement(qname));
        Ok(Flow::Continue)
    }

    fn end_element(&mut self) -> Result<Flow> {
        self.events.push(Recorded::EndElement);
        Ok(Flow::Continue)
    }

    fn attribute(&mut self, qname: QNameId) -> Result<Flow> {
        self.events.push(Recorded::Attribute(qname));
        Ok(Flow::Continue)
    }

    fn int_data(&mut self, value: i64) -> Result<Flow> {
        self.events.push(Recorded::IntData(value));
        Ok(Flow::Continue)
    }

    fn boolean_data(&mut self, value: bool) -> Result<Flow> {
        self.events.push(Recorded::BooleanData(value));
        Ok(Flow::Continue)
    }

    fn string_data(&mut self, value: &str) -> Result<Flow> {
        self.events.push(Recorded::StringData(value.to_string()));
        Ok(Flow::Continue)
    }

    fn float_data(&mut self, value: ExiFloat) -> Result<Flow> {
        self.events.push(Recorded::FloatData(value));
        Ok(Flow::Continue)
    }

    fn binary_data(&mut self, value: &[u8]) -> Result<Flow> {
        self.events.push(Recorded::BinaryData(value.to_vec()));
        Ok(Flow::Continue)
    }

    fn date_time_data(&mut self, value: &DateTime) -> Result<Flow> {
        self.events.push(Recorded::DateTimeData(*value));
        Ok(Flow::Continue)
    }

    fn decimal_data(&mut self, value: Decimal) -> Result<Flow> {
        self.events.push(Recorded::DecimalData(value));
        Ok(Flow::Continue)
    }

    fn self_contained(&mut self) -> Result<Flow> {
        self.events.push(Recorded::SelfContained);
        Ok(Flow::Continue)
    }
}
