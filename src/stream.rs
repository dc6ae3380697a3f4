//! Codec facade (spec component H / §4.H): the event-emitting `Encoder`,
//! the callback-driving `Decoder`, and the per-stream state both close over.
//!
//! Grounded on `original_source/trunk/include/procTypes.h`'s `EXIStream`
//! struct (bit buffer + string tables + grammar stack + options, one value
//! per in-flight stream) and on the teacher's `Session` (`session.rs`):
//! one struct owning the mutable per-connection state behind an
//! init/use/close lifecycle, with fallible methods returning the crate's own
//! error type rather than panicking.

use crate::bitstream::{BitBuffer, Sink, Source};
use crate::codec::{self, DateTime, Decimal, ExiFloat};
use crate::error::{ErrorCode, Result};
use crate::event::{EventType, ExiEvent, ValueType};
use crate::grammar::engine::{self, CodePosition};
use crate::grammar::rule::{GrammarRule, Production, VOID_NON_TERMINAL};
use crate::grammar::stack::{GrammarPool, GrammarStack};
use crate::handler::{ContentHandler, Flow};
use crate::header::{self, Header};
use crate::options::Options;
use crate::qname::QNameId;
use crate::strtab::StringTables;

/// Per-stream mutable state shared by encoder and decoder: string tables and
/// the grammar stack/pool, plus the validated options the stream was opened
/// with. Matches `EXIStream`'s `strTable`/`gStack`/`header.opts` fields.
pub struct ExiStreamState {
    pub options: Options,
    pub strtab: StringTables,
    pub stack: GrammarStack,
    pub pool: GrammarPool,
}

impl ExiStreamState {
    /// Builds the initial state for a fresh stream: validates `options`,
    /// seeds the string tables, and pushes the document (or fragment)
    /// grammar as the sole initial frame. `pool` is the schema's installed
    /// grammars (from [`crate::schema::build_schema`]), or an empty pool for
    /// a schema-less stream — either way, elements outside the schema still
    /// get built-in grammars lazily the first time they're seen (§4.E).
    pub fn new(options: Options, pool: GrammarPool) -> Result<Self> {
        options.validate()?;
        let stack = if options.fragment {
            engine::fragment_root(options.preserve)?
        } else {
            engine::document_root(options.preserve)?
        };
        Ok(Self {
            strtab: StringTables::new(options.value_partition_capacity, options.value_max_length),
            options,
            stack,
            pool,
        })
    }
}

/// Encodes an application's event stream into an EXI body.
pub struct Encoder {
    buf: BitBuffer,
    sink: Box<dyn Sink>,
    state: ExiStreamState,
}

impl Encoder {
    /// `init_stream`: writes the header (cookie + distinguishing bits +
    /// version; no in-band options document — see `SPEC_FULL.md`'s options
    /// scope note) and builds the initial grammar stack.
    pub fn init_stream(options: Options, pool: GrammarPool, sink: Box<dyn Sink>, emit_cookie: bool) -> Result<Self> {
        let state = ExiStreamState::new(options, pool)?;
        let mut buf = BitBuffer::for_writing();
        let mut sink = sink;
        let header = Header {
            has_cookie: emit_cookie,
            has_options: false,
            is_preview_version: false,
            version_number: 1,
        };
        header::encode_header(&header, &mut buf, sink.as_mut(), |_, _| Ok(()))?;
        Ok(Self { buf, sink, state })
    }

    pub fn strtab_mut(&mut self) -> &mut StringTables {
        &mut self.state.strtab
    }

    fn current_rule(&self) -> GrammarRule {
        let top = self.state.stack.top().expect("stream has an open frame");
        top.grammar.borrow().rules[top.current_rule].clone()
    }

    /// Finds and writes the event code for `event_type`/`target` against the
    /// current rule, returning the matched production. Fails with
    /// `EventCodeMissing` when nothing — not even a wildcard — matches,
    /// which is strict-grammar behavior (§4.E; non-strict recovery is out of
    /// scope, see `SPEC_FULL.md`).
    fn emit_code(&mut self, event_type: EventType, target: Option<QNameId>) -> Result<(CodePosition, Production)> {
        let rule = self.current_rule();
        let pos = engine::find_production_for_encode(&rule, event_type, target)
            .ok_or(ErrorCode::EventCodeMissing)?;
        engine::write_code(&rule, pos, &mut self.buf, self.sink.as_mut())?;
        Ok((pos, engine::production_at(&rule, pos).clone()))
    }

    /// Writes a learned qname if `prod` didn't already pin an exact target
    /// (i.e. it matched through a wildcard), and records the new production
    /// in the grammar the wildcard fired in (§4.E step 5).
    fn learn_if_wildcard(&mut self, prod: &Production, qname: QNameId, learned_event: ExiEvent) -> Result<()> {
        if prod.target == Some(qname) {
            return Ok(());
        }
        crate::strtab::encode_qname(&mut self.buf, qname, &mut self.state.strtab, self.sink.as_mut())?;
        engine::learn(&self.state.stack, qname, learned_event, prod.next_rule)
    }

    pub fn start_document(&mut self) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::StartDocument, None)?;
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    pub fn end_document(&mut self) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::EndDocument, None)?;
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    pub fn start_element(&mut self, qname: QNameId) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::StartElementQName, Some(qname))?;
        self.learn_if_wildcard(&prod, qname, engine::learned_start_element())?;
        let parent_resume_rule = prod.next_rule;
        engine::push_element(
            &mut self.state.stack,
            &mut self.state.pool,
            parent_resume_rule,
            qname,
            self.state.options.preserve,
            self.state.options.self_contained,
        )
    }

    pub fn end_element(&mut self) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::EndElement, None)?;
        debug_assert_eq!(prod.next_rule, VOID_NON_TERMINAL);
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    pub fn attribute_string(&mut self, qname: QNameId, value: &str) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::AttributeQName, Some(qname))?;
        self.learn_if_wildcard(&prod, qname, engine::learned_attribute())?;
        crate::strtab::encode_table_string(
            &mut self.buf,
            qname.uri_id,
            qname.ln_id,
            value,
            &mut self.state.strtab,
            self.sink.as_mut(),
        )?;
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    pub fn attribute_int(&mut self, qname: QNameId, value: i64, bit_width: Option<u8>) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::AttributeQName, Some(qname))?;
        self.learn_if_wildcard(&prod, qname, engine::learned_attribute())?;
        self.write_int(value, bit_width)?;
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    /// `CH` over string content: the common case for schema-less/mixed
    /// content and for any simple type whose grammar carries `ValueType::String`.
    pub fn char_data_string(&mut self, value: &str) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::Characters, None)?;
        let qname = self.owning_qname()?;
        crate::strtab::encode_table_string(
            &mut self.buf,
            qname.uri_id,
            qname.ln_id,
            value,
            &mut self.state.strtab,
            self.sink.as_mut(),
        )?;
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    /// `CH` over an integer value, taking the `n`-bit width a schema-
    /// informed simple type fixes (§8 scenario 5), or the arbitrary-
    /// precision signed codec when `bit_width` is `None`. The bit width is
    /// a caller-supplied hint (e.g. looked up from the schema's
    /// `BuiltinAtomic::fixed_bit_width()` for the element/attribute in
    /// play) rather than something threaded automatically through
    /// `Production`, which only carries the coarse `ValueType`.
    pub fn char_data_int(&mut self, value: i64, bit_width: Option<u8>) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::Characters, None)?;
        self.write_int(value, bit_width)?;
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    pub fn char_data_boolean(&mut self, value: bool) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::Characters, None)?;
        codec::encode_bool(&mut self.buf, value, self.sink.as_mut())?;
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    pub fn char_data_float(&mut self, value: ExiFloat) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::Characters, None)?;
        codec::encode_float(&mut self.buf, value, self.sink.as_mut())?;
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    pub fn char_data_decimal(&mut self, value: Decimal) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::Characters, None)?;
        codec::encode_decimal(&mut self.buf, value, self.sink.as_mut())?;
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    pub fn char_data_binary(&mut self, value: &[u8]) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::Characters, None)?;
        codec::encode_binary(&mut self.buf, value, self.sink.as_mut())?;
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    pub fn char_data_date_time(&mut self, value: &DateTime) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::Characters, None)?;
        codec::encode_datetime(&mut self.buf, value, self.sink.as_mut())?;
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    pub fn self_contained(&mut self) -> Result<()> {
        let (_, prod) = self.emit_code(EventType::SelfContained, None)?;
        engine::advance(&mut self.state.stack, prod.next_rule)
    }

    fn write_int(&mut self, value: i64, bit_width: Option<u8>) -> Result<()> {
        match bit_width {
            Some(n) if value >= 0 => codec::encode_n_bit_uint(&mut self.buf, n, value as u32, self.sink.as_mut()),
            Some(_) => Err(ErrorCode::InvalidOperation),
            None => codec::encode_sint(&mut self.buf, value, self.sink.as_mut()),
        }
    }

    fn owning_qname(&self) -> Result<QNameId> {
        self.state
            .stack
            .top()
            .and_then(|f| f.qname)
            .ok_or(ErrorCode::InconsistentProcState)
    }

    /// `close_stream`: flushes the final partially-filled byte and returns
    /// the total number of bytes written in this flush.
    pub fn close_stream(mut self) -> Result<usize> {
        self.buf.close_writer(self.sink.as_mut())
    }
}

/// Walks an EXI body, driving `handler` with one callback per decoded event.
pub struct Decoder<H: ContentHandler> {
    buf: BitBuffer,
    source: Box<dyn Source>,
    state: ExiStreamState,
    handler: H,
    /// Presence mask threaded into the next `decode_datetime` call (§4.B):
    /// unlike every other EXI value type, a dateTime's field layout isn't
    /// self-describing on the wire — it's implied by the XSD type the
    /// schema declares for the current element/attribute, the same role
    /// `attribute_int`/`char_data_int`'s `bit_width` hint plays for
    /// fixed-width integers. Defaults to the full `xs:dateTime` mask
    /// (year + monthDay + time) since that's the richest built-in variant;
    /// a schema-aware caller should call `set_date_time_mask` with the
    /// narrower mask for `xs:date`/`xs:time` before decoding such a value.
    date_time_mask: u16,
}

impl<H: ContentHandler> Decoder<H> {
    /// `init_stream`: peeks the optional cookie and header from `bytes`,
    /// then builds a `BitBuffer` positioned right after the header over the
    /// remaining in-memory image (schema-less or schema-informed per
    /// `pool`).
    pub fn init_stream(bytes: &[u8], options: Options, pool: GrammarPool, handler: H) -> Result<Self> {
        let (_header, consumed) = header::decode_header_bytes(bytes)?;
        let state = ExiStreamState::new(options, pool)?;
        Ok(Self {
            buf: BitBuffer::from_bytes(&bytes[consumed..]),
            source: Box::new(crate::bitstream::MemorySource::new(&[])),
            state,
            handler,
            date_time_mask: codec::presence::YEAR | codec::presence::MONTH_DAY | codec::presence::TIME,
        })
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Sets the presence mask the next dateTime value decodes with. Call
    /// this before stepping into a `Characters`/`AT` event whose schema
    /// type is `xs:date`/`xs:time` or any other dateTime variant that
    /// doesn't carry every field.
    pub fn set_date_time_mask(&mut self, mask: u16) {
        self.date_time_mask = mask;
    }

    fn current_rule(&self) -> GrammarRule {
        let top = self.state.stack.top().expect("stream has an open frame");
        top.grammar.borrow().rules[top.current_rule].clone()
    }

    /// Decodes one event and drives the matching handler callback(s).
    /// Returns `Ok(false)` once the stack empties (the `ED` that closes the
    /// document/fragment has fired) or a callback asked to stop.
    pub fn step(&mut self) -> Result<bool> {
        if self.state.stack.is_empty() {
            return Ok(false);
        }
        let rule = self.current_rule();
        let pos = engine::read_code(&rule, &mut self.buf, self.source.as_mut())?;
        let prod = engine::production_at(&rule, pos).clone();

        match prod.event.event_type {
            EventType::StartDocument => {
                let flow = self.handler.start_document()?;
                engine::advance(&mut self.state.stack, prod.next_rule)?;
                Ok(flow == Flow::Continue)
            }
            EventType::EndDocument => {
                let flow = self.handler.end_document()?;
                engine::advance(&mut self.state.stack, prod.next_rule)?;
                Ok(flow == Flow::Continue)
            }
            EventType::EndElement => {
                let flow = self.handler.end_element()?;
                engine::advance(&mut self.state.stack, prod.next_rule)?;
                Ok(flow == Flow::Continue)
            }
            EventType::SelfContained => {
                let flow = self.handler.self_contained()?;
                engine::advance(&mut self.state.stack, prod.next_rule)?;
                Ok(flow == Flow::Continue)
            }
            EventType::StartElementQName | EventType::StartElementUri | EventType::StartElementAll => {
                let qname = self.resolve_or_learn_qname(&prod, engine::learned_start_element())?;
                let flow = self.handler.start_element(qname)?;
                engine::push_element(
                    &mut self.state.stack,
                    &mut self.state.pool,
                    prod.next_rule,
                    qname,
                    self.state.options.preserve,
                    self.state.options.self_contained,
                )?;
                Ok(flow == Flow::Continue)
            }
            EventType::AttributeQName | EventType::AttributeUri | EventType::AttributeAll => {
                let qname = self.resolve_or_learn_qname(&prod, engine::learned_attribute())?;
                let attr_flow = self.handler.attribute(qname)?;
                let value_flow = self.decode_value(prod.event.value_type, Some(qname))?;
                engine::advance(&mut self.state.stack, prod.next_rule)?;
                Ok(attr_flow == Flow::Continue && value_flow == Flow::Continue)
            }
            EventType::Characters => {
                let flow = self.decode_value(prod.event.value_type, None)?;
                engine::advance(&mut self.state.stack, prod.next_rule)?;
                Ok(flow == Flow::Continue)
            }
            EventType::Void => Err(ErrorCode::InconsistentProcState),
            // Comment/PI/DocType/EntityReference/NamespaceDeclaration: no
            // built-in or schema-informed grammar in this build emits these
            // (default-fidelity only, §4.D), so reaching here means the
            // stream disagreed with its own grammar.
            _ => Err(ErrorCode::InvalidExiInput),
        }
    }

    /// Runs [`Self::step`] to completion, returning the handler once the
    /// document/fragment is fully decoded or a callback requests `Stop`.
    pub fn run_to_completion(mut self) -> Result<H> {
        while self.step()? {}
        Ok(self.handler)
    }

    fn resolve_or_learn_qname(&mut self, prod: &Production, learned_event: ExiEvent) -> Result<QNameId> {
        match prod.target {
            Some(qname) if !qname.is_wildcard() => Ok(qname),
            _ => {
                let qname = crate::strtab::decode_qname(&mut self.buf, &mut self.state.strtab, self.source.as_mut())?;
                engine::learn(&self.state.stack, qname, learned_event, prod.next_rule)?;
                Ok(qname)
            }
        }
    }

    fn decode_value(&mut self, value_type: ValueType, attribute_qname: Option<QNameId>) -> Result<Flow> {
        let owning_qname = match attribute_qname {
            Some(q) => q,
            None => self
                .state
                .stack
                .top()
                .and_then(|f| f.qname)
                .ok_or(ErrorCode::InconsistentProcState)?,
        };
        match value_type {
            ValueType::String => {
                let s = crate::strtab::decode_table_string(
                    &mut self.buf,
                    owning_qname.uri_id,
                    owning_qname.ln_id,
                    &mut self.state.strtab,
                    self.source.as_mut(),
                )?;
                self.handler.string_data(&s)
            }
            ValueType::Integer => {
                let v = codec::decode_sint(&mut self.buf, self.source.as_mut())?;
                self.handler.int_data(v)
            }
            ValueType::Boolean => {
                let v = codec::decode_bool(&mut self.buf, self.source.as_mut())?;
                self.handler.boolean_data(v)
            }
            ValueType::Float => {
                let v = codec::decode_float(&mut self.buf, self.source.as_mut())?;
                self.handler.float_data(v)
            }
            ValueType::Decimal => {
                let v = codec::decode_decimal(&mut self.buf, self.source.as_mut())?;
                self.handler.decimal_data(v)
            }
            ValueType::Binary => {
                let v = codec::decode_binary(&mut self.buf, self.source.as_mut())?;
                self.handler.binary_data(&v)
            }
            ValueType::DateTime => {
                let v = codec::decode_datetime(&mut self.buf, self.date_time_mask, self.source.as_mut())?;
                self.handler.date_time_data(&v)
            }
            ValueType::None => Ok(Flow::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Recorded, RecordingHandler};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct SharedSink(Rc<RefCell<Vec<u8>>>);

    impl Sink for SharedSink {
        fn drain(&mut self, buf: &[u8]) -> Result<()> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(())
        }
    }

    /// Builds an `Encoder` over a sink we retain a handle to, runs `events`
    /// against it, closes the stream, and returns the written bytes — the
    /// shape every round-trip test below shares.
    fn encode_to_bytes(events: impl FnOnce(&mut Encoder)) -> Vec<u8> {
        let captured = Rc::new(RefCell::new(Vec::new()));
        let sink = Box::new(SharedSink(captured.clone()));
        let mut encoder = Encoder::init_stream(Options::default(), GrammarPool::new(), sink, false).unwrap();
        events(&mut encoder);
        encoder.close_stream().unwrap();
        captured.borrow().clone()
    }

    fn qname(tables: &mut StringTables, uri: &str, local: &str) -> QNameId {
        let uri_id = tables.add_uri(uri);
        let ln_id = tables.add_ln(uri_id, local).unwrap();
        QNameId::new(uri_id, ln_id)
    }

    #[test]
    fn schema_less_minimal_document_round_trips() {
        let bytes = encode_to_bytes(|enc| {
            let root = qname(enc.strtab_mut(), "", "root");
            enc.start_document().unwrap();
            enc.start_element(root).unwrap();
            enc.end_element().unwrap();
            enc.end_document().unwrap();
        });

        let decoder = Decoder::init_stream(
            &bytes,
            Options::default(),
            GrammarPool::new(),
            RecordingHandler::default(),
        )
        .unwrap();
        let handler = decoder.run_to_completion().unwrap();
        assert_eq!(
            handler.events,
            vec![
                Recorded::StartDocument,
                Recorded::StartElement(QNameId::new(4, 0)),
                Recorded::EndElement,
                Recorded::EndDocument,
            ]
        );
    }

    #[test]
    fn attribute_and_character_values_decode_back_in_order() {
        let bytes = encode_to_bytes(|enc| {
            let a = qname(enc.strtab_mut(), "", "a");
            let x = qname(enc.strtab_mut(), "", "x");
            enc.start_document().unwrap();
            enc.start_element(a).unwrap();
            enc.attribute_string(x, "v").unwrap();
            enc.char_data_string("hi").unwrap();
            enc.end_element().unwrap();
            enc.end_document().unwrap();
        });

        let decoder = Decoder::init_stream(
            &bytes,
            Options::default(),
            GrammarPool::new(),
            RecordingHandler::default(),
        )
        .unwrap();
        let handler = decoder.run_to_completion().unwrap();
        assert_eq!(
            handler.events,
            vec![
                Recorded::StartDocument,
                Recorded::StartElement(QNameId::new(4, 0)),
                Recorded::Attribute(QNameId::new(4, 1)),
                Recorded::StringData("v".to_string()),
                Recorded::StringData("hi".to_string()),
                Recorded::EndElement,
                Recorded::EndDocument,
            ]
        );
    }

    #[test]
    fn repeated_character_value_round_trips_via_local_table_hit() {
        let bytes = encode_to_bytes(|enc| {
            let r = qname(enc.strtab_mut(), "", "r");
            enc.start_document().unwrap();
            enc.start_element(r).unwrap();
            enc.char_data_string("alpha").unwrap();
            enc.end_element().unwrap();
            enc.start_element(r).unwrap();
            enc.char_data_string("alpha").unwrap();
            enc.end_element().unwrap();
            enc.end_document().unwrap();
        });

        let decoder = Decoder::init_stream(
            &bytes,
            Options::default(),
            GrammarPool::new(),
            RecordingHandler::default(),
        )
        .unwrap();
        let handler = decoder.run_to_completion().unwrap();
        let chars: Vec<&str> = handler
            .events
            .iter()
            .filter_map(|e| match e {
                Recorded::StringData(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(chars, vec!["alpha", "alpha"]);
    }

    #[test]
    fn repeated_sibling_element_name_is_learned_and_reused() {
        // <r><foo/><foo/></r>: the second <foo> fires the production that
        // SE(*)->SE(foo) learning installed on r's ElementContent rule
        // rather than falling back to the wildcard again.
        let bytes = encode_to_bytes(|enc| {
            let r = qname(enc.strtab_mut(), "", "r");
            let foo = qname(enc.strtab_mut(), "", "foo");
            enc.start_document().unwrap();
            enc.start_element(r).unwrap();
            enc.start_element(foo).unwrap();
            enc.end_element().unwrap();
            enc.start_element(foo).unwrap();
            enc.end_element().unwrap();
            enc.end_element().unwrap();
            enc.end_document().unwrap();
        });

        let decoder = Decoder::init_stream(
            &bytes,
            Options::default(),
            GrammarPool::new(),
            RecordingHandler::default(),
        )
        .unwrap();
        let handler = decoder.run_to_completion().unwrap();
        let starts: Vec<QNameId> = handler
            .events
            .iter()
            .filter_map(|e| match e {
                Recorded::StartElement(q) => Some(*q),
                _ => None,
            })
            .collect();
        assert_eq!(starts.len(), 3);
        assert_eq!(starts[1], starts[2], "both <foo> occurrences resolve to the same qname");
    }

    #[test]
    fn integer_attribute_with_fixed_width_round_trips() {
        let bytes = encode_to_bytes(|enc| {
            let a = qname(enc.strtab_mut(), "", "a");
            let n = qname(enc.strtab_mut(), "", "n");
            enc.start_document().unwrap();
            enc.start_element(a).unwrap();
            enc.attribute_int(n, 200, Some(8)).unwrap();
            enc.end_element().unwrap();
            enc.end_document().unwrap();
        });

        let mut decoder = Decoder::init_stream(
            &bytes,
            Options::default(),
            GrammarPool::new(),
            RecordingHandler::default(),
        )
        .unwrap();
        // Drive manually up through the attribute's event code + qname so we
        // can decode its value with the same fixed width the encoder used
        // (the facade takes the width as an explicit per-call hint; a real
        // caller would look it up from the schema for this qname).
        assert!(decoder.step().unwrap()); // SD
        assert!(decoder.step().unwrap()); // SE a

        let rule = decoder.current_rule();
        let pos = engine::read_code(&rule, &mut decoder.buf, decoder.source.as_mut()).unwrap();
        let prod = engine::production_at(&rule, pos).clone();
        let qname = decoder.resolve_or_learn_qname(&prod, engine::learned_attribute()).unwrap();
        decoder.handler.attribute(qname).unwrap();
        let value = codec::decode_n_bit_uint(&mut decoder.buf, 8, decoder.source.as_mut()).unwrap();
        assert_eq!(value, 200);
        assert_eq!(format!("{value:08b}"), "11001000");
        engine::advance(&mut decoder.state.stack, prod.next_rule).unwrap();
    }

    #[test]
    fn fragment_stream_round_trips_multiple_top_level_elements() {
        // A fragment has no single document root, so SD is immediately
        // followed by as many top-level SE/EE pairs as the caller emits.
        let options = Options { fragment: true, ..Options::default() };
        let captured = Rc::new(RefCell::new(Vec::new()));
        let sink = Box::new(SharedSink(captured.clone()));
        let mut encoder = Encoder::init_stream(options.clone(), GrammarPool::new(), sink, false).unwrap();
        let a = qname(encoder.strtab_mut(), "", "a");
        let b = qname(encoder.strtab_mut(), "", "b");
        encoder.start_document().unwrap();
        encoder.start_element(a).unwrap();
        encoder.end_element().unwrap();
        encoder.start_element(b).unwrap();
        encoder.end_element().unwrap();
        encoder.end_document().unwrap();
        encoder.close_stream().unwrap();
        let bytes = captured.borrow().clone();

        let decoder = Decoder::init_stream(&bytes, options, GrammarPool::new(), RecordingHandler::default()).unwrap();
        let handler = decoder.run_to_completion().unwrap();
        assert_eq!(
            handler.events,
            vec![
                Recorded::StartDocument,
                Recorded::StartElement(QNameId::new(4, 0)),
                Recorded::EndElement,
                Recorded::StartElement(QNameId::new(4, 1)),
                Recorded::EndElement,
                Recorded::EndDocument,
            ]
        );
    }

    #[test]
    fn date_time_value_decodes_using_the_caller_supplied_presence_mask() {
        // The built-in (schema-less) CH production is always typed as a
        // string, so a DateTime CH value only ever arises under a
        // schema-informed grammar; exercise `decode_value`'s DateTime branch
        // directly instead, the same way the fixed-width int test above
        // drives the decoder past what the built-in grammar alone produces.
        let mask = codec::presence::YEAR | codec::presence::MONTH_DAY | codec::presence::TIME;
        let value = DateTime {
            presence_mask: mask,
            year: 26,
            month: 7,
            day: 27,
            hour: 9,
            minute: 15,
            second: 0,
            fractional_seconds: 0,
            timezone_minutes: 0,
        };
        let captured = Rc::new(RefCell::new(Vec::new()));
        let mut sink = SharedSink(captured.clone());
        let mut w = BitBuffer::for_writing();
        codec::encode_datetime(&mut w, &value, &mut sink).unwrap();
        w.close_writer(&mut sink).unwrap();
        let value_bytes = captured.borrow().clone();

        let header_bytes = encode_to_bytes(|enc| {
            enc.start_document().unwrap();
            enc.end_document().unwrap();
        });
        let mut decoder = Decoder::init_stream(
            &header_bytes,
            Options::default(),
            GrammarPool::new(),
            RecordingHandler::default(),
        )
        .unwrap();
        decoder.buf = BitBuffer::from_bytes(&value_bytes);
        decoder.source = Box::new(crate::bitstream::MemorySource::new(&[]));
        decoder.set_date_time_mask(mask);

        let dummy_qname = QNameId::new(0, 0);
        decoder.decode_value(ValueType::DateTime, Some(dummy_qname)).unwrap();
        assert_eq!(decoder.handler().events, vec![Recorded::DateTimeData(value)]);
    }
}
