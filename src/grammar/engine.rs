//! The grammar engine (spec component E): symmetric encode/decode event-code
//! stepping, non-terminal transitions, and wildcard learning.
//!
//! Grounded on spec.md §4.D/§4.E's decode-step algorithm and on
//! `grammars.c`'s production-insertion order (`insertZeroProduction` called
//! from the `EVENT_AT_ALL` handler in `processNextProduction`).

use crate::bitstream::{BitBuffer, Sink, Source};
use crate::error::{ErrorCode, Result};
use crate::event::{EventType, ExiEvent, ValueType};
use crate::grammar::rule::{GrammarRule, Production, VOID_NON_TERMINAL};
use crate::grammar::stack::{Grammar, GrammarPool, GrammarStack};
use crate::options::Preserve;
use crate::qname::QNameId;

/// Which of a rule's three parts a production was found in, plus its index
/// within that part — everything the bit-level codec needs to read/write
/// the matching event code (§4.D "bits[0]... bits[1]... bits[2]").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePosition {
    pub level: u8,
    pub index: usize,
}

/// Reads an event code against `rule`, per §4.D step 2: read `bits[0]` bits;
/// if the value indexes a part-0 production, stop there; otherwise escalate
/// to part 1, then part 2.
pub fn read_code(rule: &GrammarRule, buf: &mut BitBuffer, source: &mut dyn Source) -> Result<CodePosition> {
    let v0 = read_width(rule.part0_bits(), buf, source)?;
    if (v0 as usize) < rule.part0.len() {
        return Ok(CodePosition { level: 0, index: v0 as usize });
    }
    if rule.part1.is_empty() {
        return Err(ErrorCode::EventCodeMissing);
    }
    let v1 = read_width(rule.part1_bits(), buf, source)?;
    if (v1 as usize) < rule.part1.len() {
        return Ok(CodePosition { level: 1, index: v1 as usize });
    }
    if rule.part2.is_empty() {
        return Err(ErrorCode::EventCodeMissing);
    }
    let v2 = read_width(rule.part2_bits(), buf, source)?;
    if (v2 as usize) < rule.part2.len() {
        return Ok(CodePosition { level: 2, index: v2 as usize });
    }
    Err(ErrorCode::EventCodeMissing)
}

/// Writes the event code matching `pos` against `rule`, i.e. the inverse of
/// [`read_code`]: an escape value at each level skipped, then the real index
/// at the matched level.
pub fn write_code(
    rule: &GrammarRule,
    pos: CodePosition,
    buf: &mut BitBuffer,
    sink: &mut dyn Sink,
) -> Result<()> {
    match pos.level {
        0 => write_width(rule.part0_bits(), pos.index as u32, buf, sink),
        1 => {
            write_width(rule.part0_bits(), rule.part0.len() as u32, buf, sink)?;
            write_width(rule.part1_bits(), pos.index as u32, buf, sink)
        }
        2 => {
            write_width(rule.part0_bits(), rule.part0.len() as u32, buf, sink)?;
            write_width(rule.part1_bits(), rule.part1.len() as u32, buf, sink)?;
            write_width(rule.part2_bits(), pos.index as u32, buf, sink)
        }
        _ => Err(ErrorCode::Unexpected),
    }
}

fn read_width(width: u8, buf: &mut BitBuffer, source: &mut dyn Source) -> Result<u32> {
    if width == 0 {
        Ok(0)
    } else {
        buf.read_bits(width, source)
    }
}

fn write_width(width: u8, value: u32, buf: &mut BitBuffer, sink: &mut dyn Sink) -> Result<()> {
    if width == 0 {
        Ok(())
    } else {
        buf.write_bits(width, value, sink)
    }
}

pub fn production_at(rule: &GrammarRule, pos: CodePosition) -> &Production {
    match pos.level {
        0 => &rule.part0[pos.index],
        1 => &rule.part1[pos.index],
        2 => &rule.part2[pos.index],
        _ => unreachable!("CodePosition::level is always 0..=2"),
    }
}

/// Encode-side production search: exact qname match first, then
/// uri-restricted wildcard, then full wildcard — per §4.E's stated
/// hierarchy ("exact SE(qname) > SE(uri:*) > SE(*); same hierarchy for AT").
pub fn find_production_for_encode(
    rule: &GrammarRule,
    event_type: EventType,
    target: Option<QNameId>,
) -> Option<CodePosition> {
    let parts: [(&[Production], u8); 3] = [(&rule.part0, 0), (&rule.part1, 1), (&rule.part2, 2)];

    let mut best: Option<(u8, CodePosition)> = None;
    for (productions, level) in parts {
        for (index, p) in productions.iter().enumerate() {
            if p.event.event_type != event_type && !matches_wildcard_family(p.event.event_type, event_type) {
                continue;
            }
            let specificity = match (p.target, target) {
                (Some(t), Some(q)) if t == q => 3,
                (Some(t), Some(q)) if t.uri_id == q.uri_id && t.is_wildcard() => 2,
                (None, _) => 0,
                _ => continue,
            };
            if best.map(|(s, _)| specificity > s).unwrap_or(true) {
                best = Some((specificity, CodePosition { level, index }));
            }
        }
    }
    best.map(|(_, pos)| pos)
}

fn matches_wildcard_family(production_event: EventType, requested: EventType) -> bool {
    use EventType::*;
    matches!(
        (production_event, requested),
        (StartElementAll, StartElementQName | StartElementUri | StartElementAll)
            | (AttributeAll, AttributeQName | AttributeUri | AttributeAll)
    )
}

/// Applies a matched production's effect on the grammar stack for the
/// ordinary (non-SE, non-learning) case: move the current frame to
/// `next_rule`, or pop if it's [`VOID_NON_TERMINAL`].
pub fn advance(stack: &mut GrammarStack, next_rule: usize) -> Result<()> {
    if next_rule == VOID_NON_TERMINAL {
        stack.pop().ok_or(ErrorCode::InconsistentProcState)?;
    } else if let Some(top) = stack.top_mut() {
        top.current_rule = next_rule;
    } else {
        return Err(ErrorCode::InconsistentProcState);
    }
    Ok(())
}

/// Pushes a freshly-resolved child element's grammar on `SE`, recording
/// `parent_resume_rule` so `EE` restores the parent correctly (§4.E grammar
/// stack discipline): a schema-informed grammar already installed in `pool`
/// under this qname wins, otherwise a fresh (or previously learned) built-in
/// element grammar is used. Both shapes start at rule index 0
/// ([`crate::grammar::stack::ELEMENT_START_RULE`]), by construction.
pub fn push_element(
    stack: &mut GrammarStack,
    pool: &mut GrammarPool,
    parent_resume_rule: usize,
    qname: QNameId,
    preserve: Preserve,
    self_contained: bool,
) -> Result<()> {
    let grammar = match pool.get(qname) {
        Some(g) => g,
        None => pool.get_or_insert_built_in(qname, preserve, self_contained)?,
    };
    stack.push_child(parent_resume_rule, grammar, crate::grammar::stack::ELEMENT_START_RULE, qname);
    Ok(())
}

/// Applies wildcard learning (§4.E): inserts `SE(qname)`/`AT(qname)` at the
/// front of part 0 of the *current* rule (the one the wildcard production
/// was matched in), renumbering existing part-0 codes.
pub fn learn(stack: &GrammarStack, qname: QNameId, learned_event: ExiEvent, next_rule: usize) -> Result<()> {
    let top = stack.top().ok_or(ErrorCode::InconsistentProcState)?;
    let mut grammar = top.grammar.borrow_mut();
    let rule = grammar
        .rules
        .get_mut(top.current_rule)
        .ok_or(ErrorCode::InconsistentProcState)?;
    rule.insert_zero_production(learned_event, qname, next_rule);
    Ok(())
}

pub fn learned_start_element() -> ExiEvent {
    ExiEvent::untyped(EventType::StartElementQName)
}

pub fn learned_attribute() -> ExiEvent {
    ExiEvent::new(EventType::AttributeQName, ValueType::String)
}

pub fn document_root(preserve: Preserve) -> Result<GrammarStack> {
    let mut stack = GrammarStack::new();
    let doc = Grammar::document(preserve)?;
    stack.push_root(doc, crate::grammar::builtin::nonterminal::DOCUMENT);
    Ok(stack)
}

pub fn fragment_root(preserve: Preserve) -> Result<GrammarStack> {
    let mut stack = GrammarStack::new();
    let frag = Grammar::fragment(preserve)?;
    stack.push_root(frag, crate::grammar::builtin::nonterminal::FRAGMENT);
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::{MemorySink, MemorySource};
    use crate::grammar::builtin::nonterminal;

    #[test]
    fn document_decode_walks_sd_se_ed() {
        let mut stack = document_root(Preserve::NONE).unwrap();
        let rule = stack.top().unwrap().grammar.borrow().rules[nonterminal::DOCUMENT].clone();
        // Only one production (SD), 0 bits, no encoding required to select it.
        assert_eq!(rule.part0_bits(), 0);
        let pos = CodePosition { level: 0, index: 0 };
        let prod = production_at(&rule, pos);
        assert_eq!(prod.event.event_type, EventType::StartDocument);
        advance(&mut stack, prod.next_rule).unwrap();
        assert_eq!(stack.top().unwrap().current_rule, nonterminal::DOC_CONTENT);
    }

    #[test]
    fn element_grammar_learns_attribute_then_has_qname_production() {
        let mut stack = GrammarStack::new();
        let element = crate::grammar::stack::Grammar::built_in_element(Preserve::NONE, false).unwrap();
        stack.push_root(element, nonterminal::START_TAG_CONTENT);

        let qname = QNameId::new(4, 0);
        learn(
            &stack,
            qname,
            learned_attribute(),
            nonterminal::START_TAG_CONTENT,
        )
        .unwrap();

        let rule = stack.top().unwrap().grammar.borrow().rules[nonterminal::START_TAG_CONTENT].clone();
        assert_eq!(rule.part0.len(), 1);
        assert_eq!(rule.part0[0].event.event_type, EventType::AttributeQName);
        assert_eq!(rule.part0[0].target, Some(qname));
        // part0_bits grew from 0 to 1 now that part0 is non-empty and part1
        // still exists (StartTagContent's original four productions).
        assert_eq!(rule.part0_bits(), 1);
    }

    #[test]
    fn find_production_prefers_exact_qname_over_wildcard() {
        let mut rule = GrammarRule::new();
        let qname = QNameId::new(4, 0);
        rule.insert_zero_production(
            ExiEvent::new(EventType::AttributeQName, ValueType::String),
            qname,
            0,
        );
        rule.part1.push(Production::new(
            crate::event::EventCode::l2(0, 1),
            ExiEvent::untyped(EventType::AttributeAll),
            0,
        ));

        let pos = find_production_for_encode(&rule, EventType::AttributeQName, Some(qname)).unwrap();
        assert_eq!(pos.level, 0);
    }

    #[test]
    fn roundtrip_code_through_bits_for_multi_part_rule() {
        let rules = crate::grammar::builtin::element_grammar(Preserve::NONE, false).unwrap();
        let rule = &rules[nonterminal::ELEMENT_CONTENT];
        // EE is the sole part-0 production.
        let pos = CodePosition { level: 0, index: 0 };
        let mut sink = MemorySink::default();
        let mut w = BitBuffer::for_writing();
        write_code(rule, pos, &mut w, &mut sink).unwrap();
        w.close_writer(&mut sink).unwrap();

        let mut source = MemorySource::new(&sink.0);
        let mut r = BitBuffer::for_reading();
        let decoded = read_code(rule, &mut r, &mut source).unwrap();
        assert_eq!(decoded, pos);
    }
}
