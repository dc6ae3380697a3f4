//! Grammar rules and productions (spec component D/E model).

use crate::event::{EventCode, ExiEvent};
use crate::qname::QNameId;

/// Sentinel right-hand-side non-terminal meaning "no further non-terminal",
/// i.e. the production's event ends that path through the grammar. Matches
/// `GR_VOID_NON_TERMINAL` in `original_source/trunk/include/procTypes.h`.
pub const VOID_NON_TERMINAL: usize = usize::MAX;

/// A single `LeftHandSide : event RightHandSide` line. `target` pins the
/// production to one qname for a schema-informed `SE(qname)`/`AT(qname)`
/// production; `None` marks an untyped wildcard (`SE(*)`, `AT(*)`, `CH`...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub code: EventCode,
    pub event: ExiEvent,
    pub target: Option<QNameId>,
    /// Index into the owning [`super::stack::GrammarRef`]'s rule list, or
    /// [`VOID_NON_TERMINAL`].
    pub next_rule: usize,
}

impl Production {
    pub const fn new(code: EventCode, event: ExiEvent, next_rule: usize) -> Self {
        Self {
            code,
            event,
            target: None,
            next_rule,
        }
    }

    pub const fn with_target(mut self, target: QNameId) -> Self {
        self.target = Some(target);
        self
    }
}

/// One non-terminal's productions, grouped into up to three "parts" the way
/// the EXI grammar format numbers event codes: part 0 holds the
/// most-specific productions (single-integer codes), part 1 and part 2 hold
/// progressively rarer ones, each nested one digit deeper. Matches
/// `GrammarRule`'s `prodArray`/`bits` fields in `procTypes.h`, except we keep
/// three explicit `Vec`s instead of one flat array plus a width table —
/// clearer to build incrementally and to run the wildcard-learning insert
/// against (only part 0 is ever mutated after construction).
#[derive(Debug, Clone, Default)]
pub struct GrammarRule {
    pub part0: Vec<Production>,
    pub part1: Vec<Production>,
    pub part2: Vec<Production>,
}

impl GrammarRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits needed to encode the part-0 slot: `ceil(log2(n))`
    /// where `n` is the number of part-0 productions, plus one extra slot
    /// reserved as the "escape to part 1" value when part 1 is non-empty.
    /// Matches the `bits[0]`/`bits[1]`/`bits[2]` fields EXIP's
    /// `GrammarRule` precomputes the same way.
    pub fn part0_bits(&self) -> u8 {
        bits_for(self.part0.len() + usize::from(!self.part1.is_empty()))
    }

    pub fn part1_bits(&self) -> u8 {
        bits_for(self.part1.len() + usize::from(!self.part2.is_empty()))
    }

    pub fn part2_bits(&self) -> u8 {
        bits_for(self.part2.len())
    }

    /// All productions across the three parts, in code order.
    pub fn productions(&self) -> impl Iterator<Item = &Production> {
        self.part0.iter().chain(self.part1.iter()).chain(self.part2.iter())
    }

    pub fn find_by_code(&self, code: &EventCode) -> Option<&Production> {
        self.productions().find(|p| &p.code == code)
    }

    /// Wildcard-triggered grammar learning (§4.E): inserts a new zero-coded
    /// production at the front of part 0, renumbering the codes of every
    /// production already there. Grounded on `grammars.c`'s
    /// `insertZeroProduction` call site for `AT(*)` -> `AT(qname)` learning.
    pub fn insert_zero_production(&mut self, event: ExiEvent, target: QNameId, next_rule: usize) {
        for p in &mut self.part0 {
            p.code = bump_part0_code(&p.code);
        }
        self.part0.insert(
            0,
            Production {
                code: EventCode::l1(0),
                event,
                target: Some(target),
                next_rule,
            },
        );
    }
}

fn bump_part0_code(code: &EventCode) -> EventCode {
    let parts = code.parts();
    match parts.len() {
        1 => EventCode::l1(parts[0] + 1),
        2 => EventCode::l2(parts[0] + 1, parts[1]),
        3 => EventCode::l3(parts[0] + 1, parts[1], parts[2]),
        _ => unreachable!("event codes are 1..=3 parts"),
    }
}

fn bits_for(count: usize) -> u8 {
    if count <= 1 {
        0
    } else {
        (usize::BITS - (count - 1).leading_zeros()) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventType, ValueType};
    use crate::qname::QNameId;

    #[test]
    fn insert_zero_production_renumbers_existing_part0() {
        let mut rule = GrammarRule::new();
        rule.part0.push(Production::new(
            EventCode::l1(0),
            ExiEvent::untyped(EventType::EndElement),
            VOID_NON_TERMINAL,
        ));
        rule.insert_zero_production(
            ExiEvent::new(EventType::AttributeQName, ValueType::String),
            QNameId::new(4, 0),
            0,
        );
        assert_eq!(rule.part0.len(), 2);
        assert_eq!(rule.part0[0].code, EventCode::l1(0));
        assert_eq!(rule.part0[0].event.event_type, EventType::AttributeQName);
        assert_eq!(rule.part0[1].code, EventCode::l1(1));
        assert_eq!(rule.part0[1].event.event_type, EventType::EndElement);
    }

    #[test]
    fn bits_for_part_matches_code_width() {
        let mut rule = GrammarRule::new();
        assert_eq!(rule.part0_bits(), 0);
        rule.part0.push(Production::new(
            EventCode::l1(0),
            ExiEvent::untyped(EventType::EndElement),
            VOID_NON_TERMINAL,
        ));
        assert_eq!(rule.part0_bits(), 0);
        rule.part0.push(Production::new(
            EventCode::l1(1),
            ExiEvent::untyped(EventType::Characters),
            VOID_NON_TERMINAL,
        ));
        assert_eq!(rule.part0_bits(), 1);
    }
}
