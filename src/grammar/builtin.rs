//! Built-in document, fragment, and element grammars (spec component D/E),
//! default-fidelity productions only — see the "Preserve-option fidelity
//! scope" decision in `SPEC_FULL.md`.
//!
//! Structurally ported from `original_source/trunk/grammar/src/grammars.c`'s
//! `getBuildInDocGrammar`/`createBuildInElementGrammar`, taking the
//! `is_default_fidelity == 1` branch of each (the only branch the original
//! authors themselves call complete — the non-default branch carries a
//! `TODO: depends on the EXI fidelity options!`). The built-in fragment
//! grammar isn't present in the filtered C source pack; its shape here
//! follows the same default-fidelity pruning pattern applied to the
//! `GR_FRAGMENT`/`GR_FRAGMENT_CONTENT` non-terminals declared in
//! `procTypes.h`.

use crate::event::{EventCode, EventType, ExiEvent, ValueType};
use crate::grammar::rule::{GrammarRule, Production, VOID_NON_TERMINAL};
use crate::options::Preserve;

/// Non-terminal indices within a [`super::stack::Grammar`]'s `rules` vec.
/// Named after `procTypes.h`'s `GR_*` constants, renumbered from 0 since
/// each grammar owns a private rule vec rather than sharing one global
/// array indexed by `GR_DOCUMENT`/`GR_DOC_CONTENT`/etc.
pub mod nonterminal {
    pub const DOCUMENT: usize = 0;
    pub const DOC_CONTENT: usize = 1;
    pub const DOC_END: usize = 2;

    pub const FRAGMENT: usize = 0;
    pub const FRAGMENT_CONTENT: usize = 1;

    pub const START_TAG_CONTENT: usize = 0;
    pub const ELEMENT_CONTENT: usize = 1;
}

fn se_all(next: usize) -> Production {
    Production::new(EventCode::l1(0), ExiEvent::untyped(EventType::StartElementAll), next)
}

/// Builds the built-in document grammar (`Document`/`DocContent`/`DocEnd`),
/// default fidelity only.
pub fn document_grammar(preserve: Preserve) -> crate::error::Result<Vec<GrammarRule>> {
    if !preserve.is_default_fidelity() {
        return Err(crate::error::ErrorCode::NotImplemented);
    }

    // Document : SD DocContent  0
    let mut document = GrammarRule::new();
    document.part0.push(Production::new(
        EventCode::l1(0),
        ExiEvent::untyped(EventType::StartDocument),
        nonterminal::DOC_CONTENT,
    ));

    // DocContent : SE (*) DocEnd  0
    let mut doc_content = GrammarRule::new();
    doc_content.part0.push(se_all(nonterminal::DOC_END));

    // DocEnd : ED  0
    let mut doc_end = GrammarRule::new();
    doc_end.part0.push(Production::new(
        EventCode::l1(0),
        ExiEvent::untyped(EventType::EndDocument),
        VOID_NON_TERMINAL,
    ));

    Ok(vec![document, doc_content, doc_end])
}

/// Builds the built-in fragment grammar (`Fragment`/`FragmentContent`),
/// default fidelity only (§4.D, supplemented — see `SPEC_FULL.md`).
pub fn fragment_grammar(preserve: Preserve) -> crate::error::Result<Vec<GrammarRule>> {
    if !preserve.is_default_fidelity() {
        return Err(crate::error::ErrorCode::NotImplemented);
    }

    // Fragment : SD FragmentContent  0
    let mut fragment = GrammarRule::new();
    fragment.part0.push(Production::new(
        EventCode::l1(0),
        ExiEvent::untyped(EventType::StartDocument),
        nonterminal::FRAGMENT_CONTENT,
    ));

    // FragmentContent : SE (*) FragmentContent  0
    //                   ED                      1
    let mut fragment_content = GrammarRule::new();
    fragment_content.part0.push(se_all(nonterminal::FRAGMENT_CONTENT));
    fragment_content.part0.push(Production::new(
        EventCode::l1(1),
        ExiEvent::untyped(EventType::EndDocument),
        VOID_NON_TERMINAL,
    ));

    Ok(vec![fragment, fragment_content])
}

/// Builds a fresh built-in element grammar (`StartTagContent`/
/// `ElementContent`), default fidelity only. One of these is instantiated
/// per distinct (uri, localName) the first time it's encountered (§4.E),
/// then cached in the [`super::stack::GrammarPool`].
pub fn element_grammar(preserve: Preserve, self_contained: bool) -> crate::error::Result<Vec<GrammarRule>> {
    if !preserve.is_default_fidelity() || self_contained {
        return Err(crate::error::ErrorCode::NotImplemented);
    }

    // StartTagContent : EE                      0.0
    //                   AT (*) StartTagContent   0.1
    //                   SE (*) ElementContent    0.2
    //                   CH ElementContent        0.3
    // All four productions carry a 2-part code, so they all live in part 1;
    // part 0 is empty (its 0-bit width is the unconditional "escape to part
    // 1" every read of this rule takes) until AT/SE wildcard learning adds a
    // qname-specific production there (§4.E).
    let mut start_tag_content = GrammarRule::new();
    start_tag_content.part1.push(Production::new(
        EventCode::l2(0, 0),
        ExiEvent::untyped(EventType::EndElement),
        VOID_NON_TERMINAL,
    ));
    start_tag_content.part1.push(Production::new(
        EventCode::l2(0, 1),
        ExiEvent::untyped(EventType::AttributeAll),
        nonterminal::START_TAG_CONTENT,
    ));
    start_tag_content.part1.push(Production::new(
        EventCode::l2(0, 2),
        ExiEvent::untyped(EventType::StartElementAll),
        nonterminal::ELEMENT_CONTENT,
    ));
    start_tag_content.part1.push(Production::new(
        EventCode::l2(0, 3),
        ExiEvent::new(EventType::Characters, ValueType::String),
        nonterminal::ELEMENT_CONTENT,
    ));

    // ElementContent : EE                      0
    //                  SE (*) ElementContent    1.0
    //                  CH ElementContent        1.1
    let mut element_content = GrammarRule::new();
    element_content.part0.push(Production::new(
        EventCode::l1(0),
        ExiEvent::untyped(EventType::EndElement),
        VOID_NON_TERMINAL,
    ));
    element_content.part1.push(Production::new(
        EventCode::l2(1, 0),
        ExiEvent::untyped(EventType::StartElementAll),
        nonterminal::ELEMENT_CONTENT,
    ));
    element_content.part1.push(Production::new(
        EventCode::l2(1, 1),
        ExiEvent::new(EventType::Characters, ValueType::String),
        nonterminal::ELEMENT_CONTENT,
    ));

    Ok(vec![start_tag_content, element_content])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_grammar_has_three_rules_with_expected_codes() {
        let rules = document_grammar(Preserve::NONE).unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[nonterminal::DOCUMENT].part0[0].event.event_type, EventType::StartDocument);
        assert_eq!(rules[nonterminal::DOC_CONTENT].part0[0].event.event_type, EventType::StartElementAll);
        assert_eq!(rules[nonterminal::DOC_END].part0[0].event.event_type, EventType::EndDocument);
    }

    #[test]
    fn element_grammar_start_tag_content_has_four_part1_productions() {
        let rules = element_grammar(Preserve::NONE, false).unwrap();
        assert!(rules[nonterminal::START_TAG_CONTENT].part0.is_empty());
        assert_eq!(rules[nonterminal::START_TAG_CONTENT].part1.len(), 4);
        assert_eq!(rules[nonterminal::START_TAG_CONTENT].part0_bits(), 0);
        assert_eq!(rules[nonterminal::START_TAG_CONTENT].part1_bits(), 2);
        assert_eq!(rules[nonterminal::ELEMENT_CONTENT].part0.len(), 1);
        assert_eq!(rules[nonterminal::ELEMENT_CONTENT].part1.len(), 2);
        assert_eq!(rules[nonterminal::ELEMENT_CONTENT].part0_bits(), 1);
        assert_eq!(rules[nonterminal::ELEMENT_CONTENT].part1_bits(), 1);
    }

    #[test]
    fn fragment_grammar_has_sd_only_on_fragment_and_se_ed_on_content() {
        let rules = fragment_grammar(Preserve::NONE).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[nonterminal::FRAGMENT].part0.len(), 1);
        assert_eq!(rules[nonterminal::FRAGMENT].part0[0].event.event_type, EventType::StartDocument);
        assert_eq!(rules[nonterminal::FRAGMENT].part0[0].next_rule, nonterminal::FRAGMENT_CONTENT);

        assert_eq!(rules[nonterminal::FRAGMENT_CONTENT].part0.len(), 2);
        assert_eq!(rules[nonterminal::FRAGMENT_CONTENT].part0[0].event.event_type, EventType::StartElementAll);
        assert_eq!(rules[nonterminal::FRAGMENT_CONTENT].part0[1].event.event_type, EventType::EndDocument);
    }

    #[test]
    fn non_default_fidelity_is_not_implemented() {
        assert_eq!(
            document_grammar(Preserve::COMMENTS).unwrap_err(),
            crate::error::ErrorCode::NotImplemented
        );
        assert_eq!(
            element_grammar(Preserve::NONE, true).unwrap_err(),
            crate::error::ErrorCode::NotImplemented
        );
    }
}
