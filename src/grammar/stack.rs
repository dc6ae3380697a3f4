//! Grammar stack and grammar pool (spec component E).
//!
//! Grounded on `original_source/trunk/include/procTypes.h`'s
//! `EXIGrammarStack` (a linked list of `EXIGrammar*` via `nextInStack`) and
//! `GrammarPool` (`hashtable` keyed by qname). We use `Rc<RefCell<Grammar>>`
//! in place of the C side's raw `EXIGrammar*`: every push of the same
//! element reuses the identical shared grammar object, so wildcard learning
//! (`insert_zero_production`) on one instance is visible the next time that
//! element is encountered anywhere in the document — the same sharing the C
//! pool gives by storing one pointer per distinct qname.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::grammar::builtin::{self, nonterminal};
use crate::grammar::rule::{GrammarRule, VOID_NON_TERMINAL};
use crate::options::Preserve;
use crate::qname::QNameId;

#[derive(Debug)]
pub struct Grammar {
    pub rules: Vec<GrammarRule>,
    /// The rule index where this element's attribute-use productions end and
    /// its content model begins (§4.F `assignCodes`'s `content_index`).
    /// `None` for built-in (non-schema-informed) grammars, which have no
    /// attribute/content split to record.
    pub content_index: Option<usize>,
}

pub type GrammarRef = Rc<RefCell<Grammar>>;

impl Grammar {
    pub fn document(preserve: Preserve) -> crate::error::Result<GrammarRef> {
        Ok(Rc::new(RefCell::new(Grammar {
            rules: builtin::document_grammar(preserve)?,
            content_index: None,
        })))
    }

    pub fn fragment(preserve: Preserve) -> crate::error::Result<GrammarRef> {
        Ok(Rc::new(RefCell::new(Grammar {
            rules: builtin::fragment_grammar(preserve)?,
            content_index: None,
        })))
    }

    pub fn built_in_element(preserve: Preserve, self_contained: bool) -> crate::error::Result<GrammarRef> {
        Ok(Rc::new(RefCell::new(Grammar {
            rules: builtin::element_grammar(preserve, self_contained)?,
            content_index: None,
        })))
    }

    /// Wraps a schema-built rule vec (§4.F) as a pool-installable grammar.
    pub fn schema_informed(rules: Vec<GrammarRule>, content_index: usize) -> GrammarRef {
        Rc::new(RefCell::new(Grammar {
            rules,
            content_index: Some(content_index),
        }))
    }
}

/// One active frame: which grammar this non-terminal belongs to, which rule
/// within it execution is currently sitting at, and — for element frames —
/// the element's own qname, needed to key the CH/AT value-table local
/// partition (§4.C "(uri,ln) pair"). `None` for the document/fragment root
/// frame, which owns no qname.
#[derive(Debug, Clone)]
pub struct Frame {
    pub grammar: GrammarRef,
    pub current_rule: usize,
    pub qname: Option<QNameId>,
}

/// LIFO of active grammar frames, root-to-leaf along the open-element path.
#[derive(Debug, Default)]
pub struct GrammarStack {
    frames: Vec<Frame>,
}

impl GrammarStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_root(&mut self, grammar: GrammarRef, start_rule: usize) {
        self.frames.push(Frame {
            grammar,
            current_rule: start_rule,
            qname: None,
        });
    }

    /// Pushes a child element's grammar after recording where the parent
    /// should resume once this child's `EE` pops it back off.
    pub fn push_child(
        &mut self,
        parent_resume_rule: usize,
        child: GrammarRef,
        child_start_rule: usize,
        qname: QNameId,
    ) {
        if let Some(top) = self.frames.last_mut() {
            top.current_rule = parent_resume_rule;
        }
        self.frames.push(Frame {
            grammar: child,
            current_rule: child_start_rule,
            qname: Some(qname),
        });
    }

    /// Pops the current frame (triggered by a production whose
    /// `next_rule == VOID_NON_TERMINAL`, i.e. `EE`/`ED`).
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Caches one grammar per distinct (uri, localName), so repeat occurrences
/// of the same element in a document share learned productions. Grounded on
/// `procTypes.h`'s `GrammarPool` + `grammars.c`'s
/// `checkElementGrammarInPool`/`addElementGrammarInPool`.
#[derive(Debug, Default)]
pub struct GrammarPool {
    by_qname: HashMap<QNameId, GrammarRef>,
}

impl GrammarPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, qname: QNameId) -> Option<GrammarRef> {
        self.by_qname.get(&qname).cloned()
    }

    /// Returns the pooled grammar for `qname`, creating and caching a fresh
    /// built-in element grammar if this is the first time it's seen.
    pub fn get_or_insert_built_in(
        &mut self,
        qname: QNameId,
        preserve: Preserve,
        self_contained: bool,
    ) -> crate::error::Result<GrammarRef> {
        if let Some(g) = self.by_qname.get(&qname) {
            return Ok(g.clone());
        }
        let g = Grammar::built_in_element(preserve, self_contained)?;
        self.by_qname.insert(qname, g.clone());
        Ok(g)
    }

    pub fn insert_schema_informed(&mut self, qname: QNameId, grammar: GrammarRef) {
        self.by_qname.insert(qname, grammar);
    }

    pub fn len(&self) -> usize {
        self.by_qname.len()
    }
}

/// Element `StartTagContent` rule index, exposed for the engine to push new
/// child frames at.
pub const ELEMENT_START_RULE: usize = nonterminal::START_TAG_CONTENT;
pub const VOID: usize = VOID_NON_TERMINAL;
