//! Grammar model and engine (spec components D/E): rules, productions,
//! built-in document/fragment/element grammars, the grammar stack/pool, and
//! the encode/decode event-code stepping logic.

pub mod builtin;
pub mod engine;
pub mod rule;
pub mod stack;

pub use engine::{document_root, fragment_root, CodePosition};
pub use rule::{GrammarRule, Production, VOID_NON_TERMINAL};
pub use stack::{Grammar, GrammarPool, GrammarRef, GrammarStack};
