//! Schema-informed grammar builder (spec component F): a neutral tree-table
//! input IR, simple/complex type descriptors, and the proto-grammar
//! construction recipes that turn a parsed XSD into grammars installable in
//! a [`crate::grammar::GrammarPool`].

pub mod builder;
pub mod treetable;
pub mod types;

pub use builder::{build_schema, ProtoGrammar};
pub use treetable::{Particle, TreeTable, TreeTableEntry};
pub use types::{ComplexType, Facets, SimpleType};
