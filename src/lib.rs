//! An EXI (Efficient XML Interchange) binary XML codec: bit-level stream
//! coding, grammar-driven event coding with wildcard learning, string
//! tables, schema-informed grammar construction, and the stream header.
//!
//! The entry points are [`stream::Encoder`] and [`stream::Decoder`], driven
//! by (or driving) an implementor of [`handler::ContentHandler`].

pub mod bitstream;
pub mod codec;
pub mod error;
pub mod event;
pub mod grammar;
pub mod handler;
pub mod header;
pub mod options;
pub mod qname;
pub mod schema;
pub mod stream;
pub mod strtab;

pub use codec::{Decimal, ExiFloat};
pub use error::{ErrorCode, Result};
pub use event::{EventType, ExiEvent, ValueType};
pub use handler::{ContentHandler, Flow};
pub use header::Header;
pub use options::{Alignment, Options, Preserve, SchemaIdMode};
pub use qname::QNameId;
pub use stream::{Decoder, Encoder, ExiStreamState};
