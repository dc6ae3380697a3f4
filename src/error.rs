use thiserror::Error;

/// The closed set of error kinds produced by any fallible operation in this
/// crate, mirroring the EXIP reference's `errorHandle.h` one-for-one.
///
/// Once a stream operation returns an `Err`, the stream is permanently
/// invalid; only dropping it is legal afterward.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    #[error("feature not implemented")]
    NotImplemented,

    #[error("unexpected internal error")]
    Unexpected,

    #[error("hash table error")]
    HashTableError,

    #[error("array index out of bounds")]
    OutOfBoundBuffer,

    #[error("null pointer reference")]
    NullPointerRef,

    #[error("memory allocation error")]
    MemoryAllocationError,

    #[error("invalid EXI header")]
    InvalidExiHeader,

    #[error("processor state inconsistent with stream events")]
    InconsistentProcState,

    #[error("invalid EXI input")]
    InvalidExiInput,

    #[error("buffer end reached")]
    BufferEndReached,

    #[error("no event code matches the next event in the current grammar")]
    EventCodeMissing,

    #[error("content handler requested the stream stop")]
    HandlerStopReceived,

    #[error("invalid operation for the given arguments")]
    InvalidOperation,

    #[error("collection is empty")]
    EmptyCollection,

    #[error("parsing complete")]
    ParsingComplete,

    #[error("too many prefixes registered for one URI")]
    TooMuchPrefixesPerUri,

    #[error("invalid EXIP configuration")]
    InvalidExipConfiguration,

    #[error("XML Schema prefixes must be preserved")]
    NoPrefixesPreservedXmlSchema,

    #[error("invalid string table operation")]
    InvalidStringOperation,

    #[error("conflicting EXI header options")]
    HeaderOptionsMismatch,

    #[error("invalid utf-8 in string content: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    #[error("value out of range for target integer width")]
    IntegerOverflow,
}

pub type Result<T> = std::result::Result<T, ErrorCode>;
