//! A client for Databento's live market data service: it authenticates
//! against a dataset-specific live subscription gateway over TCP, subscribes
//! to one or more symbols under a named [`Schema`] and symbology, and
//! delivers Databento Binary Encoding (DBN) records to a caller-provided
//! sink with minimal framing overhead.
//!
//! The control phase of a connection is a line-oriented, pipe-delimited
//! protocol with CRAM authentication; the streaming phase is a stream of
//! length-prefixed binary records read through a double-buffered,
//! io_uring-offloaded receive path. See [`Session`] for a single session and
//! [`MultiSession`] for parallel sessions sharing a pair of sinks.

pub mod enums;
pub mod error;
pub mod flags;
pub mod live;
pub(crate) mod macros;
pub mod record;
pub mod record_enum;
pub mod record_ref;

pub use crate::{
    enums::{
        rtype, Action, InstrumentClass, RType, SType, Schema, SecurityUpdateAction, Side,
        UserDefinedInstrument,
    },
    error::{Error, Result},
    flags::FlagSet,
    live::{
        gateway_fqdn, ErrorSink, MultiSession, RecordSink, Session, ALL_SYMBOLS,
        DEFAULT_BUFFER_CAPACITY,
    },
    record::{
        c_chars_to_str, str_to_c_chars, ts_to_dt, BboMsg, BidAskPair, CbboMsg, Cmbp1Msg,
        ConsolidatedBidAskPair, ErrorMsg, HasRType, InstrumentDefMsg, Record, RecordHeader,
        RecordMut, SymbolMappingMsg, SystemMsg, WithTsOut,
    },
    record_enum::RecordRefEnum,
    record_ref::RecordRef,
};

/// The DBN version of the live stream. The stream preamble must carry exactly
/// this version.
pub const DBN_VERSION: u8 = 1;

/// The length of fixed-length symbol strings in records, including a null
/// terminator.
pub const SYMBOL_CSTR_LEN: usize = 22;

/// The sentinel value for an unset or null price.
pub const UNDEF_PRICE: i64 = i64::MAX;

/// The sentinel value for an unset or null timestamp.
pub const UNDEF_TIMESTAMP: u64 = u64::MAX;
