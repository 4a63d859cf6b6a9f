//! The live client: the control-protocol driver for the subscription
//! gateway, the framed DBN stream reader, and the single- and multi-session
//! clients built on them.
//!
//! A [`Session`] owns one authenticated TCP connection to a dataset-specific
//! gateway. After [`Session::start`], DBN records stream through a
//! double-buffered receive path and are dispatched to the record sink in
//! receive order. [`MultiSession`] fans independent sessions out across
//! worker threads sharing a pair of sinks.

pub(crate) mod framing;
mod multi;
pub(crate) mod protocol;
pub(crate) mod ring;
mod session;

pub use multi::MultiSession;
pub use protocol::gateway_fqdn;
pub use session::{ErrorSink, RecordSink, Session, ALL_SYMBOLS, DEFAULT_BUFFER_CAPACITY};
