//! A single authenticated session with a live subscription gateway.

use std::{
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    os::fd::AsRawFd,
    sync::Arc,
};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info};

use crate::{
    live::{
        framing::FramedReader,
        protocol::{self, ControlMsg},
        ring::Uring,
    },
    Error, RecordRef, Result, SType, Schema,
};

/// The target size of the kernel socket receive buffer and of each of the
/// session's receive buffers. Connecting fails if the kernel clamps the
/// socket buffer below this.
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024 * 1024;

/// The special symbol that subscribes to every symbol in the dataset.
pub const ALL_SYMBOLS: &str = "ALL_SYMBOLS";

/// A sink for session errors. Invoked with whether the error is fatal (no
/// further communication on the session is likely to succeed) and a formatted
/// message. Fatal invocations always precede the `Err` return of the
/// operation that failed.
pub type ErrorSink = Arc<dyn Fn(bool, &str) + Send + Sync>;

/// A sink for received records. The reference is only valid until the sink
/// returns; implementations must copy whatever they need to retain. Sinks
/// must not block on shared resources, as that stalls the session's receive
/// loop.
pub type RecordSink = Arc<dyn Fn(RecordRef) + Send + Sync>;

/// A client for one live subscription gateway session.
///
/// The lifecycle is [`connect`](Self::connect) (authenticate),
/// [`start`](Self::start) (subscribe and begin streaming), a loop of
/// [`get`](Self::get), and [`close`](Self::close). After a failure the
/// session can be closed and a new one constructed; there is no in-place
/// recovery.
pub struct Session {
    on_error: ErrorSink,
    on_record: RecordSink,
    /// Target receive buffer capacity; replaced by the effective socket
    /// buffer size once connected.
    capacity: usize,
    stream: Option<TcpStream>,
    reader: Option<FramedReader<Uring>>,
    ts_out: bool,
}

impl Session {
    /// Creates a new unconnected session dispatching to the given sinks, with
    /// the default buffer capacity of [`DEFAULT_BUFFER_CAPACITY`].
    pub fn new(on_error: ErrorSink, on_record: RecordSink) -> Self {
        Self::with_capacity(on_error, on_record, DEFAULT_BUFFER_CAPACITY)
    }

    /// Creates a new unconnected session with an explicit buffer capacity
    /// target. Capacities below [`DEFAULT_BUFFER_CAPACITY`] lower the kernel
    /// receive buffer requirement along with the throughput headroom, which
    /// is intended for tests and constrained environments.
    pub fn with_capacity(on_error: ErrorSink, on_record: RecordSink, capacity: usize) -> Self {
        Self {
            on_error,
            on_record,
            capacity,
            stream: None,
            reader: None,
            ts_out: false,
        }
    }

    /// Resolves the gateway for `dataset`, connects, and authenticates with
    /// `api_key`. `ts_out` requests that the gateway append its send
    /// timestamp to every record.
    ///
    /// # Errors
    /// This function returns an error, after invoking the error sink with
    /// `fatal = true`, if resolution, connection, socket sizing, the
    /// handshake, or authentication fails.
    pub fn connect(&mut self, api_key: &str, dataset: &str, ts_out: bool) -> Result<()> {
        let on_error = self.on_error.clone();
        let fatal = |err: Error| {
            on_error(true, &err.to_string());
            err
        };
        Self::validate_api_key(api_key).map_err(&fatal)?;
        let fqdn = protocol::gateway_fqdn(dataset);
        let addr = (fqdn.as_str(), protocol::LSG_PORT)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.find(SocketAddr::is_ipv4))
            .ok_or_else(|| fatal(Error::Resolution { fqdn: fqdn.clone() }))?;
        debug!(%fqdn, %addr, "resolved gateway");
        self.connect_gateway(addr, api_key, dataset, ts_out)
    }

    /// Like [`connect`](Self::connect), but to an explicit gateway address
    /// instead of the resolved dataset gateway. Useful behind proxies and in
    /// tests.
    ///
    /// # Errors
    /// This function returns an error, after invoking the error sink with
    /// `fatal = true`, if connection, socket sizing, the handshake, or
    /// authentication fails.
    pub fn connect_gateway(
        &mut self,
        addr: SocketAddr,
        api_key: &str,
        dataset: &str,
        ts_out: bool,
    ) -> Result<()> {
        let on_error = self.on_error.clone();
        let fatal = |err: Error| {
            on_error(true, &err.to_string());
            err
        };

        Self::validate_api_key(api_key).map_err(&fatal)?;

        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| fatal(Error::io(e, "creating socket")))?;

        // Ask for the full capacity up front; the effective value after the
        // kernel clamp governs the receive buffers.
        socket
            .set_recv_buffer_size(self.capacity)
            .map_err(|e| fatal(Error::io(e, "setting socket receive buffer size")))?;
        let effective = socket
            .recv_buffer_size()
            .map_err(|e| fatal(Error::io(e, "querying socket receive buffer size")))?;
        if effective < self.capacity {
            return Err(fatal(Error::Buffer(format!(
                "socket receive buffer clamped to {effective} bytes, need {}; raise net.core.rmem_max",
                self.capacity
            ))));
        }
        self.capacity = effective;

        socket
            .connect(&addr.into())
            .map_err(|e| fatal(Error::io(e, format!("connecting to gateway at {addr}"))))?;
        let mut stream: TcpStream = socket.into();

        let greeting = ControlMsg::read_from(&mut stream).map_err(&fatal)?;
        greeting.require("lsg_version", "greeting").map_err(&fatal)?;

        let challenge = ControlMsg::read_from(&mut stream).map_err(&fatal)?;
        let cram = challenge.require("cram", "challenge").map_err(&fatal)?;

        let auth = protocol::auth_line(cram, api_key, dataset, ts_out);
        std::io::Write::write_all(&mut stream, auth.as_bytes())
            .map_err(|e| fatal(Error::io(e, "sending authentication")))?;

        let reply = ControlMsg::read_from(&mut stream).map_err(&fatal)?;
        let success = reply.require("success", "authentication reply").map_err(&fatal)?;
        if success != "1" {
            let reason = reply.field("error").unwrap_or("authentication failed");
            return Err(fatal(Error::Auth(reason.to_owned())));
        }

        info!(dataset, capacity = self.capacity, "session authenticated");
        self.stream = Some(stream);
        self.ts_out = ts_out;
        Ok(())
    }

    /// The bucket ID is formed from the trailing characters of the key, so
    /// keys the gateway could never accept are rejected before any I/O.
    fn validate_api_key(api_key: &str) -> Result<()> {
        if api_key.len() < protocol::BUCKET_ID_LEN || !api_key.is_ascii() {
            return Err(Error::bad_argument(
                "api_key",
                format!(
                    "must be at least {} ASCII characters",
                    protocol::BUCKET_ID_LEN
                ),
            ));
        }
        Ok(())
    }

    /// Subscribes to `symbols` (with `suffix` appended to each) under
    /// `schema` and `stype_in`, starts the streaming session, consumes the
    /// stream preamble, and arms the receive path. An empty symbol list
    /// subscribes to all symbols. `replay` replays the current day's data
    /// before (or instead of) live data.
    ///
    /// # Errors
    /// This function returns an error, after invoking the error sink with
    /// `fatal = true`, if the session isn't connected, a send fails, or the
    /// stream preamble is malformed.
    pub fn start<S: AsRef<str>>(
        &mut self,
        schema: Schema,
        stype_in: SType,
        symbols: &[S],
        suffix: &str,
        replay: bool,
    ) -> Result<()> {
        let on_error = self.on_error.clone();
        let fatal = |err: Error| {
            on_error(true, &err.to_string());
            err
        };
        let capacity = self.capacity;
        let Some(stream) = self.stream.as_mut() else {
            return Err(fatal(Error::bad_argument(
                "session",
                "connect must succeed before start",
            )));
        };

        let lines = protocol::subscribe_lines(schema, stype_in, symbols, suffix, replay);
        debug!(
            %schema,
            %stype_in,
            num_symbols = symbols.len(),
            num_requests = lines.len(),
            replay,
            "subscribing"
        );
        for line in &lines {
            std::io::Write::write_all(stream, line.as_bytes())
                .map_err(|e| fatal(Error::io(e, "sending subscription request")))?;
        }
        std::io::Write::write_all(stream, b"start_session=0\n")
            .map_err(|e| fatal(Error::io(e, "sending session start")))?;

        protocol::read_preamble(stream).map_err(&fatal)?;

        // All subsequent bytes are DBN records; hand the socket over to the
        // double-buffered receive path.
        let ring = Uring::new(stream.as_raw_fd()).map_err(&fatal)?;
        let mut reader = FramedReader::new(ring, capacity);
        reader.prime().map_err(&fatal)?;
        self.reader = Some(reader);
        Ok(())
    }

    /// Receives records, blocking until at least one completion arrives, and
    /// dispatches them to the record sink in receive order. Returns the
    /// number of records dispatched by this call, which is `0` when the wait
    /// was interrupted by a signal (so an outer loop can observe a stop flag)
    /// or a completion ended mid-record.
    ///
    /// # Errors
    /// This function returns an error, after invoking the error sink with
    /// `fatal = true`, if the gateway closes the connection or the stream is
    /// malformed.
    pub fn get(&mut self) -> Result<usize> {
        let on_record = self.on_record.clone();
        let on_error = self.on_error.clone();
        let Some(reader) = self.reader.as_mut() else {
            let err = Error::bad_argument("session", "start must succeed before get");
            on_error(true, &err.to_string());
            return Err(err);
        };
        reader.read(|rec| on_record(rec)).map_err(|err| {
            on_error(true, &err.to_string());
            err
        })
    }

    /// Disconnects from the gateway and releases the receive buffers.
    /// Idempotent, and safe to call after a failed [`connect`](Self::connect).
    pub fn close(&mut self) {
        // Tear down the ring before the socket it is registered against.
        self.reader = None;
        if self.stream.take().is_some() {
            debug!("session closed");
        }
    }

    /// Returns whether the gateway appends its send timestamp to every
    /// record, i.e. whether records should be read as
    /// [`WithTsOut`](crate::WithTsOut).
    pub fn ts_out(&self) -> bool {
        self.ts_out
    }

    /// Returns the receive buffer capacity: the target before connecting, and
    /// the effective socket buffer size after.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn sink_pair() -> (ErrorSink, RecordSink, Arc<Mutex<Vec<(bool, String)>>>) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink_errors = Arc::clone(&errors);
        let on_error: ErrorSink = Arc::new(move |fatal, msg: &str| {
            sink_errors.lock().unwrap().push((fatal, msg.to_owned()));
        });
        let on_record: RecordSink = Arc::new(|_| {});
        (on_error, on_record, errors)
    }

    #[test]
    fn test_get_before_start_fails_fatally() {
        let (on_error, on_record, errors) = sink_pair();
        let mut session = Session::with_capacity(on_error, on_record, 64 * 1024);
        assert!(matches!(session.get(), Err(Error::BadArgument { .. })));
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].0);
    }

    #[test]
    fn test_short_api_key_rejected_before_io() {
        let (on_error, on_record, errors) = sink_pair();
        let mut session = Session::with_capacity(on_error, on_record, 64 * 1024);
        let addr = "127.0.0.1:13000".parse().unwrap();
        assert!(matches!(
            session.connect_gateway(addr, "abc", "XNAS.ITCH", false),
            Err(Error::BadArgument { .. })
        ));
        assert_eq!(errors.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_close_is_idempotent_without_connect() {
        let (on_error, on_record, _) = sink_pair();
        let mut session = Session::new(on_error, on_record);
        session.close();
        session.close();
    }
}
