//! The line-oriented control protocol spoken with the gateway during session
//! setup, and the preamble of the DBN stream that follows it.

use std::io::{self, Read};

use sha2::{Digest, Sha256};

use crate::{Error, Result, SType, Schema, DBN_VERSION};

/// The TCP port of every live subscription gateway.
pub(crate) const LSG_PORT: u16 = 13000;
/// The domain under which the dataset-specific gateways are addressed.
const GATEWAY_DOMAIN: &str = "lsg.databento.com";
/// The number of trailing characters of the API key sent as the bucket ID.
pub(crate) const BUCKET_ID_LEN: usize = 5;
/// The maximum number of symbols the gateway accepts in one subscription
/// request.
pub(crate) const SYMBOL_CHUNK: usize = 1000;
/// The magic bytes at the start of the DBN stream.
const DBN_PREFIX: &[u8] = b"DBN";

/// Returns the fully-qualified domain name of the live subscription gateway
/// for `dataset`, e.g. `opra-pillar.lsg.databento.com` for `OPRA.PILLAR`.
pub fn gateway_fqdn(dataset: &str) -> String {
    format!("{}.{GATEWAY_DOMAIN}", dataset.replace('.', "-"))
}

/// A control message received from the gateway: `key=value` fields separated
/// by `|`, terminated by a newline.
#[derive(Debug)]
pub(crate) struct ControlMsg(String);

impl ControlMsg {
    /// Reads one newline-terminated control message from `reader`.
    ///
    /// Control messages are only exchanged during the setup phase of a
    /// connection, so this reads a byte at a time rather than risk consuming
    /// stream bytes past the line.
    ///
    /// # Errors
    /// This function returns an error if the peer closes the connection
    /// before a full line arrives, on any other I/O failure, or if the line
    /// is not valid UTF-8.
    pub fn read_from(reader: &mut impl Read) -> Result<Self> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte) {
                Ok(0) => return Err(Error::PeerClosed),
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    line.push(byte[0]);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::io(err, "reading control message")),
            }
        }
        let line = String::from_utf8(line)
            .map_err(|_| Error::decode("control message is not valid UTF-8"))?;
        Ok(Self(line))
    }

    /// Returns the value of the field with `key`, or `None` if the message
    /// has no such field.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.0
            .split('|')
            .find_map(|field| field.split_once('=').filter(|(k, _)| *k == key))
            .map(|(_, value)| value)
    }

    /// Returns the value of the field with `key`.
    ///
    /// # Errors
    /// This function returns an error naming the message if the field is
    /// absent.
    pub fn require(&self, key: &str, what: &str) -> Result<&str> {
        self.field(key)
            .ok_or_else(|| Error::decode(format!("{what} is missing {key} field")))
    }
}

/// Builds the authentication line replying to the gateway's CRAM challenge:
/// the lowercase hex SHA-256 of `cram|api_key`, suffixed with the trailing
/// [`BUCKET_ID_LEN`] characters of the API key.
pub(crate) fn auth_line(cram: &str, api_key: &str, dataset: &str, ts_out: bool) -> String {
    let digest = Sha256::digest(format!("{cram}|{api_key}"));
    let bucket_id = &api_key[api_key.len() - BUCKET_ID_LEN..];
    format!(
        "auth={}-{bucket_id}|dataset={dataset}|encoding=dbn|ts_out={}\n",
        hex::encode(digest),
        u8::from(ts_out)
    )
}

/// Builds the subscription request lines for `symbols` with `suffix` appended
/// to each, chunked to at most [`SYMBOL_CHUNK`] symbols per line. An empty
/// symbol list subscribes to the special `ALL_SYMBOLS` symbol and ignores the
/// suffix. `replay` requests intra-day replay instead of a live subscription.
pub(crate) fn subscribe_lines<S: AsRef<str>>(
    schema: Schema,
    stype_in: SType,
    symbols: &[S],
    suffix: &str,
    replay: bool,
) -> Vec<String> {
    let start = if replay { "|start=0" } else { "" };
    if symbols.is_empty() {
        return vec![format!(
            "schema={schema}|stype_in={stype_in}{start}|symbols=ALL_SYMBOLS\n"
        )];
    }
    symbols
        .chunks(SYMBOL_CHUNK)
        .enumerate()
        .map(|(i, chunk)| {
            let is_last = (i + 1) * SYMBOL_CHUNK >= symbols.len();
            let mut line = format!(
                "schema={schema}|stype_in={stype_in}{start}|is_last={}|symbols=",
                u8::from(is_last)
            );
            for (j, symbol) in chunk.iter().enumerate() {
                if j > 0 {
                    line.push(',');
                }
                line.push_str(symbol.as_ref());
                line.push_str(suffix);
            }
            line.push('\n');
            line
        })
        .collect()
}

/// Reads and validates the 8-byte DBN stream preamble, then reads and
/// discards the metadata header it announces. Returns the metadata header
/// length.
///
/// # Errors
/// This function returns an error if the magic bytes or stream version don't
/// match, or if the peer closes the connection mid-preamble.
pub(crate) fn read_preamble(reader: &mut impl Read) -> Result<u32> {
    let mut preamble = [0u8; 8];
    read_exact(reader, &mut preamble)?;
    if &preamble[..DBN_PREFIX.len()] != DBN_PREFIX {
        return Err(Error::decode("stream preamble has invalid signature"));
    }
    let version = preamble[DBN_PREFIX.len()];
    if version != DBN_VERSION {
        return Err(Error::decode(format!("stream version {version} unsupported")));
    }
    let length = u32::from_le_bytes([preamble[4], preamble[5], preamble[6], preamble[7]]);
    // The metadata header only describes the subscription back to us; the
    // session already knows everything in it.
    let mut remaining = length as usize;
    let mut discard = [0u8; 512];
    while remaining > 0 {
        let cap = remaining.min(discard.len());
        let n = read_some(reader, &mut discard[..cap])?;
        remaining -= n;
    }
    Ok(length)
}

/// Like [`Read::read_exact`], but maps an early close to
/// [`Error::PeerClosed`].
fn read_exact(reader: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::PeerClosed
        } else {
            Error::io(err, "reading from gateway")
        }
    })
}

/// Reads at least one byte into `buf`, retrying on signal interruption and
/// mapping a close to [`Error::PeerClosed`].
fn read_some(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(0) => return Err(Error::PeerClosed),
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(Error::io(err, "reading from gateway")),
        }
    }
}
