//! Types for errors that can occur while working with the live gateway.

use std::io;

use thiserror::Error;

/// An error that can occur while connecting to, subscribing through, or
/// streaming records from the live subscription gateway.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error while communicating with the gateway.
    #[error("I/O error: {source} while {context}")]
    Io {
        /// The original error.
        #[source]
        source: io::Error,
        /// The context in which the error occurred.
        context: String,
    },
    /// A failure to resolve the gateway domain name.
    #[error("unable to resolve gateway address {fqdn}")]
    Resolution {
        /// The fully-qualified domain name that could not be resolved.
        fqdn: String,
    },
    /// The gateway rejected the authentication request.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// An error with decoding the control protocol or the DBN stream.
    #[error("decoding error: {0}")]
    Decode(String),
    /// A receive or carry-over buffer could not be sized to satisfy the
    /// stream.
    #[error("buffer error: {0}")]
    Buffer(String),
    /// The gateway closed the connection.
    #[error("connection closed by gateway")]
    PeerClosed,
    /// An invalid argument was passed to a function.
    #[error("bad argument `{param_name}`: {desc}")]
    BadArgument {
        /// The name of the parameter to which the bad argument was passed.
        param_name: String,
        /// The description of why the argument was invalid.
        desc: String,
    },
    /// An error with conversion of a value to a given type.
    #[error("couldn't convert {input} to {desired_type}")]
    Conversion {
        /// The input that failed to convert.
        input: String,
        /// The name of the type the input couldn't be converted to.
        desired_type: &'static str,
    },
}

/// An alias for a `Result` with [`enum@Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new I/O [`enum@Error`] with the given `context`.
    pub fn io(source: io::Error, context: impl ToString) -> Self {
        Self::Io {
            source,
            context: context.to_string(),
        }
    }

    /// Creates a new decode [`enum@Error`].
    pub fn decode(msg: impl ToString) -> Self {
        Self::Decode(msg.to_string())
    }

    /// Creates a new conversion [`enum@Error`] where `T` is the desired type.
    pub fn conversion<T>(input: impl ToString) -> Self {
        Self::Conversion {
            input: input.to_string(),
            desired_type: std::any::type_name::<T>(),
        }
    }

    /// Creates a new bad-argument [`enum@Error`] for `param_name`.
    pub fn bad_argument(param_name: impl ToString, desc: impl ToString) -> Self {
        Self::BadArgument {
            param_name: param_name.to_string(),
            desc: desc.to_string(),
        }
    }
}
