//! A dedicated error for all possible failures in the toolkit: I/O, TLS,
//! SMTP protocol violations, DNS packet inconsistencies, etc.
use std::fmt;
use std::io;
use std::str;

#[derive(Debug)]
pub enum ProbeError {
    Io(io::Error),
    FromUtf8(std::string::FromUtf8Error),
    Utf8(str::Utf8Error),
    LoggerError(log::SetLoggerError),
    /// TLS handshake or record-layer failure after STARTTLS.
    Tls(native_tls::Error),
    /// Malformed or unexpected SMTP reply, missing capability. Not retried.
    Protocol(String),
    /// Transient SMTP condition (4xx). Retried within the attempt budget.
    Transient(String),
    Auth(AuthError),
    Dns(DnsError),
}

/// Decoder failures for DNS wire messages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DnsError {
    /// A field would read past the end of the buffer.
    Truncated,
    /// Name violates the compression or length rules.
    MalformedName,
    /// A resource record carries inconsistent data.
    MalformedRR,
    /// Label type bits are the reserved 01 or 10 patterns.
    Reserved,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthError {
    /// AUTO negotiation found no mechanism shared with the server.
    NoSharedMechanism,
}

impl ProbeError {
    // Helper function to create a new protocol error from a string
    pub fn protocol(s: &str) -> Self {
        ProbeError::Protocol(String::from(s))
    }

    /// Connection tasks re-initialize and retry on these kinds only.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProbeError::Io(_) | ProbeError::Tls(_) | ProbeError::Transient(_)
        )
    }
}

/// A specific custom `Result` for all functions
pub type ProbeResult<T> = Result<T, ProbeError>;

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Io(e) => write!(f, "I/O error: {}", e),
            ProbeError::FromUtf8(e) => write!(f, "UTF-8 conversion error: {}", e),
            ProbeError::Utf8(e) => write!(f, "UTF-8 conversion error: {}", e),
            ProbeError::LoggerError(e) => write!(f, "logger error: {}", e),
            ProbeError::Tls(e) => write!(f, "TLS error: {}", e),
            ProbeError::Protocol(s) => write!(f, "SMTP protocol error: {}", s),
            ProbeError::Transient(s) => write!(f, "transient SMTP failure: {}", s),
            ProbeError::Auth(AuthError::NoSharedMechanism) => {
                write!(f, "no shared authentication mechanism")
            }
            ProbeError::Dns(e) => write!(f, "DNS decode error: {:?}", e),
        }
    }
}

// All conversions from foreign errors to ProbeError
impl From<io::Error> for ProbeError {
    fn from(err: io::Error) -> Self {
        ProbeError::Io(err)
    }
}

impl From<String> for ProbeError {
    fn from(err: String) -> Self {
        ProbeError::Protocol(err)
    }
}

impl From<std::string::FromUtf8Error> for ProbeError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ProbeError::FromUtf8(err)
    }
}

impl From<str::Utf8Error> for ProbeError {
    fn from(err: str::Utf8Error) -> Self {
        ProbeError::Utf8(err)
    }
}

impl From<log::SetLoggerError> for ProbeError {
    fn from(err: log::SetLoggerError) -> Self {
        ProbeError::LoggerError(err)
    }
}

impl From<native_tls::Error> for ProbeError {
    fn from(err: native_tls::Error) -> Self {
        ProbeError::Tls(err)
    }
}

impl From<DnsError> for ProbeError {
    fn from(err: DnsError) -> Self {
        ProbeError::Dns(err)
    }
}

impl From<AuthError> for ProbeError {
    fn from(err: AuthError) -> Self {
        ProbeError::Auth(err)
    }
}
