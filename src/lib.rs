//! Credential-probing and DNS-inspection toolkit: an SMTP authentication
//! prober, a DNS wire-message codec (RFC1035 framing with name compression)
//! and a thread-shared domain→address cache with time-based expiry.
pub mod cache;
pub mod error;
pub mod macros;
pub mod network_order;
pub mod query;
pub mod resolver;
pub mod rfc1035;
pub mod smtp;
pub mod util;
