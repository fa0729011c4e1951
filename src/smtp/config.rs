//! Configuration records for the SMTP prober.
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SMTP_PORT: u16 = 25;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u16 = 2;

/// Authentication mechanisms, listed in AUTO preference order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthMethod {
    Login,
    Plain,
    CramMd5,
    Auto,
}

impl AuthMethod {
    /// Wire token sent in `AUTH <METHOD>` and matched against EHLO capabilities.
    pub fn token(&self) -> &'static str {
        match self {
            AuthMethod::Login => "LOGIN",
            AuthMethod::Plain => "PLAIN",
            AuthMethod::CramMd5 => "CRAM-MD5",
            AuthMethod::Auto => "AUTO",
        }
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOGIN" => Ok(AuthMethod::Login),
            "PLAIN" => Ok(AuthMethod::Plain),
            "CRAM-MD5" | "CRAM_MD5" => Ok(AuthMethod::CramMd5),
            "AUTO" => Ok(AuthMethod::Auto),
            _ => Err(format!("{} is not a valid auth method", s)),
        }
    }
}

/// Immutable description of the target server and how to talk to it.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub auth_method: AuthMethod,
    pub use_tls: bool,
    /// Applies to the TCP connect and to each send/receive.
    pub timeout: Duration,
    /// Extra attempts after the first one, for recoverable failures only.
    pub max_retries: u16,
    pub ehlo_domain: String,
}

impl SmtpConfig {
    pub fn new(host: &str) -> Self {
        SmtpConfig {
            host: String::from(host),
            port: DEFAULT_SMTP_PORT,
            auth_method: AuthMethod::Auto,
            use_tls: false,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            ehlo_domain: String::from("localhost"),
        }
    }
}

/// What to probe: the credential lists and how hard to push.
#[derive(Debug, Clone)]
pub struct ProbeParams {
    pub usernames: Vec<String>,
    pub passwords: Vec<String>,
    pub parallelism: u16,
    pub stop_on_first_success: bool,
}

impl ProbeParams {
    pub fn new(usernames: Vec<String>, passwords: Vec<String>) -> Self {
        ProbeParams {
            usernames,
            passwords,
            parallelism: 1,
            stop_on_first_success: false,
        }
    }
}
