//! One SMTP authentication attempt, from cold stream to decisive outcome.
use log::{debug, warn};

use crate::error::{AuthError, ProbeError, ProbeResult};
use crate::smtp::config::{AuthMethod, SmtpConfig};
use crate::smtp::reply::SmtpReply;
use crate::smtp::stream::SmtpStream;

/// Phase of the SMTP task. Transitions are one-directional except for the
/// STARTTLS reset, which re-enters `Connected` after the upgrade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionState {
    Init,
    Connected,
    EhloSent,
    AuthStarted,
    AuthUsername,
    AuthPassword,
    AuthComplete,
    Error,
}

/// Verdict for one credential pair.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthOutcome {
    pub success: bool,
    pub response_code: u16,
    pub response_text: String,
    pub username: String,
    pub password: String,
}

impl AuthOutcome {
    /// Success is decided by the reply code alone: 2xx and 3xx accept.
    pub fn classify(reply: &SmtpReply, username: &str, password: &str) -> Self {
        AuthOutcome {
            success: reply.is_positive(),
            response_code: reply.code,
            response_text: reply.text(),
            username: String::from(username),
            password: String::from(password),
        }
    }
}

pub struct Connection<'a> {
    config: &'a SmtpConfig,
    state: ConnectionState,
}

impl<'a> Connection<'a> {
    pub fn new(config: &'a SmtpConfig) -> Self {
        Connection {
            config,
            state: ConnectionState::Init,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Try one credential pair, re-initializing on recoverable failures up to
    /// the configured retry budget. A decisive server verdict is never
    /// retried.
    pub fn run<F>(
        &mut self,
        make_stream: &F,
        username: &str,
        password: &str,
    ) -> ProbeResult<AuthOutcome>
    where
        F: Fn() -> ProbeResult<Box<dyn SmtpStream>> + ?Sized,
    {
        let mut attempt = 0u16;

        loop {
            attempt += 1;
            match self.attempt(make_stream, username, password) {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt <= self.config.max_retries => {
                    warn!("attempt {} failed ({}), retrying", attempt, e);
                }
                Err(e) => {
                    self.state = ConnectionState::Error;
                    return Err(e);
                }
            }
        }
    }

    // one cold-to-decision pass over a fresh stream
    fn attempt<F>(
        &mut self,
        make_stream: &F,
        username: &str,
        password: &str,
    ) -> ProbeResult<AuthOutcome>
    where
        F: Fn() -> ProbeResult<Box<dyn SmtpStream>> + ?Sized,
    {
        self.state = ConnectionState::Init;
        let mut stream = make_stream()?;
        let result = self.drive(stream.as_mut(), username, password);
        // the stream never outlives the attempt, whatever happened
        stream.close();
        result
    }

    fn drive(
        &mut self,
        stream: &mut dyn SmtpStream,
        username: &str,
        password: &str,
    ) -> ProbeResult<AuthOutcome> {
        let greeting = stream.recv_reply()?;
        require_completion(&greeting, "greeting")?;
        self.state = ConnectionState::Connected;
        debug!("state: {:?}", self.state);

        let mut tls_done = !self.config.use_tls;
        let mechanisms = loop {
            // EHLO after connect, and again after the TLS reset
            stream.send(format!("EHLO {}\r\n", self.config.ehlo_domain).as_bytes())?;
            let reply = stream.recv_reply()?;
            require_completion(&reply, "EHLO")?;
            self.state = ConnectionState::EhloSent;
            debug!("state: {:?}", self.state);

            if tls_done {
                break reply.auth_mechanisms();
            }

            stream.send(b"STARTTLS\r\n")?;
            let reply = stream.recv_reply()?;
            require_completion(&reply, "STARTTLS")?;
            stream.upgrade_tls()?;
            tls_done = true;

            // the session resets with the new security layer
            self.state = ConnectionState::Connected;
            debug!("state: {:?} (TLS)", self.state);
        };

        let method = resolve_method(self.config.auth_method, &mechanisms)?;
        debug!("authenticating with {}", method.token());

        stream.send(format!("AUTH {}\r\n", method.token()).as_bytes())?;
        let reply = stream.recv_reply()?;
        if !reply.is_intermediate() {
            return Err(auth_init_error(&reply));
        }
        self.state = ConnectionState::AuthStarted;

        // username blob; the Base64 payloads stay out of logs and errors
        stream.send(format!("{}\r\n", base64::encode(username)).as_bytes())?;
        let reply = stream.recv_reply()?;
        if !reply.is_intermediate() {
            if reply.is_transient() {
                return Err(transient(&reply));
            }
            // a decisive verdict on the username classifies like a final reply
            self.state = ConnectionState::AuthComplete;
            return Ok(AuthOutcome::classify(&reply, username, password));
        }
        self.state = ConnectionState::AuthUsername;

        stream.send(format!("{}\r\n", base64::encode(password)).as_bytes())?;
        self.state = ConnectionState::AuthPassword;

        // the final reply decides; no QUIT, tearing down is the caller's job
        let reply = stream.recv_reply()?;
        if reply.is_transient() {
            return Err(transient(&reply));
        }
        self.state = ConnectionState::AuthComplete;
        Ok(AuthOutcome::classify(&reply, username, password))
    }
}

// 2xx or bust for the session-establishing commands. Error text carries the
// code only: no server banners, no payloads.
fn require_completion(reply: &SmtpReply, what: &str) -> ProbeResult<()> {
    if (200..300).contains(&reply.code) {
        return Ok(());
    }
    if reply.is_transient() {
        return Err(transient(reply));
    }
    Err(ProbeError::Protocol(format!(
        "{} rejected with code {}",
        what, reply.code
    )))
}

fn transient(reply: &SmtpReply) -> ProbeError {
    ProbeError::Transient(format!("code {}", reply.code))
}

fn auth_init_error(reply: &SmtpReply) -> ProbeError {
    if reply.is_transient() {
        transient(reply)
    } else {
        ProbeError::Protocol(format!("AUTH rejected with code {}", reply.code))
    }
}

/// AUTO picks the first advertised mechanism in LOGIN, PLAIN, CRAM-MD5
/// preference order. An explicit method is used as configured.
fn resolve_method(configured: AuthMethod, advertised: &[String]) -> ProbeResult<AuthMethod> {
    match configured {
        AuthMethod::Auto => [AuthMethod::Login, AuthMethod::Plain, AuthMethod::CramMd5]
            .into_iter()
            .find(|m| advertised.iter().any(|a| a == m.token()))
            .ok_or_else(|| AuthError::NoSharedMechanism.into()),
        method => Ok(method),
    }
}
