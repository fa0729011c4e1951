//! Byte stream consumed by the SMTP task: plain TCP with an in-place STARTTLS
//! upgrade. Replies are read byte by byte so nothing is buffered across the
//! TLS boundary.
use std::io;
use std::io::{Read, Write};
use std::mem;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;
use native_tls::{HandshakeError, TlsConnector, TlsStream};

use crate::error::{ProbeError, ProbeResult};
use crate::smtp::reply::{is_final_line, SmtpReply};

// a hostile server must not be able to stream continuation lines forever
const MAX_REPLY_LINES: usize = 64;
const MAX_LINE_LENGTH: usize = 2048;

/// What the connection task needs from a transport. Timeouts apply per call.
pub trait SmtpStream {
    fn send(&mut self, bytes: &[u8]) -> ProbeResult<()>;
    fn recv_reply(&mut self) -> ProbeResult<SmtpReply>;
    fn upgrade_tls(&mut self) -> ProbeResult<()>;
    fn close(&mut self);
}

enum Inner {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Closed,
}

pub struct TcpSmtpStream {
    host: String,
    inner: Inner,
}

impl TcpSmtpStream {
    /// Connect with a bounded connect time; the same timeout then applies to
    /// each send and receive.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> ProbeResult<Self> {
        let addr = (host, port).to_socket_addrs()?.next().ok_or_else(|| {
            ProbeError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {}", host),
            ))
        })?;

        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        debug!("connected to {}", addr);

        Ok(TcpSmtpStream {
            host: String::from(host),
            inner: Inner::Plain(stream),
        })
    }

    fn reader(&mut self) -> ProbeResult<&mut dyn Read> {
        match &mut self.inner {
            Inner::Plain(stream) => Ok(stream),
            Inner::Tls(stream) => Ok(stream.as_mut()),
            Inner::Closed => Err(closed_error()),
        }
    }

    fn writer(&mut self) -> ProbeResult<&mut dyn Write> {
        match &mut self.inner {
            Inner::Plain(stream) => Ok(stream),
            Inner::Tls(stream) => Ok(stream.as_mut()),
            Inner::Closed => Err(closed_error()),
        }
    }

    // one byte at a time until CRLF, which is returned stripped
    fn read_line(&mut self) -> ProbeResult<String> {
        let reader = self.reader()?;
        let mut line: Vec<u8> = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            let n = reader.read(&mut byte)?;
            if n == 0 {
                return Err(ProbeError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )));
            }
            line.push(byte[0]);

            if line.ends_with(b"\r\n") {
                line.truncate(line.len() - 2);
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            if line.len() > MAX_LINE_LENGTH {
                return Err(ProbeError::protocol("reply line too long"));
            }
        }
    }
}

fn closed_error() -> ProbeError {
    ProbeError::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "stream is closed",
    ))
}

impl SmtpStream for TcpSmtpStream {
    fn send(&mut self, bytes: &[u8]) -> ProbeResult<()> {
        let writer = self.writer()?;
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Consume lines until the space-in-column-4 line, then hand back the
    /// whole reply.
    fn recv_reply(&mut self) -> ProbeResult<SmtpReply> {
        let mut lines = Vec::new();

        loop {
            let line = self.read_line()?;
            let done = is_final_line(&line);
            lines.push(line);
            if done {
                return Ok(SmtpReply::from_lines(lines));
            }
            if lines.len() >= MAX_REPLY_LINES {
                return Err(ProbeError::protocol("reply exceeds the line budget"));
            }
        }
    }

    fn upgrade_tls(&mut self) -> ProbeResult<()> {
        match mem::replace(&mut self.inner, Inner::Closed) {
            Inner::Plain(stream) => {
                // certificate verification is off: the prober talks to
                // whatever answers
                let connector = TlsConnector::builder()
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true)
                    .build()?;

                let tls = connector.connect(&self.host, stream).map_err(|e| match e {
                    HandshakeError::Failure(e) => ProbeError::Tls(e),
                    HandshakeError::WouldBlock(_) => {
                        ProbeError::protocol("TLS handshake interrupted")
                    }
                })?;
                debug!("TLS established with {}", self.host);

                self.inner = Inner::Tls(Box::new(tls));
                Ok(())
            }
            Inner::Tls(tls) => {
                self.inner = Inner::Tls(tls);
                Err(ProbeError::protocol("stream is already TLS"))
            }
            Inner::Closed => Err(closed_error()),
        }
    }

    fn close(&mut self) {
        match mem::replace(&mut self.inner, Inner::Closed) {
            Inner::Plain(stream) => {
                let _ = stream.shutdown(Shutdown::Both);
            }
            Inner::Tls(mut tls) => {
                // best-effort close_notify; dropping closes the socket
                let _ = tls.shutdown();
            }
            Inner::Closed => {}
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted streams for driving the state machine without a network.
    use std::collections::VecDeque;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::SmtpStream;
    use crate::error::{ProbeError, ProbeResult};
    use crate::smtp::reply::SmtpReply;

    fn split_reply(raw: &str) -> SmtpReply {
        SmtpReply::from_lines(raw.split("\r\n").map(String::from).collect())
    }

    /// Replays a fixed list of raw replies, recording everything sent.
    pub struct ScriptedStream {
        replies: VecDeque<String>,
        pub sent: Arc<Mutex<Vec<String>>>,
        pub closed: Arc<Mutex<bool>>,
    }

    impl ScriptedStream {
        pub fn new(replies: &[&str]) -> Self {
            ScriptedStream {
                replies: replies.iter().map(|s| String::from(*s)).collect(),
                sent: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl SmtpStream for ScriptedStream {
        fn send(&mut self, bytes: &[u8]) -> ProbeResult<()> {
            self.sent
                .lock()
                .push(String::from_utf8_lossy(bytes).into_owned());
            Ok(())
        }

        fn recv_reply(&mut self) -> ProbeResult<SmtpReply> {
            let raw = self
                .replies
                .pop_front()
                .ok_or_else(|| ProbeError::protocol("script exhausted"))?;
            Ok(split_reply(&raw))
        }

        fn upgrade_tls(&mut self) -> ProbeResult<()> {
            Ok(())
        }

        fn close(&mut self) {
            *self.closed.lock() = true;
        }
    }

    /// A minimal AUTH LOGIN server: accepts one credential pair, or all of
    /// them when constructed with `accepting_any`.
    pub struct MockServerStream {
        user_blob: Option<String>,
        pass_blob: Option<String>,
        awaiting_user: bool,
        awaiting_pass: bool,
        user_ok: bool,
        queue: VecDeque<String>,
        pub sent: Arc<Mutex<Vec<String>>>,
    }

    impl MockServerStream {
        pub fn accepting(username: &str, password: &str) -> Self {
            Self::build(Some(base64::encode(username)), Some(base64::encode(password)))
        }

        pub fn accepting_any() -> Self {
            Self::build(None, None)
        }

        fn build(user_blob: Option<String>, pass_blob: Option<String>) -> Self {
            let mut queue = VecDeque::new();
            queue.push_back(String::from("220 mock ESMTP ready"));
            MockServerStream {
                user_blob,
                pass_blob,
                awaiting_user: false,
                awaiting_pass: false,
                user_ok: false,
                queue,
                sent: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn matches(expected: &Option<String>, blob: &str) -> bool {
            match expected {
                Some(e) => e == blob,
                None => true,
            }
        }
    }

    impl SmtpStream for MockServerStream {
        fn send(&mut self, bytes: &[u8]) -> ProbeResult<()> {
            let line = String::from_utf8_lossy(bytes).trim_end().to_string();
            self.sent.lock().push(line.clone());

            let reply = if self.awaiting_user {
                self.awaiting_user = false;
                if Self::matches(&self.user_blob, &line) {
                    self.user_ok = true;
                    self.awaiting_pass = true;
                    String::from("334 UGFzc3dvcmQ6")
                } else {
                    String::from("535 5.7.8 authentication failed")
                }
            } else if self.awaiting_pass {
                self.awaiting_pass = false;
                if self.user_ok && Self::matches(&self.pass_blob, &line) {
                    String::from("235 2.7.0 authentication succeeded")
                } else {
                    String::from("535-5.7.8 authentication failed\r\n535 5.7.8 try later")
                }
            } else if line.starts_with("EHLO") {
                String::from("250-mock\r\n250 AUTH LOGIN PLAIN")
            } else if line == "STARTTLS" {
                String::from("220 2.0.0 ready to start TLS")
            } else if line.starts_with("AUTH") {
                self.awaiting_user = true;
                String::from("334 VXNlcm5hbWU6")
            } else {
                String::from("502 5.5.2 command not recognized")
            };

            self.queue.push_back(reply);
            Ok(())
        }

        fn recv_reply(&mut self) -> ProbeResult<SmtpReply> {
            let raw = self
                .queue
                .pop_front()
                .ok_or_else(|| ProbeError::protocol("nothing to read"))?;
            Ok(split_reply(&raw))
        }

        fn upgrade_tls(&mut self) -> ProbeResult<()> {
            Ok(())
        }

        fn close(&mut self) {}
    }
}
