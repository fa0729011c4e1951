//! SMTP reply framing and classification (RFC5321 section 4.2).

/// One complete server reply: one or more lines, each starting with a 3-digit
/// code. Continuation lines carry a `-` in column 4; the final line a space.
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    /// Assemble a reply from raw lines, CRLF already stripped. The code is
    /// taken from the final line.
    pub fn from_lines(lines: Vec<String>) -> Self {
        let code = lines.last().map(|l| parse_code(l)).unwrap_or(0);
        SmtpReply { code, lines }
    }

    /// The concatenated reply.
    pub fn text(&self) -> String {
        self.lines.join("\r\n")
    }

    // 2xx and 3xx are non-error
    pub fn is_positive(&self) -> bool {
        (200..400).contains(&self.code)
    }

    // 3xx asks for more input
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    // 4xx is worth another try
    pub fn is_transient(&self) -> bool {
        (400..500).contains(&self.code)
    }

    // 5xx is final
    pub fn is_permanent(&self) -> bool {
        self.code >= 500
    }

    /// Collect the mechanisms of `250-AUTH <m1> <m2> ...` capability lines,
    /// uppercased.
    pub fn auth_mechanisms(&self) -> Vec<String> {
        let mut mechanisms = Vec::new();

        for line in &self.lines {
            // skip the code and its separator
            let body = match line.get(4..) {
                Some(body) => body.to_uppercase(),
                None => continue,
            };
            if let Some(rest) = body.strip_prefix("AUTH ") {
                mechanisms.extend(rest.split_whitespace().map(String::from));
            }
        }

        mechanisms
    }
}

/// First 3 ASCII digits of a reply line, 0 if unparseable.
pub fn parse_code(line: &str) -> u16 {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return 0;
    }
    line[..3].parse().unwrap_or(0)
}

/// A line terminates the reply unless column 4 holds a `-`.
pub fn is_final_line(line: &str) -> bool {
    line.as_bytes().get(3) != Some(&b'-')
}
