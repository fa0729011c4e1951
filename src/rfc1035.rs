//! Base structures for DNS messages. Taken from https://datatracker.ietf.org/doc/html/rfc1035
//!
//! The decoder keeps record types and classes as raw u16 so unknown codes
//! survive a decode/encode round trip; the QType/QClass enums exist for
//! query building and display.
use std::fmt;

use crate::derive_enum;
use crate::error::{DnsError, ProbeResult};

// DNS packets are called "messages" in RFC1035:
// "All communications inside of the domain protocol are carried in a single format called a message"
pub const MAX_DNS_PACKET_SIZE: usize = 512;

// limits from RFC1035 section 2.3.4
pub const MAX_LABEL_LENGTH: usize = 63;
pub const MAX_DOMAIN_NAME_LENGTH: usize = 255;

// Named bitmasks for the header flags word:
//                                1  1  1  1  1  1
//  0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
// |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
pub mod flags {
    pub const QR: u16 = 0b1000_0000_0000_0000;
    pub const OPCODE: u16 = 0b0111_1000_0000_0000;
    pub const AA: u16 = 0b0000_0100_0000_0000;
    pub const TC: u16 = 0b0000_0010_0000_0000;
    pub const RD: u16 = 0b0000_0001_0000_0000;
    pub const RA: u16 = 0b0000_0000_1000_0000;
    pub const Z: u16 = 0b0000_0000_0111_0000;
    pub const RCODE: u16 = 0b0000_0000_0000_1111;
}

// DNS packet header: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DnsHeader {
    pub id: u16, // A 16 bit identifier assigned by the program that
    //   generates any kind of query.  This identifier is copied
    //   the corresponding reply and can be used by the requester
    //   to match up replies to outstanding queries.
    pub flags: u16, // QR, OPCODE, AA, TC, RD, RA, Z and RCODE packed in network order
    pub qd_count: u16, // an unsigned 16 bit integer specifying the number of
    //    entries in the question section.
    pub an_count: u16, // an unsigned 16 bit integer specifying the number of
    // resource records in the answer section.
    pub ns_count: u16, // an unsigned 16 bit integer specifying the number of name
    // server resource records in the authority records section.
    pub ar_count: u16, // an unsigned 16 bit integer specifying the number of
                       // resource records in the additional records section.
}

impl DnsHeader {
    pub fn is_response(&self) -> bool {
        self.flags & flags::QR != 0
    }

    pub fn opcode(&self) -> u16 {
        (self.flags & flags::OPCODE) >> 11
    }

    pub fn is_authoritative(&self) -> bool {
        self.flags & flags::AA != 0
    }

    pub fn is_truncated(&self) -> bool {
        self.flags & flags::TC != 0
    }

    pub fn recursion_desired(&self) -> bool {
        self.flags & flags::RD != 0
    }

    pub fn recursion_available(&self) -> bool {
        self.flags & flags::RA != 0
    }

    pub fn z(&self) -> u16 {
        (self.flags & flags::Z) >> 4
    }

    pub fn response_code(&self) -> u16 {
        self.flags & flags::RCODE
    }
}

impl fmt::Display for DnsHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id:{:X}({}) ", self.id, self.id)?;

        if self.is_response() {
            let rcode = match ResponseCode::try_from(self.response_code()) {
                Ok(rc) => format!("{:?}", rc),
                Err(_) => self.response_code().to_string(),
            };
            write!(
                f,
                "RESPONSE opcode:{} tc:{} ra:{} rcode:{} ",
                self.opcode(),
                self.is_truncated(),
                self.recursion_available(),
                rcode
            )?;
        } else {
            write!(
                f,
                "QUERY opcode:{} rd:{} ",
                self.opcode(),
                self.recursion_desired()
            )?;
        }

        write!(
            f,
            "qd:{} an:{} ns:{} ar:{}",
            self.qd_count, self.an_count, self.ns_count, self.ar_count
        )
    }
}

// response codes: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-6
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u16)]
pub enum ResponseCode {
    NoError = 0,  // No Error	[RFC1035]
    FormErr = 1,  // Format Error	[RFC1035]
    ServFail = 2, // Server Failure	[RFC1035]
    NXDomain = 3, // Non-Existent Domain	[RFC1035]
    NotImp = 4,   // Not Implemented	[RFC1035]
    Refused = 5,  // Query Refused	[RFC1035]
}

derive_enum!(
    ResponseCode,
    [NoError, FormErr, ServFail, NXDomain, NotImp, Refused]
);

// RR type codes, trimmed to the ones this toolkit meets:
// https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-4
#[derive(Debug, Copy, Clone, PartialEq)]
#[repr(u16)]
pub enum QType {
    A = 1,      // a host address	[RFC1035]
    NS = 2,     // an authoritative name server	[RFC1035]
    CNAME = 5,  // the canonical name for an alias	[RFC1035]
    SOA = 6,    // marks the start of a zone of authority	[RFC1035]
    PTR = 12,   // a domain name pointer	[RFC1035]
    MX = 15,    // mail exchange	[RFC1035]
    TXT = 16,   // text strings	[RFC1035]
    AAAA = 28,  // IP6 Address	[RFC3596]
    SRV = 33,   // Server Selection	[RFC2782]
    OPT = 41,   // OPT pseudo-RR	[RFC6891]
    ANY = 255,  // A request for some or all records the server has available	[RFC1035]
}

derive_enum!(QType, [A, NS, CNAME, SOA, PTR, MX, TXT, AAAA, SRV, OPT, ANY]);

// RR Class values: https://datatracker.ietf.org/doc/html/rfc1035#section-3.2.4
#[derive(Debug, Copy, Clone, PartialEq)]
#[repr(u16)]
pub enum QClass {
    IN = 1, // the Internet
    CS = 2, // the CSNET class (Obsolete - used only for examples in some obsolete RFCs)
    CH = 3, // the CHAOS class
    HS = 4, // Hesiod [Dyer 87]
    ANY = 255,
}

derive_enum!(QClass, [IN, CS, CH, HS, ANY]);

// Domain name: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.4
//
// Labels are opaque bytes on the wire; each byte is widened to a char so any
// value survives a decode (case and non-printable bytes are preserved).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DomainName(pub Vec<String>);

impl DomainName {
    /// The root name is the single zero byte on the wire and displays empty.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the dotted representation.
    pub fn dotted_len(&self) -> usize {
        if self.0.is_empty() {
            return 0;
        }
        // labels hold one wire byte per char
        self.0.iter().map(|l| l.chars().count()).sum::<usize>() + self.0.len() - 1
    }
}

/// ```
/// use probelib::rfc1035::DomainName;
///
/// let dn = DomainName::try_from("www.example.com").unwrap();
/// assert_eq!(dn.0, &["www", "example", "com"]);
/// assert_eq!(dn.to_string(), "www.example.com");
///
/// let root = DomainName::try_from(".").unwrap();
/// assert!(root.is_root());
///
/// assert!(DomainName::try_from("").is_err());
/// ```
impl TryFrom<&str> for DomainName {
    type Error = DnsError;

    fn try_from(domain: &str) -> Result<Self, Self::Error> {
        // safeguard
        if domain.is_empty() {
            return Err(DnsError::MalformedName);
        }

        // handle case for root domain
        let labels: Vec<String> = if domain == "." {
            Vec::new()
        } else {
            domain
                .split('.')
                .filter(|x| !x.is_empty())
                .map(String::from)
                .collect()
        };

        if labels.iter().any(|l| l.chars().count() > MAX_LABEL_LENGTH) {
            return Err(DnsError::MalformedName);
        }

        let dn = DomainName(labels);
        if dn.dotted_len() > MAX_DOMAIN_NAME_LENGTH {
            return Err(DnsError::MalformedName);
        }

        Ok(dn)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

//--------------------------------------------------------------------------------
// Question structure: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.2
//--------------------------------------------------------------------------------
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DnsQuestion {
    pub name: DomainName,
    pub qtype: u16,
    pub qclass: u16,
}

impl DnsQuestion {
    /// Create a new question. By default, the IN class is used if None is provided
    /// as the qclass parameter
    pub fn new(domain: &str, qtype: QType, qclass: Option<QClass>) -> ProbeResult<Self> {
        let dn = DomainName::try_from(domain)?;
        let question = DnsQuestion {
            name: dn,
            qtype: qtype as u16,
            qclass: qclass.unwrap_or(QClass::IN) as u16,
        };

        Ok(question)
    }
}

impl fmt::Display for DnsQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let qtype = match QType::try_from(self.qtype) {
            Ok(qt) => format!("{:?}", qt),
            Err(_) => self.qtype.to_string(),
        };
        write!(
            f,
            "domain:{} qtype:{} class:{}",
            self.name, qtype, self.qclass
        )
    }
}

//------------------------------------------------------------------------
// Definition of a resource record in the RFC1035
//------------------------------------------------------------------------
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DnsResourceRecord {
    pub name: DomainName, // an owner name, i.e., the name of the node to which this resource record pertains.
    pub r#type: u16,      // two octets containing one of the RR TYPE codes.
    pub class: u16,       // two octets containing one of the RR CLASS codes.
    pub ttl: u32, // a 32 bit unsigned integer that specifies the time interval
    // that the resource record may be cached before the source
    // of the information should again be consulted.
    pub rdata: Vec<u8>, // a variable length string of octets that describes the
                        // resource. RDLENGTH is not kept separately: it is rdata.len().
}

impl DnsResourceRecord {
    pub fn rd_length(&self) -> u16 {
        self.rdata.len() as u16
    }
}

impl fmt::Display for DnsResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rtype = match QType::try_from(self.r#type) {
            Ok(qt) => format!("{:?}", qt),
            Err(_) => self.r#type.to_string(),
        };
        write!(
            f,
            "NAME:{} TYPE:{} CLASS:{} TTL:{} RDLENGTH={}",
            self.name,
            rtype,
            self.class,
            self.ttl,
            self.rd_length()
        )
    }
}

// A full message: header, then the four sections in wire order
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DnsMessage {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsResourceRecord>,
    pub authorities: Vec<DnsResourceRecord>,
    pub additionals: Vec<DnsResourceRecord>,
}
