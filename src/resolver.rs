//! A-record resolution over UDP, going through the domains cache first.
use std::net::UdpSocket;
use std::time::Duration;

use log::debug;

use crate::cache::DomainsCache;
use crate::error::{DnsError, ProbeError, ProbeResult};
use crate::query::DnsQuery;
use crate::rfc1035::{DnsMessage, DnsQuestion, QClass, QType, MAX_DNS_PACKET_SIZE};

pub struct Resolver {
    server: String,
    timeout: Duration,
    cache: DomainsCache,
}

impl Resolver {
    pub fn new(server: &str, timeout: Duration, cache_ttl: Duration) -> Self {
        Resolver {
            server: String::from(server),
            timeout,
            cache: DomainsCache::new(cache_ttl),
        }
    }

    pub fn cache(&self) -> &DomainsCache {
        &self.cache
    }

    /// Resolve a name to a dotted-quad address. A fresh answer replaces the
    /// cached one; a cache hit skips the wire entirely.
    pub fn resolve(&self, domain: &str) -> ProbeResult<Option<String>> {
        if let Some(address) = self.cache.lookup(domain) {
            debug!("cache hit: {} -> {}", domain, address);
            return Ok(Some(address));
        }

        // bind to an ephemeral local port
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_read_timeout(Some(self.timeout))?;

        let mut query = DnsQuery::default();
        query.push_question(DnsQuestion::new(domain, QType::A, None)?);
        query.send(&socket, &self.server)?;

        // receive packet from endpoint
        let mut buf = [0u8; MAX_DNS_PACKET_SIZE];
        let received = socket.recv(&mut buf)?;
        let message = DnsMessage::from_bytes(&buf[..received])?;
        debug!("response header: {}", message.header);

        // a reply to someone else's question is worthless
        if message.header.id != query.header.id {
            return Err(ProbeError::protocol("DNS reply id mismatch"));
        }

        match first_a_address(&message)? {
            Some(address) => {
                self.cache.insert(domain, &address);
                Ok(Some(address))
            }
            None => Ok(None),
        }
    }
}

// scan the answer section for the first A/IN record
fn first_a_address(message: &DnsMessage) -> ProbeResult<Option<String>> {
    for answer in &message.answers {
        if answer.r#type != QType::A as u16 || answer.class != QClass::IN as u16 {
            continue;
        }
        if answer.rdata.len() != 4 {
            return Err(DnsError::MalformedRR.into());
        }
        return Ok(Some(format!(
            "{}.{}.{}.{}",
            answer.rdata[0], answer.rdata[1], answer.rdata[2], answer.rdata[3]
        )));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc1035::DnsResourceRecord;

    fn a_record(rdata: &[u8]) -> DnsResourceRecord {
        DnsResourceRecord {
            r#type: QType::A as u16,
            class: QClass::IN as u16,
            ttl: 60,
            rdata: rdata.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn first_a_address_picks_the_first_a_record() {
        let mut message = DnsMessage::default();
        // a CNAME-ish record first, then two A records
        message.answers.push(DnsResourceRecord {
            r#type: QType::CNAME as u16,
            class: QClass::IN as u16,
            ..Default::default()
        });
        message.answers.push(a_record(&[93, 184, 216, 34]));
        message.answers.push(a_record(&[192, 0, 2, 1]));

        assert_eq!(
            first_a_address(&message).unwrap().as_deref(),
            Some("93.184.216.34")
        );
    }

    #[test]
    fn short_a_rdata_is_malformed() {
        let mut message = DnsMessage::default();
        message.answers.push(a_record(&[127, 0, 1]));

        let err = first_a_address(&message).unwrap_err();
        assert!(matches!(err, ProbeError::Dns(DnsError::MalformedRR)));
    }

    #[test]
    fn no_a_record_is_a_miss() {
        let message = DnsMessage::default();
        assert_eq!(first_a_address(&message).unwrap(), None);
    }
}
