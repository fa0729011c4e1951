//! A DNS resource query
use std::net::UdpSocket;

use log::debug;
use rand::Rng;

use crate::error::ProbeResult;
use crate::format_buffer;
use crate::network_order::ToNetworkOrder;
use crate::rfc1035::{flags, DnsHeader, DnsQuestion};

#[derive(Debug)]
pub struct DnsQuery {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
}

impl Default for DnsQuery {
    fn default() -> Self {
        let mut header = DnsHeader::default();

        // create a random ID
        let mut rng = rand::thread_rng();
        header.id = rng.gen::<u16>();

        // a standard recursive query; all other flag fields stay zero
        header.flags = flags::RD;

        Self {
            header,
            questions: Vec::new(),
        }
    }
}

impl DnsQuery {
    // Add another question into the list of questions to send
    pub fn push_question(&mut self, question: DnsQuestion) {
        self.questions.push(question);

        // as we add a question, we need to increment the counter
        self.header.qd_count += 1;
    }

    // Send the query through the wire
    pub fn send(&self, socket: &UdpSocket, endpoint: &str) -> ProbeResult<()> {
        // convert to network bytes
        let mut buffer: Vec<u8> = Vec::new();
        self.to_network_bytes(&mut buffer)?;
        debug!("query buffer: {}", format_buffer!("X", &buffer));

        // send packet through the wire
        let dest = format!("{}:53", endpoint);
        debug!("destination: {}", dest);
        socket.send_to(&buffer, &dest)?;

        Ok(())
    }
}

impl ToNetworkOrder for DnsQuery {
    fn to_network_bytes(&self, buffer: &mut Vec<u8>) -> std::io::Result<usize> {
        let mut length = self.header.to_network_bytes(buffer)?;
        for question in &self.questions {
            length += question.to_network_bytes(buffer)?;
        }
        Ok(length)
    }
}
