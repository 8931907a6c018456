//! Shared test handler and packet builders.

use cyclone_dns_domain::{Destination, RecordClass, RecordType, ResponseCode};
use cyclone_dns_engine::wire::{encode_question, PacketView, PacketWriter};
use cyclone_dns_engine::{CycleContext, CycleStatus, DnsHandler, HandlerError};

/// Forwards the inbound question verbatim to one upstream server and relays
/// the first answer record back. Malformed questions get FORMERR, an
/// exhausted upstream gets SERVFAIL.
pub struct ForwardingHandler {
    pub upstream: Destination,
}

impl DnsHandler for ForwardingHandler {
    fn scratch_size(&self) -> usize {
        8
    }

    fn tick(
        &self,
        ctx: &mut CycleContext<'_>,
        scratch: &mut [u8],
        first: bool,
    ) -> Result<CycleStatus, HandlerError> {
        if first {
            if ctx.request().body_error().is_some() || ctx.request().question().is_none() {
                let rd = ctx.request().header().recursion_desired;
                let response = ctx.response();
                response.header.response = true;
                response.header.recursion_desired = rd;
                response.header.rcode = ResponseCode::FormErr.to_u8();
                return Ok(CycleStatus::Returned);
            }
            let question = ctx.request().question_section().to_vec();
            let mut query = PacketWriter::new();
            query.header.recursion_desired = true;
            query.header.qdcount = 1;
            query.append_question(&question)?;
            let id = ctx.send_upstream(self.upstream, query)?;
            scratch[..8].copy_from_slice(&id.as_u64().to_be_bytes());
            return Ok(CycleStatus::Poll(id));
        }

        let rd = ctx.request().header().recursion_desired;
        let question = ctx.request().question_section().to_vec();

        if ctx.failure().is_some() {
            let response = ctx.response();
            response.header.response = true;
            response.header.recursion_desired = rd;
            response.header.recursion_available = true;
            response.header.rcode = ResponseCode::ServFail.to_u8();
            response.header.qdcount = 1;
            response.append_question(&question)?;
            return Ok(CycleStatus::Returned);
        }

        let (rcode, record) = {
            let reply = ctx.reply().ok_or("resumed without reply or failure")?;
            (reply.header().rcode, reply.record_bytes().map(<[u8]>::to_vec))
        };
        let response = ctx.response();
        response.header.response = true;
        response.header.recursion_desired = rd;
        response.header.recursion_available = true;
        response.header.rcode = rcode;
        response.header.qdcount = 1;
        response.append_question(&question)?;
        if let Some(record) = record {
            response.header.ancount = 1;
            response.append_record(&record)?;
        }
        Ok(CycleStatus::Returned)
    }
}

/// One-question A/IN query with the given header id.
pub fn build_query(id: u16, name: &str) -> Vec<u8> {
    let mut writer = PacketWriter::new();
    writer.header.id = id;
    writer.header.recursion_desired = true;
    writer.header.qdcount = 1;
    let question = encode_question(name, RecordType::A, RecordClass::IN).unwrap();
    writer.append_question(&question).unwrap();
    writer.finish()
}

/// The reply a well-behaved upstream would send for `query`: same id, same
/// question, one A record pointing at 192.0.2.1.
pub fn build_reply(query: &[u8]) -> Vec<u8> {
    let view = PacketView::parse(query.to_vec()).unwrap();

    let mut record = vec![0xC0, 0x0C];
    record.extend_from_slice(&RecordType::A.to_u16().to_be_bytes());
    record.extend_from_slice(&RecordClass::IN.to_u16().to_be_bytes());
    record.extend_from_slice(&3600u32.to_be_bytes());
    record.extend_from_slice(&4u16.to_be_bytes());
    record.extend_from_slice(&[192, 0, 2, 1]);

    let mut writer = PacketWriter::new();
    writer.header.id = view.header().id;
    writer.header.response = true;
    writer.header.recursion_desired = view.header().recursion_desired;
    writer.header.recursion_available = true;
    writer.header.qdcount = 1;
    writer.header.ancount = 1;
    writer.append_question(view.question_section()).unwrap();
    writer.append_record(&record).unwrap();
    writer.finish()
}
