//! The built-in forwarding handler.
//!
//! One cycle: relay the inbound question verbatim to the configured
//! upstream resolver, wait for the reply, and relay the reply's status and
//! first answer record back to the client.

use cyclone_dns_domain::{Destination, ResponseCode};
use cyclone_dns_engine::wire::PacketWriter;
use cyclone_dns_engine::{CycleContext, CycleStatus, DnsHandler, HandlerError};
use tracing::debug;

pub struct ForwardHandler {
    upstream: Destination,
}

impl ForwardHandler {
    pub fn new(upstream: Destination) -> Self {
        Self { upstream }
    }

    fn formerr(&self, ctx: &mut CycleContext<'_>) -> CycleStatus {
        let rd = ctx.request().header().recursion_desired;
        let response = ctx.response();
        response.header.response = true;
        response.header.recursion_desired = rd;
        response.header.rcode = ResponseCode::FormErr.to_u8();
        CycleStatus::Returned
    }
}

impl DnsHandler for ForwardHandler {
    fn scratch_size(&self) -> usize {
        // The awaited request id, for diagnostics across resumption ticks.
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
                debug!(
                    id = ctx.request().header().id,
                    "unusable question; answering FORMERR"
                );
                return Ok(self.formerr(ctx));
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

        if let Some(failure) = ctx.failure() {
            debug!(
                error = %failure,
                name = ctx.request().question_name().unwrap_or_default(),
                "upstream gave no answer; answering SERVFAIL"
            );
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

#[cfg(test)]
mod tests {
    use super::*;
    use cyclone_dns_domain::{RecordClass, RecordType};
    use cyclone_dns_engine::cycle::{CycleEngine, Transmit};
    use cyclone_dns_engine::wire::{encode_question, encode_record, PacketView};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn engine() -> CycleEngine {
        let upstream: Destination = "udp://198.51.100.1:53".parse().unwrap();
        CycleEngine::new(
            Arc::new(ForwardHandler::new(upstream)),
            8,
            8,
            Duration::from_millis(50),
            2,
        )
    }

    fn query(id: u16) -> Vec<u8> {
        let mut writer = PacketWriter::new();
        writer.header.id = id;
        writer.header.recursion_desired = true;
        writer.header.qdcount = 1;
        let question = encode_question("example.com", RecordType::A, RecordClass::IN).unwrap();
        writer.append_question(&question).unwrap();
        writer.finish()
    }

    #[test]
    fn relays_upstream_answer_with_original_id() {
        let engine = engine();
        let now = Instant::now();
        let peer = "127.0.0.1:5000".parse().unwrap();

        let out = engine.begin_cycle(0, peer, query(0x9999), now).unwrap();
        let upstream_query = match out.as_slice() {
            [Transmit::Upstream { packet, .. }] => packet.clone(),
            other => panic!("expected upstream transmit, got {other:?}"),
        };

        let sent = PacketView::parse(upstream_query).unwrap();
        let mut reply = PacketWriter::new();
        reply.header.id = sent.header().id;
        reply.header.response = true;
        reply.header.qdcount = 1;
        reply.header.ancount = 1;
        reply.append_question(sent.question_section()).unwrap();
        let record = encode_record(
            "example.com",
            RecordType::A,
            RecordClass::IN,
            60,
            &[203, 0, 113, 9],
        )
        .unwrap();
        reply.append_record(&record).unwrap();

        let out = engine.on_upstream_datagram(reply.finish(), now);
        let response = match out.as_slice() {
            [Transmit::Response { packet, .. }] => PacketView::parse(packet.clone()).unwrap(),
            other => panic!("expected response transmit, got {other:?}"),
        };
        assert_eq!(response.header().id, 0x9999);
        assert_eq!(response.header().ancount, 1);
        assert_eq!(response.record_data(), Some(&[203u8, 0, 113, 9][..]));
    }

    #[test]
    fn question_free_query_gets_formerr() {
        let engine = engine();
        let peer = "127.0.0.1:5000".parse().unwrap();

        let mut header_only = PacketWriter::new();
        header_only.header.id = 0x0E0E;
        let out = engine
            .begin_cycle(0, peer, header_only.finish(), Instant::now())
            .unwrap();
        let response = match out.as_slice() {
            [Transmit::Response { packet, .. }] => PacketView::parse(packet.clone()).unwrap(),
            other => panic!("expected response transmit, got {other:?}"),
        };
        assert_eq!(response.header().id, 0x0E0E);
        assert_eq!(
            response.header().response_code(),
            Some(ResponseCode::FormErr)
        );
    }
}
