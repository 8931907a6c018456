use super::header::{PacketHeader, HEADER_LEN};
use super::WireError;

/// Offsets of the first question entry within the packet bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionView {
    /// Start of the name labels.
    pub name_offset: usize,
    /// Offset just past the name terminator.
    pub name_end: usize,
    pub qtype: u16,
    pub qclass: u16,
    /// Offset just past the class field.
    pub end: usize,
}

/// Offsets of the first resource record within the packet bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordView {
    pub name_offset: usize,
    pub rtype: u16,
    pub rclass: u16,
    pub ttl: u32,
    pub rdlength: u16,
    /// Start of the type-specific data.
    pub rdata_offset: usize,
    /// Offset just past the data.
    pub end: usize,
}

/// Owned packet bytes plus typed views into them.
///
/// Exposes the first question and the first record; the remaining entries
/// are walked only to validate that the declared counts fit the buffer.
/// Views are byte offsets, so they stay valid however the buffer moves.
#[derive(Debug, Clone)]
pub struct PacketView {
    buf: Vec<u8>,
    header: PacketHeader,
    question: Option<QuestionView>,
    questions_end: usize,
    record: Option<RecordView>,
    body_error: Option<WireError>,
}

impl PacketView {
    /// Parses a packet, rejecting any header or body defect.
    pub fn parse(bytes: Vec<u8>) -> Result<Self, WireError> {
        let view = Self::parse_lenient(bytes)?;
        if let Some(err) = &view.body_error {
            return Err(err.clone());
        }
        Ok(view)
    }

    /// Parses a packet whose header must decode but whose body may not.
    ///
    /// A body defect is recorded in [`body_error`](Self::body_error) instead
    /// of failing the parse, so a handler can still see the inbound id and
    /// answer with FORMERR.
    pub fn parse_lenient(bytes: Vec<u8>) -> Result<Self, WireError> {
        let header = PacketHeader::decode(&bytes)?;
        let mut view = Self {
            buf: bytes,
            header,
            question: None,
            questions_end: HEADER_LEN,
            record: None,
            body_error: None,
        };
        if let Err(err) = view.walk_body() {
            view.body_error = Some(err);
        }
        Ok(view)
    }

    fn walk_body(&mut self) -> Result<(), WireError> {
        let mut pos = HEADER_LEN;

        for i in 0..self.header.qdcount {
            let name_offset = pos;
            let name_end = skip_name(&self.buf, pos)?;
            let end = name_end + 4;
            if end > self.buf.len() {
                return Err(WireError::Malformed("question fields beyond packet end"));
            }
            if i == 0 {
                self.question = Some(QuestionView {
                    name_offset,
                    name_end,
                    qtype: u16::from_be_bytes([self.buf[name_end], self.buf[name_end + 1]]),
                    qclass: u16::from_be_bytes([self.buf[name_end + 2], self.buf[name_end + 3]]),
                    end,
                });
            }
            pos = end;
        }
        self.questions_end = pos;

        let record_count = self.header.ancount as usize
            + self.header.nscount as usize
            + self.header.arcount as usize;
        for i in 0..record_count {
            let name_offset = pos;
            let name_end = skip_name(&self.buf, pos)?;
            let fixed_end = name_end + 10;
            if fixed_end > self.buf.len() {
                return Err(WireError::Malformed("record fields beyond packet end"));
            }
            let rdlength = u16::from_be_bytes([self.buf[name_end + 8], self.buf[name_end + 9]]);
            let end = fixed_end + rdlength as usize;
            if end > self.buf.len() {
                return Err(WireError::Malformed("record data beyond packet end"));
            }
            if i == 0 {
                self.record = Some(RecordView {
                    name_offset,
                    rtype: u16::from_be_bytes([self.buf[name_end], self.buf[name_end + 1]]),
                    rclass: u16::from_be_bytes([self.buf[name_end + 2], self.buf[name_end + 3]]),
                    ttl: u32::from_be_bytes([
                        self.buf[name_end + 4],
                        self.buf[name_end + 5],
                        self.buf[name_end + 6],
                        self.buf[name_end + 7],
                    ]),
                    rdlength,
                    rdata_offset: fixed_end,
                    end,
                });
            }
            pos = end;
        }
        Ok(())
    }

    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    pub fn question(&self) -> Option<&QuestionView> {
        self.question.as_ref()
    }

    pub fn record(&self) -> Option<&RecordView> {
        self.record.as_ref()
    }

    pub fn body_error(&self) -> Option<&WireError> {
        self.body_error.as_ref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// All question entries, pre-encoded, ready for verbatim re-append.
    pub fn question_section(&self) -> &[u8] {
        &self.buf[HEADER_LEN..self.questions_end]
    }

    /// The first record's full entry bytes (name through data).
    pub fn record_bytes(&self) -> Option<&[u8]> {
        let record = self.record.as_ref()?;
        Some(&self.buf[record.name_offset..record.end])
    }

    /// The first record's type-specific data.
    pub fn record_data(&self) -> Option<&[u8]> {
        let record = self.record.as_ref()?;
        Some(&self.buf[record.rdata_offset..record.end])
    }

    /// Dotted-label rendering of the first question's name, for logging.
    /// Compressed names yield `None`.
    pub fn question_name(&self) -> Option<String> {
        let question = self.question.as_ref()?;
        let mut labels = Vec::new();
        let mut pos = question.name_offset;
        loop {
            let len = *self.buf.get(pos)? as usize;
            if len == 0 {
                break;
            }
            if len & 0xC0 != 0 {
                return None;
            }
            let label = self.buf.get(pos + 1..pos + 1 + len)?;
            labels.push(String::from_utf8_lossy(label).into_owned());
            pos += 1 + len;
        }
        Some(labels.join("."))
    }
}

/// Advances past one encoded name, returning the offset just beyond it.
///
/// A compression pointer (top two bits set) terminates the name in two
/// bytes; the target is not chased because the engine relays names verbatim
/// rather than expanding them.
pub fn skip_name(buf: &[u8], mut pos: usize) -> Result<usize, WireError> {
    loop {
        let len = *buf
            .get(pos)
            .ok_or(WireError::Malformed("name runs past packet end"))? as usize;
        if len == 0 {
            return Ok(pos + 1);
        }
        if len & 0xC0 == 0xC0 {
            if pos + 2 > buf.len() {
                return Err(WireError::Malformed("truncated compression pointer"));
            }
            return Ok(pos + 2);
        }
        if len & 0xC0 != 0 {
            return Err(WireError::Malformed("reserved label type"));
        }
        pos += 1 + len;
        if pos > buf.len() {
            return Err(WireError::Malformed("label runs past packet end"));
        }
    }
}
