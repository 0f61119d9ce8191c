use std::io::BufRead;

use crate::error::SimError;

/// Control-flow hint attached to a fetch, used to maintain the shadow call
/// stack and to attribute invocations to the right callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    None,
    DirectCall,
    IndirectCall,
    DirectJump,
    IndirectJump,
    Return,
    Syscall,
}

impl ControlFlow {
    fn parse(token: &str) -> Option<ControlFlow> {
        Some(match token {
            "none" => ControlFlow::None,
            "call" => ControlFlow::DirectCall,
            "icall" => ControlFlow::IndirectCall,
            "jmp" => ControlFlow::DirectJump,
            "ijmp" => ControlFlow::IndirectJump,
            "ret" => ControlFlow::Return,
            "syscall" => ControlFlow::Syscall,
            _ => return None,
        })
    }
}

/// One instruction fetch from the trace. When the previous event was a
/// call, `addr` of this event doubles as the entered function's identity.
#[derive(Debug, Clone, Copy)]
pub struct FetchEvent {
    pub addr: u64,
    pub size: u32,
    pub thread_id: u32,
    pub control_flow: ControlFlow,
}

/// Source of fetch events, implemented by `TextTraceReader` for file-backed
/// runs and fakeable in tests by any type that yields `FetchEvent`s.
pub trait FetchSource {
    fn next_fetch(&mut self) -> Result<Option<FetchEvent>, SimError>;
}

/// Reads whitespace/comma-separated fetch records, one per line, of the form
/// `addr size thread_id [control_flow [target]]`. `addr`/`size`/`target` may
/// be given in hex (`0x...`) or decimal.
pub struct TextTraceReader<R> {
    reader: R,
    line_no: usize,
}

impl<R: BufRead> TextTraceReader<R> {
    pub fn new(reader: R) -> Self {
        TextTraceReader { reader, line_no: 0 }
    }

    fn parse_int(text: &str) -> Option<u64> {
        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16).ok()
        } else {
            text.parse().ok()
        }
    }
}

impl<R: BufRead> FetchSource for TextTraceReader<R> {
    fn next_fetch(&mut self) -> Result<Option<FetchEvent>, SimError> {
        loop {
            let mut line = String::new();
            let bytes_read = self.reader.read_line(&mut line)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split([' ', ',', '\t']).filter(|f| !f.is_empty()).collect();
            if fields.len() < 3 {
                return Err(SimError::MalformedTraceLine { line_no: self.line_no, text: trimmed.to_string() });
            }

            let malformed = || SimError::MalformedTraceLine { line_no: self.line_no, text: trimmed.to_string() };

            let addr = Self::parse_int(fields[0]).ok_or_else(malformed)?;
            let size: u32 = fields[1].parse().map_err(|_| malformed())?;
            let thread_id: u32 = fields[2].parse().map_err(|_| malformed())?;

            let control_flow = match fields.get(3) {
                Some(token) => ControlFlow::parse(token).ok_or_else(malformed)?,
                None => ControlFlow::None,
            };

            return Ok(Some(FetchEvent { addr, size, thread_id, control_flow }));
        }
    }
}
