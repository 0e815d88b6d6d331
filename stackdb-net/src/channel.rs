use std::io::{BufReader, Read, Write};
use std::net::TcpStream;

use stackdb_base::Result;
use stackdb_proto::MAX_LINE_LEN;

/// The per-connection transport a session drives (§6): read one line, write
/// one line. The core depends only on this trait, never on `TcpStream`
/// directly, so it can be driven against an in-memory mock in tests.
pub trait LineChannel: Send {
    /// Reads the next line, including its trailing `\n` when one arrives.
    /// Returns `Ok(None)` on a clean EOF with no partial line pending.
    fn read_line(&mut self) -> Result<Option<String>>;
    fn write_line(&mut self, line: &str) -> Result<()>;
    fn peer(&self) -> String;
}

/// A buffered line channel over a `TcpStream`. Reads are capped just past
/// `MAX_LINE_LEN` so a peer that never sends `\n` cannot grow the read
/// buffer without bound -- the oversize line is still handed to the codec,
/// which rejects it with the documented `ERROR`.
pub struct TcpLineChannel {
    peer: String,
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl TcpLineChannel {
    pub fn new(stream: TcpStream) -> Result<Self> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let writer = stream.try_clone()?;
        Ok(TcpLineChannel { peer, reader: BufReader::new(stream), writer })
    }
}

impl LineChannel for TcpLineChannel {
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = self.reader.read(&mut byte)?;
            if n == 0 {
                break; // EOF
            }
            buf.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
            if buf.len() > MAX_LINE_LEN {
                // Clearly oversize and still no newline: stop reading and
                // let the codec reject what we have rather than buffering
                // an unbounded amount from a misbehaving peer.
                break;
            }
        }
        if buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }
}
