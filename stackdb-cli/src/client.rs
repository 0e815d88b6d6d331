use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use stackdb_base::{protocol, Result};
use stackdb_proto::{decode, encode, Kind, Message};

/// A synchronous client over the same line protocol the server speaks,
/// shared by the three command-line front-ends (§4.10). One send/await
/// method per request kind, mirroring the original source's
/// `client_helper` module.
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    pub fn connect(host: &str, port: u16) -> Result<Client> {
        let stream = TcpStream::connect((host, port))?;
        let writer = stream.try_clone()?;
        Ok(Client { reader: BufReader::new(stream), writer })
    }

    fn roundtrip(&mut self, request: &Message) -> Result<Message> {
        let line = encode(request)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        let mut raw = String::new();
        let n = self.reader.read_line(&mut raw)?;
        if n == 0 {
            return Err(protocol("connection closed by server"));
        }
        let response = decode(&raw)?;
        match response.kind {
            Kind::Failed | Kind::Error => Err(protocol(response.text().to_string())),
            _ => Ok(response),
        }
    }

    pub fn login(&mut self, username: &str) -> Result<()> {
        self.roundtrip(&Message::login(username)).map(|_| ())
    }

    pub fn get(&mut self, table: &str, key: &str) -> Result<()> {
        self.roundtrip(&Message::get(table, key)).map(|_| ())
    }

    pub fn top(&mut self) -> Result<String> {
        let response = self.roundtrip(&Message::top())?;
        Ok(response.value().to_string())
    }

    pub fn push(&mut self, value: &str) -> Result<()> {
        self.roundtrip(&Message::push(value)).map(|_| ())
    }

    pub fn set(&mut self, table: &str, key: &str) -> Result<()> {
        self.roundtrip(&Message::set(table, key)).map(|_| ())
    }

    pub fn begin(&mut self) -> Result<()> {
        self.roundtrip(&Message::begin()).map(|_| ())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.roundtrip(&Message::commit()).map(|_| ())
    }

    pub fn add(&mut self) -> Result<()> {
        self.roundtrip(&Message::add()).map(|_| ())
    }

    /// Best-effort: a failed BYE doesn't change the exit code, matching the
    /// original clients' fire-and-forget `rio_writen` of "BYE\n".
    pub fn bye(&mut self) {
        let _ = self.roundtrip(&Message::bye());
    }
}
