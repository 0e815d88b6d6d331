use stackdb_base::{protocol, Result};

use crate::message::{Kind, Message};

/// Maximum encoded line length including the terminating `\n` (§4.1).
pub const MAX_LINE_LEN: usize = 1024;

/// Encodes a `Message` as `KIND[ arg ...]\n`. Validates the message first so
/// a caller can never hand an invalid message to a client.
pub fn encode(msg: &Message) -> Result<String> {
    msg.validate()?;
    let mut out = String::from(msg.kind.as_str());
    if !msg.args.is_empty() {
        out.push(' ');
        out.push_str(&msg.args.join(" "));
    }
    out.push('\n');
    if out.len() > MAX_LINE_LEN {
        return Err(protocol("encoded message too long"));
    }
    Ok(out)
}

/// Decodes one raw line, `raw` including its trailing `\n`, into a `Message`.
/// The line transport (`stackdb-net`) is responsible for handing over
/// exactly one line at a time; this function owns all the framing and
/// shape validation the wire format requires.
pub fn decode(raw: &str) -> Result<Message> {
    if raw.len() > MAX_LINE_LEN {
        return Err(protocol("line exceeds 1024 bytes"));
    }
    if !raw.ends_with('\n') {
        return Err(protocol("line not terminated by newline"));
    }
    let body = &raw[..raw.len() - 1];

    let mut tokens = body.split(' ').filter(|t| !t.is_empty());
    let kind_tok = tokens.next().ok_or_else(|| protocol("empty message"))?;
    let kind =
        Kind::parse(kind_tok).ok_or_else(|| protocol(format!("unknown message kind {kind_tok:?}")))?;

    let args: Vec<String> = if matches!(kind, Kind::Failed | Kind::Error) {
        let rest: Vec<&str> = tokens.collect();
        if rest.is_empty() {
            vec![]
        } else {
            vec![rest.join(" ").replace('"', "")]
        }
    } else {
        tokens.map(str::to_string).collect()
    };

    let msg = Message { kind, args };
    msg.validate()?;
    Ok(msg)
}
