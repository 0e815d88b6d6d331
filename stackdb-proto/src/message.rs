use stackdb_base::{protocol, Result};

use crate::ident::{is_identifier, is_value};

/// The closed set of request/response kinds (§6). `Kind::as_str`/`Kind::parse`
/// are the wire-level name table.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Kind {
    Login,
    Create,
    Push,
    Pop,
    Top,
    Set,
    Get,
    Add,
    Sub,
    Mul,
    Div,
    Begin,
    Commit,
    Bye,
    Ok,
    Data,
    Failed,
    Error,
}

/// The argument shape a Kind requires, used by both decode-time validation
/// and by any caller constructing a Message directly.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Shape {
    Empty,
    Identifier,
    Value,
    TwoIdentifiers,
    Text,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Login => "LOGIN",
            Kind::Create => "CREATE",
            Kind::Push => "PUSH",
            Kind::Pop => "POP",
            Kind::Top => "TOP",
            Kind::Set => "SET",
            Kind::Get => "GET",
            Kind::Add => "ADD",
            Kind::Sub => "SUB",
            Kind::Mul => "MUL",
            Kind::Div => "DIV",
            Kind::Begin => "BEGIN",
            Kind::Commit => "COMMIT",
            Kind::Bye => "BYE",
            Kind::Ok => "OK",
            Kind::Data => "DATA",
            Kind::Failed => "FAILED",
            Kind::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Kind> {
        Some(match s {
            "LOGIN" => Kind::Login,
            "CREATE" => Kind::Create,
            "PUSH" => Kind::Push,
            "POP" => Kind::Pop,
            "TOP" => Kind::Top,
            "SET" => Kind::Set,
            "GET" => Kind::Get,
            "ADD" => Kind::Add,
            "SUB" => Kind::Sub,
            "MUL" => Kind::Mul,
            "DIV" => Kind::Div,
            "BEGIN" => Kind::Begin,
            "COMMIT" => Kind::Commit,
            "BYE" => Kind::Bye,
            "OK" => Kind::Ok,
            "DATA" => Kind::Data,
            "FAILED" => Kind::Failed,
            "ERROR" => Kind::Error,
            _ => return None,
        })
    }

    fn shape(self) -> Shape {
        match self {
            Kind::Login | Kind::Create => Shape::Identifier,
            Kind::Push | Kind::Data => Shape::Value,
            Kind::Pop
            | Kind::Top
            | Kind::Add
            | Kind::Sub
            | Kind::Mul
            | Kind::Div
            | Kind::Begin
            | Kind::Commit
            | Kind::Bye
            | Kind::Ok => Shape::Empty,
            Kind::Set | Kind::Get => Shape::TwoIdentifiers,
            Kind::Failed | Kind::Error => Shape::Text,
        }
    }
}

/// A tagged request or response: a `Kind` plus its ordered arguments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub kind: Kind,
    pub args: Vec<String>,
}

impl Message {
    pub fn login(username: impl Into<String>) -> Message {
        Message { kind: Kind::Login, args: vec![username.into()] }
    }

    pub fn create(table: impl Into<String>) -> Message {
        Message { kind: Kind::Create, args: vec![table.into()] }
    }

    pub fn push(value: impl Into<String>) -> Message {
        Message { kind: Kind::Push, args: vec![value.into()] }
    }

    pub fn pop() -> Message {
        Message { kind: Kind::Pop, args: vec![] }
    }

    pub fn top() -> Message {
        Message { kind: Kind::Top, args: vec![] }
    }

    pub fn set(table: impl Into<String>, key: impl Into<String>) -> Message {
        Message { kind: Kind::Set, args: vec![table.into(), key.into()] }
    }

    pub fn get(table: impl Into<String>, key: impl Into<String>) -> Message {
        Message { kind: Kind::Get, args: vec![table.into(), key.into()] }
    }

    pub fn add() -> Message {
        Message { kind: Kind::Add, args: vec![] }
    }

    pub fn sub() -> Message {
        Message { kind: Kind::Sub, args: vec![] }
    }

    pub fn mul() -> Message {
        Message { kind: Kind::Mul, args: vec![] }
    }

    pub fn div() -> Message {
        Message { kind: Kind::Div, args: vec![] }
    }

    pub fn begin() -> Message {
        Message { kind: Kind::Begin, args: vec![] }
    }

    pub fn commit() -> Message {
        Message { kind: Kind::Commit, args: vec![] }
    }

    pub fn bye() -> Message {
        Message { kind: Kind::Bye, args: vec![] }
    }

    pub fn ok() -> Message {
        Message { kind: Kind::Ok, args: vec![] }
    }

    pub fn data(value: impl Into<String>) -> Message {
        Message { kind: Kind::Data, args: vec![value.into()] }
    }

    pub fn failed(text: impl Into<String>) -> Message {
        Message { kind: Kind::Failed, args: vec![text.into()] }
    }

    pub fn error(text: impl Into<String>) -> Message {
        Message { kind: Kind::Error, args: vec![text.into()] }
    }

    pub fn table(&self) -> &str {
        &self.args[0]
    }

    pub fn key(&self) -> &str {
        &self.args[1]
    }

    pub fn value(&self) -> &str {
        &self.args[0]
    }

    pub fn text(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }

    /// Arity and argument-shape validation (§4.1). Called by both `decode`
    /// (on untrusted wire input) and `encode` (so a caller can never emit a
    /// malformed message).
    pub fn validate(&self) -> Result<()> {
        match self.kind.shape() {
            Shape::Empty => {
                if !self.args.is_empty() {
                    return Err(protocol(format!(
                        "{} takes no arguments",
                        self.kind.as_str()
                    )));
                }
            }
            Shape::Identifier => {
                if self.args.len() != 1 {
                    return Err(protocol(format!(
                        "{} takes exactly one identifier argument",
                        self.kind.as_str()
                    )));
                }
                if !is_identifier(&self.args[0]) {
                    return Err(protocol(format!("invalid identifier {:?}", self.args[0])));
                }
            }
            Shape::Value => {
                if self.args.len() != 1 {
                    return Err(protocol(format!(
                        "{} takes exactly one value argument",
                        self.kind.as_str()
                    )));
                }
                if !is_value(&self.args[0]) {
                    return Err(protocol(format!("invalid value {:?}", self.args[0])));
                }
            }
            Shape::TwoIdentifiers => {
                if self.args.len() != 2 {
                    return Err(protocol(format!(
                        "{} takes exactly two identifier arguments",
                        self.kind.as_str()
                    )));
                }
                if !is_identifier(&self.args[0]) || !is_identifier(&self.args[1]) {
                    return Err(protocol("invalid identifier argument"));
                }
            }
            Shape::Text => {
                if self.args.len() != 1 {
                    return Err(protocol(format!(
                        "{} takes a single quoted-text argument",
                        self.kind.as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn constructors_build_valid_messages() {
        assert!(Message::login("alice").validate().is_ok());
        assert!(Message::set("t", "k").validate().is_ok());
        assert!(Message::push("7").validate().is_ok());
        assert!(Message::ok().validate().is_ok());
        assert!(Message::failed("key not found").validate().is_ok());
    }

    #[test]
    fn empty_kinds_reject_arguments() {
        let mut m = Message::ok();
        m.args.push("unexpected".into());
        assert!(m.validate().is_err());
    }

    #[test]
    fn identifier_kinds_reject_bad_identifiers() {
        let m = Message::login("9nope");
        assert!(m.validate().is_err());
    }

    #[test]
    fn value_kinds_reject_spaces() {
        let m = Message::push("has space");
        assert!(m.validate().is_err());
    }
}
