mod codec;
mod ident;
mod message;

pub use codec::{decode, encode, MAX_LINE_LEN};
pub use ident::{is_identifier, is_value};
pub use message::{Kind, Message};
