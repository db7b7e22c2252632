//! Key decoding: crossterm events in, canonical `KeyId`s and `Binding`s out.

pub mod decode;
pub mod key_id;
pub mod matcher;
pub mod reserved;

pub use decode::{decode, KeyEvent, KeyEventKind};
pub use key_id::{KeyId, KeyIdError, Modifiers};
pub use matcher::{matches, Binding};
pub use reserved::{is_reserved, RESERVED};
