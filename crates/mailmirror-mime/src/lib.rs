//! # mailmirror-mime
//!
//! Decoding helpers for mirrored mail content.
//!
//! ## Features
//!
//! - **Transfer decoding**: Base64, Quoted-Printable and identity encodings
//! - **Header decoding**: RFC 2047 encoded words
//! - **Charsets**: UTF-8, US-ASCII and ISO-8859-1 family
//!
//! ## Quick Start
//!
//! ```
//! use mailmirror_mime::encoding::{decode_rfc2047, TransferEncoding};
//!
//! let body = TransferEncoding::parse("quoted-printable").decode(b"H=C3=A9llo")?;
//! assert_eq!(body, "Héllo".as_bytes());
//!
//! assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
//! # Ok::<(), mailmirror_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;

pub mod encoding;

pub use encoding::TransferEncoding;
pub use error::{Error, Result};
