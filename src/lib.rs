//! Runtime type descriptors for transcoding fixed-layout values
//!
//! # Overview
//!
//! This library describes the shape of in-memory values with *descriptors*, and
//! uses those descriptors to move values between three representations without
//! any per-type serialization code:
//!
//!   * a JSON document tree ([`json`]),
//!   * a compact MessagePack byte stream ([`msgpack`]),
//!   * a 256-bit content digest ([`hash`]).
//!
//! A [`Descriptor`] is one of seven kinds (see [`Kind`]). Scalar kinds have a
//! fixed set of canonical instances; container kinds are built once per Rust
//! type and interned in a [`Registry`]. Every codec is written against the
//! kind-level capabilities only, by implementing [`KindVisitor`] and handing it
//! to [`dispatch`], so a new container type becomes transcodable as soon as it
//! has a descriptor.
//!
//! The [`Reflect`] trait connects Rust types to their descriptors. It is
//! implemented for the primitive scalars, [`String`], `Vec<T>`, `[T; N]`,
//! tuples, and string-keyed maps. Record types are declared through the
//! [`record!`] macro, which produces a struct together with its dict
//! descriptor.
//!
//! ```
//! use typeinfo::{record, Reflect};
//!
//! record! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Pair {
//!         pub a: i32,
//!         pub b: String,
//!     }
//! }
//!
//! let p = Pair { a: -7, b: "hi".into() };
//! let bytes = typeinfo::to_binary(&p).unwrap();
//! assert_eq!(typeinfo::hex::hex_of_bytes(&bytes), "82a161d2fffffff9a162a26869");
//!
//! let back: Pair = typeinfo::from_binary(&bytes).unwrap();
//! assert_eq!(back, p);
//! assert_eq!(Pair::descriptor().kind(), typeinfo::Kind::Dict);
//! ```
//!
//! # Features
//!
//! | Feature | Effect |
//! |---|---|
//! | `lenient_int_tags` | binary decoding accepts any integer tag whose value fits |
//! | `iteration_order_hash` | dict entries are hashed in iteration order instead of sorted by key |
//! | `serde_impls` | `serde::Serialize` for [`Kind`], [`Digest`] and a few plain data types |

pub mod config;
pub mod conv;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod float;
pub mod hash;
pub mod hex;
pub mod json;
pub mod msgpack;
pub mod parse;
pub mod record;
pub mod reflect;
pub mod registry;

pub use crate::config::{BinaryConfig, DictOrder, HashConfig, IntTagPolicy};
pub use crate::conv::target::{ByteCounter, Target};
pub use crate::descriptor::{Descriptor, Kind, TypedMut, TypedRef};
pub use crate::dispatch::{dispatch, KindVisitor};
pub use crate::error::{Error, Result};
pub use crate::float::Bf16;
pub use crate::hash::{canonical_stream, hash, hash_of, hash_with, Digest, Hasher};
pub use crate::json::{decode_json, encode_json, from_json, from_json_into, to_json};
pub use crate::msgpack::{
    binary_len, decode_binary, encode_binary, from_binary, from_binary_into, to_binary,
};
pub use crate::parse::{error::WireError, WireReader};
pub use crate::reflect::Reflect;
pub use crate::registry::Registry;
