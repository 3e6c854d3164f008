//! Output side of the binary encoder and the hasher
//!
//! Both the MessagePack encoder and the content hasher produce a stream of
//! bytes; they write it into a [`Target`](target::Target), so that the same
//! traversal can fill a buffer, count bytes, or feed a digest.

pub mod target;
