//! Content hashing
//!
//! Computes a 256-bit SHA3-256 fingerprint of a value tree. The value is walked
//! depth-first and flattened into a canonical byte stream, which is fed to the
//! digest:
//!
//! | Kind | Contribution |
//! |---|---|
//! | bool | `b'1'` or `b'0'` |
//! | integer | 8 bytes, little-endian, sign- or zero-extended per the declared format |
//! | float | the value widened to `f64`, 8 bytes little-endian |
//! | string | the raw content bytes |
//! | array | element count as `u32` little-endian, then every element |
//! | list | every element (no count) |
//! | dict | for every entry, the key bytes followed by the value |
//!
//! The digest depends only on this stream, never on descriptor identity or
//! memory layout. Dict entries are fed sorted by key by default, so maps with
//! different iteration orders but equal contents hash equally; see
//! [`DictOrder`].

use std::any::Any;
use std::cell::RefCell;
use std::fmt::{Debug, Display};
use std::str::FromStr;

use sha3::{Digest as _, Sha3_256};

use crate::config::{DictOrder, HashConfig};
use crate::conv::target::Target;
use crate::descriptor::{
    ArrayInfo, BoolInfo, Descriptor, DictInfo, FloatInfo, IntValue, IntegerInfo, ListInfo,
    StringInfo, TypedRef,
};
use crate::dispatch::{dispatch, KindVisitor};
use crate::error::{Error, Result};
use crate::hex::{bytes_of_hex, hex_of_bytes};
use crate::reflect::Reflect;

/// A 256-bit content digest
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize))]
pub struct Digest([u8; 32]);

impl Digest {
    pub const LEN: usize = 32;

    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Lowercase hexadecimal rendering of the digest
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex_of_bytes(self.0)
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = bytes_of_hex(s)?;
        let found = bytes.len();
        let arr: [u8; Self::LEN] = bytes.try_into().map_err(|_| Error::SchemaMismatch {
            expected: format!("{}-byte digest", Self::LEN),
            found: format!("{found} bytes"),
        })?;
        Ok(Self(arr))
    }
}

/// [`Target`] feeding everything pushed into it to a SHA3-256 state
#[derive(Clone, Default)]
struct HashSink(Sha3_256);

impl Target for HashSink {
    #[inline(always)]
    fn anticipate(&mut self, _: usize) {}

    fn create() -> Self {
        Self(Sha3_256::new())
    }

    fn push_one(&mut self, b: u8) -> usize {
        self.0.update([b]);
        1
    }

    fn push_many<const N: usize>(&mut self, arr: [u8; N]) -> usize {
        self.0.update(arr);
        N
    }

    fn push_all(&mut self, buf: &[u8]) -> usize {
        self.0.update(buf);
        buf.len()
    }
}

/// Streaming hasher context
///
/// The digest state is reset at the start of every call to
/// [`hash`](Hasher::hash), so one `Hasher` can be reused for any number of
/// values. It is not meant to be shared between threads; see [`hash`] for the
/// thread-local instance used by the free functions.
#[derive(Clone, Default)]
pub struct Hasher {
    sink: HashSink,
    config: HashConfig,
}

impl Hasher {
    #[must_use]
    pub fn new(config: HashConfig) -> Self {
        Self {
            sink: HashSink::create(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> HashConfig {
        self.config
    }

    /// Computes the digest of the value at `value`, described by `descriptor`
    pub fn hash(&mut self, value: &dyn Any, descriptor: Descriptor) -> Result<Digest> {
        tracing::trace!(?descriptor, "hashing value");
        self.sink = HashSink::create();
        let fed = feed(TypedRef::new(value, descriptor), &mut self.sink, self.config.dict_order);
        let sink = std::mem::take(&mut self.sink);
        fed?;
        Ok(Digest(sink.0.finalize().into()))
    }
}

impl Debug for Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hasher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

thread_local! {
    static HASHER: RefCell<Hasher> = RefCell::new(Hasher::default());
}

/// Computes the digest of a value with the default [`HashConfig`]
///
/// Uses a per-thread [`Hasher`], so concurrent calls on different threads
/// never share digest state.
pub fn hash(value: &dyn Any, descriptor: Descriptor) -> Result<Digest> {
    HASHER.with(|cell| match cell.try_borrow_mut() {
        Ok(mut hasher) => hasher.hash(value, descriptor),
        // re-entrant use from within a hash computation on this thread
        Err(_) => Hasher::default().hash(value, descriptor),
    })
}

/// Computes the digest of a value with an explicit [`HashConfig`]
pub fn hash_with(value: &dyn Any, descriptor: Descriptor, config: HashConfig) -> Result<Digest> {
    Hasher::new(config).hash(value, descriptor)
}

/// Computes the digest of a reflected value with the default [`HashConfig`]
pub fn hash_of<T: Reflect>(value: &T) -> Result<Digest> {
    hash(value, T::descriptor())
}

/// Writes the canonical byte stream that the hasher digests into `dest`,
/// returning its length
pub fn canonical_stream<T: Target>(
    value: &dyn Any,
    descriptor: Descriptor,
    order: DictOrder,
    dest: &mut T,
) -> Result<usize> {
    feed(TypedRef::new(value, descriptor), dest, order)
}

fn feed<T: Target>(item: TypedRef<'_>, dest: &mut T, order: DictOrder) -> Result<usize> {
    dispatch(
        item.descriptor,
        Feeder {
            value: item.value,
            dest,
            order,
        },
    )
}

struct Feeder<'a, 'b, T: Target> {
    value: &'a dyn Any,
    dest: &'b mut T,
    order: DictOrder,
}

impl<T: Target> KindVisitor for Feeder<'_, '_, T> {
    type Output = Result<usize>;

    fn visit_bool(self, info: &'static BoolInfo) -> Self::Output {
        let b = info.get(self.value)?;
        Ok(self.dest.push_one(if b { b'1' } else { b'0' }))
    }

    fn visit_integer(self, info: &'static IntegerInfo) -> Self::Output {
        Ok(match info.load(self.value)? {
            IntValue::Signed(v) => self.dest.push_many(v.to_le_bytes()),
            IntValue::Unsigned(v) => self.dest.push_many(v.to_le_bytes()),
        })
    }

    fn visit_float(self, info: &'static FloatInfo) -> Self::Output {
        Ok(self.dest.push_many(info.get(self.value)?.to_le_bytes()))
    }

    fn visit_string(self, info: &'static dyn StringInfo) -> Self::Output {
        Ok(self.dest.push_all(info.get(self.value)?))
    }

    fn visit_array(self, info: &'static dyn ArrayInfo) -> Self::Output {
        let element = info.element();
        let elements = info.elements(self.value)?;
        let count = u32::try_from(elements.len()).map_err(|_| {
            Error::Unsupported(format!("array of {} elements is too long to hash", elements.len()))
        })?;
        let mut written = self.dest.push_many(count.to_le_bytes());
        for x in elements {
            written += feed(TypedRef::new(x, element), self.dest, self.order)?;
        }
        Ok(written)
    }

    fn visit_list(self, info: &'static dyn ListInfo) -> Self::Output {
        let mut written = 0;
        for ix in 0..info.len(self.value)? {
            written += feed(info.child(self.value, ix)?, self.dest, self.order)?;
        }
        Ok(written)
    }

    fn visit_dict(self, info: &'static dyn DictInfo) -> Self::Output {
        let mut entries: Vec<_> = info.entries(self.value)?.collect();
        if self.order == DictOrder::SortedByKey {
            // `str` ordering is bytewise
            entries.sort_by(|x, y| x.0.cmp(y.0));
        }
        let mut written = 0;
        for (key, item) in entries {
            written += self.dest.push_all(key.as_bytes());
            written += feed(item, self.dest, self.order)?;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::float::Bf16;
    use crate::record;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::{BTreeMap, HashMap};

    record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Pair {
            a: i32,
            b: String,
        }
    }

    fn sha3_256(bytes: &[u8]) -> Digest {
        Digest(Sha3_256::digest(bytes).into())
    }

    fn stream_of<T: Reflect>(value: &T, order: DictOrder) -> Vec<u8> {
        let mut buf = Vec::new();
        canonical_stream(value, T::descriptor(), order, &mut buf).unwrap();
        buf
    }

    #[test]
    fn record_stream() {
        let p = Pair {
            a: -7,
            b: "hi".into(),
        };
        let mut expected = b"a".to_vec();
        expected.extend_from_slice(&(-7i64).to_le_bytes());
        expected.extend_from_slice(b"b");
        expected.extend_from_slice(b"hi");
        assert_eq!(stream_of(&p, DictOrder::SortedByKey), expected);
        assert_eq!(hash_of(&p).unwrap(), sha3_256(&expected));
    }

    #[test]
    fn scalar_streams() {
        assert_eq!(stream_of(&true, DictOrder::default()), b"1");
        assert_eq!(stream_of(&false, DictOrder::default()), b"0");
        assert_eq!(stream_of(&u8::MAX, DictOrder::default()), 255u64.to_le_bytes());
        assert_eq!(stream_of(&-1i16, DictOrder::default()), [0xff; 8]);
        assert_eq!(
            stream_of(&Bf16::ONE, DictOrder::default()),
            1.0f64.to_le_bytes()
        );
        assert_eq!(stream_of(&String::from("hi"), DictOrder::default()), b"hi");
    }

    #[test]
    fn arrays_carry_a_count_and_lists_do_not() {
        let v: Vec<u8> = vec![1, 2, 3];
        let stream = stream_of(&v, DictOrder::default());
        assert_eq!(&stream[..4], &3u32.to_le_bytes());
        assert_eq!(stream.len(), 4 + 3 * 8);

        let t = (1u8, 2u8, 3u8);
        let stream = stream_of(&t, DictOrder::default());
        assert_eq!(stream.len(), 3 * 8);
        assert_eq!(&stream[..8], &1u64.to_le_bytes());
    }

    #[test]
    fn digest_matches_sha3_of_stream() {
        let v: Vec<String> = vec!["x".into(), "yz".into()];
        let stream = stream_of(&v, DictOrder::default());
        assert_eq!(hash_of(&v).unwrap(), sha3_256(&stream));
        assert_eq!(hash_of(&v).unwrap(), hash_of(&v).unwrap());
    }

    #[test]
    fn sorted_order_ignores_iteration_order() {
        let entries = [("zeta", 1u32), ("alpha", 2), ("mid", 3), ("beta", 4)];
        let b: BTreeMap<String, u32> = entries.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        let h: HashMap<String, u32> = entries.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        let sorted = HashConfig::default().with_dict_order(DictOrder::SortedByKey);
        assert_eq!(
            hash_with(&b, <BTreeMap<String, u32>>::descriptor(), sorted).unwrap(),
            hash_with(&h, <HashMap<String, u32>>::descriptor(), sorted).unwrap()
        );
    }

    #[test]
    fn iteration_order_follows_the_container() {
        let p = Pair {
            a: 1,
            b: "x".into(),
        };
        // record fields iterate in declaration order, which is already sorted
        let iter = HashConfig::default().with_dict_order(DictOrder::Iteration);
        let sorted = HashConfig::default().with_dict_order(DictOrder::SortedByKey);
        assert_eq!(
            hash_with(&p, Pair::descriptor(), iter).unwrap(),
            hash_with(&p, Pair::descriptor(), sorted).unwrap()
        );
    }

    #[test]
    fn different_values_differ() {
        let a = Pair {
            a: 1,
            b: "x".into(),
        };
        let mut b = a.clone();
        b.a = 2;
        assert_ne!(hash_of(&a).unwrap(), hash_of(&b).unwrap());
    }

    #[test]
    fn hasher_resets_between_calls() {
        let mut hasher = Hasher::default();
        let first = hasher.hash(&5u32, u32::descriptor()).unwrap();
        hasher.hash(&String::from("other"), String::descriptor()).unwrap();
        assert_eq!(hasher.hash(&5u32, u32::descriptor()).unwrap(), first);
        // a failed call leaves no residue either
        assert!(hasher.hash(&5u32, i8::descriptor()).is_err());
        assert_eq!(hasher.hash(&5u32, u32::descriptor()).unwrap(), first);
    }

    #[test]
    fn threads_agree() {
        let v: Vec<i64> = (0..100).collect();
        let expected = hash_of(&v).unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| hash_of(&v).unwrap())).collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn empty_stream_digest() {
        // an empty string contributes no bytes at all
        assert_eq!(
            hash_of(&String::new()).unwrap().to_hex(),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn digest_hex() {
        let d = hash_of(&true).unwrap();
        assert_eq!(d, sha3_256(b"1"));
        let text = d.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<Digest>().unwrap(), d);
        assert!(matches!(
            "abcd".parse::<Digest>(),
            Err(Error::SchemaMismatch { .. })
        ));
        assert!(matches!("zz".parse::<Digest>(), Err(Error::Hex(_))));
    }

    proptest! {
        #[test]
        fn map_digest_is_order_independent(m in proptest::collection::hash_map(".{0,6}", any::<i32>(), 0..12)) {
            let b: BTreeMap<String, i32> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
            prop_assert_eq!(hash_of(&m).unwrap(), hash_of(&b).unwrap());
        }
    }
}
