//! Canonical descriptor registry
//!
//! Scalar descriptors need no registry state at all: every integer format,
//! float format and the boolean kind have exactly one canonical instance in a
//! compile-time `static` table, and [`Registry`] merely hands those out.
//!
//! Container descriptors are parametrized by Rust types (a `Vec<T>` adapter
//! carries the descriptor of `T`), so they are built lazily, once per
//! container type, and interned in a table keyed by [`TypeId`].
//!
//! # Lifecycle
//!
//! A `Registry` starts out empty and only ever grows. Interning follows a
//! publish-once discipline:
//!
//!   1. A lookup under the read lock returns an existing descriptor.
//!   2. On a miss, the adapter is built *without* holding any lock, as building
//!      it usually resolves the descriptors of its element types through the
//!      same registry.
//!   3. The write lock is taken and the adapter is published only if no other
//!      thread published one for the same key in the meantime; otherwise the
//!      freshly built adapter is dropped and the existing one is returned.
//!
//! Concurrent first-time lookups therefore always agree on a single
//! descriptor identity per key. Published adapters are leaked, and live for
//! the rest of the process.
//!
//! Record adapters do not resolve their field descriptors while being built.
//! They keep a handle to the registry and resolve the field table on first
//! use, after the record itself has been published. This is what lets a
//! record refer to itself through a container, as in `kids: Vec<Node>`.
//!
//! Most code uses the process-wide instance, [`Registry::global`], through
//! [`Reflect::descriptor`](crate::reflect::Reflect::descriptor). Code that
//! wants an isolated table can construct its own registry and resolve
//! descriptors with [`Reflect::descriptor_in`](crate::reflect::Reflect::descriptor_in).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::descriptor::{
    ArrayInfo, BoolInfo, Descriptor, DictInfo, FloatFormat, FloatInfo, IntFormat, IntegerInfo,
    ListInfo, StringInfo,
};

lazy_static::lazy_static! {
    static ref GLOBAL: Registry = Registry::new();
}

/// Freshly built, not yet published container adapter
pub enum Adapter {
    String(Box<dyn StringInfo>),
    Array(Box<dyn ArrayInfo>),
    List(Box<dyn ListInfo>),
    Dict(Box<dyn DictInfo>),
}

impl Adapter {
    fn leak(self) -> Descriptor {
        match self {
            Adapter::String(info) => Descriptor::String(Box::leak(info)),
            Adapter::Array(info) => Descriptor::Array(Box::leak(info)),
            Adapter::List(info) => Descriptor::List(Box::leak(info)),
            Adapter::Dict(info) => Descriptor::Dict(Box::leak(info)),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Adapter::String(info) => info.type_name(),
            Adapter::Array(info) => info.type_name(),
            Adapter::List(info) => info.type_name(),
            Adapter::Dict(info) => info.type_name(),
        }
    }
}

/// Table of canonical descriptors
///
/// Cloning a `Registry` yields another handle to the same table.
#[derive(Default, Clone)]
pub struct Registry {
    interned: Arc<RwLock<HashMap<TypeId, Descriptor>>>,
}

impl Registry {
    /// Constructs an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry
    #[must_use]
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Canonical boolean descriptor
    #[inline]
    #[must_use]
    pub fn boolean(&self) -> Descriptor {
        Descriptor::Bool(BoolInfo::get_singleton())
    }

    /// Canonical integer descriptor for `format`
    #[inline]
    #[must_use]
    pub fn integer(&self, format: IntFormat) -> Descriptor {
        Descriptor::Integer(IntegerInfo::of(format))
    }

    /// Canonical float descriptor for `format`, if the format is supported
    #[inline]
    #[must_use]
    pub fn float(&self, format: FloatFormat) -> Option<Descriptor> {
        FloatInfo::lookup(format).map(Descriptor::Float)
    }

    /// Returns the interned descriptor for the container type `K`, if any
    #[must_use]
    pub fn lookup<K: Any + ?Sized>(&self) -> Option<Descriptor> {
        self.interned.read().get(&TypeId::of::<K>()).copied()
    }

    /// Returns the descriptor interned for the container type `K`, building and
    /// publishing it with `build` if there is none yet
    ///
    /// `build` runs without any lock held and may itself resolve descriptors
    /// through `self`. It may run more than once under contention, but only
    /// one result is ever published for a given `K`. `build` must not resolve
    /// `K` itself; record adapters defer their fields for that reason.
    pub fn intern<K: Any + ?Sized>(&self, build: impl FnOnce() -> Adapter) -> Descriptor {
        if let Some(found) = self.lookup::<K>() {
            return found;
        }
        let adapter = build();
        let mut interned = self.interned.write();
        if let Some(found) = interned.get(&TypeId::of::<K>()) {
            return *found;
        }
        tracing::debug!(adapter = adapter.type_name(), "interning container descriptor");
        let descriptor = adapter.leak();
        interned.insert(TypeId::of::<K>(), descriptor);
        descriptor
    }

    /// Number of interned container descriptors
    #[must_use]
    pub fn len(&self) -> usize {
        self.interned.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("interned", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FloatRepr, IntWidth, Kind};
    use crate::reflect::Reflect;
    use std::collections::BTreeMap;

    #[test]
    fn scalars_need_no_interning() {
        let reg = Registry::new();
        assert!(reg.boolean().same(&reg.boolean()));
        let a = reg.integer(IntFormat::unsigned(IntWidth::W16));
        assert!(a.same(&Descriptor::of::<u16>()));
        assert!(reg.float(FloatFormat::new(16, FloatRepr::Ieee)).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn containers_are_interned_once() {
        let reg = Registry::new();
        let a = <Vec<Vec<i32>>>::descriptor_in(&reg);
        let b = <Vec<Vec<i32>>>::descriptor_in(&reg);
        assert!(a.same(&b));
        // the inner Vec<i32> was interned along the way
        assert_eq!(reg.len(), 2);
        assert!(reg.lookup::<Vec<i32>>().is_some());
        assert!(reg.lookup::<Vec<u8>>().is_none());
    }

    #[test]
    fn registries_are_independent() {
        let reg = Registry::new();
        let local = <Vec<i64>>::descriptor_in(&reg);
        let global = <Vec<i64>>::descriptor();
        assert_eq!(local.kind(), Kind::Array);
        assert!(!local.same(&global));
        assert!(global.same(&<Vec<i64>>::descriptor()));
    }

    #[test]
    fn clones_share_the_table() {
        let reg = Registry::new();
        let handle = reg.clone();
        let a = <Vec<String>>::descriptor_in(&handle);
        assert!(a.same(&<Vec<String>>::descriptor_in(&reg)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn concurrent_first_lookups_agree() {
        let reg = Registry::new();
        let found: Vec<Descriptor> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| <BTreeMap<String, Vec<u32>>>::descriptor_in(&reg)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for d in &found[1..] {
            assert!(found[0].same(d));
        }
        assert_eq!(reg.len(), 2);
    }
}
