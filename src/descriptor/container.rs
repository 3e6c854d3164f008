//! Capability traits of the container kinds
//!
//! Unlike the scalar kinds, strings, arrays, lists and dicts can be backed by
//! any number of Rust container types, so each container kind is a trait that
//! a per-container adapter implements. Adapters are interned once per
//! container type by the [`Registry`](crate::registry::Registry) and handed
//! out as `&'static dyn` references inside a [`Descriptor`].
//!
//! All traits require `Send + Sync` so that descriptors can be shared freely
//! between threads.

use std::any::Any;
use std::fmt::Debug;
use std::iter::FusedIterator;

use super::{Descriptor, TypedMut, TypedRef};
use crate::error::Result;

/// Capability of a variable-length byte string
pub trait StringInfo: Send + Sync + 'static {
    /// Name of the Rust type the adapter describes
    fn type_name(&self) -> &'static str;

    /// In-memory size of the string handle
    fn byte_size(&self) -> usize;

    /// Returns a view of the string content
    fn get<'a>(&self, value: &'a dyn Any) -> Result<&'a [u8]>;

    /// Replaces the string content
    fn set(&self, value: &mut dyn Any, bytes: &[u8]) -> Result<()>;
}

/// Capability of a homogeneous array with contiguous element storage
///
/// Every element of an array is described by the same [`element`] descriptor.
///
/// [`element`]: ArrayInfo::element
pub trait ArrayInfo: Send + Sync + 'static {
    fn type_name(&self) -> &'static str;

    fn byte_size(&self) -> usize;

    /// Descriptor shared by every element
    fn element(&self) -> Descriptor;

    /// Number of elements currently held
    fn len(&self, value: &dyn Any) -> Result<usize>;

    /// Resizes the array to exactly `len` elements
    ///
    /// Implementations must acquire any memory they need before mutating, so
    /// that a failed resize leaves the array unchanged.
    fn resize(&self, value: &mut dyn Any, len: usize) -> Result<()>;

    /// Iterates over the element locations in index order
    fn elements<'a>(&self, value: &'a dyn Any) -> Result<Elements<'a>>;

    /// Iterates mutably over the element locations in index order
    fn elements_mut<'a>(&self, value: &'a mut dyn Any) -> Result<ElementsMut<'a>>;
}

/// Capability of a heterogeneous list, whose elements may each have their
/// own descriptor
pub trait ListInfo: Send + Sync + 'static {
    fn type_name(&self) -> &'static str;

    fn byte_size(&self) -> usize;

    fn len(&self, value: &dyn Any) -> Result<usize>;

    fn resize(&self, value: &mut dyn Any, len: usize) -> Result<()>;

    /// Returns the location and descriptor of the element at `index`
    fn child<'a>(&self, value: &'a dyn Any, index: usize) -> Result<TypedRef<'a>>;

    fn child_mut<'a>(&self, value: &'a mut dyn Any, index: usize) -> Result<TypedMut<'a>>;
}

/// Capability of a string-keyed map whose values may each have their own
/// descriptor
///
/// Iteration order is whatever the underlying container yields; callers that
/// need a canonical order must impose one themselves (see
/// [`DictOrder`](crate::config::DictOrder)).
pub trait DictInfo: Send + Sync + 'static {
    fn type_name(&self) -> &'static str;

    fn byte_size(&self) -> usize;

    fn len(&self, value: &dyn Any) -> Result<usize>;

    /// Iterates over `(key, value)` entries in the container's own order
    fn entries<'a>(&'a self, value: &'a dyn Any) -> Result<Entries<'a>>;

    /// Looks up the value stored under `key`
    fn get<'a>(&self, value: &'a dyn Any, key: &str) -> Result<Option<TypedRef<'a>>>;

    /// Looks up the value stored under `key` for writing
    ///
    /// Never inserts: keys that do not exist yield `Ok(None)`.
    fn get_mut<'a>(&self, value: &'a mut dyn Any, key: &str) -> Result<Option<TypedMut<'a>>>;

    /// Removes the entry stored under `key`, returning whether it existed
    fn erase(&self, value: &mut dyn Any, key: &str) -> Result<bool>;

    /// Static field layout, for dicts backed by a fixed-layout record
    fn layout(&self) -> Option<&[FieldLayout]> {
        None
    }
}

/// Name, byte offset, and descriptor of one record field
#[derive(Clone, Copy, Debug)]
pub struct FieldLayout {
    pub name: &'static str,
    pub offset: usize,
    pub descriptor: Descriptor,
}

macro_rules! boxed_iter {
    ( $name:ident < $lt:lifetime > => $item:ty, $doc:literal ) => {
        #[doc = $doc]
        ///
        /// Once exhausted it keeps returning `None`.
        pub struct $name<$lt> {
            inner: std::iter::Fuse<Box<dyn Iterator<Item = $item> + $lt>>,
            len: usize,
        }

        impl<$lt> $name<$lt> {
            /// Wraps an iterator that yields exactly `len` items
            pub fn new<I>(iter: I, len: usize) -> Self
            where
                I: Iterator<Item = $item> + $lt,
            {
                let boxed: Box<dyn Iterator<Item = $item> + $lt> = Box::new(iter);
                Self {
                    inner: boxed.fuse(),
                    len,
                }
            }
        }

        impl<$lt> Iterator for $name<$lt> {
            type Item = $item;

            fn next(&mut self) -> Option<Self::Item> {
                let item = self.inner.next();
                if item.is_some() {
                    self.len = self.len.saturating_sub(1);
                }
                item
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                (self.len, Some(self.len))
            }
        }

        impl<$lt> ExactSizeIterator for $name<$lt> {}

        impl<$lt> FusedIterator for $name<$lt> {}

        impl<$lt> Debug for $name<$lt> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("remaining", &self.len)
                    .finish()
            }
        }
    };
}

boxed_iter!(Elements<'a> => &'a dyn Any, "Iterator over the element locations of an array");
boxed_iter!(ElementsMut<'a> => &'a mut dyn Any, "Mutable iterator over the element locations of an array");
boxed_iter!(Entries<'a> => (&'a str, TypedRef<'a>), "Iterator over the entries of a dict");
