//! Type descriptors
//!
//! A [`Descriptor`] describes the shape of a value, and carries the capability
//! to read, write, and traverse values of that shape, without the caller
//! knowing the Rust type of the value. There are exactly seven kinds of
//! descriptor:
//!
//! | Kind | Shape | JSON | MessagePack |
//! |---|---|---|---|
//! | [`Bool`](Kind::Bool) | single boolean | `true`/`false` | boolean |
//! | [`Integer`](Kind::Integer) | fixed-width integer | number without fraction | integer |
//! | [`Float`](Kind::Float) | fixed-width float (IEEE or bf16) | number | float64 |
//! | [`String`](Kind::String) | variable-length byte string | string | str |
//! | [`Array`](Kind::Array) | homogeneous, contiguous elements | array | array |
//! | [`List`](Kind::List) | heterogeneous, independently-typed elements | array | array |
//! | [`Dict`](Kind::Dict) | string-keyed map | object | map |
//!
//! The scalar kinds are described by concrete types ([`BoolInfo`],
//! [`IntegerInfo`], [`FloatInfo`]) with a fixed set of canonical instances.
//! The container kinds are described by capability traits ([`StringInfo`],
//! [`ArrayInfo`], [`ListInfo`], [`DictInfo`]) which are implemented once per
//! container type, either by the built-in adapters in [`reflect`](crate::reflect)
//! or by externally generated record descriptors.
//!
//! # Locations
//!
//! Values are never owned by a descriptor. Every capability takes the value
//! location as `&dyn Any` or `&mut dyn Any`, and downcasts it to the storage
//! type it describes. Handing a descriptor a location of some other type is
//! reported as [`Error::LocationMismatch`](crate::Error::LocationMismatch).
//!
//! Descriptors are immutable and live for the remainder of the process once
//! created; [`Descriptor`] itself is a `Copy` handle around a `'static`
//! reference.

use std::any::Any;
use std::fmt::{Debug, Display};

use crate::error::{Error, Result};

mod container;
mod scalar;

pub use container::{
    ArrayInfo, DictInfo, Elements, ElementsMut, Entries, FieldLayout, ListInfo, StringInfo,
};
pub use scalar::{BoolInfo, FloatFormat, FloatInfo, FloatRepr, IntFormat, IntValue, IntWidth, IntegerInfo};

/// Discriminant of a [`Descriptor`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize))]
pub enum Kind {
    Bool,
    Integer,
    Float,
    String,
    Array,
    List,
    Dict,
}

impl Kind {
    /// All kinds, in declaration order
    pub const ALL: [Kind; 7] = [
        Kind::Bool,
        Kind::Integer,
        Kind::Float,
        Kind::String,
        Kind::Array,
        Kind::List,
        Kind::Dict,
    ];

    /// Lowercase name of the kind
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::List => "list",
            Kind::Dict => "dict",
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Handle to an immutable, process-lifetime type descriptor
///
/// Matching on a `Descriptor` is exhaustive over the seven kinds; algorithms
/// that need to specialize per kind should go through
/// [`dispatch`](crate::dispatch::dispatch) rather than matching directly.
#[derive(Clone, Copy)]
pub enum Descriptor {
    Bool(&'static BoolInfo),
    Integer(&'static IntegerInfo),
    Float(&'static FloatInfo),
    String(&'static dyn StringInfo),
    Array(&'static dyn ArrayInfo),
    List(&'static dyn ListInfo),
    Dict(&'static dyn DictInfo),
}

impl Descriptor {
    /// Returns the canonical descriptor of a reflected type
    #[inline]
    #[must_use]
    pub fn of<T: crate::reflect::Reflect>() -> Self {
        T::descriptor()
    }

    /// Returns the kind tag of this descriptor
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Descriptor::Bool(_) => Kind::Bool,
            Descriptor::Integer(_) => Kind::Integer,
            Descriptor::Float(_) => Kind::Float,
            Descriptor::String(_) => Kind::String,
            Descriptor::Array(_) => Kind::Array,
            Descriptor::List(_) => Kind::List,
            Descriptor::Dict(_) => Kind::Dict,
        }
    }

    /// Returns the in-memory byte size of one value of this shape
    ///
    /// For containers this is the size of the container handle, not of its
    /// contents. It is unrelated to the size of any serialized form.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        match self {
            Descriptor::Bool(info) => info.byte_size(),
            Descriptor::Integer(info) => info.byte_size(),
            Descriptor::Float(info) => info.byte_size(),
            Descriptor::String(info) => info.byte_size(),
            Descriptor::Array(info) => info.byte_size(),
            Descriptor::List(info) => info.byte_size(),
            Descriptor::Dict(info) => info.byte_size(),
        }
    }

    fn addr(&self) -> *const () {
        match *self {
            Descriptor::Bool(info) => info as *const BoolInfo as *const (),
            Descriptor::Integer(info) => info as *const IntegerInfo as *const (),
            Descriptor::Float(info) => info as *const FloatInfo as *const (),
            Descriptor::String(info) => info as *const dyn StringInfo as *const (),
            Descriptor::Array(info) => info as *const dyn ArrayInfo as *const (),
            Descriptor::List(info) => info as *const dyn ListInfo as *const (),
            Descriptor::Dict(info) => info as *const dyn DictInfo as *const (),
        }
    }

    /// Returns `true` if `self` and `other` are the same descriptor instance
    ///
    /// Canonical descriptors are deduplicated, so this is the identity test
    /// that the registry guarantees to be stable.
    #[must_use]
    pub fn same(&self, other: &Descriptor) -> bool {
        self.kind() == other.kind() && std::ptr::eq(self.addr(), other.addr())
    }
}

impl Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Descriptor::Bool(_) => f.write_str("Bool"),
            Descriptor::Integer(info) => write!(f, "Integer({})", info.format()),
            Descriptor::Float(info) => write!(f, "Float({})", info.format()),
            Descriptor::String(info) => write!(f, "String({})", info.type_name()),
            Descriptor::Array(info) => {
                write!(f, "Array({}; {:?})", info.type_name(), info.element())
            }
            Descriptor::List(info) => write!(f, "List({})", info.type_name()),
            Descriptor::Dict(info) => write!(f, "Dict({})", info.type_name()),
        }
    }
}

/// Borrowed value location paired with its descriptor
///
/// Produced while traversing heterogeneous containers; it does not own the
/// value and cannot outlive the borrow of the container it came from.
#[derive(Clone, Copy)]
pub struct TypedRef<'a> {
    pub value: &'a dyn Any,
    pub descriptor: Descriptor,
}

impl<'a> TypedRef<'a> {
    #[inline]
    pub fn new(value: &'a dyn Any, descriptor: Descriptor) -> Self {
        Self { value, descriptor }
    }
}

impl Debug for TypedRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedRef")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Mutably borrowed value location paired with its descriptor
pub struct TypedMut<'a> {
    pub value: &'a mut dyn Any,
    pub descriptor: Descriptor,
}

impl<'a> TypedMut<'a> {
    #[inline]
    pub fn new(value: &'a mut dyn Any, descriptor: Descriptor) -> Self {
        Self { value, descriptor }
    }
}

impl Debug for TypedMut<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedMut")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Downcasts a value location to the storage type `T`
#[inline]
pub fn downcast<T: Any>(value: &dyn Any) -> Result<&T> {
    value.downcast_ref::<T>().ok_or_else(Error::location::<T>)
}

/// Downcasts a mutable value location to the storage type `T`
#[inline]
pub fn downcast_mut<T: Any>(value: &mut dyn Any) -> Result<&mut T> {
    value.downcast_mut::<T>().ok_or_else(Error::location::<T>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        let names: Vec<String> = Kind::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            ["bool", "integer", "float", "string", "array", "list", "dict"]
        );
    }

    #[test]
    fn canonical_scalars_are_identical() {
        let a = Descriptor::of::<i32>();
        let b = Descriptor::Integer(IntegerInfo::of(IntFormat::signed(IntWidth::W32)));
        assert!(a.same(&b));
        assert!(!a.same(&Descriptor::of::<u32>()));
        assert!(!a.same(&Descriptor::of::<bool>()));
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(Descriptor::of::<bool>().byte_size(), 1);
        assert_eq!(Descriptor::of::<i16>().byte_size(), 2);
        assert_eq!(Descriptor::of::<f64>().byte_size(), 8);
        assert_eq!(
            Descriptor::of::<String>().byte_size(),
            std::mem::size_of::<String>()
        );
        assert_eq!(
            Descriptor::of::<Vec<u8>>().byte_size(),
            std::mem::size_of::<Vec<u8>>()
        );
    }

    #[test]
    fn debug_output() {
        assert_eq!(format!("{:?}", Descriptor::of::<i8>()), "Integer(i8)");
        assert_eq!(format!("{:?}", Descriptor::of::<f32>()), "Float(f32)");
        let array = format!("{:?}", Descriptor::of::<Vec<u16>>());
        assert!(array.starts_with("Array("), "{array}");
        assert!(array.ends_with("; Integer(u16))"), "{array}");
    }

    #[test]
    fn downcast_reports_expected_type() {
        let x = 5u8;
        assert!(downcast::<u8>(&x).is_ok());
        assert!(matches!(
            downcast::<i8>(&x),
            Err(Error::LocationMismatch { expected: "i8" })
        ));
    }
}
