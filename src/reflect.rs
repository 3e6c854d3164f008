//! Descriptors of built-in Rust types
//!
//! [`Reflect`] maps a Rust type to its canonical [`Descriptor`]. It is
//! implemented here for the scalar primitives, [`String`], `Vec<T>`,
//! `[T; N]`, tuples (as lists), and string-keyed `BTreeMap`/`HashMap` (as
//! dicts). Record types get their implementation from the
//! [`record!`](crate::record!) macro.
//!
//! | Rust type | Kind | Adapter |
//! |---|---|---|
//! | `bool` | bool | [`BoolInfo`](crate::descriptor::BoolInfo) |
//! | `i8`..`i64`, `u8`..`u64` | integer | [`IntegerInfo`](crate::descriptor::IntegerInfo) |
//! | [`Bf16`], `f32`, `f64` | float | [`FloatInfo`](crate::descriptor::FloatInfo) |
//! | `String` | string | [`Utf8String`] |
//! | `Vec<T>` | array | [`VecInfo`] |
//! | `[T; N]` | array | [`FixedArrayInfo`] |
//! | `(A, B, ..)` | list | [`TupleInfo`] |
//! | `BTreeMap<String, V>`, `HashMap<String, V>` | dict | [`MapInfo`] |

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::marker::PhantomData;

use crate::descriptor::{
    downcast, downcast_mut, ArrayInfo, Descriptor, DictInfo, Elements, ElementsMut, Entries,
    FloatInfo, IntFormat, IntWidth, ListInfo, StringInfo, TypedMut, TypedRef,
};
use crate::error::{Error, Result};
use crate::float::Bf16;
use crate::registry::{Adapter, Registry};

/// Rust types with a canonical descriptor
pub trait Reflect: Any {
    /// Resolves the descriptor of `Self` through `registry`
    ///
    /// Container types intern their adapter (and, recursively, those of their
    /// element types) in `registry`.
    fn descriptor_in(registry: &Registry) -> Descriptor
    where
        Self: Sized;

    /// Resolves the descriptor of `Self` through the process-wide registry
    fn descriptor() -> Descriptor
    where
        Self: Sized,
    {
        Self::descriptor_in(Registry::global())
    }
}

impl Reflect for bool {
    fn descriptor_in(registry: &Registry) -> Descriptor {
        registry.boolean()
    }
}

macro_rules! reflect_int {
    ( $( $t:ty => $ctor:ident ( $w:ident ) ),* $(,)? ) => {
        $(
            impl Reflect for $t {
                fn descriptor_in(registry: &Registry) -> Descriptor {
                    registry.integer(IntFormat::$ctor(IntWidth::$w))
                }
            }
        )*
    };
}

reflect_int!(
    i8 => signed(W8),
    i16 => signed(W16),
    i32 => signed(W32),
    i64 => signed(W64),
    u8 => unsigned(W8),
    u16 => unsigned(W16),
    u32 => unsigned(W32),
    u64 => unsigned(W64),
);

impl Reflect for Bf16 {
    fn descriptor_in(_: &Registry) -> Descriptor {
        Descriptor::Float(FloatInfo::bf16())
    }
}

impl Reflect for f32 {
    fn descriptor_in(_: &Registry) -> Descriptor {
        Descriptor::Float(FloatInfo::f32())
    }
}

impl Reflect for f64 {
    fn descriptor_in(_: &Registry) -> Descriptor {
        Descriptor::Float(FloatInfo::f64())
    }
}

/// String adapter for [`String`]
///
/// Content written through [`StringInfo::set`] must be valid UTF-8.
#[derive(Debug)]
pub struct Utf8String {
    type_name: &'static str,
}

static UTF8_STRING: Utf8String = Utf8String {
    type_name: "alloc::string::String",
};

impl StringInfo for Utf8String {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn byte_size(&self) -> usize {
        std::mem::size_of::<String>()
    }

    fn get<'a>(&self, value: &'a dyn Any) -> Result<&'a [u8]> {
        Ok(downcast::<String>(value)?.as_bytes())
    }

    fn set(&self, value: &mut dyn Any, bytes: &[u8]) -> Result<()> {
        let s = std::str::from_utf8(bytes)?;
        let target = downcast_mut::<String>(value)?;
        target.clear();
        target.push_str(s);
        Ok(())
    }
}

impl Reflect for String {
    fn descriptor_in(_: &Registry) -> Descriptor {
        Descriptor::String(&UTF8_STRING)
    }
}

/// Array adapter for `Vec<T>`
pub struct VecInfo<T> {
    type_name: &'static str,
    element: Descriptor,
    _elem: PhantomData<fn() -> T>,
}

impl<T: Reflect> VecInfo<T> {
    pub fn new(element: Descriptor) -> Self {
        Self {
            type_name: std::any::type_name::<Vec<T>>(),
            element,
            _elem: PhantomData,
        }
    }
}

impl<T: Reflect + Default> ArrayInfo for VecInfo<T> {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn byte_size(&self) -> usize {
        std::mem::size_of::<Vec<T>>()
    }

    fn element(&self) -> Descriptor {
        self.element
    }

    fn len(&self, value: &dyn Any) -> Result<usize> {
        Ok(downcast::<Vec<T>>(value)?.len())
    }

    fn resize(&self, value: &mut dyn Any, len: usize) -> Result<()> {
        let vec = downcast_mut::<Vec<T>>(value)?;
        if len > vec.len() {
            vec.try_reserve_exact(len - vec.len())
                .map_err(|_| Error::ResourceExhausted { requested: len })?;
            vec.resize_with(len, T::default);
        } else {
            vec.truncate(len);
        }
        Ok(())
    }

    fn elements<'a>(&self, value: &'a dyn Any) -> Result<Elements<'a>> {
        let vec = downcast::<Vec<T>>(value)?;
        Ok(Elements::new(vec.iter().map(|x| x as &dyn Any), vec.len()))
    }

    fn elements_mut<'a>(&self, value: &'a mut dyn Any) -> Result<ElementsMut<'a>> {
        let vec = downcast_mut::<Vec<T>>(value)?;
        let len = vec.len();
        Ok(ElementsMut::new(
            vec.iter_mut().map(|x| x as &mut dyn Any),
            len,
        ))
    }
}

impl<T: Reflect + Default> Reflect for Vec<T> {
    fn descriptor_in(registry: &Registry) -> Descriptor {
        registry.intern::<Self>(|| {
            Adapter::Array(Box::new(VecInfo::<T>::new(T::descriptor_in(registry))))
        })
    }
}

/// Array adapter for `[T; N]`, which cannot be resized to any length but `N`
pub struct FixedArrayInfo<T, const N: usize> {
    type_name: &'static str,
    element: Descriptor,
    _elem: PhantomData<fn() -> T>,
}

impl<T: Reflect, const N: usize> FixedArrayInfo<T, N> {
    pub fn new(element: Descriptor) -> Self {
        Self {
            type_name: std::any::type_name::<[T; N]>(),
            element,
            _elem: PhantomData,
        }
    }
}

impl<T: Reflect, const N: usize> ArrayInfo for FixedArrayInfo<T, N> {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn byte_size(&self) -> usize {
        std::mem::size_of::<[T; N]>()
    }

    fn element(&self) -> Descriptor {
        self.element
    }

    fn len(&self, value: &dyn Any) -> Result<usize> {
        downcast::<[T; N]>(value)?;
        Ok(N)
    }

    fn resize(&self, value: &mut dyn Any, len: usize) -> Result<()> {
        downcast_mut::<[T; N]>(value)?;
        if len == N {
            Ok(())
        } else {
            Err(Error::fixed_length(N, len))
        }
    }

    fn elements<'a>(&self, value: &'a dyn Any) -> Result<Elements<'a>> {
        let arr = downcast::<[T; N]>(value)?;
        Ok(Elements::new(arr.iter().map(|x| x as &dyn Any), N))
    }

    fn elements_mut<'a>(&self, value: &'a mut dyn Any) -> Result<ElementsMut<'a>> {
        let arr = downcast_mut::<[T; N]>(value)?;
        Ok(ElementsMut::new(arr.iter_mut().map(|x| x as &mut dyn Any), N))
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn descriptor_in(registry: &Registry) -> Descriptor {
        registry.intern::<Self>(|| {
            Adapter::Array(Box::new(FixedArrayInfo::<T, N>::new(T::descriptor_in(
                registry,
            ))))
        })
    }
}

/// List adapter for tuples, whose elements each carry their own descriptor
pub struct TupleInfo<T> {
    type_name: &'static str,
    children: Vec<Descriptor>,
    _tuple: PhantomData<fn() -> T>,
}

impl<T: Any> TupleInfo<T> {
    pub fn new(children: Vec<Descriptor>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            children,
            _tuple: PhantomData,
        }
    }

    /// Descriptors of the tuple fields, in order
    #[must_use]
    pub fn children(&self) -> &[Descriptor] {
        &self.children
    }
}

macro_rules! reflect_tuple {
    ( $len:literal => $( $idx:tt : $t:ident ),+ ) => {
        impl<$( $t: Reflect ),+> Reflect for ( $( $t, )+ ) {
            fn descriptor_in(registry: &Registry) -> Descriptor {
                registry.intern::<Self>(|| {
                    Adapter::List(Box::new(TupleInfo::<Self>::new(vec![
                        $( $t::descriptor_in(registry) ),+
                    ])))
                })
            }
        }

        impl<$( $t: Reflect ),+> ListInfo for TupleInfo<( $( $t, )+ )> {
            fn type_name(&self) -> &'static str {
                self.type_name
            }

            fn byte_size(&self) -> usize {
                std::mem::size_of::<( $( $t, )+ )>()
            }

            fn len(&self, value: &dyn Any) -> Result<usize> {
                downcast::<( $( $t, )+ )>(value)?;
                Ok($len)
            }

            fn resize(&self, value: &mut dyn Any, len: usize) -> Result<()> {
                downcast_mut::<( $( $t, )+ )>(value)?;
                if len == $len {
                    Ok(())
                } else {
                    Err(Error::fixed_length($len, len))
                }
            }

            fn child<'a>(&self, value: &'a dyn Any, index: usize) -> Result<TypedRef<'a>> {
                let tuple = downcast::<( $( $t, )+ )>(value)?;
                match index {
                    $( $idx => Ok(TypedRef::new(&tuple.$idx, self.children[$idx])), )+
                    _ => Err(Error::IndexOutOfRange { index, len: $len }),
                }
            }

            fn child_mut<'a>(&self, value: &'a mut dyn Any, index: usize) -> Result<TypedMut<'a>> {
                let tuple = downcast_mut::<( $( $t, )+ )>(value)?;
                match index {
                    $( $idx => Ok(TypedMut::new(&mut tuple.$idx, self.children[$idx])), )+
                    _ => Err(Error::IndexOutOfRange { index, len: $len }),
                }
            }
        }
    };
}

reflect_tuple!(1 => 0: A);
reflect_tuple!(2 => 0: A, 1: B);
reflect_tuple!(3 => 0: A, 1: B, 2: C);
reflect_tuple!(4 => 0: A, 1: B, 2: C, 3: D);
reflect_tuple!(5 => 0: A, 1: B, 2: C, 3: D, 4: E);
reflect_tuple!(6 => 0: A, 1: B, 2: C, 3: D, 4: E, 5: F);

/// String-keyed map containers that can back a dict
pub trait StringMap: Any {
    type Value: Reflect;

    fn map_len(&self) -> usize;

    fn map_iter<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a str, &'a Self::Value)> + 'a>;

    fn map_get(&self, key: &str) -> Option<&Self::Value>;

    fn map_get_mut(&mut self, key: &str) -> Option<&mut Self::Value>;

    fn map_remove(&mut self, key: &str) -> bool;
}

impl<V: Reflect> StringMap for BTreeMap<String, V> {
    type Value = V;

    fn map_len(&self) -> usize {
        self.len()
    }

    fn map_iter<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a str, &'a V)> + 'a> {
        Box::new(self.iter().map(|(k, v)| (k.as_str(), v)))
    }

    fn map_get(&self, key: &str) -> Option<&V> {
        self.get(key)
    }

    fn map_get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.get_mut(key)
    }

    fn map_remove(&mut self, key: &str) -> bool {
        self.remove(key).is_some()
    }
}

impl<V: Reflect, S: BuildHasher + 'static> StringMap for HashMap<String, V, S> {
    type Value = V;

    fn map_len(&self) -> usize {
        self.len()
    }

    fn map_iter<'a>(&'a self) -> Box<dyn Iterator<Item = (&'a str, &'a V)> + 'a> {
        Box::new(self.iter().map(|(k, v)| (k.as_str(), v)))
    }

    fn map_get(&self, key: &str) -> Option<&V> {
        self.get(key)
    }

    fn map_get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.get_mut(key)
    }

    fn map_remove(&mut self, key: &str) -> bool {
        self.remove(key).is_some()
    }
}

/// Dict adapter for any [`StringMap`]
pub struct MapInfo<M> {
    type_name: &'static str,
    value: Descriptor,
    _map: PhantomData<fn() -> M>,
}

impl<M: StringMap> MapInfo<M> {
    pub fn new(value: Descriptor) -> Self {
        Self {
            type_name: std::any::type_name::<M>(),
            value,
            _map: PhantomData,
        }
    }
}

impl<M: StringMap> DictInfo for MapInfo<M> {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn byte_size(&self) -> usize {
        std::mem::size_of::<M>()
    }

    fn len(&self, value: &dyn Any) -> Result<usize> {
        Ok(downcast::<M>(value)?.map_len())
    }

    fn entries<'a>(&'a self, value: &'a dyn Any) -> Result<Entries<'a>> {
        let map = downcast::<M>(value)?;
        let desc = self.value;
        Ok(Entries::new(
            map.map_iter()
                .map(move |(k, v)| (k, TypedRef::new(v as &dyn Any, desc))),
            map.map_len(),
        ))
    }

    fn get<'a>(&self, value: &'a dyn Any, key: &str) -> Result<Option<TypedRef<'a>>> {
        let map = downcast::<M>(value)?;
        Ok(map
            .map_get(key)
            .map(|v| TypedRef::new(v as &dyn Any, self.value)))
    }

    fn get_mut<'a>(&self, value: &'a mut dyn Any, key: &str) -> Result<Option<TypedMut<'a>>> {
        let map = downcast_mut::<M>(value)?;
        Ok(map
            .map_get_mut(key)
            .map(|v| TypedMut::new(v as &mut dyn Any, self.value)))
    }

    fn erase(&self, value: &mut dyn Any, key: &str) -> Result<bool> {
        Ok(downcast_mut::<M>(value)?.map_remove(key))
    }
}

impl<V: Reflect> Reflect for BTreeMap<String, V> {
    fn descriptor_in(registry: &Registry) -> Descriptor {
        registry.intern::<Self>(|| {
            Adapter::Dict(Box::new(MapInfo::<Self>::new(V::descriptor_in(registry))))
        })
    }
}

impl<V: Reflect, S: BuildHasher + 'static> Reflect for HashMap<String, V, S> {
    fn descriptor_in(registry: &Registry) -> Descriptor {
        registry.intern::<Self>(|| {
            Adapter::Dict(Box::new(MapInfo::<Self>::new(V::descriptor_in(registry))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Kind;

    fn array_info(d: Descriptor) -> &'static dyn ArrayInfo {
        match d {
            Descriptor::Array(info) => info,
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn string_set_requires_utf8() {
        let Descriptor::String(info) = String::descriptor() else {
            panic!("expected string")
        };
        let mut s = String::from("old");
        info.set(&mut s, b"hi").unwrap();
        assert_eq!(s, "hi");
        assert_eq!(info.get(&s).unwrap(), b"hi");
        assert!(matches!(info.set(&mut s, &[0xff, 0xfe]), Err(Error::InvalidUtf8(_))));
        assert_eq!(s, "hi");
    }

    #[test]
    fn vec_resize_then_fill() {
        let info = array_info(<Vec<u8>>::descriptor());
        let mut v: Vec<u8> = vec![9, 9];
        info.resize(&mut v, 5).unwrap();
        assert_eq!(v, [9, 9, 0, 0, 0]);
        let Descriptor::Integer(elem) = info.element() else {
            panic!("expected integer element")
        };
        for (i, slot) in info.elements_mut(&mut v).unwrap().enumerate() {
            elem.set(slot, i as i64 + 1).unwrap();
        }
        assert_eq!(v, [1, 2, 3, 4, 5]);
        info.resize(&mut v, 2).unwrap();
        assert_eq!(v, [1, 2]);
        assert_eq!(info.elements(&v).unwrap().len(), 2);
    }

    #[test]
    fn vec_resize_reports_exhaustion() {
        let info = array_info(<Vec<u64>>::descriptor());
        let mut v: Vec<u64> = vec![3];
        assert!(matches!(
            info.resize(&mut v, usize::MAX),
            Err(Error::ResourceExhausted { .. })
        ));
        assert_eq!(v, [3]);
    }

    #[test]
    fn fixed_array_keeps_length() {
        let info = array_info(<[i16; 3]>::descriptor());
        let mut a = [1i16, 2, 3];
        assert_eq!(info.len(&a).unwrap(), 3);
        info.resize(&mut a, 3).unwrap();
        assert!(matches!(
            info.resize(&mut a, 4),
            Err(Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn tuple_children() {
        let Descriptor::List(info) = <(u8, String, bool)>::descriptor() else {
            panic!("expected list")
        };
        let mut t = (1u8, String::from("x"), true);
        assert_eq!(info.len(&t).unwrap(), 3);
        let child = info.child(&t, 1).unwrap();
        assert_eq!(child.descriptor.kind(), Kind::String);
        assert!(matches!(
            info.child(&t, 3),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        ));
        let slot = info.child_mut(&mut t, 2).unwrap();
        let Descriptor::Bool(b) = slot.descriptor else {
            panic!("expected bool")
        };
        b.set(slot.value, false).unwrap();
        assert!(!t.2);
    }

    #[test]
    fn map_entries_and_erase() {
        let Descriptor::Dict(info) = <BTreeMap<String, i32>>::descriptor() else {
            panic!("expected dict")
        };
        let mut m = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);
        let keys: Vec<&str> = info.entries(&m).unwrap().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
        assert!(info.get(&m, "c").unwrap().is_none());
        assert!(info.get_mut(&mut m, "c").unwrap().is_none());
        assert!(info.erase(&mut m, "a").unwrap());
        assert!(!info.erase(&mut m, "a").unwrap());
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn wrong_location_is_rejected() {
        let info = array_info(<Vec<u8>>::descriptor());
        let not_a_vec = 5u8;
        assert!(matches!(
            info.len(&not_a_vec),
            Err(Error::LocationMismatch { .. })
        ));
    }
}
