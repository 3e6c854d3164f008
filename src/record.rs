//! Record descriptors
//!
//! A record is a fixed-layout struct whose named fields are exposed as a
//! dict. The key set of a record is fixed: fields can be read, overwritten,
//! and iterated in declaration order, but never inserted or erased.
//!
//! Record descriptors are normally produced by an external generator from a
//! schema. Within Rust the [`record!`](crate::record!) macro plays that role: it
//! declares the struct and implements [`Reflect`] for it in one go.
//!
//! ```
//! use typeinfo::{record, json};
//!
//! record! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Point {
//!         pub x: i32,
//!         pub y: i32,
//!     }
//! }
//!
//! let doc = json::to_json(&Point { x: 1, y: -2 }).unwrap();
//! assert_eq!(doc.to_string(), r#"{"x":1,"y":-2}"#);
//! ```

use std::any::Any;
use std::sync::OnceLock;

use crate::descriptor::{
    downcast, downcast_mut, DictInfo, Entries, FieldLayout, TypedMut, TypedRef,
};
use crate::error::{Error, Result};
use crate::reflect::Reflect;
use crate::registry::Registry;

trait Project<T>: Send + Sync {
    fn get<'a>(&self, record: &'a T) -> &'a dyn Any;

    fn get_mut<'a>(&self, record: &'a mut T) -> &'a mut dyn Any;
}

struct Projection<T, F> {
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
}

impl<T: 'static, F: Any> Project<T> for Projection<T, F> {
    fn get<'a>(&self, record: &'a T) -> &'a dyn Any {
        (self.get)(record)
    }

    fn get_mut<'a>(&self, record: &'a mut T) -> &'a mut dyn Any {
        (self.get_mut)(record)
    }
}

/// A named field of a record of type `T`, as listed by a [`FieldTable`]
pub struct Field<T> {
    layout: FieldLayout,
    access: Box<dyn Project<T>>,
}

impl<T: 'static> Field<T> {
    /// Constructs a field from its accessors, resolving the descriptor of the
    /// field type through `registry`
    pub fn new<F: Reflect>(
        name: &'static str,
        offset: usize,
        registry: &Registry,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        Self {
            layout: FieldLayout {
                name,
                offset,
                descriptor: F::descriptor_in(registry),
            },
            access: Box::new(Projection { get, get_mut }),
        }
    }
}

/// Builds the field table of a record of type `T`
pub type FieldTable<T> = fn(&Registry) -> Vec<Field<T>>;

struct Resolved<T> {
    layout: Vec<FieldLayout>,
    access: Vec<Box<dyn Project<T>>>,
}

/// Dict adapter exposing the fields of a record of type `T`
///
/// The field table is resolved on first use rather than on construction, so
/// that the record is already interned when its field types are resolved.
pub struct RecordInfo<T> {
    type_name: &'static str,
    registry: Registry,
    table: FieldTable<T>,
    resolved: OnceLock<Resolved<T>>,
}

impl<T: Any> RecordInfo<T> {
    #[must_use]
    pub fn new(registry: &Registry, table: FieldTable<T>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            registry: registry.clone(),
            table,
            resolved: OnceLock::new(),
        }
    }

    fn resolved(&self) -> &Resolved<T> {
        self.resolved.get_or_init(|| {
            let (layout, access) = (self.table)(&self.registry)
                .into_iter()
                .map(|f| (f.layout, f.access))
                .unzip();
            Resolved { layout, access }
        })
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.resolved().layout.iter().position(|f| f.name == key)
    }
}

impl<T: Any> DictInfo for RecordInfo<T> {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn byte_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    fn len(&self, value: &dyn Any) -> Result<usize> {
        downcast::<T>(value)?;
        Ok(self.resolved().layout.len())
    }

    fn entries<'a>(&'a self, value: &'a dyn Any) -> Result<Entries<'a>> {
        let record = downcast::<T>(value)?;
        let Resolved { layout, access } = self.resolved();
        Ok(Entries::new(
            layout.iter().zip(access).map(move |(f, access)| {
                (f.name, TypedRef::new(access.get(record), f.descriptor))
            }),
            layout.len(),
        ))
    }

    fn get<'a>(&self, value: &'a dyn Any, key: &str) -> Result<Option<TypedRef<'a>>> {
        let record = downcast::<T>(value)?;
        let fields = self.resolved();
        Ok(self.position(key).map(|i| {
            TypedRef::new(fields.access[i].get(record), fields.layout[i].descriptor)
        }))
    }

    fn get_mut<'a>(&self, value: &'a mut dyn Any, key: &str) -> Result<Option<TypedMut<'a>>> {
        let record = downcast_mut::<T>(value)?;
        let fields = self.resolved();
        Ok(self.position(key).map(|i| {
            TypedMut::new(fields.access[i].get_mut(record), fields.layout[i].descriptor)
        }))
    }

    fn erase(&self, value: &mut dyn Any, key: &str) -> Result<bool> {
        downcast_mut::<T>(value)?;
        Err(Error::Unsupported(format!(
            "cannot erase field `{key}` of record `{}`",
            self.type_name
        )))
    }

    fn layout(&self) -> Option<&[FieldLayout]> {
        Some(&self.resolved().layout)
    }
}

/// Declares a record struct and implements [`Reflect`] for it
///
/// Every field type must itself implement [`Reflect`]. The struct is exposed
/// as a dict whose keys are the field names, in declaration order.
#[macro_export]
macro_rules! record {
    (
        $( #[$meta:meta] )*
        $vis:vis struct $name:ident {
            $( $( #[$fmeta:meta] )* $fvis:vis $field:ident : $fty:ty ),* $(,)?
        }
    ) => {
        $( #[$meta] )*
        $vis struct $name {
            $( $( #[$fmeta] )* $fvis $field : $fty ),*
        }

        impl $crate::reflect::Reflect for $name {
            fn descriptor_in(
                registry: &$crate::registry::Registry,
            ) -> $crate::descriptor::Descriptor {
                #[allow(unused_variables)]
                fn table(
                    registry: &$crate::registry::Registry,
                ) -> ::std::vec::Vec<$crate::record::Field<$name>> {
                    ::std::vec![
                        $(
                            $crate::record::Field::new::<$fty>(
                                ::std::stringify!($field),
                                ::std::mem::offset_of!($name, $field),
                                registry,
                                {
                                    fn get(r: &$name) -> &$fty {
                                        &r.$field
                                    }
                                    get
                                },
                                {
                                    fn get_mut(r: &mut $name) -> &mut $fty {
                                        &mut r.$field
                                    }
                                    get_mut
                                },
                            )
                        ),*
                    ]
                }

                registry.intern::<$name>(|| {
                    $crate::registry::Adapter::Dict(::std::boxed::Box::new(
                        $crate::record::RecordInfo::<$name>::new(registry, table),
                    ))
                })
            }
        }
    };
}
