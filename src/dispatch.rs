//! Kind dispatch
//!
//! Every algorithm that walks values through descriptors (the JSON codec, the
//! binary codec, and the hasher) is written as a [`KindVisitor`]: one method
//! per kind, each receiving the concrete descriptor type for that kind. The
//! single [`dispatch`] function is the only place in the crate where a
//! descriptor is matched against its kind, and the match has no fallback arm,
//! so adding a kind is a compile error in every visitor until it is handled.

use crate::descriptor::{
    ArrayInfo, BoolInfo, Descriptor, DictInfo, FloatInfo, IntegerInfo, ListInfo, StringInfo,
};

/// Algorithm specialized per descriptor kind
///
/// Visitors are consumed by value; per-call state such as the value location
/// or an output sink lives in the visitor itself.
pub trait KindVisitor {
    type Output;

    fn visit_bool(self, info: &'static BoolInfo) -> Self::Output;

    fn visit_integer(self, info: &'static IntegerInfo) -> Self::Output;

    fn visit_float(self, info: &'static FloatInfo) -> Self::Output;

    fn visit_string(self, info: &'static dyn StringInfo) -> Self::Output;

    fn visit_array(self, info: &'static dyn ArrayInfo) -> Self::Output;

    fn visit_list(self, info: &'static dyn ListInfo) -> Self::Output;

    fn visit_dict(self, info: &'static dyn DictInfo) -> Self::Output;
}

/// Forwards `descriptor` to the method of `visitor` for its kind
#[inline]
pub fn dispatch<V: KindVisitor>(descriptor: Descriptor, visitor: V) -> V::Output {
    match descriptor {
        Descriptor::Bool(info) => visitor.visit_bool(info),
        Descriptor::Integer(info) => visitor.visit_integer(info),
        Descriptor::Float(info) => visitor.visit_float(info),
        Descriptor::String(info) => visitor.visit_string(info),
        Descriptor::Array(info) => visitor.visit_array(info),
        Descriptor::List(info) => visitor.visit_list(info),
        Descriptor::Dict(info) => visitor.visit_dict(info),
    }
}
