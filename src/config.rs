//! Runtime options of the binary codec and the hasher
//!
//! The defaults of every option can be flipped at compile time through Cargo
//! features, so that a downstream crate can pick the interop-friendly behavior
//! once instead of threading a config value through every call:
//!
//! | Feature | Effect |
//! |---|---|
//! | `lenient_int_tags` | [`BinaryConfig::default`] accepts any fitting integer tag |
//! | `iteration_order_hash` | [`HashConfig::default`] hashes dict entries in iteration order |

/// How the binary decoder matches integer (and float) wire tags against the
/// declared format of the target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntTagPolicy {
    /// The wire tag must be exactly the tag the encoder emits for the declared
    /// format. Floats must be `float64`.
    Exact,
    /// Any MessagePack integer encoding is accepted as long as its value fits
    /// the declared format. Floats may be `float32` or `float64`.
    Lenient,
}

impl Default for IntTagPolicy {
    fn default() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(feature = "lenient_int_tags")] {
                IntTagPolicy::Lenient
            } else {
                IntTagPolicy::Exact
            }
        }
    }
}

/// Order in which the hasher feeds dict entries into the digest
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DictOrder {
    /// Entries are sorted by the bytes of their keys, so the digest does not
    /// depend on the container's iteration order.
    SortedByKey,
    /// Entries are fed in whatever order the container iterates them.
    Iteration,
}

impl Default for DictOrder {
    fn default() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(feature = "iteration_order_hash")] {
                DictOrder::Iteration
            } else {
                DictOrder::SortedByKey
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinaryConfig {
    pub int_tags: IntTagPolicy,
}

impl BinaryConfig {
    #[must_use]
    pub fn with_int_tags(mut self, int_tags: IntTagPolicy) -> Self {
        self.int_tags = int_tags;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HashConfig {
    pub dict_order: DictOrder,
}

impl HashConfig {
    #[must_use]
    pub fn with_dict_order(mut self, dict_order: DictOrder) -> Self {
        self.dict_order = dict_order;
        self
    }
}
