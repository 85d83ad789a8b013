//! Typed ID wrappers providing compile-time safety for entity identifiers.
//!
//! Each ID type is a newtype over `u64` issued by an [`IdAllocator`] owned by
//! the registry that holds the entities. Allocation is strictly monotonic, so
//! IDs are injective per registry and double as stable on-disk file-name
//! suffixes for newly created resources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Generate a newtype ID wrapper over `u64`.
///
/// The macro produces a struct with:
/// - `from_raw()` / `raw()` conversions to and from the inner value
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Ord`, `Hash`,
///   `Serialize`, `Deserialize`
/// - `Display` delegating to the inner value
/// - `From<u64>` so an [`IdAllocator`] can mint it
macro_rules! typed_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
                Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(u64);

            impl $name {
                /// Wrap a raw value. Intended for tests and persistence code;
                /// live IDs come from an [`IdAllocator`].
                #[must_use]
                pub const fn from_raw(raw: u64) -> Self {
                    Self(raw)
                }

                /// Return the inner value.
                #[must_use]
                pub const fn raw(self) -> u64 {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<u64> for $name {
                fn from(raw: u64) -> Self {
                    Self(raw)
                }
            }

            impl From<$name> for u64 {
                fn from(id: $name) -> Self {
                    id.0
                }
            }
        )+
    };
}

typed_id! {
    /// Unique identifier for a media object (audio or file-backed).
    MediaId,
    /// Unique identifier for a resource (one physical backing file).
    ResourceId,
}

/// Monotonic ID allocator, one per registry.
///
/// Successive calls to [`allocate`](IdAllocator::allocate) never return the
/// same value twice, even across deregistrations, which keeps freshly named
/// output files from colliding with anything the registry has ever handed out.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdAllocator<T> {
    next: u64,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T: From<u64>> IdAllocator<T> {
    /// Create an allocator starting at 1 (0 is reserved as a niche for tests).
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: 1,
            _marker: PhantomData,
        }
    }

    /// Mint the next ID.
    pub fn allocate(&mut self) -> T {
        let raw = self.next;
        self.next += 1;
        T::from(raw)
    }

    /// Ensure future allocations are strictly greater than `raw`.
    ///
    /// Used when re-hydrating a registry from persisted state.
    pub fn bump_past(&mut self, raw: u64) {
        if raw >= self.next {
            self.next = raw + 1;
        }
    }
}

impl<T: From<u64>> Default for IdAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}
