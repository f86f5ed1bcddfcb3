//! Owning pointers with manual reference counting:
//! an exclusive [`UniquePtr`] with a pluggable release action,
//! and a single-threaded [`SharedPtr`] whose control block either wraps
//! a caller-allocated object or stores the object inline.
//!
//! # Examples
//!
//! The simplest example is a shared value built with one allocation:
//!
//! ```rust
//! # use counted_ptr::*;
//! let shared = make_shared(vec![1, 2, 3]);
//! let other = shared.clone();
//! assert_eq!(shared.use_count(), 2);
//! assert_eq!(&*other, &[1, 2, 3]);
//! ```
//!
//! A shared pointer can view a part of the object it keeps alive:
//!
//! ```rust
//! # use counted_ptr::*;
//! struct Node { name: String, weight: u32 }
//! let node = make_shared(Node { name: "root".into(), weight: 3 });
//! let name: SharedPtr<str> = SharedPtr::map(&node, |node| node.name.as_str());
//! drop(node);
//! assert_eq!(&*name, "root");
//! assert_eq!(name.use_count(), 1);
//! ```
//!
//! Exclusive pointers carry their deleter inline,
//! and a stateless deleter costs nothing:
//!
//! ```rust
//! # use counted_ptr::*;
//! # use core::mem::size_of;
//! assert_eq!(size_of::<UniquePtr<u64>>(), size_of::<*mut u64>());
//! let slice: UniquePtr<[u8]> = vec![1, 2, 3].into();
//! assert_eq!(slice[2], 3);
//! ```
//!
//! An exclusive pointer can hand its object and deleter over to shared ownership:
//!
//! ```rust
//! # use counted_ptr::*;
//! let unique = UniquePtr::new(5);
//! let shared = SharedPtr::from(unique);
//! assert_eq!(*shared, 5);
//! ```

#![no_std]
extern crate alloc;

use core::ptr::NonNull;

// Compiles to nothing unless the `log` feature is enabled.
macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::trace!($($arg)*);
    };
}

// Comparison and formatting impls shared by both pointer types.
// Empty handles format as `null` and compare as `None`.
macro_rules! pointer_traits {
    ( impl[$($generics:tt)*] for $ptr:ty ) => {
        impl<$($generics)*> fmt::Debug for $ptr
        where
            T: fmt::Debug,
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.as_ref() {
                    Some(value) => fmt::Debug::fmt(value, f),
                    None => f.write_str("null"),
                }
            }
        }

        impl<$($generics)*> fmt::Pointer for $ptr {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.get() {
                    Some(ptr) => fmt::Pointer::fmt(&ptr, f),
                    None => fmt::Pointer::fmt(&ptr::null::<u8>(), f),
                }
            }
        }

        impl<$($generics)*> PartialEq for $ptr
        where
            T: PartialEq,
        {
            fn eq(&self, other: &Self) -> bool {
                self.as_ref() == other.as_ref()
            }
        }

        impl<$($generics)*> Eq for $ptr where T: Eq {}

        impl<$($generics)*> PartialOrd for $ptr
        where
            T: PartialOrd,
        {
            fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
                self.as_ref().partial_cmp(&other.as_ref())
            }
        }

        impl<$($generics)*> Ord for $ptr
        where
            T: Ord,
        {
            fn cmp(&self, other: &Self) -> cmp::Ordering {
                self.as_ref().cmp(&other.as_ref())
            }
        }

        impl<$($generics)*> hash::Hash for $ptr
        where
            T: hash::Hash,
        {
            fn hash<H>(&self, state: &mut H)
            where
                H: hash::Hasher,
            {
                hash::Hash::hash(&self.as_ref(), state)
            }
        }
    };
}

mod block;
mod deleter;
mod pair;
mod shared;
mod unique;

pub use crate::{
    block::InPlace,
    deleter::{DefaultDelete, DeleteFn, Deleter},
    pair::CompressedPair,
    shared::{make_shared, make_shared_with, SharedPtr},
    unique::UniquePtr,
};

#[cold]
#[track_caller]
fn null_deref() -> ! {
    panic!("dereferenced an empty pointer handle")
}

/// Compares addresses only, ignoring any pointer metadata.
fn same_address<T: ?Sized>(a: Option<NonNull<T>>, b: Option<NonNull<T>>) -> bool {
    a.map(|a| a.cast::<u8>()) == b.map(|b| b.cast::<u8>())
}
