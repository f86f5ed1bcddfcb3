//! Control blocks: the reference counts behind a [`SharedPtr`](crate::SharedPtr).
//!
//! Every block starts with the same `#[repr(C)]`-placed `Header`,
//! so a block of any variant can be handled through an erased header pointer.
//! The header's `release` function drops the managed resource and frees the block.
//!
//! There are two variants:
//!
//! - an external block, which owns a pointer that was allocated by the caller
//!   and releases it with a [`Deleter`];
//! - an in-place block, which stores the value itself,
//!   so one allocation holds both the counts and the payload.

use {
    crate::{deleter::Deleter, pair::CompressedPair},
    alloc::{
        alloc::{alloc, dealloc, handle_alloc_error, Layout},
        boxed::Box,
    },
    core::{
        cell::Cell,
        fmt,
        marker::PhantomData,
        mem::{ManuallyDrop, MaybeUninit},
        ops::{Deref, DerefMut},
        ptr::{self, NonNull},
    },
};

pub(crate) struct Header {
    strong: Cell<usize>,
    weak: Cell<usize>,
    release: unsafe fn(NonNull<Header>),
}

impl Header {
    fn new(release: unsafe fn(NonNull<Header>)) -> Self {
        Header {
            strong: Cell::new(1),
            weak: Cell::new(0),
            release,
        }
    }
}

#[repr(C)]
struct Block<Payload> {
    // NB: must stay the first field, handles only see a pointer to it
    header: Header,
    payload: Payload,
}

/// An erased pointer to a live control block.
///
/// Every `BlockPtr` held by a handle accounts for one strong reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockPtr(NonNull<Header>);

impl BlockPtr {
    /// Allocate an external block owning `ptr`, with a strong count of one.
    pub(crate) fn external<T: ?Sized, D: Deleter<T>>(ptr: NonNull<T>, deleter: D) -> Self {
        let block = Box::new(Block {
            header: Header::new(release_external::<T, D>),
            payload: External(CompressedPair::new(ptr, deleter)),
        });
        let this = BlockPtr(NonNull::from(Box::leak(block)).cast());
        trace!(
            "allocated external block {:p} for {}",
            this.0,
            core::any::type_name::<T>()
        );
        this
    }

    /// # Safety
    ///
    /// The block must be live, which holds while any handle owns it.
    unsafe fn header<'a>(self) -> &'a Header {
        &*self.0.as_ptr()
    }

    /// # Safety
    ///
    /// See [`header`](Self::header).
    pub(crate) unsafe fn strong(self) -> usize {
        self.header().strong.get()
    }

    /// # Safety
    ///
    /// See [`header`](Self::header).
    pub(crate) unsafe fn weak(self) -> usize {
        self.header().weak.get()
    }

    /// Add a strong reference.
    ///
    /// # Safety
    ///
    /// See [`header`](Self::header).
    pub(crate) unsafe fn increment(self) {
        let strong = &self.header().strong;
        let count = strong
            .get()
            .checked_add(1)
            .unwrap_or_else(|| panic!("strong count overflow"));
        strong.set(count);
    }

    /// Give up a strong reference, releasing the block when it was the last one.
    ///
    /// # Safety
    ///
    /// The caller must own one of the block's strong references
    /// and must not use the block afterwards.
    pub(crate) unsafe fn decrement(self) {
        let header = self.header();
        let count = header.strong.get() - 1;
        header.strong.set(count);
        if count == 0 {
            trace!("releasing block {:p}", self.0);
            let release = header.release;
            release(self.0);
        }
    }
}

struct External<T: ?Sized, D: Deleter<T>>(CompressedPair<NonNull<T>, D>);

impl<T: ?Sized, D: Deleter<T>> Drop for External<T, D> {
    fn drop(&mut self) {
        let (ptr, deleter) = self.0.split_mut();
        // SAFETY: the block is the sole owner of `ptr`, and this runs once.
        unsafe { deleter.delete(*ptr) }
    }
}

unsafe fn release_external<T: ?Sized, D: Deleter<T>>(header: NonNull<Header>) {
    drop(Box::from_raw(
        header.cast::<Block<External<T, D>>>().as_ptr(),
    ));
}

type InPlaceBlock<T> = Block<MaybeUninit<T>>;

/// Frees the storage of an in-place block when dropped.
///
/// Covers both a panicking initializer and a panicking destructor.
struct Storage<T> {
    raw: NonNull<InPlaceBlock<T>>,
}

impl<T> Storage<T> {
    fn layout() -> Layout {
        Layout::new::<InPlaceBlock<T>>()
    }

    fn value(&self) -> NonNull<T> {
        unsafe {
            let payload = ptr::addr_of_mut!((*self.raw.as_ptr()).payload);
            NonNull::new_unchecked(payload.cast())
        }
    }
}

impl<T> Drop for Storage<T> {
    fn drop(&mut self) {
        unsafe { dealloc(self.raw.as_ptr().cast(), Self::layout()) }
    }
}

unsafe fn release_in_place<T>(header: NonNull<Header>) {
    let storage = Storage::<T> { raw: header.cast() };
    ptr::drop_in_place(storage.value().as_ptr());
}

/// A value living inside its own control block, not yet shared.
///
/// This is the single allocation behind [`make_shared`](crate::make_shared).
/// The value can be mutated freely until the block is turned into a
/// [`SharedPtr`](crate::SharedPtr), which adopts it without reallocating.
///
/// ```rust
/// # use counted_ptr::*;
/// let mut block = InPlace::new(vec![1, 2]);
/// block.push(3);
/// let shared = SharedPtr::from(block);
/// assert_eq!(*shared, [1, 2, 3]);
/// assert_eq!(shared.use_count(), 1);
/// ```
pub struct InPlace<T> {
    storage: ManuallyDrop<Storage<T>>,
    marker: PhantomData<T>,
}

impl<T> InPlace<T> {
    pub fn new(value: T) -> Self {
        Self::new_with(|| value)
    }

    /// Allocate the block, then construct the value into it with `init`.
    ///
    /// If `init` panics, the allocation is freed.
    pub fn new_with<F>(init: F) -> Self
    where
        F: FnOnce() -> T,
    {
        let layout = Storage::<T>::layout();
        unsafe {
            let raw = NonNull::new(alloc(layout))
                .unwrap_or_else(|| handle_alloc_error(layout))
                .cast::<InPlaceBlock<T>>();
            let storage = Storage { raw };
            ptr::write(
                ptr::addr_of_mut!((*raw.as_ptr()).header),
                Header::new(release_in_place::<T>),
            );
            storage.value().as_ptr().write(init());
            trace!(
                "allocated in-place block {:p} for {}",
                raw,
                core::any::type_name::<T>()
            );
            InPlace {
                storage: ManuallyDrop::new(storage),
                marker: PhantomData,
            }
        }
    }

    /// Hand the value pointer and the block's strong reference to a handle.
    pub(crate) fn into_raw_parts(this: Self) -> (NonNull<T>, BlockPtr) {
        let this = ManuallyDrop::new(this);
        (this.storage.value(), BlockPtr(this.storage.raw.cast()))
    }
}

impl<T> Drop for InPlace<T> {
    fn drop(&mut self) {
        unsafe { BlockPtr(self.storage.raw.cast()).decrement() }
    }
}

impl<T> Deref for InPlace<T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.storage.value().as_ptr() }
    }
}

impl<T> DerefMut for InPlace<T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.storage.value().as_ptr() }
    }
}

impl<T: fmt::Debug> fmt::Debug for InPlace<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InPlace").field(&**self).finish()
    }
}

