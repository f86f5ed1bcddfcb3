use {
    alloc::boxed::Box,
    core::{fmt, ptr::NonNull},
};

/// The release action of an owning pointer.
pub trait Deleter<T: ?Sized> {
    /// Release the resource behind `ptr`.
    ///
    /// # Safety
    ///
    /// The caller must own `ptr` and must not use it after this call.
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

/// Drops the pointee and frees its storage as a [`Box`] would.
///
/// For `[T]` this drops every element and frees the slice allocation.
///
///   [`Box`]: <https://doc.rust-lang.org/stable/std/boxed/struct.Box.html>
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefaultDelete;

impl<T: ?Sized> Deleter<T> for DefaultDelete {
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        // SAFETY: pointers handed to `DefaultDelete` come from `Box::into_raw`.
        drop(Box::from_raw(ptr.as_ptr()))
    }
}

/// A deleter that calls a closure.
///
/// ```rust
/// # use counted_ptr::*;
/// # use core::{cell::Cell, ptr::NonNull};
/// let released = Cell::new(0);
/// let value = Box::into_raw(Box::new(7u8));
/// let deleter = DeleteFn(|ptr: NonNull<u8>| {
///     released.set(released.get() + 1);
///     drop(unsafe { Box::from_raw(ptr.as_ptr()) });
/// });
/// drop(unsafe { UniquePtr::from_raw_with_deleter(value, deleter) });
/// assert_eq!(released.get(), 1);
/// ```
#[derive(Clone, Copy, Default)]
pub struct DeleteFn<F>(pub F);

impl<T: ?Sized, F> Deleter<T> for DeleteFn<F>
where
    F: FnMut(NonNull<T>),
{
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        (self.0)(ptr)
    }
}

impl<F> fmt::Debug for DeleteFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DeleteFn").finish()
    }
}
