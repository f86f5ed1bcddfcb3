use {
    crate::{
        deleter::{DefaultDelete, Deleter},
        null_deref,
        pair::CompressedPair,
        same_address,
    },
    alloc::{boxed::Box, vec::Vec},
    core::{
        cmp, fmt, hash,
        marker::PhantomData,
        mem::{self, ManuallyDrop},
        ops::{Deref, DerefMut, Index, IndexMut},
        ptr::{self, NonNull},
    },
};

/// An owning pointer with a customizable release action.
///
/// Exactly one `UniquePtr` owns a given pointer. The deleter runs once,
/// when the pointer is dropped, reset or replaced.
/// With the zero-sized [`DefaultDelete`], a `UniquePtr<T>` is the size of a raw pointer.
///
/// ```rust
/// # use counted_ptr::*;
/// let mut owned = UniquePtr::new(String::from("owned"));
/// owned.push_str(" value");
/// assert_eq!(&*owned, "owned value");
/// owned.reset();
/// assert!(owned.is_null());
/// ```
pub struct UniquePtr<T: ?Sized, D: Deleter<T> = DefaultDelete> {
    pair: CompressedPair<Option<NonNull<T>>, D>,
    marker: PhantomData<T>,
}

pointer_traits!(impl[T: ?Sized, D: Deleter<T>] for UniquePtr<T, D>);

unsafe impl<T: ?Sized, D: Deleter<T>> Send for UniquePtr<T, D>
where
    T: Send,
    D: Send,
{
}
unsafe impl<T: ?Sized, D: Deleter<T>> Sync for UniquePtr<T, D>
where
    T: Sync,
    D: Sync,
{
}

impl<T> UniquePtr<T> {
    /// Box `value` and take ownership of it.
    pub fn new(value: T) -> Self {
        Box::new(value).into()
    }
}

impl<T: ?Sized> UniquePtr<T> {
    /// Give the pointee back as a `Box`, or `None` for an empty handle.
    pub fn into_box(this: Self) -> Option<Box<T>> {
        let (ptr, DefaultDelete) = UniquePtr::into_raw_parts(this);
        // SAFETY: `DefaultDelete` only ever owns pointers from `Box::into_raw`.
        ptr.map(|ptr| unsafe { Box::from_raw(ptr.as_ptr()) })
    }
}

impl<T: ?Sized, D: Deleter<T>> UniquePtr<T, D> {
    /// An empty handle.
    pub fn null() -> Self
    where
        D: Default,
    {
        Self::from_parts(None, D::default())
    }

    /// Take ownership of `ptr`. A null pointer gives an empty handle.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or releasable by `D::default()`,
    /// and nothing else may release it.
    pub unsafe fn from_raw(ptr: *mut T) -> Self
    where
        D: Default,
    {
        Self::from_raw_with_deleter(ptr, D::default())
    }

    /// Take ownership of `ptr`, to be released by `deleter`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or releasable by `deleter`,
    /// and nothing else may release it.
    pub unsafe fn from_raw_with_deleter(ptr: *mut T, deleter: D) -> Self {
        Self::from_parts(NonNull::new(ptr), deleter)
    }

    fn from_parts(ptr: Option<NonNull<T>>, deleter: D) -> Self {
        UniquePtr {
            pair: CompressedPair::new(ptr, deleter),
            marker: PhantomData,
        }
    }

    /// Split into the owned pointer and the deleter without releasing anything.
    pub fn into_raw_parts(this: Self) -> (Option<NonNull<T>>, D) {
        let this = ManuallyDrop::new(this);
        let ptr = *this.pair.first();
        // SAFETY: `this` is never dropped, so the deleter is moved out exactly once.
        let deleter = unsafe { ptr::read(this.pair.second()) };
        (ptr, deleter)
    }

    /// Move ownership into a pointer of another pointee and deleter type.
    ///
    /// ```rust
    /// # use counted_ptr::*;
    /// # use core::{fmt::Display, ptr::NonNull};
    /// let number = UniquePtr::new(42);
    /// let shown: UniquePtr<dyn Display> =
    ///     unsafe { UniquePtr::cast(number, |ptr| -> NonNull<dyn Display> { ptr }) };
    /// assert_eq!(shown.to_string(), "42");
    /// ```
    ///
    /// # Safety
    ///
    /// `cast` must return a pointer to the same object that `E` can release.
    pub unsafe fn cast<U: ?Sized, E>(
        this: Self,
        cast: impl FnOnce(NonNull<T>) -> NonNull<U>,
    ) -> UniquePtr<U, E>
    where
        E: Deleter<U> + From<D>,
    {
        let (ptr, deleter) = UniquePtr::into_raw_parts(this);
        UniquePtr::from_parts(ptr.map(cast), E::from(deleter))
    }

    pub fn get(&self) -> Option<NonNull<T>> {
        *self.pair.first()
    }

    pub fn is_null(&self) -> bool {
        self.pair.first().is_none()
    }

    pub fn as_ref(&self) -> Option<&T> {
        // SAFETY: an owned pointer is valid until released.
        self.get().map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    pub fn as_mut(&mut self) -> Option<&mut T> {
        // SAFETY: as above, and `&mut self` makes the access unique.
        self.get().map(|ptr| unsafe { &mut *ptr.as_ptr() })
    }

    pub fn deleter(&self) -> &D {
        self.pair.second()
    }

    pub fn deleter_mut(&mut self) -> &mut D {
        self.pair.second_mut()
    }

    /// Give up ownership without running the deleter.
    ///
    /// The caller becomes responsible for the returned pointer.
    pub fn release(&mut self) -> Option<NonNull<T>> {
        self.pair.first_mut().take()
    }

    /// Release the owned resource, if any, and become empty.
    pub fn reset(&mut self) {
        let (ptr, deleter) = self.pair.split_mut();
        if let Some(old) = ptr.take() {
            // SAFETY: `old` was owned and is no longer reachable from `self`.
            unsafe { deleter.delete(old) }
        }
    }

    /// Adopt `ptr`, then release the previously owned pointer.
    ///
    /// Resetting to the pointer already owned does nothing.
    ///
    /// # Safety
    ///
    /// Same as [`from_raw_with_deleter`](Self::from_raw_with_deleter)
    /// for the current deleter.
    pub unsafe fn reset_raw(&mut self, ptr: *mut T) {
        let new = NonNull::new(ptr);
        let (ptr, deleter) = self.pair.split_mut();
        if same_address(*ptr, new) {
            return;
        }
        if let Some(old) = mem::replace(ptr, new) {
            deleter.delete(old)
        }
    }

    /// Exchange pointers and deleters. No resource is released.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.pair, &mut other.pair)
    }
}

impl<T: ?Sized, D: Deleter<T>> Drop for UniquePtr<T, D> {
    fn drop(&mut self) {
        self.reset()
    }
}

impl<T: ?Sized, D: Deleter<T> + Default> Default for UniquePtr<T, D> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized> From<Box<T>> for UniquePtr<T> {
    fn from(this: Box<T>) -> Self {
        unsafe { UniquePtr::from_raw(Box::into_raw(this)) }
    }
}

impl<T> From<Vec<T>> for UniquePtr<[T]> {
    fn from(this: Vec<T>) -> Self {
        this.into_boxed_slice().into()
    }
}

impl<T: ?Sized, D: Deleter<T>> Deref for UniquePtr<T, D> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.as_ref() {
            Some(value) => value,
            None => null_deref(),
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> DerefMut for UniquePtr<T, D> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        match self.as_mut() {
            Some(value) => value,
            None => null_deref(),
        }
    }
}

impl<T, D: Deleter<[T]>> UniquePtr<[T], D> {
    /// Number of owned elements; zero for an empty handle.
    pub fn len(&self) -> usize {
        self.as_ref().map_or(0, <[T]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, D: Deleter<[T]>> Index<usize> for UniquePtr<[T], D> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        &(**self)[index]
    }
}

impl<T, D: Deleter<[T]>> IndexMut<usize> for UniquePtr<[T], D> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut (**self)[index]
    }
}
