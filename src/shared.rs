use {
    crate::{
        block::{BlockPtr, InPlace},
        deleter::{DefaultDelete, Deleter},
        null_deref, same_address,
        unique::UniquePtr,
    },
    alloc::boxed::Box,
    core::{
        cmp, fmt, hash,
        marker::PhantomData,
        mem::{self, ManuallyDrop},
        ops::Deref,
        ptr::{self, NonNull},
    },
};

/// A single-threaded reference-counted pointer.
///
/// A `SharedPtr` pairs the pointer it dereferences to (its *view*)
/// with a control block that owns the managed object.
/// The two usually agree, but an aliasing handle can view a field of the owned object,
/// or any other object whose lifetime the owner guarantees.
///
/// The counts are plain cells, so `SharedPtr` is neither `Send` nor `Sync`.
///
/// ```rust
/// # use counted_ptr::*;
/// let p = make_shared(String::from("abc"));
/// let mut q = p.clone();
/// assert_eq!(p.use_count(), 2);
/// q.reset();
/// assert_eq!(p.use_count(), 1);
/// assert_eq!(*p, "abc");
/// ```
pub struct SharedPtr<T: ?Sized> {
    ptr: Option<NonNull<T>>,
    block: Option<BlockPtr>,
    marker: PhantomData<T>,
}

pointer_traits!(impl[T: ?Sized] for SharedPtr<T>);

/// Allocate `value` and its control block together.
pub fn make_shared<T>(value: T) -> SharedPtr<T> {
    InPlace::new(value).into()
}

/// Allocate a control block, then construct its value with `init`.
pub fn make_shared_with<T, F>(init: F) -> SharedPtr<T>
where
    F: FnOnce() -> T,
{
    InPlace::new_with(init).into()
}

impl<T> SharedPtr<T> {
    /// Same as [`make_shared`].
    pub fn new(value: T) -> Self {
        make_shared(value)
    }
}

impl<T: ?Sized> SharedPtr<T> {
    /// An empty handle: no view and no control block.
    pub const fn null() -> Self {
        SharedPtr {
            ptr: None,
            block: None,
            marker: PhantomData,
        }
    }

    /// Take ownership of a pointer from `Box::into_raw`.
    /// A null pointer gives an empty handle.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `Box::into_raw`,
    /// and nothing else may release it.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self::from_raw_with_deleter(ptr, DefaultDelete)
    }

    /// Take ownership of `ptr`, to be released by `deleter` when the last owner goes away.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or releasable by `deleter`,
    /// and nothing else may release it.
    pub unsafe fn from_raw_with_deleter<D>(ptr: *mut T, deleter: D) -> Self
    where
        D: Deleter<T> + 'static,
    {
        match NonNull::new(ptr) {
            Some(ptr) => SharedPtr {
                ptr: Some(ptr),
                block: Some(BlockPtr::external(ptr, deleter)),
                marker: PhantomData,
            },
            None => Self::null(),
        }
    }

    /// Share ownership with `owner` while viewing `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or stay valid for as long as `owner`'s control block lives.
    pub unsafe fn alias<U: ?Sized>(owner: &SharedPtr<U>, ptr: *const T) -> Self {
        Self::share(NonNull::new(ptr as *mut T), owner.block)
    }

    /// Share ownership with `this` while viewing a part of it, such as a field
    /// or a trait object.
    ///
    /// ```rust
    /// # use counted_ptr::*;
    /// struct Pair { left: u8, right: u8 }
    /// let pair = make_shared(Pair { left: 1, right: 2 });
    /// let right = SharedPtr::map(&pair, |pair| &pair.right);
    /// drop(pair);
    /// assert_eq!(*right, 2);
    /// ```
    pub fn map<U: ?Sized>(this: &Self, f: impl FnOnce(&T) -> &U) -> SharedPtr<U>
    where
        T: 'static,
    {
        let ptr = this.as_ref().map(|value| NonNull::from(f(value)));
        SharedPtr::share(ptr, this.block)
    }

    /// Like [`map`](Self::map), but moves ownership out of `this`
    /// instead of adding a reference.
    pub fn map_into<U: ?Sized>(this: Self, f: impl FnOnce(&T) -> &U) -> SharedPtr<U>
    where
        T: 'static,
    {
        let ptr = this.as_ref().map(|value| NonNull::from(f(value)));
        let this = ManuallyDrop::new(this);
        SharedPtr {
            ptr,
            block: this.block,
            marker: PhantomData,
        }
    }

    fn share(ptr: Option<NonNull<T>>, block: Option<BlockPtr>) -> Self {
        if let Some(block) = block {
            // SAFETY: `block` comes from a live handle.
            unsafe { block.increment() }
        }
        SharedPtr {
            ptr,
            block,
            marker: PhantomData,
        }
    }

    pub fn get(&self) -> Option<NonNull<T>> {
        self.ptr
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    pub fn as_ref(&self) -> Option<&T> {
        // SAFETY: the view stays valid while this handle owns its block.
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Number of handles sharing this control block, or zero for an empty handle.
    pub fn use_count(&self) -> usize {
        self.block.map_or(0, |block| unsafe { block.strong() })
    }

    /// Number of non-owning observers of this control block.
    pub fn weak_count(&self) -> usize {
        self.block.map_or(0, |block| unsafe { block.weak() })
    }

    /// Whether both handles view the same address.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        same_address(this.ptr, other.ptr)
    }

    /// Whether both handles share one control block, regardless of what they view.
    pub fn same_owner<U: ?Sized>(this: &Self, other: &SharedPtr<U>) -> bool {
        this.block == other.block
    }

    /// Become empty, dropping the managed object if this was its last owner.
    pub fn reset(&mut self) {
        drop(mem::replace(self, Self::null()))
    }

    /// Release the current control block and take ownership of `ptr` with a new one.
    ///
    /// # Safety
    ///
    /// Same as [`from_raw`](Self::from_raw).
    pub unsafe fn reset_raw(&mut self, ptr: *mut T) {
        self.reset();
        *self = Self::from_raw(ptr);
    }

    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other)
    }
}

impl<T: ?Sized> Drop for SharedPtr<T> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            // SAFETY: this handle owned one strong reference.
            unsafe { block.decrement() }
        }
    }
}

impl<T: ?Sized> Clone for SharedPtr<T> {
    fn clone(&self) -> Self {
        Self::share(self.ptr, self.block)
    }

    fn clone_from(&mut self, source: &Self) {
        if Self::ptr_eq(self, source) && Self::same_owner(self, source) {
            return;
        }
        *self = source.clone();
    }
}

impl<T: ?Sized> Default for SharedPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized> Deref for SharedPtr<T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.as_ref() {
            Some(value) => value,
            None => null_deref(),
        }
    }
}

impl<T> From<InPlace<T>> for SharedPtr<T> {
    fn from(this: InPlace<T>) -> Self {
        let (ptr, block) = InPlace::into_raw_parts(this);
        SharedPtr {
            ptr: Some(ptr),
            block: Some(block),
            marker: PhantomData,
        }
    }
}

impl<T: ?Sized> From<Box<T>> for SharedPtr<T> {
    fn from(this: Box<T>) -> Self {
        unsafe { SharedPtr::from_raw(Box::into_raw(this)) }
    }
}

impl<T: ?Sized, D> From<UniquePtr<T, D>> for SharedPtr<T>
where
    D: Deleter<T> + 'static,
{
    fn from(this: UniquePtr<T, D>) -> Self {
        match UniquePtr::into_raw_parts(this) {
            (Some(ptr), deleter) => unsafe { SharedPtr::from_raw_with_deleter(ptr.as_ptr(), deleter) },
            (None, _) => SharedPtr::null(),
        }
    }
}
