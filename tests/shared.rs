use {
    counted_ptr::*,
    std::{
        cell::{Cell, RefCell},
        fmt::Debug,
        ptr::NonNull,
        rc::Rc,
    },
};

/// Counts how many times it has been dropped.
#[derive(Debug)]
struct Tracked {
    id: u32,
    drops: Rc<Cell<u32>>,
}

impl Tracked {
    fn new(id: u32) -> (Self, Rc<Cell<u32>>) {
        let drops = Rc::new(Cell::new(0));
        (
            Tracked {
                id,
                drops: drops.clone(),
            },
            drops,
        )
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

#[derive(Debug, PartialEq)]
struct Point {
    x: i32,
    y: i32,
    label: String,
}

impl Point {
    fn new(x: i32, y: i32, label: &str) -> Self {
        Point {
            x,
            y,
            label: label.into(),
        }
    }
}

trait Shape: Debug {
    fn area(&self) -> u32;
}

#[derive(Debug)]
struct Square(u32);

impl Shape for Square {
    fn area(&self) -> u32 {
        self.0 * self.0
    }
}

fn as_shape(square: &Square) -> &(dyn Shape + 'static) {
    square
}

#[test]
fn make_shared_matches_direct_construction() {
    let shared = make_shared(Point::new(1, 2, "p"));
    assert_eq!(*shared, Point::new(1, 2, "p"));
    assert_eq!(shared.use_count(), 1);
    assert_eq!(shared.weak_count(), 0);

    let lazy = make_shared_with(|| Point::new(3, 4, "q"));
    assert_eq!(*lazy, Point::new(3, 4, "q"));
    assert_eq!((lazy.x, lazy.y, lazy.label.as_str()), (3, 4, "q"));
    assert_eq!(*SharedPtr::new(7), 7);
}

#[test]
fn reset_does_not_affect_siblings() {
    let mut p = make_shared(String::from("abc"));
    let q = p.clone();
    p.reset();
    assert!(p.is_null());
    assert_eq!(p.use_count(), 0);
    assert_eq!(q.use_count(), 1);
    assert_eq!(*q, "abc");
}

#[test]
fn counts_follow_clones_and_drops() {
    let (value, drops) = Tracked::new(1);
    let first = make_shared(value);
    let second = first.clone();
    let third = second.clone();
    assert_eq!(first.use_count(), 3);
    assert!(SharedPtr::ptr_eq(&first, &third));

    drop(second);
    assert_eq!(first.use_count(), 2);
    assert_eq!(third.use_count(), 2);

    // moves steal the reference
    let moved = first;
    assert_eq!(moved.use_count(), 2);

    drop(third);
    assert_eq!(moved.use_count(), 1);
    assert_eq!(drops.get(), 0);
    drop(moved);
    assert_eq!(drops.get(), 1);
}

#[test]
fn aliasing_keeps_owner_alive() {
    let (value, drops) = Tracked::new(9);
    let owner = make_shared(value);
    assert_eq!(owner.use_count(), 1);

    let id = SharedPtr::map(&owner, |tracked| &tracked.id);
    assert_eq!(owner.use_count(), 2);
    assert_eq!(id.use_count(), 2);
    assert!(SharedPtr::same_owner(&owner, &id));

    drop(owner);
    assert_eq!(drops.get(), 0);
    assert_eq!(*id, 9);
    assert_eq!(id.use_count(), 1);

    drop(id);
    assert_eq!(drops.get(), 1);
}

#[test]
fn raw_alias_shares_ownership() {
    let (value, drops) = Tracked::new(4);
    let owner = SharedPtr::from(Box::new(value));
    let alias: SharedPtr<u32> = unsafe { SharedPtr::alias(&owner, &owner.id) };
    assert_eq!(alias.use_count(), 2);
    drop(owner);
    assert_eq!(*alias, 4);
    drop(alias);
    assert_eq!(drops.get(), 1);

    // an alias of nothing still shares the block
    let owner = make_shared(0_u8);
    let nothing: SharedPtr<u8> = unsafe { SharedPtr::alias(&owner, std::ptr::null()) };
    assert!(nothing.is_null());
    assert_eq!(nothing.use_count(), 2);
}

#[test]
fn map_into_steals_the_reference() {
    let (value, drops) = Tracked::new(2);
    let owner = make_shared(value);
    let keep = owner.clone();
    let id = SharedPtr::map_into(owner, |tracked| &tracked.id);
    assert_eq!(id.use_count(), 2);
    drop(keep);
    assert_eq!(id.use_count(), 1);
    assert_eq!(*id, 2);
    drop(id);
    assert_eq!(drops.get(), 1);
}

#[test]
fn polymorphic_views() {
    let square = make_shared(Square(3));
    let shape: SharedPtr<dyn Shape> = SharedPtr::map(&square, as_shape);
    assert_eq!(shape.area(), 9);
    assert_eq!(square.use_count(), 2);

    let boxed: Box<dyn Shape> = Box::new(Square(4));
    let shape = SharedPtr::from(boxed);
    assert_eq!(shape.area(), 16);
    assert_eq!(shape.use_count(), 1);
}

#[test]
fn self_assignment_is_a_no_op() {
    let (value, drops) = Tracked::new(5);
    let mut handle = make_shared(value);
    let same = handle.clone();
    handle.clone_from(&same);
    assert_eq!(handle.use_count(), 2);

    handle = handle.clone();
    assert_eq!(handle.use_count(), 2);
    drop(same);
    assert_eq!(handle.use_count(), 1);
    assert_eq!(drops.get(), 0);
    assert_eq!(handle.id, 5);
}

#[test]
fn assignment_releases_previous_block() {
    let (a, a_drops) = Tracked::new(1);
    let (b, b_drops) = Tracked::new(2);
    let mut target = make_shared(a);
    let source = make_shared(b);
    target.clone_from(&source);
    assert_eq!(a_drops.get(), 1);
    assert_eq!(source.use_count(), 2);
    assert_eq!(target.id, 2);

    target = SharedPtr::null();
    assert_eq!(source.use_count(), 1);
    drop(source);
    assert_eq!(b_drops.get(), 1);
    assert!(target.is_null());
}

#[test]
fn reset_raw_replaces_ownership() {
    let (a, a_drops) = Tracked::new(1);
    let (b, b_drops) = Tracked::new(2);
    let mut handle = SharedPtr::from(Box::new(a));
    unsafe { handle.reset_raw(Box::into_raw(Box::new(b))) };
    assert_eq!(a_drops.get(), 1);
    assert_eq!(handle.id, 2);
    assert_eq!(handle.use_count(), 1);

    unsafe { handle.reset_raw(std::ptr::null_mut()) };
    assert_eq!(b_drops.get(), 1);
    assert!(handle.is_null());
    assert_eq!(handle.use_count(), 0);
}

#[test]
fn swap_exchanges_handles() {
    let mut left = make_shared(1);
    let keep = left.clone();
    let mut right = SharedPtr::null();
    left.swap(&mut right);
    assert!(left.is_null());
    assert_eq!(*right, 1);
    assert_eq!(keep.use_count(), 2);
}

#[test]
fn custom_deleter_runs_once_at_last_release() {
    let released = Rc::new(RefCell::new(vec![]));
    let log = released.clone();
    let raw = Box::into_raw(Box::new(String::from("custom")));
    let deleter = DeleteFn(move |ptr: NonNull<String>| {
        log.borrow_mut().push(ptr.as_ptr() as usize);
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    });
    let first = unsafe { SharedPtr::from_raw_with_deleter(raw, deleter) };
    let second = first.clone();
    drop(first);
    assert!(released.borrow().is_empty());
    drop(second);
    assert_eq!(*released.borrow(), [raw as usize]);
}

#[test]
fn from_unique_keeps_its_deleter() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let raw = Box::into_raw(Box::new([1_u8, 2, 3]));
    let unique = unsafe {
        UniquePtr::from_raw_with_deleter(
            raw,
            DeleteFn(move |ptr: NonNull<[u8; 3]>| {
                counter.set(counter.get() + 1);
                drop(Box::from_raw(ptr.as_ptr()));
            }),
        )
    };
    let shared = SharedPtr::from(unique);
    assert_eq!(shared.get().map(NonNull::as_ptr), Some(raw));
    assert_eq!(calls.get(), 0);
    drop(shared);
    assert_eq!(calls.get(), 1);

    let empty: UniquePtr<u8> = UniquePtr::null();
    assert!(SharedPtr::from(empty).is_null());
}

#[test]
fn in_place_block_is_adopted() {
    let mut block = InPlace::new(vec![1]);
    block.push(2);
    let address: *const Vec<i32> = &*block;
    let shared = SharedPtr::from(block);
    assert_eq!(shared.get().map(|ptr| ptr.as_ptr() as *const _), Some(address));
    assert_eq!(*shared, [1, 2]);

    let (value, drops) = Tracked::new(0);
    drop(InPlace::new(value));
    assert_eq!(drops.get(), 1);
}

#[test]
fn null_handles() {
    let empty: SharedPtr<str> = SharedPtr::null();
    assert!(empty.is_null());
    assert_eq!(empty.use_count(), 0);
    assert_eq!(empty.weak_count(), 0);
    assert!(empty.get().is_none());
    assert_eq!(format!("{:?}", empty), "null");
    assert_eq!(SharedPtr::<u8>::default(), SharedPtr::null());
    assert!(unsafe { SharedPtr::<u8>::from_raw(std::ptr::null_mut()) }.is_null());

    let mapped = SharedPtr::map(&SharedPtr::<String>::null(), |s| s.as_str());
    assert!(mapped.is_null());
    assert_eq!(mapped.use_count(), 0);
}

#[test]
#[should_panic(expected = "dereferenced an empty pointer handle")]
fn null_deref_panics() {
    let empty: SharedPtr<u8> = SharedPtr::null();
    let _value: u8 = *empty;
}

#[test]
fn comparisons_use_the_pointee() {
    let a = make_shared(String::from("a"));
    let also_a = SharedPtr::from(Box::new(String::from("a")));
    let b = make_shared(String::from("b"));
    assert_eq!(a, also_a);
    assert!(!SharedPtr::ptr_eq(&a, &also_a));
    assert!(!SharedPtr::same_owner(&a, &also_a));
    assert!(a < b);
    assert!(SharedPtr::null() < a);
}
