use core::{
    cell::UnsafeCell,
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    ptr::NonNull,
};
use portable_atomic::{AtomicBool, Ordering};

/// Atomic ReFCell - ArfCell
///
/// An exclusive-only refcell with a const constructor that never panics.
/// Holds the process-wide [`Microapp`](crate::Microapp) context on target,
/// where the host may re-enter the microapp while it is already borrowed.
pub struct ArfCell<T> {
    borrowed: AtomicBool,
    item: UnsafeCell<T>,
}

/// The cell was already borrowed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BorrowError;

unsafe impl<T> Sync for ArfCell<T> where T: Send {}

pub struct MutArfGuard<'a, T> {
    cell: NonNull<ArfCell<T>>,
    plt: PhantomData<&'a mut T>,
}

impl<T> ArfCell<T> {
    pub const fn new(item: T) -> Self {
        ArfCell {
            borrowed: AtomicBool::new(false),
            item: UnsafeCell::new(item),
        }
    }

    pub fn borrow_mut(&self) -> Result<MutArfGuard<'_, T>, BorrowError> {
        self.borrowed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BorrowError)?;

        Ok(MutArfGuard {
            cell: NonNull::from(self),
            plt: PhantomData,
        })
    }
}

impl<'a, T> Deref for MutArfGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.cell.as_ref().item.get() }
    }
}

impl<'a, T> DerefMut for MutArfGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.cell.as_ref().item.get() }
    }
}

impl<'a, T> Drop for MutArfGuard<'a, T> {
    fn drop(&mut self) {
        unsafe {
            self.cell.as_ref().borrowed.store(false, Ordering::Release);
        }
    }
}

impl fmt::Display for BorrowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("already borrowed")
    }
}
