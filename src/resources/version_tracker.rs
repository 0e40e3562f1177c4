//! Change tracking for GPU-mirrored resources.
//!
//! Versions are drawn from a process-wide counter so two independently
//! edited copies of a resource never report the same version.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Returns a fresh, never-repeated version number.
#[inline]
#[must_use]
pub fn next_version() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// Mutable access guard that bumps the owner's version when it is dropped.
///
/// Handing one of these out instead of `&mut T` makes it impossible to edit
/// tracked data without the GPU mirror noticing.
pub struct Tracked<'a, T: ?Sized> {
    data: &'a mut T,
    version: &'a mut u64,
}

impl<'a, T: ?Sized> Tracked<'a, T> {
    pub(crate) fn new(data: &'a mut T, version: &'a mut u64) -> Self {
        Self { data, version }
    }
}

impl<T: ?Sized> std::ops::Deref for Tracked<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl<T: ?Sized> std::ops::DerefMut for Tracked<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data
    }
}

impl<T: ?Sized> Drop for Tracked<'_, T> {
    fn drop(&mut self) {
        *self.version = next_version();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_bumps_version_on_drop() {
        let mut data = vec![1, 2, 3];
        let mut version = next_version();
        let before = version;
        {
            let mut guard = Tracked::new(&mut data, &mut version);
            guard.push(4);
        }
        assert_ne!(version, before);
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn slice_guard_edits_in_place() {
        let mut data = vec![1, 2];
        let mut version = next_version();
        let before = version;
        {
            let mut guard = Tracked::new(data.as_mut_slice(), &mut version);
            guard[1] = 5;
        }
        assert_ne!(version, before);
        assert_eq!(data, vec![1, 5]);
    }
}
