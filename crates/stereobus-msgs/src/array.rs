//! Typed views over packed little-endian element arrays.

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;

/// A packed array of `T` backed by a shared byte buffer.
///
/// Decoded arrays alias the receive buffer, so decoding a million-point cloud
/// does not copy it. [`PodArray::as_slice`] borrows the elements in place when
/// the buffer happens to be aligned for `T`; [`PodArray::get`] and
/// [`PodArray::iter`] work regardless of alignment.
///
/// Call [`PodArray::into_owned`] to detach from the receive buffer before
/// holding on to the array for long.
pub struct PodArray<T> {
    bytes: Bytes,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> PodArray<T> {
    pub const ELEMENT_SIZE: usize = std::mem::size_of::<T>();

    pub fn new() -> Self {
        Self::from_bytes_unchecked(Bytes::new())
    }

    pub fn from_slice(items: &[T]) -> Self {
        Self::from_bytes_unchecked(Bytes::copy_from_slice(bytemuck::cast_slice(items)))
    }

    /// Wrap a buffer already known to hold a whole number of elements.
    pub(crate) fn from_bytes_unchecked(bytes: Bytes) -> Self {
        debug_assert_eq!(bytes.len() % Self::ELEMENT_SIZE, 0);
        Self {
            bytes,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / Self::ELEMENT_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The packed wire representation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Borrow the elements in place, if the buffer is suitably aligned.
    pub fn as_slice(&self) -> Option<&[T]> {
        if self.bytes.is_empty() {
            return Some(&[]);
        }
        bytemuck::try_cast_slice(&self.bytes).ok()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        let start = index.checked_mul(Self::ELEMENT_SIZE)?;
        let end = start.checked_add(Self::ELEMENT_SIZE)?;
        let chunk = self.bytes.get(start..end)?;
        Some(bytemuck::pod_read_unaligned(chunk))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = T> + '_ {
        self.bytes
            .chunks_exact(Self::ELEMENT_SIZE)
            .map(bytemuck::pod_read_unaligned)
    }

    pub fn to_vec(&self) -> Vec<T> {
        match self.as_slice() {
            Some(items) => items.to_vec(),
            None => self.iter().collect(),
        }
    }

    /// Copy the elements into a buffer owned by this array alone.
    pub fn into_owned(self) -> Self {
        Self::from_bytes_unchecked(Bytes::copy_from_slice(&self.bytes))
    }
}

impl<T: bytemuck::Pod> Default for PodArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PodArray<T> {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            _marker: PhantomData,
        }
    }
}

/// Arrays compare by their wire bytes, so NaN payloads compare equal to themselves.
impl<T> PartialEq for PodArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<T> Eq for PodArray<T> {}

impl<T: bytemuck::Pod> fmt::Debug for PodArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodArray")
            .field("type", &std::any::type_name::<T>())
            .field("len", &self.len())
            .finish()
    }
}

impl<T: bytemuck::Pod> From<Vec<T>> for PodArray<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_slice(&items)
    }
}

impl<T: bytemuck::Pod> From<&[T]> for PodArray<T> {
    fn from(items: &[T]) -> Self {
        Self::from_slice(items)
    }
}

impl<T: bytemuck::Pod> FromIterator<T> for PodArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: Vec<T> = iter.into_iter().collect();
        Self::from_slice(&items)
    }
}
