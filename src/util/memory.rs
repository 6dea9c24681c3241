/// Allocate a zeroed scratch buffer of `len` elements without aborting on allocation failure.
///
/// Returns `None` if the buffer would be larger than `limit` bytes, or if the allocation fails.
pub fn try_alloc_buffer<T: Copy + Default>(len: usize, limit: usize) -> Option<Vec<T>> {
    let bytes = len.checked_mul(std::mem::size_of::<T>())?;
    if bytes > limit {
        return None;
    }
    let mut buffer = try_with_capacity(len)?;
    buffer.resize(len, T::default());
    Some(buffer)
}

/// Create an empty vector with room for `capacity` elements, or `None` if the allocation fails.
pub fn try_with_capacity<T>(capacity: usize) -> Option<Vec<T>> {
    let mut vec = Vec::new();
    vec.try_reserve_exact(capacity).ok()?;
    Some(vec)
}
