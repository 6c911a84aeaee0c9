use std::borrow::Borrow;
use std::marker::PhantomData;
use std::{mem, ptr, slice, str};

/// The default size in bytes of the fixed blocks backing an `Arena`.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

const MAX_ALIGN: usize = mem::align_of::<u64>();

/// A bump allocator that backs one command sequence. Payloads are carved from
/// a growable set of fixed-size blocks and referenced through typed
/// `ArenaPtr<T>` offsets instead of raw pointers, so a sequence stays
/// movable across threads while its payloads are in flight.
///
/// A block is never relocated once allocated, and `reset` reclaims every
/// payload at once by rewinding the write offset. Running out of memory
/// aborts the process through the global allocator; there is no degraded
/// mode.
///
/// Blocks are backed by `u64` words, and offsets are padded to the payload's
/// alignment, so read-back references are always properly aligned for types
/// with an alignment of at most 8 bytes.
#[derive(Debug, Default)]
pub struct Arena {
    blocks: Vec<Box<[u64]>>,
    block_size: usize,
    current: usize,
    offset: usize,
    len: usize,
}

impl Arena {
    /// Creates a new and empty `Arena` with the default block size.
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    /// Creates a new and empty `Arena` with the specified block size in
    /// bytes. A single payload larger than the block size gets a dedicated
    /// block of its own.
    pub fn with_block_size(block_size: usize) -> Self {
        assert!(block_size > 0);

        Arena {
            blocks: Vec::new(),
            block_size,
            current: 0,
            offset: 0,
            len: 0,
        }
    }

    /// Returns the total bytes allocated since the last `reset`, padding
    /// included.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Invalidates all previously returned pointers without touching the
    /// payload destructors; the blocks themselves are kept for reuse.
    pub fn reset(&mut self) {
        self.current = 0;
        self.offset = 0;
        self.len = 0;
    }

    /// Clones and appends `value` to the arena.
    pub fn extend<T>(&mut self, value: &T) -> ArenaPtr<T>
    where
        T: Copy,
    {
        let size = mem::size_of::<T>();
        let (block, position) = self.alloc(size, mem::align_of::<T>());

        if size != 0 {
            unsafe {
                let src = value as *const T as *const u8;
                ptr::copy_nonoverlapping(src, self.write_ptr(block, position), size);
            }
        }

        ArenaPtr {
            block,
            position,
            size: size as u32,
            _phantom: PhantomData,
        }
    }

    /// Clones and appends all elements in a slice to the arena.
    pub fn extend_from_slice<T>(&mut self, slice: &[T]) -> ArenaPtr<[T]>
    where
        T: Copy,
    {
        let size = mem::size_of::<T>().wrapping_mul(slice.len());
        let (block, position) = self.alloc(size, mem::align_of::<T>());

        // A zero-size payload owns no storage; block 0 may not even exist.
        if size != 0 {
            unsafe {
                let src = slice.as_ptr() as *const u8;
                ptr::copy_nonoverlapping(src, self.write_ptr(block, position), size);
            }
        }

        ArenaPtr {
            block,
            position,
            size: size as u32,
            _phantom: PhantomData,
        }
    }

    /// Clones and appends all bytes in a string slice to the arena.
    pub fn extend_from_str<T>(&mut self, value: T) -> ArenaPtr<str>
    where
        T: Borrow<str>,
    {
        let slice = self.extend_from_slice(value.borrow().as_bytes());
        ArenaPtr {
            block: slice.block,
            position: slice.position,
            size: slice.size,
            _phantom: PhantomData,
        }
    }

    /// Returns reference to the object indicated by `ArenaPtr`.
    #[inline]
    pub fn as_ref<T>(&self, ptr: ArenaPtr<T>) -> &T
    where
        T: Copy,
    {
        let bytes = self.as_bytes(ptr);
        assert_eq!(bytes.len(), mem::size_of::<T>());
        unsafe { &*(bytes.as_ptr() as *const T) }
    }

    /// Returns an object slice indicated by `ArenaPtr`.
    #[inline]
    pub fn as_slice<T>(&self, ptr: ArenaPtr<[T]>) -> &[T]
    where
        T: Copy,
    {
        let bytes = self.as_bytes(ptr);
        if bytes.is_empty() {
            // The empty sentinel's dangling pointer is not aligned for `T`.
            return &[];
        }

        let len = bytes.len() / mem::size_of::<T>();
        assert_eq!(bytes.len(), mem::size_of::<T>().wrapping_mul(len));
        unsafe { slice::from_raw_parts(bytes.as_ptr() as *const T, len) }
    }

    /// Returns string slice indicated by `ArenaPtr`.
    #[inline]
    pub fn as_str(&self, ptr: ArenaPtr<str>) -> &str {
        str::from_utf8(self.as_bytes(ptr)).unwrap()
    }

    #[inline]
    pub fn as_bytes<T>(&self, ptr: ArenaPtr<T>) -> &[u8]
    where
        T: ?Sized,
    {
        if ptr.size == 0 {
            return &[];
        }

        let block = &self.blocks[ptr.block as usize];
        let bytes = unsafe {
            slice::from_raw_parts(block.as_ptr() as *const u8, block.len() * mem::size_of::<u64>())
        };

        &bytes[ptr.position as usize..(ptr.position + ptr.size) as usize]
    }

    fn alloc(&mut self, size: usize, align: usize) -> (u32, u32) {
        assert!(align.is_power_of_two() && align <= MAX_ALIGN);

        if size == 0 {
            return (0, 0);
        }

        loop {
            if self.current < self.blocks.len() {
                let capacity = self.blocks[self.current].len() * mem::size_of::<u64>();
                let position = (self.offset + align - 1) & !(align - 1);

                if position + size <= capacity {
                    self.len += (position - self.offset) + size;
                    self.offset = position + size;
                    return (self.current as u32, position as u32);
                }

                // The tail of the current block is wasted; bump allocators
                // never backfill.
                self.current += 1;
                self.offset = 0;
            } else {
                let bytes = self.block_size.max(size);
                let words = (bytes + mem::size_of::<u64>() - 1) / mem::size_of::<u64>();
                self.blocks.push(vec![0u64; words].into_boxed_slice());
                self.offset = 0;
            }
        }
    }

    #[inline]
    fn write_ptr(&mut self, block: u32, position: u32) -> *mut u8 {
        unsafe {
            (self.blocks[block as usize].as_mut_ptr() as *mut u8).add(position as usize)
        }
    }
}

/// A view into an `Arena`, indicates where the object `T` is stored.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct ArenaPtr<T>
where
    T: ?Sized,
{
    block: u32,
    position: u32,
    size: u32,
    _phantom: PhantomData<T>,
}

impl<T: ?Sized> Clone for ArenaPtr<T> {
    fn clone(&self) -> Self {
        ArenaPtr {
            block: self.block,
            position: self.position,
            size: self.size,
            _phantom: PhantomData,
        }
    }
}

impl<T: ?Sized> Copy for ArenaPtr<T> {}
