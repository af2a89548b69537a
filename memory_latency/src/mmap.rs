use core::ffi::c_void;
use core::mem::size_of;
use core::num::NonZeroUsize;
use core::ptr::NonNull;
use core::slice::{from_raw_parts, from_raw_parts_mut};
use nix::sys::mman;

/// Default x86_64 huge page size. hugetlb mappings must be mapped and
/// unmapped in multiples of it.
pub const HUGE_PAGE_SIZE: usize = 2 << 20;

/// An anonymous private mapping holding `len` initialised values of `T`.
///
/// The mapping is page aligned and released on drop.
pub struct MMappedMemory<T: Copy> {
    pointer: NonNull<T>,
    len: usize,
    mapped_bytes: usize,
}

impl<T: Copy> MMappedMemory<T> {
    pub fn try_new(
        len: usize,
        huge: bool,
        initializer: impl Fn(usize) -> T,
    ) -> Result<MMappedMemory<T>, nix::Error> {
        let bytes = len
            .checked_mul(size_of::<T>())
            .and_then(NonZeroUsize::new)
            .ok_or(nix::Error::EINVAL)?;
        let bytes = if huge {
            bytes
                .get()
                .checked_next_multiple_of(HUGE_PAGE_SIZE)
                .and_then(NonZeroUsize::new)
                .ok_or(nix::Error::EINVAL)?
        } else {
            bytes
        };

        let mut flags = mman::MapFlags::MAP_PRIVATE | mman::MapFlags::MAP_ANONYMOUS;
        if huge {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            {
                flags |= mman::MapFlags::MAP_HUGETLB;
            }
        }

        let p = unsafe {
            mman::mmap_anonymous(
                None,
                bytes,
                mman::ProtFlags::PROT_READ | mman::ProtFlags::PROT_WRITE,
                flags,
            )
        }?;
        let pointer = p.cast::<T>();
        for i in 0..len {
            // SAFETY: i < len and the mapping spans len * size_of::<T>() bytes.
            unsafe { pointer.as_ptr().add(i).write(initializer(i)) };
        }
        Ok(MMappedMemory {
            pointer,
            len,
            mapped_bytes: bytes.get(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn slice(&self) -> &[T] {
        unsafe { from_raw_parts(self.pointer.as_ptr(), self.len) }
    }

    pub fn slice_mut(&mut self) -> &mut [T] {
        unsafe { from_raw_parts_mut(self.pointer.as_ptr(), self.len) }
    }
}

impl<T: Copy> Drop for MMappedMemory<T> {
    fn drop(&mut self) {
        let bytes = self.mapped_bytes;
        if let Err(e) = unsafe { mman::munmap(self.pointer.cast::<c_void>(), bytes) } {
            log::warn!("munmap of {} bytes failed: {}", bytes, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MMappedMemory, HUGE_PAGE_SIZE};

    fn free_huge_pages() -> u64 {
        std::fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|meminfo| {
                meminfo
                    .lines()
                    .find_map(|l| l.strip_prefix("HugePages_Free:"))
                    .and_then(|v| v.trim().parse().ok())
            })
            .unwrap_or(0)
    }

    #[test]
    fn mapping_is_initialised() {
        let m = MMappedMemory::try_new(1000, false, |i| i as u64 * 3).unwrap();
        assert_eq!(m.len(), 1000);
        assert_eq!(m.slice()[0], 0);
        assert_eq!(m.slice()[999], 2997);
        assert_eq!(m.slice().as_ptr() as usize % 4096, 0);
    }

    #[test]
    fn mapping_is_writable() {
        let mut m = MMappedMemory::try_new(16, false, |_| 0u64).unwrap();
        m.slice_mut()[7] = 42;
        assert_eq!(m.slice()[7], 42);
    }

    #[test]
    fn empty_mapping_is_rejected() {
        assert!(MMappedMemory::try_new(0, false, |_| 0u64).is_err());
    }

    #[test]
    fn huge_mapping_spans_whole_huge_pages() {
        if free_huge_pages() == 0 {
            eprintln!("no free huge pages, skipping");
            return;
        }
        // Mapping and dropping more times than a small pool holds pages
        // only succeeds if each drop gives its page back.
        for _ in 0..64 {
            let m = MMappedMemory::try_new(12, true, |i| i as u64).unwrap();
            assert_eq!(m.mapped_bytes, HUGE_PAGE_SIZE);
            assert_eq!(m.slice()[11], 11);
        }
    }

    #[test]
    fn small_mapping_keeps_its_length() {
        let m = MMappedMemory::try_new(12, false, |_| 0u64).unwrap();
        assert_eq!(m.mapped_bytes, 96);
    }
}
