//! Volatile accessor for a memory-mapped window.
//!
//! Board [`SlaveBus`](super::SlaveBus) implementations delegate their
//! `read_window` / `write_window` to an [`MmioWindow`] over the peripheral's
//! local RAM. Every byte goes through `read_volatile` / `write_volatile`, since
//! the host changes the window behind the compiler's back.

use core::ptr;

use crate::error::WindowFault;

/// Bounds-checked volatile view of `capacity` bytes at a fixed address.
pub struct MmioWindow {
    base: *mut u8,
    capacity: usize,
}

impl MmioWindow {
    /// Wrap the window at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be valid for volatile reads and writes of `capacity` bytes
    /// for as long as the returned value is used, and no Rust reference may
    /// alias that memory.
    pub const unsafe fn new(base: *mut u8, capacity: usize) -> Self {
        MmioWindow { base, capacity }
    }

    /// Window length in bytes.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn check(&self, offset: usize, len: usize) -> Result<(), WindowFault> {
        match offset.checked_add(len) {
            Some(end) if end <= self.capacity => Ok(()),
            _ => Err(WindowFault::OutOfBounds {
                offset,
                len,
                capacity: self.capacity,
            }),
        }
    }

    /// Copy window bytes `[offset, offset + dst.len())` into `dst`.
    pub fn read(&self, offset: usize, dst: &mut [u8]) -> Result<(), WindowFault> {
        self.check(offset, dst.len())?;
        for (i, slot) in dst.iter_mut().enumerate() {
            // SAFETY: bounds checked above; validity guaranteed by `new`.
            *slot = unsafe { ptr::read_volatile(self.base.add(offset + i)) };
        }
        Ok(())
    }

    /// Store `src` at window bytes `[offset, offset + src.len())`.
    pub fn write(&mut self, offset: usize, src: &[u8]) -> Result<(), WindowFault> {
        self.check(offset, src.len())?;
        for (i, &byte) in src.iter().enumerate() {
            // SAFETY: bounds checked above; validity guaranteed by `new`.
            unsafe { ptr::write_volatile(self.base.add(offset + i), byte) };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_written_bytes() {
        let mut backing = [0u8; 16];
        // SAFETY: `backing` outlives `window` and is only accessed through it.
        let mut window = unsafe { MmioWindow::new(backing.as_mut_ptr(), backing.len()) };

        window.write(3, &[0xAA, 0xBB, 0xCC]).unwrap();
        let mut out = [0u8; 5];
        window.read(2, &mut out).unwrap();
        assert_eq!(out, [0x00, 0xAA, 0xBB, 0xCC, 0x00]);
    }

    #[test]
    fn rejects_out_of_range_access() {
        let mut backing = [0u8; 8];
        // SAFETY: as above.
        let mut window = unsafe { MmioWindow::new(backing.as_mut_ptr(), backing.len()) };

        let mut out = [0u8; 4];
        assert!(window.read(4, &mut out).is_ok());
        assert_eq!(
            window.read(5, &mut out),
            Err(WindowFault::OutOfBounds { offset: 5, len: 4, capacity: 8 })
        );
        assert!(window.write(usize::MAX, &[1]).is_err());
        assert_eq!(window.capacity(), 8);
    }
}
