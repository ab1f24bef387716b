//! Memory-mapped GPIO register window.
//!
//! Maps the SoC's GPIO control page and exposes the three primitives the
//! rest of the engine needs: configuring lines as outputs, and set/clear
//! writes to the platform's dedicated set/clear registers (which OR in
//! 1-bits and leave 0-bits untouched — writing 0 to either register is a
//! no-op, which is what makes concurrent use by the ticker and the signal
//! handler safe).
//!
//! Register layout matches the BCM283x GPIO peripheral: function-select
//! words (`GPFSELn`) starting at offset 0, three bits per pin; `GPSET0` at
//! byte offset 0x1C; `GPCLR0` at byte offset 0x28.

use crate::error::{Error, Result};
use std::ffi::c_void;
use std::os::unix::io::RawFd;
use std::sync::atomic::{fence, AtomicUsize, Ordering};

/// Length of the mapped GPIO register page (one 4 KiB page covers the whole
/// BCM283x GPIO block).
const GPIO_LEN: usize = 4096;

/// `/dev/mem` physical base offset of the GPIO peripheral, used only when
/// the restricted `/dev/gpiomem` node is unavailable. This is the BCM2835/6/7
/// address; boards with a different SoC base would need a different offset,
/// but that's outside this engine's fixed target hardware.
const GPIO_BASE_ADDR: libc::off_t = 0x3F20_0000;

const GPSET0_WORD: usize = 0x1C / 4;
const GPCLR0_WORD: usize = 0x28 / 4;

/// Address of the currently-mapped GPIO page, published for the signal
/// handler's async-signal-safe all-off path. Zero means "not mapped".
static MAPPED_BASE: AtomicUsize = AtomicUsize::new(0);

/// The three register operations the lamp ticker needs, factored out as a
/// trait so tests can exercise ticker logic against a recording fake instead
/// of real hardware.
pub trait GpioSink: Send + Sync {
    fn configure_as_output(&self, lines: &[u32]);
    fn set_bits(&self, mask: u32);
    fn clear_bits(&self, mask: u32);
}

/// A mapped GPIO register window.
///
/// Sole writer of function-select and the set register; the signal handler
/// is the only other writer, and it is restricted to the clear register.
pub struct GpioWindow {
    base: *mut u32,
    fd: RawFd,
}

// SAFETY: `base` points at an mmap'd device register page. All access goes
// through `ptr::write_volatile`/`read_volatile`, and the register semantics
// (OR-in-ones, ignore-zeros) make concurrent writers from different threads
// safe by construction, matching the shared-resource policy in the design.
unsafe impl Send for GpioWindow {}
unsafe impl Sync for GpioWindow {}

impl GpioWindow {
    /// Map the GPIO register page, preferring the unprivileged `/dev/gpiomem`
    /// node and falling back to `/dev/mem` at the known physical base.
    pub fn open() -> Result<Self> {
        if let Ok(window) = Self::open_gpiomem() {
            return Ok(window);
        }
        Self::open_dev_mem()
    }

    fn open_gpiomem() -> Result<Self> {
        let path = c"/dev/gpiomem";
        let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDWR | libc::O_SYNC) };
        if fd < 0 {
            return Err(Error::DeviceUnavailable("/dev/gpiomem open failed".into()));
        }
        Self::map(fd, 0)
    }

    fn open_dev_mem() -> Result<Self> {
        let path = c"/dev/mem";
        let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDWR | libc::O_SYNC) };
        if fd < 0 {
            return Err(Error::DeviceUnavailable(
                "/dev/gpiomem and /dev/mem both unavailable".into(),
            ));
        }
        Self::map(fd, GPIO_BASE_ADDR)
    }

    fn map(fd: RawFd, offset: libc::off_t) -> Result<Self> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                GPIO_LEN,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                offset,
            )
        };
        if ptr == libc::MAP_FAILED {
            unsafe { libc::close(fd) };
            return Err(Error::DeviceUnavailable("gpio mmap failed".into()));
        }
        MAPPED_BASE.store(ptr as usize, Ordering::Release);
        Ok(GpioWindow { base: ptr as *mut u32, fd })
    }

    /// Rewrite each line's function-select nibble so it drives its pad as
    /// an output. Read/modify/write; not safe to call concurrently with
    /// another function-select write (the ticker is the only caller).
    pub fn configure_as_output(&self, lines: &[u32]) {
        for &line in lines {
            let word_index = (line / 10) as usize;
            let shift = (line % 10) * 3;
            unsafe {
                let word = self.base.add(word_index);
                let current = std::ptr::read_volatile(word);
                let cleared = current & !(0b111 << shift);
                std::ptr::write_volatile(word, cleared | (0b001 << shift));
                fence(Ordering::SeqCst);
            }
        }
    }

    /// Write `mask` to the set register: 1-bits turn the corresponding line on.
    pub fn set_bits(&self, mask: u32) {
        unsafe {
            std::ptr::write_volatile(self.base.add(GPSET0_WORD), mask);
            fence(Ordering::SeqCst);
        }
    }

    /// Write `mask` to the clear register: 1-bits turn the corresponding line off.
    pub fn clear_bits(&self, mask: u32) {
        unsafe {
            std::ptr::write_volatile(self.base.add(GPCLR0_WORD), mask);
            fence(Ordering::SeqCst);
        }
    }

    /// Unconditionally turn off every given line. Equivalent to the
    /// signal-safe path in [`all_off_signal_safe`], but usable with an owned
    /// handle (teardown, startup reset) rather than the static address.
    pub fn all_off(&self, lines: &[u32]) {
        let mask = lines.iter().fold(0u32, |m, &l| m | (1 << l));
        self.clear_bits(mask);
    }
}

impl GpioSink for GpioWindow {
    fn configure_as_output(&self, lines: &[u32]) {
        GpioWindow::configure_as_output(self, lines)
    }
    fn set_bits(&self, mask: u32) {
        GpioWindow::set_bits(self, mask)
    }
    fn clear_bits(&self, mask: u32) {
        GpioWindow::clear_bits(self, mask)
    }
}

impl Drop for GpioWindow {
    fn drop(&mut self) {
        if self.base.is_null() {
            return;
        }
        unsafe {
            libc::munmap(self.base as *mut c_void, GPIO_LEN);
            libc::close(self.fd);
        }
        MAPPED_BASE.store(0, Ordering::Release);
        self.base = std::ptr::null_mut();
    }
}

/// Turn off every configured lamp line using only the process-wide mapped
/// address and a single volatile write — safe to call from an asynchronous
/// signal handler. A no-op if no `GpioWindow` is currently mapped.
pub fn all_off_signal_safe() {
    let base = MAPPED_BASE.load(Ordering::Acquire);
    if base == 0 {
        return;
    }
    unsafe {
        let clr = (base as *mut u32).add(GPCLR0_WORD);
        std::ptr::write_volatile(clr, crate::pattern::lamp_mask());
        fence(Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // GpioWindow::open() requires real hardware (/dev/gpiomem or /dev/mem);
    // these unit tests exercise the pure register-math helpers that don't
    // need a mapping, leaving the mmap path to manual hardware testing.

    #[test]
    fn all_off_signal_safe_is_a_noop_when_unmapped() {
        MAPPED_BASE.store(0, Ordering::Release);
        // Must not panic or touch memory.
        all_off_signal_safe();
    }

    #[test]
    fn register_offsets_match_bcm283x_layout() {
        assert_eq!(GPSET0_WORD, 7);
        assert_eq!(GPCLR0_WORD, 10);
    }
}
