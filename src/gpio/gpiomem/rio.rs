use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::ptr;

use libc::{self, c_void, size_t, MAP_FAILED, MAP_SHARED, O_SYNC, PROT_READ, PROT_WRITE};

use crate::gpio::{Bias, Error, Result};

use super::SioRegisters;

const PATH_DEV_GPIOMEM: &str = "/dev/gpiomem0";

// Each register contains 32 bits
const REG_SIZE: usize = std::mem::size_of::<u32>();
// gpiomem0 contains IO_BANK0, SYS_RIO0 and PADS_BANK0
const MEM_SIZE: usize = 0x30000;

const IO_BANK0_OFFSET: usize = 0x00000;
const SYS_RIO0_OFFSET: usize = 0x10000;
const PADS_BANK0_OFFSET: usize = 0x20000;

// Atomic register access (datasheet @ 2.4)
const RW_OFFSET: usize = 0x0000;
const XOR_OFFSET: usize = 0x1000;
const SET_OFFSET: usize = 0x2000;
const CLR_OFFSET: usize = 0x3000;

// CTRL offset for the IO_BANK registers, and the offset to the next GPIO
// (datasheet @ 3.1.4)
const GPIO_CTRL: usize = 0x0004;
const GPIO_OFFSET: usize = 8;

const CTRL_FUNCSEL_MASK: u32 = 0x001f;
const CTRL_FUNCSEL_LSB: u32 = 0;
const CTRL_OUTOVER_MASK: u32 = 0x3000;
const CTRL_OUTOVER_LSB: u32 = 12;
const CTRL_OEOVER_MASK: u32 = 0xc000;
const CTRL_OEOVER_LSB: u32 = 14;

// Drive output and output enable from the RIO signal selected by FUNCSEL
const OUTOVER_PERI: u32 = 0;
const OEOVER_PERI: u32 = 0;

// Software-IO function select; FSEL_NULL parks the pin
const FSEL_SIO: u32 = 5;
const FSEL_NULL: u32 = 0x1f;

// GPIO offset for the PADS_BANK registers, and the offset to the next GPIO
// (datasheet @ 3.1.4)
const PADS_GPIO: usize = 0x04;
const PADS_OFFSET: usize = 4;

const PADS_IN_ENABLE_MASK: u32 = 0x40;
const PADS_OUT_DISABLE_MASK: u32 = 0x80;

const PADS_BIAS_MASK: u32 = 0x0c;
const PADS_BIAS_LSB: u32 = 2;

const PADS_BIAS_OFF: u32 = 0;
const PADS_BIAS_DOWN: u32 = 1;
const PADS_BIAS_UP: u32 = 2;

// GPIO output drive
const RIO_OUT: usize = 0x00;
// GPIO output drive enable
const RIO_OE: usize = 0x04;
// GPIO input value
const RIO_IN: usize = 0x08;

pub struct GpioMem {
    mem_ptr: *mut u32,
}

impl fmt::Debug for GpioMem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpioMem")
            .field("mem_ptr", &self.mem_ptr)
            .finish()
    }
}

impl GpioMem {
    pub fn open() -> Result<GpioMem> {
        let mem_ptr = Self::map_devgpiomem()?;

        Ok(GpioMem { mem_ptr })
    }

    fn map_devgpiomem() -> Result<*mut u32> {
        // Open /dev/gpiomem0 with read/write/sync flags. This might fail if
        // /dev/gpiomem0 doesn't exist, or the current user doesn't have the
        // required permissions.
        let gpiomem_file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(O_SYNC)
            .open(PATH_DEV_GPIOMEM)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::PermissionDenied {
                    Error::PermissionDenied(String::from(PATH_DEV_GPIOMEM))
                } else {
                    Error::Io(e)
                }
            })?;

        // Memory-map /dev/gpiomem0 at offset 0
        let gpiomem_ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                MEM_SIZE,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                gpiomem_file.as_raw_fd(),
                0,
            )
        };

        if gpiomem_ptr == MAP_FAILED {
            return Err(Error::Io(io::Error::last_os_error()));
        }

        Ok(gpiomem_ptr as *mut u32)
    }

    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        unsafe { ptr::read_volatile(self.mem_ptr.add(offset)) }
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        unsafe {
            ptr::write_volatile(self.mem_ptr.add(offset), value);
        }
    }

    #[inline(always)]
    fn pads_offset(pin: u8, alias: usize) -> usize {
        (PADS_BANK0_OFFSET + PADS_GPIO + (pin as usize * PADS_OFFSET) + alias) / REG_SIZE
    }

    #[inline(always)]
    fn ctrl_offset(pin: u8) -> usize {
        (IO_BANK0_OFFSET + GPIO_CTRL + (pin as usize * GPIO_OFFSET) + RW_OFFSET) / REG_SIZE
    }

    fn set_funcsel(&self, pin: u8, fsel: u32) {
        let offset = Self::ctrl_offset(pin);
        let mut reg_value = self.read(offset);

        reg_value = (reg_value & !CTRL_OUTOVER_MASK) | (OUTOVER_PERI << CTRL_OUTOVER_LSB);
        reg_value = (reg_value & !CTRL_OEOVER_MASK) | (OEOVER_PERI << CTRL_OEOVER_LSB);
        reg_value = (reg_value & !CTRL_FUNCSEL_MASK) | (fsel << CTRL_FUNCSEL_LSB);

        self.write(offset, reg_value);
    }
}

impl SioRegisters for GpioMem {
    #[inline(always)]
    fn out(&self) -> u32 {
        self.read((SYS_RIO0_OFFSET + RIO_OUT + RW_OFFSET) / REG_SIZE)
    }

    #[inline(always)]
    fn set_out(&self, mask: u32) {
        self.write((SYS_RIO0_OFFSET + RIO_OUT + SET_OFFSET) / REG_SIZE, mask);
    }

    #[inline(always)]
    fn clr_out(&self, mask: u32) {
        self.write((SYS_RIO0_OFFSET + RIO_OUT + CLR_OFFSET) / REG_SIZE, mask);
    }

    #[inline(always)]
    fn xor_out(&self, mask: u32) {
        self.write((SYS_RIO0_OFFSET + RIO_OUT + XOR_OFFSET) / REG_SIZE, mask);
    }

    #[inline(always)]
    fn oe(&self) -> u32 {
        self.read((SYS_RIO0_OFFSET + RIO_OE + RW_OFFSET) / REG_SIZE)
    }

    #[inline(always)]
    fn set_oe(&self, mask: u32) {
        self.write((SYS_RIO0_OFFSET + RIO_OE + SET_OFFSET) / REG_SIZE, mask);
    }

    #[inline(always)]
    fn clr_oe(&self, mask: u32) {
        self.write((SYS_RIO0_OFFSET + RIO_OE + CLR_OFFSET) / REG_SIZE, mask);
    }

    #[inline(always)]
    fn xor_oe(&self, mask: u32) {
        self.write((SYS_RIO0_OFFSET + RIO_OE + XOR_OFFSET) / REG_SIZE, mask);
    }

    #[inline(always)]
    fn levels(&self) -> u32 {
        self.read((SYS_RIO0_OFFSET + RIO_IN + RW_OFFSET) / REG_SIZE)
    }

    fn bias(&self, pin: u8) -> Bias {
        let reg_value = self.read(Self::pads_offset(pin, RW_OFFSET));

        match (reg_value & PADS_BIAS_MASK) >> PADS_BIAS_LSB {
            PADS_BIAS_DOWN => Bias::PullDown,
            PADS_BIAS_UP => Bias::PullUp,
            _ => Bias::Off,
        }
    }

    fn set_bias(&self, pin: u8, bias: Bias) {
        let offset = Self::pads_offset(pin, RW_OFFSET);
        let reg_value = self.read(offset);

        let bits = match bias {
            Bias::Off => PADS_BIAS_OFF,
            Bias::PullDown => PADS_BIAS_DOWN,
            Bias::PullUp => PADS_BIAS_UP,
        };

        self.write(
            offset,
            (reg_value & !PADS_BIAS_MASK) | (bits << PADS_BIAS_LSB),
        );
    }

    fn enable_io(&self, pin: u8) {
        // Input receiver on, output driver not forced off.
        self.write(Self::pads_offset(pin, SET_OFFSET), PADS_IN_ENABLE_MASK);
        self.write(Self::pads_offset(pin, CLR_OFFSET), PADS_OUT_DISABLE_MASK);
    }

    fn select_sio(&self, pin: u8) {
        self.set_funcsel(pin, FSEL_SIO);
    }

    fn deselect_sio(&self, pin: u8) {
        self.set_funcsel(pin, FSEL_NULL);
    }

    fn is_sio(&self, pin: u8) -> bool {
        self.read(Self::ctrl_offset(pin)) & CTRL_FUNCSEL_MASK == FSEL_SIO
    }
}

impl Drop for GpioMem {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.mem_ptr as *mut c_void, MEM_SIZE as size_t);
        }
    }
}

// Required because of the raw pointer to our memory-mapped file
unsafe impl Send for GpioMem {}

unsafe impl Sync for GpioMem {}
