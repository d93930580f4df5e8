#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

//! Userspace bindings for the kernel's system-call interface.
//!
//! The dispatch table reserves ten syscall numbers; the kernel currently
//! dispatches six of them:
//!
//! - Halt. Shut the whole machine down. Root process only.
//! - Exit. Terminate the calling process with a status code.
//! - Exec. Load a named program image and run it as a child process.
//! - Join. Block until a child terminates and collect its exit status.
//! - Read. Read bytes from stdin, the only readable descriptor.
//! - Write. Write bytes to stdout, the only writable descriptor.
//!
//! The remaining numbers (Create, Open, Close, Unlink) are reserved for
//! the file syscalls and are rejected by the kernel, so no wrappers are
//! provided for them here.
//!
//! The kernel reports every failure as a single negative sentinel, which
//! is why [`Error`] carries so little information.

#[macro_use]
pub mod console;

use core::arch::asm;
use core::hint::unreachable_unchecked;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The only readable file descriptor.
pub const STDIN: usize = 0;
/// The only writable file descriptor.
pub const STDOUT: usize = 1;

/// Syscall numbers as the kernel's dispatch table defines them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(usize)]
pub enum Syscalls {
    Halt = 0,
    Exit = 1,
    Exec = 2,
    Join = 3,
    Create = 4,
    Open = 5,
    Read = 6,
    Write = 7,
    Close = 8,
    Unlink = 9,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The kernel refused the call: a bad argument, an unknown program
    /// image, or a process that does not belong to the caller.
    Rejected,
}

pub type Result<T> = core::result::Result<T, Error>;

/// Identifier of a child process started with [`exec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pid(usize);

/// How a joined child stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// The child invoked Exit itself.
    Normal,
    /// The kernel killed the child, e.g. after an unhandled exception.
    Killed,
}

/// Read bytes from `fd` into `buf`, returning how many were read.
pub fn read(fd: usize, buf: &mut [u8]) -> Result<usize> {
    demux(unsafe { syscall3(Syscalls::Read, fd, buf.as_mut_ptr() as usize, buf.len()) })
}

/// Write all of `buf` to `fd`.
pub fn write(fd: usize, buf: &[u8]) -> Result<()> {
    demux(unsafe { syscall3(Syscalls::Write, fd, buf.as_ptr() as usize, buf.len()) }).map(|_| ())
}

/// Terminate the calling process with `status`.
pub fn exit(status: i32) -> ! {
    unsafe { syscall1(Syscalls::Exit, status as usize) };
    // the kernel tears this process down before the syscall returns
    unsafe { unreachable_unchecked() }
}

/// Ask the kernel to shut the machine down.
///
/// On success this call does not return. The kernel honors it only from
/// the root process and refuses it from everyone else.
pub fn halt() -> Result<()> {
    match unsafe { syscall0(Syscalls::Halt) } {
        0 => Ok(()),
        _ => Err(Error::Rejected),
    }
}

/// Load the program image named `path` and run it as a child process.
///
/// `path` and every entry of `argv` must be NUL-terminated; the kernel
/// reads them as C strings out of the caller's address space.
pub fn exec(path: &str, argv: &[*const u8]) -> Result<Pid> {
    debug_assert!(path.ends_with('\0'), "exec path must be NUL terminated");
    demux(unsafe {
        syscall3(
            Syscalls::Exec,
            path.as_ptr() as usize,
            argv.len(),
            argv.as_ptr() as usize,
        )
    })
    .map(Pid)
}

/// Block until the child `pid` terminates, yielding how it stopped and
/// its exit status.
///
/// Only a direct child may be joined, and only once; the kernel disowns
/// the child when the join completes.
pub fn join(pid: Pid) -> Result<(ExitKind, i32)> {
    let mut status: i32 = 0;
    let ret = unsafe { syscall2(Syscalls::Join, pid.0, &mut status as *mut i32 as usize) };
    decode_join(ret, status)
}

/// Split a raw return value into the error sentinel and everything else.
fn demux(ret: isize) -> Result<usize> {
    if ret < 0 {
        Err(Error::Rejected)
    } else {
        Ok(ret as usize)
    }
}

fn decode_join(ret: isize, status: i32) -> Result<(ExitKind, i32)> {
    match ret {
        1 => Ok((ExitKind::Normal, status)),
        0 => Ok((ExitKind::Killed, status)),
        _ => Err(Error::Rejected),
    }
}

// Register convention the kernel expects when `syscall` is issued:
//
// rdi  syscall number
// rsi  arg0
// rdx  arg1
// r10  arg2
// rax  return value
//
// rcx and r11 are clobbered by the syscall instruction itself (return
// address and saved rflags).

unsafe fn syscall0(num: Syscalls) -> isize {
    let ret;
    unsafe {
        asm!(
            "syscall",
            in("rdi") usize::from(num),
            out("rax") ret,
            out("rcx") _,
            out("r11") _,
            options(nostack),
        );
    }
    ret
}

unsafe fn syscall1(num: Syscalls, arg0: usize) -> isize {
    let ret;
    unsafe {
        asm!(
            "syscall",
            in("rdi") usize::from(num),
            in("rsi") arg0,
            out("rax") ret,
            out("rcx") _,
            out("r11") _,
            options(nostack),
        );
    }
    ret
}

unsafe fn syscall2(num: Syscalls, arg0: usize, arg1: usize) -> isize {
    let ret;
    unsafe {
        asm!(
            "syscall",
            in("rdi") usize::from(num),
            in("rsi") arg0,
            in("rdx") arg1,
            out("rax") ret,
            out("rcx") _,
            out("r11") _,
            options(nostack),
        );
    }
    ret
}

unsafe fn syscall3(num: Syscalls, arg0: usize, arg1: usize, arg2: usize) -> isize {
    let ret;
    unsafe {
        asm!(
            "syscall",
            in("rdi") usize::from(num),
            in("rsi") arg0,
            in("rdx") arg1,
            in("r10") arg2,
            out("rax") ret,
            out("rcx") _,
            out("r11") _,
            options(nostack),
        );
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syscall_numbers_match_the_kernel_table() {
        assert_eq!(usize::from(Syscalls::Halt), 0);
        assert_eq!(usize::from(Syscalls::Exit), 1);
        assert_eq!(usize::from(Syscalls::Exec), 2);
        assert_eq!(usize::from(Syscalls::Join), 3);
        assert_eq!(usize::from(Syscalls::Read), 6);
        assert_eq!(usize::from(Syscalls::Write), 7);
    }

    #[test]
    fn unknown_numbers_do_not_decode() {
        assert_eq!(Syscalls::try_from(9usize).unwrap(), Syscalls::Unlink);
        assert!(Syscalls::try_from(10usize).is_err());
    }

    #[test]
    fn negative_returns_are_errors() {
        assert_eq!(demux(-1), Err(Error::Rejected));
        assert_eq!(demux(0), Ok(0));
        assert_eq!(demux(17), Ok(17));
    }

    #[test]
    fn join_reports_how_the_child_stopped() {
        assert_eq!(decode_join(1, 42), Ok((ExitKind::Normal, 42)));
        assert_eq!(decode_join(0, -3), Ok((ExitKind::Killed, -3)));
        assert_eq!(decode_join(-1, 0), Err(Error::Rejected));
    }
}
