//! Smoke test for running a user program: prints one line over the Write
//! syscall and exits cleanly.

#![no_std]
#![no_main]

use core::panic::PanicInfo;
use syscall::println;

#[no_mangle]
pub extern "C" fn _start() -> ! {
    syscall::exit(main())
}

fn main() -> i32 {
    println!("3rd process ending");
    0
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    println!("{}", info);
    syscall::exit(1)
}
