//! Target glue, behind the `rt` feature.
//!
//! Provides the microapp's entry points, the process-wide [`Microapp`]
//! context and the [`Firmware`] platform that calls the host firmware's
//! published callback.
//!
//! The host firmware jumps to `__microapp_start` (placed first in the image
//! by the linker script) once after loading. That initializes `.data` and
//! `.bss`, builds the context and publishes the `setup`/`loop` entry points.
//! From then on the host calls `__microapp_setup` once, `__microapp_loop`
//! repeatedly, and `__microapp_interrupt` for soft interrupts raised while
//! the microapp is idle. Interrupts raised while the microapp waits on a
//! request are handed back through the host callback instead (see
//! [`Microapp::send_message`]).
//!
//! User code hooks in with [`microapp_main!`](crate::microapp_main).

use core::ptr::{self, NonNull};

use abi::{
    ipc::IpcRamData,
    sdk::{Ack, ACK_OFFSET},
    MAX_PAYLOAD,
};

use crate::{utils::ArfCell, Microapp, Platform, ShimSettings};

/// The host firmware's callback: request buffer, request length and the
/// microapp's interrupt buffer in, result out.
pub type HostCallback =
    unsafe extern "C" fn(payload: *mut u8, len: u16, interrupt: *mut u8) -> i32;

/// The real host firmware.
pub struct Firmware {
    ipc: NonNull<IpcRamData>,
}

// The IPC RAM block is only ever touched from the one thread of control.
unsafe impl Send for Firmware {}

static APP: ArfCell<Option<Microapp<Firmware>>> = ArfCell::new(None);

// Provided by the linker script.
extern "C" {
    static mut __microapp_ipc_ram: IpcRamData;
    static __sidata: u8;
    static mut __sdata: u8;
    static mut __edata: u8;
    static mut __sbss: u8;
    static mut __ebss: u8;
}

// Provided by `microapp_main!`.
extern "Rust" {
    fn microapp_setup(app: &mut Microapp<Firmware>);
    fn microapp_loop(app: &mut Microapp<Firmware>);
    fn microapp_settings() -> ShimSettings;
}

#[link_section = ".microapp_header.entry_point"]
#[no_mangle]
#[used]
#[doc(hidden)]
pub static __MICROAPP_ENTRY_POINT: unsafe extern "C" fn() -> i32 = __microapp_start;

impl Platform for Firmware {
    type Ipc = IpcRamData;

    fn ipc(&self) -> &IpcRamData {
        unsafe { self.ipc.as_ref() }
    }

    fn ipc_mut(&mut self) -> &mut IpcRamData {
        unsafe { self.ipc.as_mut() }
    }

    unsafe fn invoke(
        &mut self,
        callback: usize,
        buffer: &mut [u8; MAX_PAYLOAD],
        len: usize,
        interrupt: &mut [u8; MAX_PAYLOAD],
    ) -> i32 {
        let callback = core::mem::transmute::<usize, HostCallback>(callback);
        // `len <= MAX_PAYLOAD` is checked by the caller
        callback(buffer.as_mut_ptr(), len as u16, interrupt.as_mut_ptr())
    }

    fn interrupt_entry(&self) -> usize {
        __microapp_interrupt as *const () as usize
    }
}

/// Copy `.data` from flash and zero `.bss`.
unsafe fn init_memory() {
    let sdata = ptr::addr_of_mut!(__sdata);
    let data_size = ptr::addr_of_mut!(__edata) as usize - sdata as usize;
    if data_size > 0 {
        sdata.copy_from_nonoverlapping(ptr::addr_of!(__sidata), data_size);
    }

    let sbss = ptr::addr_of_mut!(__sbss);
    let bss_size = ptr::addr_of_mut!(__ebss) as usize - sbss as usize;
    if bss_size > 0 {
        sbss.write_bytes(0, bss_size);
    }
}

fn ack_code(ack: Ack) -> i32 {
    i32::from(u8::from(ack))
}

#[no_mangle]
pub unsafe extern "C" fn __microapp_start() -> i32 {
    init_memory();

    let Some(ipc) = NonNull::new(ptr::addr_of_mut!(__microapp_ipc_ram)) else {
        return ack_code(Ack::ErrUndefined);
    };
    let mut app = Microapp::new(Firmware { ipc }, microapp_settings());
    let booted = app.boot(
        __microapp_setup as *const () as usize,
        __microapp_loop as *const () as usize,
    );

    match APP.borrow_mut() {
        Ok(mut slot) => *slot = Some(app),
        Err(_) => return ack_code(Ack::ErrBusy),
    }
    match booted {
        Ok(()) => 0,
        Err(error) => ack_code(error.as_ack()),
    }
}

#[no_mangle]
pub extern "C" fn __microapp_setup() -> i32 {
    with_app(|app| unsafe { microapp_setup(app) })
}

#[no_mangle]
pub extern "C" fn __microapp_loop() -> i32 {
    with_app(|app| unsafe { microapp_loop(app) })
}

/// Soft interrupt entry for an idle microapp. `event` is the host's
/// interrupt buffer.
///
/// If the context is already in use the interrupt is answered with
/// [`Ack::ErrBusy`]. A host that raises interrupts during a request must
/// return [`INTERRUPT_PENDING`](abi::sdk::INTERRUPT_PENDING) from its
/// callback instead.
#[no_mangle]
pub unsafe extern "C" fn __microapp_interrupt(event: *mut u8, len: u16) -> i32 {
    if event.is_null() {
        return ack_code(Ack::ErrUndefined);
    }
    let event = core::slice::from_raw_parts_mut(event, usize::from(len));

    let ack = match APP.borrow_mut() {
        Ok(mut guard) => match guard.as_mut() {
            Some(app) => app.dispatch_interrupt(event),
            None => Ack::ErrUndefined,
        },
        Err(_) => {
            if let Some(byte) = event.get_mut(ACK_OFFSET) {
                *byte = Ack::ErrBusy.into();
            }
            Ack::ErrBusy
        }
    };
    ack_code(ack)
}

fn with_app(f: impl FnOnce(&mut Microapp<Firmware>)) -> i32 {
    match APP.borrow_mut() {
        Ok(mut guard) => match guard.as_mut() {
            Some(app) => {
                f(app);
                0
            }
            None => ack_code(Ack::ErrUndefined),
        },
        Err(_) => ack_code(Ack::ErrBusy),
    }
}

/// Bind the user's `setup` and `loop` functions (and optionally the
/// [`ShimSettings`]) to the microapp entry points.
///
/// ```ignore
/// fn setup(app: &mut Microapp<Firmware>) {
///     app.serial().println("hello").ok();
/// }
///
/// fn tick(app: &mut Microapp<Firmware>) {
///     app.delay(1000).ok();
/// }
///
/// microapp::microapp_main!(setup = setup, loop = tick);
/// ```
#[macro_export]
macro_rules! microapp_main {
    (setup = $setup:path, loop = $loop_fn:path $(, settings = $settings:expr)? $(,)?) => {
        #[no_mangle]
        fn microapp_setup(app: &mut $crate::Microapp<$crate::rt::Firmware>) {
            $setup(app)
        }

        #[no_mangle]
        fn microapp_loop(app: &mut $crate::Microapp<$crate::rt::Firmware>) {
            $loop_fn(app)
        }

        #[no_mangle]
        fn microapp_settings() -> $crate::ShimSettings {
            $crate::microapp_main!(@settings $($settings)?)
        }
    };
    (@settings) => {
        $crate::ShimSettings::DEFAULT
    };
    (@settings $settings:expr) => {
        $settings
    };
}

#[cfg(feature = "panic-handler")]
mod panic_handler {
    use core::panic::PanicInfo;
    use core::sync::atomic::{compiler_fence, Ordering};

    // There is no channel left to report a panic on; park until the host
    // firmware gives up on us.
    #[panic_handler]
    fn panic(_info: &PanicInfo) -> ! {
        loop {
            compiler_fence(Ordering::SeqCst);
        }
    }
}
