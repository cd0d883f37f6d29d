//! Windows raw input capture target.
//!
//! Each session owns a message-only window registered under the poller's
//! unique class name. The window's user data points at a routing slot owned by
//! the session; the window procedure decodes WM_INPUT into that slot and the
//! session hands it back after dispatch.

use mousepoll_core::{
    CaptureTarget, EventSession, EventSource, PollError, PollResult, RawMouseReport, SourceEvent,
    Waker,
};
use std::cell::Cell;
use std::mem::size_of;
use std::ptr::{null, null_mut};
use tracing::{debug, error, warn};
use windows_sys::Win32::Foundation::{
    GetLastError, SetLastError, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM,
};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::System::Threading::GetCurrentThreadId;
use windows_sys::Win32::UI::Input::{
    GetRawInputData, RegisterRawInputDevices, HRAWINPUT, RAWINPUT, RAWINPUTDEVICE,
    RAWINPUTHEADER, RIDEV_INPUTSINK, RIDEV_NOLEGACY, RIDEV_REMOVE, RID_INPUT, RIM_TYPEMOUSE,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW,
    PostThreadMessageW, RegisterClassExW, TranslateMessage, UnregisterClassW, GWLP_USERDATA,
    HWND_MESSAGE, MSG, WM_INPUT, WM_QUIT, WNDCLASSEXW,
};

#[cfg(target_pointer_width = "64")]
use windows_sys::Win32::UI::WindowsAndMessaging::{GetWindowLongPtrW, SetWindowLongPtrW};
#[cfg(target_pointer_width = "32")]
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetWindowLongW as GetWindowLongPtrW, SetWindowLongW as SetWindowLongPtrW,
};

// HID usage page and usage for mice
const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
const HID_USAGE_GENERIC_MOUSE: u16 = 0x02;

/// Raw input source backed by a hidden message-only window.
///
/// With `no_legacy` set, legacy mouse messages are suppressed for every
/// window of the process, not just the capture target.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawInputSource;

impl EventSource for RawInputSource {
    type Session = RawInputSession;

    fn open(&self, target: &CaptureTarget) -> PollResult<RawInputSession> {
        RawInputSession::open(target)
    }
}

/// Decoded report parked by the window procedure for the current dispatch.
struct RouteSlot {
    pending: Cell<Option<RawMouseReport>>,
}

/// Capture target owned by one worker thread.
///
/// Dropping it unregisters the device, destroys the window and unregisters
/// the class, in that order, logging any failure.
pub struct RawInputSession {
    instance: HINSTANCE,
    class_name: Vec<u16>,
    class_registered: bool,
    hwnd: HWND,
    device_registered: bool,
    thread_id: u32,
    slot: Box<RouteSlot>,
}

impl RawInputSession {
    fn open(target: &CaptureTarget) -> PollResult<Self> {
        let mut session = Self {
            instance: unsafe { GetModuleHandleW(null()) },
            class_name: target.name.encode_utf16().chain(Some(0)).collect(),
            class_registered: false,
            hwnd: null_mut(),
            device_registered: false,
            thread_id: unsafe { GetCurrentThreadId() },
            slot: Box::new(RouteSlot {
                pending: Cell::new(None),
            }),
        };

        // Partially acquired resources are released by Drop on early return.
        session.register_class()?;
        session.create_window()?;
        session.associate_slot()?;
        session.register_device(target)?;

        debug!(target = %target.name, "Raw input capture target ready");
        Ok(session)
    }

    fn register_class(&mut self) -> PollResult<()> {
        let wc = WNDCLASSEXW {
            cbSize: size_of::<WNDCLASSEXW>() as u32,
            style: 0,
            lpfnWndProc: Some(window_proc),
            cbClsExtra: 0,
            cbWndExtra: 0,
            hInstance: self.instance,
            hIcon: null_mut(),
            hCursor: null_mut(),
            hbrBackground: null_mut(),
            lpszMenuName: null(),
            lpszClassName: self.class_name.as_ptr(),
            hIconSm: null_mut(),
        };

        if unsafe { RegisterClassExW(&wc) } == 0 {
            return Err(PollError::ClassRegistration(last_error()));
        }
        self.class_registered = true;
        Ok(())
    }

    fn create_window(&mut self) -> PollResult<()> {
        let title: [u16; 1] = [0];
        let hwnd = unsafe {
            CreateWindowExW(
                0,
                self.class_name.as_ptr(),
                title.as_ptr(),
                0,
                0,
                0,
                0,
                0,
                HWND_MESSAGE,
                null_mut(),
                self.instance,
                null(),
            )
        };

        if hwnd.is_null() {
            return Err(PollError::TargetCreation(last_error()));
        }
        self.hwnd = hwnd;
        debug!(hwnd = ?hwnd, "Message window created");
        Ok(())
    }

    fn associate_slot(&mut self) -> PollResult<()> {
        let slot: *const RouteSlot = &*self.slot;
        unsafe {
            // A zero return is only a failure if the last error was set.
            SetLastError(0);
            if SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, slot as _) == 0 {
                let code = GetLastError();
                if code != 0 {
                    return Err(PollError::RouteAssociation(code));
                }
            }
        }
        Ok(())
    }

    fn register_device(&mut self, target: &CaptureTarget) -> PollResult<()> {
        let mut flags = 0;
        if target.input_sink {
            flags |= RIDEV_INPUTSINK;
        }
        if target.no_legacy {
            flags |= RIDEV_NOLEGACY;
        }
        let device = RAWINPUTDEVICE {
            usUsagePage: HID_USAGE_PAGE_GENERIC,
            usUsage: HID_USAGE_GENERIC_MOUSE,
            dwFlags: flags,
            hwndTarget: self.hwnd,
        };

        let ok = unsafe {
            RegisterRawInputDevices(&device, 1, size_of::<RAWINPUTDEVICE>() as u32)
        };
        if ok == 0 {
            return Err(PollError::DeviceRegistration(last_error()));
        }
        self.device_registered = true;
        debug!(flags, "Raw input registered for mouse");
        Ok(())
    }

    fn unregister_device(&mut self) -> PollResult<()> {
        let device = RAWINPUTDEVICE {
            usUsagePage: HID_USAGE_PAGE_GENERIC,
            usUsage: HID_USAGE_GENERIC_MOUSE,
            dwFlags: RIDEV_REMOVE,
            hwndTarget: null_mut(),
        };
        self.device_registered = false;
        let ok = unsafe {
            RegisterRawInputDevices(&device, 1, size_of::<RAWINPUTDEVICE>() as u32)
        };
        if ok == 0 {
            return Err(PollError::DeviceUnregistration(last_error()));
        }
        Ok(())
    }

    fn destroy_window(&mut self) -> PollResult<()> {
        let hwnd = std::mem::replace(&mut self.hwnd, null_mut());
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
            if DestroyWindow(hwnd) == 0 {
                return Err(PollError::TargetDestruction(last_error()));
            }
        }
        Ok(())
    }

    fn unregister_class(&mut self) -> PollResult<()> {
        self.class_registered = false;
        if unsafe { UnregisterClassW(self.class_name.as_ptr(), self.instance) } == 0 {
            return Err(PollError::ClassUnregistration(last_error()));
        }
        Ok(())
    }
}

impl EventSession for RawInputSession {
    type Waker = RawInputWaker;

    fn waker(&self) -> RawInputWaker {
        RawInputWaker {
            thread_id: self.thread_id,
        }
    }

    fn next_event(&mut self) -> SourceEvent {
        let mut msg: MSG = unsafe { std::mem::zeroed() };
        let ret = unsafe { GetMessageW(&mut msg, null_mut(), 0, 0) };
        if ret == 0 {
            return SourceEvent::Shutdown;
        }
        if ret < 0 {
            error!(code = last_error(), "GetMessageW failed");
            return SourceEvent::Shutdown;
        }

        unsafe {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        match self.slot.pending.take() {
            Some(report) => SourceEvent::Report(report),
            None => SourceEvent::Ignored,
        }
    }
}

impl Drop for RawInputSession {
    fn drop(&mut self) {
        if self.device_registered {
            if let Err(e) = self.unregister_device() {
                error!(error = %e, "Teardown");
            }
        }
        if !self.hwnd.is_null() {
            if let Err(e) = self.destroy_window() {
                error!(error = %e, "Teardown");
            }
        }
        if self.class_registered {
            if let Err(e) = self.unregister_class() {
                error!(error = %e, "Teardown");
            }
        }
    }
}

/// Posts WM_QUIT to the worker thread's queue.
#[derive(Debug, Clone, Copy)]
pub struct RawInputWaker {
    thread_id: u32,
}

impl Waker for RawInputWaker {
    fn wake(&self) -> PollResult<()> {
        if unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, 0, 0) } == 0 {
            return Err(PollError::Wake(format!("os error {}", last_error())));
        }
        Ok(())
    }
}

fn last_error() -> u32 {
    unsafe { GetLastError() }
}

/// Window procedure for the capture target.
unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_INPUT {
        let slot = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const RouteSlot;
        if !slot.is_null() {
            if let Some(report) = read_mouse_report(lparam) {
                (*slot).pending.set(Some(report));
            }
        }
    }
    // WM_INPUT still needs DefWindowProcW so the system can free the raw input.
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

/// Fetch the raw input behind a WM_INPUT `lparam`.
unsafe fn read_mouse_report(lparam: LPARAM) -> Option<RawMouseReport> {
    let mut raw: RAWINPUT = std::mem::zeroed();
    let mut size = size_of::<RAWINPUT>() as u32;
    let copied = GetRawInputData(
        lparam as HRAWINPUT,
        RID_INPUT,
        &mut raw as *mut RAWINPUT as *mut _,
        &mut size,
        size_of::<RAWINPUTHEADER>() as u32,
    );
    if copied == u32::MAX {
        warn!(code = last_error(), "GetRawInputData failed");
        return None;
    }
    mouse_report(&raw)
}

/// Copy the mouse fields out of a raw input packet, if it came from a mouse.
fn mouse_report(raw: &RAWINPUT) -> Option<RawMouseReport> {
    if raw.header.dwType != RIM_TYPEMOUSE {
        return None;
    }
    // The header says this is a mouse packet, so `mouse` is the live variant.
    let mouse = unsafe { raw.data.mouse };
    let buttons = unsafe { mouse.Anonymous.Anonymous };
    Some(RawMouseReport {
        button_flags: buttons.usButtonFlags,
        button_data: buttons.usButtonData,
        last_x: mouse.lLastX,
        last_y: mouse.lLastY,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mousepoll_core::flags;
    use windows_sys::Win32::UI::Input::RIM_TYPEKEYBOARD;

    fn raw_mouse(button_flags: u16, button_data: u16, x: i32, y: i32) -> RAWINPUT {
        let mut raw: RAWINPUT = unsafe { std::mem::zeroed() };
        raw.header.dwType = RIM_TYPEMOUSE;
        unsafe {
            raw.data.mouse.lLastX = x;
            raw.data.mouse.lLastY = y;
            raw.data.mouse.Anonymous.Anonymous.usButtonFlags = button_flags;
            raw.data.mouse.Anonymous.Anonymous.usButtonData = button_data;
        }
        raw
    }

    #[test]
    fn test_message_only_session_opens_and_wakes() {
        let id = mousepoll_core::PollerId::new();
        let target = CaptureTarget {
            id,
            name: id.target_name(),
            input_sink: true,
            no_legacy: true,
        };
        let mut session = RawInputSource.open(&target).expect("open session");
        assert!(!session.hwnd.is_null());

        session.waker().wake().expect("wake");
        assert_eq!(session.next_event(), SourceEvent::Shutdown);
    }

    #[test]
    fn test_mouse_report_copies_fields() {
        let raw = raw_mouse(flags::BUTTON_1_DOWN, 0, 5, -3);
        let report = mouse_report(&raw).expect("mouse packet");
        assert_eq!(
            report,
            RawMouseReport {
                button_flags: flags::BUTTON_1_DOWN,
                button_data: 0,
                last_x: 5,
                last_y: -3,
            }
        );
    }

    #[test]
    fn test_mouse_report_wheel_decodes_negative() {
        let raw = raw_mouse(flags::WHEEL, (-120i16) as u16, 0, 0);
        let report = mouse_report(&raw).expect("mouse packet");
        assert_eq!(report.button_data as i16, -120);
        assert_eq!(report, RawMouseReport::wheel(-1));
    }

    #[test]
    fn test_keyboard_packet_ignored() {
        let mut raw = raw_mouse(0, 0, 1, 1);
        raw.header.dwType = RIM_TYPEKEYBOARD;
        assert!(mouse_report(&raw).is_none());
    }
}
