use std::fmt;
use std::os::raw::c_char;
use std::ptr;
use std::slice;

/// String-valued option target living inside a plugin config.
///
/// The host never allocates into plugin memory itself. It writes through
/// `assign`, a function pointer captured when the slot was constructed, so the
/// allocation happens in the plugin's code and is released by the plugin's
/// `destroy` when the slot is dropped.
#[repr(C)]
pub struct StringSlot {
    ptr: *mut u8,
    len: usize,
    assign: extern "C" fn(slot: *mut StringSlot, value: *const c_char, len: usize),
}

extern "C" fn assign_in_place(slot: *mut StringSlot, value: *const c_char, len: usize) {
    if slot.is_null() {
        return;
    }
    let bytes: &[u8] = if value.is_null() {
        &[]
    } else {
        unsafe { slice::from_raw_parts(value.cast::<u8>(), len) }
    };
    let owned = String::from_utf8_lossy(bytes).into_owned();
    unsafe { (*slot).set(owned) };
}

impl StringSlot {
    pub fn new() -> Self {
        Self {
            ptr: ptr::null_mut(),
            len: 0,
            assign: assign_in_place,
        }
    }

    pub fn get(&self) -> Option<&str> {
        if self.ptr.is_null() {
            return None;
        }
        // The bytes always come from a `Box<str>` built in `set`.
        unsafe {
            let bytes = slice::from_raw_parts(self.ptr, self.len);
            Some(std::str::from_utf8_unchecked(bytes))
        }
    }

    pub fn is_set(&self) -> bool {
        !self.ptr.is_null()
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.clear();
        let boxed = value.into().into_boxed_str();
        self.len = boxed.len();
        self.ptr = Box::into_raw(boxed).cast::<u8>();
    }

    pub fn take(&mut self) -> Option<String> {
        let value = self.get().map(str::to_owned);
        self.clear();
        value
    }

    pub fn clear(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let raw = ptr::slice_from_raw_parts_mut(self.ptr, self.len) as *mut str;
        drop(unsafe { Box::from_raw(raw) });
        self.ptr = ptr::null_mut();
        self.len = 0;
    }

    /// Writes `value` into the slot through the plugin-side assign function.
    ///
    /// # Safety
    /// `slot` must point to a live `StringSlot` that nobody else is accessing.
    pub unsafe fn assign_raw(slot: *mut StringSlot, value: &str) {
        let assign = (*slot).assign;
        assign(slot, value.as_ptr().cast::<c_char>(), value.len());
    }
}

impl Default for StringSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StringSlot {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for StringSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StringSlot").field(&self.get()).finish()
    }
}
