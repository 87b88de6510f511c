//! Safe authoring side of the plugin contract.
//!
//! A plugin describes its options by implementing [`PluginOptions`] for its
//! config type. [`PluginDescriptor::of`](crate::PluginDescriptor::of) wires the
//! generic trampolines below into the descriptor slots, so the raw table handed
//! to the host is rebuilt from [`OptionSpec`]s on each `get_options` call.

use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};

use crate::{OptionArg, OptionEntry, PluginConfigHandle, StringSlot};

/// Implemented by a plugin's configuration type.
pub trait PluginOptions: Default + 'static {
    /// Binds option names to fields of `self`.
    fn options(&mut self) -> Vec<OptionSpec<'_>>;

    /// Runs after parsing has written into `self`. A non-zero code is
    /// reported back to the host as an apply failure.
    fn apply(&mut self) -> Result<(), libc::c_int> {
        Ok(())
    }
}

/// Field of a config object an option writes into.
#[derive(Debug)]
pub enum OptionTarget<'a> {
    Flag(&'a mut bool),
    Bool(&'a mut bool),
    Int(&'a mut i64),
    Double(&'a mut f64),
    String(&'a mut StringSlot),
}

impl OptionTarget<'_> {
    fn into_raw(self) -> (OptionArg, *mut c_void) {
        match self {
            OptionTarget::Flag(v) => (OptionArg::None, (v as *mut bool).cast()),
            OptionTarget::Bool(v) => (OptionArg::Bool, (v as *mut bool).cast()),
            OptionTarget::Int(v) => (OptionArg::Int, (v as *mut i64).cast()),
            OptionTarget::Double(v) => (OptionArg::Double, (v as *mut f64).cast()),
            OptionTarget::String(v) => (OptionArg::String, (v as *mut StringSlot).cast()),
        }
    }
}

/// A single option binding, borrowed from the config it writes into.
#[derive(Debug)]
pub struct OptionSpec<'a> {
    name: &'static CStr,
    short_name: Option<u8>,
    target: OptionTarget<'a>,
    description: Option<&'static CStr>,
    arg_description: Option<&'static CStr>,
}

impl<'a> OptionSpec<'a> {
    pub fn new(name: &'static CStr, target: OptionTarget<'a>) -> Self {
        Self {
            name,
            short_name: None,
            target,
            description: None,
            arg_description: None,
        }
    }

    pub fn flag(name: &'static CStr, target: &'a mut bool) -> Self {
        Self::new(name, OptionTarget::Flag(target))
    }

    pub fn boolean(name: &'static CStr, target: &'a mut bool) -> Self {
        Self::new(name, OptionTarget::Bool(target))
    }

    pub fn int(name: &'static CStr, target: &'a mut i64) -> Self {
        Self::new(name, OptionTarget::Int(target))
    }

    pub fn double(name: &'static CStr, target: &'a mut f64) -> Self {
        Self::new(name, OptionTarget::Double(target))
    }

    pub fn string(name: &'static CStr, target: &'a mut StringSlot) -> Self {
        Self::new(name, OptionTarget::String(target))
    }

    /// Adds a single-character alias. Only ASCII alphanumerics are accepted
    /// by the host.
    pub fn short(mut self, short_name: u8) -> Self {
        self.short_name = Some(short_name);
        self
    }

    pub fn description(mut self, description: &'static CStr) -> Self {
        self.description = Some(description);
        self
    }

    pub fn arg_description(mut self, arg_description: &'static CStr) -> Self {
        self.arg_description = Some(arg_description);
        self
    }

    fn into_entry(self) -> OptionEntry {
        let (arg, target) = self.target.into_raw();
        OptionEntry {
            name: self.name.as_ptr(),
            short_name: self.short_name.map_or(0, |c| c as c_char),
            arg: arg as u32,
            target,
            description: self.description.map_or(ptr::null(), CStr::as_ptr),
            arg_description: self.arg_description.map_or(ptr::null(), CStr::as_ptr),
        }
    }
}

/// Heap cell behind a `PluginConfigHandle` created by [`init_config`].
struct ConfigCell<T> {
    config: T,
    entries: Vec<OptionEntry>,
}

pub(crate) extern "C" fn init_config<T: PluginOptions>() -> *mut PluginConfigHandle {
    let cell = panic::catch_unwind(|| {
        Box::new(ConfigCell {
            config: T::default(),
            entries: Vec::new(),
        })
    });
    match cell {
        Ok(cell) => Box::into_raw(cell).cast(),
        Err(_) => ptr::null_mut(),
    }
}

pub(crate) extern "C" fn destroy_config<T: PluginOptions>(handle: *mut PluginConfigHandle) {
    if handle.is_null() {
        return;
    }
    let cell = unsafe { Box::from_raw(handle.cast::<ConfigCell<T>>()) };
    let _ = panic::catch_unwind(AssertUnwindSafe(move || drop(cell)));
}

pub(crate) extern "C" fn get_options<T: PluginOptions>(
    handle: *mut PluginConfigHandle,
) -> *const OptionEntry {
    if handle.is_null() {
        return ptr::null();
    }
    let cell = unsafe { &mut *handle.cast::<ConfigCell<T>>() };
    let built = panic::catch_unwind(AssertUnwindSafe(|| {
        let ConfigCell { config, entries } = cell;
        entries.clear();
        entries.extend(config.options().into_iter().map(OptionSpec::into_entry));
        entries.push(OptionEntry::SENTINEL);
        entries.as_ptr()
    }));
    built.unwrap_or(ptr::null())
}

pub(crate) extern "C" fn apply_config<T: PluginOptions>(handle: *mut PluginConfigHandle) -> libc::c_int {
    if handle.is_null() {
        return -1;
    }
    let cell = unsafe { &mut *handle.cast::<ConfigCell<T>>() };
    match panic::catch_unwind(AssertUnwindSafe(|| cell.config.apply())) {
        Ok(Ok(())) => 0,
        Ok(Err(0)) | Err(_) => -1,
        Ok(Err(code)) => code,
    }
}

/// Borrows the typed config behind a handle.
///
/// # Safety
/// `handle` must come from the `init` slot of `PluginDescriptor::of::<T>()`
/// with the same `T`, must not have been destroyed, and must not be mutated
/// for the lifetime of the returned reference.
pub unsafe fn config_ref<'a, T: PluginOptions>(handle: NonNull<PluginConfigHandle>) -> &'a T {
    &(*handle.as_ptr().cast::<ConfigCell<T>>()).config
}

/// Mutable counterpart of [`config_ref`].
///
/// # Safety
/// Same requirements as [`config_ref`], and the reference must be unique.
pub unsafe fn config_mut<'a, T: PluginOptions>(handle: NonNull<PluginConfigHandle>) -> &'a mut T {
    &mut (*handle.as_ptr().cast::<ConfigCell<T>>()).config
}
