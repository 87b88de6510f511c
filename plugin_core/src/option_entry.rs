use std::ffi::c_void;
use std::os::raw::c_char;
use std::ptr;

/// Kind of value an option carries, and therefore the type behind its target.
///
/// Crosses the ABI as a plain `u32` inside [`OptionEntry`]; the host decodes it
/// with `TryFrom<u32>` so an unknown value from foreign code is rejected instead
/// of becoming an invalid enum.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionArg {
    /// Flag without a value. Presence writes `true` into a `*mut bool`.
    None = 0,
    /// Free-form text written into a `*mut StringSlot`.
    String = 1,
    /// Signed 64-bit integer written into a `*mut i64`.
    Int = 2,
    /// Explicit boolean value (`--opt=false`) written into a `*mut bool`.
    Bool = 3,
    /// Floating point number written into a `*mut f64`.
    Double = 4,
}

impl OptionArg {
    /// Whether the option consumes a value on the command line.
    pub fn takes_value(self) -> bool {
        !matches!(self, OptionArg::None)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptionArg::None => "none",
            OptionArg::String => "string",
            OptionArg::Int => "int",
            OptionArg::Bool => "bool",
            OptionArg::Double => "double",
        }
    }
}

impl TryFrom<u32> for OptionArg {
    type Error = u32;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(OptionArg::None),
            1 => Ok(OptionArg::String),
            2 => Ok(OptionArg::Int),
            3 => Ok(OptionArg::Bool),
            4 => Ok(OptionArg::Double),
            other => Err(other),
        }
    }
}

/// One entry of the option table returned by a plugin's `get_options` slot.
///
/// The table is a contiguous array terminated by [`OptionEntry::SENTINEL`]
/// (an entry whose `name` is null). Consumers must stop at the sentinel.
///
/// `target` points back into the plugin's config object; it is a borrowed
/// slot, never an ownership transfer, and is only valid while that config is
/// alive and until the next `get_options` call on it.
#[repr(C)]
#[derive(Debug)]
pub struct OptionEntry {
    /// Long option name without the leading `--`. Null marks the end of the table.
    pub name: *const c_char,

    /// Single ASCII short option character, or `0` for none.
    pub short_name: c_char,

    /// Raw [`OptionArg`] discriminant.
    pub arg: u32,

    /// Writable slot inside the plugin config, typed according to `arg`.
    pub target: *mut c_void,

    /// One line of help text. May be null.
    pub description: *const c_char,

    /// Placeholder shown for the value in help output (e.g. `"<file>"`). May be null.
    pub arg_description: *const c_char,
}

impl OptionEntry {
    /// End-of-table marker.
    pub const SENTINEL: OptionEntry = OptionEntry {
        name: ptr::null(),
        short_name: 0,
        arg: OptionArg::None as u32,
        target: ptr::null_mut(),
        description: ptr::null(),
        arg_description: ptr::null(),
    };

    pub fn is_sentinel(&self) -> bool {
        self.name.is_null()
    }
}
