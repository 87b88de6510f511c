//! Option schema assembled from the groups every plugin contributes.
//!
//! Each binding points back into memory owned by someone else: a plugin's
//! config or a host value. The `'a` lifetime on [`OptionSchema`],
//! [`OptionGroup`] and [`OptionSlot`] is the borrow of that owner, so a schema
//! can never outlive the configs it writes into.

use std::ffi::CStr;
use std::marker::PhantomData;
use std::ptr::NonNull;

use plugin_core::{OptionArg, OptionEntry, StringSlot};
use thiserror::Error;

use crate::error::MergeError;
use crate::plugin::{Plugin, PluginState};

/// Long names the parser claims for itself.
pub const RESERVED_LONG: &[&str] = &["help"];
/// Short names the parser claims for itself.
pub const RESERVED_SHORT: &[char] = &['h'];

/// A value about to be written into a slot.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

/// A value's type does not fit the slot it was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("value type does not match the option slot")]
pub struct TypeMismatch;

#[derive(Debug, Clone, Copy)]
enum SlotTarget {
    Bool(NonNull<bool>),
    Int(NonNull<i64>),
    Double(NonNull<f64>),
    PluginString(NonNull<StringSlot>),
    HostString(NonNull<Option<String>>),
}

/// Non-owning reference to the storage an option writes into.
#[derive(Debug)]
pub struct OptionSlot<'a> {
    target: SlotTarget,
    _borrow: PhantomData<&'a mut ()>,
}

impl<'a> OptionSlot<'a> {
    fn new(target: SlotTarget) -> Self {
        Self {
            target,
            _borrow: PhantomData,
        }
    }

    /// Writes `value` into the slot. An integer is accepted for a floating
    /// point slot.
    pub fn write(&mut self, value: OptionValue) -> Result<(), TypeMismatch> {
        unsafe {
            match (self.target, value) {
                (SlotTarget::Bool(p), OptionValue::Bool(v)) => *p.as_ptr() = v,
                (SlotTarget::Int(p), OptionValue::Int(v)) => *p.as_ptr() = v,
                (SlotTarget::Double(p), OptionValue::Double(v)) => *p.as_ptr() = v,
                (SlotTarget::Double(p), OptionValue::Int(v)) => *p.as_ptr() = v as f64,
                (SlotTarget::PluginString(p), OptionValue::String(v)) => StringSlot::assign_raw(p.as_ptr(), &v),
                (SlotTarget::HostString(p), OptionValue::String(v)) => *p.as_ptr() = Some(v),
                _ => return Err(TypeMismatch),
            }
        }
        Ok(())
    }
}

/// One named option bound to a slot.
#[derive(Debug)]
pub struct OptionBinding<'a> {
    pub long: String,
    pub short: Option<char>,
    pub arg: OptionArg,
    pub description: Option<String>,
    pub arg_description: Option<String>,
    slot: OptionSlot<'a>,
}

impl<'a> OptionBinding<'a> {
    fn new(long: impl Into<String>, arg: OptionArg, target: SlotTarget) -> Self {
        Self {
            long: long.into(),
            short: None,
            arg,
            description: None,
            arg_description: None,
            slot: OptionSlot::new(target),
        }
    }

    /// `--long` without a value sets `target` to `true`.
    pub fn flag(long: impl Into<String>, target: &'a mut bool) -> Self {
        Self::new(long, OptionArg::None, SlotTarget::Bool(NonNull::from(target)))
    }

    pub fn boolean(long: impl Into<String>, target: &'a mut bool) -> Self {
        Self::new(long, OptionArg::Bool, SlotTarget::Bool(NonNull::from(target)))
    }

    pub fn int(long: impl Into<String>, target: &'a mut i64) -> Self {
        Self::new(long, OptionArg::Int, SlotTarget::Int(NonNull::from(target)))
    }

    pub fn double(long: impl Into<String>, target: &'a mut f64) -> Self {
        Self::new(long, OptionArg::Double, SlotTarget::Double(NonNull::from(target)))
    }

    pub fn string(long: impl Into<String>, target: &'a mut Option<String>) -> Self {
        Self::new(long, OptionArg::String, SlotTarget::HostString(NonNull::from(target)))
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn help(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn value_name(mut self, arg_description: impl Into<String>) -> Self {
        self.arg_description = Some(arg_description.into());
        self
    }

    pub fn write(&mut self, value: OptionValue) -> Result<(), TypeMismatch> {
        self.slot.write(value)
    }
}

fn validate_long(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty option name".to_string());
    }
    if name.starts_with('-') {
        return Err(format!("option name '{}' must not start with '-'", name));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) {
        return Err(format!("option name '{}' contains invalid characters", name));
    }
    Ok(())
}

fn validate_short(short: char) -> Result<(), String> {
    if short.is_ascii_alphanumeric() {
        Ok(())
    } else {
        Err(format!("short option '{}' must be an ASCII letter or digit", short.escape_default()))
    }
}

unsafe fn optional_text(ptr: *const std::os::raw::c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

/// Options contributed by one plugin (or by the host), under one name.
#[derive(Debug)]
pub struct OptionGroup<'a> {
    name: String,
    description: String,
    options: Vec<OptionBinding<'a>>,
}

impl<'a> OptionGroup<'a> {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
        }
    }

    pub fn option(mut self, binding: OptionBinding<'a>) -> Self {
        self.options.push(binding);
        self
    }

    /// Reads a sentinel-terminated option table.
    ///
    /// # Safety
    /// `table` must point to a valid `OptionEntry` array terminated by an
    /// entry with a null name, and every target must point to a live value of
    /// the type its `arg` declares, valid and unaliased for `'a`.
    pub(crate) unsafe fn from_raw_table(
        name: String,
        description: String,
        table: *const OptionEntry,
    ) -> Result<Self, MergeError> {
        let mut group = OptionGroup::new(name, description);
        let mut cursor = table;
        let mut index = 0;

        while !(*cursor).is_sentinel() {
            let binding = group
                .binding_from_entry(&*cursor)
                .map_err(|reason| MergeError::InvalidOption {
                    group: group.name.clone(),
                    index,
                    reason,
                })?;
            group.options.push(binding);
            cursor = cursor.add(1);
            index += 1;
        }

        Ok(group)
    }

    unsafe fn binding_from_entry(&self, entry: &OptionEntry) -> Result<OptionBinding<'a>, String> {
        let long = CStr::from_ptr(entry.name)
            .to_str()
            .map_err(|_| "option name is not valid UTF-8".to_string())?
            .to_string();
        validate_long(&long)?;

        let arg = OptionArg::try_from(entry.arg)
            .map_err(|raw| format!("option '{}' has unknown argument type {}", long, raw))?;

        let target = match (arg, NonNull::new(entry.target)) {
            (_, None) => return Err(format!("option '{}' has a null target", long)),
            (OptionArg::None | OptionArg::Bool, Some(p)) => SlotTarget::Bool(p.cast()),
            (OptionArg::Int, Some(p)) => SlotTarget::Int(p.cast()),
            (OptionArg::Double, Some(p)) => SlotTarget::Double(p.cast()),
            (OptionArg::String, Some(p)) => SlotTarget::PluginString(p.cast()),
        };

        let short = match entry.short_name {
            0 => None,
            raw => {
                let short = char::from(raw as u8);
                validate_short(short)?;
                Some(short)
            }
        };

        let mut binding = OptionBinding::new(long, arg, target);
        binding.short = short;
        binding.description = optional_text(entry.description);
        binding.arg_description = optional_text(entry.arg_description);
        Ok(binding)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> &[OptionBinding<'a>] {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut [OptionBinding<'a>] {
        &mut self.options
    }

    pub fn find(&self, long: &str) -> Option<&OptionBinding<'a>> {
        self.options.iter().find(|b| b.long == long)
    }

    pub fn find_mut(&mut self, long: &str) -> Option<&mut OptionBinding<'a>> {
        self.options.iter_mut().find(|b| b.long == long)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// The merged, ordered set of option groups.
///
/// Group order is insertion order, which for plugins is load order. It
/// decides the order of help sections and is stable across runs.
#[derive(Debug, Default)]
pub struct OptionSchema<'a> {
    groups: Vec<OptionGroup<'a>>,
}

impl<'a> OptionSchema<'a> {
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Appends a group after checking it against everything already merged.
    ///
    /// Long and short names share one namespace across all groups, because
    /// the command line has no group prefix; a collision is reported instead
    /// of letting one group silently shadow another.
    pub fn add_group(&mut self, group: OptionGroup<'a>) -> Result<(), MergeError> {
        if self.group(&group.name).is_some() {
            return Err(MergeError::DuplicateGroup { group: group.name });
        }

        for (i, binding) in group.options.iter().enumerate() {
            validate_long(&binding.long).map_err(|reason| MergeError::InvalidOption {
                group: group.name.clone(),
                index: i,
                reason,
            })?;
            if RESERVED_LONG.contains(&binding.long.as_str()) {
                return Err(MergeError::ReservedOption {
                    option: format!("--{}", binding.long),
                    group: group.name.clone(),
                });
            }
            if let Some(short) = binding.short {
                validate_short(short).map_err(|reason| MergeError::InvalidOption {
                    group: group.name.clone(),
                    index: i,
                    reason,
                })?;
                if RESERVED_SHORT.contains(&short) {
                    return Err(MergeError::ReservedOption {
                        option: format!("-{}", short),
                        group: group.name.clone(),
                    });
                }
            }

            let earlier_long = group.options[..i].iter().any(|b| b.long == binding.long);
            if let Some(owner) = self.owner_of_long(&binding.long).or(earlier_long.then_some(group.name.as_str())) {
                return Err(MergeError::DuplicateOption {
                    option: binding.long.clone(),
                    first_group: owner.to_string(),
                    second_group: group.name.clone(),
                });
            }

            if let Some(short) = binding.short {
                let earlier_short = group.options[..i].iter().any(|b| b.short == Some(short));
                if let Some(owner) = self.owner_of_short(short).or(earlier_short.then_some(group.name.as_str())) {
                    return Err(MergeError::DuplicateShortOption {
                        short,
                        first_group: owner.to_string(),
                        second_group: group.name.clone(),
                    });
                }
            }
        }

        self.groups.push(group);
        Ok(())
    }

    fn owner_of_long(&self, long: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.find(long).is_some())
            .map(|g| g.name.as_str())
    }

    fn owner_of_short(&self, short: char) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.options.iter().any(|b| b.short == Some(short)))
            .map(|g| g.name.as_str())
    }

    pub fn groups(&self) -> &[OptionGroup<'a>] {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> &mut [OptionGroup<'a>] {
        &mut self.groups
    }

    pub fn group(&self, name: &str) -> Option<&OptionGroup<'a>> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut OptionGroup<'a>> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    pub fn find_long(&self, long: &str) -> Option<&OptionBinding<'a>> {
        self.groups.iter().find_map(|g| g.find(long))
    }

    pub fn find_short(&self, short: char) -> Option<&OptionBinding<'a>> {
        self.groups
            .iter()
            .flat_map(|g| g.options.iter())
            .find(|b| b.short == Some(short))
    }

    /// Total number of options across all groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(OptionGroup::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds option schemas out of initialized plugins.
pub struct OptionRegistry;

impl OptionRegistry {
    /// Collects one group per initialized plugin, in iteration order.
    pub fn merge<'a, I>(plugins: I) -> Result<OptionSchema<'a>, MergeError>
    where
        I: IntoIterator<Item = &'a mut Plugin>,
    {
        let mut schema = OptionSchema::new();
        Self::merge_into(&mut schema, plugins)?;
        Ok(schema)
    }

    /// Like [`merge`](Self::merge), appending after groups already in `schema`
    /// (typically the host's own options).
    pub fn merge_into<'a, I>(schema: &mut OptionSchema<'a>, plugins: I) -> Result<(), MergeError>
    where
        I: IntoIterator<Item = &'a mut Plugin>,
    {
        for plugin in plugins {
            if plugin.state() != PluginState::Initialized {
                continue;
            }
            schema.add_group(plugin.option_group()?)?;
        }
        Ok(())
    }
}
