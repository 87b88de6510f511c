use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use engine_core::{
    ContractViolation, LibraryLoader, LifecycleError, LoadError, LoadPolicy, PluginLoader, PluginRegistry,
    PluginState, StaticModuleLoader,
};
use logger::{LogLevel, LogWriter, Logger, MemoryLogDestination, NullLogger};
use plugin_core::{OptionSpec, PluginDescriptor, PluginEntry, PluginOptions};

const SLOTS: usize = 8;
#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicUsize = AtomicUsize::new(0);

static INITS: [AtomicUsize; SLOTS] = [ZERO; SLOTS];
static DESTROYS: [AtomicUsize; SLOTS] = [ZERO; SLOTS];
static EVENTS: Mutex<Vec<(usize, &'static str)>> = Mutex::new(Vec::new());

/// Config type that records its creation and release. Each test uses its own
/// `ID` so counters are not shared between tests running in parallel.
struct Counted<const ID: usize>;

impl<const ID: usize> Default for Counted<ID> {
    fn default() -> Self {
        INITS[ID].fetch_add(1, Ordering::SeqCst);
        EVENTS.lock().unwrap().push((ID, "init"));
        Counted
    }
}

impl<const ID: usize> Drop for Counted<ID> {
    fn drop(&mut self) {
        DESTROYS[ID].fetch_add(1, Ordering::SeqCst);
        EVENTS.lock().unwrap().push((ID, "destroy"));
    }
}

impl<const ID: usize> PluginOptions for Counted<ID> {
    fn options(&mut self) -> Vec<OptionSpec<'_>> {
        Vec::new()
    }
}

macro_rules! counted_entry {
    ($id:literal) => {{
        extern "C" fn entry() -> *const PluginDescriptor {
            static DESCRIPTOR: PluginDescriptor = PluginDescriptor::of::<Counted<$id>>(c"counted plugin");
            &DESCRIPTOR
        }
        entry as PluginEntry
    }};
}

fn counts(id: usize) -> (usize, usize) {
    (INITS[id].load(Ordering::SeqCst), DESTROYS[id].load(Ordering::SeqCst))
}

fn events(ids: &[usize]) -> Vec<(usize, &'static str)> {
    EVENTS
        .lock()
        .unwrap()
        .iter()
        .copied()
        .filter(|(id, _)| ids.contains(id))
        .collect()
}

fn quiet_loader(modules: StaticModuleLoader) -> PluginLoader {
    PluginLoader::new(modules, Arc::new(NullLogger))
}

#[derive(Default)]
struct Plain;

impl PluginOptions for Plain {
    fn options(&mut self) -> Vec<OptionSpec<'_>> {
        Vec::new()
    }
}

static PLAIN: PluginDescriptor = PluginDescriptor::of::<Plain>(c"plain plugin");
static FAIL_NEXT_INIT: AtomicBool = AtomicBool::new(true);

extern "C" fn flaky_init() -> *mut plugin_core::PluginConfigHandle {
    if FAIL_NEXT_INIT.swap(false, Ordering::SeqCst) {
        return std::ptr::null_mut();
    }
    match PLAIN.init {
        Some(init) => init(),
        None => std::ptr::null_mut(),
    }
}

static FLAKY: PluginDescriptor = PluginDescriptor {
    init: Some(flaky_init),
    ..PluginDescriptor::of::<Plain>(c"flaky plugin")
};

extern "C" fn flaky_entry() -> *const PluginDescriptor {
    &FLAKY
}

static NO_DESTROY: PluginDescriptor = PluginDescriptor {
    destroy: None,
    ..PluginDescriptor::of::<Plain>(c"broken plugin")
};

extern "C" fn no_destroy_entry() -> *const PluginDescriptor {
    &NO_DESTROY
}

extern "C" fn null_entry() -> *const PluginDescriptor {
    std::ptr::null()
}

#[test]
fn destroy_runs_exactly_once_per_init() {
    let loader = quiet_loader(StaticModuleLoader::new().with("counted", counted_entry!(0)));
    let mut plugin = loader.load("counted").unwrap();
    assert_eq!(plugin.state(), PluginState::Loaded);
    assert_eq!(counts(0), (0, 0));

    plugin.init().unwrap();
    assert_eq!(plugin.state(), PluginState::Initialized);
    assert_eq!(counts(0), (1, 0));

    plugin.destroy().unwrap();
    assert_eq!(plugin.state(), PluginState::Destroyed);
    assert_eq!(counts(0), (1, 1));

    let err = plugin.destroy().unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidState { state: PluginState::Destroyed, .. }));
    loader.unload(plugin);
    assert_eq!(counts(0), (1, 1));
}

#[test]
fn init_twice_is_rejected() {
    let loader = quiet_loader(StaticModuleLoader::new().with("counted", counted_entry!(1)));
    let mut plugin = loader.load("counted").unwrap();
    plugin.init().unwrap();
    assert_eq!(
        plugin.init(),
        Err(LifecycleError::InvalidState {
            plugin: "counted".to_string(),
            state: PluginState::Initialized,
            operation: "init",
        })
    );
    drop(plugin);
    assert_eq!(counts(1), (1, 1));
}

#[test]
fn load_then_unload_without_init_creates_no_config() {
    let loader = quiet_loader(StaticModuleLoader::new().with("counted", counted_entry!(2)));
    let plugin = loader.load("counted").unwrap();
    loader.unload(plugin);
    assert_eq!(counts(2), (0, 0));
}

#[test]
fn unload_destroys_an_initialized_plugin_and_warns() {
    let memory = Arc::new(MemoryLogDestination::new());
    let logger: Arc<dyn Logger> = Arc::new(LogWriter::new(LogLevel::Trace, memory.clone()));
    let loader = PluginLoader::new(StaticModuleLoader::new().with("counted", counted_entry!(3)), logger);

    let mut plugin = loader.load("counted").unwrap();
    plugin.init().unwrap();
    loader.unload(plugin);
    assert_eq!(counts(3), (1, 1));
    assert!(memory.contains("unloaded while initialized"));
}

#[test]
fn registry_tears_down_in_reverse_order() {
    let modules = StaticModuleLoader::new()
        .with("first", counted_entry!(4))
        .with("second", counted_entry!(5))
        .with("third", counted_entry!(6));
    let mut registry = PluginRegistry::new(quiet_loader(modules));
    registry.load_all(["first", "second", "third"], LoadPolicy::Abort).unwrap();
    assert_eq!(registry.names(), vec!["first", "second", "third"]);

    registry.init_all().unwrap();
    registry.apply_all().unwrap();
    registry.shutdown();
    assert!(registry.is_empty());

    assert_eq!(
        events(&[4, 5, 6]),
        vec![
            (4, "init"),
            (5, "init"),
            (6, "init"),
            (6, "destroy"),
            (5, "destroy"),
            (4, "destroy"),
        ]
    );

    // Already shut down: nothing left to destroy.
    registry.shutdown();
    drop(registry);
    for id in 4..=6 {
        assert_eq!(counts(id), (1, 1));
    }
}

#[test]
fn dropping_the_registry_destroys_plugins() {
    let mut registry = PluginRegistry::new(quiet_loader(StaticModuleLoader::new().with("counted", counted_entry!(7))));
    registry.load("counted").unwrap();
    registry.init_all().unwrap();
    drop(registry);
    assert_eq!(counts(7), (1, 1));
}

#[test]
fn allocation_failure_leaves_the_plugin_loaded() {
    let loader = quiet_loader(StaticModuleLoader::new().with("flaky", flaky_entry));
    let mut plugin = loader.load("flaky").unwrap();
    assert_eq!(
        plugin.init(),
        Err(LifecycleError::AllocationFailed {
            plugin: "flaky".to_string()
        })
    );
    assert_eq!(plugin.state(), PluginState::Loaded);

    plugin.init().unwrap();
    assert_eq!(plugin.state(), PluginState::Initialized);
    assert_eq!(plugin.description(), Some("flaky plugin"));
}

#[test]
fn missing_slot_is_a_contract_violation() {
    let loader = quiet_loader(StaticModuleLoader::new().with("broken", no_destroy_entry));
    match loader.load("broken") {
        Err(LoadError::BadContract {
            name,
            reason: ContractViolation::MissingSlots(slots),
        }) => {
            assert_eq!(name, "broken");
            assert_eq!(slots, vec!["destroy"]);
        }
        other => panic!("unexpected result: {:?}", other.map(|p| p.name().to_string())),
    }
}

#[test]
fn null_descriptor_is_a_contract_violation() {
    let loader = quiet_loader(StaticModuleLoader::new().with("null", null_entry));
    assert!(matches!(
        loader.load("null"),
        Err(LoadError::BadContract {
            reason: ContractViolation::NullDescriptor,
            ..
        })
    ));
}

#[test]
fn missing_library_is_reported_through_the_injected_logger() {
    let dir = tempfile::tempdir().unwrap();
    let memory = Arc::new(MemoryLogDestination::new());
    let logger: Arc<dyn Logger> = Arc::new(LogWriter::new(LogLevel::Trace, memory.clone()));
    let loader = PluginLoader::new(LibraryLoader::new([dir.path()]), logger);

    match loader.load("non-existing") {
        Err(LoadError::NotFound { name, searched }) => {
            assert_eq!(name, "non-existing");
            assert!(!searched.is_empty());
        }
        other => panic!("unexpected result: {:?}", other.map(|p| p.name().to_string())),
    }
    assert!(memory.contains("non-existing"));
}

#[test]
fn missing_library_is_silent_with_a_null_logger() {
    let dir = tempfile::tempdir().unwrap();
    let loader = PluginLoader::new(LibraryLoader::new([dir.path()]), Arc::new(NullLogger));
    assert!(loader.load("non-existing").is_err());
}

#[test]
fn registry_rejects_or_skips_failed_loads() {
    let modules = StaticModuleLoader::new().with("plain", plain_entry);
    let mut registry = PluginRegistry::new(quiet_loader(modules));

    let skipped = registry
        .load_all(["plain", "non-existing"], LoadPolicy::SkipFailed)
        .unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].plugin_name(), "non-existing");
    assert_eq!(registry.len(), 1);

    assert!(matches!(registry.load("plain"), Err(LoadError::AlreadyLoaded { .. })));

    let err = registry.load_all(["non-existing"], LoadPolicy::Abort).unwrap_err();
    assert!(matches!(err, LoadError::NotFound { .. }));
    assert_eq!(registry.len(), 1);
}

extern "C" fn plain_entry() -> *const PluginDescriptor {
    &PLAIN
}
