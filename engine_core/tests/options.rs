use std::ptr::NonNull;
use std::sync::Arc;

use engine_core::{
    ApplyError, ConfigParser, ErrorDomain, HostConfig, LoadPolicy, MergeError, OptionBinding, OptionGroup,
    OptionSchema, ParseErrorKind, Plugin, PluginLoader, PluginRegistry, StaticModuleLoader,
};
use logger::NullLogger;
use plugin_core::{config_ref, OptionSpec, PluginDescriptor, PluginOptions, StringSlot};
use plugin_demo::DemoConfig;

#[derive(Default)]
struct FooConfig {
    foo: StringSlot,
}

impl PluginOptions for FooConfig {
    fn options(&mut self) -> Vec<OptionSpec<'_>> {
        vec![OptionSpec::string(c"foo", &mut self.foo).description(c"foo value")]
    }
}

static FOO_A: PluginDescriptor = PluginDescriptor::of::<FooConfig>(c"First foo plugin");
static FOO_B: PluginDescriptor = PluginDescriptor::of::<FooConfig>(c"Second foo plugin");

extern "C" fn foo_a_entry() -> *const PluginDescriptor {
    &FOO_A
}

extern "C" fn foo_b_entry() -> *const PluginDescriptor {
    &FOO_B
}

fn registry(modules: StaticModuleLoader, names: &[&str]) -> PluginRegistry {
    let mut registry = PluginRegistry::new(PluginLoader::new(modules, Arc::new(NullLogger)));
    registry.load_all(names, LoadPolicy::Abort).unwrap();
    registry.init_all().unwrap();
    registry
}

fn config<T: PluginOptions>(plugin: &Plugin) -> &T {
    let handle: NonNull<_> = plugin.config_handle().unwrap();
    unsafe { config_ref::<T>(handle) }
}

#[test]
fn string_option_is_written_into_the_plugin_config() {
    let mut registry = registry(StaticModuleLoader::new().with("foo", foo_a_entry), &["foo"]);
    {
        let mut schema = registry.option_schema().unwrap();
        let outcome = ConfigParser::new("prog").parse(&mut schema, ["prog", "--foo=123"]).unwrap();
        assert!(outcome.remaining.is_empty());
    }
    let foo = config::<FooConfig>(registry.get("foo").unwrap());
    assert_eq!(foo.foo.get(), Some("123"));
}

#[test]
fn unknown_prefix_fails_and_leaves_the_config_unset() {
    let mut registry = registry(StaticModuleLoader::new().with("foo", foo_a_entry), &["foo"]);
    let err = {
        let mut schema = registry.option_schema().unwrap();
        ConfigParser::new("prog").parse(&mut schema, ["prog", "--fo"]).unwrap_err()
    };
    assert_eq!(err.domain, ErrorDomain::Option);
    assert_eq!(err.kind, ParseErrorKind::UnknownOption);
    assert_eq!(err.token.as_deref(), Some("--fo"));

    let foo = config::<FooConfig>(registry.get("foo").unwrap());
    assert!(!foo.foo.is_set());
}

#[test]
fn duplicate_option_across_plugins_is_rejected() {
    let modules = StaticModuleLoader::new().with("foo_a", foo_a_entry).with("foo_b", foo_b_entry);
    let mut registry = registry(modules, &["foo_a", "foo_b"]);
    let err = registry.option_schema().err().unwrap();
    assert_eq!(
        err,
        MergeError::DuplicateOption {
            option: "foo".to_string(),
            first_group: "foo_a".to_string(),
            second_group: "foo_b".to_string(),
        }
    );
}

#[test]
fn lifecycle_runs_without_a_parse() {
    let mut registry = registry(StaticModuleLoader::new().with("foo", foo_a_entry), &["foo"]);
    {
        let schema = registry.option_schema().unwrap();
        let group = schema.group("foo").unwrap();
        assert_eq!(group.description(), "First foo plugin");
        assert_eq!(group.len(), 1);
    }
    registry.apply_all().unwrap();
    registry.shutdown();
    assert!(registry.is_empty());
}

#[test]
fn host_options_conflicting_with_a_plugin_are_rejected() {
    let mut registry = registry(StaticModuleLoader::new().with("foo", foo_a_entry), &["foo"]);
    let mut host_foo = None;
    let mut schema = OptionSchema::new();
    schema
        .add_group(OptionGroup::new("host", "Host options").option(OptionBinding::string("foo", &mut host_foo)))
        .unwrap();
    let err = registry.extend_schema(&mut schema).unwrap_err();
    assert!(matches!(err, MergeError::DuplicateOption { .. }));
}

fn demo_registry() -> PluginRegistry {
    registry(
        StaticModuleLoader::new().with("plugin_demo", plugin_demo::create_plugin),
        &["plugin_demo"],
    )
}

#[test]
fn demo_plugin_accepts_every_option_kind() {
    let mut registry = demo_registry();
    {
        let mut schema = registry.option_schema().unwrap();
        ConfigParser::new("prog")
            .parse(
                &mut schema,
                [
                    "prog",
                    "-g",
                    "hi",
                    "--demo-repeat",
                    "2",
                    "--demo-shout",
                    "--demo-enabled=yes",
                    "--demo-ratio=0.25",
                ],
            )
            .unwrap();
    }
    registry.apply_all().unwrap();

    let demo = config::<DemoConfig>(registry.get("plugin_demo").unwrap());
    assert_eq!(demo.greeting.get(), Some("hi"));
    assert_eq!(demo.repeat, 2);
    assert!(demo.shout);
    assert!(demo.enabled);
    assert_eq!(demo.ratio, 0.25);
    assert_eq!(demo.render(), vec!["HI".to_string(), "HI".to_string()]);
}

#[test]
fn demo_plugin_rejects_a_negative_repeat() {
    let mut registry = demo_registry();
    {
        let mut schema = registry.option_schema().unwrap();
        ConfigParser::new("prog").parse(&mut schema, ["prog", "--demo-repeat=-3"]).unwrap();
    }
    assert_eq!(
        registry.apply_all(),
        Err(ApplyError::Rejected {
            plugin: "plugin_demo".to_string(),
            code: plugin_demo::ERR_NEGATIVE_REPEAT,
        })
    );
}

#[test]
fn bad_value_leaves_defaults_in_place() {
    let mut registry = demo_registry();
    let err = {
        let mut schema = registry.option_schema().unwrap();
        ConfigParser::new("prog")
            .parse(&mut schema, ["prog", "-g", "hi", "--demo-repeat=many"])
            .unwrap_err()
    };
    assert_eq!(err.kind, ParseErrorKind::BadValue);

    let demo = config::<DemoConfig>(registry.get("plugin_demo").unwrap());
    assert!(!demo.greeting.is_set());
    assert_eq!(demo.repeat, 1);
}

#[test]
fn help_shows_the_plugin_group() {
    let mut registry = demo_registry();
    let mut schema = registry.option_schema().unwrap();
    let err = ConfigParser::new("prog").parse(&mut schema, ["prog", "--help"]).unwrap_err();
    assert!(err.is_help());
    assert!(err.message.contains("Demo plugin options"));
    assert!(err.message.contains("--demo-greeting"));
    assert!(err.message.contains("How many times to print the greeting"));
}

#[test]
fn config_file_values_are_overridden_by_the_command_line() {
    let host_config = HostConfig::from_toml(
        r#"
        [host]
        plugins = ["plugin_demo"]

        [options.plugin_demo]
        demo-greeting = "from file"
        demo-repeat = 4
        "#,
    )
    .unwrap();

    let mut registry = demo_registry();
    {
        let parser = ConfigParser::new("prog");
        let mut schema = registry.option_schema().unwrap();
        parser.apply_table(&mut schema, &host_config.options).unwrap();
        parser.parse(&mut schema, ["prog", "--demo-repeat", "5"]).unwrap();
    }

    let demo = config::<DemoConfig>(registry.get("plugin_demo").unwrap());
    assert_eq!(demo.greeting.get(), Some("from file"));
    assert_eq!(demo.repeat, 5);
}
