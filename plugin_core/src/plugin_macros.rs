/// Declares the plugin entry point for a config type implementing
/// [`PluginOptions`](crate::PluginOptions).
///
/// ```ignore
/// plugin_core::declare_plugin!(MyConfig, c"my plugin");
/// ```
///
/// Expands to a static [`PluginDescriptor`](crate::PluginDescriptor) and an
/// exported `create_plugin` symbol returning a pointer to it. Use it once per
/// cdylib crate.
#[macro_export]
macro_rules! declare_plugin {
    ($config:ty, $description:expr) => {
        static PLUGIN_DESCRIPTOR: $crate::PluginDescriptor =
            $crate::PluginDescriptor::of::<$config>($description);

        #[no_mangle]
        pub extern "C" fn create_plugin() -> *const $crate::PluginDescriptor {
            &PLUGIN_DESCRIPTOR
        }
    };
}
