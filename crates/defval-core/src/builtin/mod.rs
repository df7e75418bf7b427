//! Built-in plugin modules
//!
//! Rule documents refer to these as `builtin_checks.rs` and
//! `builtin_defaults.rs` (any recognized module suffix works).

pub mod checks;
pub mod defaults;

use crate::helper::PluginCatalog;

/// Class identifier of the built-in validator module
pub const CHECKS_CLASS: &str = "builtin_checks";

/// Class identifier of the built-in default-setter module
pub const DEFAULTS_CLASS: &str = "builtin_defaults";

/// Register every built-in module with `catalog`
pub fn register(catalog: &mut PluginCatalog) {
    catalog.register_factory(CHECKS_CLASS, checks::create);
    catalog.register_factory(DEFAULTS_CLASS, defaults::create);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let catalog = PluginCatalog::with_builtins();
        assert_eq!(catalog.class_ids(), vec![CHECKS_CLASS, DEFAULTS_CLASS]);
        assert!(catalog.instantiate(CHECKS_CLASS).is_ok());
        assert!(catalog.instantiate(DEFAULTS_CLASS).is_ok());
    }
}
