//! Import options passed opaquely to the import engine
//!
//! The options are fixed: every import restores all content categories, permissions
//! and portlet data, copies content as new and never deletes what the destination
//! already has.

use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Option names understood by the import engine
pub mod keys {
    pub const CATEGORIES: &str = "categories";
    pub const DELETE_MISSING_LAYOUTS: &str = "deleteMissingLayouts";
    pub const LAYOUT_SET_SETTINGS: &str = "layoutSetSettings";
    pub const THEME_REFERENCE: &str = "themeReference";
    pub const LOGO: &str = "logo";
    pub const PORTLET_CONFIGURATION_ALL: &str = "portletConfigurationAll";
    pub const PORTLET_SETUP_ALL: &str = "portletSetupAll";
    pub const PORTLET_ARCHIVED_SETUPS_ALL: &str = "portletArchivedSetupsAll";
    pub const PORTLET_USER_PREFERENCES_ALL: &str = "portletUserPreferencesAll";
    pub const PORTLET_DATA_ALL: &str = "portletDataAll";
    pub const DELETE_PORTLET_DATA: &str = "deletePortletData";
    pub const PERMISSIONS: &str = "permissions";
    pub const DATA_STRATEGY: &str = "dataStrategy";
    pub const USER_ID_STRATEGY: &str = "userIdStrategy";
}

pub const DATA_STRATEGY_COPY_AS_NEW: &str = "COPY_AS_NEW";
pub const USER_ID_STRATEGY_CURRENT_USER: &str = "CURRENT_USER";

/// Immutable option map: option name to string-encoded values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ImportOptions(BTreeMap<String, Vec<String>>);

impl ImportOptions {
    /// The full-fidelity option set used for every import
    pub fn build_default() -> Self {
        let mut builder = Builder::default();

        builder.flag(keys::CATEGORIES, true);

        // pages
        builder.flag(keys::DELETE_MISSING_LAYOUTS, false);
        builder.flag(keys::LAYOUT_SET_SETTINGS, true);
        builder.flag(keys::THEME_REFERENCE, true);
        builder.flag(keys::LOGO, true);

        // all applications
        builder.flag(keys::PORTLET_CONFIGURATION_ALL, true);
        builder.flag(keys::PORTLET_SETUP_ALL, true);
        builder.flag(keys::PORTLET_ARCHIVED_SETUPS_ALL, true);
        builder.flag(keys::PORTLET_USER_PREFERENCES_ALL, true);

        // all content
        builder.flag(keys::PORTLET_DATA_ALL, true);
        builder.flag(keys::DELETE_PORTLET_DATA, false);

        builder.flag(keys::PERMISSIONS, true);

        builder.value(keys::DATA_STRATEGY, DATA_STRATEGY_COPY_AS_NEW);
        builder.value(keys::USER_ID_STRATEGY, USER_ID_STRATEGY_CURRENT_USER);

        builder.finish()
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// First value of an option, the common case for single-valued flags
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.0
    }
}

/// Collects options; only `finish` produces an `ImportOptions`, so a partially
/// built set can never be handed out.
#[derive(Default)]
struct Builder {
    entries: BTreeMap<String, Vec<String>>,
}

impl Builder {
    fn flag(&mut self, key: &str, enabled: bool) {
        self.value(key, if enabled { "true" } else { "false" });
    }

    fn value(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), vec![value.to_string()]);
    }

    fn finish(self) -> ImportOptions {
        ImportOptions(self.entries)
    }
}
