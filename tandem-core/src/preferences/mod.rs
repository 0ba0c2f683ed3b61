//! User Preferences
//!
//! Resolves the preferences an editor instance should actually use from the
//! user's persisted record, per-instance overrides, the environment's
//! light/dark setting, and configured defaults.

mod environment;
mod record;
mod resolver;

pub use environment::{
    ColorSchemeSource, EnvironmentSubscription, ListenerId, ManualColorScheme, SchemeListener,
};
pub use record::{
    ColorScheme, DefaultPreferences, EffectivePreferences, InstanceOverrides, SystemColorScheme,
    UserPreferences, UserPreferencesPatch,
};
pub use resolver::{Preferences, ResolvedFields};
