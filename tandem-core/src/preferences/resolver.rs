//! Preference Resolution
//!
//! Every effective preference field is its own derived value with its own
//! fallback chain:
//!
//! 1. the per-instance override (only for the instance-scoped flags)
//! 2. the user's persisted record
//! 3. the environment's light/dark setting (only for dark mode)
//! 4. the configured default
//!
//! The aggregate snapshot is a derived value over the individual fields, so
//! a change to one source only re-evaluates the fields that read it.

use std::sync::Arc;

use tracing::debug;

use super::environment::{ColorSchemeSource, EnvironmentSubscription, SchemeListener};
use super::record::{
    ColorScheme, DefaultPreferences, EffectivePreferences, InstanceOverrides, SystemColorScheme,
    UserPreferences, UserPreferencesPatch,
};
use crate::config::PreferencesConfig;
use crate::reactive::{Derived, Runtime, Signal};

/// The derived value behind each effective field.
pub struct ResolvedFields {
    pub id: Derived<String>,
    pub name: Derived<String>,
    pub locale: Derived<String>,
    pub color: Derived<String>,
    pub animation_speed: Derived<f64>,
    pub edge_scroll_speed: Derived<f64>,
    pub is_snap_mode: Derived<bool>,
    pub color_scheme: Derived<Option<ColorScheme>>,
    pub is_dark_mode: Derived<bool>,
    pub is_wrap_mode: Derived<bool>,
    pub is_dynamic_resize_mode: Derived<bool>,
    pub is_paste_at_cursor_mode: Derived<bool>,
    pub is_tool_locked: Derived<bool>,
    pub is_grid_mode: Derived<bool>,
    pub is_focus_mode: Derived<bool>,
    pub is_debug_mode: Derived<bool>,
}

/// Field read straight from the user's record, with a default.
fn user_field<T, F>(runtime: &Runtime, user: &Signal<UserPreferences>, pick: F) -> Derived<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
    F: Fn(&UserPreferences) -> T + Send + Sync + 'static,
{
    let user = user.clone();
    Derived::new(runtime, move || user.with(&pick))
}

/// Instance-scoped flag: override, then record, then default.
fn instance_flag(
    runtime: &Runtime,
    instance: &Signal<InstanceOverrides>,
    user: &Signal<UserPreferences>,
    from_instance: fn(&InstanceOverrides) -> Option<bool>,
    from_user: fn(&UserPreferences) -> Option<bool>,
    fallback: bool,
) -> Derived<bool> {
    let (instance, user) = (instance.clone(), user.clone());
    Derived::new(runtime, move || {
        instance
            .with(from_instance)
            .or_else(|| user.with(from_user))
            .unwrap_or(fallback)
    })
}

impl ResolvedFields {
    fn new(
        runtime: &Runtime,
        user: &Signal<UserPreferences>,
        instance: &Signal<InstanceOverrides>,
        system: &Signal<SystemColorScheme>,
        config: &PreferencesConfig,
    ) -> Self {
        let defaults = Arc::new(config.defaults.clone());
        let d = |f: fn(&DefaultPreferences) -> String| {
            let defaults = Arc::clone(&defaults);
            move |value: &Option<String>| value.clone().unwrap_or_else(|| f(&defaults))
        };

        let name = d(|d| d.name.clone());
        let locale = d(|d| d.locale.clone());
        let color = d(|d| d.color.clone());

        let color_scheme = user_field(runtime, user, |p| p.color_scheme);
        let is_dark_mode = {
            let (color_scheme, system) = (color_scheme.clone(), system.clone());
            let infer = config.infer_dark_mode;
            Derived::new(runtime, move || {
                let system_is_dark = || system.get() == SystemColorScheme::Dark;
                match color_scheme.get() {
                    Some(ColorScheme::Dark) => true,
                    Some(ColorScheme::Light) => false,
                    Some(ColorScheme::System) => system_is_dark(),
                    None => infer && system_is_dark(),
                }
            })
        };

        let defaults = &config.defaults;
        let (animation_speed, edge_scroll_speed) = (defaults.animation_speed, defaults.edge_scroll_speed);
        let (snap, wrap, dynamic, paste) = (
            defaults.is_snap_mode,
            defaults.is_wrap_mode,
            defaults.is_dynamic_size_mode,
            defaults.is_paste_at_cursor_mode,
        );

        Self {
            id: user_field(runtime, user, |p| p.id.clone()),
            name: user_field(runtime, user, move |p| name(&p.name)),
            locale: user_field(runtime, user, move |p| locale(&p.locale)),
            color: user_field(runtime, user, move |p| color(&p.color)),
            animation_speed: user_field(runtime, user, move |p| {
                p.animation_speed.unwrap_or(animation_speed)
            }),
            edge_scroll_speed: user_field(runtime, user, move |p| {
                p.edge_scroll_speed.unwrap_or(edge_scroll_speed)
            }),
            is_snap_mode: user_field(runtime, user, move |p| p.is_snap_mode.unwrap_or(snap)),
            color_scheme,
            is_dark_mode,
            is_wrap_mode: user_field(runtime, user, move |p| p.is_wrap_mode.unwrap_or(wrap)),
            is_dynamic_resize_mode: user_field(runtime, user, move |p| {
                p.is_dynamic_size_mode.unwrap_or(dynamic)
            }),
            is_paste_at_cursor_mode: user_field(runtime, user, move |p| {
                p.is_paste_at_cursor_mode.unwrap_or(paste)
            }),
            is_tool_locked: instance_flag(
                runtime,
                instance,
                user,
                |i| i.is_tool_locked,
                |p| p.is_tool_locked,
                defaults.is_tool_locked,
            ),
            is_grid_mode: instance_flag(
                runtime,
                instance,
                user,
                |i| i.is_grid_mode,
                |p| p.is_grid_mode,
                defaults.is_grid_mode,
            ),
            is_focus_mode: instance_flag(
                runtime,
                instance,
                user,
                |i| i.is_focus_mode,
                |p| p.is_focus_mode,
                defaults.is_focus_mode,
            ),
            is_debug_mode: instance_flag(
                runtime,
                instance,
                user,
                |i| i.is_debug_mode,
                |p| p.is_debug_mode,
                defaults.is_debug_mode,
            ),
        }
    }

    fn snapshot(&self, runtime: &Runtime) -> Derived<EffectivePreferences> {
        let fields = self.clone_handles();
        Derived::new(runtime, move || EffectivePreferences {
            id: fields.id.get(),
            name: fields.name.get(),
            locale: fields.locale.get(),
            color: fields.color.get(),
            animation_speed: fields.animation_speed.get(),
            edge_scroll_speed: fields.edge_scroll_speed.get(),
            is_snap_mode: fields.is_snap_mode.get(),
            color_scheme: fields.color_scheme.get(),
            is_dark_mode: fields.is_dark_mode.get(),
            is_wrap_mode: fields.is_wrap_mode.get(),
            is_dynamic_resize_mode: fields.is_dynamic_resize_mode.get(),
            is_paste_at_cursor_mode: fields.is_paste_at_cursor_mode.get(),
            is_tool_locked: fields.is_tool_locked.get(),
            is_grid_mode: fields.is_grid_mode.get(),
            is_focus_mode: fields.is_focus_mode.get(),
            is_debug_mode: fields.is_debug_mode.get(),
        })
    }

    fn clone_handles(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            locale: self.locale.clone(),
            color: self.color.clone(),
            animation_speed: self.animation_speed.clone(),
            edge_scroll_speed: self.edge_scroll_speed.clone(),
            is_snap_mode: self.is_snap_mode.clone(),
            color_scheme: self.color_scheme.clone(),
            is_dark_mode: self.is_dark_mode.clone(),
            is_wrap_mode: self.is_wrap_mode.clone(),
            is_dynamic_resize_mode: self.is_dynamic_resize_mode.clone(),
            is_paste_at_cursor_mode: self.is_paste_at_cursor_mode.clone(),
            is_tool_locked: self.is_tool_locked.clone(),
            is_grid_mode: self.is_grid_mode.clone(),
            is_focus_mode: self.is_focus_mode.clone(),
            is_debug_mode: self.is_debug_mode.clone(),
        }
    }
}

/// Resolves a user's effective preferences for one editor instance.
pub struct Preferences {
    user: Signal<UserPreferences>,
    instance: Signal<InstanceOverrides>,
    system_color_scheme: Signal<SystemColorScheme>,
    fields: ResolvedFields,
    effective: Derived<EffectivePreferences>,
    // Dropped with the preferences, which unregisters the listener.
    environment: Option<EnvironmentSubscription>,
}

impl Preferences {
    /// Build the resolver over a persisted record and instance overrides.
    ///
    /// The system color scheme starts as light until an environment is
    /// attached or [`set_system_color_scheme`](Self::set_system_color_scheme)
    /// is called.
    pub fn new(
        runtime: &Runtime,
        user: Signal<UserPreferences>,
        instance: Signal<InstanceOverrides>,
        config: &PreferencesConfig,
    ) -> Self {
        let system_color_scheme = Signal::new(runtime, SystemColorScheme::default());
        let fields = ResolvedFields::new(runtime, &user, &instance, &system_color_scheme, config);
        let effective = fields.snapshot(runtime);

        Self {
            user,
            instance,
            system_color_scheme,
            fields,
            effective,
            environment: None,
        }
    }

    /// Follow the light/dark setting of `source` for as long as these
    /// preferences live.
    pub fn with_environment(mut self, source: Arc<dyn ColorSchemeSource>) -> Self {
        self.system_color_scheme.set(source.current());

        let signal = self.system_color_scheme.clone();
        let listener: SchemeListener = Arc::new(move |scheme| {
            debug!(?scheme, "system color scheme updated");
            signal.set(scheme);
        });
        self.environment = Some(EnvironmentSubscription::attach(source, listener));
        self
    }

    /// Merge `patch` into the persisted record with a single write.
    pub fn update_user_preferences(&self, patch: &UserPreferencesPatch) {
        self.user.update(|current| current.merged(patch));
    }

    pub fn set_system_color_scheme(&self, scheme: SystemColorScheme) {
        self.system_color_scheme.set(scheme);
    }

    /// Replace the per-instance overrides.
    pub fn set_instance_overrides(&self, overrides: InstanceOverrides) {
        self.instance.set(overrides);
    }

    /// The resolved snapshot.
    pub fn user_preferences(&self) -> EffectivePreferences {
        self.effective.get()
    }

    /// The derived value behind [`user_preferences`](Self::user_preferences).
    pub fn effective(&self) -> &Derived<EffectivePreferences> {
        &self.effective
    }

    /// The per-field derived values.
    pub fn fields(&self) -> &ResolvedFields {
        &self.fields
    }

    /// The persisted record as currently stored.
    pub fn record(&self) -> UserPreferences {
        self.user.get()
    }

    pub fn is_listening_to_environment(&self) -> bool {
        self.environment.is_some()
    }

    pub fn id(&self) -> String {
        self.fields.id.get()
    }

    pub fn name(&self) -> String {
        self.fields.name.get()
    }

    pub fn locale(&self) -> String {
        self.fields.locale.get()
    }

    pub fn color(&self) -> String {
        self.fields.color.get()
    }

    pub fn animation_speed(&self) -> f64 {
        self.fields.animation_speed.get()
    }

    /// The speed at which the canvas scrolls when dragging toward an edge.
    pub fn edge_scroll_speed(&self) -> f64 {
        self.fields.edge_scroll_speed.get()
    }

    pub fn is_snap_mode(&self) -> bool {
        self.fields.is_snap_mode.get()
    }

    pub fn color_scheme(&self) -> Option<ColorScheme> {
        self.fields.color_scheme.get()
    }

    pub fn is_dark_mode(&self) -> bool {
        self.fields.is_dark_mode.get()
    }

    pub fn is_wrap_mode(&self) -> bool {
        self.fields.is_wrap_mode.get()
    }

    pub fn is_dynamic_resize_mode(&self) -> bool {
        self.fields.is_dynamic_resize_mode.get()
    }

    pub fn is_paste_at_cursor_mode(&self) -> bool {
        self.fields.is_paste_at_cursor_mode.get()
    }

    pub fn is_tool_locked(&self) -> bool {
        self.fields.is_tool_locked.get()
    }

    pub fn is_grid_mode(&self) -> bool {
        self.fields.is_grid_mode.get()
    }

    pub fn is_focus_mode(&self) -> bool {
        self.fields.is_focus_mode.get()
    }

    pub fn is_debug_mode(&self) -> bool {
        self.fields.is_debug_mode.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::ManualColorScheme;

    fn resolver(config: &PreferencesConfig) -> (Runtime, Signal<UserPreferences>, Preferences) {
        let runtime = Runtime::new();
        let user = Signal::new(&runtime, UserPreferences::with_id("user-1"));
        let instance = Signal::new(&runtime, InstanceOverrides::default());
        let preferences = Preferences::new(&runtime, user.clone(), instance, config);
        (runtime, user, preferences)
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let (_runtime, _user, preferences) = resolver(&PreferencesConfig::default());

        let effective = preferences.user_preferences();
        assert_eq!(effective.id, "user-1");
        assert_eq!(effective.name, "New User");
        assert_eq!(effective.locale, "en");
        assert_eq!(effective.animation_speed, 1.0);
        assert!(!effective.is_dark_mode);
        assert_eq!(effective.color_scheme, None);
    }

    #[test]
    fn dark_mode_follows_the_color_scheme_rules() {
        let (_runtime, _user, preferences) = resolver(&PreferencesConfig::default());
        preferences.set_system_color_scheme(SystemColorScheme::Dark);

        assert!(!preferences.is_dark_mode());

        for (scheme, expected) in [
            (ColorScheme::Dark, true),
            (ColorScheme::Light, false),
            (ColorScheme::System, true),
        ] {
            preferences.update_user_preferences(&UserPreferencesPatch {
                color_scheme: Some(Some(scheme)),
                ..UserPreferencesPatch::default()
            });
            assert_eq!(preferences.is_dark_mode(), expected, "{scheme:?}");
        }
    }

    #[test]
    fn inference_flag_treats_missing_scheme_as_system() {
        let config = PreferencesConfig {
            infer_dark_mode: true,
            ..PreferencesConfig::default()
        };
        let (_runtime, _user, preferences) = resolver(&config);

        assert!(!preferences.is_dark_mode());
        preferences.set_system_color_scheme(SystemColorScheme::Dark);
        assert!(preferences.is_dark_mode());
    }

    #[test]
    fn instance_override_wins_over_record() {
        let (_runtime, user, preferences) = resolver(&PreferencesConfig::default());
        user.update(|p| UserPreferences {
            is_tool_locked: Some(true),
            ..p.clone()
        });
        assert!(preferences.is_tool_locked());

        preferences.set_instance_overrides(InstanceOverrides {
            is_tool_locked: Some(false),
            ..InstanceOverrides::default()
        });
        assert!(!preferences.is_tool_locked());
    }

    #[test]
    fn environment_subscription_lives_with_preferences() {
        let source = Arc::new(ManualColorScheme::new(SystemColorScheme::Dark));
        let (_runtime, _user, preferences) = resolver(&PreferencesConfig::default());
        let preferences = preferences.with_environment(source.clone());
        preferences.update_user_preferences(&UserPreferencesPatch {
            color_scheme: Some(Some(ColorScheme::System)),
            ..UserPreferencesPatch::default()
        });

        assert!(preferences.is_listening_to_environment());
        assert!(preferences.is_dark_mode());

        source.set(SystemColorScheme::Light);
        assert!(!preferences.is_dark_mode());

        drop(preferences);
        assert_eq!(source.listener_count(), 0);
    }
}
