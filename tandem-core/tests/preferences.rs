//! Integration Tests for Preference Resolution

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tandem_core::config::{Config, PreferencesConfig};
use tandem_core::preferences::{
    ColorScheme, InstanceOverrides, ManualColorScheme, Preferences, SystemColorScheme,
    UserPreferences, UserPreferencesPatch,
};
use tandem_core::reactive::{Runtime, Signal, Subscriber};

fn resolver(record: UserPreferences, config: &PreferencesConfig) -> (Runtime, Preferences) {
    let runtime = Runtime::new();
    let user = Signal::new(&runtime, record);
    let instance = Signal::new(&runtime, InstanceOverrides::default());
    let preferences = Preferences::new(&runtime, user, instance, config);
    (runtime, preferences)
}

/// Test the default and persisted links of the name chain.
#[test]
fn name_falls_back_to_default() {
    let (_runtime, empty) = resolver(UserPreferences::with_id("u"), &PreferencesConfig::default());
    assert_eq!(empty.name(), "New User");

    let mut record = UserPreferences::with_id("u");
    record.name = Some("Ada".to_owned());
    let (_runtime, named) = resolver(record, &PreferencesConfig::default());
    assert_eq!(named.name(), "Ada");
}

/// Test that flipping the environment scheme only re-evaluates dark mode and
/// the aggregate snapshot.
#[test]
fn system_flip_only_recomputes_dark_mode() {
    let source = Arc::new(ManualColorScheme::new(SystemColorScheme::Dark));
    let mut record = UserPreferences::with_id("u");
    record.color_scheme = Some(ColorScheme::System);
    let (_runtime, preferences) = resolver(record, &PreferencesConfig::default());
    let preferences = preferences.with_environment(source.clone());

    let before = preferences.user_preferences();
    assert!(before.is_dark_mode);

    let fields = preferences.fields();
    let counts = || {
        [
            fields.id.compute_count(),
            fields.name.compute_count(),
            fields.locale.compute_count(),
            fields.color.compute_count(),
            fields.animation_speed.compute_count(),
            fields.color_scheme.compute_count(),
            fields.is_snap_mode.compute_count(),
            fields.is_tool_locked.compute_count(),
        ]
    };
    let others_before = counts();
    let dark_before = fields.is_dark_mode.compute_count();

    source.set(SystemColorScheme::Light);
    let after = preferences.user_preferences();

    assert!(!after.is_dark_mode);
    assert_eq!(after.name, before.name);
    assert_eq!(counts(), others_before);
    assert_eq!(fields.is_dark_mode.compute_count(), dark_before + 1);
}

/// Test that a patch touching several fields reaches subscribers as one
/// consistent record.
#[test]
fn patch_is_observed_as_one_write() {
    let (runtime, preferences) =
        resolver(UserPreferences::with_id("u"), &PreferencesConfig::default());
    let effective = preferences.effective().clone();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let _subscription = Subscriber::register(
        &runtime,
        move || effective.get(),
        move |snapshot| {
            seen_clone
                .lock()
                .unwrap()
                .push((snapshot.name.clone(), snapshot.locale.clone()));
        },
    );

    preferences.update_user_preferences(&UserPreferencesPatch {
        name: Some(Some("Grace".to_owned())),
        locale: Some(Some("de".to_owned())),
        ..UserPreferencesPatch::default()
    });

    assert_eq!(
        *seen.lock().unwrap(),
        vec![("Grace".to_owned(), "de".to_owned())]
    );
    assert_eq!(preferences.record().name.as_deref(), Some("Grace"));
}

/// Test that an empty patch changes nothing and wakes no one.
#[test]
fn empty_patch_is_not_a_change() {
    let (runtime, preferences) =
        resolver(UserPreferences::with_id("u"), &PreferencesConfig::default());
    let effective = preferences.effective().clone();

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let _subscription = Subscriber::register(
        &runtime,
        move || effective.get(),
        move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        },
    );

    preferences.update_user_preferences(&UserPreferencesPatch::default());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Test that configured defaults and inference apply end to end.
#[test]
fn configuration_drives_defaults() {
    let config = Config::from_json_str(
        r#"{"preferences": {"infer_dark_mode": true, "defaults": {"name": "Guest", "locale": "fr"}}}"#,
    )
    .unwrap();
    let (_runtime, preferences) = resolver(UserPreferences::with_id("u"), &config.preferences);
    preferences.set_system_color_scheme(SystemColorScheme::Dark);

    let effective = preferences.user_preferences();
    assert_eq!(effective.name, "Guest");
    assert_eq!(effective.locale, "fr");
    assert_eq!(effective.color, "#FF802B");
    assert!(effective.is_dark_mode);
}

/// Test that a `null` in a patch clears the stored choice so inference
/// applies again.
#[test]
fn null_patch_restores_inferred_dark_mode() {
    let config = PreferencesConfig {
        infer_dark_mode: true,
        ..PreferencesConfig::default()
    };
    let (_runtime, preferences) = resolver(UserPreferences::with_id("u"), &config);
    preferences.set_system_color_scheme(SystemColorScheme::Dark);

    preferences.update_user_preferences(&UserPreferencesPatch {
        color_scheme: Some(Some(ColorScheme::Light)),
        ..UserPreferencesPatch::default()
    });
    assert!(!preferences.is_dark_mode());

    let clear: UserPreferencesPatch = serde_json::from_value(json!({"colorScheme": null})).unwrap();
    preferences.update_user_preferences(&clear);

    assert_eq!(preferences.color_scheme(), None);
    assert!(preferences.is_dark_mode());
    assert_eq!(preferences.record().color_scheme, None);
}

/// Test the snapshot's wire shape.
#[test]
fn effective_preferences_serialize_in_camel_case() {
    let mut record = UserPreferences::with_id("u");
    record.is_dynamic_size_mode = Some(true);
    let (_runtime, preferences) = resolver(record, &PreferencesConfig::default());

    let value = serde_json::to_value(preferences.user_preferences()).unwrap();
    assert_eq!(value["isDynamicResizeMode"], json!(true));
    assert_eq!(value["colorScheme"], json!(null));
    assert_eq!(value["edgeScrollSpeed"], json!(1.0));
}
