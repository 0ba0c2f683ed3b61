//! Preference Records
//!
//! The persisted per-user record, the partial update applied to it, the
//! per-instance overrides, and the resolved snapshot handed to the UI.

use serde::{Deserialize, Deserializer, Serialize};

/// The user's chosen color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    Light,
    Dark,
    /// Follow the operating environment.
    System,
}

impl ColorScheme {
    /// Parse the persisted spelling. Unknown values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// The light/dark setting reported by the operating environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemColorScheme {
    #[default]
    Light,
    Dark,
}

// Records written by older or newer clients may carry values we don't know.
fn lenient_color_scheme<'de, D>(deserializer: D) -> Result<Option<ColorScheme>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ColorScheme::parse))
}

// A key that is present in a patch, even as `null`, is an instruction.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn present_color_scheme<'de, D>(deserializer: D) -> Result<Option<Option<ColorScheme>>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_color_scheme(deserializer).map(Some)
}

/// The persisted preference record. Every field but `id` may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPreferences {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_scroll_speed: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_color_scheme"
    )]
    pub color_scheme: Option<ColorScheme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_snap_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_wrap_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_dynamic_size_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_paste_at_cursor_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_tool_locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_grid_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_focus_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_debug_mode: Option<bool>,
}

impl UserPreferences {
    /// A record with only an id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Apply every field present in `patch` to a copy of this record.
    pub fn merged(&self, patch: &UserPreferencesPatch) -> Self {
        macro_rules! overlay {
            ($next:ident, $($field:ident),+ $(,)?) => {
                $(
                    if let Some(value) = &patch.$field {
                        $next.$field.clone_from(value);
                    }
                )+
            };
        }

        let mut next = self.clone();
        if let Some(id) = &patch.id {
            next.id.clone_from(id);
        }
        overlay!(
            next,
            name,
            locale,
            color,
            animation_speed,
            edge_scroll_speed,
            color_scheme,
            is_snap_mode,
            is_wrap_mode,
            is_dynamic_size_mode,
            is_paste_at_cursor_mode,
            is_tool_locked,
            is_grid_mode,
            is_focus_mode,
            is_debug_mode,
        );
        next
    }
}

/// A partial update to [`UserPreferences`].
///
/// Each field is tri-state: absent (`None`) leaves the record untouched,
/// `Some(None)` (JSON `null`) clears the field, and `Some(Some(value))`
/// overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPreferencesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub locale: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub color: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub animation_speed: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub edge_scroll_speed: Option<Option<f64>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_color_scheme"
    )]
    pub color_scheme: Option<Option<ColorScheme>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub is_snap_mode: Option<Option<bool>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub is_wrap_mode: Option<Option<bool>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub is_dynamic_size_mode: Option<Option<bool>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub is_paste_at_cursor_mode: Option<Option<bool>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub is_tool_locked: Option<Option<bool>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub is_grid_mode: Option<Option<bool>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub is_focus_mode: Option<Option<bool>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub is_debug_mode: Option<Option<bool>>,
}

/// Per editor instance overrides, consulted before the user's record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstanceOverrides {
    pub is_tool_locked: Option<bool>,
    pub is_grid_mode: Option<bool>,
    pub is_focus_mode: Option<bool>,
    pub is_debug_mode: Option<bool>,
}

/// Hard-coded defaults, the last link of every fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultPreferences {
    pub name: String,
    pub locale: String,
    pub color: String,
    pub animation_speed: f64,
    pub edge_scroll_speed: f64,
    pub is_snap_mode: bool,
    pub is_wrap_mode: bool,
    pub is_dynamic_size_mode: bool,
    pub is_paste_at_cursor_mode: bool,
    pub is_tool_locked: bool,
    pub is_grid_mode: bool,
    pub is_focus_mode: bool,
    pub is_debug_mode: bool,
}

impl Default for DefaultPreferences {
    fn default() -> Self {
        Self {
            name: "New User".to_owned(),
            locale: "en".to_owned(),
            color: "#FF802B".to_owned(),
            animation_speed: 1.0,
            edge_scroll_speed: 1.0,
            is_snap_mode: false,
            is_wrap_mode: false,
            is_dynamic_size_mode: false,
            is_paste_at_cursor_mode: false,
            is_tool_locked: false,
            is_grid_mode: false,
            is_focus_mode: false,
            is_debug_mode: false,
        }
    }
}

/// The fully resolved preferences for one editor instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePreferences {
    pub id: String,
    pub name: String,
    pub locale: String,
    pub color: String,
    pub animation_speed: f64,
    pub edge_scroll_speed: f64,
    pub is_snap_mode: bool,
    /// The user's raw choice; `None` when unset.
    pub color_scheme: Option<ColorScheme>,
    pub is_dark_mode: bool,
    pub is_wrap_mode: bool,
    pub is_dynamic_resize_mode: bool,
    pub is_paste_at_cursor_mode: bool,
    pub is_tool_locked: bool,
    pub is_grid_mode: bool,
    pub is_focus_mode: bool,
    pub is_debug_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overlays_only_present_fields() {
        let mut current = UserPreferences::with_id("user-1");
        current.name = Some("Ada".to_owned());
        current.is_snap_mode = Some(true);

        let next = current.merged(&UserPreferencesPatch {
            locale: Some(Some("fr".to_owned())),
            is_snap_mode: Some(Some(false)),
            ..UserPreferencesPatch::default()
        });

        assert_eq!(next.id, "user-1");
        assert_eq!(next.name.as_deref(), Some("Ada"));
        assert_eq!(next.locale.as_deref(), Some("fr"));
        assert_eq!(next.is_snap_mode, Some(false));
    }

    #[test]
    fn null_in_patch_clears_the_field() {
        let mut current = UserPreferences::with_id("user-1");
        current.name = Some("Ada".to_owned());
        current.locale = Some("fr".to_owned());

        let patch: UserPreferencesPatch =
            serde_json::from_value(json!({"name": null})).unwrap();
        assert_eq!(patch.name, Some(None));
        assert_eq!(patch.locale, None);

        let next = current.merged(&patch);
        assert_eq!(next.name, None);
        assert_eq!(next.locale.as_deref(), Some("fr"));
    }

    #[test]
    fn record_uses_camel_case_and_skips_absent_fields() {
        let mut record = UserPreferences::with_id("u");
        record.is_dynamic_size_mode = Some(true);
        record.color_scheme = Some(ColorScheme::System);

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"id": "u", "isDynamicSizeMode": true, "colorScheme": "system"})
        );
    }

    #[test]
    fn unknown_color_scheme_reads_as_missing() {
        let record: UserPreferences =
            serde_json::from_value(json!({"id": "u", "colorScheme": "sepia"})).unwrap();
        assert_eq!(record.color_scheme, None);

        let record: UserPreferences =
            serde_json::from_value(json!({"id": "u", "colorScheme": "dark"})).unwrap();
        assert_eq!(record.color_scheme, Some(ColorScheme::Dark));
    }
}
