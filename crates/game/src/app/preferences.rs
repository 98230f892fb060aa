use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use shinobi_engine::write_text_atomic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub(crate) const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Character {
    #[default]
    Boy,
    Girl,
}

impl Character {
    pub(crate) fn atlas(self) -> &'static str {
        match self {
            Self::Boy => "player_boy",
            Self::Girl => "player_girl",
        }
    }

    pub(crate) fn toggled(self) -> Self {
        match self {
            Self::Boy => Self::Girl,
            Self::Girl => Self::Boy,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Boy => "BOY",
            Self::Girl => "GIRL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GamePreferences {
    pub character: Character,
    pub show_fps_counter: bool,
    pub use_monochrome_shader: bool,
    pub debug_draw: bool,
}

impl Default for GamePreferences {
    fn default() -> Self {
        Self {
            character: Character::Boy,
            show_fps_counter: true,
            use_monochrome_shader: false,
            debug_draw: false,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum PreferencesError {
    #[error("failed to read preferences '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid preferences '{path}' at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode preferences: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write preferences '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Missing file means first launch and yields the defaults.
pub(crate) fn load_preferences(path: &Path) -> Result<GamePreferences, PreferencesError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            return Ok(GamePreferences::default());
        }
        Err(source) => {
            return Err(PreferencesError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_preferences(path, &raw)
}

fn parse_preferences(path: &Path, raw: &str) -> Result<GamePreferences, PreferencesError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, GamePreferences>(&mut deserializer).map_err(|error| {
        let field = match error.path().to_string() {
            field if field.is_empty() || field == "." => "<root>".to_string(),
            field => field,
        };
        PreferencesError::Parse {
            path: path.to_path_buf(),
            field,
            source: error.into_inner(),
        }
    })
}

pub(crate) fn save_preferences(
    path: &Path,
    preferences: &GamePreferences,
) -> Result<(), PreferencesError> {
    let mut json = serde_json::to_string_pretty(preferences).map_err(PreferencesError::Encode)?;
    json.push('\n');
    write_text_atomic(path, &json).map_err(|source| PreferencesError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Preferences shared by the menu and the game, persisted on every change.
#[derive(Debug)]
pub(crate) struct PreferencesStore {
    path: PathBuf,
    current: GamePreferences,
}

impl PreferencesStore {
    pub(crate) fn open(path: PathBuf) -> Self {
        let current = match load_preferences(&path) {
            Ok(preferences) => {
                info!(path = %path.display(), ?preferences, "preferences_loaded");
                preferences
            }
            Err(error) => {
                warn!(error = %error, "preferences_invalid_using_defaults");
                GamePreferences::default()
            }
        };
        Self { path, current }
    }

    pub(crate) fn current(&self) -> &GamePreferences {
        &self.current
    }

    pub(crate) fn update(&mut self, change: impl FnOnce(&mut GamePreferences)) {
        let before = self.current.clone();
        change(&mut self.current);
        if self.current == before {
            return;
        }
        match save_preferences(&self.path, &self.current) {
            Ok(()) => info!(preferences = ?self.current, "preferences_saved"),
            Err(error) => warn!(error = %error, "preferences_save_failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefs = load_preferences(&dir.path().join(PREFERENCES_FILE)).expect("load");
        assert_eq!(prefs, GamePreferences::default());
    }

    #[test]
    fn saved_preferences_load_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config").join(PREFERENCES_FILE);
        let prefs = GamePreferences {
            character: Character::Girl,
            show_fps_counter: false,
            use_monochrome_shader: true,
            debug_draw: true,
        };
        save_preferences(&path, &prefs).expect("save");
        assert_eq!(load_preferences(&path).expect("load"), prefs);
    }

    #[test]
    fn partial_file_fills_missing_fields_with_defaults() {
        let prefs =
            parse_preferences(Path::new("p.json"), r#"{ "character": "girl" }"#).expect("parse");
        assert_eq!(prefs.character, Character::Girl);
        assert!(prefs.show_fps_counter);
    }

    #[test]
    fn parse_error_names_the_offending_field() {
        let error = parse_preferences(Path::new("p.json"), r#"{ "debug_draw": "yes" }"#)
            .expect_err("invalid bool");
        match error {
            PreferencesError::Parse { field, .. } => assert_eq!(field, "debug_draw"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_character_is_rejected() {
        let error = parse_preferences(Path::new("p.json"), r#"{ "character": "robot" }"#)
            .expect_err("unknown variant");
        assert!(error.to_string().contains("character"));
    }

    #[test]
    fn store_persists_changes_and_skips_no_ops() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(PREFERENCES_FILE);
        let mut store = PreferencesStore::open(path.clone());

        store.update(|prefs| prefs.show_fps_counter = true);
        assert!(!path.exists());

        store.update(|prefs| prefs.character = prefs.character.toggled());
        assert_eq!(load_preferences(&path).expect("load").character, Character::Girl);
    }

    #[test]
    fn store_falls_back_to_defaults_on_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(PREFERENCES_FILE);
        fs::write(&path, "{ not json").expect("write");
        let store = PreferencesStore::open(path);
        assert_eq!(store.current(), &GamePreferences::default());
    }
}
