//! Run configuration assembled from the CLI surface (§6).
//!
//! Unlike the teacher's database-first `Config`, this engine's entire
//! configuration is the handful of flags `main.rs` parses with `clap` — no
//! TOML file, no database.

use std::path::PathBuf;

/// `-s on|off`: set every lamp to one state and exit, skipping playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchMode {
    On,
    Off,
}

impl SwitchMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "on" => Some(SwitchMode::On),
            "off" => Some(SwitchMode::Off),
            _ => None,
        }
    }
}

/// Default music directory, matching `examples/original_source/src/main.c`'s
/// `MUSIC_BASE_DIR` (updated to this crate's target filesystem layout).
pub const DEFAULT_MUSIC_DIR: &str = "/home/linux/music/";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub verbose: bool,
    pub music_dir: PathBuf,
    pub switch: Option<SwitchMode>,
    pub song: Option<String>,
}

impl RunConfig {
    /// Build a `RunConfig` from already-parsed CLI fields. `music_dir` is
    /// normalized to always carry a trailing separator so callers can join
    /// a bare song name onto it without rechecking.
    pub fn new(
        verbose: bool,
        music_dir: Option<String>,
        switch: Option<String>,
        song: Option<String>,
    ) -> Result<Self, String> {
        let music_dir = normalize_dir(music_dir.as_deref().unwrap_or(DEFAULT_MUSIC_DIR));
        let switch = switch
            .map(|raw| {
                SwitchMode::parse(&raw).ok_or_else(|| format!("invalid switch mode: {raw} (use 'on' or 'off')"))
            })
            .transpose()?;

        Ok(RunConfig { verbose, music_dir, switch, song })
    }

    /// Resolve a bare song name (as entered at the menu, on the CLI, or via
    /// UDP) into the asset base path used by [`crate::playback::play_song`].
    pub fn song_base(&self, name: &str) -> PathBuf {
        self.music_dir.join(name)
    }
}

fn normalize_dir(raw: &str) -> PathBuf {
    if raw.ends_with('/') {
        PathBuf::from(raw)
    } else {
        PathBuf::from(format!("{raw}/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_music_dir_is_used_when_unspecified() {
        let cfg = RunConfig::new(false, None, None, None).unwrap();
        assert_eq!(cfg.music_dir, PathBuf::from(DEFAULT_MUSIC_DIR));
    }

    #[test]
    fn music_dir_gets_a_trailing_slash_when_missing() {
        let cfg = RunConfig::new(false, Some("/tmp/music".into()), None, None).unwrap();
        assert_eq!(cfg.music_dir, PathBuf::from("/tmp/music/"));
    }

    #[test]
    fn song_base_joins_onto_the_music_dir() {
        let cfg = RunConfig::new(false, Some("/tmp/music".into()), None, None).unwrap();
        assert_eq!(cfg.song_base("jingle"), PathBuf::from("/tmp/music/jingle"));
    }

    #[test]
    fn invalid_switch_mode_is_rejected() {
        let result = RunConfig::new(false, None, Some("sideways".into()), None);
        assert!(result.is_err());
    }

    #[test]
    fn on_and_off_switch_modes_parse() {
        assert_eq!(SwitchMode::parse("on"), Some(SwitchMode::On));
        assert_eq!(SwitchMode::parse("off"), Some(SwitchMode::Off));
        assert_eq!(SwitchMode::parse("maybe"), None);
    }
}
