//! Audio cues for the last seconds of a countdown.
//!
//! The cue table is built once and shared read-only between countdown runs.
//! Players are fire-and-forget: `play` must return without waiting for the
//! sound to finish.

use crate::common::lock;
use crate::config::AudioBackend;
use crate::error::AudioError;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// A playable sound bound to one remaining-seconds threshold.
#[derive(Debug, Clone)]
pub struct CueHandle {
    pub threshold: u32,
    pub path: PathBuf,
    data: Option<Arc<[u8]>>,
}

impl CueHandle {
    /// The preloaded file contents, if the file could be read.
    pub fn data(&self) -> Option<&Arc<[u8]>> {
        self.data.as_ref()
    }
}

/// Cue handles keyed by the exact remaining value at which they fire.
#[derive(Debug, Clone, Default)]
pub struct AudioCues {
    cues: BTreeMap<u32, CueHandle>,
}

impl AudioCues {
    /// Builds handles for `countdown-1.wav` through `countdown-<window>.wav` in
    /// `dir`, reading each file once. Unreadable files are logged and keep a
    /// handle without data.
    pub fn load(dir: &Path, window: u32) -> Self {
        let mut cues = BTreeMap::new();
        let mut missing = 0;
        for threshold in 1..=window {
            let path = dir.join(format!("countdown-{}.wav", threshold));
            let data = match std::fs::read(&path) {
                Ok(bytes) => Some(Arc::from(bytes)),
                Err(source) => {
                    missing += 1;
                    debug!("{}", AudioError::Load { path: path.clone(), source });
                    None
                }
            };
            cues.insert(threshold, CueHandle { threshold, path, data });
        }
        if missing > 0 {
            warn!(
                "{} of {} countdown cues could not be loaded from {}.",
                missing,
                window,
                dir.display()
            );
        } else {
            info!("Loaded {} countdown cues from {}.", window, dir.display());
        }
        Self { cues }
    }

    /// Handles with no backing data, for players that do not read files.
    pub fn unloaded(window: u32) -> Self {
        let cues = (1..=window)
            .map(|threshold| {
                let path = PathBuf::from(format!("countdown-{}.wav", threshold));
                (threshold, CueHandle { threshold, path, data: None })
            })
            .collect();
        Self { cues }
    }

    pub fn get(&self, threshold: u32) -> Option<&CueHandle> {
        self.cues.get(&threshold)
    }

    /// The highest threshold that has a cue.
    pub fn window(&self) -> u32 {
        self.cues.keys().next_back().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

/// The host's audio playback primitive.
pub trait AudioPlayer: Send + Sync {
    fn play(&self, cue: &CueHandle) -> Result<(), AudioError>;
}

/// Logs cues instead of playing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPlayer;

impl AudioPlayer for SilentPlayer {
    fn play(&self, cue: &CueHandle) -> Result<(), AudioError> {
        debug!("Cue {} (silent).", cue.threshold);
        Ok(())
    }
}

/// Rings the terminal bell for each cue.
#[derive(Debug, Default, Clone, Copy)]
pub struct BellPlayer;

impl AudioPlayer for BellPlayer {
    fn play(&self, _cue: &CueHandle) -> Result<(), AudioError> {
        let mut stdout = std::io::stdout();
        stdout
            .write_all(b"\x07")
            .and_then(|_| stdout.flush())
            .map_err(|e| AudioError::Playback(e.to_string()))
    }
}

/// Decodes preloaded cue files and plays them on the default output device.
/// Each cue plays on its own detached thread.
#[cfg(feature = "rodio-audio")]
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioPlayer;

#[cfg(feature = "rodio-audio")]
impl AudioPlayer for RodioPlayer {
    fn play(&self, cue: &CueHandle) -> Result<(), AudioError> {
        use rodio::{Decoder, OutputStream, Sink};
        use std::io::Cursor;

        let data = cue.data().cloned().ok_or_else(|| {
            AudioError::Unavailable(format!("cue {} was not loaded", cue.path.display()))
        })?;
        let threshold = cue.threshold;
        std::thread::Builder::new()
            .name(format!("cue-{}", threshold))
            .spawn(move || {
                let played = (|| -> Result<(), AudioError> {
                    let (_stream, handle) = OutputStream::try_default()
                        .map_err(|e| AudioError::Unavailable(e.to_string()))?;
                    let sink =
                        Sink::try_new(&handle).map_err(|e| AudioError::Playback(e.to_string()))?;
                    let source = Decoder::new(Cursor::new(data))
                        .map_err(|e| AudioError::Playback(e.to_string()))?;
                    sink.append(source);
                    sink.sleep_until_end();
                    Ok(())
                })();
                if let Err(e) = played {
                    warn!("Cue {} failed: {}", threshold, e);
                }
            })
            .map(|_| ())
            .map_err(|e| AudioError::Playback(e.to_string()))
    }
}

/// Builds the player selected in the configuration. A backend that was not
/// compiled in degrades to `SilentPlayer`.
pub fn player_for(backend: AudioBackend) -> Arc<dyn AudioPlayer> {
    match backend {
        AudioBackend::Silent => Arc::new(SilentPlayer),
        AudioBackend::Bell => Arc::new(BellPlayer),
        #[cfg(feature = "rodio-audio")]
        AudioBackend::Rodio => Arc::new(RodioPlayer),
        #[cfg(not(feature = "rodio-audio"))]
        AudioBackend::Rodio => {
            warn!("Built without the `rodio-audio` feature; cues will be silent.");
            Arc::new(SilentPlayer)
        }
    }
}

/// Records every cue it is asked to play. Can be told to fail every request.
#[derive(Debug, Default)]
pub struct RecordingPlayer {
    played: Mutex<Vec<u32>>,
    fail: bool,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A player whose every request fails after being recorded.
    pub fn failing() -> Self {
        Self {
            played: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn played(&self) -> Vec<u32> {
        lock(&self.played).clone()
    }
}

impl AudioPlayer for RecordingPlayer {
    fn play(&self, cue: &CueHandle) -> Result<(), AudioError> {
        lock(&self.played).push(cue.threshold);
        if self.fail {
            return Err(AudioError::Unavailable("no output device".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_still_produce_handles() {
        let cues = AudioCues::load(Path::new("/definitely/not/here"), 10);
        assert_eq!(cues.len(), 10);
        assert_eq!(cues.window(), 10);
        let cue = cues.get(7).unwrap();
        assert_eq!(cue.threshold, 7);
        assert!(cue.path.ends_with("countdown-7.wav"));
        assert!(cue.data().is_none());
        assert!(cues.get(11).is_none());
        assert!(cues.get(0).is_none());
    }

    #[test]
    fn loads_files_that_exist() {
        let dir = std::env::temp_dir().join(format!("clockface-cues-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("countdown-1.wav"), b"RIFF").unwrap();

        let cues = AudioCues::load(&dir, 2);
        assert_eq!(cues.get(1).unwrap().data().map(|d| d.len()), Some(4));
        assert!(cues.get(2).unwrap().data().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn recording_player_reports_failures() {
        let cues = AudioCues::unloaded(3);
        let player = RecordingPlayer::failing();
        assert!(player.play(cues.get(3).unwrap()).is_err());
        assert_eq!(player.played(), vec![3]);
    }
}
