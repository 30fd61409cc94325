//! Asset loading
//!
//! The font, matcap and environment load on their own background threads.
//! Each thread posts exactly one [`AssetEvent`] to a channel that the frame
//! loop drains with [`AssetLoader::poll`]. Loads complete in any order and a
//! failure never touches the scene.

pub mod images;
pub mod typeface;

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use crate::config::AssetPaths;

pub use images::{EnvironmentMap, MatcapImage, MipLevel};
pub use typeface::{Typeface, TypefaceError};

/// Which asset an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Font,
    Matcap,
    Environment,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssetKind::Font => "font",
            AssetKind::Matcap => "matcap",
            AssetKind::Environment => "environment map",
        };
        f.write_str(name)
    }
}

/// Errors produced while loading an asset
#[derive(Debug)]
pub enum AssetError {
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    Image {
        path: PathBuf,
        error: image::ImageError,
    },
    Typeface {
        path: PathBuf,
        error: TypefaceError,
    },
    /// The image decoded to zero texels
    EmptyImage(PathBuf),
    /// The loader thread could not be started
    Spawn(std::io::Error),
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetError::Io { path, error } => {
                write!(f, "Failed to read '{}': {}", path.display(), error)
            }
            AssetError::Image { path, error } => {
                write!(f, "Failed to decode image '{}': {}", path.display(), error)
            }
            AssetError::Typeface { path, error } => {
                write!(f, "Failed to parse font '{}': {}", path.display(), error)
            }
            AssetError::EmptyImage(path) => write!(f, "Image '{}' is empty", path.display()),
            AssetError::Spawn(error) => write!(f, "Failed to start loader thread: {}", error),
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Io { error, .. } => Some(error),
            AssetError::Image { error, .. } => Some(error),
            AssetError::Typeface { error, .. } => Some(error),
            AssetError::EmptyImage(_) => None,
            AssetError::Spawn(error) => Some(error),
        }
    }
}

/// Completion message for one load
#[derive(Debug)]
pub enum AssetEvent {
    Font(Typeface),
    Matcap(MatcapImage),
    Environment(EnvironmentMap),
    Failed { kind: AssetKind, error: AssetError },
}

impl AssetEvent {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetEvent::Font(_) => AssetKind::Font,
            AssetEvent::Matcap(_) => AssetKind::Matcap,
            AssetEvent::Environment(_) => AssetKind::Environment,
            AssetEvent::Failed { kind, .. } => *kind,
        }
    }
}

pub fn load_font(path: &Path) -> Result<Typeface, AssetError> {
    let json = std::fs::read_to_string(path).map_err(|error| AssetError::Io {
        path: path.to_path_buf(),
        error,
    })?;
    Typeface::from_json(&json).map_err(|error| AssetError::Typeface {
        path: path.to_path_buf(),
        error,
    })
}

/// Load one asset synchronously and wrap the outcome as an event
pub fn load_blocking(kind: AssetKind, path: &Path) -> AssetEvent {
    let result = match kind {
        AssetKind::Font => load_font(path).map(AssetEvent::Font),
        AssetKind::Matcap => MatcapImage::load(path).map(AssetEvent::Matcap),
        AssetKind::Environment => EnvironmentMap::load(path).map(AssetEvent::Environment),
    };
    result.unwrap_or_else(|error| AssetEvent::Failed { kind, error })
}

/// Background loader with a completion queue
pub struct AssetLoader {
    sender: Sender<AssetEvent>,
    receiver: Receiver<AssetEvent>,
    pending: usize,
}

impl AssetLoader {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            pending: 0,
        }
    }

    /// Start the font, matcap and environment loads
    pub fn spawn_all(paths: &AssetPaths) -> Self {
        let mut loader = Self::new();
        loader.spawn(AssetKind::Font, paths.font_path());
        loader.spawn(AssetKind::Matcap, paths.matcap_path());
        loader.spawn(AssetKind::Environment, paths.environment_path());
        loader
    }

    /// Start one load on its own thread
    pub fn spawn(&mut self, kind: AssetKind, path: PathBuf) {
        let sender = self.sender.clone();
        let spawned = thread::Builder::new()
            .name(format!("load-{}", kind).replace(' ', "-"))
            .spawn(move || {
                log::debug!("Loading {} from {}", kind, path.display());
                // Receiver gone means the app is shutting down
                let _ = sender.send(load_blocking(kind, &path));
            });

        match spawned {
            Ok(_) => self.pending += 1,
            Err(error) => {
                // Still report it through the queue so every load yields one event
                let _ = self.sender.send(AssetEvent::Failed {
                    kind,
                    error: AssetError::Spawn(error),
                });
                self.pending += 1;
            }
        }
    }

    /// Drain every completed load without blocking
    pub fn poll(&mut self) -> Vec<AssetEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.pending = self.pending.saturating_sub(1);
                    events.push(event);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Loads started but not yet drained
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn is_idle(&self) -> bool {
        self.pending == 0
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}
