//! Image assets: manifest-driven bulk loading behind string keys.
//!
//! Every image named by the manifest is decoded up front, before the game
//! loop starts; lookups after that are infallible unless a key was never
//! queued. Keys double as relative identifiers and follow the same hygiene
//! rules as file paths under the asset root: lowercase ASCII, digits,
//! `_`, `-` and `/`, no traversal.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("no asset registered under key '{key}'")]
    MissingAsset { key: String },
    #[error("invalid asset key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },
    #[error("duplicate asset key '{key}' in manifest")]
    DuplicateKey { key: String },
    #[error("failed to read asset manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse asset manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to open image {path}: {source}")]
    ImageOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("rgba buffer length {actual} does not match {width}x{height}")]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        actual: usize,
    },
}

/// A decoded RGBA8 image.
#[derive(Debug, Clone)]
pub struct SpriteImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl SpriteImage {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, AssetError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(AssetError::BufferSizeMismatch {
                width,
                height,
                actual: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub key: String,
    pub file: String,
}

/// The download queue: every image the game needs, declared up front.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetManifest {
    pub images: Vec<ManifestEntry>,
}

impl AssetManifest {
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let raw = fs::read_to_string(path).map_err(|source| AssetError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: AssetManifest =
            serde_json::from_str(&raw).map_err(|source| AssetError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), AssetError> {
        let mut seen = HashSet::new();
        for entry in &self.images {
            validate_asset_key(&entry.key)?;
            if !seen.insert(entry.key.as_str()) {
                return Err(AssetError::DuplicateKey {
                    key: entry.key.clone(),
                });
            }
        }
        Ok(())
    }
}

fn validate_asset_key(key: &str) -> Result<(), AssetError> {
    let fail = |reason| {
        Err(AssetError::InvalidKey {
            key: key.to_string(),
            reason,
        })
    };
    if key.is_empty() {
        return fail("must not be empty");
    }
    if key.starts_with('/') {
        return fail("must not start with '/'");
    }
    if key.contains('\\') {
        return fail("must not contain '\\'");
    }
    if key.contains("..") {
        return fail("must not contain '..'");
    }
    for ch in key.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-') {
            continue;
        }
        return fail("contains a character outside [a-z0-9_/-]");
    }
    Ok(())
}

/// In-memory image cache keyed by manifest key. Images load once and are
/// shared from then on.
#[derive(Debug, Default)]
pub struct AssetStore {
    images: HashMap<String, Arc<SpriteImage>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every manifest image from `assets_dir`. The whole batch must
    /// finish before the store is handed out; a single failure aborts the
    /// load with the offending path.
    pub fn load_all(assets_dir: &Path, manifest: &AssetManifest) -> Result<Self, AssetError> {
        let mut store = Self::default();
        for entry in &manifest.images {
            let path = assets_dir.join(&entry.file);
            let image = load_image_rgba(&path)?;
            store.images.insert(entry.key.clone(), Arc::new(image));
        }
        info!(image_count = store.images.len(), "assets_loaded");
        Ok(store)
    }

    /// Register an already-decoded image, replacing any previous holder of
    /// the key.
    pub fn insert(&mut self, key: impl Into<String>, image: SpriteImage) {
        self.images.insert(key.into(), Arc::new(image));
    }

    pub fn image(&self, key: &str) -> Result<Arc<SpriteImage>, AssetError> {
        self.images
            .get(key)
            .cloned()
            .ok_or_else(|| AssetError::MissingAsset {
                key: key.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn load_image_rgba(path: &Path) -> Result<SpriteImage, AssetError> {
    let reader = ImageReader::open(path).map_err(|source| AssetError::ImageOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| AssetError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    let image = decoded.to_rgba8();
    let (width, height) = (image.width(), image.height());
    SpriteImage::from_rgba(width, height, image.into_raw())
}
