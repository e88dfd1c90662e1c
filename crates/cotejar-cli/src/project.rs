//! Project directory layout and image file I/O.
//!
//! A project root holds `images/<category>/orig.<ext>` baselines, level
//! images under `images/<category>/<transformation>/level_NN.<ext>`, and
//! generated data under `data/`:
//!
//! ```text
//! data/sort/metrics/<metric>.csv    sorted datasets per metric
//! data/sort/humans/<name>.csv       decoded human datasets
//! data/sort/raw/<name>.csv          raw symbol datasets from trials
//! data/rank/rank.csv                correlation results
//! data/sequence_map.json            symbol obfuscation map
//! ```

use crate::error::{CliError, CliResult};
use cotejar::{AgentId, Level, PixelImage};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Extensions a baseline image may carry, in resolution order
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Extension used for images the CLI writes
pub const OUTPUT_EXTENSION: &str = "png";

/// A project rooted at a directory, resolving all conventional paths.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Project at the given root
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The project root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `images/` directory
    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// `data/sort/metrics/` directory
    #[must_use]
    pub fn metric_sorted_dir(&self) -> PathBuf {
        self.root.join("data").join("sort").join("metrics")
    }

    /// `data/sort/humans/` directory
    #[must_use]
    pub fn human_sorted_dir(&self) -> PathBuf {
        self.root.join("data").join("sort").join("humans")
    }

    /// `data/sort/raw/` directory
    #[must_use]
    pub fn raw_sorted_dir(&self) -> PathBuf {
        self.root.join("data").join("sort").join("raw")
    }

    /// `data/rank/rank.csv`
    #[must_use]
    pub fn ranked_file(&self) -> PathBuf {
        self.root.join("data").join("rank").join("rank.csv")
    }

    /// `data/sequence_map.json`
    #[must_use]
    pub fn sequence_map_file(&self) -> PathBuf {
        self.root.join("data").join("sequence_map.json")
    }

    /// Directory holding one transformation's level images for a category
    #[must_use]
    pub fn level_dir(&self, category: &str, transformation: &str) -> PathBuf {
        self.images_dir().join(category).join(transformation)
    }

    /// Path a level image is written to
    #[must_use]
    pub fn level_path(&self, category: &str, transformation: &str, level: Level) -> PathBuf {
        self.level_dir(category, transformation)
            .join(format!("{}.{OUTPUT_EXTENSION}", level.file_stem()))
    }

    /// Discovered categories: `images/` subdirectories holding a baseline.
    ///
    /// # Errors
    ///
    /// Fails when `images/` does not exist or cannot be read.
    pub fn categories(&self) -> CliResult<Vec<String>> {
        let images = self.images_dir();
        if !images.is_dir() {
            return Err(CliError::project(format!(
                "no images directory at {}",
                images.display()
            )));
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&images)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.orig_path(&name).is_some() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Path of a category's baseline image, trying each known extension
    #[must_use]
    pub fn orig_path(&self, category: &str) -> Option<PathBuf> {
        let base = self.images_dir().join(category);
        IMAGE_EXTENSIONS
            .iter()
            .map(|ext| base.join(format!("orig.{ext}")))
            .find(|path| path.is_file())
    }

    /// Read a category's baseline image.
    ///
    /// # Errors
    ///
    /// Fails when no baseline exists or it cannot be decoded.
    pub fn read_orig(&self, category: &str) -> CliResult<PixelImage> {
        let path = self.orig_path(category).ok_or_else(|| {
            CliError::project(format!("no orig image found in category {category}"))
        })?;
        read_image(&path)
    }

    /// Read the level images of a (category, transformation) pair, keyed by
    /// the level parsed from each filename. Files that do not match the
    /// `level_NN` naming are ignored.
    ///
    /// # Errors
    ///
    /// Fails on unreadable directories, undecodable images, or a filename
    /// level outside the valid range.
    pub fn read_level_images(
        &self,
        category: &str,
        transformation: &str,
    ) -> CliResult<BTreeMap<Level, PixelImage>> {
        let dir = self.level_dir(category, transformation);
        let mut images = BTreeMap::new();
        if !dir.is_dir() {
            return Ok(images);
        }
        // unwrap is safe, the pattern is a literal
        #[allow(clippy::unwrap_used)]
        let pattern = Regex::new(r"level_(\d+)").unwrap();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(captures) = pattern.captures(stem) else {
                continue;
            };
            let level: Level = captures[1].parse().map_err(CliError::from)?;
            images.insert(level, read_image(&path)?);
        }
        Ok(images)
    }

    /// Write a level image, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails on I/O or encoding problems.
    pub fn write_level_image(
        &self,
        category: &str,
        transformation: &str,
        level: Level,
        image: &PixelImage,
    ) -> CliResult<PathBuf> {
        let path = self.level_path(category, transformation, level);
        write_image(image, &path)?;
        Ok(path)
    }

    /// All agents with a sorted CSV file, with the file path.
    ///
    /// # Errors
    ///
    /// Fails on unreadable data directories.
    pub fn agent_files(&self) -> CliResult<Vec<(AgentId, PathBuf)>> {
        let mut agents = Vec::new();
        for (dir, make) in [
            (
                self.metric_sorted_dir(),
                AgentId::metric as fn(String) -> AgentId,
            ),
            (self.human_sorted_dir(), AgentId::human),
        ] {
            if !dir.is_dir() {
                continue;
            }
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    agents.push((make(stem.to_string()), path));
                }
            }
        }
        agents.sort();
        Ok(agents)
    }

    /// Raw symbol CSV files under `data/sort/raw/`, by file name.
    ///
    /// # Errors
    ///
    /// Fails on an unreadable raw directory.
    pub fn raw_files(&self) -> CliResult<Vec<String>> {
        let dir = self.raw_sorted_dir();
        let mut names = Vec::new();
        if !dir.is_dir() {
            return Ok(names);
        }
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Decode an image file into a raw pixel buffer.
///
/// # Errors
///
/// Propagates decode failures.
pub fn read_image(path: &Path) -> CliResult<PixelImage> {
    Ok(PixelImage::from_dynamic(&image::open(path)?))
}

/// Encode a pixel buffer into an image file, creating parent directories.
///
/// # Errors
///
/// Propagates I/O and encode failures.
pub fn write_image(image: &PixelImage, path: &Path) -> CliResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.to_dynamic().save(path)?;
    Ok(())
}
