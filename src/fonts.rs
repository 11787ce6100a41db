//! Font loading utilities for the invoice renderer.
//!
//! The document needs one proportional family and, for "Courier" text, a monospaced one.  Both
//! are looked up as `<Family>-Regular.ttf`, `-Bold.ttf`, `-Italic.ttf` and `-BoldItalic.ttf` in a
//! list of candidate directories: an explicit override, `assets/fonts` next to the binary,
//! `assets/fonts` in the crate and finally the usual Liberation install locations.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{self, Font, FontData, FontFamily};
use genpdf::Document;
use log::{debug, warn};

/// Name of the proportional font family.
pub const SANS_FAMILY_NAME: &str = "LiberationSans";

/// Name of the monospaced font family.
pub const MONO_FAMILY_NAME: &str = "LiberationMono";

const FONT_STYLES: &[&str] = &["Regular", "Bold", "Italic", "BoldItalic"];

const FONT_HINT: &str = "See assets/fonts/README.md or pass --fonts-dir.";

const SYSTEM_FONT_DIRECTORIES: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/liberation2",
    "/usr/share/fonts/liberation",
    "/usr/share/fonts/liberation-sans",
    "/usr/share/fonts/liberation-mono",
    "/usr/share/fonts/TTF",
];

/// Where to look for font files.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FontConfig {
    directory: Option<PathBuf>,
}

impl FontConfig {
    /// Uses the default search order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Searches `directory` before the default locations.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Returns the candidate directories in search order.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        let mut push = |candidate: PathBuf| {
            if !candidates.iter().any(|existing| existing == &candidate) {
                candidates.push(candidate);
            }
        };

        if let Some(directory) = &self.directory {
            push(directory.clone());
        }

        if let Ok(current_exe) = env::current_exe() {
            if let Some(bin_dir) = current_exe.parent() {
                push(bin_dir.join("assets/fonts"));
            }
        }

        push(bundled_fonts_dir());

        for directory in SYSTEM_FONT_DIRECTORIES {
            push(PathBuf::from(directory));
        }

        candidates
    }

    /// Loads the proportional family; fails when no candidate has all four styles.
    pub fn sans_family(&self) -> Result<FontFamily<FontData>, Error> {
        self.load_family(SANS_FAMILY_NAME)
    }

    /// Loads the monospaced family; fails when no candidate has all four styles.
    pub fn mono_family(&self) -> Result<FontFamily<FontData>, Error> {
        self.load_family(MONO_FAMILY_NAME)
    }

    /// Returns whether the proportional family can be found.
    pub fn sans_available(&self) -> bool {
        self.resolve_directory(SANS_FAMILY_NAME).is_ok()
    }

    fn resolve_directory(&self, family: &str) -> Result<PathBuf, Error> {
        let mut attempts = Vec::new();

        for candidate in self.candidates() {
            if !candidate.is_dir() {
                attempts.push(format!("{} (directory missing)", candidate.display()));
                continue;
            }

            let missing = missing_font_files(&candidate, family);
            if missing.is_empty() {
                return Ok(candidate);
            }

            let missing_list = missing
                .iter()
                .filter_map(|path| path.file_name())
                .map(|name| name.to_string_lossy())
                .collect::<Vec<_>>()
                .join(", ");
            attempts.push(format!(
                "{} (missing files [{}])",
                candidate.display(),
                missing_list
            ));
        }

        Err(Error::new(
            format!(
                "Unable to locate the '{}' font family. Checked: {}. {}",
                family,
                attempts.join(", "),
                FONT_HINT
            ),
            io::Error::new(io::ErrorKind::NotFound, "font family not found"),
        ))
    }

    fn load_family(&self, family: &str) -> Result<FontFamily<FontData>, Error> {
        let directory = self.resolve_directory(family)?;
        debug!(
            "Loading font family '{}' from {}",
            family,
            directory.display()
        );

        fonts::from_files(&directory, family, None).map_err(|err| {
            Error::new(
                format!(
                    "Failed to load font family '{}' from {}: {}",
                    family,
                    directory.display(),
                    err
                ),
                io::Error::new(io::ErrorKind::Other, err.to_string()),
            )
        })
    }
}

/// Returns the `assets/fonts` directory of the crate.
pub fn bundled_fonts_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts")
}

fn missing_font_files(directory: &Path, family: &str) -> Vec<PathBuf> {
    FONT_STYLES
        .iter()
        .map(|style| directory.join(format!("{}-{}.ttf", family, style)))
        .filter(|candidate| !candidate.is_file())
        .collect()
}

/// Adds the monospaced family to `document`.
///
/// Returns `None` and logs a warning when the family is unavailable, in which case monospaced
/// text falls back to the document's default family.
pub fn install_mono_family(
    document: &mut Document,
    config: &FontConfig,
) -> Option<FontFamily<Font>> {
    match config.mono_family() {
        Ok(family) => Some(document.add_font_family(family)),
        Err(err) => {
            warn!(
                "Monospaced fonts unavailable ({}); using '{}' instead.",
                err, SANS_FAMILY_NAME
            );
            None
        }
    }
}
