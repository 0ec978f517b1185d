//! Locating and parsing machine layout files.
//!
//! A machine directory holds one file per layout (`items`, `fluids`,
//! `energy`), each in RON, TOML or JSON. The extension picks the parser, and
//! two files for the same layout are rejected rather than one silently
//! shadowing the other.

use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Why a machine layout could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The machine directory has no file for a layout it must define.
    #[error("machine in {dir} has no '{layout}' layout file")]
    MissingRequired { layout: String, dir: PathBuf },

    #[error("{path} is not a .ron, .toml or .json layout file")]
    UnsupportedFormat { path: PathBuf },

    /// The same layout is defined twice, in different formats.
    #[error("layout defined twice: {first} and {second}")]
    ConflictingFormats { first: PathBuf, second: PathBuf },

    #[error("malformed layout {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    /// A filter names a resource the registry does not know.
    #[error("{location}: no {expected_kind} named '{name}'")]
    UnresolvedRef {
        location: String,
        name: String,
        expected_kind: &'static str,
    },

    /// Group names identify groups at runtime, so they must be unique per layout.
    #[error("{location}: slot group '{name}' is declared more than once")]
    DuplicateName { location: String, name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Formats
// ===========================================================================

/// Layout file formats, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }

    fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, String> {
        match self {
            Format::Ron => ron::from_str(text).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// The format of a layout file, from its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    Format::ALL
        .into_iter()
        .find(|format| Some(format.extension()) == ext)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        })
}

// ===========================================================================
// Lookup
// ===========================================================================

/// The file defining `layout` in a machine directory, if there is one.
pub fn find_data_file(dir: &Path, layout: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut candidates: Vec<PathBuf> = Format::ALL
        .into_iter()
        .map(|format| dir.join(format!("{layout}.{}", format.extension())))
        .filter(|path| path.is_file())
        .collect();

    if candidates.len() > 1 {
        let second = candidates.swap_remove(1);
        let first = candidates.swap_remove(0);
        return Err(DataLoadError::ConflictingFormats { first, second });
    }
    Ok(candidates.pop())
}

/// [`find_data_file`] for layouts every machine must define.
pub fn require_data_file(dir: &Path, layout: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, layout)?.ok_or_else(|| DataLoadError::MissingRequired {
        layout: layout.to_owned(),
        dir: dir.to_path_buf(),
    })
}

/// Read and parse a layout file with the parser its extension selects.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let text = std::fs::read_to_string(path)?;
    format.parse(&text).map_err(|detail| DataLoadError::Parse {
        path: path.to_path_buf(),
        detail,
    })
}

/// Record a group name, failing if the layout already declared it.
pub fn check_duplicate(
    seen: &mut HashSet<String>,
    name: &str,
    location: &str,
) -> Result<(), DataLoadError> {
    if !seen.insert(name.to_owned()) {
        return Err(DataLoadError::DuplicateName {
            location: location.to_owned(),
            name: name.to_owned(),
        });
    }
    Ok(())
}
