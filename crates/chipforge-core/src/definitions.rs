use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::{
    model::{
        ChannelDef, DefinitionError, InstrumentBank, InstrumentDef, Note, Pattern, SfxDef, Track,
    },
    notation::parse_cell,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Sfx,
    Track,
    Instrument,
}

impl AssetKind {
    fn marker(self) -> &'static str {
        match self {
            Self::Sfx => "sfx",
            Self::Track => "track",
            Self::Instrument => "instrument",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

/// A definition file name split into asset name, kind and encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionPath {
    pub name: String,
    pub kind: AssetKind,
    format: Format,
}

impl DefinitionPath {
    /// Recognizes `<name>.<kind>.toml` and `<name>.<kind>.json`.
    pub fn parse(path: &Path) -> Result<Self, DefinitionError> {
        let file_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or_default();
        let unknown = || DefinitionError::UnknownAssetKind(path.display().to_string());

        let (stem, format) = if let Some(stem) = file_name.strip_suffix(".toml") {
            (stem, Format::Toml)
        } else if let Some(stem) = file_name.strip_suffix(".json") {
            (stem, Format::Json)
        } else {
            return Err(unknown());
        };

        [AssetKind::Sfx, AssetKind::Track, AssetKind::Instrument]
            .into_iter()
            .find_map(|kind| {
                stem.strip_suffix(kind.marker())
                    .and_then(|rest| rest.strip_suffix('.'))
                    .filter(|name| !name.is_empty())
                    .map(|name| Self {
                        name: name.to_string(),
                        kind,
                        format,
                    })
            })
            .ok_or_else(unknown)
    }
}

/// Track as written on disk: note cells are still text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFile {
    pub tempo: f64,
    #[serde(default)]
    pub ticks_per_beat: i64,
    #[serde(default)]
    pub channels: Vec<ChannelDef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub instruments: InstrumentBank,
    #[serde(default)]
    pub patterns: BTreeMap<String, PatternFile>,
    #[serde(default)]
    pub sequence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticks: Option<usize>,
    pub rows: Vec<Vec<String>>,
}

impl TryFrom<TrackFile> for Track {
    type Error = DefinitionError;

    fn try_from(file: TrackFile) -> Result<Self, Self::Error> {
        let channel_count = file.channels.len();
        let mut patterns = BTreeMap::new();

        for (name, pattern) in file.patterns {
            let rows = pattern
                .rows
                .iter()
                .enumerate()
                .map(|(row, cells)| {
                    cells
                        .iter()
                        .enumerate()
                        .map(|(column, cell)| {
                            parse_cell(cell).map_err(|source| DefinitionError::NoteCell {
                                pattern: name.clone(),
                                row,
                                column,
                                source,
                            })
                        })
                        .collect::<Result<Vec<Note>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?;

            let ticks = pattern.ticks.unwrap_or(rows.len());
            let pattern = Pattern::with_ticks(&name, ticks, rows, channel_count)?;
            patterns.insert(name, pattern);
        }

        // Non-positive ticks per beat falls back to the default.
        let ticks_per_beat = u32::try_from(file.ticks_per_beat.max(0)).unwrap_or(0);
        let track = Track::new(
            file.tempo,
            ticks_per_beat,
            file.channels,
            patterns,
            file.sequence,
        )?;
        Ok(track.with_instruments(file.instruments))
    }
}

fn read_definition<T: DeserializeOwned>(path: &Path) -> Result<T, DefinitionError> {
    let format = DefinitionPath::parse(path).map_or(Format::Toml, |parsed| parsed.format);
    let content = fs::read_to_string(path)?;
    let value = match format {
        Format::Toml => toml::from_str(&content)?,
        Format::Json => serde_json::from_str(&content)?,
    };
    Ok(value)
}

#[instrument(fields(path = %path.display()))]
pub fn load_sfx(path: &Path) -> Result<SfxDef, DefinitionError> {
    let definition: SfxDef = read_definition(path)?;
    definition.validate()?;
    debug!(voices = definition.voices.len(), "sfx definition loaded");
    Ok(definition)
}

#[instrument(fields(path = %path.display()))]
pub fn load_track(path: &Path) -> Result<Track, DefinitionError> {
    let file: TrackFile = read_definition(path)?;
    let track = Track::try_from(file)?;
    debug!(
        ticks = track.total_ticks(),
        channels = track.channels().len(),
        "track definition loaded"
    );
    Ok(track)
}

#[instrument(fields(path = %path.display()))]
pub fn load_instrument(path: &Path) -> Result<InstrumentDef, DefinitionError> {
    read_definition(path)
}

/// Every definition file under `directory`, sorted by path.
#[instrument(fields(directory = %directory.display()))]
pub fn scan_definitions(directory: &Path) -> Vec<(PathBuf, DefinitionPath)> {
    let mut found = Vec::new();
    for entry in WalkDir::new(directory).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(?error, "ignoring unreadable entry while scanning definitions");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(parsed) = DefinitionPath::parse(entry.path()) {
            found.push((entry.path().to_path_buf(), parsed));
        }
    }

    found.sort_by(|left, right| left.0.cmp(&right.0));
    debug!(count = found.len(), "definition scan complete");
    found
}

/// Serializes a definition as pretty TOML.
pub fn to_toml<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(value)?)
}
