//! Reads match data files and turns them into a ready engine.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, deserialization
//! helpers, and the two entry points: [`load_game_config`] for a single
//! config file and [`load_match`] for a directory holding `game.*` and
//! `board.*`.

use crate::schema::BoardData;
use conduit_core::config::{ConfigError, GameConfig};
use conduit_core::engine::Engine;
use conduit_core::fixed::Fixed64;
use conduit_core::id::{NodeId, PlayerId};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The config parsed but holds values the engine rejects.
    #[error("invalid config in {file}: {source}")]
    InvalidConfig {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The board resolved but could not be built (bad edge, taken start).
    #[error("invalid board in {file}: {detail}")]
    Board { file: PathBuf, detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Look for `{base_name}.ron`, `.toml` or `.json` in `dir`.
///
/// Returns `Ok(None)` if none exists, or `Err(ConflictingFormats)` if more
/// than one does.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }
    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, err: impl std::fmt::Display) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: err.to_string(),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Fail with `DuplicateName` if `name` is already in `map`.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

fn fixed_from(value: f64, what: &str, file: &Path) -> Result<Fixed64, DataLoadError> {
    Fixed64::checked_from_num(value).ok_or_else(|| DataLoadError::Board {
        file: file.to_path_buf(),
        detail: format!("{what} {value} is out of fixed-point range"),
    })
}

// ===========================================================================
// Game config
// ===========================================================================

/// Load and validate a [`GameConfig`] from one file. Missing fields take
/// their defaults.
pub fn load_game_config(path: &Path) -> Result<GameConfig, DataLoadError> {
    let config: GameConfig = deserialize_file(path)?;
    config
        .validate()
        .map_err(|source| DataLoadError::InvalidConfig {
            file: path.to_path_buf(),
            source,
        })?;
    debug!(file = %path.display(), "game config loaded");
    Ok(config)
}

/// Load `game.{ron,toml,json}` from `dir`, or the default config if there is
/// none.
pub fn load_game_config_from_dir(dir: &Path) -> Result<GameConfig, DataLoadError> {
    match find_data_file(dir, "game")? {
        Some(path) => load_game_config(&path),
        None => {
            debug!(dir = %dir.display(), "no game config, using defaults");
            Ok(GameConfig::default())
        }
    }
}

// ===========================================================================
// Matches
// ===========================================================================

/// A config and a board, parsed but not yet built.
#[derive(Debug, Clone)]
pub struct MatchData {
    pub config: GameConfig,
    pub board: BoardData,
    /// Where the board came from, for error messages.
    pub board_file: PathBuf,
}

/// A built engine plus the name tables used to build it.
#[derive(Debug)]
pub struct LoadedMatch {
    pub engine: Engine,
    pub nodes: HashMap<String, NodeId>,
    pub players: HashMap<String, PlayerId>,
}

impl LoadedMatch {
    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.nodes.get(name).copied()
    }

    pub fn player(&self, name: &str) -> Option<PlayerId> {
        self.players.get(name).copied()
    }
}

/// Read `game.*` (optional) and `board.*` (required) from `dir`.
pub fn read_match(dir: &Path) -> Result<MatchData, DataLoadError> {
    let config = load_game_config_from_dir(dir)?;
    let board_file = require_data_file(dir, "board")?;
    let board = deserialize_file(&board_file)?;
    Ok(MatchData {
        config,
        board,
        board_file,
    })
}

/// Read a match directory and build its engine.
pub fn load_match(dir: &Path) -> Result<LoadedMatch, DataLoadError> {
    read_match(dir)?.build()
}

impl MatchData {
    /// Create the engine, add every node and edge, and claim each player's
    /// starting node.
    pub fn build(self) -> Result<LoadedMatch, DataLoadError> {
        let file = self.board_file.as_path();
        let mut engine = Engine::new(self.config).map_err(|source| DataLoadError::InvalidConfig {
            file: file.to_path_buf(),
            source,
        })?;

        let mut nodes: HashMap<String, NodeId> = HashMap::new();
        for node in &self.board.nodes {
            check_duplicate(&nodes, &node.name, file)?;
            let energy = fixed_from(node.energy, "energy of node", file)?;
            if energy < Fixed64::ZERO {
                return Err(DataLoadError::Board {
                    file: file.to_path_buf(),
                    detail: format!("node '{}' has negative energy", node.name),
                });
            }
            let id = engine.add_node(node.kind, energy);
            nodes.insert(node.name.clone(), id);
        }

        for edge in &self.board.edges {
            let a = *resolve_name(&nodes, &edge.a, file, "node")?;
            let b = *resolve_name(&nodes, &edge.b, file, "node")?;
            let length = fixed_from(edge.length, "edge length", file)?;
            engine
                .connect(a, b, length)
                .map_err(|e| DataLoadError::Board {
                    file: file.to_path_buf(),
                    detail: format!("edge '{}' - '{}': {e}", edge.a, edge.b),
                })?;
        }

        let mut players: HashMap<String, PlayerId> = HashMap::new();
        for player in &self.board.players {
            check_duplicate(&players, &player.name, file)?;
            let start = *resolve_name(&nodes, &player.start, file, "node")?;
            let id = engine.add_player(player.name.clone());
            engine
                .claim_initial_node(id, start)
                .map_err(|e| DataLoadError::Board {
                    file: file.to_path_buf(),
                    detail: format!("player '{}': {e}", player.name),
                })?;
            players.insert(player.name.clone(), id);
        }

        info!(
            nodes = nodes.len(),
            edges = self.board.edges.len(),
            players = players.len(),
            "match built"
        );
        Ok(LoadedMatch {
            engine,
            nodes,
            players,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
