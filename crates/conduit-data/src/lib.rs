pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, LoadedMatch, MatchData, load_game_config, load_match};
