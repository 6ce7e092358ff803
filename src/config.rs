//! Solver settings, loadable from JSON.
use crate::error::PuzzleError;
use crate::heuristics::HeuristicKind;
use crate::pattern_db::Partition;
use crate::solver::SearchLimits;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which searcher [`crate::solver::solve`] runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    #[default]
    IdaStar,
    AStar,
}

/// Everything needed to run one search, minus the puzzle.
///
/// Missing JSON fields take their default, so `{}` is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub algorithm: Algorithm,
    pub heuristic: HeuristicKind,
    /// Tile groups for the disjoint pattern database, replacing the default
    /// partition of the board size.
    pub patterns: Option<Vec<Vec<u8>>>,
    pub max_expansions: Option<u64>,
    pub check_solvability: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            algorithm: Algorithm::IdaStar,
            heuristic: HeuristicKind::Manhattan,
            patterns: None,
            max_expansions: None,
            check_solvability: true,
        }
    }
}

impl SolverConfig {
    /// Reads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PuzzleError> {
        let text = fs::read_to_string(path)?;
        SolverConfig::from_json_str(&text)
    }

    /// # Examples
    /// ```
    /// use npuzzle_solver::config::{Algorithm, SolverConfig};
    /// let config = SolverConfig::from_json_str(r#"{ "algorithm": "a-star" }"#).unwrap();
    /// assert_eq!(config.algorithm, Algorithm::AStar);
    /// assert!(config.check_solvability);
    /// ```
    pub fn from_json_str(text: &str) -> Result<Self, PuzzleError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            max_expansions: self.max_expansions,
            check_solvability: self.check_solvability,
        }
    }

    /// The custom partition, if one is configured.
    pub fn partition(&self) -> Result<Option<Partition>, PuzzleError> {
        self.patterns
            .as_deref()
            .map(Partition::from_tiles)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(SolverConfig::from_json_str("{}").unwrap(), SolverConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = SolverConfig::from_json_str(
            r#"{
                "algorithm": "ida-star",
                "heuristic": "pdb",
                "patterns": [[1, 2, 3, 4], [5, 6, 7, 8]],
                "max_expansions": 1000,
                "check_solvability": false
            }"#,
        )
        .unwrap();
        assert_eq!(config.heuristic, HeuristicKind::DisjointPdb);
        assert_eq!(config.limits().max_expansions, Some(1000));
        assert!(!config.limits().check_solvability);
        assert_eq!(config.partition().unwrap().map(|p| p.patterns().len()), Some(2));
    }

    #[test]
    fn test_bad_config() {
        assert!(matches!(
            SolverConfig::from_json_str(r#"{ "algorithm": "dijkstra" }"#),
            Err(PuzzleError::Config(_))
        ));
        let overlapping = SolverConfig::from_json_str(r#"{ "patterns": [[1, 2], [2, 3]] }"#).unwrap();
        assert!(matches!(
            overlapping.partition(),
            Err(PuzzleError::OverlappingPatterns(2))
        ));
        assert!(matches!(
            SolverConfig::from_json_file("/nonexistent/solver.json"),
            Err(PuzzleError::Io(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("npuzzle-config-{}.json", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{ "heuristic": "linear-conflict", "max_expansions": 5 }}"#).unwrap();
        drop(file);
        let config = SolverConfig::from_json_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.heuristic, HeuristicKind::LinearConflict);
        assert_eq!(config.max_expansions, Some(5));
        assert_eq!(config.algorithm, Algorithm::IdaStar);
    }
}
