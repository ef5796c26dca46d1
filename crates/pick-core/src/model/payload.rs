//! Payloads que viajan de un step al siguiente. Todos son inmutables una vez
//! producidos: el engine los guarda por valor en el contexto del run.
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hashing::hash_str;

/// Periodo lógico de la competición (temporada + semana).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub season: String,
    pub week: u32,
}

impl Period {
    pub fn new(season: impl Into<String>, week: u32) -> Self {
        Self { season: season.into(),
               week }
    }

    /// Clave estable apta para nombres de fichero: `2024-2025-week-3`.
    /// Si la temporada trae caracteres fuera de `[A-Za-z0-9-]` se sustituyen
    /// por `_` y se añade un sufijo con el hash de la temporada original, así
    /// `2024/25` y `2024_25` no comparten marcador.
    pub fn key(&self) -> String {
        let safe = |c: char| c.is_ascii_alphanumeric() || c == '-';
        if self.season.chars().all(safe) && !self.season.is_empty() {
            return format!("{}-week-{}", self.season, self.week);
        }
        let season: String = self.season.chars().map(|c| if safe(c) { c } else { '_' }).collect();
        let digest = hash_str(&self.season);
        format!("{season}_{}-week-{}", &digest[..16], self.week)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/week-{}", self.season, self.week)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub away_team: String,
    pub home_team: String,
    #[serde(default)]
    pub game_time: Option<String>,
    /// Datos auxiliares del sitio (odds, expert picks); el core no los lee.
    #[serde(default)]
    pub details: Value,
}

impl Matchup {
    pub fn new(away_team: impl Into<String>, home_team: impl Into<String>) -> Self {
        Self { away_team: away_team.into(),
               home_team: home_team.into(),
               game_time: None,
               details: Value::Null }
    }

    pub fn involves(&self, team: &str) -> bool {
        self.away_team == team || self.home_team == team
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupSet {
    pub period: Period,
    pub matchups: Vec<Matchup>,
}

impl MatchupSet {
    pub fn len(&self) -> usize {
        self.matchups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchups.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub away_team: String,
    pub home_team: String,
    pub winner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionSet {
    pub period: Period,
    pub picks: Vec<Pick>,
}

impl PredictionSet {
    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    /// Verifica que haya exactamente un pick por matchup, en el mismo orden,
    /// y que cada ganador sea uno de los dos equipos del partido.
    pub fn check_against(&self, matchups: &MatchupSet) -> Result<(), String> {
        if self.period != matchups.period {
            return Err(format!("picks are for {} but matchups are for {}", self.period, matchups.period));
        }
        if self.picks.len() != matchups.len() {
            return Err(format!("expected {} picks, got {}", matchups.len(), self.picks.len()));
        }
        for (i, (pick, game)) in self.picks.iter().zip(&matchups.matchups).enumerate() {
            if pick.away_team != game.away_team || pick.home_team != game.home_team {
                return Err(format!("pick {} is for {} @ {}, expected {} @ {}",
                                   i + 1,
                                   pick.away_team,
                                   pick.home_team,
                                   game.away_team,
                                   game.home_team));
            }
            if !game.involves(&pick.winner) {
                return Err(format!("pick {} names {} who is not playing in {} @ {}",
                                   i + 1,
                                   pick.winner,
                                   game.away_team,
                                   game.home_team));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub period: Period,
    pub picks_submitted: usize,
    pub submitted_at: DateTime<Utc>,
    /// Identificador de confirmación del sitio, si lo hay.
    #[serde(default)]
    pub confirmation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewArtifact {
    pub period: Period,
    pub files: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matchups() -> MatchupSet {
        MatchupSet { period: Period::new("2024-2025", 3),
                     matchups: vec![Matchup::new("SEAHAWKS", "LIONS"), Matchup::new("RAVENS", "CHIEFS")] }
    }

    fn pick(away: &str, home: &str, winner: &str) -> Pick {
        Pick { away_team: away.into(),
               home_team: home.into(),
               winner: winner.into() }
    }

    #[test]
    fn period_key_is_filename_safe() {
        assert_eq!(Period::new("2024-2025", 3).key(), "2024-2025-week-3");
        let odd = Period::new("2024/25 season", 1).key();
        assert!(odd.starts_with("2024_25_season_") && odd.ends_with("-week-1"), "{odd}");
        assert!(odd.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn seasons_that_sanitize_alike_get_distinct_keys() {
        let slash = Period::new("2024/25", 1).key();
        let underscore = Period::new("2024_25", 1).key();
        assert_ne!(slash, underscore);
        assert_eq!(slash, Period::new("2024/25", 1).key());
        assert_ne!(Period::new("", 1).key(), Period::new("_", 1).key());
        assert_eq!(Period::new("2024-2025", 3).to_string(), "2024-2025/week-3");
    }

    #[test]
    fn prediction_check_accepts_one_pick_per_game() {
        let picks = PredictionSet { period: Period::new("2024-2025", 3),
                                    picks: vec![pick("SEAHAWKS", "LIONS", "SEAHAWKS"), pick("RAVENS", "CHIEFS", "CHIEFS")] };
        assert_eq!(picks.check_against(&matchups()), Ok(()));
    }

    #[test]
    fn prediction_check_rejects_wrong_count_and_foreign_winner() {
        let short = PredictionSet { period: Period::new("2024-2025", 3),
                                    picks: vec![pick("SEAHAWKS", "LIONS", "SEAHAWKS")] };
        assert!(short.check_against(&matchups()).unwrap_err().contains("expected 2 picks"));

        let foreign = PredictionSet { period: Period::new("2024-2025", 3),
                                      picks: vec![pick("SEAHAWKS", "LIONS", "SEAHAWKS"), pick("RAVENS", "CHIEFS", "VIKINGS")] };
        assert!(foreign.check_against(&matchups()).unwrap_err().contains("VIKINGS"));
    }
}
