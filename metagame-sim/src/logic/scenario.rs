use anyhow::{Context, Result, ensure};
use metagame_core::{
    MatchupMatrix, MatchupModel, MatchupTable, Metagame, MonteCarloConfig, PopularityTable,
    TournamentConfig,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const DEMO_SCENARIO: &str = include_str!("../../assets/demo_scenario.json");

/// A metagame plus everything needed to simulate events over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "Scenario::default_name")]
    pub name: String,
    /// `{archetype: {subarchetype: weight}}`, `""` for no subarchetype.
    pub archetypes: PopularityTable,
    /// `{archetype: {sub: {archetype: {sub: p}}}}`; missing pairs are even.
    #[serde(default)]
    pub matchups: MatchupTable,
    #[serde(default)]
    pub tournament: TournamentConfig,
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,
}

impl Scenario {
    fn default_name() -> String {
        "Unnamed scenario".to_string()
    }

    /// Built-in demo scenario.
    pub fn demo() -> Result<Self> {
        Self::from_json(DEMO_SCENARIO).context("embedded demo scenario is invalid")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(json).context("failed to parse scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in scenario {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.archetypes.is_empty(),
            "scenario `{}` declares no archetypes",
            self.name
        );
        self.tournament
            .validate()
            .context("invalid tournament settings")?;
        self.monte_carlo
            .validate()
            .context("invalid monte carlo settings")?;
        Ok(())
    }

    /// Intern the archetypes and resolve the matchup table.
    pub fn build_model(&self) -> Result<MatchupModel> {
        let meta = Metagame::from_table(&self.archetypes).context("invalid archetype table")?;
        let matrix = MatchupMatrix::from_table(&meta, &self.matchups)
            .context("invalid matchup table")?;
        MatchupModel::new(meta, &matrix).context("matchup table does not fit the metagame")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_scenario_builds_a_model() {
        let scenario = Scenario::demo().expect("demo");
        assert_eq!(scenario.archetypes.len(), 3);
        assert_eq!(scenario.tournament.tracked_cutoffs, vec![8, 16]);
        let model = scenario.build_model().expect("model");
        let meta = model.metagame();
        assert_eq!(meta.variant_count(), 4);
        assert!((meta.total_weight() - 34.0).abs() < 1e-12);
        let aggro = meta.variant("Aggro", "").expect("aggro");
        let midrange = meta.variant("Midrange", "").expect("midrange");
        assert!((model.get_matchup(aggro, midrange) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn minimal_scenario_uses_defaults() {
        let scenario = Scenario::from_json(r#"{"archetypes": {"A": {"": 4}, "B": {"": 4}}}"#)
            .expect("scenario");
        assert_eq!(scenario.name, "Unnamed scenario");
        assert_eq!(scenario.tournament, TournamentConfig::default());
        assert_eq!(scenario.monte_carlo, MonteCarloConfig::default());
        let model = scenario.build_model().expect("model");
        let a = model.metagame().variant("A", "").expect("A");
        let b = model.metagame().variant("B", "").expect("B");
        assert!((model.get_matchup(a, b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_empty_and_unknown_archetypes() {
        let err = Scenario::from_json(r#"{"archetypes": {}}"#).unwrap_err();
        assert!(format!("{err:#}").contains("declares no archetypes"));

        let scenario = Scenario::from_json(
            r#"{"archetypes": {"A": {"": 1}}, "matchups": {"A": {"": {"Z": {"": 0.5}}}}}"#,
        )
        .expect("parses");
        let err = scenario.build_model().unwrap_err();
        assert!(format!("{err:#}").contains("unknown archetype `Z`"));
    }

    #[test]
    fn rejects_invalid_tournament_settings() {
        let err = Scenario::from_json(r#"{"archetypes": {"A": {"": 1}}, "tournament": {"top_cut": 1}}"#)
            .unwrap_err();
        assert!(format!("{err:#}").contains("invalid tournament settings"));
    }
}
