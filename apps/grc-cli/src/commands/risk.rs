// risk.rs: Risk subcommands (list, show, advance).

use clap::Subcommand;
use grc_daemon::{AppState, GrcConfig};
use grc_register::RiskPhase;

use super::or_dash;

#[derive(Subcommand)]
pub enum RiskCommands {
    /// List risks in the register.
    List {
        /// Only risks in this phase (e.g., "Treatment").
        #[arg(long)]
        phase: Option<String>,
    },
    /// Show one risk and its treatments.
    Show {
        /// Risk ID (e.g., RISK-001).
        id: String,
        /// Print the stored documents as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Move a risk to its next phase.
    Advance {
        /// Risk ID.
        id: String,
        /// Target phase (e.g., "Analysis").
        phase: String,
    },
}

pub fn execute(cmd: &RiskCommands, config: &GrcConfig) -> anyhow::Result<()> {
    let state = super::open(config)?;

    match cmd {
        RiskCommands::List { phase } => list_risks(&state, phase.as_deref()),
        RiskCommands::Show { id, json } => show_risk(&state, id, *json),
        RiskCommands::Advance { id, phase } => advance_risk(&state, id, phase),
    }
}

fn list_risks(state: &AppState, phase: Option<&str>) -> anyhow::Result<()> {
    let filter = phase.map(str::parse::<RiskPhase>).transpose()?;
    let risks: Vec<_> = state
        .store
        .list_risks()?
        .into_iter()
        .filter(|r| filter.map_or(true, |p| p == r.current_phase))
        .collect();

    if risks.is_empty() {
        println!("No risks found.");
        return Ok(());
    }

    println!("{:<12} {:<16} {:<8} STATEMENT", "ID", "PHASE", "RATING");
    println!("{}", "-".repeat(72));
    for risk in &risks {
        let rating = risk.rating().map(|r| r.to_string());
        println!(
            "{:<12} {:<16} {:<8} {}",
            risk.risk_id,
            risk.current_phase,
            or_dash(rating.as_deref()),
            truncate(&risk.statement, 40)
        );
    }
    println!();
    println!("{} risk(s) total.", risks.len());
    Ok(())
}

fn show_risk(state: &AppState, id: &str, json: bool) -> anyhow::Result<()> {
    let risk = state
        .store
        .get_risk(id)?
        .ok_or_else(|| anyhow::anyhow!("Risk not found: {}", id))?;
    let treatments = state.store.list_treatments(id)?;

    if json {
        let doc = serde_json::json!({ "risk": risk, "treatments": treatments });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Risk:          {}", risk.risk_id);
    println!("Phase:         {}", risk.current_phase);
    println!("Statement:     {}", risk.statement);
    println!("Threat:        {}", or_dash(risk.threat.as_deref()));
    println!("Vulnerability: {}", or_dash(risk.vulnerability.as_deref()));
    println!("Owner:         {}", or_dash(risk.owner.as_deref()));
    if let Some(rating) = risk.rating() {
        println!("Rating:        {}", rating);
    }
    println!("Updated:       {}", risk.updated_at.format("%Y-%m-%d %H:%M"));

    println!();
    if treatments.is_empty() {
        println!("No treatments.");
    } else {
        println!("Treatments:");
        for t in &treatments {
            println!(
                "  {:<18} {:<9} ext={} {}",
                t.treatment_id,
                t.closure_approval,
                t.number_of_extensions,
                truncate(&t.description, 40)
            );
        }
    }
    Ok(())
}

fn advance_risk(state: &AppState, id: &str, phase: &str) -> anyhow::Result<()> {
    let to: RiskPhase = phase.parse()?;
    let risk = state.lifecycle.advance_risk_phase(id, to)?;
    println!("Risk {} moved to {}", risk.risk_id, risk.current_phase);
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grc_register::Risk;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AppState) {
        let project = TempDir::new().unwrap();
        let config = GrcConfig::for_project(project.path());
        let state = super::super::open(&config).unwrap();
        (project, state)
    }

    #[test]
    fn advance_moves_risk_one_phase() {
        let (_project, state) = setup();
        state
            .store
            .insert_risk(&Risk::new("RISK-001", "Backups untested").in_phase(RiskPhase::Identification))
            .unwrap();

        advance_risk(&state, "RISK-001", "Analysis").unwrap();

        let risk = state.store.get_risk("RISK-001").unwrap().unwrap();
        assert_eq!(risk.current_phase, RiskPhase::Analysis);
    }

    #[test]
    fn advance_rejects_skipping_phases() {
        let (_project, state) = setup();
        state
            .store
            .insert_risk(&Risk::new("RISK-001", "Backups untested").in_phase(RiskPhase::Identification))
            .unwrap();

        assert!(advance_risk(&state, "RISK-001", "Closed").is_err());
        let risk = state.store.get_risk("RISK-001").unwrap().unwrap();
        assert_eq!(risk.current_phase, RiskPhase::Identification);
    }

    #[test]
    fn list_rejects_unknown_phase_filter() {
        let (_project, state) = setup();
        assert!(list_risks(&state, Some("Sideways")).is_err());
        list_risks(&state, Some("Draft")).unwrap();
    }

    #[test]
    fn show_missing_risk_is_an_error() {
        let (_project, state) = setup();
        assert!(show_risk(&state, "RISK-404", false).is_err());
        assert!(show_risk(&state, "RISK-404", true).is_err());
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
