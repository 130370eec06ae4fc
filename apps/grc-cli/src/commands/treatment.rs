// treatment.rs: Treatment subcommands (list, extend, approve, close).

use clap::Subcommand;
use grc_daemon::{AppState, GrcConfig};
use grc_register::ClosureApproval;

use super::or_dash;

#[derive(Subcommand)]
pub enum TreatmentCommands {
    /// List the treatments of a risk.
    List {
        /// Risk ID.
        risk_id: String,
    },
    /// Request a due-date extension.
    Extend {
        risk_id: String,
        treatment_id: String,
        /// New due date (YYYY-MM-DD), must be in the future.
        #[arg(long)]
        date: String,
        /// Why the extension is needed.
        #[arg(long)]
        justification: String,
    },
    /// Approve one extension request by its position (0-based).
    Approve {
        risk_id: String,
        treatment_id: String,
        index: usize,
        #[arg(long)]
        approver: String,
    },
    /// Decide the closure gate (Approved or Rejected).
    Close {
        risk_id: String,
        treatment_id: String,
        decision: String,
        #[arg(long)]
        approver: String,
    },
}

pub fn execute(cmd: &TreatmentCommands, config: &GrcConfig) -> anyhow::Result<()> {
    let state = super::open(config)?;

    match cmd {
        TreatmentCommands::List { risk_id } => list_treatments(&state, risk_id),
        TreatmentCommands::Extend {
            risk_id,
            treatment_id,
            date,
            justification,
        } => extend_treatment(&state, risk_id, treatment_id, date, justification),
        TreatmentCommands::Approve {
            risk_id,
            treatment_id,
            index,
            approver,
        } => approve_extension(&state, risk_id, treatment_id, *index, approver),
        TreatmentCommands::Close {
            risk_id,
            treatment_id,
            decision,
            approver,
        } => close_treatment(&state, risk_id, treatment_id, decision, approver),
    }
}

fn list_treatments(state: &AppState, risk_id: &str) -> anyhow::Result<()> {
    if state.store.get_risk(risk_id)?.is_none() {
        anyhow::bail!("Risk not found: {}", risk_id);
    }
    let treatments = state.store.list_treatments(risk_id)?;
    if treatments.is_empty() {
        println!("No treatments for {}.", risk_id);
        return Ok(());
    }

    println!(
        "{:<18} {:<9} {:<11} {:<4} OWNER",
        "ID", "CLOSURE", "DUE", "EXT"
    );
    println!("{}", "-".repeat(60));
    for t in &treatments {
        let due = t
            .extended_due_date
            .or(t.due_date)
            .map(|d| d.format("%Y-%m-%d").to_string());
        println!(
            "{:<18} {:<9} {:<11} {:<4} {}",
            t.treatment_id,
            t.closure_approval,
            or_dash(due.as_deref()),
            t.number_of_extensions,
            or_dash(t.owner.as_deref())
        );
        for (i, ext) in t.extensions.iter().enumerate() {
            println!(
                "    #{} -> {} ({}) {}",
                i,
                ext.extended_due_date.format("%Y-%m-%d"),
                ext.approver,
                ext.justification
            );
        }
    }
    Ok(())
}

fn extend_treatment(
    state: &AppState,
    risk_id: &str,
    treatment_id: &str,
    date: &str,
    justification: &str,
) -> anyhow::Result<()> {
    let (treatment, extension) =
        state
            .lifecycle
            .request_extension(risk_id, treatment_id, date, justification)?;
    println!(
        "Extension to {} requested for {} ({} so far, awaiting approval)",
        extension.extended_due_date.format("%Y-%m-%d"),
        treatment.treatment_id,
        treatment.number_of_extensions
    );
    Ok(())
}

fn approve_extension(
    state: &AppState,
    risk_id: &str,
    treatment_id: &str,
    index: usize,
    approver: &str,
) -> anyhow::Result<()> {
    let extension = state
        .lifecycle
        .approve_extension(risk_id, treatment_id, index, approver)?;
    println!(
        "Extension #{} on {} approved by {}",
        index, treatment_id, extension.approver
    );
    Ok(())
}

fn close_treatment(
    state: &AppState,
    risk_id: &str,
    treatment_id: &str,
    decision: &str,
    approver: &str,
) -> anyhow::Result<()> {
    let decision: ClosureApproval = decision.parse()?;
    let treatment = state
        .lifecycle
        .decide_closure(risk_id, treatment_id, decision, approver)?;
    println!(
        "Closure of {} {} by {}",
        treatment.treatment_id,
        treatment.closure_approval.as_str().to_lowercase(),
        or_dash(treatment.closure_approved_by.as_deref())
    );
    Ok(())
}
