// workshop.rs: Workshop subcommands (list, show, add, remove, eligible).

use clap::Subcommand;
use grc_agenda::AgendaRequest;
use grc_daemon::{AppState, GrcConfig};
use grc_register::{AgendaTopic, Workshop};

use super::or_dash;

#[derive(Subcommand)]
pub enum WorkshopCommands {
    /// List workshops by date.
    List,
    /// Show a workshop and its three agenda lists.
    Show {
        /// Workshop ID or legacy `_id`.
        workshop: String,
        /// Print the stored document as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Put a risk on a workshop agenda topic.
    Add {
        /// Workshop ID or legacy `_id`.
        workshop: String,
        /// Agenda topic: extensions, closure, or newRisks.
        topic: String,
        /// Risk ID.
        risk_id: String,
        /// Treatment to discuss (repeat for several). Required for
        /// extensions and closure.
        #[arg(long = "treatment")]
        treatments: Vec<String>,
    },
    /// Take a risk off a workshop agenda topic.
    Remove {
        workshop: String,
        topic: String,
        risk_id: String,
    },
    /// List risks that could still be added to a topic.
    Eligible { workshop: String, topic: String },
}

pub fn execute(cmd: &WorkshopCommands, config: &GrcConfig) -> anyhow::Result<()> {
    let state = super::open(config)?;

    match cmd {
        WorkshopCommands::List => list_workshops(&state),
        WorkshopCommands::Show { workshop, json } => show_workshop(&state, workshop, *json),
        WorkshopCommands::Add {
            workshop,
            topic,
            risk_id,
            treatments,
        } => add_to_agenda(&state, workshop, topic, risk_id, treatments),
        WorkshopCommands::Remove {
            workshop,
            topic,
            risk_id,
        } => remove_from_agenda(&state, workshop, topic, risk_id),
        WorkshopCommands::Eligible { workshop, topic } => eligible_risks(&state, workshop, topic),
    }
}

fn list_workshops(state: &AppState) -> anyhow::Result<()> {
    let workshops = state.store.list_workshops()?;
    if workshops.is_empty() {
        println!("No workshops found.");
        return Ok(());
    }

    println!(
        "{:<14} {:<11} {:<12} {:<6} TITLE",
        "ID", "DATE", "STATUS", "ITEMS"
    );
    println!("{}", "-".repeat(64));
    for w in &workshops {
        println!(
            "{:<14} {:<11} {:<12} {:<6} {}",
            w.id,
            w.date.format("%Y-%m-%d"),
            w.status,
            w.agenda_len(),
            w.title
        );
    }
    Ok(())
}

fn show_workshop(state: &AppState, reference: &str, json: bool) -> anyhow::Result<()> {
    let workshop = state
        .store
        .find_workshop(reference)?
        .ok_or_else(|| anyhow::anyhow!("Workshop not found: {}", reference))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workshop)?);
        return Ok(());
    }

    println!("Workshop:    {}", workshop.id);
    println!("Title:       {}", workshop.title);
    println!("Date:        {}", workshop.date.format("%Y-%m-%d"));
    println!("Status:      {}", workshop.status);
    println!("Facilitator: {}", or_dash(workshop.facilitator.as_deref()));
    for topic in AgendaTopic::ALL {
        print_topic(&workshop, topic);
    }
    Ok(())
}

fn print_topic(workshop: &Workshop, topic: AgendaTopic) {
    let items = workshop.topic(topic);
    println!();
    println!("{} ({}):", topic, items.len());
    for item in items {
        if item.selected_treatments.is_empty() {
            println!("  {}", item.risk_id);
        } else {
            println!("  {} [{}]", item.risk_id, item.selected_treatments.join(", "));
        }
        if !item.outcome.is_empty() {
            println!("    outcome: {}", item.outcome);
        }
    }
}

fn add_to_agenda(
    state: &AppState,
    workshop: &str,
    topic: &str,
    risk_id: &str,
    treatments: &[String],
) -> anyhow::Result<()> {
    let selected = (!treatments.is_empty()).then(|| treatments.to_vec());
    let request = AgendaRequest::from_fields(Some(risk_id), Some(topic), selected)?;
    let addition = state.engine.add_to_agenda(workshop, &request)?;
    println!(
        "Risk {} added to the {} agenda of workshop {}",
        addition.risk_id, addition.topic, addition.workshop_id
    );
    Ok(())
}

fn remove_from_agenda(
    state: &AppState,
    workshop: &str,
    topic: &str,
    risk_id: &str,
) -> anyhow::Result<()> {
    let topic: AgendaTopic = topic.parse()?;
    let item = state.engine.remove_from_agenda(workshop, topic, risk_id)?;
    println!("Risk {} removed from the {} agenda", item.risk_id, topic);
    Ok(())
}

fn eligible_risks(state: &AppState, workshop: &str, topic: &str) -> anyhow::Result<()> {
    let topic: AgendaTopic = topic.parse()?;
    let risks = state.engine.eligible_risks(workshop, topic)?;
    if risks.is_empty() {
        println!("No risks eligible for {}.", topic);
        return Ok(());
    }
    for risk in &risks {
        println!("{:<12} {:<16} {}", risk.risk_id, risk.current_phase, risk.statement);
    }
    Ok(())
}
