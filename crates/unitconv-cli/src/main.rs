use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use converters::{ConvertRequest, NewHistoryRecord};
use history_store::{HistoryRecord, HistoryStore};
use tracing_subscriber::EnvFilter;
use unit_table::Category;

/// unitconv – length and volume conversions from the command line.
/// Commands:
///   - convert --type length --from meter --to foot --value 3.5
///   - units [--type volume]
///   - history
#[derive(Parser, Debug)]
#[command(name = "unitconv", version, about = "Convert lengths and volumes, keep a short history")]
struct Cli {
    /// History database (same store the API service uses)
    #[arg(long, global = true, env = "DATABASE_URL", default_value = "sqlite://unitconv.db")]
    database_url: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a value between two units of one category
    Convert {
        #[arg(long = "type")]
        category: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, allow_hyphen_values = true)]
        value: f64,
        /// "from" multiplies by from->to, anything else by to->from.
        /// Defaults to "from" here; the HTTP API treats a missing direction as "to".
        #[arg(long, default_value = "from")]
        direction: String,
        /// Also append the conversion to the history store
        #[arg(long)]
        save: bool,
    },

    /// List supported units
    Units {
        #[arg(long = "type")]
        category: Option<String>,
    },

    /// Show the most recent conversions
    History {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Convert { category, from, to, value, direction, save } => {
            let req = ConvertRequest {
                category: Some(category),
                from_unit: Some(from),
                to_unit: Some(to),
                value: Some(serde_json::json!(value)),
                direction: Some(direction),
            };
            let conversion = req.validate()?;
            println!("{}", conversion.result());

            if save {
                let store = open_store(&cli.database_url).await?;
                let id = store.save(&NewHistoryRecord::from(&conversion)).await?;
                store.close().await;
                eprintln!("✓ saved as #{id}");
            }
        }

        Commands::Units { category } => {
            let categories = match category.as_deref() {
                Some(name) => match Category::parse(name) {
                    Some(c) => vec![c],
                    None => bail!("unknown category {name:?} (expected length or volume)"),
                },
                None => Category::ALL.to_vec(),
            };
            for c in categories {
                println!("{c}:");
                for unit in unit_table::units(c) {
                    println!("  {:<12} {}", unit.value, unit.label);
                }
            }
        }

        Commands::History { json } => {
            let store = open_store(&cli.database_url).await?;
            let history = store.recent().await?;
            let total = store.count().await?;
            store.close().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "history": history }))?);
            } else if history.is_empty() {
                eprintln!("no conversions saved yet");
            } else {
                for r in &history {
                    println!("{}", history_line(r));
                }
                eprintln!("showing {} of {}", history.len(), total);
            }
        }
    }

    Ok(())
}

async fn open_store(url: &str) -> Result<HistoryStore> {
    HistoryStore::connect(url)
        .await
        .with_context(|| format!("failed opening history store at {url}"))
}

/// One history row. A "to" record converted toUnit -> fromUnit, so the
/// labels are printed in that order.
fn history_line(r: &HistoryRecord) -> String {
    let (input_unit, result_unit) = match r.direction.as_deref() {
        Some("to") => (&r.to_unit, &r.from_unit),
        _ => (&r.from_unit, &r.to_unit),
    };
    format!(
        "#{:<5} {}  {:<7} {} {} -> {} {}  ({})",
        r.id,
        r.ts.format("%Y-%m-%d %H:%M:%S"),
        r.category,
        r.input_value,
        input_unit,
        r.result,
        result_unit,
        r.direction.as_deref().unwrap_or("-"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(direction: Option<&str>, input_value: f64, result: f64) -> HistoryRecord {
        HistoryRecord {
            id: 7,
            category: "length".into(),
            from_unit: "meter".into(),
            to_unit: "foot".into(),
            input_value,
            result,
            direction: direction.map(str::to_string),
            ts: "2026-10-19T08:30:00.250Z".parse().unwrap(),
        }
    }

    #[test]
    fn forward_record_reads_from_then_to() {
        let line = history_line(&record(Some("from"), 3.5, 11.48294));
        assert!(line.contains("3.5 meter -> 11.48294 foot"), "{line}");
        assert!(line.contains("2026-10-19 08:30:00"), "{line}");
    }

    #[test]
    fn reverse_record_swaps_unit_labels() {
        let line = history_line(&record(Some("to"), 10.0, 3.048));
        assert!(line.contains("10 foot -> 3.048 meter"), "{line}");
        assert!(line.ends_with("(to)"), "{line}");
    }

    #[test]
    fn record_without_direction_keeps_stored_order() {
        let line = history_line(&record(None, 1.0, 3.28084));
        assert!(line.contains("1 meter -> 3.28084 foot"), "{line}");
        assert!(line.ends_with("(-)"), "{line}");
    }
}
