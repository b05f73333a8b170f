use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use hemolink_core::{
    expiry, load_seed_file, temperature, BloodType, ColdChainEngine, ConfigOverrides, CoreConfig,
    EngineSeed, Session, TransferRequest, Urgency,
};
use std::path::PathBuf;
use std::sync::Arc;

const OPERATOR_EMAIL: &str = "admin@hemolink.com";
const OPERATOR_PASSWORD: &str = "demo123";

#[derive(Parser)]
#[command(name = "hemolink")]
#[command(about = "HemoLink cold-chain CLI")]
struct Cli {
    /// YAML seed data (defaults to the built-in demo data)
    #[arg(long, global = true)]
    seed: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an expiry date
    Classify {
        /// Expiry date (YYYY-MM-DD)
        expiry_date: String,
        /// Reference date (defaults to today)
        #[arg(long)]
        today: Option<String>,
    },
    /// Classify a temperature reading in °C
    CheckTemperature {
        #[arg(allow_hyphen_values = true)]
        reading: f64,
    },
    /// List units, earliest expiry first
    Inventory,
    /// Apply a temperature reading to a unit
    Temperature {
        unit_id: String,
        #[arg(allow_hyphen_values = true)]
        reading: f64,
    },
    /// List hospitals and their stock levels
    Hospitals {
        /// Privacy key that reveals per-type stock
        #[arg(long)]
        privacy_key: Option<String>,
    },
    /// Request stock from a hospital
    Transfer {
        /// Source hospital
        hospital_id: String,
        /// Blood type, e.g. O-
        blood_type: String,
        units: u32,
        /// normal, urgent or critical
        #[arg(long, default_value = "normal")]
        urgency: String,
        /// Receiving facility (defaults to the home facility)
        #[arg(long)]
        destination: Option<String>,
    },
}

fn parse_date(value: &str) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    Ok(NaiveDate::parse_from_str(value, "%Y-%m-%d")?)
}

fn open_engine(seed: Option<PathBuf>) -> Result<(ColdChainEngine, Session), Box<dyn std::error::Error>> {
    let cfg = Arc::new(CoreConfig::resolve(ConfigOverrides::from_env())?);
    let today = Utc::now().date_naive();
    let seed = match seed {
        Some(path) => load_seed_file(&path)?.into_seed(today, cfg.shelf_life_days())?,
        None => EngineSeed::demo(today, cfg.shelf_life_days())?,
    };
    let engine = ColdChainEngine::new(cfg, seed)?;
    let session = engine.login(OPERATOR_EMAIL, OPERATOR_PASSWORD, Utc::now())?;
    Ok((engine, session))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let today = Utc::now().date_naive();

    match cli.command {
        Some(Commands::Classify { expiry_date, today: reference }) => {
            let expiry_date = parse_date(&expiry_date)?;
            let reference = match reference {
                Some(d) => parse_date(&d)?,
                None => today,
            };
            let days = expiry::days_to_expiry(expiry_date, reference);
            println!("{} day(s) to expiry: {}", days, expiry::classify(days));
        }
        Some(Commands::CheckTemperature { reading }) => {
            if !reading.is_finite() {
                return Err("reading must be a finite number".into());
            }
            println!("{}°C: {}", reading, temperature::band(reading));
        }
        Some(Commands::Inventory) => {
            let (engine, session) = open_engine(cli.seed)?;
            for s in engine.list_inventory(&session, today)? {
                println!(
                    "{:<8} {:<4} expires {} ({:>3} days, {:<8}) {:>5.1}°C {:<9} at {}",
                    s.unit.id(),
                    s.unit.blood_type(),
                    s.unit.expiry_date(),
                    s.days_to_expiry,
                    s.expiry_class,
                    s.unit.temperature(),
                    s.status,
                    s.unit.location()
                );
            }
        }
        Some(Commands::Temperature { unit_id, reading }) => {
            let (engine, session) = open_engine(cli.seed)?;
            let update = engine.update_temperature(&session, &unit_id, reading, Utc::now())?;
            if update.breached {
                println!("{}: {}°C BREACH, unit is now locked", unit_id, reading);
            } else {
                println!("{}: {}°C {}", unit_id, reading, update.band);
            }
        }
        Some(Commands::Hospitals { privacy_key }) => {
            let (engine, session) = open_engine(cli.seed)?;
            if let Some(key) = privacy_key {
                if !engine.unlock_privacy(session.token(), &key, Utc::now())? {
                    eprintln!("Privacy key rejected, stock detail stays hidden");
                }
            }
            let session = engine.session(session.token(), Utc::now())?;
            for h in engine.list_hospitals(&session)? {
                println!("{:<5} {:<28} {:>4} units  {}", h.id, h.name, h.total_units, h.status);
                if let Some(stock) = h.stock {
                    let detail: Vec<String> =
                        stock.iter().map(|(bt, n)| format!("{}={}", bt, n)).collect();
                    println!("      {}", detail.join(" "));
                }
            }
        }
        Some(Commands::Transfer {
            hospital_id,
            blood_type,
            units,
            urgency,
            destination,
        }) => {
            let (engine, session) = open_engine(cli.seed)?;
            let request = TransferRequest {
                hospital_id,
                blood_type: blood_type.parse::<BloodType>()?,
                units,
                urgency: urgency.parse::<Urgency>()?,
            };
            let record =
                engine.request_transfer(&session, &request, destination.as_deref(), Utc::now())?;
            println!(
                "Transfer {} submitted: {} x {} from {} to {} ({})",
                record.id,
                record.units,
                record.blood_type,
                record.source_id,
                record.destination_id,
                record.urgency
            );
            if !record.unit_ids.is_empty() {
                println!("Moved units: {}", record.unit_ids.join(", "));
            }
        }
        None => {
            println!("Use 'hemolink --help' for commands");
        }
    }

    Ok(())
}
