mod config;
mod service;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use safeguard_alert::{Dispatcher, GeoPoint, Language, TwilioTransport};
use safeguard_core::{ColorRaster, FaceLocator, FaceMatcher, ScoringStrategy, SelectionPolicy};
use safeguard_registry::{NewSubject, SubjectSource, SubjectStore};
use service::{SosOutcome, VerifyOutcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "safeguard", about = "SafeGuard child safety face matching CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a child with a reference photo
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: u32,
        /// Clothing description (e.g., "red jacket")
        #[arg(long)]
        clothing: String,
        /// Where the child was last seen
        #[arg(long)]
        location: String,
        /// Reference photo of the child
        #[arg(long)]
        photo: PathBuf,
    },
    /// Check a sighting photo against the registered child
    Verify {
        #[arg(long)]
        image: PathBuf,
        /// Scoring strategy: lbph or pixel-error
        #[arg(long)]
        strategy: Option<ScoringStrategy>,
        /// Face selection policy: first or largest
        #[arg(long)]
        policy: Option<SelectionPolicy>,
    },
    /// Alert guardians with the child's details and a GPS fix
    Sos {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Voice call language: english or hindi
        #[arg(long)]
        language: Option<Language>,
    },
    /// Print the registered child as JSON
    Latest,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let store = SubjectStore::open(&config.db_path(), &config.upload_dir())
        .context("opening child registry")?;

    match cli.command {
        Commands::Register {
            name,
            age,
            clothing,
            location,
            photo,
        } => {
            let image = image::open(&photo)
                .with_context(|| format!("reading photo {}", photo.display()))?;
            let subject = store.register(
                NewSubject {
                    name,
                    age,
                    clothing,
                    last_location: location,
                },
                &image,
            )?;
            println!("Child registered: {} ({})", subject.name, subject.id);
        }
        Commands::Verify {
            image,
            strategy,
            policy,
        } => {
            let strategy = strategy.unwrap_or(config.scoring);
            let policy = policy.unwrap_or(config.selection_policy);
            let model_path = config.detector_model_path();
            let detector = config
                .detector
                .load(&model_path)
                .with_context(|| format!("loading face detector {}", model_path.display()))?;
            let matcher = FaceMatcher::new(FaceLocator::from_boxed(detector).with_policy(policy), strategy)
                .with_threshold(config.threshold_for(strategy));

            let probe = ColorRaster::open(&image)
                .with_context(|| format!("reading image {}", image.display()))?;
            match service::verify_latest(&store, &matcher, &probe)? {
                VerifyOutcome::NoSubjectEnrolled => println!("No registered child found."),
                VerifyOutcome::Checked { verdict, .. } => {
                    let mark = if verdict.is_match() { "✅" } else { "❌" };
                    println!("{mark} {}", verdict.label);
                }
            }
        }
        Commands::Sos { lat, lon, language } => {
            let location = GeoPoint::new(lat, lon)?;
            let alert_config = config
                .alert
                .clone()
                .context("alerting is not configured (set SAFEGUARD_TWILIO_* variables)")?;
            let transport = TwilioTransport::new(&alert_config)?;
            let dispatcher = Dispatcher::new(alert_config, transport)?;
            let language = language.unwrap_or(config.voice_language);

            match service::raise_sos(&store, &dispatcher, location, language, &chrono::Local::now())? {
                SosOutcome::NoSubjectEnrolled => println!("No child registered."),
                SosOutcome::Dispatched { report, .. } => {
                    if report.all_succeeded() {
                        println!("Parent Alerted Successfully");
                    } else {
                        for failure in report.failures() {
                            println!(
                                "Alert to {} via {} failed: {}",
                                failure.recipient,
                                failure.channel,
                                failure.error.as_deref().unwrap_or("unknown error")
                            );
                        }
                    }
                }
            }
        }
        Commands::Latest => match store.latest()? {
            Some(subject) => println!("{}", serde_json::to_string_pretty(&subject)?),
            None => println!("No child registered."),
        },
    }

    Ok(())
}
