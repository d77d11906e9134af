//! Command-line front end.
//!
//! Stands in for the form UI: it gathers the raw field values, hands them to
//! the [`RegistrationPipeline`] and renders the outcome.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use console::style;

use crate::config::RegistrationConfig;
use crate::error::{RegistrationError, Result};
use crate::identifier::SeedSource;
use crate::models::{Department, Gender, RegistrationForm};
use crate::pipeline::{Clock, RegistrationPipeline, Submission, SystemClock};
use crate::validation::{self, FieldError};

/// Student registration - validate, identify and store new students.
#[derive(Parser)]
#[command(name = "student-registration")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Append log path (default: $STUDENTS_CSV_PATH or students.csv)
    #[arg(long, global = true)]
    pub csv: Option<PathBuf>,

    /// PostgreSQL connection URL (default: $DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate and register a new student.
    Register(FormArgs),

    /// Check the form fields without registering anything.
    Validate(FormArgs),

    /// Show the identifier the next registration would receive.
    NextId,
}

/// Raw form fields. Anything left out counts as empty or unselected.
#[derive(Args, Debug, Default)]
pub struct FormArgs {
    #[arg(long, default_value = "")]
    pub first_name: String,

    #[arg(long, default_value = "")]
    pub last_name: String,

    #[arg(long, default_value = "")]
    pub email: String,

    #[arg(long, default_value = "")]
    pub confirm_email: String,

    #[arg(long, default_value = "")]
    pub password: String,

    #[arg(long, default_value = "")]
    pub confirm_password: String,

    #[arg(long)]
    pub birth_year: Option<i32>,

    /// Month number, 1-12
    #[arg(long)]
    pub birth_month: Option<u32>,

    #[arg(long)]
    pub birth_day: Option<u32>,

    /// M or F
    #[arg(long)]
    pub gender: Option<Gender>,

    /// Civil, CSE, Electrical, E&C or Mechanical
    #[arg(long)]
    pub department: Option<Department>,
}

impl From<FormArgs> for RegistrationForm {
    fn from(args: FormArgs) -> Self {
        RegistrationForm {
            first_name: args.first_name,
            last_name: args.last_name,
            email: args.email,
            confirm_email: args.confirm_email,
            password: args.password,
            confirm_password: args.confirm_password,
            birth_year: args.birth_year,
            birth_month: args.birth_month,
            birth_day: args.birth_day,
            gender: args.gender,
            department: args.department,
        }
    }
}

impl Cli {
    /// Apply command-line overrides on top of `base`.
    pub fn config(&self, base: RegistrationConfig) -> RegistrationConfig {
        let mut config = base;
        if let Some(csv) = &self.csv {
            config.csv_path = csv.clone();
        }
        if let Some(url) = &self.database_url {
            config = config.with_database_url(url.clone());
        }
        config
    }
}

/// Run the CLI.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config(RegistrationConfig::from_env());
    let json = cli.json;

    match cli.command {
        Commands::Register(form) => register_command(&config, form.into(), json).await,
        Commands::Validate(form) => validate_command(form.into(), json),
        Commands::NextId => next_id_command(&config, json).await,
    }
}

async fn register_command(
    config: &RegistrationConfig,
    form: RegistrationForm,
    json: bool,
) -> Result<()> {
    let mut pipeline = RegistrationPipeline::open(config).await;
    let submission = pipeline.register(&form).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&submission)?);
    }

    match submission {
        Submission::Rejected { errors } => {
            if !json {
                print_errors(&errors);
            }
            Err(RegistrationError::Rejected { errors })
        }
        Submission::Unallocated { error } => Err(error.into()),
        Submission::Registered(result) => {
            if !json {
                println!("{}", style("Student registered successfully!").green().bold());
                println!("  Student ID: {}", style(&result.student_id).cyan());
                println!("  {}", result.summary);
                if let Some(warning) = result.outcome.warning() {
                    println!("  {} {}", style("Warning:").yellow().bold(), warning);
                }
            }
            Ok(())
        }
    }
}

fn validate_command(form: RegistrationForm, json: bool) -> Result<()> {
    let errors = validation::validate(&form, SystemClock.today())
        .err()
        .unwrap_or_default();

    if json {
        println!("{}", serde_json::to_string_pretty(&errors)?);
    } else if errors.is_empty() {
        println!("{}", style("All fields are valid").green().bold());
    } else {
        print_errors(&errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(RegistrationError::Rejected { errors })
    }
}

async fn next_id_command(config: &RegistrationConfig, json: bool) -> Result<()> {
    let pipeline = RegistrationPipeline::open(config).await;
    let next = pipeline.next_id();
    let source = pipeline.allocator().source();

    if json {
        let value = serde_json::json!({ "next_id": next, "seed_source": source });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let source = match source {
        SeedSource::Relational => "database",
        SeedSource::AppendLog => "CSV file",
        SeedSource::None => "nothing (no backend readable)",
    };
    match next {
        Some(next) => {
            println!("Next student ID: {} (seeded from {source})", style(next).cyan());
        }
        None => println!(
            "{} (seeded from {source})",
            style("No student IDs left for this year").red()
        ),
    }
    Ok(())
}

fn print_errors(errors: &[FieldError]) {
    println!("{}", style("Validation Errors:").red().bold());
    println!();
    for error in errors {
        println!("- {error}");
    }
}
