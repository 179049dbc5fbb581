use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use symptomcheck_core::config::AppConfig;
use symptomcheck_core::prompt::build_diagnosis_prompt;
use symptomcheck_core::types::{DiagnosisResult, Severity, SymptomRecord};
use symptomcheck_engine::gateway::AiGateway;
use symptomcheck_runtime::config_store::ConfigStore;
use symptomcheck_runtime::defaults::default_app_config;
use symptomcheck_runtime::runtime_gateway::build_gateway_from_config;
use symptomcheck_runtime::secrets::{SecretKey, set_secret};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "symptomcheck",
    about = "Describe symptoms and get an AI-generated assessment (not medical advice)"
)]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, env = "SYMPTOMCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_BASE_URL")]
    base_url: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze symptoms given as NAME:SEVERITY:DURATION[:DESCRIPTION]
    Analyze {
        #[arg(required = true, value_parser = parse_symptom_arg)]
        symptoms: Vec<SymptomRecord>,

        /// Keep asking follow-up questions read from stdin
        #[arg(long)]
        chat: bool,
    },

    /// Extract symptoms from an audio recording
    Extract {
        file: PathBuf,

        /// Analyze the extracted symptoms right away
        #[arg(long)]
        analyze: bool,
    },

    /// Print the diagnosis prompt without calling the API
    Prompt {
        #[arg(value_parser = parse_symptom_arg)]
        symptoms: Vec<SymptomRecord>,
    },

    /// Write the effective config to the --config path
    InitConfig,

    /// Store the Gemini API key in the OS keyring
    SetKey { key: String },
}

fn parse_symptom_arg(s: &str) -> Result<SymptomRecord, String> {
    let mut fields = s.splitn(4, ':');
    let name = fields.next().unwrap_or_default();
    let severity = fields
        .next()
        .ok_or("expected NAME:SEVERITY:DURATION[:DESCRIPTION]")?;
    let duration = fields
        .next()
        .ok_or("expected NAME:SEVERITY:DURATION[:DESCRIPTION]")?;
    let description = fields.next().map(str::to_string);

    let severity: i64 = severity
        .trim()
        .parse()
        .map_err(|_| format!("severity must be a whole number: {severity}"))?;
    let severity = Severity::new(severity).map_err(|e| e.to_string())?;
    SymptomRecord::new(name.trim(), severity, duration.trim(), description)
        .map_err(|e| e.to_string())
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut cfg = match &cli.config {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            ConfigStore::at_path(path).load_or_default()?
        }
        None => default_app_config(),
    };
    if let Some(model) = &cli.model {
        cfg.model = model.clone();
    }
    if let Some(base_url) = &cli.base_url {
        cfg.base_url = base_url.clone();
    }
    Ok(cfg)
}

fn print_diagnosis(d: &DiagnosisResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(d)?);
        return Ok(());
    }

    println!("Possible conditions:");
    for c in &d.possible_conditions {
        println!("  {c}");
    }
    println!();
    println!("Recommended: {}", d.recommended_actions);
    println!(
        "Urgency: {} ({})",
        d.urgency_level,
        d.urgency_level.guidance()
    );
    println!();
    println!("{}", d.additional_notes);
    Ok(())
}

fn print_symptoms(symptoms: &[SymptomRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(symptoms)?);
        return Ok(());
    }
    if symptoms.is_empty() {
        println!("No symptoms recognized.");
    }
    for s in symptoms {
        println!("{}", symptomcheck_core::prompt::format_symptom_line(s));
    }
    Ok(())
}

async fn chat(gateway: &AiGateway) -> anyhow::Result<()> {
    eprintln!("Ask follow-up questions (/reset to start over, /quit or EOF to exit).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("read stdin")? {
        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                gateway.reset_conversation().await;
                eprintln!("Conversation reset.");
            }
            question => match gateway.ask_follow_up(question).await {
                Ok(answer) => println!("{answer}\n"),
                Err(e) => eprintln!("error: {e}"),
            },
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = load_config(&cli)?;

    match &cli.command {
        Command::Prompt { symptoms } => {
            println!("{}", build_diagnosis_prompt(symptoms));
        }
        Command::InitConfig => {
            let path = cli
                .config
                .as_ref()
                .context("--config (or SYMPTOMCHECK_CONFIG) is required")?;
            ConfigStore::at_path(path).save(&cfg)?;
            println!("Wrote {}", path.display());
        }
        Command::SetKey { key } => {
            set_secret(SecretKey::GeminiApiKey, key.trim())?;
            println!("API key stored.");
        }
        Command::Analyze { symptoms, chat: keep_chatting } => {
            let gateway = build_gateway_from_config(&cfg)?;
            let d = gateway.analyze_symptoms(symptoms).await?;
            print_diagnosis(&d, cli.json)?;
            if *keep_chatting {
                chat(&gateway).await?;
            }
        }
        Command::Extract { file, analyze } => {
            let gateway = build_gateway_from_config(&cfg)?;
            let symptoms = gateway.extract_symptoms_from_audio(file).await?;
            print_symptoms(&symptoms, cli.json)?;
            if *analyze && !symptoms.is_empty() {
                let d = gateway.analyze_symptoms(&symptoms).await?;
                print_diagnosis(&d, cli.json)?;
            }
        }
    }

    Ok(())
}
