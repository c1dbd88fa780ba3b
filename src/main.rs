//! rolerag - CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use rolerag::{
    access::AccessPolicy,
    cli::{Args, Commands, Verbosity},
    compose::{AnswerComposer, ExtractiveComposer, OllamaComposer},
    config::Config,
    documents::DocumentLoader,
    index::{MemoryIndex, OllamaEmbedder, QdrantIndex, VectorIndex},
    repl::{print_answer, ChatSession},
    Pipeline,
};

fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    if let Some(dir) = &args.data_dir {
        config.paths.data_dir = dir.display().to_string();
    }
    Ok(config)
}

async fn build_index(args: &Args, config: &Config) -> Result<Arc<dyn VectorIndex>> {
    match (&config.qdrant, args.offline) {
        (Some(qdrant), false) => {
            let embedder = OllamaEmbedder::new(
                &config.ollama_url(),
                &config.ollama.embedding_model,
                Duration::from_secs(config.ollama.timeout_secs),
            )?;
            let index = QdrantIndex::connect(qdrant, Arc::new(embedder))
                .await
                .with_context(|| format!("Could not reach Qdrant at {}", qdrant.url))?;
            tracing::info!(collection = index.collection(), "using qdrant index");
            Ok(Arc::new(index))
        }
        _ => {
            tracing::info!("using in-memory index");
            Ok(Arc::new(MemoryIndex::new()))
        }
    }
}

async fn build_composer(args: &Args, config: &Config) -> Result<Arc<dyn AnswerComposer>> {
    if args.offline {
        return Ok(Arc::new(ExtractiveComposer::new()));
    }

    let composer = OllamaComposer::new(
        &config.ollama_url(),
        &config.ollama.model,
        Duration::from_secs(config.ollama.timeout_secs),
    )?;

    if !composer.health_check().await {
        eprintln!(
            "{} Ollama is not reachable at {}. Start it with: ollama serve (or pass --offline)",
            "Warning:".yellow(),
            config.ollama_url()
        );
    }

    Ok(Arc::new(composer))
}

/// Build the pipeline and bulk load the document directory
async fn build_pipeline(args: &Args, config: &Config) -> Result<Pipeline> {
    let policy = AccessPolicy::from_config(&config.access)?;
    let index = build_index(args, config).await?;
    let composer = build_composer(args, config).await?;
    let pipeline = Pipeline::new(policy, index, composer, config.retrieval.clone());

    let loader = DocumentLoader::new(config.data_dir());

    let pb = if args.verbosity().show_progress() {
        ProgressBar::new(0)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Indexing [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let loaded = pipeline
        .load_all_with(&loader, |doc, total| {
            pb.set_length(total as u64);
            pb.set_message(doc.source.clone());
            pb.inc(1);
        })
        .await
        .with_context(|| format!("Failed to load documents from {}", loader.data_dir().display()))?;
    pb.finish_and_clear();

    tracing::info!(documents = loaded, "corpus loaded");
    Ok(pipeline)
}

async fn run_ask(
    args: &Args,
    config: &Config,
    role: &str,
    question: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let pipeline = build_pipeline(args, config).await?;

    let answer = match limit {
        Some(limit) => pipeline.ask_with_limit(question, role, limit).await?,
        None => pipeline.ask(question, role).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print_answer(&answer);
    }
    Ok(())
}

async fn run_chat(args: &Args, config: &Config, role: &str) -> Result<()> {
    let pipeline = build_pipeline(args, config).await?;
    let history = dirs::home_dir().map(|home| home.join(".rolerag_history"));

    let mut session = ChatSession::new(Arc::new(pipeline), role, history)?;
    session.run().await
}

async fn list_docs(args: &Args, config: &Config, role: &str) -> Result<()> {
    let pipeline = build_pipeline(args, config).await?;
    let docs = pipeline.documents_for(role);

    if docs.is_empty() {
        println!("No documents accessible to {}.", role);
        return Ok(());
    }

    println!("\n{}", format!("Documents for {} ({}):", role, docs.len()).bold().cyan());
    for doc in docs {
        println!("  {:<8} {:<12} {}", doc.id.to_string().cyan(), doc.department, doc.source);
    }
    println!();
    Ok(())
}

fn show_roles(config: &Config) -> Result<()> {
    let policy = AccessPolicy::from_config(&config.access)?;

    println!("\n{}", "Roles".bold().cyan());
    for role in policy.roles() {
        let profile = policy.profile(role);
        let mut caps = Vec::new();
        if profile.bypass_filter {
            caps.push("reads all departments");
        }
        if profile.can_ingest {
            caps.push("can upload");
        }
        let departments = policy.departments_for(role).join(", ");
        if caps.is_empty() {
            println!("  {:<12} {}", role.green(), departments);
        } else {
            println!("  {:<12} {} ({})", role.green(), departments, caps.join(", ").yellow());
        }
    }

    println!("\n{}", "Departments".bold().cyan());
    for dept in policy.departments() {
        let roles = policy.allowed_roles(dept)?;
        let marker = if policy.is_universal(dept) { " (universal)" } else { "" };
        println!(
            "  {:<12} {}{}",
            dept.green(),
            roles.into_iter().collect::<Vec<_>>().join(", "),
            marker.dimmed()
        );
    }
    println!();
    Ok(())
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    println!("\n{}", "rolerag configuration".bold().cyan());
    if let Some(path) = args.config.clone().or_else(Config::default_path) {
        println!("  File: {}", path.display());
    }
    println!();
    println!("{}", toml::to_string_pretty(config)?);
    println!("Offline:   {}", if args.offline { "yes" } else { "no" });
    println!("Verbosity: {:?}", args.verbosity());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbosity());

    let config = load_config(&args)?;

    match &args.command {
        Commands::Ask {
            role,
            limit,
            json,
            ..
        } => {
            let question = args.command.question_text().unwrap_or_default();
            run_ask(&args, &config, role, &question, *limit, *json).await?;
        }
        Commands::Chat { role } => run_chat(&args, &config, role).await?,
        Commands::Docs { role } => list_docs(&args, &config, role).await?,
        Commands::Roles => show_roles(&config)?,
        Commands::Config => show_config(&args, &config)?,
    }

    Ok(())
}
