//! hybridpdf CLI - PDF to hierarchical JSON with OCR and LLM fallback

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use hybridpdf::pipeline::classify;
use hybridpdf::{
    render, Classification, HierarchicalDocument, HybridPdf, JsonFormat, LlmMode, LlmProvider,
    LlmSettings, LopdfBackend, PipelineConfig, RuleBackend, Tesseract,
};

#[derive(Parser)]
#[command(name = "hybridpdf")]
#[command(version)]
#[command(about = "Convert PDFs to hierarchical JSON using rule-based parsing, OCR and LLM fallback", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert PDF to <name>_parsed.json plus an assets directory
    Convert {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Do not write extracted images
        #[arg(long)]
        no_assets: bool,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Convert PDF to JSON on stdout or a file
    Json {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Show document information and page classification
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args, Clone)]
struct BackendArgs {
    /// LLM provider for the fallback
    #[arg(long, value_enum, env = "LLM_PROVIDER", default_value = "none")]
    llm_provider: ProviderArg,

    /// LLM model name (provider default if not set)
    #[arg(long, env = "LLM_MODEL")]
    llm_model: Option<String>,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Never call the LLM, even for incomplete pages
    #[arg(long, conflicts_with = "force_llm")]
    no_llm_fallback: bool,

    /// Call the LLM on every page
    #[arg(long)]
    force_llm: bool,

    /// OCR language (repeatable, e.g. --ocr-lang eng --ocr-lang deu)
    #[arg(long = "ocr-lang", value_name = "LANG")]
    ocr_lang: Vec<String>,

    /// LLM timeout in seconds
    #[arg(long, value_name = "SECS", default_value = "120")]
    llm_timeout: u64,

    /// Timeout for rule, OCR and image-table calls in seconds (0 disables)
    #[arg(long, value_name = "SECS", default_value = "60")]
    backend_timeout: u64,

    /// Disable OCR
    #[arg(long)]
    no_ocr: bool,

    /// Path to the tesseract executable
    #[arg(long, value_name = "PATH")]
    tesseract: Option<PathBuf>,

    /// Process pages one at a time
    #[arg(long)]
    sequential: bool,

    /// Maximum worker threads (0 = number of CPUs)
    #[arg(long, default_value = "0")]
    workers: usize,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ProviderArg {
    /// No LLM fallback
    None,
    /// Local Ollama server
    Ollama,
    /// Google Gemini API
    Gemini,
}

impl BackendArgs {
    fn config(&self) -> PipelineConfig {
        let mode = if self.no_llm_fallback {
            LlmMode::Disabled
        } else if self.force_llm {
            LlmMode::Always
        } else {
            LlmMode::Fallback
        };

        let mut config = PipelineConfig::new()
            .with_llm_mode(mode)
            .with_llm_timeout_secs(self.llm_timeout)
            .with_backend_timeout((self.backend_timeout > 0).then(|| Duration::from_secs(self.backend_timeout)))
            .with_workers(self.workers);
        if !self.ocr_lang.is_empty() {
            config = config.with_ocr_languages(self.ocr_lang.iter().cloned());
        }
        if self.sequential {
            config = config.sequential();
        }
        config
    }

    fn llm_settings(&self) -> Option<LlmSettings> {
        let provider = match self.llm_provider {
            ProviderArg::None => return None,
            ProviderArg::Ollama => LlmProvider::Ollama,
            ProviderArg::Gemini => LlmProvider::Gemini,
        };
        let mut settings = LlmSettings::new(provider);
        if let Some(model) = &self.llm_model {
            settings = settings.with_model(model.clone());
        }
        if provider == LlmProvider::Ollama {
            settings = settings.with_base_url(self.ollama_url.clone());
        }
        if let Some(key) = &self.gemini_api_key {
            settings = settings.with_api_key(key.clone());
        }
        Some(settings)
    }

    fn builder(&self) -> Result<HybridPdf, Box<dyn std::error::Error>> {
        let mut builder = HybridPdf::rule_based_only().with_config(self.config());

        if !self.no_ocr {
            let mut tesseract = Tesseract::new().with_timeout(self.config().backend_timeout);
            if let Some(path) = &self.tesseract {
                tesseract = tesseract.with_binary(path);
            }
            if tesseract.is_available() {
                let tesseract = Arc::new(tesseract);
                builder = builder.with_ocr(tesseract.clone()).with_image_tables(tesseract);
            } else {
                log::warn!("tesseract not found; scanned pages will be marked incomplete");
            }
        }

        if let Some(settings) = self.llm_settings() {
            builder = builder.with_llm_settings(&settings)?;
        }
        Ok(builder)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Convert {
            input,
            output,
            no_assets,
            backend,
        }) => cmd_convert(&input, output.as_deref(), no_assets, &backend),
        Some(Commands::Json {
            input,
            output,
            compact,
            backend,
        }) => cmd_json(&input, output.as_deref(), compact, &backend),
        Some(Commands::Info { input, json }) => cmd_info(&input, json),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                cmd_convert(&input, cli.output.as_deref(), false, &cli.backend)
            } else {
                println!("{}", "Usage: hybridpdf <FILE> [OUTPUT]".yellow());
                println!("       hybridpdf --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn convert_with_spinner(
    input: &Path,
    backend: &BackendArgs,
) -> Result<HierarchicalDocument, Box<dyn std::error::Error>> {
    let builder = backend.builder()?;
    let pb = spinner(&format!("Converting {}...", input.display()));
    let result = builder.convert_file(input);
    pb.finish_and_clear();
    Ok(result?)
}

fn cmd_convert(
    input: &Path,
    output: Option<&Path>,
    no_assets: bool,
    backend: &BackendArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir)?;
    let stem = input.file_stem().unwrap_or_default().to_string_lossy().to_string();

    let mut doc = convert_with_spinner(input, backend)?;

    let assets = if no_assets {
        Vec::new()
    } else {
        render::export_assets(&mut doc, &output_dir.join(format!("{}_assets", stem)))?
    };

    let json_path = output_dir.join(format!("{}_parsed.json", stem));
    fs::write(&json_path, render::to_json(&doc, JsonFormat::Pretty)?)?;

    print_summary(&doc);
    println!("\n{}", "Output files:".green().bold());
    if assets.is_empty() {
        println!("  {} {}", "└─".dimmed(), json_path.display());
    } else {
        println!("  {} {}", "├─".dimmed(), json_path.display());
        println!(
            "  {} {}_assets/ ({} images)",
            "└─".dimmed(),
            stem,
            assets.len()
        );
    }

    Ok(())
}

fn cmd_json(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    backend: &BackendArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = backend.builder()?.convert_file(input)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let json = render::to_json(&doc, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_info(input: &Path, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let backend = LopdfBackend::load_file(input)?;
    let info = backend.document_info();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), info.pdf_version);
    println!("{}: {}", "Pages".bold(), info.page_count);
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if info.encrypted { "Yes" } else { "No" }
    );

    if let Some(ref title) = info.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = info.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref creator) = info.creator {
        println!("{}: {}", "Creator".bold(), creator);
    }
    if let Some(ref producer) = info.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    if let Some(ref created) = info.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = info.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    println!();
    println!("{}", "Page Classification".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let source: Arc<dyn RuleBackend> = Arc::new(backend);
    let config = PipelineConfig::default();
    for page in source.pages() {
        let (classification, issue) = classify(&source, &page, &config);
        let label = match classification {
            Classification::Native => "native".green(),
            Classification::Scanned => "scanned".yellow(),
        };
        let note = if issue.is_some() { " (probe failed)" } else { "" };
        println!(
            "{} {:>4}: {} {:.0}x{:.0}{}",
            "Page".bold(),
            page.number,
            label,
            page.width,
            page.height,
            note.dimmed()
        );
    }

    Ok(())
}

fn print_summary(doc: &HierarchicalDocument) {
    let stats = &doc.stats;
    println!("{}", "Conversion Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!(
        "{}: {} ({} native, {} scanned)",
        "Pages".bold(),
        stats.page_count,
        stats.native_pages,
        stats.scanned_pages
    );
    println!(
        "{}: {} text, {} tables, {} images, {} charts",
        "Elements".bold(),
        stats.text_count,
        stats.table_count,
        stats.image_count,
        stats.chart_count
    );
    println!(
        "{}: {} rule, {} ocr, {} llm",
        "Origins".bold(),
        stats.rule_elements,
        stats.ocr_elements,
        stats.llm_elements
    );
    if stats.llm_pages > 0 {
        println!("{}: {}", "LLM pages".bold(), stats.llm_pages);
    }

    for page in doc.incomplete_pages() {
        let reasons: Vec<String> = page
            .issues
            .iter()
            .map(|issue| serde_json::to_string(issue).unwrap_or_default())
            .collect();
        println!(
            "{} page {} incomplete: {}",
            "Warning:".yellow().bold(),
            page.page_number,
            reasons.join(", ")
        );
    }
}

fn cmd_version() {
    println!("{} {}", "hybridpdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Hybrid PDF to hierarchical JSON converter");
    println!();
    println!("License: MIT");
}
