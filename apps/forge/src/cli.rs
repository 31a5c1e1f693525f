use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::info;

use resume_forge::batch::{write_report, BatchProcessor};
use resume_forge::config::Config;
use resume_forge::intake::{analyze_resume, validate, BackupStore};
use resume_forge::models::{DocumentStyleConfig, ResumeRecord};
use resume_forge::render::{NoConverter, ResumeGenerator, SofficeConverter};
use resume_forge::template::{self, StyleApplier, StylingSignature, TemplateLibrary};

const DEFAULT_ANALYSIS_PATH: &str = "template_analysis.json";

#[derive(Parser)]
#[command(name = "resume-forge", version, about = "Generate resumes from JSON data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a Word document (and PDF when possible) from one JSON file
    Generate {
        /// Resume data file
        json: PathBuf,

        /// Output directory (default: FORGE_OUTPUT_DIR or ./output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Base name for output files
        #[arg(short, long, default_value = "resume")]
        name: String,

        /// Skip the PDF conversion step
        #[arg(long)]
        word_only: bool,

        /// Styling signature produced by `analyze`
        #[arg(long, value_name = "SIG.json")]
        signature: Option<PathBuf>,

        /// Name of a template stored with `template save`
        #[arg(long, conflicts_with = "signature")]
        template: Option<String>,

        #[command(flatten)]
        style: StyleArgs,
    },
    /// Generate many resumes in parallel
    Batch {
        /// JSON files to process
        files: Vec<PathBuf>,

        /// CSV file with one row per resume and per-row settings
        #[arg(long, conflicts_with = "files")]
        csv: Option<PathBuf>,

        /// Output directory (default: FORGE_OUTPUT_DIR or ./output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of parallel workers (default: FORGE_WORKERS or 4)
        #[arg(long)]
        workers: Option<usize>,

        /// Write a plain-text processing report here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Skip the PDF conversion step
        #[arg(long)]
        word_only: bool,

        #[command(flatten)]
        style: StyleArgs,
    },
    /// Extract a styling signature from an existing .docx
    Analyze {
        docx: PathBuf,

        /// Where to write the signature JSON
        #[arg(short, long, default_value = DEFAULT_ANALYSIS_PATH)]
        output: PathBuf,
    },
    /// Manage the library of analyzed templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,

        /// Template directory (default: FORGE_TEMPLATE_DIR or ./templates)
        #[arg(long, global = true)]
        dir: Option<PathBuf>,
    },
    /// Check a resume JSON file and list every problem found
    Validate { json: PathBuf },
    /// Print word, bullet, and section counts for a resume JSON file
    Stats { json: PathBuf },
    /// Snapshot a resume JSON file into the backup directory
    Backup {
        json: PathBuf,

        /// Backup directory (default: FORGE_BACKUP_DIR or ./backups)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// File name prefix
        #[arg(long)]
        name: Option<String>,

        /// Keep only the newest N backups afterwards
        #[arg(long, value_name = "N")]
        keep: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum TemplateAction {
    /// Analyze a .docx and store its signature under a name
    Save {
        docx: PathBuf,

        /// Template name (default: the document's file stem)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List stored template names
    List,
}

/// Per-call overrides of the default document style.
#[derive(Args, Debug, Clone, Default)]
pub struct StyleArgs {
    /// Top margin in inches
    #[arg(long)]
    pub margin_top: Option<f32>,
    /// Bottom margin in inches
    #[arg(long)]
    pub margin_bottom: Option<f32>,
    /// Left margin in inches
    #[arg(long)]
    pub margin_left: Option<f32>,
    /// Right margin in inches
    #[arg(long)]
    pub margin_right: Option<f32>,
    /// Font family
    #[arg(long)]
    pub font: Option<String>,
    /// Base font size in points
    #[arg(long)]
    pub font_size: Option<f32>,
}

impl StyleArgs {
    pub fn to_config(&self) -> DocumentStyleConfig {
        let mut config = DocumentStyleConfig::default();
        if let Some(v) = self.margin_top {
            config.margin_top = v;
        }
        if let Some(v) = self.margin_bottom {
            config.margin_bottom = v;
        }
        if let Some(v) = self.margin_left {
            config.margin_left = v;
        }
        if let Some(v) = self.margin_right {
            config.margin_right = v;
        }
        if let Some(font) = &self.font {
            config.font_name = font.clone();
        }
        if let Some(v) = self.font_size {
            config.font_size_normal = v;
        }
        config
    }
}

/// How a command ended when it did not hit a hard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Some items failed or the input has validation problems.
    Partial,
}

pub async fn run(cli: Cli, config: &Config) -> Result<Outcome> {
    match cli.command {
        Command::Generate {
            json,
            output,
            name,
            word_only,
            signature,
            template: template_name,
            style,
        } => {
            let output = output.unwrap_or_else(|| config.output_dir.clone());
            let signature = match (signature, template_name) {
                (Some(path), _) => Some(
                    template::load_signature(&path)
                        .with_context(|| format!("cannot load signature {}", path.display()))?,
                ),
                (None, Some(name)) => Some(
                    TemplateLibrary::new(&config.template_dir)?
                        .load_template(&name)
                        .with_context(|| format!("cannot load template '{name}'"))?,
                ),
                (None, None) => None,
            };
            generate(config, &json, &output, &name, word_only, signature, &style)
        }
        Command::Batch {
            files,
            csv,
            output,
            workers,
            report,
            word_only,
            style,
        } => {
            let output = output.unwrap_or_else(|| config.output_dir.clone());
            let workers = workers.unwrap_or(config.workers);
            batch(config, files, csv, &output, workers, report, word_only, &style).await
        }
        Command::Analyze { docx, output } => analyze(&docx, &output),
        Command::Template { action, dir } => {
            let library = TemplateLibrary::new(dir.unwrap_or_else(|| config.template_dir.clone()))?;
            template_command(&library, action)
        }
        Command::Validate { json } => validate_file(&json),
        Command::Stats { json } => stats(&json),
        Command::Backup {
            json,
            dir,
            name,
            keep,
        } => {
            let dir = dir.unwrap_or_else(|| config.backup_dir.clone());
            backup(&json, &dir, name.as_deref(), keep)
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn generate(
    config: &Config,
    json: &Path,
    output: &Path,
    name: &str,
    word_only: bool,
    signature: Option<StylingSignature>,
    style: &StyleArgs,
) -> Result<Outcome> {
    let mut generator = ResumeGenerator::new(style.to_config())?;
    generator = if word_only {
        generator.with_converter(Arc::new(NoConverter))
    } else {
        generator.with_converter(Arc::new(SofficeConverter::new(&config.converter_program)))
    };
    if let Some(signature) = signature {
        info!(
            "Styling from template signature ({} styles)",
            signature.styles.len()
        );
        generator = generator.with_styles(Arc::new(StyleApplier::new(signature)));
    }

    println!("Generating resume from: {}", json.display());
    println!("Output directory: {}", output.display());

    let result = generator.generate_from_json(json, Some(output), name)?;
    println!("Word document: {}", result.word_path.display());
    match result.pdf.path() {
        Some(pdf) => println!("PDF document: {}", pdf.display()),
        None if word_only => {}
        None => println!("PDF not generated (converter unavailable)"),
    }
    Ok(Outcome::Success)
}

#[allow(clippy::too_many_arguments)]
async fn batch(
    config: &Config,
    files: Vec<PathBuf>,
    csv: Option<PathBuf>,
    output: &Path,
    workers: usize,
    report: Option<PathBuf>,
    word_only: bool,
    style: &StyleArgs,
) -> Result<Outcome> {
    let processor = BatchProcessor::new(style.to_config(), workers)?;
    let processor = if word_only {
        processor.with_converter(NoConverter)
    } else {
        processor.with_converter(SofficeConverter::new(&config.converter_program))
    };

    let results = match csv {
        Some(csv) => {
            println!("Processing from CSV: {}", csv.display());
            processor.process_from_csv(&csv, output).await?
        }
        None => {
            anyhow::ensure!(!files.is_empty(), "no JSON files given");
            println!("Processing {} files...", files.len());
            processor.process_batch(&files, output).await
        }
    };

    if let Some(path) = &report {
        write_report(&results, path)?;
    }

    println!("Successful: {}", results.successful.len());
    println!("Failed: {}", results.failed.len());
    println!("Duration: {:.2} seconds", results.duration_secs);
    if let Some(path) = &report {
        println!("Report: {}", path.display());
    }

    Ok(if results.all_succeeded() {
        Outcome::Success
    } else {
        Outcome::Partial
    })
}

fn analyze(docx: &Path, output: &Path) -> Result<Outcome> {
    let signature = template::analyze(docx)?;
    template::save_analysis(&signature, output)?;
    println!("Template analyzed and saved to {}", output.display());
    if let Some(font) = signature.dominant_font() {
        println!("Dominant font: {font}");
    }
    Ok(Outcome::Success)
}

fn template_command(library: &TemplateLibrary, action: TemplateAction) -> Result<Outcome> {
    match action {
        TemplateAction::Save { docx, name } => {
            let name = name.unwrap_or_else(|| {
                docx.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            let signature = template::analyze(&docx)?;
            let path = library.save_as_template(&signature, &name)?;
            println!("Template '{name}' saved to {}", path.display());
        }
        TemplateAction::List => {
            let names = library.list_templates()?;
            if names.is_empty() {
                println!("No templates in {}", library.dir().display());
            }
            for name in names {
                println!("{name}");
            }
        }
    }
    Ok(Outcome::Success)
}

fn validate_file(json: &Path) -> Result<Outcome> {
    let report = validate(&read_json(json)?);
    if report.passed {
        println!("{} is valid", json.display());
        return Ok(Outcome::Success);
    }
    println!("{} has {} problem(s):", json.display(), report.errors.len());
    for problem in &report.errors {
        println!("  - {problem}");
    }
    Ok(Outcome::Partial)
}

fn stats(json: &Path) -> Result<Outcome> {
    let record = ResumeRecord::from_value(read_json(json)?)?;
    let statistics = analyze_resume(&record);
    println!("{}", serde_json::to_string_pretty(&statistics)?);
    Ok(Outcome::Success)
}

fn backup(json: &Path, dir: &Path, name: Option<&str>, keep: Option<usize>) -> Result<Outcome> {
    let payload = read_json(json)?;
    let store = BackupStore::new(dir)?;
    let path = store.create_backup(&payload, name)?;
    println!("Backup: {}", path.display());

    if let Some(keep) = keep {
        let removed = store.cleanup_old_backups(keep)?;
        println!("Removed {removed} old backup(s)");
    }
    Ok(Outcome::Success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_args_override_defaults() {
        let args = StyleArgs {
            margin_top: Some(1.0),
            font: Some("Georgia".to_string()),
            ..Default::default()
        };
        let config = args.to_config();
        assert_eq!(config.margin_top, 1.0);
        assert_eq!(config.margin_left, 0.5);
        assert_eq!(config.font_name, "Georgia");
        assert_eq!(config.font_size_normal, 11.0);
    }

    #[test]
    fn test_generate_flags_parse() {
        let cli = Cli::try_parse_from([
            "resume-forge",
            "generate",
            "resume.json",
            "-n",
            "jane",
            "--word-only",
            "--margin-left",
            "0.75",
            "--font-size",
            "10.5",
        ])
        .unwrap();

        let Command::Generate {
            json,
            name,
            word_only,
            style,
            output,
            ..
        } = cli.command
        else {
            panic!("expected generate");
        };
        assert_eq!(json, PathBuf::from("resume.json"));
        assert_eq!(name, "jane");
        assert!(word_only);
        assert_eq!(output, None);
        assert_eq!(style.margin_left, Some(0.75));
        assert_eq!(style.font_size, Some(10.5));
    }

    #[test]
    fn test_batch_rejects_files_with_csv() {
        let parsed = Cli::try_parse_from([
            "resume-forge",
            "batch",
            "a.json",
            "--csv",
            "rows.csv",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_template_flags_parse() {
        let cli = Cli::try_parse_from([
            "resume-forge",
            "template",
            "save",
            "sample.docx",
            "--name",
            "modern",
            "--dir",
            "lib",
        ])
        .unwrap();
        let Command::Template {
            action: TemplateAction::Save { docx, name },
            dir,
        } = cli.command
        else {
            panic!("expected template save");
        };
        assert_eq!(docx, PathBuf::from("sample.docx"));
        assert_eq!(name.as_deref(), Some("modern"));
        assert_eq!(dir, Some(PathBuf::from("lib")));

        let both = Cli::try_parse_from([
            "resume-forge",
            "generate",
            "resume.json",
            "--signature",
            "sig.json",
            "--template",
            "modern",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn test_template_save_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let docx = dir.path().join("sample.docx");
        resume_forge::docx::Document::new().save(&docx).unwrap();
        let library = TemplateLibrary::new(dir.path().join("templates")).unwrap();

        let saved = template_command(
            &library,
            TemplateAction::Save {
                docx: docx.clone(),
                name: None,
            },
        )
        .unwrap();

        assert_eq!(saved, Outcome::Success);
        assert_eq!(library.list_templates().unwrap(), vec!["sample"]);
        assert_eq!(
            template_command(&library, TemplateAction::List).unwrap(),
            Outcome::Success
        );
    }

    #[test]
    fn test_validate_reports_problems_as_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.json");
        std::fs::write(&path, r#"{"header": {"name": "A", "email": "bad"}}"#).unwrap();

        assert_eq!(validate_file(&path).unwrap(), Outcome::Partial);
        assert!(validate_file(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_generate_word_only_writes_docx() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("resume.json");
        std::fs::write(
            &json,
            r#"{"header": {"name": "Jane Doe", "email": "jane@example.com"}, "experience": []}"#,
        )
        .unwrap();
        let out = dir.path().join("out");

        let outcome = generate(
            &Config::default(),
            &json,
            &out,
            "jane",
            true,
            None,
            &StyleArgs::default(),
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Success);
        let written: Vec<_> = std::fs::read_dir(&out).unwrap().collect();
        assert_eq!(written.len(), 1);
    }
}
