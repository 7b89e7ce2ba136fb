use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bibsift::analysis::{overlap, tfidf, topics};
use bibsift::bibtex::SourceFile;
use bibsift::config::Config;
use bibsift::corpus::Corpus;
use bibsift::identifier::list::{read_identifier_file, write_identifier_file, CanonicalSet};
use bibsift::identifier::Canonicalizer;
use bibsift::oracle::crossref::CrossrefClient;
use bibsift::oracle::http::HttpOracle;
use bibsift::oracle::openai::OpenAiClassifier;
use bibsift::output::{self, csv_export, markdown, terminal};
use bibsift::pipeline::{classify, resolve, validate, RunOptions};
use bibsift::text::Stopwords;

/// bibsift: reconcile, analyze and classify a literature review corpus.
///
/// Reads BibTeX exports (files or directories of `.bib` files), deduplicates
/// them by DOI, scores the vocabulary, checks coverage of a reference list,
/// and sorts papers into categories.
#[derive(Parser)]
#[command(name = "bibsift", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show corpus ingest counts (duplicates, malformed DOIs, missing text)
    Summary {
        /// BibTeX files or directories to read
        #[arg(required = true)]
        bib: Vec<PathBuf>,

        /// Write the counts as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write DOI and title of every record as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// List the distinct DOIs across BibTeX files or directories
    Dois {
        #[arg(required = true)]
        bib: Vec<PathBuf>,

        /// Write the sorted list to a file, one DOI per line
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every DOI
        #[arg(short, long)]
        verbose: bool,
    },

    /// Rank corpus vocabulary by term score
    Terms {
        #[arg(required = true)]
        bib: Vec<PathBuf>,

        /// Drop terms found in fewer records (default: 2)
        #[arg(long, default_value = "2")]
        min_df: usize,

        /// Drop terms found in more records (overrides --max-df-ratio)
        #[arg(long)]
        max_df: Option<usize>,

        /// Drop terms found in more than this share of records (default: 0.8)
        #[arg(long, default_value = "0.8")]
        max_df_ratio: f64,

        /// Number of terms to show (default: 30)
        #[arg(long, default_value = "30")]
        top: usize,

        /// Minimum term length in characters (default: 3)
        #[arg(long, default_value = "3")]
        min_len: usize,

        /// Extra stopwords, one per line
        #[arg(long)]
        stopwords: Option<PathBuf>,

        /// Keep English stopwords in the vocabulary
        #[arg(long)]
        keep_stopwords: bool,

        /// Also rank the best N terms of each record
        #[arg(long, value_name = "N")]
        per_record: Option<usize>,

        #[arg(long)]
        json: Option<PathBuf>,

        /// Write the term table as CSV (the per-record table with --per-record)
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Check how much of a reference DOI list the corpus covers
    Overlap {
        /// Reference list, one DOI per line
        dois: PathBuf,

        #[arg(required = true)]
        bib: Vec<PathBuf>,

        /// List the overlapping, missing and malformed identifiers
        #[arg(short, long)]
        verbose: bool,

        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Count records mentioning each topic phrase
    Topics {
        /// Topic phrases, one per line
        topics: PathBuf,

        #[arg(required = true)]
        bib: Vec<PathBuf>,

        #[arg(long)]
        case_sensitive: bool,

        /// List the records matching each topic
        #[arg(short, long)]
        verbose: bool,

        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Classify records into subject categories with the OpenAI API
    Classify {
        #[arg(required = true)]
        bib: Vec<PathBuf>,

        /// Only classify records whose DOI is in this list
        #[arg(long)]
        only: Option<PathBuf>,

        /// Records per request (default: BIBSIFT_BATCH_SIZE or 10)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Retries per batch after the first attempt
        #[arg(long)]
        max_retries: Option<u32>,

        /// Minimum milliseconds between requests
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Write a Markdown report
        #[arg(long)]
        report: Option<PathBuf>,

        #[arg(long)]
        json: Option<PathBuf>,

        /// Write DOI, title, category and description as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Don't draw a progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Look up DOIs for records that have none, via Crossref
    Resolve {
        #[arg(required = true)]
        bib: Vec<PathBuf>,

        /// Minimum milliseconds between requests
        #[arg(long)]
        interval_ms: Option<u64>,

        #[arg(long)]
        json: Option<PathBuf>,

        #[arg(long)]
        no_progress: bool,
    },

    /// Check that DOIs are registered with Crossref
    Validate {
        /// BibTeX files or directories whose DOIs to check
        bib: Vec<PathBuf>,

        /// Check the DOIs in this list (one per line) instead
        #[arg(long, conflicts_with = "bib")]
        dois: Option<PathBuf>,

        /// Minimum milliseconds between requests
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Print the result for every DOI
        #[arg(short, long)]
        verbose: bool,

        #[arg(long)]
        json: Option<PathBuf>,

        /// Write DOI, validity and title or error as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        #[arg(long)]
        no_progress: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bibsift=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { bib, json, csv } => {
            let config = Config::load()?;
            let (corpus, files) = load_corpus(&bib, &config.canonicalizer())?;

            terminal::display_corpus_summary(corpus.stats(), &files);
            write_json_if(json.as_deref(), corpus.stats())?;
            if let Some(path) = csv {
                write_csv(&path, &csv_export::records_csv(&corpus)?)?;
            }
        }

        Commands::Dois {
            bib,
            output,
            verbose,
        } => {
            let config = Config::load()?;
            let (corpus, files) = load_corpus(&bib, &config.canonicalizer())?;
            terminal::display_corpus_summary(corpus.stats(), &files);

            let mut identifiers: Vec<&str> = corpus.identifiers().collect();
            identifiers.sort_unstable();
            println!(
                "\n  {} distinct DOIs across {} files",
                identifiers.len().to_string().bold(),
                files.len()
            );
            if verbose {
                for id in &identifiers {
                    println!("    {id}");
                }
            }
            if let Some(path) = output {
                write_identifier_file(&path, identifiers.iter().copied())?;
                println!("\n  DOI list written to {}", path.display());
            }
        }

        Commands::Terms {
            bib,
            min_df,
            max_df,
            max_df_ratio,
            top,
            min_len,
            stopwords,
            keep_stopwords,
            per_record,
            json,
            csv,
        } => {
            let config = Config::load()?;
            let (corpus, files) = load_corpus(&bib, &config.canonicalizer())?;

            let mut stop = if keep_stopwords {
                Stopwords::none()
            } else {
                Stopwords::english()
            };
            if let Some(path) = stopwords {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read stopwords from {}", path.display()))?;
                stop.extend(text.lines().map(str::trim).filter(|w| !w.is_empty()));
            }

            // An explicit --max-df below --min-df stays an error;
            // a ratio ceiling is lifted to the floor instead.
            let bounds = match max_df {
                Some(max_doc_freq) => tfidf::TermStatsConfig {
                    min_doc_freq: min_df,
                    max_doc_freq,
                    ..tfidf::TermStatsConfig::default()
                },
                None => tfidf::TermStatsConfig::from_ratio(min_df, max_df_ratio, corpus.size()),
            };
            let term_config = tfidf::TermStatsConfig {
                min_term_len: min_len,
                top_n: Some(top),
                ..bounds
            };
            let stats = tfidf::compute(&corpus, &term_config, &stop)?;

            let rankings = match per_record {
                Some(n) => {
                    let record_config = tfidf::TermStatsConfig {
                        top_n: Some(n),
                        ..term_config.clone()
                    };
                    Some(tfidf::per_record(&corpus, &record_config, &stop)?)
                }
                None => None,
            };

            terminal::display_corpus_summary(corpus.stats(), &files);
            terminal::display_term_stats(&stats);
            if let Some(rankings) = &rankings {
                terminal::display_record_terms(rankings);
            }

            write_json_if(
                json.as_deref(),
                &TermsReport {
                    stats: &stats,
                    per_record: rankings.as_deref(),
                },
            )?;
            if let Some(path) = csv {
                let contents = match &rankings {
                    Some(rankings) => csv_export::record_terms_csv(rankings)?,
                    None => csv_export::terms_csv(&stats)?,
                };
                write_csv(&path, &contents)?;
            }
        }

        Commands::Overlap {
            dois,
            bib,
            verbose,
            json,
        } => {
            let config = Config::load()?;
            let canon = config.canonicalizer();
            let (corpus, _) = load_corpus(&bib, &canon)?;
            let reference = read_identifier_file(&dois)?;

            let result = overlap::compare(&reference, &corpus, &canon);
            terminal::display_overlap(&result, verbose);
            write_json_if(json.as_deref(), &result)?;
        }

        Commands::Topics {
            topics: topics_path,
            bib,
            case_sensitive,
            verbose,
            json,
        } => {
            let config = Config::load()?;
            let (corpus, _) = load_corpus(&bib, &config.canonicalizer())?;
            let phrases = topics::read_topics_file(&topics_path)?;
            if phrases.is_empty() {
                anyhow::bail!("No topics found in {}", topics_path.display());
            }

            let freq = topics::topic_frequency(&corpus, &phrases, case_sensitive);
            terminal::display_topics(&freq, verbose);
            write_json_if(json.as_deref(), &freq)?;
        }

        Commands::Classify {
            bib,
            only,
            batch_size,
            max_retries,
            interval_ms,
            report,
            json,
            csv,
            no_progress,
        } => {
            let config = Config::load()?;
            config.require_openai()?;
            let canon = config.canonicalizer();
            let (mut corpus, files) = load_corpus(&bib, &canon)?;
            terminal::display_corpus_summary(corpus.stats(), &files);

            if let Some(path) = only {
                let reference = CanonicalSet::build(&canon, read_identifier_file(&path)?);
                if !reference.malformed.is_empty() {
                    println!(
                        "  {} {} malformed entries in {} were ignored",
                        "!".yellow(),
                        reference.malformed.len(),
                        path.display()
                    );
                }
                corpus = corpus.restrict_to(&reference.identifiers);
                info!(
                    records = corpus.size(),
                    reference = reference.len(),
                    "Restricted corpus to reference list"
                );
            }

            let mut options = config.run_options();
            if let Some(n) = batch_size {
                options.batch_size = n;
            }
            if let Some(n) = max_retries {
                options.retry.max_retries = n;
            }
            apply_run_flags(&mut options, interval_ms, no_progress);

            let oracle = build_oracle(&config, true)?;
            let cancel = cancel_on_ctrl_c();

            println!(
                "\nClassifying {} records in batches of {}...",
                corpus.size(),
                options.batch_size
            );
            let run = classify::classify(&corpus, &oracle, &options, &cancel).await?;

            terminal::display_classification(&run);
            if let Some(path) = report {
                markdown::write_classification_report(&path, &run, &corpus)?;
                println!("\n  Report written to {}", path.display());
            }
            write_json_if(json.as_deref(), &run)?;
            if let Some(path) = csv {
                write_csv(&path, &csv_export::classification_csv(&run, &corpus)?)?;
            }
        }

        Commands::Resolve {
            bib,
            interval_ms,
            json,
            no_progress,
        } => {
            let config = Config::load()?;
            let canon = config.canonicalizer();
            let (corpus, _) = load_corpus(&bib, &canon)?;

            let mut options = config.run_options();
            apply_run_flags(&mut options, interval_ms, no_progress);

            let oracle = build_oracle(&config, false)?;
            let cancel = cancel_on_ctrl_c();

            let report = resolve::resolve_missing(&corpus, &oracle, &canon, &options, &cancel).await;
            terminal::display_resolution(&report);
            write_json_if(json.as_deref(), &report)?;
        }

        Commands::Validate {
            bib,
            dois,
            interval_ms,
            verbose,
            json,
            csv,
            no_progress,
        } => {
            let config = Config::load()?;
            let canon = config.canonicalizer();

            let set = match dois {
                Some(path) => CanonicalSet::build(&canon, read_identifier_file(&path)?),
                None if bib.is_empty() => {
                    anyhow::bail!("Give BibTeX files or directories, or --dois <list>")
                }
                None => {
                    let (corpus, files) = load_corpus(&bib, &canon)?;
                    terminal::display_corpus_summary(corpus.stats(), &files);
                    CanonicalSet::build(&canon, corpus.identifiers())
                }
            };
            if set.is_empty() {
                warn!("No valid DOIs to check");
            }

            let mut options = config.run_options();
            apply_run_flags(&mut options, interval_ms, no_progress);
            let registry =
                CrossrefClient::new(&config.crossref_api_url, config.crossref_mailto.as_deref())?;
            let cancel = cancel_on_ctrl_c();

            println!("\nChecking {} DOIs against Crossref...", set.len());
            let report = validate::validate_identifiers(&set, &registry, &options, &cancel).await;

            terminal::display_validation(&report, verbose);
            write_json_if(json.as_deref(), &report)?;
            if let Some(path) = csv {
                write_csv(&path, &csv_export::validation_csv(&report)?)?;
            }
        }
    }

    Ok(())
}

/// JSON shape of the `terms` command.
#[derive(serde::Serialize)]
struct TermsReport<'a> {
    #[serde(flatten)]
    stats: &'a tfidf::TermStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    per_record: Option<&'a [tfidf::RecordTerms]>,
}

/// Read BibTeX files and directories into one corpus. Also returns what was
/// read from each file.
fn load_corpus(paths: &[PathBuf], canon: &Canonicalizer) -> Result<(Corpus, Vec<SourceFile>)> {
    let sources = bibsift::bibtex::read_paths(paths)?;
    let corpus = Corpus::build(sources.bibliography.records, canon);
    if corpus.is_empty() {
        warn!(files = sources.files.len(), "No entries found");
    }
    Ok((corpus, sources.files))
}

fn apply_run_flags(options: &mut RunOptions, interval_ms: Option<u64>, no_progress: bool) {
    if let Some(ms) = interval_ms {
        options.rate_limit_interval = tokio::time::Duration::from_millis(ms);
    }
    options.show_progress = !no_progress;
}

fn build_oracle(config: &Config, with_classifier: bool) -> Result<HttpOracle> {
    let resolver = CrossrefClient::new(&config.crossref_api_url, config.crossref_mailto.as_deref())?;
    let classifier = if with_classifier {
        Some(OpenAiClassifier::new(
            &config.openai_api_url,
            &config.openai_api_key,
            &config.openai_model,
        )?)
    } else {
        None
    };
    Ok(HttpOracle::new(resolver, classifier))
}

/// A token that is cancelled on the first Ctrl-C. Runs stop before their
/// next oracle call and report what they finished.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current request");
            trigger.cancel();
        }
    });
    token
}

fn write_csv(path: &Path, contents: &str) -> Result<()> {
    csv_export::write_csv(path, contents)?;
    println!("\n  CSV written to {}", path.display());
    Ok(())
}

fn write_json_if<T: serde::Serialize>(path: Option<&Path>, report: &T) -> Result<()> {
    if let Some(path) = path {
        output::write_json(path, report)?;
        println!("\n  JSON written to {}", path.display());
    }
    Ok(())
}
