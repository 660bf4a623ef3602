//! `coursegraph` command-line entry point.
//!
//! # Responsibility
//! - Import course documents into a SQLite store.
//! - Answer eligibility and recommendation queries against that store.
//! - Feed student mastery rows for local experiments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use coursegraph_core::repo::knowledge_repo::KnowledgeRepository;
use coursegraph_core::service::scoring::mastered_terms;
use coursegraph_core::{
    default_log_level, init_logging, open_db, CourseImportService, KnowledgeGraphService,
    RecommendationService, RecommenderConfig, SqliteGraphRepository, SqliteKnowledgeRepository,
    SqliteRecommendationLogRepository, StudentProfile,
};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "coursegraph")]
#[command(version, about = "Course knowledge graph and study recommendations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database file
    #[arg(long, global = true, default_value = "coursegraph.db")]
    db: PathBuf,

    /// Recommender config (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rotated log files; logging is off when omitted
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Parse, validate and publish a course document
    Import {
        file: PathBuf,
        /// Validate only; do not persist the graph
        #[arg(long)]
        dry_run: bool,
    },
    /// List chapters the student may start
    Eligible(ProfileArgs),
    /// Explain why one chapter is or is not open
    Explain {
        #[command(flatten)]
        profile: ProfileArgs,
        #[arg(long)]
        chapter: String,
    },
    /// Recommend the next chapter
    Recommend {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
        #[arg(long, value_delimiter = ',')]
        completed: Vec<String>,
    },
    /// Record one term mastery score
    Mastery {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
        #[arg(long)]
        term: String,
        #[arg(long)]
        score: f64,
        #[arg(long, default_value_t = 0.0)]
        confidence: f64,
    },
    /// Show logged recommendations, newest first
    History {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
    },
}

#[derive(Args)]
struct ProfileArgs {
    #[arg(long)]
    course: String,
    #[arg(long, value_delimiter = ',')]
    completed: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    mastered: Vec<String>,
    /// Add terms this student has mastered in the store
    #[arg(long)]
    student: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<ExitCode> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }
    let config = load_config(cli.config.as_deref())?;
    let conn = open_db(&cli.db)?;
    let graphs = KnowledgeGraphService::new(SqliteGraphRepository::try_new(&conn)?);
    info!("event=cli_command module=cli status=start db={}", cli.db.display());

    match cli.command {
        Command::Import { file, dry_run } => {
            let content = std::fs::read_to_string(&file)?;
            let report = CourseImportService::new(&graphs).import_course(&content, dry_run)?;
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => {
                    for diagnostic in report.errors.iter().chain(&report.graph_issues) {
                        println!("{}", render_diagnostic(diagnostic));
                    }
                    let course = report.course.as_ref().map_or("-", |c| c.id.as_str());
                    let status = match (report.valid, report.dry_run) {
                        (true, true) => "valid (dry run, not published)",
                        (true, false) => "published",
                        (false, _) => "rejected",
                    };
                    println!("course {course}: {status}");
                }
            }
            return Ok(if report.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            });
        }
        Command::Eligible(args) => {
            let profile = build_profile(&conn, &config, &args)?;
            match graphs.eligible_chapters(&args.course, &profile)? {
                Some(chapters) => match cli.format {
                    OutputFormat::Json => print_json(&chapters)?,
                    OutputFormat::Text => chapters.iter().for_each(|id| println!("{id}")),
                },
                None => return unknown_course(&args.course),
            }
        }
        Command::Explain { profile, chapter } => {
            let student = build_profile(&conn, &config, &profile)?;
            match graphs.explain_chapter(&profile.course, &chapter, &student)? {
                Some(verdict) => match cli.format {
                    OutputFormat::Json => print_json(&verdict)?,
                    OutputFormat::Text => {
                        println!("{}: eligible={}", verdict.chapter_id, verdict.eligible);
                        println!("missing chapters: {}", verdict.missing_chapters.join(", "));
                        println!("missing terms: {}", verdict.missing_terms.join(", "));
                    }
                },
                None => {
                    eprintln!("no graph node `{chapter}` in course `{}`", profile.course);
                    return Ok(ExitCode::from(3));
                }
            }
        }
        Command::Recommend {
            student,
            course,
            completed,
        } => {
            let engine = RecommendationService::new(
                &graphs,
                SqliteKnowledgeRepository::try_new(&conn)?,
                SqliteRecommendationLogRepository::try_new(&conn)?,
                config,
            );
            let completed: BTreeSet<String> = completed.into_iter().collect();
            let result = engine.next(&student, &course, &completed)?;
            match cli.format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Text => {
                    println!(
                        "chapter: {}",
                        result.chapter_id.as_deref().unwrap_or("(none)")
                    );
                    println!("score: {:.4}", result.score);
                    println!("cold start: {}", result.cold_start_fallback);
                    for factor in &result.factors {
                        println!("  {} = {:.4}", factor.name, factor.value);
                    }
                    println!("{}", result.reason);
                }
            }
        }
        Command::Mastery {
            student,
            course,
            term,
            score,
            confidence,
        } => {
            SqliteKnowledgeRepository::try_new(&conn)?
                .save_mastery(&student, &course, &term, score, confidence)?;
            println!("saved {student}/{course}/{term}");
        }
        Command::History { student, course } => {
            let engine = RecommendationService::new(
                &graphs,
                SqliteKnowledgeRepository::try_new(&conn)?,
                SqliteRecommendationLogRepository::try_new(&conn)?,
                config,
            );
            let entries = engine.list_recommendations(&student, &course)?;
            match cli.format {
                OutputFormat::Json => print_json(&entries)?,
                OutputFormat::Text => {
                    for entry in entries {
                        println!(
                            "{} {} score={:.4} {}",
                            entry.created_at, entry.chapter_id, entry.score, entry.reason
                        );
                    }
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>) -> CliResult<RecommenderConfig> {
    let config = match path {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => RecommenderConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn build_profile(
    conn: &Connection,
    config: &RecommenderConfig,
    args: &ProfileArgs,
) -> CliResult<StudentProfile> {
    let mut profile = StudentProfile::new(args.completed.iter().cloned(), args.mastered.iter().cloned());
    if let Some(student) = args.student.as_deref() {
        let mastery =
            SqliteKnowledgeRepository::try_new(conn)?.load_student_mastery(student, &args.course)?;
        profile
            .mastered_terms
            .extend(mastered_terms(&mastery, config.mastery_threshold));
    }
    Ok(profile)
}

fn render_diagnostic(diagnostic: &coursegraph_core::Diagnostic) -> String {
    let location = match &diagnostic.location {
        coursegraph_core::Location::Line(line) => format!("line {line}"),
        coursegraph_core::Location::Node(node) => format!("node {node}"),
    };
    format!(
        "{} [{}] {}: {}",
        diagnostic.code, diagnostic.block, location, diagnostic.message
    )
}

fn unknown_course(course_id: &str) -> CliResult<ExitCode> {
    eprintln!("no graph for course `{course_id}`");
    Ok(ExitCode::from(3))
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
