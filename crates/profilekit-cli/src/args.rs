use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use profilekit_core::config::{ConfigOverrides, CONFIG_FILE_NAME};

#[derive(Parser, Debug)]
#[command(
    name = "profilekit",
    about = "Profile the columns of a MySQL, PostgreSQL or SQL Server database before migrating it",
    version,
    after_help = "Examples:\n  profilekit profile --db mysql://root@localhost/his --deep\n  profilekit profile --config profilekit.toml --tables patients,visits\n  profilekit tables --db postgres://localhost/his\n  profilekit summary analysis_report/migration_report/20240101_120000/data_profile/data_profile.csv"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Profile every column of the tables in scope and write a CSV report
    Profile(ProfileArgs),

    /// List the tables a profiling run would cover
    Tables(TablesArgs),

    /// Summarize an existing profiling report per table
    Summary(SummaryArgs),
}

/// Where the connection and scope come from.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Path to the config file
    #[arg(long, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Database connection URL (mysql://, postgres://, mssql://)
    /// Falls back to DATABASE_URL env var or .env file
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Only these tables, in this order (e.g., patients,visits)
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Also compute min/max and top-5 value frequencies
    #[arg(long)]
    pub deep: bool,

    /// Sample values fetched per column
    #[arg(long)]
    pub limit: Option<u64>,

    /// Truncate each sample value to this many characters
    #[arg(long)]
    pub max_text_length: Option<usize>,

    /// Directory that receives the timestamped run folder
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Skip the schema DDL export
    #[arg(long)]
    pub no_ddl: bool,
}

#[derive(Parser, Debug)]
pub struct TablesArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Path to a data_profile.csv report
    pub report: PathBuf,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: SummaryFormat,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum SummaryFormat {
    Table,
    Json,
}

impl SourceArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            db_url: self.db.clone(),
            tables: self
                .tables
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            ..Default::default()
        }
    }
}

impl ProfileArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            deep_analysis: self.deep,
            default_limit: self.limit,
            max_text_length: self.max_text_length,
            output_dir: self.output_dir.clone(),
            no_ddl: self.no_ddl,
            ..self.source.overrides()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_flags() {
        let cli = Cli::try_parse_from([
            "profilekit",
            "profile",
            "--db",
            "mysql://root@localhost/his",
            "--tables",
            "patients, visits",
            "--deep",
            "--limit",
            "20",
            "--no-ddl",
        ])
        .unwrap();
        let Command::Profile(args) = cli.command else {
            panic!("expected profile");
        };
        let overrides = args.overrides();
        assert_eq!(overrides.db_url.as_deref(), Some("mysql://root@localhost/his"));
        assert_eq!(overrides.tables, vec!["patients", "visits"]);
        assert!(overrides.deep_analysis);
        assert_eq!(overrides.default_limit, Some(20));
        assert_eq!(overrides.max_text_length, None);
        assert!(overrides.no_ddl);
    }

    #[test]
    fn test_summary_defaults_to_table() {
        let cli = Cli::try_parse_from(["profilekit", "summary", "report.csv", "-v"]).unwrap();
        assert!(cli.verbose);
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.report, PathBuf::from("report.csv"));
        assert!(matches!(args.format, SummaryFormat::Table));
    }

    #[test]
    fn test_blank_table_entries_dropped() {
        let cli = Cli::try_parse_from(["profilekit", "tables", "--tables", "a,,b"]).unwrap();
        let Command::Tables(args) = cli.command else {
            panic!("expected tables");
        };
        assert_eq!(args.source.overrides().tables, vec!["a", "b"]);
        assert_eq!(args.source.config, PathBuf::from(CONFIG_FILE_NAME));
    }
}
