use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_INPUT: &str = "file.xlsx";
pub const DEFAULT_EXPORT: &str = "dados_mensais.xlsx";

/// Monthly usage report for the concrete-mixer fleet.
#[derive(Parser, Debug, Clone)]
#[command(name = "fleet-report", version, about)]
pub struct Cli {
    /// Working storage directory holding the imported sheet and exports.
    #[arg(long, env = "FLEET_REPORT_FILES_DIR", default_value = "files", global = true)]
    pub files_dir: PathBuf,

    /// Input spreadsheet, relative to the files directory.
    #[arg(long, default_value = DEFAULT_INPUT, global = true)]
    pub input: PathBuf,

    /// Log filter, e.g. `info` or `fleet_report=debug`.
    #[arg(long, env = "FLEET_REPORT_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the report for one month and optionally export it.
    Report(ReportArgs),
    /// Delete every file in the files directory.
    Clean,
    /// Print a previously exported table.
    Show {
        /// Export file, relative to the files directory.
        path: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: u32,

    #[arg(long, value_parser = clap::value_parser!(i32).range(2000..=2099))]
    pub year: i32,

    /// Substring of the vehicle id or plate.
    #[arg(long)]
    pub vehicle: Option<String>,

    #[arg(long)]
    pub base: Option<String>,

    /// Substring of the vehicle type.
    #[arg(long)]
    pub tipo: Option<String>,

    /// Export the filtered table; the path is relative to the files directory.
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_EXPORT)]
    pub export: Option<PathBuf>,

    /// Print the rows as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn input_path(&self) -> PathBuf {
        self.files_dir.join(&self.input)
    }

    pub fn export_path(&self, name: Option<&PathBuf>) -> PathBuf {
        match name {
            Some(p) => self.files_dir.join(p),
            None => self.files_dir.join(DEFAULT_EXPORT),
        }
    }
}
