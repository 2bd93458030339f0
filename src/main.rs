// Entry point and high-level CLI flow.
//
// Without a subcommand the binary runs an interactive menu:
// - [1] loads the fleet spreadsheet and prints what was found,
// - [2] asks for a month/year and filters and prints the monthly table,
// - [3] exports the last printed table,
// - [4] deletes every file in the working directory.
// `report` and `clean` run the same steps once, non-interactively, and
// `show` prints an earlier export.
mod bootstrap;
mod cleanup;
mod error;
mod filter;
mod loader;
mod normalize;
mod output;
mod reports;
mod settings;
mod types;
mod util;

use clap::Parser;
use filter::FilterCriteria;
use loader::Loader;
use once_cell::sync::Lazy;
use reports::MonthlyReport;
use settings::{Cli, Command, ReportArgs};
use std::io::{self, BufRead, Write};
use std::ops::RangeInclusive;
use std::sync::{Mutex, MutexGuard};
use types::RawTable;

const MSG_NO_FILE: &str = "No file found for analysis. Please import a spreadsheet.";
const MSG_NO_DATA: &str = "No data found for the specified month/year.";
const MSG_EXPORT_OK: &str = "Export succeeded.";
const MSG_CLEANUP_OK: &str = "Cleanup succeeded.";
const PREVIEW_ROWS: usize = 500;

// Interactive session state. The loader owns the cached table; the last
// report is what [3] exports.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        loader: Loader::new(),
        last_report: None,
    })
});

struct AppState {
    loader: Loader,
    last_report: Option<MonthlyReport>,
}

fn app_state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|e| e.into_inner())
}

/// Write `label` and read a single trimmed line.
///
/// Returns `None` once the input is closed (EOF or a read error).
fn read_answer(input: &mut impl BufRead, output: &mut impl Write, label: &str) -> Option<String> {
    let _ = write!(output, "{}", label);
    let _ = output.flush();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Keep asking until the answer is a number in `range`, or input closes.
fn read_number(
    input: &mut impl BufRead,
    output: &mut impl Write,
    label: &str,
    range: RangeInclusive<i32>,
) -> Option<i32> {
    loop {
        let answer = read_answer(input, output, label)?;
        match util::parse_i32_safe(Some(answer.as_str())) {
            Some(n) if range.contains(&n) => return Some(n),
            _ => {
                let _ = writeln!(
                    output,
                    "Invalid value. Enter a number between {} and {}.",
                    range.start(),
                    range.end()
                );
            }
        }
    }
}

fn prompt(label: &str) -> Option<String> {
    read_answer(&mut io::stdin().lock(), &mut io::stdout(), label)
}

fn prompt_number(label: &str, range: RangeInclusive<i32>) -> Option<i32> {
    read_number(&mut io::stdin().lock(), &mut io::stdout(), label, range)
}

/// Load the input table through the session's cache, printing the
/// missing-input message when nothing has been imported.
fn load_table(cli: &Cli, loader: &mut Loader) -> Option<std::sync::Arc<RawTable>> {
    match loader.load(&cli.input_path()) {
        Ok(table) if table.is_empty() => {
            println!("{}\n", MSG_NO_FILE);
            None
        }
        Ok(table) => Some(table),
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
            None
        }
    }
}

fn print_report(report: &MonthlyReport) {
    println!(
        "Monthly analysis of concrete-mixer trucks - {}/{}\n",
        report.month, report.year
    );
    if report.skipped_rows > 0 {
        println!(
            "Note: {} rows skipped due to a blank or unreadable date.",
            util::format_int(report.skipped_rows)
        );
    }
    println!("Filtered data table:\n");
    output::preview_table_rows(&report.rows, PREVIEW_ROWS);
    println!("{}", output::render_km_chart(&report.rows));
}

fn export(path: &std::path::Path, report: &MonthlyReport) {
    match output::export_report(path, &report.rows) {
        Ok(()) => println!("{} ({})\n", MSG_EXPORT_OK, path.display()),
        Err(e) => eprintln!("Export failed: {}\n", e),
    }
}

fn clean(cli: &Cli) {
    match cleanup::clean_directory(&cli.files_dir) {
        Ok(outcome) if outcome.is_complete() => {
            println!(
                "{} ({} files removed)\n",
                MSG_CLEANUP_OK,
                util::format_int(outcome.removed.len())
            );
        }
        Ok(outcome) => {
            println!(
                "Removed {} files; {} could not be removed:",
                util::format_int(outcome.removed.len()),
                util::format_int(outcome.failed.len())
            );
            for failure in &outcome.failed {
                println!("  {}: {}", failure.path.display(), failure.reason);
            }
            println!();
        }
        Err(e) => eprintln!("Cleanup failed: {}\n", e),
    }
}

/// Handle option [1]: load the spreadsheet and summarise it.
fn handle_load(cli: &Cli) {
    let mut state = app_state();
    let Some(table) = load_table(cli, &mut state.loader) else {
        return;
    };
    println!(
        "Processing dataset... ({} rows loaded from {})",
        util::format_int(table.row_count()),
        cli.input_path().display()
    );
    let bases = loader::base_options(&table);
    if !bases.is_empty() {
        println!("Bases: {}", bases.join(", "));
    }
    println!();
}

/// Handle option [2]: ask for the period and filters, then print the table.
fn handle_monthly_report(cli: &Cli) {
    let mut state = app_state();
    let Some(table) = load_table(cli, &mut state.loader) else {
        return;
    };

    let Some(month) = prompt_number("Month (1-12): ", 1..=12) else {
        return;
    };
    let Some(year) = prompt_number("Year (2000-2099): ", 2000..=2099) else {
        return;
    };
    let Some(vehicle) = prompt("Vehicle or plate (blank for all): ") else {
        return;
    };

    let bases = loader::base_options(&table);
    println!("Base:");
    println!("  [0] All");
    for (i, base) in bases.iter().enumerate() {
        println!("  [{}] {}", i + 1, base);
    }
    let Some(base_choice) = prompt_number("Enter choice: ", 0..=bases.len() as i32) else {
        return;
    };
    let base = (base_choice as usize)
        .checked_sub(1)
        .and_then(|i| bases.get(i));
    let Some(tipo) = prompt("Type (blank for all): ") else {
        return;
    };
    println!();

    let criteria = FilterCriteria::new(
        Some(vehicle.as_str()),
        base.map(String::as_str),
        Some(tipo.as_str()),
    );
    match reports::build_report(&table, month as u32, year, &criteria) {
        Ok(report) if report.no_data_for_period() => {
            println!("{}\n", MSG_NO_DATA);
            state.last_report = None;
        }
        Ok(report) => {
            print_report(&report);
            state.last_report = Some(report);
        }
        Err(e) => eprintln!("Report failed: {}\n", e),
    }
}

/// Handle option [3]: export the last printed table.
fn handle_export(cli: &Cli) {
    let state = app_state();
    let Some(report) = state.last_report.as_ref() else {
        println!("Error: No report to export. Generate a monthly report first (option 2).\n");
        return;
    };
    export(&cli.export_path(None), report);
}

/// Handle option [4]: delete everything in the files directory.
fn handle_clean(cli: &Cli) {
    clean(cli);
    let mut state = app_state();
    state.loader.invalidate();
    state.last_report = None;
}

fn run_interactive(cli: &Cli) {
    loop {
        println!("Fleet monthly report:");
        println!("[1] Load the file");
        println!("[2] Monthly report");
        println!("[3] Export last report");
        println!("[4] Clean files");
        println!("[0] Exit\n");
        // A closed stdin ends the session like [0].
        let Some(choice) = prompt("Enter choice: ") else {
            println!("\nExiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(cli),
            "2" => {
                println!();
                handle_monthly_report(cli);
            }
            "3" => handle_export(cli),
            "4" => handle_clean(cli),
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-4.\n"),
        }
    }
}

fn run_report(cli: &Cli, args: &ReportArgs) -> anyhow::Result<()> {
    let mut loader = Loader::new();
    let Some(table) = load_table(cli, &mut loader) else {
        return Ok(());
    };
    let criteria = FilterCriteria::new(
        args.vehicle.as_deref(),
        args.base.as_deref(),
        args.tipo.as_deref(),
    );
    let report = reports::build_report(&table, args.month, args.year, &criteria)?;
    if report.no_data_for_period() {
        println!("{}", MSG_NO_DATA);
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.rows)?);
    } else {
        print_report(&report);
    }
    if let Some(name) = &args.export {
        export(&cli.export_path(Some(name)), &report);
    }
    Ok(())
}

/// Print a previously exported monthly table.
fn show_export(path: &std::path::Path) {
    if !path.exists() {
        println!("No export found at {}.\n", path.display());
        return;
    }
    match output::read_export(path) {
        Ok(rows) => {
            println!("Exported data ({}):\n", path.display());
            output::preview_table_rows(&rows, PREVIEW_ROWS);
        }
        Err(e) => eprintln!("Failed to read export: {}\n", e),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    bootstrap::setup_logging(&cli.log_level)?;
    bootstrap::ensure_files_dir(&cli.files_dir)?;
    tracing::debug!("Files directory: {}", cli.files_dir.display());

    match &cli.command {
        None => run_interactive(&cli),
        Some(Command::Report(args)) => run_report(&cli, args)?,
        Some(Command::Clean) => clean(&cli),
        Some(Command::Show { path }) => show_export(&cli.export_path(path.as_ref())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_answer_trims_line() {
        let mut input = Cursor::new("  3 \n");
        let mut output = Vec::new();
        let answer = read_answer(&mut input, &mut output, "Enter choice: ");
        assert_eq!(answer.as_deref(), Some("3"));
        assert_eq!(String::from_utf8(output).unwrap(), "Enter choice: ");
    }

    #[test]
    fn test_read_answer_returns_none_on_closed_input() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        assert_eq!(read_answer(&mut input, &mut output, "Enter choice: "), None);
    }

    #[test]
    fn test_blank_line_is_an_answer_not_eof() {
        let mut input = Cursor::new("\n");
        let mut output = Vec::new();
        assert_eq!(
            read_answer(&mut input, &mut output, "Type: ").as_deref(),
            Some("")
        );
    }

    #[test]
    fn test_read_number_retries_until_in_range() {
        let mut input = Cursor::new("abc\n13\n7\n");
        let mut output = Vec::new();
        assert_eq!(read_number(&mut input, &mut output, "Month: ", 1..=12), Some(7));
        let printed = String::from_utf8(output).unwrap();
        assert_eq!(printed.matches("Invalid value").count(), 2);
    }

    #[test]
    fn test_read_number_stops_when_input_closes() {
        let mut input = Cursor::new("99\n");
        let mut output = Vec::new();
        assert_eq!(read_number(&mut input, &mut output, "Month: ", 1..=12), None);
    }
}
