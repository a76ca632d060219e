//! Interactive price CSV picker.
//!
//! Used when `--source csv` is given without `--csv`. Files under the working
//! directory are listed when their header has a date column and a price column;
//! the user picks one by number or types a path.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Directory recursion depth when looking for CSV files.
const SEARCH_DEPTH: usize = 3;

/// Parsed answer to the selection prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Answer {
    Quit,
    Index(usize),
    Path(PathBuf),
    Invalid(String),
}

/// Prompt for a price CSV from the current directory tree.
pub fn prompt_for_price_csv() -> Result<PathBuf, AppError> {
    let files = discover_price_csvs(Path::new("."));
    if files.is_empty() {
        return Err(AppError::new(
            2,
            "No price CSV files (date + close columns) found. Pass one with `--csv <file.csv>`.",
        ));
    }

    println!("Price CSV files:");
    for (idx, path) in files.iter().enumerate() {
        println!("{:>3}) {}", idx + 1, pretty_path(path));
    }

    let stdin = io::stdin();
    loop {
        print!("Select 1-{} or type a path (q to quit): ", files.len());
        io::stdout()
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to write prompt: {e}")))?;

        let mut input = String::new();
        let bytes = stdin
            .lock()
            .read_line(&mut input)
            .map_err(|e| AppError::new(2, format!("Failed to read input: {e}")))?;
        if bytes == 0 {
            return Err(AppError::new(2, "No input received. Pass a CSV with `--csv <file.csv>`."));
        }

        match parse_answer(&input, files.len()) {
            Answer::Quit => return Err(AppError::new(2, "Canceled.")),
            Answer::Index(i) => return validate_csv_path(&files[i]),
            Answer::Path(path) => match validate_csv_path(&path) {
                Ok(path) => return Ok(path),
                Err(err) => println!("{err}"),
            },
            Answer::Invalid(msg) => println!("{msg}"),
        }
    }
}

fn parse_answer(input: &str, count: usize) -> Answer {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return Answer::Quit;
    }
    if input.is_empty() {
        return Answer::Invalid("Enter a number or a path.".to_string());
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Answer::Index(n - 1),
        Ok(n) => Answer::Invalid(format!("Invalid choice: {n}. Enter a number between 1 and {count}.")),
        Err(_) => Answer::Path(PathBuf::from(input)),
    }
}

/// Check that `path` is an existing `.csv` file.
pub fn validate_csv_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.is_file() {
        return Err(AppError::new(2, format!("CSV file not found: {}", path.display())));
    }
    if !has_csv_extension(path) {
        return Err(AppError::new(
            2,
            format!("Expected a .csv file, got: {}", path.display()),
        ));
    }
    Ok(path.to_path_buf())
}

/// Price-shaped CSV files under `root`, sorted by path.
pub fn discover_price_csvs(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(root, 0, &mut out);
    out.retain(|p| looks_like_price_csv(p));
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn walk(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    if depth > SEARCH_DEPTH {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if !skip_dir(&path) {
                walk(&path, depth + 1, out);
            }
        } else if file_type.is_file() && has_csv_extension(&path) {
            out.push(path);
        }
    }
}

fn looks_like_price_csv(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut header = String::new();
    if BufReader::new(file).read_line(&mut header).is_err() {
        return false;
    }
    header_has_price_columns(&header)
}

fn header_has_price_columns(header: &str) -> bool {
    let cols: Vec<String> = header
        .trim_start_matches('\u{feff}')
        .split(',')
        .map(|c| c.trim().trim_matches('"').to_ascii_lowercase())
        .collect();
    let has = |names: &[&str]| cols.iter().any(|c| names.contains(&c.as_str()));
    has(&["date", "time", "timestamp"]) && has(&["close", "price", "adj_close", "adj close"])
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    name.starts_with('.') || matches!(name, "target" | "node_modules" | "debug")
}

fn pretty_path(path: &Path) -> String {
    path.strip_prefix("./").unwrap_or(path).display().to_string()
}
