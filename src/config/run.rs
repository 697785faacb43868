//! Command-line run options for the materialization binary.

use std::path::PathBuf;

use crate::config::VolatilityWindow;
use crate::error::{CridError, Result};

/// Environment variable consulted when `--volatility-window` is absent
pub const WINDOW_ENV_VAR: &str = "CRID_VOLATILITY_WINDOW";

/// What a run does with the output table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Rebuild the output and validate it
    #[default]
    Materialize,
    /// Validate an existing output without rebuilding it
    ValidateOnly,
    /// Compute everything but write nothing
    DryRun,
}

/// Options for one invocation of the binary
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Measure observations (Parquet file or directory of Parquet files)
    pub observations: Option<PathBuf>,
    /// Weight definitions (JSON or Parquet)
    pub weights: Option<PathBuf>,
    /// Output Parquet file
    pub output: PathBuf,
    /// Optional path for the validation report as JSON
    pub report_json: Option<PathBuf>,
    /// Volatility window
    pub volatility_window: VolatilityWindow,
    /// Run mode
    pub mode: RunMode,
    /// Disable rayon partitioning
    pub sequential: bool,
    /// Draw progress bars
    pub progress: bool,
}

/// Usage text printed for `--help`
pub const USAGE: &str = "\
Usage: crid-engine --output <path> [options]

Options:
  --observations <path>      Measure observations (Parquet file or directory)
  --weights <path>           Weight definitions (.json or .parquet)
  --output <path>            CRID output Parquet file
  --volatility-window <3|4>  Rolling window for CRID volatility (default 3)
  --validate                 Validate the existing output only
  --dry-run                  Compute without writing output
  --sequential               Disable parallel processing
  --progress                 Show progress bars
  --report-json <path>       Also write the validation report as JSON
  -h, --help                 Print this help";

impl RunOptions {
    /// Parse options from command-line tokens (program name excluded)
    ///
    /// Returns `Ok(None)` when help was requested. The window is resolved from
    /// the flag, then from `CRID_VOLATILITY_WINDOW`, then the default, and is
    /// validated before anything else is checked.
    pub fn parse(tokens: &[String]) -> Result<Option<Self>> {
        Self::parse_with_env(tokens, std::env::var(WINDOW_ENV_VAR).ok())
    }

    /// Parse options with an explicit environment fallback for the window
    pub fn parse_with_env(tokens: &[String], window_env: Option<String>) -> Result<Option<Self>> {
        let mut options = Self::default();
        let mut window_raw: Option<String> = None;
        let mut output: Option<PathBuf> = None;
        let mut validate = false;
        let mut dry_run = false;

        let mut idx = 0usize;
        while idx < tokens.len() {
            let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
            match flag {
                "-h" | "--help" => return Ok(None),
                "--observations" => {
                    let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                    options.observations = Some(PathBuf::from(raw));
                }
                "--weights" => {
                    let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                    options.weights = Some(PathBuf::from(raw));
                }
                "--output" => {
                    let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                    output = Some(PathBuf::from(raw));
                }
                "--report-json" => {
                    let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                    options.report_json = Some(PathBuf::from(raw));
                }
                "--volatility-window" => {
                    window_raw = Some(take_flag_value(flag, inline_value, tokens, &mut idx)?);
                }
                "--validate" => {
                    ensure_no_inline_value(flag, inline_value)?;
                    validate = true;
                }
                "--dry-run" => {
                    ensure_no_inline_value(flag, inline_value)?;
                    dry_run = true;
                }
                "--sequential" => {
                    ensure_no_inline_value(flag, inline_value)?;
                    options.sequential = true;
                }
                "--progress" => {
                    ensure_no_inline_value(flag, inline_value)?;
                    options.progress = true;
                }
                other => {
                    return Err(CridError::config(format!("unknown option '{other}'")));
                }
            }
            idx += 1;
        }

        if let Some(raw) = window_raw.or(window_env) {
            options.volatility_window = raw.parse()?;
        }

        options.mode = match (validate, dry_run) {
            (true, true) => {
                return Err(CridError::config(
                    "--validate and --dry-run cannot be combined",
                ));
            }
            (true, false) => RunMode::ValidateOnly,
            (false, true) => RunMode::DryRun,
            (false, false) => RunMode::Materialize,
        };

        options.output =
            output.ok_or_else(|| CridError::config("--output <path> is required"))?;

        if options.mode != RunMode::ValidateOnly
            && (options.observations.is_none() || options.weights.is_none())
        {
            return Err(CridError::config(
                "--observations and --weights are required unless --validate is given",
            ));
        }

        Ok(Some(options))
    }
}

fn split_flag(token: &str) -> Result<(&str, Option<String>)> {
    if token == "-h" {
        return Ok((token, None));
    }
    if !token.starts_with("--") {
        return Err(CridError::config(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CridError::config(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CridError::config(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn ensure_no_inline_value(flag: &str, inline_value: Option<String>) -> Result<()> {
    if inline_value.is_some() {
        return Err(CridError::config(format!("{flag} does not accept a value")));
    }
    Ok(())
}
