//! Configuration validation.
//!
//! Validates every section a run reads before any data is loaded, and offers
//! the strict value readers the CLI builds its parameters with. A value that
//! is present but malformed is always an error, never a silent default.

use crate::domain::error::RotasimError;
use crate::domain::fees::CAPITAL_GAINS_TAX_RATE;
use crate::domain::indicator::MovingAverageKind;
use crate::domain::strategy::{StrategyConfig, StrategyKind};
use crate::ports::config_port::ConfigPort;

pub const AUTO: &str = "auto";
pub const DEFAULT_PAGE_SIZE: usize = 1000;

pub fn strategy_section(name: &str) -> String {
    format!("strategy.{}", name.trim().to_lowercase())
}

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), RotasimError> {
    validate_data_config(config)?;
    let names = validate_strategy_list(config)?;
    let mut needs_search = false;
    for name in &names {
        needs_search |= validate_strategy_config(config, name)?;
    }
    if needs_search {
        validate_search_config(config)?;
    }
    read_bool(config, "report", "log_scale", true)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), RotasimError> {
    require_string(config, "data", "symbol")?;
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.trim().to_lowercase().as_str() {
        "csv" => {
            require_string(config, "data", "path")?;
        }
        "marketstack" => {
            require_string(config, "marketstack", "api_key")?;
            read_page_size(config)?;
        }
        other => {
            return Err(invalid(
                "data",
                "source",
                &format!("unknown source '{}' (expected csv or marketstack)", other),
            ));
        }
    }
    Ok(())
}

/// Names listed under `[backtest] strategies`, in order.
pub fn validate_strategy_list(config: &dyn ConfigPort) -> Result<Vec<String>, RotasimError> {
    let names = config.get_list("backtest", "strategies");
    if names.is_empty() {
        return Err(RotasimError::ConfigMissing {
            section: "backtest".to_string(),
            key: "strategies".to_string(),
        });
    }
    Ok(names)
}

/// Validates one `[strategy.<name>]` section.
///
/// Returns whether the section asks for a searched window or leverage.
pub fn validate_strategy_config(config: &dyn ConfigPort, name: &str) -> Result<bool, RotasimError> {
    let section = strategy_section(name);
    let kind = read_kind(config, &section)?;
    let mut needs_search = false;

    if read_leverage(config, &section)?.is_none() {
        if kind != StrategyKind::Rotary {
            return Err(invalid(&section, "leverage", "auto requires kind = rotary"));
        }
        needs_search = true;
    }

    if kind == StrategyKind::Rotary {
        needs_search |= read_window(config, &section)?.is_none();
        read_moving_average(config, &section)?;
    }

    for key in ["ter", "spread", "certificate_fee", "performance_fee"] {
        let value = read_f64(config, &section, key, 0.0)?;
        if !(0.0..1.0).contains(&value) {
            return Err(invalid(&section, key, "must be a fraction in [0, 1)"));
        }
    }
    let tax_rate = read_f64(config, &section, "tax_rate", CAPITAL_GAINS_TAX_RATE)?;
    if !(0.0..1.0).contains(&tax_rate) {
        return Err(invalid(&section, "tax_rate", "must be a fraction in [0, 1)"));
    }
    read_bool(config, &section, "tax_at_rotation", false)?;
    read_bool(config, &section, "circuit_breakers", false)?;

    Ok(needs_search)
}

pub fn validate_search_config(config: &dyn ConfigPort) -> Result<(), RotasimError> {
    read_window_sizes(config)?;
    let leverages = read_leverages(config)?;
    if leverages
        .iter()
        .any(|l| !(0.0..=StrategyConfig::MAX_LEVERAGE).contains(l))
    {
        return Err(invalid(
            "search",
            "leverages",
            &format!("must be between 0 and {}", StrategyConfig::MAX_LEVERAGE),
        ));
    }
    read_bool(config, "search", "parallel", true)?;
    Ok(())
}

/// Parses `start:stop:step` (stop exclusive) or a comma-separated list.
pub fn parse_window_sizes(raw: &str) -> Result<Vec<usize>, String> {
    let raw = raw.trim();
    let windows: Vec<usize> = if raw.contains(':') {
        let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
        let (start, stop, step) = match parts.as_slice() {
            [start, stop] => (*start, *stop, "1"),
            [start, stop, step] => (*start, *stop, *step),
            _ => return Err(format!("expected start:stop[:step], got '{}'", raw)),
        };
        let start: usize = start.parse().map_err(|_| format!("invalid start '{}'", start))?;
        let stop: usize = stop.parse().map_err(|_| format!("invalid stop '{}'", stop))?;
        let step: usize = step.parse().map_err(|_| format!("invalid step '{}'", step))?;
        if step == 0 {
            return Err("step must be positive".to_string());
        }
        (start..stop).step_by(step).collect()
    } else {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().map_err(|_| format!("invalid window size '{}'", s)))
            .collect::<Result<_, _>>()?
    };

    if windows.is_empty() {
        return Err("no window sizes".to_string());
    }
    if windows.contains(&0) {
        return Err("window sizes must be positive".to_string());
    }
    Ok(windows)
}

pub fn read_window_sizes(config: &dyn ConfigPort) -> Result<Vec<usize>, RotasimError> {
    let raw = require_string(config, "search", "window_sizes")?;
    parse_window_sizes(&raw).map_err(|reason| invalid("search", "window_sizes", &reason))
}

pub fn read_leverages(config: &dyn ConfigPort) -> Result<Vec<f64>, RotasimError> {
    let raw = config.get_list("search", "leverages");
    if raw.is_empty() {
        return Err(RotasimError::ConfigMissing {
            section: "search".to_string(),
            key: "leverages".to_string(),
        });
    }
    raw.iter()
        .map(|s| parse_f64("search", "leverages", s))
        .collect()
}

pub fn read_kind(config: &dyn ConfigPort, section: &str) -> Result<StrategyKind, RotasimError> {
    let raw = require_string(config, section, "kind")?;
    raw.parse()
        .map_err(|e: RotasimError| invalid(section, "kind", &e.to_string()))
}

pub fn read_moving_average(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<MovingAverageKind, RotasimError> {
    match config.get_string(section, "moving_average") {
        None => Ok(MovingAverageKind::default()),
        Some(raw) => raw
            .parse()
            .map_err(|e: RotasimError| invalid(section, "moving_average", &e.to_string())),
    }
}

pub fn is_auto(config: &dyn ConfigPort, section: &str, key: &str) -> bool {
    config
        .get_string(section, key)
        .is_some_and(|raw| raw.trim().eq_ignore_ascii_case(AUTO))
}

/// Fixed leverage of a strategy section, `None` for `auto`. Defaults to 1.
pub fn read_leverage(config: &dyn ConfigPort, section: &str) -> Result<Option<f64>, RotasimError> {
    if is_auto(config, section, "leverage") {
        return Ok(None);
    }
    let leverage = read_f64(config, section, "leverage", 1.0)?;
    if !(0.0..=StrategyConfig::MAX_LEVERAGE).contains(&leverage) {
        return Err(invalid(
            section,
            "leverage",
            &format!("must be between 0 and {}", StrategyConfig::MAX_LEVERAGE),
        ));
    }
    Ok(Some(leverage))
}

/// Fixed MA window of a strategy section, `None` for `auto`. Required.
pub fn read_window(config: &dyn ConfigPort, section: &str) -> Result<Option<usize>, RotasimError> {
    let raw = require_string(config, section, "window_size")?;
    if raw.eq_ignore_ascii_case(AUTO) {
        return Ok(None);
    }
    parse_window(section, "window_size", &raw).map(Some)
}

pub fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, RotasimError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => parse_f64(section, key, &raw),
    }
}

pub fn read_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, RotasimError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(invalid(section, key, "expected true or false")),
        },
    }
}

pub fn require_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, RotasimError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(RotasimError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

/// `[marketstack] page_size`, a positive integer defaulting to 1000.
pub fn read_page_size(config: &dyn ConfigPort) -> Result<usize, RotasimError> {
    match config.get_string("marketstack", "page_size") {
        None => Ok(DEFAULT_PAGE_SIZE),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(invalid(
                "marketstack",
                "page_size",
                &format!("'{}' is not a positive integer", raw.trim()),
            )),
        },
    }
}

pub fn parse_window(section: &str, key: &str, raw: &str) -> Result<usize, RotasimError> {
    match raw.trim().parse::<usize>() {
        Ok(w) if w > 0 => Ok(w),
        _ => Err(invalid(section, key, "must be a positive integer or auto")),
    }
}

fn parse_f64(section: &str, key: &str, raw: &str) -> Result<f64, RotasimError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(invalid(section, key, &format!("'{}' is not a number", raw.trim()))),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> RotasimError {
    RotasimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
