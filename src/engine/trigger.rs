// src/engine/trigger.rs

//! Cron expression parsing.
//!
//! Operators write classic five-field crontab expressions
//! (`min hour dom month dow`). The `cron` crate expects a leading seconds
//! field and numbers weekdays from 1 (Sunday), so five-field expressions are
//! normalised: a `0` seconds field is prepended and numeric weekdays are
//! rewritten to names. Six/seven-field expressions pass through unchanged.

use std::str::FromStr;

use cron::Schedule;

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Parse a cron expression into a schedule.
pub fn parse_cron(expr: &str) -> Result<Schedule, cron::error::Error> {
    Schedule::from_str(&normalise(expr))
}

fn normalise(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return fields.join(" ");
    }
    format!(
        "0 {} {} {} {} {}",
        fields[0],
        fields[1],
        fields[2],
        fields[3],
        crontab_weekdays(fields[4])
    )
}

/// Rewrite crontab weekday numbers (0-7, both 0 and 7 meaning Sunday) to
/// names. Anything non-numeric is left for the parser to judge.
fn crontab_weekdays(field: &str) -> String {
    field
        .split(',')
        .map(|item| {
            let (range, step) = match item.split_once('/') {
                Some((r, s)) => (r, Some(s)),
                None => (item, None),
            };
            let mapped = match range.split_once('-') {
                Some((a, b)) => match (weekday_number(a), weekday_number(b)) {
                    (Some(a), Some(7)) if a == 0 || a == 7 => "SUN-SAT".to_string(),
                    // Ranges ending on Sunday-as-7 wrap past Saturday.
                    (Some(a), Some(7)) => format!("{}-SAT,SUN", WEEKDAYS[a]),
                    (Some(a), Some(b)) => format!("{}-{}", WEEKDAYS[a % 7], WEEKDAYS[b]),
                    _ => range.to_string(),
                },
                None => match weekday_number(range) {
                    Some(n) => WEEKDAYS[n % 7].to_string(),
                    None => range.to_string(),
                },
            };
            match step {
                Some(s) => format!("{mapped}/{s}"),
                None => mapped,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn weekday_number(s: &str) -> Option<usize> {
    s.parse::<usize>().ok().filter(|n| *n <= 7)
}
