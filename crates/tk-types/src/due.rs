//! Due-date token parsing.
//!
//! Tokens are matched against an ordered list of independent strategies.
//! Each strategy either produces a date or misses; the first hit wins.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// How numeric day/month tokens are read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateLocale {
    /// Only unambiguous year-first forms.
    #[default]
    Iso,
    /// Month first: `12/31`, `12/31/2025`.
    Us,
    /// Day first: `31/12`, `31/12/2025`.
    Eu,
}

impl fmt::Display for DateLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Iso => "iso",
            Self::Us => "us",
            Self::Eu => "eu",
        };
        f.write_str(s)
    }
}

impl FromStr for DateLocale {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iso" => Ok(Self::Iso),
            "us" => Ok(Self::Us),
            "eu" => Ok(Self::Eu),
            other => Err(TypeError::UnknownLocale(other.to_string())),
        }
    }
}

type Strategy = fn(&str, DateLocale, NaiveDate) -> Option<NaiveDate>;

const STRATEGIES: &[Strategy] = &[
    parse_shortcut,
    parse_iso,
    parse_locale_with_year,
    parse_locale_without_year,
];

/// Parse a due-date token relative to `today`.
pub fn parse_due(input: &str, locale: DateLocale, today: NaiveDate) -> Result<NaiveDate, TypeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TypeError::InvalidDate("empty input".into()));
    }

    if let Some(date) = STRATEGIES
        .iter()
        .find_map(|strategy| strategy(input, locale, today))
    {
        return Ok(date);
    }

    if looks_numeric(input) {
        let hint = match locale {
            DateLocale::Iso => format!(
                "ambiguous numeric format {input:?}; use YYYY-MM-DD or set date_locale to us or eu"
            ),
            DateLocale::Us => {
                format!("expected MM/DD[/YYYY] or MM-DD[-YYYY] for locale us, got {input:?}")
            }
            DateLocale::Eu => {
                format!("expected DD/MM[/YYYY] or DD-MM[-YYYY] for locale eu, got {input:?}")
            }
        };
        return Err(TypeError::InvalidDate(hint));
    }

    Err(TypeError::InvalidDate(format!("unable to parse {input:?}")))
}

fn parse_shortcut(input: &str, _: DateLocale, today: NaiveDate) -> Option<NaiveDate> {
    match input.to_ascii_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => today.checked_add_days(Days::new(1)),
        other => {
            let days: u64 = other.strip_prefix('+')?.parse().ok()?;
            today.checked_add_days(Days::new(days))
        }
    }
}

fn parse_iso(input: &str, _: DateLocale, _: NaiveDate) -> Option<NaiveDate> {
    // Year-first forms always lead with a four-digit year.
    if input.len() < 8 || !input.as_bytes()[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }
    if input.len() == 8 && input.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(input, "%Y%m%d").ok();
    }
    ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
}

/// Split `a/b[/c]` or `a-b[-c]` into numeric parts. Mixed separators miss.
fn numeric_parts(input: &str) -> Option<Vec<u32>> {
    let sep = if input.contains('/') { '/' } else { '-' };
    let parts: Vec<&str> = input.split(sep).collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    parts
        .iter()
        .map(|p| {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                p.parse().ok()
            }
        })
        .collect()
}

fn month_day(locale: DateLocale, first: u32, second: u32) -> Option<(u32, u32)> {
    match locale {
        DateLocale::Iso => None,
        DateLocale::Us => Some((first, second)),
        DateLocale::Eu => Some((second, first)),
    }
}

fn parse_locale_with_year(input: &str, locale: DateLocale, _: NaiveDate) -> Option<NaiveDate> {
    let parts = numeric_parts(input)?;
    if parts.len() != 3 || parts[0] > 99 || parts[1] > 99 {
        return None;
    }
    let (month, day) = month_day(locale, parts[0], parts[1])?;
    let year = i32::try_from(parts[2]).ok()?;
    if !(1900..=2100).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_locale_without_year(input: &str, locale: DateLocale, today: NaiveDate) -> Option<NaiveDate> {
    let parts = numeric_parts(input)?;
    if parts.len() != 2 || parts[0] > 99 || parts[1] > 99 {
        return None;
    }
    let (month, day) = month_day(locale, parts[0], parts[1])?;
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
    match this_year {
        Some(date) if date >= today => Some(date),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}

fn looks_numeric(input: &str) -> bool {
    numeric_parts(input).is_some_and(|parts| {
        let raw: Vec<&str> = input.split(['/', '-']).collect();
        raw.len() == parts.len()
            && raw[0].len() <= 2
            && raw[1].len() <= 2
            && raw.get(2).map_or(true, |y| (2..=4).contains(&y.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn iso_formats() {
        for input in ["2025-12-31", "2025/12/31", "2025.12.31", "20251231"] {
            assert_eq!(
                parse_due(input, DateLocale::Iso, today()).unwrap(),
                ymd(2025, 12, 31),
                "input {input}"
            );
        }
    }

    #[test]
    fn shortcuts() {
        assert_eq!(parse_due("today", DateLocale::Iso, today()).unwrap(), today());
        assert_eq!(parse_due("TOMORROW", DateLocale::Iso, today()).unwrap(), ymd(2025, 6, 16));
        assert_eq!(parse_due("+0", DateLocale::Iso, today()).unwrap(), today());
        assert_eq!(parse_due("+20", DateLocale::Iso, today()).unwrap(), ymd(2025, 7, 5));
        assert!(parse_due("+-1", DateLocale::Iso, today()).is_err());
    }

    #[test]
    fn us_locale_with_year() {
        assert_eq!(parse_due("12/31/2025", DateLocale::Us, today()).unwrap(), ymd(2025, 12, 31));
        assert_eq!(parse_due("1-2-2026", DateLocale::Us, today()).unwrap(), ymd(2026, 1, 2));
    }

    #[test]
    fn eu_locale_with_year() {
        assert_eq!(parse_due("31/12/2025", DateLocale::Eu, today()).unwrap(), ymd(2025, 12, 31));
        assert_eq!(parse_due("2-1-2026", DateLocale::Eu, today()).unwrap(), ymd(2026, 1, 2));
    }

    #[test]
    fn year_out_of_range_is_rejected() {
        assert!(parse_due("12/31/1800", DateLocale::Us, today()).is_err());
    }

    #[test]
    fn next_occurrence_rolls_forward() {
        // June 1 has passed relative to June 15.
        assert_eq!(parse_due("6/1", DateLocale::Us, today()).unwrap(), ymd(2026, 6, 1));
        // Today itself is not rolled.
        assert_eq!(parse_due("15/6", DateLocale::Eu, today()).unwrap(), today());
        assert_eq!(parse_due("12/25", DateLocale::Us, today()).unwrap(), ymd(2025, 12, 25));
    }

    #[test]
    fn iso_locale_rejects_ambiguous_numeric_input() {
        let err = parse_due("12/25", DateLocale::Iso, today()).unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn locale_hint_on_invalid_numeric_input() {
        let err = parse_due("13/45", DateLocale::Us, today()).unwrap_err();
        assert!(err.to_string().contains("MM/DD"));
    }

    #[test]
    fn garbage_input() {
        let err = parse_due("next week", DateLocale::Iso, today()).unwrap_err();
        assert!(err.to_string().contains("unable to parse"));
        assert!(parse_due("   ", DateLocale::Iso, today()).is_err());
    }

    #[test]
    fn locale_from_str() {
        assert_eq!("US".parse::<DateLocale>().unwrap(), DateLocale::Us);
        assert!("fr".parse::<DateLocale>().is_err());
    }
}
