// file: src/config/resources.rs
// version: 1.0.0
// guid: c93246a2-7ccc-42af-975e-d465d0309905

//! Typed scheduler resource values: wall-clock limit and memory ceiling
//!
//! Both keep the literal text they were parsed from so the rendered
//! directive is exactly what the user configured.

use crate::JobError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar as it appears in a config file: quoted text or a bare integer
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawLiteral {
    Text(String),
    Number(u64),
}

impl From<RawLiteral> for String {
    fn from(raw: RawLiteral) -> Self {
        match raw {
            RawLiteral::Text(text) => text,
            RawLiteral::Number(n) => n.to_string(),
        }
    }
}

/// Job time limit in Slurm syntax
///
/// Accepted forms: `M`, `M:S`, `H:M:S`, `D-H`, `D-H:M`, `D-H:M:S`.
/// Unlimited and zero limits are rejected; the job always asks for a
/// bounded duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLiteral", into = "String")]
pub struct WallTime {
    literal: String,
    seconds: u64,
}

impl WallTime {
    /// Limit given in days, hours and minutes, written as `D-HH:MM`
    pub fn from_dhm(days: u64, hours: u64, minutes: u64) -> Self {
        Self {
            literal: format!("{}-{:02}:{:02}", days, hours, minutes),
            seconds: days
                .saturating_mul(86_400)
                .saturating_add(hours.saturating_mul(3_600))
                .saturating_add(minutes.saturating_mul(60)),
        }
    }

    /// Total limit in seconds
    pub fn as_seconds(&self) -> u64 {
        self.seconds
    }

    /// The text this limit was parsed from
    pub fn as_str(&self) -> &str {
        &self.literal
    }
}

fn parse_field(field: &str, literal: &str) -> Result<u64, JobError> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_digit()) {
        return Err(JobError::validation(format!("Invalid time limit: {}", literal)));
    }
    field
        .parse::<u64>()
        .map_err(|_| JobError::validation(format!("Invalid time limit: {}", literal)))
}

fn too_long(literal: &str) -> JobError {
    JobError::validation(format!("Invalid time limit {}: too long", literal))
}

/// `d*86400 + h*3600 + m*60 + s`, or an error on overflow
fn total_seconds(d: u64, h: u64, m: u64, s: u64, literal: &str) -> Result<u64, JobError> {
    d.checked_mul(86_400)
        .and_then(|t| h.checked_mul(3_600).and_then(|h| t.checked_add(h)))
        .and_then(|t| m.checked_mul(60).and_then(|m| t.checked_add(m)))
        .and_then(|t| t.checked_add(s))
        .ok_or_else(|| too_long(literal))
}

fn bounded(value: u64, max: u64, what: &str, literal: &str) -> Result<u64, JobError> {
    if value >= max {
        return Err(JobError::validation(format!(
            "Invalid time limit {}: {} must be below {}",
            literal, what, max
        )));
    }
    Ok(value)
}

impl FromStr for WallTime {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let literal = s.trim();
        let upper = literal.to_ascii_uppercase();
        if upper == "INFINITE" || upper == "UNLIMITED" {
            return Err(JobError::validation("Time limit must be bounded"));
        }

        let seconds = match literal.split_once('-') {
            Some((days, rest)) => {
                let days = parse_field(days, literal)?;
                let parts: Vec<&str> = rest.split(':').collect();
                let (h, m, s) = match parts.as_slice() {
                    [h] => (parse_field(h, literal)?, 0, 0),
                    [h, m] => (parse_field(h, literal)?, parse_field(m, literal)?, 0),
                    [h, m, s] => (
                        parse_field(h, literal)?,
                        parse_field(m, literal)?,
                        parse_field(s, literal)?,
                    ),
                    _ => return Err(JobError::validation(format!("Invalid time limit: {}", literal))),
                };
                let h = bounded(h, 24, "hours", literal)?;
                let m = bounded(m, 60, "minutes", literal)?;
                let s = bounded(s, 60, "seconds", literal)?;
                total_seconds(days, h, m, s, literal)?
            }
            None => {
                let parts: Vec<&str> = literal.split(':').collect();
                match parts.as_slice() {
                    [m] => total_seconds(0, 0, parse_field(m, literal)?, 0, literal)?,
                    [m, s] => {
                        let s = bounded(parse_field(s, literal)?, 60, "seconds", literal)?;
                        total_seconds(0, 0, parse_field(m, literal)?, s, literal)?
                    }
                    [h, m, s] => {
                        let m = bounded(parse_field(m, literal)?, 60, "minutes", literal)?;
                        let s = bounded(parse_field(s, literal)?, 60, "seconds", literal)?;
                        total_seconds(0, parse_field(h, literal)?, m, s, literal)?
                    }
                    _ => return Err(JobError::validation(format!("Invalid time limit: {}", literal))),
                }
            }
        };

        if seconds == 0 {
            return Err(JobError::validation("Time limit must be greater than zero"));
        }

        Ok(Self {
            literal: literal.to_string(),
            seconds,
        })
    }
}

impl TryFrom<RawLiteral> for WallTime {
    type Error = JobError;

    fn try_from(raw: RawLiteral) -> Result<Self, Self::Error> {
        String::from(raw).parse()
    }
}

impl From<WallTime> for String {
    fn from(time: WallTime) -> Self {
        time.literal
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

/// Per-node memory ceiling, e.g. `64GB`, `16G`, `4096` (megabytes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLiteral", into = "String")]
pub struct MemoryLimit {
    literal: String,
    megabytes: u64,
}

impl MemoryLimit {
    /// Ceiling of whole gigabytes, written as `<n>GB`
    pub fn gigabytes(amount: u64) -> Self {
        Self {
            literal: format!("{}GB", amount),
            megabytes: amount.saturating_mul(1024),
        }
    }

    /// Ceiling in megabytes, rounded up for kilobyte values
    pub fn as_megabytes(&self) -> u64 {
        self.megabytes
    }

    /// The text this limit was parsed from
    pub fn as_str(&self) -> &str {
        &self.literal
    }
}

impl FromStr for MemoryLimit {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let literal = s.trim();
        let re = Regex::new(r"^(?i)(\d+)([KMGT])?B?$")
            .map_err(|e| JobError::config(format!("Invalid regex pattern: {}", e)))?;

        let caps = re
            .captures(literal)
            .ok_or_else(|| JobError::validation(format!("Invalid memory limit: {}", literal)))?;

        let amount: u64 = caps[1]
            .parse()
            .map_err(|_| JobError::validation(format!("Invalid memory limit: {}", literal)))?;

        let unit = caps
            .get(2)
            .map(|m| m.as_str().to_ascii_uppercase())
            .unwrap_or_else(|| "M".to_string());

        let megabytes = match unit.as_str() {
            "K" => Some(amount / 1024 + u64::from(amount % 1024 != 0)),
            "M" => Some(amount),
            "G" => amount.checked_mul(1024),
            _ => amount.checked_mul(1024 * 1024),
        }
        .ok_or_else(|| JobError::validation(format!("Invalid memory limit {}: too large", literal)))?;

        if megabytes == 0 {
            return Err(JobError::validation("Memory limit must be greater than zero"));
        }

        Ok(Self {
            literal: literal.to_string(),
            megabytes,
        })
    }
}

impl TryFrom<RawLiteral> for MemoryLimit {
    type Error = JobError;

    fn try_from(raw: RawLiteral) -> Result<Self, Self::Error> {
        String::from(raw).parse()
    }
}

impl From<MemoryLimit> for String {
    fn from(mem: MemoryLimit) -> Self {
        mem.literal
    }
}

impl fmt::Display for MemoryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_time_forms() {
        let cases = [
            ("30", 30 * 60),
            ("90:30", 90 * 60 + 30),
            ("01:15:00", 4_500),
            ("2-0", 2 * 86_400),
            ("0-00:30", 1_800),
            ("1-02:03:04", 86_400 + 7_200 + 180 + 4),
        ];

        for (text, seconds) in cases {
            let time: WallTime = text.parse().unwrap();
            assert_eq!(time.as_seconds(), seconds, "{}", text);
            assert_eq!(time.to_string(), text);
        }
    }

    #[test]
    fn test_constructors_match_parsing() {
        assert_eq!(WallTime::from_dhm(0, 0, 30), "0-00:30".parse().unwrap());
        assert_eq!(MemoryLimit::gigabytes(64), "64GB".parse().unwrap());
    }

    #[test]
    fn test_wall_time_rejects_invalid() {
        for text in ["", "abc", "0", "0-00:00", "1:60", "0-24", "1:2:3:4", "UNLIMITED", "-5"] {
            assert!(text.parse::<WallTime>().is_err(), "{}", text);
        }
    }

    #[test]
    fn test_memory_limit_units() {
        let cases = [
            ("64GB", 65_536),
            ("16G", 16_384),
            ("4096", 4_096),
            ("512M", 512),
            ("1T", 1_048_576),
            ("1500K", 2),
            ("8gb", 8_192),
        ];

        for (text, mb) in cases {
            let mem: MemoryLimit = text.parse().unwrap();
            assert_eq!(mem.as_megabytes(), mb, "{}", text);
            assert_eq!(mem.as_str(), text);
        }
    }

    #[test]
    fn test_wall_time_overflow_is_an_error() {
        for text in ["400000000000000000", "400000000000000-0", "6000000000000000:00:00"] {
            let err = text.parse::<WallTime>().unwrap_err();
            assert!(err.to_string().contains("too long"), "{}", text);
        }
    }

    #[test]
    fn test_memory_limit_extremes() {
        let mem: MemoryLimit = "18446744073709551615K".parse().unwrap();
        assert_eq!(mem.as_megabytes(), 18_014_398_509_481_984);

        let err = "18446744073709551615T".parse::<MemoryLimit>().unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_memory_limit_rejects_invalid() {
        for text in ["", "0", "0G", "64 GB", "lots", "12P"] {
            assert!(text.parse::<MemoryLimit>().is_err(), "{}", text);
        }
    }

    #[test]
    fn test_yaml_accepts_bare_numbers() {
        let time: WallTime = serde_yaml::from_str("45").unwrap();
        assert_eq!(time.as_seconds(), 2_700);

        let mem: MemoryLimit = serde_yaml::from_str("2048").unwrap();
        assert_eq!(mem.as_megabytes(), 2_048);

        let yaml = serde_yaml::to_string(&mem).unwrap();
        let back: MemoryLimit = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, mem);
    }
}
