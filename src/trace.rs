use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Load,
    Store,
}

impl AccessKind {
    pub fn is_store(self) -> bool {
        matches!(self, AccessKind::Store)
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Load => write!(f, "l"),
            AccessKind::Store => write!(f, "s"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceAccess {
    pub kind: AccessKind,
    pub address: u64,
}

/// What to do with a line that cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Abort the whole load with the offending line number.
    #[default]
    Strict,
    /// Skip the line, log it, and keep going.
    Lenient,
}

#[derive(Debug, Clone)]
pub struct TraceFile {
    pub name: String,
    pub entries: Vec<TraceAccess>,
    pub skipped: usize,
}

impl TraceFile {
    pub fn load(path: impl AsRef<Path>, mode: ParseMode) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Unable to open trace file {}", path.display()))?;
        let name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(name, BufReader::new(file), mode)
    }

    pub fn parse(name: impl Into<String>, reader: impl BufRead, mode: ParseMode) -> Result<Self> {
        let name = name.into();
        let mut entries = Vec::new();
        let mut skipped = 0;
        for (idx, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read line from trace")?;
            match parse_line(&line) {
                Ok(Some(access)) => entries.push(access),
                Ok(None) => {}
                Err(err) => match mode {
                    ParseMode::Strict => {
                        return Err(err.context(format!("{name}: trace line {}", idx + 1)));
                    }
                    ParseMode::Lenient => {
                        warn!(trace = %name, line = idx + 1, "skipping malformed trace line: {err:#}");
                        skipped += 1;
                    }
                },
            }
        }
        debug!(trace = %name, accesses = entries.len(), skipped, "trace loaded");
        Ok(Self {
            name,
            entries,
            skipped,
        })
    }
}

/// Parses `<kind> <hex address> [ignored...]`. Blank and `#` lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<TraceAccess>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let mut parts = trimmed.split_whitespace();
    let op = parts.next().context("missing access kind")?;
    let addr = parts.next().context("missing address")?;
    // Only an exact `l` loads; every other kind token is a store.
    let kind = if op == "l" {
        AccessKind::Load
    } else {
        AccessKind::Store
    };
    let address =
        parse_address(addr).with_context(|| format!("invalid address literal '{addr}'"))?;
    Ok(Some(TraceAccess { kind, address }))
}

fn parse_address(token: &str) -> Result<u64> {
    let hex = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    Ok(u64::from_str_radix(hex, 16)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_loads_and_stores() {
        assert_eq!(
            parse_line("l 0x1fffff50 1").unwrap(),
            Some(TraceAccess {
                kind: AccessKind::Load,
                address: 0x1fff_ff50
            })
        );
        assert_eq!(
            parse_line("  s 7ff0 3 extra").unwrap(),
            Some(TraceAccess {
                kind: AccessKind::Store,
                address: 0x7ff0
            })
        );
    }

    #[test]
    fn any_kind_other_than_l_is_a_store() {
        for line in ["w 0x40", "L 0x40", "S 0x40", "load 0x40"] {
            assert_eq!(
                parse_line(line).unwrap(),
                Some(TraceAccess {
                    kind: AccessKind::Store,
                    address: 0x40
                }),
                "{line}"
            );
        }
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# header").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_line("l").is_err());
        assert!(parse_line("w").is_err());
        assert!(parse_line("l 0xzz").is_err());
        assert!(parse_line("s 0x").is_err());
    }

    #[test]
    fn strict_mode_reports_line_number() {
        let input = "l 0x0\ns 0x40\nbogus\n";
        let err = TraceFile::parse("t", Cursor::new(input), ParseMode::Strict).unwrap_err();
        assert!(format!("{err:#}").contains("trace line 3"));
    }

    #[test]
    fn lenient_mode_counts_skipped_lines() {
        let input = "l 0x0\nq\n\nq 0x80\nl nothex\n";
        let trace = TraceFile::parse("t", Cursor::new(input), ParseMode::Lenient).unwrap();
        assert_eq!(trace.entries.len(), 2);
        assert_eq!(trace.skipped, 2);
        assert_eq!(trace.entries[1].kind, AccessKind::Store);
        assert_eq!(trace.entries[1].address, 0x80);
    }
}
