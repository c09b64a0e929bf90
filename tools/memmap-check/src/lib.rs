//! Parsing of textual descriptor lists and reporting of normalized [`MemoryMap`]s.
//!
//! A descriptor list holds one descriptor per line as whitespace separated `key=value` fields:
//!
//! ```text
//! # 32KiB of work RAM, mirrored at 0x8000.
//! start=0x0000 len=0x8000 flags=system_ram
//! start=0x8000 len=0x8000 flags=system_ram
//! ```
//!
//! Recognized keys are `flags`, `start`, `select`, `disconnect`, `len`, and `offset`. Missing keys
//! default to `0`.

use core::{error, fmt};
use std::io::{self, Write};

use memory_map::{DescriptorFlags, MemoryDescriptor, MemoryMap};

/// Parses every descriptor in `text`, in order.
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first malformed line.
pub fn parse_descriptors(text: &str) -> Result<Vec<MemoryDescriptor>, ParseError> {
    let mut descriptors = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let content = line.split_once('#').map_or(line, |(content, _)| content);
        if content.trim().is_empty() {
            continue;
        }

        let mut descriptor = MemoryDescriptor::default();
        for field in content.split_whitespace() {
            let Some((key, value)) = field.split_once('=') else {
                return Err(ParseError::MissingValue {
                    line: line_number,
                    field: field.to_owned(),
                });
            };

            let invalid_number = || ParseError::InvalidNumber {
                line: line_number,
                value: value.to_owned(),
            };
            match key {
                "flags" => descriptor.flags = parse_flags(value, line_number)?,
                "start" => descriptor.start = parse_number(value).ok_or_else(invalid_number)?,
                "select" => descriptor.select = parse_number(value).ok_or_else(invalid_number)?,
                "disconnect" => {
                    descriptor.disconnect = parse_number(value).ok_or_else(invalid_number)?;
                }
                "len" => descriptor.len = parse_number(value).ok_or_else(invalid_number)?,
                "offset" => descriptor.offset = parse_number(value).ok_or_else(invalid_number)?,
                _ => {
                    return Err(ParseError::UnknownKey {
                        line: line_number,
                        key: key.to_owned(),
                    });
                }
            }
        }

        descriptors.push(descriptor);
    }

    Ok(descriptors)
}

/// Writes one line per descriptor of `map` to `writer`.
///
/// # Errors
///
/// Returns any error produced by `writer`.
pub fn write_report<W: Write>(map: &MemoryMap, mut writer: W) -> io::Result<()> {
    for (index, entry) in map.iter().enumerate() {
        let descriptor = entry.descriptor();
        writeln!(
            writer,
            "{index:>3}: start={:#x} select={:#x} disconnect={:#x} len={:#x} \
             disconnect_mask={:#x} offset={:#x} flags={:#x}",
            descriptor.start,
            descriptor.select,
            descriptor.disconnect,
            descriptor.len,
            entry.disconnect_mask(),
            descriptor.offset,
            descriptor.flags.0,
        )?;
    }

    Ok(())
}

/// Parses a decimal or `0x` prefixed hexadecimal number, ignoring `_` separators.
fn parse_number(value: &str) -> Option<usize> {
    let digits = value.replace('_', "");
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        usize::from_str_radix(hex, 16).ok()
    } else {
        digits.parse().ok()
    }
}

/// Parses either a raw flag number or a `|` separated list of flag names.
fn parse_flags(value: &str, line: usize) -> Result<DescriptorFlags, ParseError> {
    if let Some(raw) = parse_number(value) {
        let raw = u64::try_from(raw).map_err(|_| ParseError::InvalidNumber {
            line,
            value: value.to_owned(),
        })?;
        return Ok(DescriptorFlags(raw));
    }

    let mut flags = DescriptorFlags::NONE;
    for name in value.split('|') {
        flags |= match name.to_ascii_lowercase().as_str() {
            "const" => DescriptorFlags::CONST,
            "bigendian" => DescriptorFlags::BIGENDIAN,
            "system_ram" => DescriptorFlags::SYSTEM_RAM,
            "save_ram" => DescriptorFlags::SAVE_RAM,
            "video_ram" => DescriptorFlags::VIDEO_RAM,
            "align_2" => DescriptorFlags::ALIGN_2,
            "align_4" => DescriptorFlags::ALIGN_4,
            "align_8" => DescriptorFlags::ALIGN_8,
            "minsize_2" => DescriptorFlags::MINSIZE_2,
            "minsize_4" => DescriptorFlags::MINSIZE_4,
            "minsize_8" => DescriptorFlags::MINSIZE_8,
            _ => {
                return Err(ParseError::UnknownFlag {
                    line,
                    name: name.to_owned(),
                });
            }
        };
    }

    Ok(flags)
}

/// Various errors that can occur while parsing a descriptor list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// A field was not of the form `key=value`.
    MissingValue {
        /// The 1-based line number of the field.
        line: usize,
        /// The malformed field.
        field: String,
    },
    /// A field used an unrecognized key.
    UnknownKey {
        /// The 1-based line number of the field.
        line: usize,
        /// The unrecognized key.
        key: String,
    },
    /// A numeric field could not be parsed.
    InvalidNumber {
        /// The 1-based line number of the field.
        line: usize,
        /// The unparsable value.
        value: String,
    },
    /// A `flags` field named an unrecognized flag.
    UnknownFlag {
        /// The 1-based line number of the field.
        line: usize,
        /// The unrecognized flag name.
        name: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingValue { line, field } => {
                write!(f, "line {line}: expected `key=value`, found {field:?}")
            }
            Self::UnknownKey { line, key } => write!(f, "line {line}: unknown key {key:?}"),
            Self::InvalidNumber { line, value } => {
                write!(f, "line {line}: invalid number {value:?}")
            }
            Self::UnknownFlag { line, name } => write!(f, "line {line}: unknown flag {name:?}"),
        }
    }
}

impl error::Error for ParseError {}
