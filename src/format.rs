//! Format-aware string values.
//!
//! The synthesizer asks a [`FormatProvider`] before falling back to pattern
//! or length based generation. [`BuiltinFormats`] recognises common formats
//! by the schema's `format` or, failing that, by the trailing words of the
//! property name (`contactEmail`, `createdDateTime`, `serverIpv6`).

use chrono::{NaiveDate, SecondsFormat, TimeZone, Utc};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use serde_json::Value;

use crate::cycle::PATH_SEPARATOR;
use crate::types::{SchemaKind, SchemaNode};

/// Source of format-specific values.
pub trait FormatProvider {
    /// A value for `node` at `property_path`, or `None` to let the caller fall back.
    fn generate(&self, node: &SchemaNode, property_path: &str, rng: &mut dyn RngCore) -> Option<Value>;
}

/// Formats recognised by [`BuiltinFormats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownFormat {
    Uuid,
    Date,
    DateTime,
    Email,
    Ipv4,
    Ipv6,
    Uri,
    Hostname,
}

impl KnownFormat {
    pub fn from_format(format: &str) -> Option<Self> {
        match format.to_ascii_lowercase().as_str() {
            "uuid" => Some(KnownFormat::Uuid),
            "date" => Some(KnownFormat::Date),
            "date-time" => Some(KnownFormat::DateTime),
            "email" | "idn-email" => Some(KnownFormat::Email),
            "ip" | "ipv4" => Some(KnownFormat::Ipv4),
            "ipv6" => Some(KnownFormat::Ipv6),
            "uri" | "url" | "iri" => Some(KnownFormat::Uri),
            "hostname" | "idn-hostname" => Some(KnownFormat::Hostname),
            _ => None,
        }
    }

    /// Guess from the trailing words of the last property path segment.
    ///
    /// Words split on camelCase humps, `_` and `-`, so `createdDate` and
    /// `created_date` are dates while `candidate` is not.
    pub fn from_property_name(property_path: &str) -> Option<Self> {
        let name = property_path
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(property_path);
        let words = name_words(name);
        let tails: Vec<String> = (0..words.len()).rev().map(|i| words[i..].concat()).collect();

        const SUFFIXES: &[(&str, KnownFormat)] = &[
            ("uuid", KnownFormat::Uuid),
            ("datetime", KnownFormat::DateTime),
            ("date", KnownFormat::Date),
            ("email", KnownFormat::Email),
            ("emailaddress", KnownFormat::Email),
            ("ipv6", KnownFormat::Ipv6),
            ("ipv4", KnownFormat::Ipv4),
            ("ip", KnownFormat::Ipv4),
            ("ipaddress", KnownFormat::Ipv4),
            ("url", KnownFormat::Uri),
            ("uri", KnownFormat::Uri),
            ("hostname", KnownFormat::Hostname),
        ];
        SUFFIXES
            .iter()
            .find(|(suffix, _)| tails.iter().any(|tail| tail == suffix))
            .map(|(_, format)| *format)
    }

    pub fn detect(node: &SchemaNode, property_path: &str) -> Option<Self> {
        node.constraints
            .format
            .as_deref()
            .and_then(Self::from_format)
            .or_else(|| Self::from_property_name(property_path))
    }
}

/// Default provider covering [`KnownFormat`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFormats;

impl FormatProvider for BuiltinFormats {
    fn generate(&self, node: &SchemaNode, property_path: &str, rng: &mut dyn RngCore) -> Option<Value> {
        if node.kind != SchemaKind::String {
            return None;
        }
        let format = KnownFormat::detect(node, property_path)?;
        tracing::trace!(property = property_path, ?format, "format value");

        let value = match format {
            KnownFormat::Uuid => uuid::Builder::from_random_bytes(rng.gen())
                .into_uuid()
                .to_string(),
            KnownFormat::Date => random_date(rng)?.format("%Y-%m-%d").to_string(),
            KnownFormat::DateTime => {
                let date = random_date(rng)?;
                let time = date.and_hms_opt(rng.gen_range(0..24), rng.gen_range(0..60), rng.gen_range(0..60))?;
                Utc.from_utc_datetime(&time)
                    .to_rfc3339_opts(SecondsFormat::Secs, true)
            }
            KnownFormat::Email => format!("{}@example.com", word(rng, 8)),
            KnownFormat::Ipv4 => format!(
                "{}.{}.{}.{}",
                rng.gen_range(1..=223u8),
                rng.gen::<u8>(),
                rng.gen::<u8>(),
                rng.gen_range(1..=254u8)
            ),
            KnownFormat::Ipv6 => (0..8)
                .map(|_| format!("{:x}", rng.gen::<u16>()))
                .collect::<Vec<_>>()
                .join(":"),
            KnownFormat::Uri => format!("https://example.com/{}", word(rng, 10)),
            KnownFormat::Hostname => format!("{}.example.com", word(rng, 8)),
        };
        Some(Value::String(value))
    }
}

/// Lowercased words of a property name.
fn name_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut after_lower = false;
    for c in name.chars() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            after_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && after_lower {
            words.push(std::mem::take(&mut current));
        }
        after_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn random_date(rng: &mut dyn RngCore) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        rng.gen_range(2000..=2030),
        rng.gen_range(1..=12),
        rng.gen_range(1..=28),
    )
}

fn word(rng: &mut dyn RngCore, len: usize) -> String {
    (0..len)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect()
}
