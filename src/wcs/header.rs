use std::{collections::BTreeMap, path::Path};

use anyhow::Context as _;

const CARD_LEN: usize = 80;

/// A parsed header value.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl HeaderValue {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Keyword/value cards of a WCS header.
///
/// Real FITS files are read through `fitsio`; text headers carry one
/// `KEY = value / comment` card per line and stop at `END`.
#[derive(Clone, Debug, Default)]
pub struct FitsHeader {
    cards: BTreeMap<String, HeaderValue>,
}

/// Keywords a TAN or TAN-SIP projection may use, besides the SIP coefficients.
const WCS_STRING_KEYS: [&str; 2] = ["CTYPE1", "CTYPE2"];
const WCS_FLOAT_KEYS: [&str; 14] = [
    "CRVAL1", "CRVAL2", "CRPIX1", "CRPIX2", "CD1_1", "CD1_2", "CD2_1", "CD2_2", "CDELT1",
    "CDELT2", "PC1_1", "PC1_2", "PC2_1", "PC2_2",
];
const SIP_PREFIXES: [&str; 4] = ["A", "B", "AP", "BP"];
const SIP_MAX_ORDER: i64 = 9;

impl FitsHeader {
    /// Whether `bytes` start like a FITS file rather than a text header.
    pub fn is_fits(bytes: &[u8]) -> bool {
        bytes.len() >= CARD_LEN
            && !bytes[..CARD_LEN].contains(&b'\n')
            && (bytes.starts_with(b"SIMPLE") || bytes.starts_with(b"XTENSION"))
    }

    /// Parse a text header.
    pub fn parse(bytes: &[u8]) -> Self {
        let mut out = Self::default();
        for line in String::from_utf8_lossy(bytes).lines() {
            if !out.push_card(line) {
                break;
            }
        }
        out
    }

    /// Read the WCS keywords of the primary HDU of a FITS file.
    pub fn read_fits(path: &Path) -> anyhow::Result<Self> {
        let mut fptr = fitsio::FitsFile::open(path)
            .with_context(|| format!("open FITS file '{}'", path.display()))?;
        let hdu = fptr.primary_hdu().context("access primary HDU")?;

        let mut out = Self::default();
        for key in WCS_STRING_KEYS {
            if let Ok(v) = hdu.read_key::<String>(&mut fptr, key) {
                out.insert(key, HeaderValue::Str(v.trim().to_string()));
            }
        }
        for key in WCS_FLOAT_KEYS {
            if let Ok(v) = hdu.read_key::<f64>(&mut fptr, key) {
                out.insert(key, HeaderValue::Float(v));
            }
        }
        for prefix in SIP_PREFIXES {
            let order_key = format!("{prefix}_ORDER");
            let Ok(order) = hdu.read_key::<i64>(&mut fptr, &order_key) else {
                continue;
            };
            out.insert(&order_key, HeaderValue::Int(order));
            let order = order.clamp(0, SIP_MAX_ORDER);
            for p in 0..=order {
                for q in 0..=(order - p) {
                    let key = format!("{prefix}_{p}_{q}");
                    if let Ok(c) = hdu.read_key::<f64>(&mut fptr, &key) {
                        out.insert(&key, HeaderValue::Float(c));
                    }
                }
            }
        }
        tracing::debug!(path = %path.display(), cards = out.len(), "read FITS WCS header");
        Ok(out)
    }

    fn insert(&mut self, key: &str, value: HeaderValue) {
        self.cards.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards.get(key)
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Returns false once the `END` card is reached.
    fn push_card(&mut self, card: &str) -> bool {
        let card = card.trim_end();
        if card.trim() == "END" {
            return false;
        }
        let Some((key, rest)) = card.split_once('=') else {
            return true;
        };
        let key = key.trim().to_ascii_uppercase();
        if key.is_empty() || key.contains(' ') || key == "COMMENT" || key == "HISTORY" {
            return true;
        }
        if let Some(value) = parse_value(rest) {
            self.cards.insert(key, value);
        }
        true
    }
}

fn parse_value(raw: &str) -> Option<HeaderValue> {
    let raw = raw.trim_start();
    if let Some(quoted) = raw.strip_prefix('\'') {
        // '' escapes a quote inside FITS strings.
        let mut out = String::new();
        let mut chars = quoted.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push('\'');
                    continue;
                }
                return Some(HeaderValue::Str(out.trim_end().to_string()));
            }
            out.push(c);
        }
        return None;
    }

    let value = raw.split('/').next().unwrap_or("").trim();
    match value {
        "" => None,
        "T" => Some(HeaderValue::Bool(true)),
        "F" => Some(HeaderValue::Bool(false)),
        v => {
            if let Ok(i) = v.parse::<i64>() {
                return Some(HeaderValue::Int(i));
            }
            // FITS allows Fortran-style exponents.
            v.replace(['D', 'd'], "E")
                .parse::<f64>()
                .ok()
                .map(HeaderValue::Float)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/wcs/header.rs"]
mod tests;
