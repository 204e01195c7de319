//! Parameter files for operations: TOML by default, JSON for `.json` files.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("failed to read parameter file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid parameters in {path}: {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid parameters in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// pfSense stores numbers as text; parameter files often write them bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Number(i64),
    Text(String),
}

impl TextOrNumber {
    fn into_text(self) -> String {
        match self {
            TextOrNumber::Number(n) => n.to_string(),
            TextOrNumber::Text(s) => s,
        }
    }
}

/// `deserialize_with` helper for text fields that may be given as integers.
pub fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    TextOrNumber::deserialize(deserializer).map(TextOrNumber::into_text)
}

pub fn optional_text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(TextOrNumber::into_text))
}

pub fn load_params<T: DeserializeOwned>(path: &Path) -> Result<T, ParamsError> {
    let display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ParamsError::Io {
        path: display.clone(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&raw).map_err(|source| ParamsError::Json {
            path: display,
            source,
        })
    } else {
        toml::from_str(&raw).map_err(|source| ParamsError::Toml {
            path: display,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{load_params, ParamsError};
    use crate::ops::alias::{AliasParams, AliasType};

    #[test]
    fn loads_toml_and_json() {
        let dir = tempdir().expect("tempdir");
        let toml_path = dir.path().join("alias.toml");
        fs::write(&toml_path, "name = \"web\"\ntype = \"host\"\n").expect("write");
        let json_path = dir.path().join("alias.JSON");
        fs::write(&json_path, r#"{"name":"web","type":"network","address":"10.0.0.0/24"}"#)
            .expect("write");

        let from_toml: AliasParams = load_params(&toml_path).expect("toml");
        let from_json: AliasParams = load_params(&json_path).expect("json");
        assert_eq!(from_toml.kind, AliasType::Host);
        assert_eq!(from_json.kind, AliasType::Network);
        assert_eq!(from_json.address.as_deref(), Some("10.0.0.0/24"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("alias.toml");
        fs::write(&path, "name = \"web\"\ntype = \"host\"\ncolour = \"red\"\n").expect("write");
        let err = load_params::<AliasParams>(&path).expect_err("unknown field");
        assert!(matches!(err, ParamsError::Toml { .. }));
    }

    #[test]
    fn bare_numbers_load_as_text() {
        #[derive(Debug, serde::Deserialize)]
        struct Ports {
            #[serde(deserialize_with = "super::text_or_number")]
            port: String,
            #[serde(default, deserialize_with = "super::optional_text_or_number")]
            bits: Option<String>,
        }

        let bare: Ports = toml::from_str("port = 1812\nbits = 24\n").expect("numbers");
        assert_eq!((bare.port.as_str(), bare.bits.as_deref()), ("1812", Some("24")));
        let quoted: Ports = serde_json::from_str(r#"{"port":"1812"}"#).expect("text");
        assert_eq!((quoted.port.as_str(), quoted.bits), ("1812", None));
        assert!(toml::from_str::<Ports>("port = 1.5\n").is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().expect("tempdir");
        let err = load_params::<AliasParams>(&dir.path().join("nope.toml")).expect_err("missing");
        assert!(matches!(err, ParamsError::Io { .. }));
    }
}
