//! YAML configuration loader with include and environment variable support
//!
//! - `$include: other.yaml` replaces a mapping with the contents of another
//!   file, resolved relative to the including file
//! - `${ENV_VAR}` and `${ENV_VAR:default}` are expanded in string values

use crate::error::RouterError;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

const MAX_INCLUDE_DEPTH: usize = 8;

/// Load a YAML file, resolving includes and expanding variables.
pub fn load_yaml_file<P: AsRef<Path>>(path: P) -> Result<YamlValue, RouterError> {
    load_yaml_file_at_depth(path.as_ref(), 0)
}

fn load_yaml_file_at_depth(path: &Path, depth: usize) -> Result<YamlValue, RouterError> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(RouterError::Config(format!(
            "Include depth exceeded at {:?}",
            path
        )));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| RouterError::Config(format!("Failed to read YAML file {:?}: {}", path, e)))?;

    let mut value: YamlValue = serde_yaml::from_str(&content)
        .map_err(|e| RouterError::Config(format!("Failed to parse YAML file {:?}: {}", path, e)))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    process_includes(&mut value, base_dir, depth)?;
    expand_variables(&mut value);

    Ok(value)
}

/// Load a YAML file and deserialize it into `T`.
pub fn load_yaml_config<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, RouterError> {
    let yaml = load_yaml_file(path)?;
    parse_yaml_value(&yaml)
}

/// Deserialize YAML text into `T`, expanding variables but not includes.
pub fn parse_yaml_str<T: DeserializeOwned>(content: &str) -> Result<T, RouterError> {
    let mut yaml: YamlValue = serde_yaml::from_str(content)
        .map_err(|e| RouterError::Config(format!("Failed to parse YAML: {}", e)))?;
    expand_variables(&mut yaml);
    parse_yaml_value(&yaml)
}

fn parse_yaml_value<T: DeserializeOwned>(yaml: &YamlValue) -> Result<T, RouterError> {
    // Going through JSON keeps numeric and null handling identical to the
    // JSON configs the same types accept.
    let json = yaml_to_json(yaml)?;
    serde_json::from_value(json)
        .map_err(|e| RouterError::Config(format!("Failed to deserialize configuration: {}", e)))
}

fn process_includes(value: &mut YamlValue, base_dir: &Path, depth: usize) -> Result<(), RouterError> {
    match value {
        YamlValue::Mapping(map) => {
            if let Some(YamlValue::String(include_path)) =
                map.get(YamlValue::String("$include".to_string()))
            {
                let included = load_yaml_file_at_depth(&base_dir.join(include_path), depth + 1)?;
                *value = included;
                return Ok(());
            }

            for (_, v) in map.iter_mut() {
                process_includes(v, base_dir, depth)?;
            }
        }
        YamlValue::Sequence(seq) => {
            for item in seq.iter_mut() {
                process_includes(item, base_dir, depth)?;
            }
        }
        _ => {}
    }

    Ok(())
}

fn expand_variables(value: &mut YamlValue) {
    match value {
        YamlValue::String(s) => {
            if let Some(expanded) = expand_env_in_string(s) {
                *s = expanded;
            }
        }
        YamlValue::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                expand_variables(v);
            }
        }
        YamlValue::Sequence(seq) => {
            for item in seq.iter_mut() {
                expand_variables(item);
            }
        }
        _ => {}
    }
}

fn env_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}").ok())
        .as_ref()
}

/// Expand `${ENV_VAR:default}` occurrences; `None` when there are none.
fn expand_env_in_string(s: &str) -> Option<String> {
    if !s.contains("${") {
        return None;
    }

    let expanded = env_pattern()?.replace_all(s, |caps: &regex::Captures<'_>| {
        let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        env::var(&caps[1]).unwrap_or_else(|_| default_value.to_string())
    });

    Some(expanded.into_owned())
}

fn yaml_to_json(yaml: &YamlValue) -> Result<JsonValue, RouterError> {
    match yaml {
        YamlValue::Null => Ok(JsonValue::Null),
        YamlValue::Bool(b) => Ok(JsonValue::Bool(*b)),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(JsonValue::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(JsonValue::Number(u.into()))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .ok_or_else(|| RouterError::Config(format!("Invalid number: {}", f)))
            } else {
                Err(RouterError::Config("Invalid number".to_string()))
            }
        }
        YamlValue::String(s) => Ok(JsonValue::String(s.clone())),
        YamlValue::Sequence(seq) => {
            let items: Result<Vec<JsonValue>, _> = seq.iter().map(yaml_to_json).collect();
            Ok(JsonValue::Array(items?))
        }
        YamlValue::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    YamlValue::String(s) => s.clone(),
                    YamlValue::Number(n) => n.to_string(),
                    YamlValue::Bool(b) => b.to_string(),
                    _ => {
                        return Err(RouterError::Config(
                            "Map keys must be strings".to_string(),
                        ))
                    }
                };
                json_map.insert(key, yaml_to_json(v)?);
            }
            Ok(JsonValue::Object(json_map))
        }
        YamlValue::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}
