//! Settings Resolver (L1, spec §4.1). Each tunable parameter has a default,
//! an environment-variable spelling, a user-settings path, and optionally a
//! mission-settings key. Lookup order is mission > user > environment >
//! default, where "default" itself is layered: an optional `maestro.toml`
//! file (spec §4.13, the teacher's `LLMSpellConfig::from_toml` ->
//! `apply_env_registry` -> `validate` pipeline) sits beneath the compiled-in
//! default.
//!
//! Grounded on `llmspell-config/src/env_registry.rs`'s
//! `EnvVarDefBuilder`/`register_var` idiom, generalized from the teacher's
//! 2-layer (environment > default) resolution to this spec's 4-layer one.

pub mod registry;

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::env;

use maestro_core::error::{MaestroError, Result};

/// The coerced value a parameter resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    String,
}

/// A single tunable parameter's lookup recipe. `required` parameters (model
/// names, API keys) have no compiled-in default and fail loudly with
/// `ConfigurationRequired` when no layer supplies a value (spec §4.1).
#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: &'static str,
    pub env_var: Option<&'static str>,
    pub user_path: Option<&'static str>,
    pub mission_key: Option<&'static str>,
    pub kind: ParamKind,
    pub default: Option<ParamValue>,
    pub required: bool,
}

impl ParamDef {
    pub fn new(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            env_var: None,
            user_path: None,
            mission_key: None,
            kind,
            default: None,
            required: false,
        }
    }

    pub fn env(mut self, var: &'static str) -> Self {
        self.env_var = Some(var);
        self
    }

    pub fn user_path(mut self, path: &'static str) -> Self {
        self.user_path = Some(path);
        self
    }

    pub fn mission_key(mut self, key: &'static str) -> Self {
        self.mission_key = Some(key);
        self
    }

    pub fn default_value(mut self, value: ParamValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Coerce a raw string into the declared type. Bools accept
/// `true|1|yes|on` (case-insensitive) as true and `false|0|no|off` as false;
/// integers and floats parse strictly (spec §4.1).
fn coerce(kind: ParamKind, raw: &str) -> Result<ParamValue> {
    match kind {
        ParamKind::Bool => {
            let lower = raw.trim().to_lowercase();
            match lower.as_str() {
                "true" | "1" | "yes" | "on" => Ok(ParamValue::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(ParamValue::Bool(false)),
                _ => Err(MaestroError::configuration(format!(
                    "cannot coerce '{raw}' to bool"
                ))),
            }
        }
        ParamKind::Int => raw
            .trim()
            .parse::<i64>()
            .map(ParamValue::Int)
            .map_err(|e| MaestroError::configuration(format!("invalid integer '{raw}': {e}"))),
        ParamKind::Float => raw
            .trim()
            .parse::<f64>()
            .map(ParamValue::Float)
            .map_err(|e| MaestroError::configuration(format!("invalid float '{raw}': {e}"))),
        ParamKind::String => Ok(ParamValue::String(raw.to_string())),
    }
}

fn coerce_json(kind: ParamKind, value: &Value) -> Result<ParamValue> {
    match (kind, value) {
        (ParamKind::Bool, Value::Bool(b)) => Ok(ParamValue::Bool(*b)),
        (ParamKind::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => {
            Ok(ParamValue::Int(n.as_i64().unwrap_or_default()))
        }
        (ParamKind::Float, Value::Number(n)) => Ok(ParamValue::Float(n.as_f64().unwrap_or_default())),
        (ParamKind::String, Value::String(s)) => Ok(ParamValue::String(s.clone())),
        (_, Value::String(s)) => coerce(kind, s),
        (kind_, other) => Err(MaestroError::configuration(format!(
            "cannot coerce {other} to {kind_:?}"
        ))),
    }
}

/// Resolve a dotted path (`"runtime.max_depth"`) against a nested JSON value.
fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// The resolver is read-only with respect to parameter definitions; mission
/// and user settings are mutated through their own narrow setters, matching
/// spec §4.1's "settings are mutated through user/profile and mission-
/// metadata interfaces."
pub struct SettingsResolver {
    defs: HashMap<&'static str, ParamDef>,
    file_layer: Value,
    user_settings: RwLock<Value>,
    mission_settings: RwLock<HashMap<String, Value>>,
}

impl SettingsResolver {
    pub fn new() -> Self {
        Self {
            defs: HashMap::new(),
            file_layer: Value::Object(Default::default()),
            user_settings: RwLock::new(Value::Object(Default::default())),
            mission_settings: RwLock::new(HashMap::new()),
        }
    }

    /// Load the `maestro.toml` default-layer override file (spec §4.13).
    /// Parse failures are non-fatal: an absent or malformed file leaves the
    /// compiled-in defaults in effect.
    pub fn with_file_layer(mut self, toml_text: &str) -> Result<Self> {
        let toml_value: toml::Value = toml::from_str(toml_text)
            .map_err(|e| MaestroError::configuration(format!("invalid maestro.toml: {e}")))?;
        self.file_layer = toml_to_json(&toml_value);
        Ok(self)
    }

    pub fn register(&mut self, def: ParamDef) {
        self.defs.insert(def.name, def);
    }

    pub fn register_all(&mut self, defs: impl IntoIterator<Item = ParamDef>) {
        for def in defs {
            self.register(def);
        }
    }

    pub fn set_user_settings(&self, settings: Value) {
        *self.user_settings.write() = settings;
    }

    pub fn set_mission_settings(&self, mission_id: impl Into<String>, settings: Value) {
        self.mission_settings
            .write()
            .insert(mission_id.into(), settings);
    }

    /// Resolve a parameter by name, layering mission > user > environment >
    /// (file > compiled) default. Ambiguous or missing required values fail
    /// loudly with `ConfigurationRequired` ("Please configure your AI
    /// settings"), per spec §4.1.
    #[tracing::instrument(skip(self), fields(param = name))]
    pub fn get(&self, name: &str, mission_id: Option<&str>) -> Result<ParamValue> {
        let def = self.defs.get(name).ok_or_else(|| {
            MaestroError::internal(format!("unregistered settings parameter: {name}"))
        })?;

        if let Some(mission_id) = mission_id {
            if let Some(key) = def.mission_key {
                if let Some(missions) = self.mission_settings.read().get(mission_id) {
                    if let Some(value) = lookup_path(missions, key) {
                        tracing::debug!(layer = "mission", "resolved parameter");
                        return coerce_json(def.kind, value);
                    }
                }
            }
        }

        if let Some(path) = def.user_path {
            let user = self.user_settings.read();
            if let Some(value) = lookup_path(&user, path) {
                tracing::debug!(layer = "user", "resolved parameter");
                return coerce_json(def.kind, value);
            }
        }

        if let Some(var) = def.env_var {
            if let Ok(raw) = env::var(var) {
                tracing::debug!(layer = "environment", "resolved parameter");
                return coerce(def.kind, &raw);
            }
        }

        if let Some(path) = def.user_path {
            if let Some(value) = lookup_path(&self.file_layer, path) {
                tracing::debug!(layer = "file_default", "resolved parameter");
                return coerce_json(def.kind, value);
            }
        }

        if let Some(default) = &def.default {
            tracing::debug!(layer = "compiled_default", "resolved parameter");
            return Ok(default.clone());
        }

        if def.required {
            return Err(MaestroError::configuration(format!(
                "Please configure your AI settings: '{name}' has no value in any layer"
            )));
        }

        Err(MaestroError::internal(format!(
            "parameter '{name}' has no default and is not marked required"
        )))
    }

    pub fn get_bool(&self, name: &str, mission_id: Option<&str>) -> Result<bool> {
        self.get(name, mission_id)?.as_bool().ok_or_else(|| {
            MaestroError::internal(format!("parameter '{name}' is not a bool"))
        })
    }

    pub fn get_int(&self, name: &str, mission_id: Option<&str>) -> Result<i64> {
        self.get(name, mission_id)?.as_int().ok_or_else(|| {
            MaestroError::internal(format!("parameter '{name}' is not an int"))
        })
    }

    pub fn get_string(&self, name: &str, mission_id: Option<&str>) -> Result<String> {
        self.get(name, mission_id)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| MaestroError::internal(format!("parameter '{name}' is not a string")))
    }
}

impl Default for SettingsResolver {
    fn default() -> Self {
        let mut resolver = Self::new();
        resolver.register_all(registry::standard_params());
        resolver
    }
}

fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Number((*i).into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver_with(def: ParamDef) -> SettingsResolver {
        let mut resolver = SettingsResolver::new();
        resolver.register(def);
        resolver
    }

    #[test]
    fn mission_layer_wins_over_everything() {
        let resolver = resolver_with(
            ParamDef::new("writing_passes", ParamKind::Int)
                .mission_key("writing_passes")
                .default_value(ParamValue::Int(2)),
        );
        resolver.set_mission_settings("m1", json!({"writing_passes": 5}));
        assert_eq!(
            resolver.get("writing_passes", Some("m1")).unwrap(),
            ParamValue::Int(5)
        );
    }

    #[test]
    fn user_layer_wins_over_environment_and_default() {
        let resolver = resolver_with(
            ParamDef::new("max_retries", ParamKind::Int)
                .user_path("research.max_retries")
                .env("MAX_RETRIES")
                .default_value(ParamValue::Int(3)),
        );
        resolver.set_user_settings(json!({"research": {"max_retries": 7}}));
        assert_eq!(
            resolver.get("max_retries", None).unwrap(),
            ParamValue::Int(7)
        );
    }

    #[test]
    fn falls_back_to_compiled_default_when_nothing_else_set() {
        let resolver = resolver_with(
            ParamDef::new("writing_passes", ParamKind::Int).default_value(ParamValue::Int(2)),
        );
        assert_eq!(
            resolver.get("writing_passes", None).unwrap(),
            ParamValue::Int(2)
        );
    }

    #[test]
    fn missing_required_param_fails_loudly() {
        let resolver = resolver_with(
            ParamDef::new("openrouter_api_key", ParamKind::String).required(),
        );
        let err = resolver.get("openrouter_api_key", None).unwrap_err();
        assert!(err.to_string().contains("Please configure your AI settings"));
    }

    #[test]
    fn bool_coercion_accepts_documented_spellings() {
        for (raw, expected) in [
            ("true", true),
            ("1", true),
            ("yes", true),
            ("on", true),
            ("false", false),
            ("0", false),
            ("no", false),
            ("off", false),
        ] {
            assert_eq!(coerce(ParamKind::Bool, raw).unwrap(), ParamValue::Bool(expected));
        }
    }

    #[test]
    fn strict_integer_parse_rejects_garbage() {
        assert!(coerce(ParamKind::Int, "not-a-number").is_err());
    }

    #[test]
    fn file_layer_sits_beneath_compiled_default() {
        let resolver = resolver_with(
            ParamDef::new("max_total_depth", ParamKind::Int)
                .user_path("research.max_total_depth")
                .default_value(ParamValue::Int(2)),
        )
        .with_file_layer("[research]\nmax_total_depth = 4\n")
        .unwrap();
        assert_eq!(
            resolver.get("max_total_depth", None).unwrap(),
            ParamValue::Int(4)
        );
    }
}
