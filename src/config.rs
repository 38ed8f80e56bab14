//! QC configuration model.
//!
//! Parses a declarative test configuration into an ordered list of
//! [`ContextConfig`]s, each holding the resolved [`Call`]s for one
//! region/time-window [`Context`]. Three declaration shapes are accepted and
//! normalize to the same representation:
//!
//! ```yaml
//! # flat: one implicit context
//! variable1:
//!   qartod:
//!     gross_range_test: {suspect_span: [1, 11], fail_span: [0, 12]}
//!
//! # single context
//! window: {starting: 2020-01-01T00:00:00Z, ending: 2020-04-01T00:00:00Z}
//! streams:
//!   variable1: ...
//!
//! # explicit list of contexts
//! contexts:
//!   - window: ...
//!     streams: ...
//! ```
//!
//! Tests that cannot be resolved against the [`registry`](crate::registry)
//! are skipped with a warning.

use crate::constants::{
    ATTRS_KEY, CONFIGS_KEY, CONTEXTS_KEY, REGION_KEY, STREAMS_KEY, WINDOW_ENDING_KEY, WINDOW_KEY,
    WINDOW_STARTING_KEY,
};
use crate::error::{QcError, Result};
use crate::flags::QartodFlag;
use crate::region::{GeometryCollection, parse_region};
use crate::registry::{self, Params, TestDefinition, TestInputs};
use crate::utils::{Timestamp, parse_timestamp_value};
use serde_json::{Map, Value, json};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info_span, warn};

/// Half-open `[starting, ending)` time window; either end may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub starting: Option<Timestamp>,
    pub ending: Option<Timestamp>,
}

impl TimeWindow {
    pub fn new(starting: Option<Timestamp>, ending: Option<Timestamp>) -> Self {
        Self { starting, ending }
    }

    /// True when neither end is set
    pub fn is_unbounded(&self) -> bool {
        self.starting.is_none() && self.ending.is_none()
    }

    pub fn contains(&self, ts: &Timestamp) -> bool {
        self.starting.is_none_or(|start| *ts >= start) && self.ending.is_none_or(|end| *ts < end)
    }

    /// Membership mask of a time axis
    pub fn mask(&self, times: &[Timestamp]) -> Vec<bool> {
        times.iter().map(|t| self.contains(t)).collect()
    }

    fn from_value(value: &Value) -> Result<Self> {
        let obj = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(obj) => obj,
            other => {
                return Err(QcError::config(format!(
                    "window must be a mapping, found {other}"
                )));
            }
        };
        let starting = match obj.get(WINDOW_STARTING_KEY) {
            Some(v) => parse_timestamp_value(v)?,
            None => None,
        };
        let ending = match obj.get(WINDOW_ENDING_KEY) {
            Some(v) => parse_timestamp_value(v)?,
            None => None,
        };
        Ok(Self { starting, ending })
    }

    fn to_value(self) -> Value {
        let render = |ts: Option<Timestamp>| match ts {
            Some(ts) => Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            None => Value::Null,
        };
        json!({
            WINDOW_STARTING_KEY: render(self.starting),
            WINDOW_ENDING_KEY: render(self.ending),
        })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self
            .starting
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-inf".to_string());
        let end = self
            .ending
            .map(|t| t.to_string())
            .unwrap_or_else(|| "inf".to_string());
        write!(f, "[{start}, {end})")
    }
}

/// A region/time-window scope for a group of calls.
///
/// Equality and hashing cover the window and region only; `attrs` is carried
/// along for downstream metadata.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub window: TimeWindow,
    pub region: Option<GeometryCollection>,
    pub attrs: Map<String, Value>,
}

impl Context {
    pub fn new(window: TimeWindow, region: Option<GeometryCollection>) -> Self {
        Self {
            window,
            region,
            attrs: Map::new(),
        }
    }

    pub fn with_attrs(mut self, attrs: Map<String, Value>) -> Self {
        self.attrs = attrs;
        self
    }

    fn from_block(block: &Map<String, Value>) -> Result<Self> {
        let window = match block.get(WINDOW_KEY) {
            Some(value) => TimeWindow::from_value(value)?,
            None => TimeWindow::default(),
        };

        let region = match block.get(REGION_KEY) {
            None | Some(Value::Null) => None,
            Some(value) => {
                let parsed = parse_region(value)?;
                if parsed.is_none() {
                    warn!("Ignoring region that is not a GeoJSON object: {}", value);
                }
                parsed
            }
        };

        let attrs = match block.get(ATTRS_KEY) {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(attrs)) => attrs.clone(),
            Some(other) => {
                return Err(QcError::config(format!(
                    "attrs must be a mapping, found {other}"
                )));
            }
        };

        Ok(Self {
            window,
            region,
            attrs,
        })
    }

    fn to_value(&self) -> Map<String, Value> {
        let mut block = Map::new();
        if let Some(region) = &self.region {
            block.insert(REGION_KEY.to_string(), region.to_geojson());
        }
        block.insert(WINDOW_KEY.to_string(), self.window.to_value());
        if !self.attrs.is_empty() {
            block.insert(ATTRS_KEY.to_string(), Value::Object(self.attrs.clone()));
        }
        block
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.window == other.window && self.region == other.region
    }
}

impl Eq for Context {}

impl Hash for Context {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.window.hash(state);
        self.region.hash(state);
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window {}", self.window)?;
        if let Some(region) = &self.region {
            write!(f, ", region of {} geometries", region.geometries.len())?;
        }
        Ok(())
    }
}

/// One resolved test to run against one stream within one context
#[derive(Debug, Clone)]
pub struct Call {
    pub stream_id: String,
    pub context: Context,
    definition: &'static TestDefinition,
    pub params: Params,
}

impl Call {
    pub fn new(
        stream_id: impl Into<String>,
        context: Context,
        definition: &'static TestDefinition,
        params: Params,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            context,
            definition,
            params,
        }
    }

    /// Resolve `package.test` through the registry
    pub fn resolve(
        stream_id: impl Into<String>,
        context: Context,
        package: &str,
        test: &str,
        params: Params,
    ) -> Result<Self> {
        let definition = registry::lookup(package, test)?;
        Ok(Self::new(stream_id, context, definition, params))
    }

    pub fn package(&self) -> &'static str {
        self.definition.package
    }

    pub fn test(&self) -> &'static str {
        self.definition.name
    }

    pub fn definition(&self) -> &'static TestDefinition {
        self.definition
    }

    pub fn is_aggregate(&self) -> bool {
        self.definition.is_aggregate()
    }

    /// Run the test over subset data
    pub fn run(&self, inputs: &TestInputs<'_>) -> Result<Vec<QartodFlag>> {
        self.definition.run(inputs, &self.params)
    }

    /// The call as a single-context declaration that parses back to an equal call
    pub fn config(&self) -> Value {
        let mut tests = Map::new();
        tests.insert(self.test().to_string(), Value::Object(self.params.clone()));
        let mut packages = Map::new();
        packages.insert(self.package().to_string(), Value::Object(tests));
        let mut streams = Map::new();
        streams.insert(self.stream_id.clone(), Value::Object(packages));

        let mut block = self.context.to_value();
        block.insert(STREAMS_KEY.to_string(), Value::Object(streams));
        Value::Object(block)
    }
}

impl PartialEq for Call {
    fn eq(&self, other: &Self) -> bool {
        self.stream_id == other.stream_id
            && self.context == other.context
            && self.package() == other.package()
            && self.test() == other.test()
            && params_eq(&self.params, &other.params)
    }
}

impl Eq for Call {}

impl Hash for Call {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.stream_id.hash(state);
        self.context.hash(state);
        self.package().hash(state);
        self.test().hash(state);
        hash_params(&self.params, state);
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}.{}", self.stream_id, self.package(), self.test())
    }
}

/// Map equality ignores key order, so keys are hashed sorted
fn hash_params<H: Hasher>(params: &Params, state: &mut H) {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();
    keys.len().hash(state);
    for key in keys {
        key.hash(state);
        hash_value(&params[key.as_str()], state);
    }
}

/// Numbers compare by value, so `12` equals `12.0`
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| value_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => params_eq(x, y),
        _ => a == b,
    }
}

fn params_eq(a: &Params, b: &Params) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| value_eq(value, other)))
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Number(n) => {
            2u8.hash(state);
            match n.as_f64() {
                Some(x) => (x + 0.0).to_bits().hash(state),
                None => n.to_string().hash(state),
            }
        }
        Value::String(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        Value::Array(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            5u8.hash(state);
            hash_params(map, state);
        }
    }
}

/// The calls of one context, grouped by stream in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub context: Context,
    pub calls: Vec<Call>,
}

impl ContextConfig {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            calls: Vec::new(),
        }
    }

    /// Stream ids in order of first appearance
    pub fn streams(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for call in &self.calls {
            if !ids.contains(&call.stream_id.as_str()) {
                ids.push(&call.stream_id);
            }
        }
        ids
    }

    pub fn calls_for<'a>(&'a self, stream_id: &'a str) -> impl Iterator<Item = &'a Call> + 'a {
        self.calls.iter().filter(move |c| c.stream_id == stream_id)
    }

    /// True if the stream has a call for `package.test`
    pub fn has(&self, stream_id: &str, qualified_test: &str) -> bool {
        self.calls_for(stream_id)
            .any(|c| c.definition.qualified_name() == qualified_test)
    }

    fn push(&mut self, call: Call) {
        if self.calls.contains(&call) {
            debug!("Dropping duplicate call {}", call);
            return;
        }
        self.calls.push(call);
    }
}

/// A parsed QC configuration: contexts in declaration order, each with its calls.
///
/// Contexts that compare equal are merged into one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    contexts: Vec<ContextConfig>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an already-deserialized configuration tree
    pub fn from_value(value: &Value) -> Result<Self> {
        let span = info_span!("config");
        let _enter = span.enter();

        let root = value
            .as_object()
            .ok_or_else(|| QcError::config("configuration must be a mapping"))?;

        let mut config = Config::new();

        if let Some(contexts) = root.get(CONTEXTS_KEY) {
            let contexts = contexts
                .as_array()
                .ok_or_else(|| QcError::config("\"contexts\" must be a list"))?;
            for (i, block) in contexts.iter().enumerate() {
                let block = block.as_object().ok_or_else(|| {
                    QcError::config(format!("context {i} must be a mapping"))
                })?;
                config.add_block(block)?;
            }
        } else if root.contains_key(STREAMS_KEY) || root.contains_key(CONFIGS_KEY) {
            config.add_block(root)?;
        } else if is_flat_stream_map(root) {
            config.add_streams(Context::default(), root)?;
        } else {
            return Err(QcError::config(
                "expected \"contexts\", \"streams\" or a stream -> package -> test mapping",
            ));
        }

        if config.is_empty() {
            warn!("Configuration has no runnable tests");
        }
        debug!(
            "Parsed {} contexts with {} calls",
            config.contexts.len(),
            config.calls().count()
        );
        Ok(config)
    }

    /// Parse YAML or JSON text
    pub fn from_text(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text)?;
        Self::from_value(&value)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let value: Value = serde_yaml::from_reader(reader)?;
        Self::from_value(&value)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QcError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        debug!("Loading QC configuration from {}", path.display());
        Self::from_text(&text)
    }

    /// Parse `source` as configuration text, falling back to reading it as a path
    pub fn load(source: &str) -> Result<Self> {
        if let Ok(value) = serde_yaml::from_str::<Value>(source) {
            if value.is_object() {
                return Self::from_value(&value);
            }
        }
        let path = Path::new(source.trim());
        if path.exists() {
            return Self::from_path(path);
        }
        Err(QcError::config(format!(
            "'{source}' is neither a configuration mapping nor an existing file"
        )))
    }

    fn add_block(&mut self, block: &Map<String, Value>) -> Result<()> {
        let context = Context::from_block(block)?;
        let streams = match block.get(STREAMS_KEY).or_else(|| block.get(CONFIGS_KEY)) {
            Some(Value::Object(streams)) => streams,
            Some(Value::Null) | None => {
                warn!("Context {} declares no streams", context);
                return Ok(());
            }
            Some(other) => {
                return Err(QcError::config(format!(
                    "streams must be a mapping, found {other}"
                )));
            }
        };
        self.add_streams(context, streams)
    }

    fn add_streams(&mut self, context: Context, streams: &Map<String, Value>) -> Result<()> {
        for (stream_id, packages) in streams {
            let packages = as_mapping(packages, || format!("stream '{stream_id}'"))?;
            for (package, tests) in packages {
                let tests = as_mapping(tests, || format!("package '{stream_id}.{package}'"))?;
                for (test, params) in tests {
                    let params = match params {
                        Value::Null => Params::new(),
                        Value::Object(params) => params.clone(),
                        other => {
                            return Err(QcError::config(format!(
                                "parameters of {stream_id}: {package}.{test} must be a mapping, found {other}"
                            )));
                        }
                    };
                    match Call::resolve(stream_id, context.clone(), package, test, params) {
                        Ok(call) => self.add(call),
                        Err(e) if e.is_resolution_miss() => {
                            warn!("Skipping {}: {}.{} ({})", stream_id, package, test, e);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Ok(())
    }

    /// Add a call under its context, creating the context entry if needed
    pub fn add(&mut self, call: Call) {
        match self.contexts.iter_mut().find(|cc| cc.context == call.context) {
            Some(entry) => entry.push(call),
            None => {
                let mut entry = ContextConfig::new(call.context.clone());
                entry.push(call);
                self.contexts.push(entry);
            }
        }
    }

    pub fn contexts(&self) -> &[ContextConfig] {
        &self.contexts
    }

    pub fn calls(&self) -> impl Iterator<Item = &Call> {
        self.contexts.iter().flat_map(|cc| cc.calls.iter())
    }

    /// Every call for one stream, across contexts
    pub fn calls_by_stream_id<'a>(&'a self, stream_id: &'a str) -> Vec<&'a Call> {
        self.calls().filter(|c| c.stream_id == stream_id).collect()
    }

    /// Stream ids in order of first appearance
    pub fn stream_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for call in self.calls() {
            if !ids.contains(&call.stream_id.as_str()) {
                ids.push(&call.stream_id);
            }
        }
        ids
    }

    /// True if any context runs `package.test` on the stream
    pub fn has(&self, stream_id: &str, qualified_test: &str) -> bool {
        self.contexts.iter().any(|cc| cc.has(stream_id, qualified_test))
    }

    pub fn len(&self) -> usize {
        self.calls().count()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.iter().all(|cc| cc.calls.is_empty())
    }
}

impl FromStr for Config {
    type Err = QcError;

    fn from_str(text: &str) -> Result<Self> {
        Self::from_text(text)
    }
}

impl TryFrom<&Value> for Config {
    type Error = QcError;

    fn try_from(value: &Value) -> Result<Self> {
        Self::from_value(value)
    }
}

/// A stream -> package -> test mapping with no context keys
fn is_flat_stream_map(root: &Map<String, Value>) -> bool {
    root.values().all(|packages| {
        packages
            .as_object()
            .is_some_and(|pkgs| pkgs.values().all(Value::is_object))
    })
}

fn as_mapping<'a>(
    value: &'a Value,
    what: impl FnOnce() -> String,
) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| QcError::config(format!("{} must be a mapping", what())))
}
