// src/unit/properties.rs

//! Transient unit property table and encoder.
//!
//! systemd's `StartTransientUnit` takes an `a(sv)` list: each property name
//! travels with a variant whose signature is fixed per name. This module owns
//! that table ([`PropertyName::property_type`]) and turns semantic values into
//! tagged wire values ([`PropertyValue`]).
//!
//! Two entry points:
//! - [`encode`] takes already-typed [`UnitProperty`] values. It cannot fail:
//!   every variant knows its own name and wire type.
//! - [`encode_named`] takes `(name, RawPropertyValue)` pairs discovered at
//!   configuration time. Unknown names and mistyped values are rejected and
//!   no partial output is produced.
//!
//! Nothing here does I/O or keeps state.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::{Result, UnitJobError};

/// Wire type tags used by the property table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Bool,
    String,
    StringArray,
    /// Array of unsigned integers (`PIDs`).
    UIntArray,
    /// Array of `(path, argv, unclean_is_failure)` triples (`ExecStart`).
    ExecCommandArray,
}

impl PropertyType {
    /// D-Bus signature of values carrying this tag.
    pub fn signature(self) -> &'static str {
        match self {
            PropertyType::Bool => "b",
            PropertyType::String => "s",
            PropertyType::StringArray => "as",
            PropertyType::UIntArray => "au",
            PropertyType::ExecCommandArray => "a(sasb)",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            PropertyType::Bool => "a boolean",
            PropertyType::String => "a string",
            PropertyType::StringArray => "a list of strings",
            PropertyType::UIntArray => "a list of non-negative integers",
            PropertyType::ExecCommandArray => "a list of { argv, argv0?, unclean_is_failure? } commands",
        }
    }
}

/// Unit dependency / ordering properties. All of them are string arrays of
/// unit names (or paths, for `RequiresMountsFor`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Requires,
    RequiresOverridable,
    Requisite,
    Wants,
    BindsTo,
    RequiredBy,
    RequiredByOverridable,
    WantedBy,
    BoundBy,
    Conflicts,
    ConflictedBy,
    Before,
    After,
    OnFailure,
    Triggers,
    TriggeredBy,
    PropagatesReloadTo,
    RequiresMountsFor,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 18] = [
        DependencyKind::Requires,
        DependencyKind::RequiresOverridable,
        DependencyKind::Requisite,
        DependencyKind::Wants,
        DependencyKind::BindsTo,
        DependencyKind::RequiredBy,
        DependencyKind::RequiredByOverridable,
        DependencyKind::WantedBy,
        DependencyKind::BoundBy,
        DependencyKind::Conflicts,
        DependencyKind::ConflictedBy,
        DependencyKind::Before,
        DependencyKind::After,
        DependencyKind::OnFailure,
        DependencyKind::Triggers,
        DependencyKind::TriggeredBy,
        DependencyKind::PropagatesReloadTo,
        DependencyKind::RequiresMountsFor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DependencyKind::Requires => "Requires",
            DependencyKind::RequiresOverridable => "RequiresOverridable",
            DependencyKind::Requisite => "Requisite",
            DependencyKind::Wants => "Wants",
            DependencyKind::BindsTo => "BindsTo",
            DependencyKind::RequiredBy => "RequiredBy",
            DependencyKind::RequiredByOverridable => "RequiredByOverridable",
            DependencyKind::WantedBy => "WantedBy",
            DependencyKind::BoundBy => "BoundBy",
            DependencyKind::Conflicts => "Conflicts",
            DependencyKind::ConflictedBy => "ConflictedBy",
            DependencyKind::Before => "Before",
            DependencyKind::After => "After",
            DependencyKind::OnFailure => "OnFailure",
            DependencyKind::Triggers => "Triggers",
            DependencyKind::TriggeredBy => "TriggeredBy",
            DependencyKind::PropagatesReloadTo => "PropagatesReloadTo",
            DependencyKind::RequiresMountsFor => "RequiresMountsFor",
        }
    }
}

/// Every property name the encoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyName {
    ExecStart,
    RemainAfterExit,
    Type,
    Description,
    Slice,
    Pids,
    Environment,
    Dependency(DependencyKind),
}

impl PropertyName {
    /// The whole property table, in a stable order.
    pub fn all() -> impl Iterator<Item = PropertyName> {
        [
            PropertyName::ExecStart,
            PropertyName::RemainAfterExit,
            PropertyName::Type,
            PropertyName::Description,
            PropertyName::Slice,
            PropertyName::Pids,
            PropertyName::Environment,
        ]
        .into_iter()
        .chain(DependencyKind::ALL.into_iter().map(PropertyName::Dependency))
    }

    /// Name as systemd spells it on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyName::ExecStart => "ExecStart",
            PropertyName::RemainAfterExit => "RemainAfterExit",
            PropertyName::Type => "Type",
            PropertyName::Description => "Description",
            PropertyName::Slice => "Slice",
            PropertyName::Pids => "PIDs",
            PropertyName::Environment => "Environment",
            PropertyName::Dependency(kind) => kind.as_str(),
        }
    }

    /// The fixed wire type for this name.
    pub fn property_type(self) -> PropertyType {
        match self {
            PropertyName::ExecStart => PropertyType::ExecCommandArray,
            PropertyName::RemainAfterExit => PropertyType::Bool,
            PropertyName::Type | PropertyName::Description | PropertyName::Slice => {
                PropertyType::String
            }
            PropertyName::Pids => PropertyType::UIntArray,
            PropertyName::Environment | PropertyName::Dependency(_) => PropertyType::StringArray,
        }
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyName {
    type Err = UnitJobError;

    fn from_str(s: &str) -> Result<Self> {
        PropertyName::all()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnitJobError::UnsupportedProperty(s.to_string()))
    }
}

/// One `ExecStart` entry: what to execute, with which argv, and whether an
/// unclean exit marks the unit failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecStartValue {
    path: String,
    argv: Vec<String>,
    unclean_is_failure: bool,
}

impl ExecStartValue {
    /// Build an entry from a non-empty argv. The path defaults to `argv[0]`
    /// and unclean exits are not treated as failures.
    pub fn new(argv: Vec<String>) -> Result<Self> {
        let Some(first) = argv.first() else {
            return Err(UnitJobError::InvalidJob(
                "ExecStart argv must not be empty".to_string(),
            ));
        };

        Ok(Self {
            path: first.clone(),
            argv,
            unclean_is_failure: false,
        })
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_unclean_is_failure(mut self, unclean_is_failure: bool) -> Self {
        self.unclean_is_failure = unclean_is_failure;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn unclean_is_failure(&self) -> bool {
        self.unclean_is_failure
    }

    /// `(sasb)` triple as sent to the manager.
    pub fn to_wire(&self) -> (String, Vec<String>, bool) {
        (self.path.clone(), self.argv.clone(), self.unclean_is_failure)
    }
}

/// A typed unit property. Each variant carries the payload its name requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitProperty {
    ExecStart(Vec<ExecStartValue>),
    RemainAfterExit(bool),
    Type(String),
    Description(String),
    Slice(String),
    Pids(Vec<u32>),
    /// Already flattened `KEY=VALUE` strings, see [`flatten_environment`].
    Environment(Vec<String>),
    Dependency(DependencyKind, Vec<String>),
}

impl UnitProperty {
    pub fn name(&self) -> PropertyName {
        match self {
            UnitProperty::ExecStart(_) => PropertyName::ExecStart,
            UnitProperty::RemainAfterExit(_) => PropertyName::RemainAfterExit,
            UnitProperty::Type(_) => PropertyName::Type,
            UnitProperty::Description(_) => PropertyName::Description,
            UnitProperty::Slice(_) => PropertyName::Slice,
            UnitProperty::Pids(_) => PropertyName::Pids,
            UnitProperty::Environment(_) => PropertyName::Environment,
            UnitProperty::Dependency(kind, _) => PropertyName::Dependency(*kind),
        }
    }

    /// Coerce a configuration-time `(name, value)` pair into a typed
    /// property.
    pub fn from_raw(name: &str, raw: RawPropertyValue) -> Result<Self> {
        let property = name.parse::<PropertyName>()?;
        let mismatch = || UnitJobError::InvalidPropertyValue {
            name: name.to_string(),
            expected: property.property_type().describe(),
        };

        let typed = match (property, raw) {
            (PropertyName::RemainAfterExit, RawPropertyValue::Bool(b)) => {
                UnitProperty::RemainAfterExit(b)
            }
            (PropertyName::Type, RawPropertyValue::Text(s)) => UnitProperty::Type(s),
            (PropertyName::Description, RawPropertyValue::Text(s)) => UnitProperty::Description(s),
            (PropertyName::Slice, RawPropertyValue::Text(s)) => UnitProperty::Slice(s),
            (PropertyName::Environment, RawPropertyValue::List(items)) => {
                UnitProperty::Environment(items)
            }
            (PropertyName::Dependency(kind), RawPropertyValue::List(items)) => {
                UnitProperty::Dependency(kind, items)
            }
            (PropertyName::Pids, RawPropertyValue::UInts(pids)) => UnitProperty::Pids(pids),
            // `[]` deserializes as an empty string list.
            (PropertyName::Pids, RawPropertyValue::List(items)) if items.is_empty() => {
                UnitProperty::Pids(Vec::new())
            }
            (PropertyName::ExecStart, RawPropertyValue::Commands(commands)) => {
                let values = commands
                    .into_iter()
                    .map(RawExecStart::into_value)
                    .collect::<Result<Vec<_>>>()?;
                UnitProperty::ExecStart(values)
            }
            (PropertyName::ExecStart, RawPropertyValue::List(items)) if items.is_empty() => {
                UnitProperty::ExecStart(Vec::new())
            }
            _ => return Err(mismatch()),
        };

        Ok(typed)
    }
}

/// Untyped property value as it appears in a TOML `[properties]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawPropertyValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
    UInts(Vec<u32>),
    Commands(Vec<RawExecStart>),
}

/// Untyped `ExecStart` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawExecStart {
    pub argv: Vec<String>,
    #[serde(default)]
    pub argv0: Option<String>,
    #[serde(default)]
    pub unclean_is_failure: bool,
}

impl RawExecStart {
    fn into_value(self) -> Result<ExecStartValue> {
        let value = ExecStartValue::new(self.argv)?.with_unclean_is_failure(self.unclean_is_failure);
        Ok(match self.argv0 {
            Some(path) => value.with_path(path),
            None => value,
        })
    }
}

/// A wire value tagged with its [`PropertyType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Bool(bool),
    String(String),
    StringArray(Vec<String>),
    UIntArray(Vec<u32>),
    ExecCommandArray(Vec<(String, Vec<String>, bool)>),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Bool(_) => PropertyType::Bool,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::StringArray(_) => PropertyType::StringArray,
            PropertyValue::UIntArray(_) => PropertyType::UIntArray,
            PropertyValue::ExecCommandArray(_) => PropertyType::ExecCommandArray,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedProperty {
    pub name: &'static str,
    pub value: PropertyValue,
}

/// Ordered property list for one `StartTransientUnit` call.
pub type JobProperties = Vec<EncodedProperty>;

/// Encode typed properties, preserving input order.
pub fn encode<'a>(properties: impl IntoIterator<Item = &'a UnitProperty>) -> JobProperties {
    properties.into_iter().map(encode_one).collect()
}

fn encode_one(property: &UnitProperty) -> EncodedProperty {
    let value = match property {
        UnitProperty::ExecStart(commands) => {
            PropertyValue::ExecCommandArray(commands.iter().map(ExecStartValue::to_wire).collect())
        }
        UnitProperty::RemainAfterExit(b) => PropertyValue::Bool(*b),
        UnitProperty::Type(s) | UnitProperty::Description(s) | UnitProperty::Slice(s) => {
            PropertyValue::String(s.clone())
        }
        UnitProperty::Pids(pids) => PropertyValue::UIntArray(pids.clone()),
        UnitProperty::Environment(items) | UnitProperty::Dependency(_, items) => {
            PropertyValue::StringArray(items.clone())
        }
    };

    EncodedProperty {
        name: property.name().as_str(),
        value,
    }
}

/// Encode configuration-time `(name, value)` pairs. Fails on the first
/// unknown name or mistyped value without producing partial output.
pub fn encode_named<I, S>(entries: I) -> Result<JobProperties>
where
    I: IntoIterator<Item = (S, RawPropertyValue)>,
    S: AsRef<str>,
{
    let typed = entries
        .into_iter()
        .map(|(name, raw)| UnitProperty::from_raw(name.as_ref(), raw))
        .collect::<Result<Vec<_>>>()?;

    Ok(encode(&typed))
}

/// Flatten an environment mapping into `KEY=VALUE` strings, in the mapping's
/// iteration order.
pub fn flatten_environment<I, K, V>(env: I) -> Vec<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    env.into_iter()
        .map(|(key, value)| format!("{}={}", key.as_ref(), value.as_ref()))
        .collect()
}
