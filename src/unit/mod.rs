// src/unit/mod.rs

//! Transient unit description: naming rules and the property encoder.
//!
//! - [`name`] derives and checks unit names.
//! - [`properties`] holds the property table and the encoder that turns
//!   typed or configuration-time properties into wire values.

pub mod name;
pub mod properties;

pub use name::{SERVICE_SUFFIX, unit_name_for};
pub use properties::{
    DependencyKind, EncodedProperty, ExecStartValue, JobProperties, PropertyName, PropertyType,
    PropertyValue, RawExecStart, RawPropertyValue, UnitProperty, encode, encode_named,
    flatten_environment,
};
