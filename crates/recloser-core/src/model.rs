//! Catalog data model: devices, firmware versions, the per-firmware service tree,
//! features, and the UI component/limit metadata bound to features.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type RecloserId = i64;
pub type FirmwareId = i64;
pub type ServiceId = i64;
pub type FeatureId = i64;
pub type BindingId = i64;
pub type ComponentId = i64;
pub type LimitId = i64;

/// A display language, e.g. `enUs` / "English".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub display_name: String,
}

/// One translation of a description key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub language_code: String,
    pub value: String,
}

/// A device family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recloser {
    pub id: RecloserId,
    pub description_key: String,
    pub model: String,
}

/// A firmware version owned by exactly one recloser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub id: FirmwareId,
    pub version: String,
    pub recloser_id: RecloserId,
}

/// A node of the per-firmware configuration-screen tree.
///
/// `parent_id == None` marks a root. A parent always belongs to the same
/// firmware as its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub service_key: String,
    pub description_key: String,
    pub parent_id: Option<ServiceId>,
    pub firmware_id: FirmwareId,
}

impl Service {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A single configurable parameter owned by a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub description_key: String,
    pub service_id: ServiceId,
}

/// A UI widget kind from the static component catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentType {
    pub id: ComponentId,
    #[serde(rename = "type")]
    pub type_name: String,
    pub key: String,
}

impl ComponentType {
    /// The well-known kind this row describes, if any.
    pub fn kind(&self) -> Option<ComponentKind> {
        ComponentKind::from_name(&self.type_name)
    }
}

/// A limit kind from the static limit catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitType {
    pub id: LimitId,
    pub key: String,
}

/// Association of a feature with a component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentBinding {
    pub binding_id: BindingId,
    pub component: ComponentType,
}

/// A limit's literal value for one binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitValue {
    pub key: String,
    pub value: String,
}

impl LimitValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Fields for inserting a firmware-scoped service.
#[derive(Debug, Clone)]
pub struct NewService {
    pub service_key: String,
    pub description_key: String,
    pub firmware_id: FirmwareId,
    pub parent_id: Option<ServiceId>,
}

/// Widget kinds seeded into the component catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    ComboBox,
    TextField,
    Decimal,
    Integer,
    Date,
    Time,
    DateTime,
    Spinner,
    CheckBox,
    Toggle,
    Button,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 11] = [
        ComponentKind::ComboBox,
        ComponentKind::TextField,
        ComponentKind::Decimal,
        ComponentKind::Integer,
        ComponentKind::Date,
        ComponentKind::Time,
        ComponentKind::DateTime,
        ComponentKind::Spinner,
        ComponentKind::CheckBox,
        ComponentKind::Toggle,
        ComponentKind::Button,
    ];

    /// The `type` column value.
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::ComboBox => "ComboBox",
            ComponentKind::TextField => "TextField",
            ComponentKind::Decimal => "Decimal",
            ComponentKind::Integer => "Integer",
            ComponentKind::Date => "Date",
            ComponentKind::Time => "Time",
            ComponentKind::DateTime => "DateTime",
            ComponentKind::Spinner => "Spinner",
            ComponentKind::CheckBox => "CheckBox",
            ComponentKind::Toggle => "Toggle",
            ComponentKind::Button => "Button",
        }
    }

    /// The short `key` column value.
    pub fn key(self) -> &'static str {
        match self {
            ComponentKind::ComboBox => "cb",
            ComponentKind::TextField => "tf",
            ComponentKind::Decimal => "dec",
            ComponentKind::Integer => "int",
            ComponentKind::Date => "date",
            ComponentKind::Time => "time",
            ComponentKind::DateTime => "dt",
            ComponentKind::Spinner => "spn",
            ComponentKind::CheckBox => "chk",
            ComponentKind::Toggle => "tgl",
            ComponentKind::Button => "btn",
        }
    }

    /// Case-insensitive lookup by type name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limit kinds seeded into the limit catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitKind {
    MinValue,
    MaxValue,
    DefaultValue,
    Step,
    MaxChar,
    MinChar,
}

impl LimitKind {
    pub const ALL: [LimitKind; 6] = [
        LimitKind::MinValue,
        LimitKind::MaxValue,
        LimitKind::DefaultValue,
        LimitKind::Step,
        LimitKind::MaxChar,
        LimitKind::MinChar,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LimitKind::MinValue => "MIN_VALUE",
            LimitKind::MaxValue => "MAX_VALUE",
            LimitKind::DefaultValue => "DEFAULT_VALUE",
            LimitKind::Step => "STEP",
            LimitKind::MaxChar => "MAX_CHAR",
            LimitKind::MinChar => "MIN_CHAR",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
