//! Electrical entities (components) and their parameter rules.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use dp_core::{Domain, DpError, PhaseGroup};

use crate::error::{TopologyError, TopologyResult};
use crate::topology::Node;

/// Kind of an electrical entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// Ideal voltage source.
    VoltageSource,
    /// Ideal current source.
    CurrentSource,
    /// Voltage source behind an internal series resistance.
    ResistiveVoltageSource,
    Resistor,
    Capacitor,
    Inductor,
    /// Series R-L line section.
    RxLine,
    /// Two-state resistive switch.
    Switch,
}

/// Admissible range of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRule {
    /// Any finite value.
    Finite,
    /// Finite and > 0.
    Positive,
    /// 0 or 1.
    Flag,
}

/// Declaration of one named parameter of an entity kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub rule: ParamRule,
    /// `None` means the parameter is required.
    pub default: Option<f64>,
}

const fn required(name: &'static str, rule: ParamRule) -> ParamSpec {
    ParamSpec {
        name,
        rule,
        default: None,
    }
}

const fn optional(name: &'static str, rule: ParamRule, default: f64) -> ParamSpec {
    ParamSpec {
        name,
        rule,
        default: Some(default),
    }
}

const VOLTAGE_SOURCE: &[ParamSpec] = &[
    required("voltage_ref", ParamRule::Finite),
    optional("phase", ParamRule::Finite, 0.0),
];
const CURRENT_SOURCE: &[ParamSpec] = &[
    required("current_ref", ParamRule::Finite),
    optional("phase", ParamRule::Finite, 0.0),
];
const RESISTIVE_VOLTAGE_SOURCE: &[ParamSpec] = &[
    required("voltage_ref", ParamRule::Finite),
    required("resistance", ParamRule::Positive),
    optional("phase", ParamRule::Finite, 0.0),
];
const RESISTOR: &[ParamSpec] = &[required("resistance", ParamRule::Positive)];
const CAPACITOR: &[ParamSpec] = &[required("capacitance", ParamRule::Positive)];
const INDUCTOR: &[ParamSpec] = &[required("inductance", ParamRule::Positive)];
const RX_LINE: &[ParamSpec] = &[
    required("resistance", ParamRule::Positive),
    required("inductance", ParamRule::Positive),
];
const SWITCH: &[ParamSpec] = &[
    required("open_resistance", ParamRule::Positive),
    required("closed_resistance", ParamRule::Positive),
    optional("closed", ParamRule::Flag, 0.0),
];

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::VoltageSource,
        EntityKind::CurrentSource,
        EntityKind::ResistiveVoltageSource,
        EntityKind::Resistor,
        EntityKind::Capacitor,
        EntityKind::Inductor,
        EntityKind::RxLine,
        EntityKind::Switch,
    ];

    /// Type name as it appears in catalog keys and namespace paths.
    pub fn type_name(self) -> &'static str {
        match self {
            EntityKind::VoltageSource => "VoltageSource",
            EntityKind::CurrentSource => "CurrentSource",
            EntityKind::ResistiveVoltageSource => "VoltageSourceNorton",
            EntityKind::Resistor => "Resistor",
            EntityKind::Capacitor => "Capacitor",
            EntityKind::Inductor => "Inductor",
            EntityKind::RxLine => "RxLine",
            EntityKind::Switch => "Switch",
        }
    }

    /// Number of terminals.
    pub fn arity(self) -> usize {
        2
    }

    pub fn params(self) -> &'static [ParamSpec] {
        match self {
            EntityKind::VoltageSource => VOLTAGE_SOURCE,
            EntityKind::CurrentSource => CURRENT_SOURCE,
            EntityKind::ResistiveVoltageSource => RESISTIVE_VOLTAGE_SOURCE,
            EntityKind::Resistor => RESISTOR,
            EntityKind::Capacitor => CAPACITOR,
            EntityKind::Inductor => INDUCTOR,
            EntityKind::RxLine => RX_LINE,
            EntityKind::Switch => SWITCH,
        }
    }

    pub fn is_source(self) -> bool {
        matches!(
            self,
            EntityKind::VoltageSource
                | EntityKind::CurrentSource
                | EntityKind::ResistiveVoltageSource
        )
    }

    /// Check that `value` is legal for `parameter` on this kind.
    pub fn check_parameter(self, parameter: &str, value: f64) -> TopologyResult<()> {
        let spec = self
            .params()
            .iter()
            .find(|p| p.name == parameter)
            .ok_or_else(|| TopologyError::UnknownParameter {
                kind: self,
                parameter: parameter.to_string(),
            })?;
        let reason = match spec.rule {
            _ if !value.is_finite() => Some("value must be finite"),
            ParamRule::Finite => None,
            ParamRule::Positive if value <= 0.0 => Some("value must be positive"),
            ParamRule::Positive => None,
            ParamRule::Flag if value != 0.0 && value != 1.0 => Some("value must be 0 or 1"),
            ParamRule::Flag => None,
        };
        match reason {
            Some(reason) => Err(TopologyError::InvalidParameter {
                kind: self,
                parameter: parameter.to_string(),
                value,
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Validate a full parameter set and fill in defaults.
    pub fn resolve_params(self, params: Params) -> TopologyResult<Params> {
        for (name, &value) in params.iter() {
            self.check_parameter(name, value)?;
        }
        let mut resolved = params;
        for spec in self.params() {
            if resolved.get(spec.name).is_none() {
                match spec.default {
                    Some(default) => resolved.set(spec.name, default),
                    None => {
                        return Err(TopologyError::MissingParameter {
                            kind: self,
                            parameter: spec.name,
                        });
                    }
                }
            }
        }
        Ok(resolved)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for EntityKind {
    type Err = DpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.type_name() == s)
            .ok_or_else(|| DpError::Unknown {
                what: "entity type",
                name: s.to_string(),
            })
    }
}

/// Fully qualified entity type: what a registry constructor builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityType {
    pub domain: Domain,
    pub phase: PhaseGroup,
    pub kind: EntityKind,
}

impl EntityType {
    pub fn new(domain: Domain, phase: PhaseGroup, kind: EntityKind) -> Self {
        Self {
            domain,
            phase,
            kind,
        }
    }

    /// Dotted path, e.g. `dp.ph1.Resistor`.
    pub fn path(&self) -> String {
        format!("{}.{}.{}", self.domain, self.phase, self.kind)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Named numeric parameters, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, f64>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// An electrical component instance.
///
/// Terminals refer to nodes by name; the topology owns the nodes themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    name: String,
    ty: EntityType,
    terminals: Vec<String>,
    params: Params,
}

impl Entity {
    /// Create an entity, checking its parameters against the kind's rules.
    ///
    /// Terminal membership and arity are checked when the entity joins a topology.
    pub fn new<S: Into<String>>(
        ty: EntityType,
        name: impl Into<String>,
        terminals: impl IntoIterator<Item = S>,
        params: Params,
    ) -> TopologyResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(TopologyError::EmptyName { what: "entity" });
        }
        let params = ty.kind.resolve_params(params)?;
        Ok(Self {
            name,
            ty,
            terminals: terminals.into_iter().map(Into::into).collect(),
            params,
        })
    }

    /// Create an entity connected to the given node values.
    pub fn connect(
        ty: EntityType,
        name: impl Into<String>,
        nodes: &[&Node],
        params: Params,
    ) -> TopologyResult<Self> {
        Self::new(ty, name, nodes.iter().map(|n| n.name().to_string()), params)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_type(&self) -> EntityType {
        self.ty
    }

    pub fn kind(&self) -> EntityKind {
        self.ty.kind
    }

    pub fn terminals(&self) -> &[String] {
        &self.terminals
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Parameter value with defaults already applied.
    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name)
    }
}
