//! Declarative catalog of the Vehicle Signal Specification subset served by
//! the gateway. The GraphQL object types, the mock backend and the permission
//! requirements are all derived from it.

use async_graphql::{Number, Value};

use crate::authz::permissions::PermissionSet;
use crate::signal::{MalformedPathError, ScalarValue, SignalPath};

pub const READ_PERMISSION_SUFFIX: &str = "_READ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Int,
    Float,
    Boolean,
    String,
}

impl SignalKind {
    pub fn graphql_type(&self) -> &'static str {
        match self {
            SignalKind::Int => "Int",
            SignalKind::Float => "Float",
            SignalKind::Boolean => "Boolean",
            SignalKind::String => "String",
        }
    }

    /// Coerce a stored scalar into this kind's GraphQL output value.
    /// Values that cannot be represented resolve to null.
    pub fn coerce(&self, value: &ScalarValue) -> Option<Value> {
        match (self, value) {
            (_, ScalarValue::Null) => None,

            (SignalKind::Int, ScalarValue::Int(i)) => int_value(*i),
            (SignalKind::Int, ScalarValue::Float(f)) if f.fract() == 0.0 => int_value(*f as i64),
            (SignalKind::Int, ScalarValue::Float(_)) => None,
            (SignalKind::Int, ScalarValue::Bool(b)) => int_value(i64::from(*b)),
            (SignalKind::Int, ScalarValue::String(s)) => s.trim().parse::<i64>().ok().and_then(int_value),

            (SignalKind::Float, ScalarValue::Int(i)) => float_value(*i as f64),
            (SignalKind::Float, ScalarValue::Float(f)) => float_value(*f),
            (SignalKind::Float, ScalarValue::Bool(b)) => float_value(if *b { 1.0 } else { 0.0 }),
            (SignalKind::Float, ScalarValue::String(s)) => s.trim().parse::<f64>().ok().and_then(float_value),

            (SignalKind::Boolean, ScalarValue::Bool(b)) => Some(Value::Boolean(*b)),
            (SignalKind::Boolean, ScalarValue::Int(i)) => Some(Value::Boolean(*i != 0)),
            (SignalKind::Boolean, ScalarValue::Float(f)) => Some(Value::Boolean(*f != 0.0)),
            (SignalKind::Boolean, ScalarValue::String(s)) => match s.trim() {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },

            (SignalKind::String, ScalarValue::String(s)) => Some(Value::String(s.clone())),
            (SignalKind::String, other) => Some(Value::String(other.to_string())),
        }
    }

    /// Placeholder served by the mock backend.
    pub fn mock_value(&self) -> ScalarValue {
        match self {
            SignalKind::Int => ScalarValue::Int(42),
            SignalKind::Float => ScalarValue::Float(4.2),
            SignalKind::Boolean => ScalarValue::Bool(true),
            SignalKind::String => ScalarValue::String("Hello World".to_string()),
        }
    }
}

// GraphQL Int is 32 bit
fn int_value(i: i64) -> Option<Value> {
    i32::try_from(i).ok().map(|i| Value::Number(Number::from(i)))
}

fn float_value(f: f64) -> Option<Value> {
    Number::from_f64(f).map(Value::Number)
}

#[derive(Debug, Clone)]
pub enum Access {
    /// Requires `<signal path>_READ`.
    Read,
    Public,
    Require(Vec<String>),
}

/// Catalog declaration, before paths are resolved.
#[derive(Debug, Clone)]
pub enum Node {
    Branch {
        name: &'static str,
        description: &'static str,
        children: Vec<Node>,
    },
    Signal {
        name: &'static str,
        kind: SignalKind,
        description: &'static str,
        access: Access,
    },
}

pub fn branch(name: &'static str, description: &'static str, children: Vec<Node>) -> Node {
    Node::Branch {
        name,
        description,
        children,
    }
}

pub fn signal(name: &'static str, kind: SignalKind, description: &'static str) -> Node {
    Node::Signal {
        name,
        kind,
        description,
        access: Access::Read,
    }
}

impl Node {
    pub fn public(self) -> Self {
        self.with_access(Access::Public)
    }

    pub fn with_access(self, access: Access) -> Self {
        match self {
            Node::Signal {
                name,
                kind,
                description,
                ..
            } => Node::Signal {
                name,
                kind,
                description,
                access,
            },
            branch => branch,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BranchDef {
    pub path: SignalPath,
    pub description: String,
    pub branches: Vec<BranchDef>,
    pub signals: Vec<SignalDef>,
}

impl BranchDef {
    pub fn type_name(&self) -> String {
        graphql_type_name(&self.path)
    }

    pub fn field_name(&self) -> String {
        field_name(self.path.name())
    }
}

#[derive(Debug, Clone)]
pub struct SignalDef {
    pub path: SignalPath,
    pub kind: SignalKind,
    pub description: String,
    pub required: PermissionSet,
}

impl SignalDef {
    pub fn field_name(&self) -> String {
        field_name(self.path.name())
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    roots: Vec<BranchDef>,
}

impl Catalog {
    /// Resolve declared nodes into a catalog. Every root must be a branch.
    pub fn from_nodes(roots: Vec<Node>) -> Result<Self, MalformedPathError> {
        let mut resolved = Vec::with_capacity(roots.len());
        for node in roots {
            match node {
                Node::Branch {
                    name,
                    description,
                    children,
                } => {
                    let path = SignalPath::parse(name)?;
                    resolved.push(resolve_branch(path, description, children)?);
                }
                Node::Signal { name, .. } => {
                    return Err(MalformedPathError {
                        path: name.to_string(),
                        reason: "catalog roots must be branches",
                    })
                }
            }
        }
        Ok(Self { roots: resolved })
    }

    /// The Vehicle tree exposed by the gateway.
    pub fn vehicle() -> Result<Self, MalformedPathError> {
        use SignalKind::{Float, Int};

        Self::from_nodes(vec![branch(
            "Vehicle",
            "Highlevel vehicle data.",
            vec![
                branch(
                    "Drivetrain",
                    "Drivetrain data for internal combustion engines, transmissions, electric motors, etc.",
                    vec![
                        branch(
                            "FuelSystem",
                            "Fuel system data.",
                            vec![
                                signal(
                                    "InstantConsumption",
                                    Float,
                                    "Current consumption in liters per 100 km.",
                                ),
                                signal(
                                    "Level",
                                    Int,
                                    "Level in fuel tank as percent of capacity. 0 = empty. 100 = full.",
                                ),
                                signal("TankCapacity", Int, "Capacity of the fuel tank in liters"),
                            ],
                        ),
                        branch(
                            "InternalCombustionEngine",
                            "Engine-specific data, stopping at the bell housing.",
                            vec![branch(
                                "Engine",
                                "Engine signals",
                                vec![signal(
                                    "Speed",
                                    Int,
                                    "Engine speed measured as rotations per minute.",
                                )],
                            )],
                        ),
                        branch(
                            "Transmission",
                            "Transmission-specific data, stopping at the drive shafts.",
                            vec![signal("Gear", Int, "Current gear. 0=Neutral. -1=Reverse")],
                        ),
                    ],
                ),
                branch(
                    "VersionVSS",
                    "Supported Version of VSS.",
                    vec![
                        signal("Major", Int, "Supported Version of VSS - Major version.").public(),
                        signal("Minor", Int, "Supported Version of VSS - Minor version.").public(),
                        signal("Patch", Int, "Supported Version of VSS - Patch version.").public(),
                        signal("Label", SignalKind::String, "Label to further describe the version.").public(),
                    ],
                ),
            ],
        )])
    }

    pub fn roots(&self) -> &[BranchDef] {
        &self.roots
    }

    /// All signals, depth first.
    pub fn signals(&self) -> Vec<&SignalDef> {
        fn walk<'a>(branch: &'a BranchDef, out: &mut Vec<&'a SignalDef>) {
            out.extend(branch.signals.iter());
            for child in &branch.branches {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for root in &self.roots {
            walk(root, &mut out);
        }
        out
    }

    /// All branches, depth first, roots included.
    pub fn branches(&self) -> Vec<&BranchDef> {
        fn walk<'a>(branch: &'a BranchDef, out: &mut Vec<&'a BranchDef>) {
            out.push(branch);
            for child in &branch.branches {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for root in &self.roots {
            walk(root, &mut out);
        }
        out
    }

    pub fn signal(&self, path: &SignalPath) -> Option<&SignalDef> {
        self.signals().into_iter().find(|s| &s.path == path)
    }
}

fn resolve_branch(
    path: SignalPath,
    description: &str,
    children: Vec<Node>,
) -> Result<BranchDef, MalformedPathError> {
    let mut branches = Vec::new();
    let mut signals = Vec::new();
    for child in children {
        match child {
            Node::Branch {
                name,
                description,
                children,
            } => branches.push(resolve_branch(path.child(name)?, description, children)?),
            Node::Signal {
                name,
                kind,
                description,
                access,
            } => {
                let path = path.child(name)?;
                let required = match access {
                    Access::Read => PermissionSet::from_iter([read_permission(&path)]),
                    Access::Public => PermissionSet::new(),
                    Access::Require(perms) => PermissionSet::from_iter(perms),
                };
                signals.push(SignalDef {
                    path,
                    kind,
                    description: description.to_string(),
                    required,
                });
            }
        }
    }
    Ok(BranchDef {
        path,
        description: description.to_string(),
        branches,
        signals,
    })
}

/// `Vehicle.Drivetrain.Transmission.Gear` -> `Vehicle.Drivetrain.Transmission.Gear_READ`
pub fn read_permission(path: &SignalPath) -> String {
    format!("{path}{READ_PERMISSION_SUFFIX}")
}

/// `Vehicle.Drivetrain.FuelSystem` -> `Vehicle_Drivetrain_FuelSystem`
pub fn graphql_type_name(path: &SignalPath) -> String {
    path.segments().join("_")
}

/// `InternalCombustionEngine` -> `internalCombustionEngine`
pub fn field_name(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_catalog_shape() {
        let catalog = Catalog::vehicle().unwrap();
        assert_eq!(catalog.roots().len(), 1);
        assert_eq!(catalog.roots()[0].type_name(), "Vehicle");
        assert_eq!(catalog.signals().len(), 9);

        let names: Vec<String> = catalog.branches().iter().map(|b| b.type_name()).collect();
        assert!(names.contains(&"Vehicle_Drivetrain_InternalCombustionEngine_Engine".to_string()));
    }

    #[test]
    fn test_signal_permissions() {
        let catalog = Catalog::vehicle().unwrap();
        let gear = catalog
            .signal(&SignalPath::parse("Vehicle.Drivetrain.Transmission.Gear").unwrap())
            .unwrap();
        assert_eq!(gear.field_name(), "gear");
        assert!(gear
            .required
            .contains("Vehicle.Drivetrain.Transmission.Gear_READ"));

        let major = catalog
            .signal(&SignalPath::parse("Vehicle.VersionVSS.Major").unwrap())
            .unwrap();
        assert!(major.required.is_empty());
    }

    #[test]
    fn test_custom_access() {
        let catalog = Catalog::from_nodes(vec![branch(
            "Cabin",
            "",
            vec![signal("DoorCount", SignalKind::Int, "")
                .with_access(Access::Require(vec!["a".into(), "b".into()]))],
        )])
        .unwrap();
        assert_eq!(catalog.signals()[0].required.len(), 2);
    }

    #[test]
    fn test_root_signal_rejected() {
        assert!(Catalog::from_nodes(vec![signal("Speed", SignalKind::Int, "")]).is_err());
    }

    #[test]
    fn test_field_name() {
        assert_eq!(field_name("InternalCombustionEngine"), "internalCombustionEngine");
        assert_eq!(field_name("VersionVSS"), "versionVSS");
        assert_eq!(field_name("gear"), "gear");
    }

    #[test]
    fn test_coerce_int() {
        let k = SignalKind::Int;
        assert_eq!(k.coerce(&ScalarValue::Int(3)), Some(Value::from(3)));
        assert_eq!(k.coerce(&ScalarValue::String(" -1 ".into())), Some(Value::from(-1)));
        assert_eq!(k.coerce(&ScalarValue::Float(2.0)), Some(Value::from(2)));
        assert_eq!(k.coerce(&ScalarValue::Float(2.5)), None);
        assert_eq!(k.coerce(&ScalarValue::Int(i64::MAX)), None);
        assert_eq!(k.coerce(&ScalarValue::Null), None);
    }

    #[test]
    fn test_coerce_other_kinds() {
        assert_eq!(
            SignalKind::Boolean.coerce(&ScalarValue::Int(1)),
            Some(Value::Boolean(true))
        );
        assert_eq!(
            SignalKind::Float.coerce(&ScalarValue::Int(7)),
            Some(Value::Number(Number::from_f64(7.0).unwrap()))
        );
        assert_eq!(
            SignalKind::String.coerce(&ScalarValue::Int(7)),
            Some(Value::String("7".into()))
        );
        assert_eq!(SignalKind::Boolean.coerce(&ScalarValue::String("yes".into())), None);
    }
}
