use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ast::{Cardinality, Source};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::naming;
use crate::parser::{ParseError, Parser};

#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("Invalid diagram JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Primitive {
    #[default]
    String,
    Integer,
    Real,
    Boolean,
    Date,
}

impl Primitive {
    pub fn from_str(s: &str) -> Option<Self> {
        match naming::normalize(s).as_str() {
            "string" | "text" | "str" => Some(Self::String),
            "integer" | "int" | "long" => Some(Self::Integer),
            "real" | "float" | "double" | "decimal" => Some(Self::Real),
            "boolean" | "bool" => Some(Self::Boolean),
            "date" | "datetime" | "localdate" => Some(Self::Date),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Real => "Real",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
        }
    }
}

// Unknown type names fall back to String instead of rejecting the snapshot.
impl From<String> for Primitive {
    fn from(s: String) -> Self {
        Self::from_str(&s).unwrap_or_else(|| {
            warn!(datatype = %s, "unknown attribute type, using String");
            Self::String
        })
    }
}

impl Serialize for Primitive {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Primitive {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Primitive::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
    Protected,
}

impl Visibility {
    pub fn from_str(s: &str) -> Option<Self> {
        match naming::normalize(s).as_str() {
            "public" | "publico" | "+" => Some(Self::Public),
            "private" | "privado" | "-" => Some(Self::Private),
            "protected" | "protegido" | "#" => Some(Self::Protected),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Protected => "protected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    #[serde(alias = "datatype", alias = "type", default)]
    pub primitive_type: Primitive,
    #[serde(alias = "scope", default)]
    pub visibility: Visibility,
}

impl Attribute {
    pub fn new(name: impl Into<String>, primitive_type: Primitive) -> Self {
        Self {
            name: name.into(),
            primitive_type,
            visibility: Visibility::Private,
        }
    }

    /// The identifier column is synthesized by every stack, never declared.
    pub fn is_identifier(&self) -> bool {
        self.name.trim().eq_ignore_ascii_case("id")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClassKind {
    #[default]
    Regular,
    /// Junction of a many-to-many pair; owners are class ids.
    Associative { owner_a: String, owner_b: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ClassRecord", into = "ClassRecord")]
pub struct ClassEntity {
    pub id: String,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub kind: ClassKind,
}

impl ClassEntity {
    pub fn regular(id: impl Into<String>, name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes,
            kind: ClassKind::Regular,
        }
    }

    pub fn associative(
        id: impl Into<String>,
        name: impl Into<String>,
        attributes: Vec<Attribute>,
        owner_a: impl Into<String>,
        owner_b: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes,
            kind: ClassKind::Associative {
                owner_a: owner_a.into(),
                owner_b: owner_b.into(),
            },
        }
    }

    pub fn is_associative(&self) -> bool {
        matches!(self.kind, ClassKind::Associative { .. })
    }

    pub fn owners(&self) -> Option<(&str, &str)> {
        match &self.kind {
            ClassKind::Associative { owner_a, owner_b } => Some((owner_a.as_str(), owner_b.as_str())),
            ClassKind::Regular => None,
        }
    }

    pub fn declares(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a.name == attribute)
    }
}

/// Wire shape of a class: the flat record the editor stores.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassRecord {
    id: String,
    #[serde(alias = "label")]
    name: String,
    #[serde(default)]
    attributes: Vec<Attribute>,
    #[serde(default, alias = "asociativa")]
    is_associative: bool,
    #[serde(default, alias = "relaciona", skip_serializing_if = "Option::is_none")]
    associates_pair: Option<Vec<String>>,
}

impl From<ClassRecord> for ClassEntity {
    fn from(record: ClassRecord) -> Self {
        let kind = match (record.is_associative, record.associates_pair) {
            (true, Some(pair)) if pair.len() == 2 => {
                let mut pair = pair.into_iter();
                match (pair.next(), pair.next()) {
                    (Some(owner_a), Some(owner_b)) => ClassKind::Associative { owner_a, owner_b },
                    _ => ClassKind::Regular,
                }
            }
            (true, _) => {
                warn!(class = %record.name, "associative flag without an owner pair, treating as regular");
                ClassKind::Regular
            }
            (false, _) => ClassKind::Regular,
        };
        Self {
            id: record.id,
            name: record.name,
            attributes: record.attributes,
            kind,
        }
    }
}

impl From<ClassEntity> for ClassRecord {
    fn from(class: ClassEntity) -> Self {
        let (is_associative, associates_pair) = match class.kind {
            ClassKind::Associative { owner_a, owner_b } => (true, Some(vec![owner_a, owner_b])),
            ClassKind::Regular => (false, None),
        };
        Self {
            id: class.id,
            name: class.name,
            attributes: class.attributes,
            is_associative,
            associates_pair,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RelationKind {
    #[default]
    #[serde(alias = "association", alias = "asociacion")]
    Association,
    #[serde(alias = "inheritance", alias = "herencia")]
    Inheritance,
    #[serde(alias = "composition", alias = "composicion")]
    Composition,
    #[serde(alias = "aggregation", alias = "agregacion")]
    Aggregation,
    #[serde(alias = "dependency", alias = "dependencia")]
    Dependency,
}

impl RelationKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match naming::normalize(s).as_str() {
            "association" | "asociacion" => Some(Self::Association),
            "inheritance" | "herencia" | "generalization" => Some(Self::Inheritance),
            "composition" | "composicion" => Some(Self::Composition),
            "aggregation" | "agregacion" => Some(Self::Aggregation),
            "dependency" | "dependencia" => Some(Self::Dependency),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Association => "association",
            Self::Inheritance => "inheritance",
            Self::Composition => "composition",
            Self::Aggregation => "aggregation",
            Self::Dependency => "dependency",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Multiplicity {
    #[default]
    #[serde(rename = "1", alias = "0..1", alias = "1..1")]
    One,
    #[serde(rename = "*", alias = "1..*", alias = "0..*", alias = "n")]
    Many,
}

impl Multiplicity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::One => "1",
            Self::Many => "*",
        }
    }
}

impl From<Cardinality> for Multiplicity {
    fn from(c: Cardinality) -> Self {
        match c {
            Cardinality::One | Cardinality::ZeroOrOne => Self::One,
            Cardinality::Many | Cardinality::OneOrMore => Self::Many,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationEdge {
    pub id: String,
    #[serde(alias = "source")]
    pub source_id: String,
    #[serde(alias = "target")]
    pub target_id: String,
    #[serde(alias = "tipo", default)]
    pub kind: RelationKind,
    #[serde(alias = "multiplicidadOrigen", default)]
    pub source_multiplicity: Multiplicity,
    #[serde(alias = "multiplicidadDestino", default)]
    pub target_multiplicity: Multiplicity,
}

impl RelationEdge {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        kind: RelationKind,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
            source_multiplicity: Multiplicity::One,
            target_multiplicity: Multiplicity::One,
        }
    }

    pub fn with_multiplicity(mut self, source: Multiplicity, target: Multiplicity) -> Self {
        self.source_multiplicity = source;
        self.target_multiplicity = target;
        self
    }

    pub fn touches(&self, class_id: &str) -> bool {
        self.source_id == class_id || self.target_id == class_id
    }

    /// True if the edge joins `a` and `b` in either direction.
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.source_id == a && self.target_id == b) || (self.source_id == b && self.target_id == a)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagram {
    #[serde(alias = "nodes", default)]
    pub classes: Vec<ClassEntity>,
    #[serde(alias = "edges", default)]
    pub relations: Vec<RelationEdge>,
}

impl Diagram {
    pub fn from_json(json: &str) -> Result<Self, DiagramError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, DiagramError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse the text notation and lower it into a diagram.
    pub fn parse(source: &str) -> Result<(Self, Diagnostics), DiagramError> {
        let ast = Parser::new(source)?.parse()?;
        Ok(Self::from_source(&ast))
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class(&self, id: &str) -> Option<&ClassEntity> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&ClassEntity> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.class(id).is_some()
    }

    /// Lower the text notation. Class ids are the declared names and edges
    /// are numbered `r1`, `r2`, ... in declaration order.
    pub fn from_source(source: &Source) -> (Self, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut classes: Vec<ClassEntity> = Vec::new();

        for decl in &source.classes {
            if classes.iter().any(|c| c.id == decl.name) {
                diagnostics.push(
                    DiagnosticKind::NamingCollision,
                    &decl.name,
                    "class declared twice, keeping the first declaration",
                );
                continue;
            }

            let attributes = decl
                .attributes
                .iter()
                .map(|a| {
                    let primitive_type = Primitive::from_str(&a.typ).unwrap_or_else(|| {
                        diagnostics.push(
                            DiagnosticKind::MalformedPayload,
                            format!("{}.{}", decl.name, a.name),
                            format!("unknown type {}, using String", a.typ),
                        );
                        Primitive::String
                    });
                    let visibility = a
                        .visibility
                        .as_deref()
                        .and_then(Visibility::from_str)
                        .unwrap_or_default();
                    Attribute {
                        name: a.name.clone(),
                        primitive_type,
                        visibility,
                    }
                })
                .collect();

            let class = match &decl.associates {
                Some((a, b)) => ClassEntity::associative(&decl.name, &decl.name, attributes, a, b),
                None => ClassEntity::regular(&decl.name, &decl.name, attributes),
            };
            classes.push(class);
        }

        let mut relations = Vec::new();
        for (i, rel) in source.relations.iter().enumerate() {
            let id = format!("r{}", i + 1);
            let known = |name: &str| classes.iter().any(|c| c.id == name);
            if !known(&rel.source) || !known(&rel.target) {
                diagnostics.push(
                    DiagnosticKind::StaleReference,
                    &id,
                    format!("{} -- {} names an undeclared class", rel.source, rel.target),
                );
                continue;
            }

            let kind = match rel.kind.as_deref() {
                None => RelationKind::Association,
                Some(k) => RelationKind::from_str(k).unwrap_or_else(|| {
                    diagnostics.push(
                        DiagnosticKind::MalformedPayload,
                        &id,
                        format!("unknown relation kind {}, using association", k),
                    );
                    RelationKind::Association
                }),
            };

            relations.push(
                RelationEdge::new(id, &rel.source, &rel.target, kind)
                    .with_multiplicity(rel.source_cardinality.into(), rel.target_cardinality.into()),
            );
        }

        (Self { classes, relations }, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_json_fields() {
        let json = r#"{
            "nodes": [
                {"id": "1", "label": "Estudiante",
                 "attributes": [{"name": "nombre", "datatype": "String", "scope": "public"}]},
                {"id": "2", "label": "Curso", "attributes": []},
                {"id": "3", "label": "Inscripcion", "asociativa": true, "relaciona": ["1", "2"],
                 "attributes": [{"name": "nota", "datatype": "Float"}]}
            ],
            "edges": [
                {"id": "e1", "source": "1", "target": "3", "tipo": "asociacion",
                 "multiplicidadOrigen": "1", "multiplicidadDestino": "*"}
            ]
        }"#;
        let diagram = Diagram::from_json(json).unwrap();
        assert_eq!(diagram.classes.len(), 3);
        assert_eq!(diagram.classes[0].name, "Estudiante");
        assert_eq!(diagram.classes[0].attributes[0].visibility, Visibility::Public);
        assert_eq!(diagram.classes[2].owners(), Some(("1", "2")));
        assert_eq!(diagram.classes[2].attributes[0].primitive_type, Primitive::Real);
        assert_eq!(diagram.relations[0].kind, RelationKind::Association);
        assert_eq!(diagram.relations[0].target_multiplicity, Multiplicity::Many);
    }

    #[test]
    fn test_associative_flag_without_pair_is_regular() {
        let json = r#"{"classes": [{"id": "a", "name": "Detalle", "isAssociative": true}]}"#;
        let diagram = Diagram::from_json(json).unwrap();
        assert_eq!(diagram.classes[0].kind, ClassKind::Regular);

        let json = r#"{"classes": [{"id": "a", "name": "Detalle", "isAssociative": true,
                        "associatesPair": ["x"]}]}"#;
        let diagram = Diagram::from_json(json).unwrap();
        assert!(!diagram.classes[0].is_associative());
    }

    #[test]
    fn test_json_round_trip_keeps_kind() {
        let diagram = Diagram {
            classes: vec![
                ClassEntity::regular("a", "A", vec![]),
                ClassEntity::regular("b", "B", vec![]),
                ClassEntity::associative("j", "AB", vec![], "a", "b"),
            ],
            relations: vec![RelationEdge::new("e1", "a", "j", RelationKind::Composition)],
        };
        let json = diagram.to_json().unwrap();
        assert!(json.contains("\"isAssociative\": true"));
        assert!(json.contains("\"kind\": \"Composition\""));
        assert_eq!(Diagram::from_json(&json).unwrap(), diagram);
    }

    #[test]
    fn test_unknown_datatype_falls_back_to_string() {
        let json = r#"{"classes": [{"id": "a", "name": "A",
                        "attributes": [{"name": "x", "primitiveType": "Blob"}]}]}"#;
        let diagram = Diagram::from_json(json).unwrap();
        assert_eq!(diagram.classes[0].attributes[0].primitive_type, Primitive::String);
    }

    #[test]
    fn test_from_source() {
        let (diagram, diags) = Diagram::parse(
            r#"
            class Proyecto { nombre String }
            class Tarea { titulo String horas Float }
            class Ghost { }
            rel {
                Proyecto 1 -- 1..* Tarea : composition
                Proyecto 1 -- * Nadie
            }
            "#,
        )
        .unwrap();
        assert_eq!(diagram.classes.len(), 3);
        assert_eq!(diagram.classes[1].attributes[1].primitive_type, Primitive::Real);
        assert_eq!(diagram.relations.len(), 1);
        let edge = &diagram.relations[0];
        assert_eq!(edge.id, "r1");
        assert_eq!(edge.kind, RelationKind::Composition);
        assert_eq!(edge.target_multiplicity, Multiplicity::Many);
        assert_eq!(diags.count(DiagnosticKind::StaleReference), 1);
    }

    #[test]
    fn test_from_source_duplicate_class() {
        let (diagram, diags) = Diagram::parse("class A { } class A { x String }").unwrap();
        assert_eq!(diagram.classes.len(), 1);
        assert!(diagram.classes[0].attributes.is_empty());
        assert_eq!(diags.count(DiagnosticKind::NamingCollision), 1);
    }
}
