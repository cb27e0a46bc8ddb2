use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{Attribute, ClassEntity, Diagram, RelationEdge, RelationKind};
use crate::naming;
use crate::relation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub field_name: String,
    pub referenced_class_id: String,
    /// Type name of the referenced class.
    pub referenced_class: String,
    pub constraint_name: String,
    pub on_delete_cascade: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchema {
    pub class_id: String,
    /// Sanitized, unique type name.
    pub name: String,
    /// Declared attributes with sanitized names, identifier excluded.
    pub attributes: Vec<Attribute>,
    /// Owner class ids of a junction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associates: Option<(String, String)>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl ClassSchema {
    pub fn is_associative(&self) -> bool {
        self.associates.is_some()
    }

    /// Label attribute used by client pickers: the first declared attribute.
    pub fn display_attribute(&self) -> Option<&str> {
        self.attributes.first().map(|a| a.name.as_str())
    }

    pub fn table(&self) -> String {
        naming::table_name(&self.name)
    }

    pub fn resource_path(&self) -> String {
        naming::resource_path(&self.name)
    }

    pub fn foreign_key_to(&self, class_id: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.referenced_class_id == class_id)
    }
}

/// One side of a many-to-many pair, seen from `owner`.
#[derive(Debug, Clone, Copy)]
pub struct Membership<'a> {
    pub junction: &'a ClassSchema,
    pub owner: &'a ClassSchema,
    pub far: &'a ClassSchema,
    pub owner_key: &'a ForeignKey,
    pub far_key: &'a ForeignKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DerivedSchema {
    pub classes: Vec<ClassSchema>,
}

impl DerivedSchema {
    pub fn class(&self, id: &str) -> Option<&ClassSchema> {
        self.classes.iter().find(|c| c.class_id == id)
    }

    pub fn regular(&self) -> impl Iterator<Item = &ClassSchema> {
        self.classes.iter().filter(|c| !c.is_associative())
    }

    pub fn associative(&self) -> impl Iterator<Item = &ClassSchema> {
        self.classes.iter().filter(|c| c.is_associative())
    }

    /// Every membership, two per junction (one per owner), in class order.
    pub fn memberships(&self) -> Vec<Membership<'_>> {
        let mut out = Vec::new();
        for junction in self.associative() {
            let Some((a, b)) = &junction.associates else {
                continue;
            };
            for (owner, far) in [(a, b), (b, a)] {
                if let Some(m) = self.membership(junction, owner, far) {
                    out.push(m);
                }
            }
        }
        out
    }

    pub fn memberships_of(&self, owner_id: &str) -> Vec<Membership<'_>> {
        self.memberships()
            .into_iter()
            .filter(|m| m.owner.class_id == owner_id)
            .collect()
    }

    fn membership<'a>(
        &'a self,
        junction: &'a ClassSchema,
        owner_id: &str,
        far_id: &str,
    ) -> Option<Membership<'a>> {
        Some(Membership {
            junction,
            owner: self.class(owner_id)?,
            far: self.class(far_id)?,
            owner_key: junction.foreign_key_to(owner_id)?,
            far_key: junction.foreign_key_to(far_id)?,
        })
    }

    /// Display label of the class a foreign key points at.
    pub fn display_attribute(&self, fk: &ForeignKey) -> Option<&str> {
        self.class(&fk.referenced_class_id)?.display_attribute()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Per-run state: resolved type names and the edges usable for keys.
struct Derivation<'a> {
    diagram: &'a Diagram,
    type_names: HashMap<&'a str, String>,
    edges: Vec<&'a RelationEdge>,
}

impl<'a> Derivation<'a> {
    fn new(diagram: &'a Diagram, diagnostics: &mut Diagnostics) -> Self {
        let mut type_names = HashMap::new();
        let mut taken: HashSet<String> = HashSet::new();
        for class in &diagram.classes {
            let raw = naming::type_name(&class.name).unwrap_or_else(|| "Unnamed".to_string());
            let base = naming::escape_type(raw.clone());
            if base != raw {
                diagnostics.push(
                    DiagnosticKind::NamingCollision,
                    &class.name,
                    format!("{} is used by the generated code, generating {}", raw, base),
                );
            }
            let mut name = base.clone();
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{}{}", base, n);
                n += 1;
            }
            if name != base {
                diagnostics.push(
                    DiagnosticKind::NamingCollision,
                    &class.name,
                    format!("type name {} already used, generating {}", base, name),
                );
            }
            type_names.insert(class.id.as_str(), name);
        }

        let mut edges = Vec::new();
        for edge in &diagram.relations {
            if edge.kind == RelationKind::Dependency {
                continue;
            }
            if !diagram.contains(&edge.source_id) || !diagram.contains(&edge.target_id) {
                debug!(edge = %edge.id, "skipping stale edge");
                continue;
            }
            if edge.source_id == edge.target_id {
                debug!(edge = %edge.id, "skipping self edge");
                continue;
            }
            edges.push(edge);
        }

        Self {
            diagram,
            type_names,
            edges,
        }
    }

    fn type_name(&self, class_id: &str) -> Option<&str> {
        self.type_names.get(class_id).map(String::as_str)
    }

    fn derive_class(&self, class: &ClassEntity, diagnostics: &mut Diagnostics) -> ClassSchema {
        let name = self.type_name(&class.id).unwrap_or_default().to_string();
        let attributes = self.attributes(class, diagnostics);

        let mut keys: Vec<ForeignKey> = Vec::new();
        let mut add = |referenced_id: &str, cascade: bool, diagnostics: &mut Diagnostics| {
            let Some(referenced) = self.type_name(referenced_id) else {
                return;
            };
            let field_name = naming::foreign_key_field(referenced);
            if attributes.iter().any(|a| a.name == field_name) {
                diagnostics.push(
                    DiagnosticKind::NamingCollision,
                    format!("{}.{}", name, field_name),
                    "foreign key matches a declared attribute, keeping the attribute",
                );
                return;
            }
            if keys.iter().any(|k| k.field_name == field_name) {
                debug!(class = %name, field = %field_name, "foreign key already derived");
                return;
            }
            keys.push(ForeignKey {
                field_name,
                referenced_class_id: referenced_id.to_string(),
                referenced_class: referenced.to_string(),
                constraint_name: naming::constraint_name(&name, referenced),
                on_delete_cascade: cascade,
            });
        };

        let associates = class.owners().map(|(a, b)| (a.to_string(), b.to_string()));
        if let Some((a, b)) = &associates {
            for owner in [a, b] {
                if self.diagram.contains(owner) {
                    add(owner.as_str(), true, diagnostics);
                } else {
                    diagnostics.push(
                        DiagnosticKind::StaleReference,
                        &class.name,
                        format!("owner {} is not in the diagram", owner),
                    );
                }
            }
            // a junction carries its two owner keys and nothing else
            for edge in &self.edges {
                let Some(ownership) = relation::classify(edge) else {
                    continue;
                };
                if ownership.holder_id != class.id
                    || ownership.referenced_id == a.as_str()
                    || ownership.referenced_id == b.as_str()
                {
                    continue;
                }
                diagnostics.push(
                    DiagnosticKind::InvalidAssociative,
                    &edge.id,
                    format!(
                        "{} edge would add a third key to junction {}, ignored",
                        edge.kind.as_str(),
                        class.name
                    ),
                );
            }
            return ClassSchema {
                class_id: class.id.clone(),
                name,
                attributes,
                associates,
                foreign_keys: keys,
            };
        }

        // inheritance first, then the structural kinds, each in stored order
        for inheritance in [true, false] {
            for edge in &self.edges {
                if (edge.kind == RelationKind::Inheritance) != inheritance {
                    continue;
                }
                let Some(ownership) = relation::classify(edge) else {
                    continue;
                };
                if ownership.holder_id != class.id {
                    continue;
                }
                if self
                    .diagram
                    .class(ownership.referenced_id)
                    .is_some_and(ClassEntity::is_associative)
                {
                    debug!(edge = %edge.id, "junctions are never referenced");
                    continue;
                }
                add(ownership.referenced_id, ownership.on_delete_cascade, diagnostics);
            }
        }

        ClassSchema {
            class_id: class.id.clone(),
            name,
            attributes,
            associates,
            foreign_keys: keys,
        }
    }

    fn attributes(&self, class: &ClassEntity, diagnostics: &mut Diagnostics) -> Vec<Attribute> {
        let mut out: Vec<Attribute> = Vec::new();
        for attribute in class.attributes.iter().filter(|a| !a.is_identifier()) {
            let Some(raw) = naming::member_name(&attribute.name) else {
                diagnostics.push(
                    DiagnosticKind::NamingCollision,
                    &class.name,
                    format!("attribute {:?} has no usable identifier", attribute.name),
                );
                continue;
            };
            let name = naming::escape_member(raw.clone());
            if name != raw {
                diagnostics.push(
                    DiagnosticKind::NamingCollision,
                    format!("{}.{}", class.name, attribute.name),
                    format!("{} is a reserved word, generating {}", raw, name),
                );
            }
            if name == "id" || out.iter().any(|a| a.name == name) {
                diagnostics.push(
                    DiagnosticKind::NamingCollision,
                    format!("{}.{}", class.name, attribute.name),
                    "attribute name already used in this class",
                );
                continue;
            }
            out.push(Attribute {
                name,
                ..attribute.clone()
            });
        }
        out
    }
}

/// Derive the per-class foreign keys of a diagram.
///
/// A junction gets exactly the keys of its owner pair. Other classes get keys
/// from inheritance edges where the class is the child, then association,
/// aggregation and composition edges where the class is the target. Field names are
/// deduplicated first-seen-wins; a declared attribute of the same name wins
/// over a derived key. Stale and self edges are skipped.
pub fn derive(diagram: &Diagram, diagnostics: &mut Diagnostics) -> DerivedSchema {
    let derivation = Derivation::new(diagram, diagnostics);
    let classes = diagram
        .classes
        .iter()
        .map(|class| derivation.derive_class(class, diagnostics))
        .collect();
    DerivedSchema { classes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect;
    use crate::model::{Multiplicity, Primitive};

    fn derive_source(source: &str) -> (DerivedSchema, Diagnostics) {
        let (diagram, mut diags) = Diagram::parse(source).unwrap();
        let schema = derive(&diagram, &mut diags);
        (schema, diags)
    }

    fn keys<'a>(schema: &'a DerivedSchema, id: &str) -> Vec<(&'a str, bool)> {
        schema
            .class(id)
            .unwrap()
            .foreign_keys
            .iter()
            .map(|k| (k.field_name.as_str(), k.on_delete_cascade))
            .collect()
    }

    #[test]
    fn test_inheritance_key_on_child() {
        let (schema, _) = derive_source(
            r#"
            class Person { name String }
            class Employee { salary Float }
            rel { Employee 1 -- 1 Person : inheritance }
            "#,
        );
        assert_eq!(keys(&schema, "Employee"), vec![("personId", true)]);
        assert!(keys(&schema, "Person").is_empty());
        let fk = &schema.class("Employee").unwrap().foreign_keys[0];
        assert_eq!(fk.constraint_name, "FK_EMPLOYEE_PERSON");
        assert_eq!(fk.referenced_class_id, "Person");
    }

    #[test]
    fn test_duplicate_edges_yield_one_key() {
        let (schema, _) = derive_source(
            r#"
            class A { x String }
            class B { y String }
            rel {
                A 1 -- * B
                A 1 -- * B
            }
            "#,
        );
        assert_eq!(keys(&schema, "B"), vec![("aId", true)]);
    }

    #[test]
    fn test_cascade_per_kind() {
        let (schema, _) = derive_source(
            r#"
            class Whole { }
            class Part { }
            class Team { }
            class Player { }
            class Report { }
            class Printer { }
            rel {
                Whole 1 -- * Part : composition
                Team 1 -- * Player : aggregation
                Report 1 -- 1 Printer : dependency
            }
            "#,
        );
        assert_eq!(keys(&schema, "Part"), vec![("wholeId", true)]);
        assert_eq!(keys(&schema, "Player"), vec![("teamId", false)]);
        assert!(keys(&schema, "Report").is_empty());
        assert!(keys(&schema, "Printer").is_empty());
    }

    #[test]
    fn test_associative_keys_and_order() {
        let (schema, diags) = derive_source(
            r#"
            class Course { name String }
            class Student { name String }
            class Term { }
            class Enrollment associates Course, Student { grade Float }
            rel {
                Term 1 -- * Enrollment
                Course 1 -- * Enrollment
            }
            "#,
        );
        let enrollment = schema.class("Enrollment").unwrap();
        assert_eq!(keys(&schema, "Enrollment"), vec![("courseId", true), ("studentId", true)]);
        assert_eq!(diags.count(DiagnosticKind::InvalidAssociative), 1);
        let constraints: Vec<&str> = enrollment
            .foreign_keys
            .iter()
            .map(|k| k.constraint_name.as_str())
            .collect();
        assert_eq!(
            constraints,
            vec!["FK_ENROLLMENT_COURSE", "FK_ENROLLMENT_STUDENT"]
        );
        let memberships = schema.memberships();
        assert_eq!(memberships.len(), 2);
        assert_eq!(memberships[0].owner.name, "Course");
        assert_eq!(memberships[0].far.name, "Student");
        assert_eq!(memberships[0].far_key.field_name, "studentId");
        assert_eq!(schema.memberships_of("Student")[0].far.name, "Course");
    }

    #[test]
    fn test_declared_attribute_wins() {
        let (schema, diags) = derive_source(
            r#"
            class Venta { }
            class Detalle { ventaId Integer cantidad Integer }
            rel { Venta 1 -- * Detalle }
            "#,
        );
        assert!(keys(&schema, "Detalle").is_empty());
        assert_eq!(diags.count(DiagnosticKind::NamingCollision), 1);
    }

    #[test]
    fn test_stale_and_self_edges_are_skipped() {
        let diagram = Diagram {
            classes: vec![ClassEntity::regular("a", "A", vec![])],
            relations: vec![
                RelationEdge::new("e1", "ghost", "a", RelationKind::Association),
                RelationEdge::new("e2", "a", "a", RelationKind::Association),
            ],
        };
        let schema = derive(&diagram, &mut Diagnostics::new());
        assert!(schema.classes[0].foreign_keys.is_empty());
    }

    #[test]
    fn test_every_key_resolves() {
        let (schema, _) = derive_source(
            r#"
            class Auto { }
            class Vehiculo { marca String }
            class Persona { nombre String }
            class Direccion { calle String }
            rel {
                Auto 1 -- 1 Vehiculo : inheritance
                Persona 1 -- 1 Direccion
            }
            "#,
        );
        for class in &schema.classes {
            for fk in &class.foreign_keys {
                assert!(schema.class(&fk.referenced_class_id).is_some());
            }
        }
        let direccion = schema.class("Direccion").unwrap();
        assert_eq!(schema.display_attribute(&direccion.foreign_keys[0]), Some("nombre"));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let source = r#"
            class Course { name String }
            class Student { name String }
            class Enrollment { grade Float }
            rel {
                Course 1 -- * Enrollment
                Student 1 -- * Enrollment
                Course * -- * Student
            }
        "#;
        let (diagram, _) = Diagram::parse(source).unwrap();
        let a = derive(&diagram, &mut Diagnostics::new()).to_json().unwrap();
        let b = derive(&diagram, &mut Diagnostics::new()).to_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_normalized_junction_has_exactly_two_keys() {
        let diagram = Diagram {
            classes: vec![
                ClassEntity::regular("c", "Course", vec![Attribute::new("title", Primitive::String)]),
                ClassEntity::regular("s", "Student", vec![]),
                ClassEntity::associative("e", "Enrollment", vec![], "c", "s"),
            ],
            relations: vec![
                RelationEdge::new("r1", "c", "e", RelationKind::Association)
                    .with_multiplicity(Multiplicity::One, Multiplicity::Many),
                RelationEdge::new("r2", "s", "c", RelationKind::Association),
            ],
        };
        let mut diags = Diagnostics::new();
        let normalized = detect::normalize(&diagram, &mut diags);
        let schema = derive(&normalized, &mut diags);
        assert_eq!(keys(&schema, "e"), vec![("courseId", true), ("studentId", true)]);
        assert!(keys(&schema, "c").is_empty());
        assert!(keys(&schema, "s").is_empty());
    }

    fn term_diagram(relations: Vec<RelationEdge>) -> Diagram {
        Diagram {
            classes: vec![
                ClassEntity::regular("c", "Course", vec![]),
                ClassEntity::regular("s", "Student", vec![]),
                ClassEntity::regular("t", "Term", vec![]),
                ClassEntity::associative("e", "Enrollment", vec![], "c", "s"),
            ],
            relations,
        }
    }

    #[test]
    fn test_junction_ignores_extra_inbound_edges() {
        let diagram = term_diagram(vec![
            RelationEdge::new("r1", "t", "e", RelationKind::Association),
            RelationEdge::new("r2", "e", "t", RelationKind::Inheritance),
            RelationEdge::new("r3", "t", "e", RelationKind::Composition),
        ]);
        let mut diags = Diagnostics::new();
        let normalized = detect::normalize(&diagram, &mut diags);
        let schema = derive(&normalized, &mut diags);

        for junction in schema.associative() {
            let (a, b) = junction.associates.clone().unwrap();
            let referenced: Vec<&str> = junction
                .foreign_keys
                .iter()
                .map(|k| k.referenced_class_id.as_str())
                .collect();
            assert_eq!(referenced, vec![a.as_str(), b.as_str()]);
        }
        assert_eq!(keys(&schema, "e"), vec![("courseId", true), ("studentId", true)]);
        assert!(keys(&schema, "t").is_empty());
        assert_eq!(diags.count(DiagnosticKind::InvalidAssociative), 3);
    }

    #[test]
    fn test_junction_as_association_source() {
        let diagram = term_diagram(vec![RelationEdge::new("r1", "e", "t", RelationKind::Association)]);
        let mut diags = Diagnostics::new();
        let normalized = detect::normalize(&diagram, &mut diags);
        let schema = derive(&normalized, &mut diags);

        // junctions are never referenced, so Term gets no key
        assert!(keys(&schema, "t").is_empty());
        assert_eq!(keys(&schema, "e"), vec![("courseId", true), ("studentId", true)]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_reserved_names_are_suffixed() {
        let diagram = Diagram {
            classes: vec![
                ClassEntity::regular(
                    "1",
                    "Long",
                    vec![
                        Attribute::new("class", Primitive::String),
                        Attribute::new("default", Primitive::Boolean),
                        Attribute::new("nombre", Primitive::String),
                    ],
                ),
                ClassEntity::regular("2", "List", vec![]),
                ClassEntity::regular("3", "LongEntity", vec![]),
            ],
            relations: vec![RelationEdge::new("r1", "1", "2", RelationKind::Association)],
        };
        let mut diags = Diagnostics::new();
        let schema = derive(&diagram, &mut diags);
        let names: Vec<&str> = schema.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["LongEntity", "ListEntity", "LongEntity2"]);
        let members: Vec<&str> = schema.classes[0].attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(members, vec!["class_", "default_", "nombre"]);
        assert_eq!(schema.classes[1].foreign_keys[0].field_name, "longEntityId");
        assert_eq!(diags.count(DiagnosticKind::NamingCollision), 5);
    }

    #[test]
    fn test_type_name_collisions() {
        let diagram = Diagram {
            classes: vec![
                ClassEntity::regular("1", "Detalle Venta", vec![]),
                ClassEntity::regular("2", "detalle-venta", vec![]),
            ],
            relations: vec![],
        };
        let mut diags = Diagnostics::new();
        let schema = derive(&diagram, &mut diags);
        assert_eq!(schema.classes[0].name, "DetalleVenta");
        assert_eq!(schema.classes[1].name, "DetalleVenta2");
        assert_eq!(diags.count(DiagnosticKind::NamingCollision), 1);
    }
}
