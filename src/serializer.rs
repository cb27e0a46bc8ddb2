//! Serializer for converting a diagram back to the text notation.

use std::collections::HashMap;

use crate::model::{Attribute, ClassEntity, Diagram, RelationEdge, RelationKind, Visibility};
use crate::relation;

const KEYWORDS: [&str; 6] = ["class", "rel", "associates", "public", "private", "protected"];

/// Serialize a diagram to the text notation.
///
/// Classes are written by name, so ids assigned by an editor are not kept.
/// Edges whose endpoints are missing from the diagram are skipped.
pub fn serialize(diagram: &Diagram) -> String {
    let names: HashMap<&str, &str> = diagram
        .classes
        .iter()
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    let mut output = String::new();
    for (i, class) in diagram.classes.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        serialize_class(&mut output, class, &names);
    }

    let relations: Vec<String> = diagram
        .relations
        .iter()
        .filter_map(|edge| serialize_relation(edge, &names))
        .collect();
    if !relations.is_empty() {
        output.push_str("\nrel {\n");
        for line in relations {
            output.push_str("    ");
            output.push_str(&line);
            output.push('\n');
        }
        output.push_str("}\n");
    }

    output
}

fn serialize_class(output: &mut String, class: &ClassEntity, names: &HashMap<&str, &str>) {
    output.push_str("class ");
    output.push_str(&quote(&class.name));
    if let Some((a, b)) = class.owners() {
        let owner = |id: &str| quote(names.get(id).copied().unwrap_or(id));
        output.push_str(&format!(" associates {}, {}", owner(a), owner(b)));
    }

    if class.attributes.is_empty() {
        output.push_str(" { }\n");
        return;
    }
    output.push_str(" {\n");
    for attribute in &class.attributes {
        serialize_attribute(output, attribute);
    }
    output.push_str("}\n");
}

fn serialize_attribute(output: &mut String, attribute: &Attribute) {
    output.push_str("    ");
    if attribute.visibility != Visibility::Private {
        output.push_str(attribute.visibility.as_str());
        output.push(' ');
    }
    output.push_str(&quote(&attribute.name));
    output.push(' ');
    output.push_str(attribute.primitive_type.as_str());
    output.push('\n');
}

fn serialize_relation(edge: &RelationEdge, names: &HashMap<&str, &str>) -> Option<String> {
    let source = names.get(edge.source_id.as_str())?;
    let target = names.get(edge.target_id.as_str())?;
    let (source_multiplicity, target_multiplicity) = relation::multiplicities(edge);
    let mut line = format!(
        "{} {} -- {} {}",
        quote(source),
        source_multiplicity.as_str(),
        target_multiplicity.as_str(),
        quote(target)
    );
    if edge.kind != RelationKind::Association {
        line.push_str(" : ");
        line.push_str(edge.kind.as_str());
    }
    Some(line)
}

fn is_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_') && !KEYWORDS.contains(&name)
}

/// Bare identifier when the lexer reads it back as one, quoted otherwise.
fn quote(name: &str) -> String {
    if is_ident(name) {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Multiplicity, Primitive};

    #[test]
    fn test_serialize_class() {
        let mut visible = Attribute::new("nombre", Primitive::String);
        visible.visibility = Visibility::Public;
        let diagram = Diagram {
            classes: vec![ClassEntity::regular(
                "1",
                "Persona",
                vec![visible, Attribute::new("edad", Primitive::Integer)],
            )],
            relations: vec![],
        };
        assert_eq!(
            serialize(&diagram),
            "class Persona {\n    public nombre String\n    edad Integer\n}\n"
        );
    }

    #[test]
    fn test_serialize_relations_by_name() {
        let diagram = Diagram {
            classes: vec![
                ClassEntity::regular("1", "Proyecto", vec![]),
                ClassEntity::regular("2", "Detalle Venta", vec![]),
            ],
            relations: vec![
                RelationEdge::new("e1", "1", "2", RelationKind::Composition)
                    .with_multiplicity(Multiplicity::One, Multiplicity::Many),
                RelationEdge::new("e2", "1", "2", RelationKind::Association),
                RelationEdge::new("e3", "1", "9", RelationKind::Association),
            ],
        };
        let out = serialize(&diagram);
        assert!(out.contains("class \"Detalle Venta\" { }"));
        assert!(out.contains("    Proyecto 1 -- * \"Detalle Venta\" : composition\n"));
        assert!(out.contains("    Proyecto 1 -- 1 \"Detalle Venta\"\n"));
        assert_eq!(out.matches(" -- ").count(), 2);
    }

    #[test]
    fn test_effective_multiplicities() {
        let diagram = Diagram {
            classes: vec![
                ClassEntity::regular("1", "Pedido", vec![]),
                ClassEntity::regular("2", "Linea", vec![]),
            ],
            relations: vec![
                RelationEdge::new("e1", "1", "2", RelationKind::Composition)
                    .with_multiplicity(Multiplicity::Many, Multiplicity::One),
                RelationEdge::new("e2", "2", "1", RelationKind::Inheritance)
                    .with_multiplicity(Multiplicity::Many, Multiplicity::Many),
            ],
        };
        let out = serialize(&diagram);
        assert!(out.contains("    Pedido 1 -- * Linea : composition\n"));
        assert!(out.contains("    Linea 1 -- 1 Pedido : inheritance\n"));
    }

    #[test]
    fn test_keywords_are_quoted() {
        assert_eq!(quote("public"), "\"public\"");
        assert_eq!(quote("total"), "total");
        assert_eq!(quote("2fa"), "\"2fa\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn test_parses_back() {
        let source = r#"
            class Course { title String credits Integer }
            class "Student Record" { public name String private "class" Boolean }
            class Enrollment associates Course, "Student Record" { grade Float }
            rel {
                Course 1 -- * Enrollment
                "Student Record" 1 -- * Enrollment : aggregation
            }
        "#;
        let (diagram, diags) = Diagram::parse(source).unwrap();
        assert!(diags.is_empty());
        let text = serialize(&diagram);
        let (reparsed, _) = Diagram::parse(&text).unwrap();
        assert_eq!(reparsed, diagram);
    }
}
