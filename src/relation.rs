use crate::model::{Multiplicity, RelationEdge, RelationKind};
use crate::naming;

/// Foreign-key placement for one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership<'a> {
    /// Class that stores the reference column.
    pub holder_id: &'a str,
    /// Class the column points at.
    pub referenced_id: &'a str,
    pub on_delete_cascade: bool,
}

/// Classify an edge. `None` for kinds with no schema effect.
pub fn classify(edge: &RelationEdge) -> Option<Ownership<'_>> {
    match edge.kind {
        // child -> parent: the child row references its parent
        RelationKind::Inheritance => Some(Ownership {
            holder_id: &edge.source_id,
            referenced_id: &edge.target_id,
            on_delete_cascade: true,
        }),
        RelationKind::Association | RelationKind::Composition | RelationKind::Aggregation => {
            Some(Ownership {
                holder_id: &edge.target_id,
                referenced_id: &edge.source_id,
                on_delete_cascade: cascades(edge.kind),
            })
        }
        RelationKind::Dependency => None,
    }
}

pub fn cascades(kind: RelationKind) -> bool {
    match kind {
        RelationKind::Inheritance | RelationKind::Composition | RelationKind::Association => true,
        RelationKind::Aggregation | RelationKind::Dependency => false,
    }
}

/// Effective `(source, target)` multiplicities. Only associations carry
/// declared markers; the other kinds have fixed ones.
pub fn multiplicities(edge: &RelationEdge) -> (Multiplicity, Multiplicity) {
    match edge.kind {
        RelationKind::Association => (edge.source_multiplicity, edge.target_multiplicity),
        RelationKind::Composition | RelationKind::Aggregation => {
            (Multiplicity::One, Multiplicity::Many)
        }
        RelationKind::Inheritance | RelationKind::Dependency => {
            (Multiplicity::One, Multiplicity::One)
        }
    }
}

/// Map a free-form relation label from an external classifier.
pub fn kind_from_label(label: &str) -> RelationKind {
    let label = naming::normalize(label);
    if let Some(kind) = RelationKind::from_str(&label) {
        return kind;
    }
    let any = |needles: &[&str]| needles.iter().any(|n| label.contains(n));
    if any(&["inherit", "extends", "is-a", "is_a", "generaliz", "hered"]) {
        RelationKind::Inheritance
    } else if any(&["compos", "part-of", "part_of", "contains"]) {
        RelationKind::Composition
    } else if any(&["aggreg", "agreg", "has-a", "has_a", "whole-part"]) {
        RelationKind::Aggregation
    } else if any(&["depend", "uses"]) {
        RelationKind::Dependency
    } else {
        RelationKind::Association
    }
}

/// Map a free-form multiplicity marker to `(source, target)`.
pub fn multiplicity_from_label(label: Option<&str>) -> (Multiplicity, Multiplicity) {
    let Some(label) = label else {
        return (Multiplicity::One, Multiplicity::One);
    };
    let label = label.trim().to_lowercase();
    let many = label.contains('*')
        || label.contains("many")
        || label == "n"
        || label.ends_with("..n");
    if many {
        (Multiplicity::One, Multiplicity::Many)
    } else {
        (Multiplicity::One, Multiplicity::One)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(kind: RelationKind) -> RelationEdge {
        RelationEdge::new("e", "s", "t", kind)
    }

    #[test]
    fn test_inheritance_source_holds_key() {
        let e = edge(RelationKind::Inheritance);
        let own = classify(&e).unwrap();
        assert_eq!(own.holder_id, "s");
        assert_eq!(own.referenced_id, "t");
        assert!(own.on_delete_cascade);
    }

    #[test]
    fn test_target_holds_key_for_structural_kinds() {
        for (kind, cascade) in [
            (RelationKind::Association, true),
            (RelationKind::Composition, true),
            (RelationKind::Aggregation, false),
        ] {
            let e = edge(kind);
            let own = classify(&e).unwrap();
            assert_eq!(own.holder_id, "t");
            assert_eq!(own.referenced_id, "s");
            assert_eq!(own.on_delete_cascade, cascade, "{:?}", kind);
        }
    }

    #[test]
    fn test_dependency_has_no_key() {
        assert_eq!(classify(&edge(RelationKind::Dependency)), None);
    }

    #[test]
    fn test_fixed_multiplicities() {
        let e = edge(RelationKind::Composition).with_multiplicity(Multiplicity::Many, Multiplicity::One);
        assert_eq!(multiplicities(&e), (Multiplicity::One, Multiplicity::Many));
        let e = edge(RelationKind::Association).with_multiplicity(Multiplicity::Many, Multiplicity::One);
        assert_eq!(multiplicities(&e), (Multiplicity::Many, Multiplicity::One));
    }

    #[test]
    fn test_kind_from_label() {
        assert_eq!(kind_from_label("ASSOCIATION"), RelationKind::Association);
        assert_eq!(kind_from_label("extends"), RelationKind::Inheritance);
        assert_eq!(kind_from_label("Herencia"), RelationKind::Inheritance);
        assert_eq!(kind_from_label("part-of"), RelationKind::Composition);
        assert_eq!(kind_from_label("has-a"), RelationKind::Aggregation);
        assert_eq!(kind_from_label("uses"), RelationKind::Dependency);
        assert_eq!(kind_from_label("links"), RelationKind::Association);
    }

    #[test]
    fn test_multiplicity_from_label() {
        use Multiplicity::*;
        assert_eq!(multiplicity_from_label(None), (One, One));
        assert_eq!(multiplicity_from_label(Some("1")), (One, One));
        assert_eq!(multiplicity_from_label(Some("one-to-one")), (One, One));
        assert_eq!(multiplicity_from_label(Some("1..*")), (One, Many));
        assert_eq!(multiplicity_from_label(Some("one-to-many")), (One, Many));
        assert_eq!(multiplicity_from_label(Some("0..n")), (One, Many));
    }
}
