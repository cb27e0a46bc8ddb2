use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{ClassEntity, ClassKind, Diagram, Multiplicity, RelationEdge, RelationKind};
use crate::rules::DetectionRules;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    NotAssociative,
    Associative { owner_a: String, owner_b: String },
}

/// Structural verdict for a class of a live diagram. `Err` carries the reason
/// a declared owner pair is unusable.
pub fn structural(class: &ClassEntity, diagram: &Diagram) -> Result<Verdict, String> {
    let Some((a, b)) = class.owners() else {
        return Ok(Verdict::NotAssociative);
    };
    match pair_problem(class, a, b, diagram) {
        Some(problem) => Err(problem),
        None => Ok(Verdict::Associative {
            owner_a: a.to_string(),
            owner_b: b.to_string(),
        }),
    }
}

fn pair_problem(class: &ClassEntity, a: &str, b: &str, diagram: &Diagram) -> Option<String> {
    if a == b {
        return Some(format!("both owners are {}", a));
    }
    for owner in [a, b] {
        if owner == class.id {
            return Some("a junction cannot own itself".to_string());
        }
        match diagram.class(owner) {
            None => return Some(format!("owner {} is not in the diagram", owner)),
            Some(c) if c.is_associative() => {
                return Some(format!("owner {} is itself associative", c.name));
            }
            Some(_) => {}
        }
    }
    None
}

/// Build the normalized copy of a live diagram.
///
/// - associative classes with an unusable pair become regular classes
/// - edges with a missing endpoint or joining a class to itself are dropped
/// - each owner is joined to its junction by exactly one `owner 1 -> * junction`
///   association, synthesized when the diagram has none
/// - any edge directly between the two owners of a junction is dropped
pub fn normalize(diagram: &Diagram, diagnostics: &mut Diagnostics) -> Diagram {
    let mut classes = diagram.classes.clone();
    let mut junctions: Vec<(String, String, String)> = Vec::new();
    for class in classes.iter_mut() {
        match structural(class, diagram) {
            Ok(Verdict::Associative { owner_a, owner_b }) => {
                junctions.push((class.id.clone(), owner_a, owner_b));
            }
            Ok(Verdict::NotAssociative) => {}
            Err(problem) => {
                diagnostics.push(DiagnosticKind::InvalidAssociative, &class.name, problem);
                class.kind = ClassKind::Regular;
            }
        }
    }

    let mut relations = Vec::with_capacity(diagram.relations.len());
    let mut wired: HashSet<(String, String)> = HashSet::new();

    for edge in &diagram.relations {
        if !diagram.contains(&edge.source_id) || !diagram.contains(&edge.target_id) {
            diagnostics.push(
                DiagnosticKind::StaleReference,
                &edge.id,
                format!("{} -> {} references a missing class", edge.source_id, edge.target_id),
            );
            continue;
        }
        if edge.source_id == edge.target_id {
            diagnostics.push(
                DiagnosticKind::StaleReference,
                &edge.id,
                format!("self edge on {}", edge.source_id),
            );
            continue;
        }

        let owner_link = junctions.iter().find_map(|(j, a, b)| {
            if edge.joins(a, j) {
                Some((j, a))
            } else if edge.joins(b, j) {
                Some((j, b))
            } else {
                None
            }
        });
        if let Some((junction, owner)) = owner_link {
            if wired.insert((junction.clone(), owner.clone())) {
                relations.push(owner_edge(edge.id.clone(), owner, junction));
            } else {
                debug!(edge = %edge.id, junction = %junction, "dropping duplicate owner edge");
            }
            continue;
        }

        if junctions.iter().any(|(_, a, b)| edge.joins(a, b)) {
            debug!(edge = %edge.id, "dropping direct edge between junction owners");
            continue;
        }

        relations.push(edge.clone());
    }

    for (junction, a, b) in &junctions {
        for owner in [a, b] {
            if wired.insert((junction.clone(), owner.clone())) {
                debug!(junction = %junction, owner = %owner, "synthesizing owner edge");
                relations.push(owner_edge(format!("{}_{}", junction, owner), owner, junction));
            }
        }
    }

    Diagram { classes, relations }
}

fn owner_edge(id: String, owner: &str, junction: &str) -> RelationEdge {
    RelationEdge::new(id, owner, junction, RelationKind::Association)
        .with_multiplicity(Multiplicity::One, Multiplicity::Many)
}

/// A relationship between two classes known only by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
    pub multiplicity: Option<String>,
    /// Synthesized by single-edge repair rather than supplied.
    pub inferred: bool,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            multiplicity: None,
            inferred: false,
        }
    }

    pub fn touches(&self, name: &str) -> bool {
        self.source == name || self.target == name
    }

    pub fn other(&self, name: &str) -> Option<&str> {
        if self.source == name {
            Some(&self.target)
        } else if self.target == name {
            Some(&self.source)
        } else {
            None
        }
    }

    fn pair_key(&self) -> (String, String) {
        if self.source <= self.target {
            (self.source.clone(), self.target.clone())
        } else {
            (self.target.clone(), self.source.clone())
        }
    }
}

/// Links of one heuristic run, deduplicated by unordered class pair.
#[derive(Debug, Default)]
pub struct LinkSet {
    links: Vec<Link>,
    seen: HashSet<(String, String)>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the unordered pair is already linked. First wins.
    pub fn insert(&mut self, link: Link) -> bool {
        if !self.seen.insert(link.pair_key()) {
            debug!(source = %link.source, target = %link.target, "dropping duplicate link");
            return false;
        }
        self.links.push(link);
        true
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn into_links(self) -> Vec<Link> {
        self.links
    }

    /// Distinct classes linked to `name`, in order of first appearance.
    pub fn connections(&self, name: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for other in self.links.iter().filter_map(|l| l.other(name)) {
            if !out.contains(&other) {
                out.push(other);
            }
        }
        out
    }
}

impl FromIterator<Link> for LinkSet {
    fn from_iter<I: IntoIterator<Item = Link>>(iter: I) -> Self {
        let mut set = Self::new();
        for link in iter {
            set.insert(link);
        }
        set
    }
}

/// Give junction-named classes with a single connection their missing
/// second owner: the best entity-stem match, else the most referenced class.
pub fn repair_single_links(
    classes: &[String],
    links: &mut LinkSet,
    rules: &DetectionRules,
    diagnostics: &mut Diagnostics,
) {
    for name in classes {
        if !rules.is_junction_name(name) {
            continue;
        }
        let connected = match links.connections(name).as_slice() {
            [only] => only.to_string(),
            _ => continue,
        };

        let eligible = |c: &&String| {
            c.as_str() != name && c.as_str() != connected && !rules.is_junction_name(c)
        };

        let by_stem = classes
            .iter()
            .filter(eligible)
            .enumerate()
            .filter_map(|(i, c)| rules.stem_rank(c).map(|rank| (rank, i, c)))
            .min()
            .map(|(_, _, c)| c.clone());

        let inferred = by_stem.or_else(|| most_referenced(classes, links.links(), name, &eligible));

        match inferred {
            Some(owner) => {
                debug!(junction = %name, owner = %owner, "inferred second owner");
                links.insert(Link {
                    source: owner,
                    target: name.clone(),
                    kind: RelationKind::Association,
                    multiplicity: Some("1..*".to_string()),
                    inferred: true,
                });
            }
            None => diagnostics.push(
                DiagnosticKind::InferenceGap,
                name,
                format!("only linked to {}, no second owner found", connected),
            ),
        }
    }
}

fn most_referenced(
    classes: &[String],
    links: &[Link],
    junction: &str,
    eligible: &impl Fn(&&String) -> bool,
) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for link in links.iter().filter(|l| !l.touches(junction)) {
        *counts.entry(link.source.as_str()).or_default() += 1;
        *counts.entry(link.target.as_str()).or_default() += 1;
    }

    let mut best: Option<(&String, usize)> = None;
    for class in classes.iter().filter(eligible) {
        let count = counts.get(class.as_str()).copied().unwrap_or(0);
        if count > 0 && best.is_none_or(|(_, n)| count > n) {
            best = Some((class, count));
        }
    }
    best.map(|(c, _)| c.clone())
}

/// Heuristic verdict: junction-like name, exactly two distinct neighbours,
/// neither of them junction-like.
pub fn heuristic(candidate: &str, links: &LinkSet, rules: &DetectionRules) -> Verdict {
    if !rules.is_junction_name(candidate) {
        return Verdict::NotAssociative;
    }
    match links.connections(candidate).as_slice() {
        [a, b] if !rules.is_junction_name(a) && !rules.is_junction_name(b) => {
            Verdict::Associative {
                owner_a: a.to_string(),
                owner_b: b.to_string(),
            }
        }
        [_, _] => {
            debug!(class = %candidate, "neighbour is itself junction-like, not promoting");
            Verdict::NotAssociative
        }
        other => {
            debug!(class = %candidate, connections = other.len(), "not promoting");
            Verdict::NotAssociative
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Diagram;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn assoc(source: &str, target: &str) -> Link {
        Link::new(source, target, RelationKind::Association)
    }

    #[test]
    fn test_bidirectional_links_collapse() {
        let set: LinkSet = [assoc("A", "J"), assoc("J", "A"), assoc("B", "J")].into_iter().collect();
        assert_eq!(set.links().len(), 2);
        assert_eq!(set.connections("J"), vec!["A", "B"]);
    }

    #[test]
    fn test_heuristic_promotes_enrollment() {
        let rules = DetectionRules::default();
        let set: LinkSet = [assoc("Course", "Enrollment"), assoc("Student", "Enrollment")]
            .into_iter()
            .collect();
        assert_eq!(
            heuristic("Enrollment", &set, &rules),
            Verdict::Associative {
                owner_a: "Course".into(),
                owner_b: "Student".into()
            }
        );
        assert_eq!(heuristic("Course", &set, &rules), Verdict::NotAssociative);
    }

    #[test]
    fn test_heuristic_rejects_junction_chains() {
        let rules = DetectionRules::default();
        let set: LinkSet = [assoc("Venta", "DetalleVenta"), assoc("DetalleVenta", "DetalleEnvio")]
            .into_iter()
            .collect();
        assert_eq!(heuristic("DetalleVenta", &set, &rules), Verdict::NotAssociative);
    }

    #[test]
    fn test_heuristic_rejects_three_neighbours() {
        let rules = DetectionRules::default();
        let set: LinkSet = [assoc("A", "Inscripcion"), assoc("B", "Inscripcion"), assoc("C", "Inscripcion")]
            .into_iter()
            .collect();
        assert_eq!(heuristic("Inscripcion", &set, &rules), Verdict::NotAssociative);
    }

    #[test]
    fn test_repair_by_stem() {
        let rules = DetectionRules::default();
        let classes = names(&["Venta", "Cliente", "Producto", "DetalleVenta"]);
        let mut set: LinkSet = [assoc("Cliente", "Venta"), assoc("Venta", "DetalleVenta")]
            .into_iter()
            .collect();
        let mut diags = Diagnostics::new();
        repair_single_links(&classes, &mut set, &rules, &mut diags);
        assert!(diags.is_empty());
        let inferred = set.links().iter().find(|l| l.inferred).unwrap();
        assert_eq!(inferred.source, "Producto");
        assert_eq!(inferred.target, "DetalleVenta");
        assert_eq!(inferred.multiplicity.as_deref(), Some("1..*"));
        assert_eq!(
            heuristic("DetalleVenta", &set, &rules),
            Verdict::Associative {
                owner_a: "Venta".into(),
                owner_b: "Producto".into()
            }
        );
    }

    #[test]
    fn test_repair_falls_back_to_most_referenced() {
        let rules = DetectionRules::default();
        let classes = names(&["Venta", "Sucursal", "Almacen", "DetalleVenta"]);
        let mut set: LinkSet = [
            assoc("Venta", "DetalleVenta"),
            assoc("Sucursal", "Venta"),
            assoc("Almacen", "Sucursal"),
        ]
        .into_iter()
        .collect();
        let mut diags = Diagnostics::new();
        repair_single_links(&classes, &mut set, &rules, &mut diags);
        assert_eq!(set.connections("DetalleVenta"), vec!["Venta", "Sucursal"]);
    }

    #[test]
    fn test_repair_gap_is_reported() {
        let rules = DetectionRules::default();
        let classes = names(&["Venta", "DetalleVenta"]);
        let mut set: LinkSet = [assoc("Venta", "DetalleVenta")].into_iter().collect();
        let mut diags = Diagnostics::new();
        repair_single_links(&classes, &mut set, &rules, &mut diags);
        assert_eq!(diags.count(DiagnosticKind::InferenceGap), 1);
        assert_eq!(heuristic("DetalleVenta", &set, &rules), Verdict::NotAssociative);
    }

    fn live_diagram() -> Diagram {
        Diagram {
            classes: vec![
                ClassEntity::regular("c", "Course", vec![]),
                ClassEntity::regular("s", "Student", vec![]),
                ClassEntity::associative("e", "Enrollment", vec![], "c", "s"),
            ],
            relations: vec![
                RelationEdge::new("r1", "e", "c", RelationKind::Aggregation),
                RelationEdge::new("r2", "c", "s", RelationKind::Association),
                RelationEdge::new("r3", "c", "e", RelationKind::Association),
            ],
        }
    }

    #[test]
    fn test_normalize_rewires_owner_edges() {
        let input = live_diagram();
        let mut diags = Diagnostics::new();
        let out = normalize(&input, &mut diags);

        assert_eq!(out.relations.len(), 2);
        let first = &out.relations[0];
        assert_eq!((first.source_id.as_str(), first.target_id.as_str()), ("c", "e"));
        assert_eq!(first.kind, RelationKind::Association);
        assert_eq!(first.target_multiplicity, Multiplicity::Many);
        let synth = &out.relations[1];
        assert_eq!((synth.source_id.as_str(), synth.target_id.as_str()), ("s", "e"));
        assert!(!out.relations.iter().any(|r| r.joins("c", "s")));
        // input untouched
        assert_eq!(input, live_diagram());
    }

    #[test]
    fn test_normalize_demotes_invalid_pair() {
        let diagram = Diagram {
            classes: vec![
                ClassEntity::regular("a", "A", vec![]),
                ClassEntity::associative("j", "J", vec![], "a", "gone"),
            ],
            relations: vec![RelationEdge::new("r1", "a", "gone", RelationKind::Association)],
        };
        let mut diags = Diagnostics::new();
        let out = normalize(&diagram, &mut diags);
        assert!(!out.classes[1].is_associative());
        assert!(out.relations.is_empty());
        assert_eq!(diags.count(DiagnosticKind::InvalidAssociative), 1);
        assert_eq!(diags.count(DiagnosticKind::StaleReference), 1);
        assert_eq!(
            structural(&diagram.classes[1], &diagram),
            Err("owner gone is not in the diagram".to_string())
        );
        assert_eq!(structural(&out.classes[1], &out), Ok(Verdict::NotAssociative));
        let live = live_diagram();
        assert_eq!(
            structural(&live.classes[2], &live),
            Ok(Verdict::Associative {
                owner_a: "c".to_string(),
                owner_b: "s".to_string(),
            })
        );
    }
}
