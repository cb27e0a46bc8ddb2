/// Parsed class-diagram notation, before any naming or type resolution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source {
    pub classes: Vec<ClassDecl>,
    pub relations: Vec<RelationDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub attributes: Vec<AttributeDecl>,
    /// `associates A, B`: the class is the junction of a many-to-many pair.
    pub associates: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDecl {
    pub name: String,
    pub typ: String,
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationDecl {
    pub source: String,
    pub source_cardinality: Cardinality,
    pub target: String,
    pub target_cardinality: Cardinality,
    /// `: composition`, `: inheritance`, ... Absent means association.
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cardinality {
    One,        // 1
    ZeroOrOne,  // 0..1
    Many,       // *
    OneOrMore,  // 1..*
}

impl Cardinality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::One => "1",
            Self::ZeroOrOne => "0..1",
            Self::Many => "*",
            Self::OneOrMore => "1..*",
        }
    }
}
