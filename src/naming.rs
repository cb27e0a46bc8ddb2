/// Fold the accented latin letters that show up in diagram names.
pub fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'Ñ' => 'N',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Lowercased, accent-folded form used for all name pattern matching.
pub fn normalize(s: &str) -> String {
    fold_accents(s.trim()).to_lowercase()
}

/// Sanitize a class name into an ASCII PascalCase type name.
///
/// Word boundaries (spaces, dashes, underscores) start a new capitalized
/// segment; the casing inside a segment is kept so `DetalleVenta` survives
/// unchanged. Returns `None` when nothing identifier-like is left.
pub fn type_name(raw: &str) -> Option<String> {
    let folded = fold_accents(raw);
    let mut out = String::new();
    for segment in folded.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if out.is_empty() {
        return None;
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'C');
    }
    Some(out)
}

/// Sanitize an attribute name into an ASCII lowerCamel member name.
pub fn member_name(raw: &str) -> Option<String> {
    let pascal = type_name(raw)?;
    let member = lower_first(&pascal);
    if member.starts_with(|c: char| c.is_ascii_digit()) {
        return Some(format!("f{}", member));
    }
    Some(member)
}

/// Java and Dart keywords and literals, plus members every generated model
/// already has.
const RESERVED_MEMBERS: &[&str] = &[
    "abstract", "assert", "await", "boolean", "break", "byte", "case", "catch", "char", "class",
    "const", "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "goto", "if", "implements", "import", "in", "instanceof", "int",
    "interface", "is", "long", "native", "new", "null", "package", "private", "protected",
    "public", "record", "rethrow", "return", "short", "static", "strictfp", "super", "switch",
    "synchronized", "this", "throw", "throws", "transient", "true", "try", "var", "void",
    "volatile", "while", "with", "yield", "hashCode", "runtimeType", "toString", "fromJson",
    "toJson",
];

/// Types the generated server and client refer to by simple name.
const RESERVED_TYPES: &[&str] = &[
    // server
    "Autowired", "Boolean", "Column", "Data", "Double", "Entity", "GeneratedValue",
    "GenerationType", "HttpStatus", "Id", "Integer", "JpaRepository", "List", "LocalDate", "Long",
    "Object", "Repository", "ResponseEntity", "Service", "SpringApplication",
    "SpringBootApplication", "String", "Table",
    // client
    "AlertDialog", "ApiConfig", "App", "AppBar", "AppDrawer", "Card", "Center", "Colors",
    "DateTime", "Divider", "Drawer", "Duration", "Exception", "Form", "Future", "HomeScreen",
    "Icon", "Icons", "Map", "MapEntry", "Navigator", "Padding", "Row", "Scaffold", "State", "Text",
    "Theme", "Uri", "Widget",
];

pub fn is_reserved_member(name: &str) -> bool {
    RESERVED_MEMBERS.contains(&name)
}

pub fn is_reserved_type(name: &str) -> bool {
    RESERVED_TYPES.contains(&name)
}

/// `class` -> `class_`, left alone when not reserved.
pub fn escape_member(name: String) -> String {
    if is_reserved_member(&name) {
        format!("{}_", name)
    } else {
        name
    }
}

/// `List` -> `ListEntity`, left alone when not reserved.
pub fn escape_type(name: String) -> String {
    if is_reserved_type(&name) {
        format!("{}Entity", name)
    } else {
        name
    }
}

pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `Course` -> `courseId`.
pub fn foreign_key_field(type_name: &str) -> String {
    format!("{}Id", lower_first(type_name))
}

/// `Enrollment`, `Course` -> `FK_ENROLLMENT_COURSE`.
pub fn constraint_name(holder: &str, referenced: &str) -> String {
    format!(
        "FK_{}_{}",
        holder.to_uppercase(),
        referenced.to_uppercase()
    )
}

/// Table name and file stem: the lowercased type name.
pub fn table_name(type_name: &str) -> String {
    type_name.to_lowercase()
}

/// Conventional pluralized resource path segment: `Course` -> `courses`.
pub fn resource_path(type_name: &str) -> String {
    format!("{}s", type_name.to_lowercase())
}

/// Strip a trailing `Id` to get a human label for a foreign key column.
pub fn foreign_key_label(field_name: &str) -> String {
    let base = field_name.strip_suffix("Id").unwrap_or(field_name);
    upper_first(base)
}
