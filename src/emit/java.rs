use super::code::{Block, Node, Renderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub annotations: Vec<String>,
    /// Full declaration modifiers, e.g. `private` or `private final`.
    pub modifiers: String,
    pub ty: String,
    pub name: String,
}

impl Field {
    pub fn private(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            annotations: Vec::new(),
            modifiers: "private".to_string(),
            ty: ty.into(),
            name: name.into(),
        }
    }

    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub annotations: Vec<String>,
    /// Everything before the body, e.g. `public List<Course> findAll()`.
    pub signature: String,
    pub body: Vec<Node>,
}

impl Method {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            annotations: Vec::new(),
            signature: signature.into(),
            body: Vec::new(),
        }
    }

    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn line(mut self, s: impl Into<String>) -> Self {
        self.body.push(Node::Line(s.into()));
        self
    }

    pub fn block(mut self, block: Block) -> Self {
        self.body.push(Node::Block(block));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub annotations: Vec<String>,
    pub kind: TypeKind,
    pub name: String,
    pub extends: Option<String>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
}

impl TypeDecl {
    pub fn new(kind: TypeKind, name: impl Into<String>) -> Self {
        Self {
            annotations: Vec::new(),
            kind,
            name: name.into(),
            extends: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, signature_part: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.signature.contains(signature_part))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub package: String,
    pub imports: Vec<String>,
    pub ty: TypeDecl,
}

impl CompilationUnit {
    pub fn new(package: impl Into<String>, ty: TypeDecl) -> Self {
        Self {
            package: package.into(),
            imports: Vec::new(),
            ty,
        }
    }

    pub fn import(mut self, path: impl Into<String>) -> Self {
        self.imports.push(path.into());
        self
    }

    pub fn to_nodes(&self) -> Vec<Node> {
        let mut nodes = vec![Node::Line(format!("package {};", self.package)), Node::Blank];
        for import in &self.imports {
            nodes.push(Node::Line(format!("import {};", import)));
        }
        if !self.imports.is_empty() {
            nodes.push(Node::Blank);
        }

        for annotation in &self.ty.annotations {
            nodes.push(Node::Line(annotation.clone()));
        }
        let keyword = match self.ty.kind {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
        };
        let mut head = format!("public {} {}", keyword, self.ty.name);
        if let Some(parent) = &self.ty.extends {
            head.push_str(" extends ");
            head.push_str(parent);
        }

        if self.ty.fields.is_empty() && self.ty.methods.is_empty() {
            nodes.push(Node::Line(format!("{} {{}}", head)));
            return nodes;
        }

        let mut body = Block::new(format!("{} {{", head));
        for field in &self.ty.fields {
            body = body
                .lines(field.annotations.iter().cloned())
                .line(format!("{} {} {};", field.modifiers, field.ty, field.name));
        }
        for method in &self.ty.methods {
            body = body
                .blank()
                .lines(method.annotations.iter().cloned())
                .block(Block::new(format!("{} {{", method.signature)).nodes(method.body.iter().cloned()));
        }
        nodes.push(Node::Block(body));
        nodes
    }

    pub fn render(&self) -> String {
        Renderer::new("    ").render(&self.to_nodes())
    }
}
