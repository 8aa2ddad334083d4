/// The generated client as an in-memory file tree. Nothing touches the disk until it is saved.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub files: Vec<SourceFile>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: vec![],
        }
    }

    pub fn add_file(&mut self, file: SourceFile) {
        self.files.push(file);
    }

    pub fn file(&self, file_name: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.file_name == file_name)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.file_name.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the project root, using `/` separators.
    pub file_name: String,
    pub declarations: Vec<Declaration>,
}

impl SourceFile {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            declarations: vec![],
        }
    }

    pub fn push(&mut self, declaration: Declaration) {
        self.declarations.push(declaration);
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Class(c) => Some(c),
            _ => None,
        })
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone)]
pub enum Declaration {
    /// Verbatim code, e.g. imports or a whole template file.
    Raw(String),
    Class(ClassDecl),
    Function(FunctionDecl),
}

#[derive(Debug, Clone, Default)]
pub struct ClassDecl {
    pub name: String,
    pub bases: Vec<String>,
    pub docstring: Option<String>,
    pub body: Vec<Declaration>,
}

impl ClassDecl {
    pub fn methods(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.body.iter().filter_map(|d| match d {
            Declaration::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn method(&self, name: &str) -> Option<&FunctionDecl> {
        self.methods().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionDecl {
    pub name: String,
    pub is_async: bool,
    pub decorators: Vec<String>,
    pub params: Vec<ParamDecl>,
    pub returns: Option<String>,
    pub body: Vec<String>,
}

impl FunctionDecl {
    pub fn param(&self, name: &str) -> Option<&ParamDecl> {
        self.params.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    pub annotation: Option<String>,
    pub default: Option<String>,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
        }
    }

    pub fn annotated(name: impl Into<String>, annotation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: Some(annotation.into()),
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}
