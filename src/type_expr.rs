use std::fmt;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Wrapper {
    List,
    Optional,
    Union,
    Dict,
    Literal,
    /// Renders the children comma-joined without a wrapper. Internal use only.
    Bare,
}

impl Wrapper {
    fn prefix(&self) -> Option<&'static str> {
        match self {
            Wrapper::List => Some("List"),
            Wrapper::Optional => Some("Optional"),
            Wrapper::Union => Some("Union"),
            Wrapper::Dict => Some("Dict"),
            Wrapper::Literal => Some("Literal"),
            Wrapper::Bare => None,
        }
    }
}

/// A python type annotation, built up by the type mapper and rendered straight to text.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum TypeExpr {
    /// A builtin or an already resolved model name.
    Name(String),
    /// A model name that must be written as a forward (string) reference.
    Forward(String),
    /// A python literal, already repr'd.
    Value(String),
    Composite {
        wrapper: Wrapper,
        children: Vec<TypeExpr>,
    },
}

impl TypeExpr {
    pub fn any() -> Self {
        Self::name("Any")
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn list(inner: TypeExpr) -> Self {
        Self::Composite {
            wrapper: Wrapper::List,
            children: vec![inner],
        }
    }

    pub fn dict(value: TypeExpr) -> Self {
        Self::Composite {
            wrapper: Wrapper::Dict,
            children: vec![Self::name("str"), value],
        }
    }

    pub fn literal(values: Vec<String>) -> Self {
        Self::Composite {
            wrapper: Wrapper::Literal,
            children: values.into_iter().map(TypeExpr::Value).collect(),
        }
    }

    /// Wraps in `Optional[...]` unless it already is one.
    pub fn optional(self) -> Self {
        if self.is_optional() {
            return self;
        }

        Self::Composite {
            wrapper: Wrapper::Optional,
            children: vec![self],
        }
    }

    /// A single child collapses to itself, more become a `Union[...]` in the given order.
    pub fn union(mut children: Vec<TypeExpr>) -> Self {
        if children.len() == 1 {
            return children.remove(0);
        }

        Self::Composite {
            wrapper: Wrapper::Union,
            children,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            TypeExpr::Composite {
                wrapper: Wrapper::Optional,
                ..
            }
        )
    }

    pub fn is_any(&self) -> bool {
        matches!(self, TypeExpr::Name(n) if n == "Any")
    }

    /// Replaces forward references with plain names, for places where the target is imported up front.
    pub fn into_eager(self) -> Self {
        match self {
            TypeExpr::Forward(n) => TypeExpr::Name(n),
            TypeExpr::Composite { wrapper, children } => TypeExpr::Composite {
                wrapper,
                children: children.into_iter().map(TypeExpr::into_eager).collect(),
            },
            other => other,
        }
    }

    /// Names from the `typing`/`datetime` modules this expression needs imported.
    pub fn typing_names(&self, out: &mut Vec<&'static str>) {
        match self {
            TypeExpr::Name(n) => match n.as_str() {
                "Any" => push_unique(out, "Any"),
                "datetime" => push_unique(out, "datetime"),
                "date" => push_unique(out, "date"),
                _ => {}
            },
            TypeExpr::Forward(_) | TypeExpr::Value(_) => {}
            TypeExpr::Composite { wrapper, children } => {
                if let Some(prefix) = wrapper.prefix() {
                    push_unique(out, prefix);
                }
                for child in children {
                    child.typing_names(out);
                }
            }
        }
    }
}

fn push_unique(out: &mut Vec<&'static str>, name: &'static str) {
    if !out.contains(&name) {
        out.push(name);
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Name(n) | TypeExpr::Value(n) => write!(f, "{}", n),
            TypeExpr::Forward(n) => write!(f, "\"{}\"", n),
            TypeExpr::Composite { wrapper, children } => {
                if let Some(prefix) = wrapper.prefix() {
                    write!(f, "{}[", prefix)?;
                }

                let len = children.len();
                for (index, child) in children.iter().enumerate() {
                    write!(f, "{}", child)?;
                    if index + 1 < len {
                        write!(f, ", ")?;
                    }
                }

                if wrapper.prefix().is_some() {
                    write!(f, "]")?;
                }

                Ok(())
            }
        }
    }
}
