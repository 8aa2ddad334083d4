use crate::type_expr::TypeExpr;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt::Write;

const TYPING_ORDER: &[&str] = &["Any", "Dict", "List", "Literal", "Optional", "Union"];

/// Collects what a generated python module has to import for the annotations it contains.
#[derive(Debug, Default)]
pub struct ImportTracker {
    typing: Vec<&'static str>,
    zones: BTreeSet<String>,
}

impl ImportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_type(&mut self, t: &TypeExpr) {
        t.typing_names(&mut self.typing);
        collect_zones(t, &mut self.zones);
    }

    /// Zones referenced through qualified names such as `orders.Order`.
    pub fn zones(&self) -> impl Iterator<Item = &str> {
        self.zones.iter().map(String::as_str)
    }

    /// `from datetime ...` and `from typing ...` lines, names sorted.
    pub fn write_imports(&self, file: &mut String) -> std::fmt::Result {
        let datetime = ["date", "datetime"]
            .into_iter()
            .filter(|n| self.typing.contains(n))
            .collect::<Vec<_>>();
        let typing = TYPING_ORDER
            .iter()
            .filter(|n| self.typing.contains(*n))
            .collect::<Vec<_>>();

        if !datetime.is_empty() {
            writeln!(file, "from datetime import {}", datetime.iter().join(", "))?;
        }

        if !typing.is_empty() {
            writeln!(file, "from typing import {}", typing.iter().join(", "))?;
        }

        Ok(())
    }
}

fn collect_zones(t: &TypeExpr, zones: &mut BTreeSet<String>) {
    match t {
        TypeExpr::Name(name) => {
            if let Some((zone, _)) = name.split_once('.') {
                zones.insert(zone.to_owned());
            }
        }
        TypeExpr::Composite { children, .. } => {
            for child in children {
                collect_zones(child, zones);
            }
        }
        TypeExpr::Forward(_) | TypeExpr::Value(_) => {}
    }
}
