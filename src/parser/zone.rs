use crate::project::FunctionDecl;
use std::collections::BTreeSet;

/// A tag derived group of endpoints and the models classified into it.
#[derive(Debug, Clone)]
pub struct Zone {
    pub name: String,
    pub endpoint_methods: Vec<(String, FunctionDecl)>,
    pub model_names: BTreeSet<String>,
}

impl Zone {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            endpoint_methods: vec![],
            model_names: BTreeSet::new(),
        }
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.endpoint_methods.iter().any(|(n, _)| n == name)
    }

    /// `name`, or `name_2`, `name_3`... when the zone already has a method called that.
    pub fn unique_method_name(&self, name: &str) -> String {
        if !self.has_method(name) {
            return name.to_owned();
        }

        (2..)
            .map(|i| format!("{}_{}", name, i))
            .find(|candidate| !self.has_method(candidate))
            .unwrap_or_else(|| name.to_owned())
    }

    pub fn add_method(&mut self, method: FunctionDecl) {
        self.endpoint_methods.push((method.name.clone(), method));
    }

    pub fn is_empty(&self) -> bool {
        self.endpoint_methods.is_empty()
    }
}

/// Zones in the order they were first seen.
#[derive(Debug, Default)]
pub struct Zones {
    zones: Vec<Zone>,
}

impl Zones {
    pub fn new() -> Self {
        Self::default()
    }

    /// The zone called `name`, created on first use.
    pub fn entry(&mut self, name: &str) -> &mut Zone {
        let position = match self.zones.iter().position(|z| z.name == name) {
            Some(p) => p,
            None => {
                self.zones.push(Zone::new(name));
                self.zones.len() - 1
            }
        };

        &mut self.zones[position]
    }

    pub fn get(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Drops every zone that ended up without endpoints and hands them back.
    pub fn prune(&mut self) -> Vec<Zone> {
        let (kept, pruned) = std::mem::take(&mut self.zones)
            .into_iter()
            .partition(|z| !z.is_empty());

        self.zones = kept;
        pruned
    }
}
