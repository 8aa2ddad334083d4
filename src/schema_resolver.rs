use crate::string_tools::{capitalize, snake_case};
use log::debug;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Zone whose members are never qualified when referenced from elsewhere.
pub const COMMON_ZONE: &str = "common";

const INITIALISMS: &[&str] = &["HTTP", "API", "URL", "JSON", "XML", "HTML"];

/// Schema names that many tags define for themselves, e.g. every router having a `Read` model.
const GENERIC_NAMES: &[&str] = &["Read", "Create", "Update", "Delete", "Paginated"];

static TOKEN_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SchemaEntry {
    pub original_name: String,
    pub clean_name: String,
    pub zone: String,
    /// Module file the declaration lives in, `models/<zone>/<slug>.py`.
    pub slug: String,
}

#[derive(Debug, Default)]
pub struct SchemaResolver {
    entries: HashMap<String, SchemaEntry>,
    order: Vec<String>,
    by_zone_clean: HashMap<(String, String), String>,
}

impl SchemaResolver {
    pub fn new() -> SchemaResolver {
        Self::default()
    }

    /// Registers `original_name`, returning the stored entry.
    ///
    /// A different schema already holding the same clean name in the same zone forces a numeric
    /// suffix so that two declarations never share a module file.
    pub fn register(&mut self, original_name: &str, clean_name: &str, zone: &str) -> SchemaEntry {
        self.unregister(original_name);

        let mut candidate = clean_name.to_owned();
        let mut counter = 2;
        while self
            .by_zone_clean
            .contains_key(&(zone.to_owned(), candidate.clone()))
        {
            candidate = format!("{}{}", clean_name, counter);
            counter += 1;
        }

        if candidate != clean_name {
            debug!(
                "Schema {} renamed to {} to avoid a clash in zone {}",
                original_name, candidate, zone
            );
        }

        let entry = SchemaEntry {
            original_name: original_name.to_owned(),
            slug: snake_case(&candidate),
            clean_name: candidate,
            zone: zone.to_owned(),
        };

        self.by_zone_clean.insert(
            (entry.zone.clone(), entry.clean_name.clone()),
            original_name.to_owned(),
        );
        self.order.push(original_name.to_owned());
        self.entries.insert(original_name.to_owned(), entry.clone());

        entry
    }

    /// Registers `original_name` as another name for an existing declaration.
    pub fn register_alias(&mut self, original_name: &str, target: &SchemaEntry) -> SchemaEntry {
        self.unregister(original_name);

        let entry = SchemaEntry {
            original_name: original_name.to_owned(),
            ..target.clone()
        };

        self.order.push(original_name.to_owned());
        self.entries.insert(original_name.to_owned(), entry.clone());

        entry
    }

    fn unregister(&mut self, original_name: &str) {
        if let Some(old) = self.entries.remove(original_name) {
            let key = (old.zone, old.clean_name);
            if self.by_zone_clean.get(&key).map(String::as_str) == Some(original_name) {
                self.by_zone_clean.remove(&key);
            }
            self.order.retain(|o| o != original_name);
        }
    }

    pub fn lookup(&self, original_name: &str) -> Option<&SchemaEntry> {
        self.entries.get(original_name)
    }

    /// Finds the entry owning `clean_name` inside `zone`.
    pub fn find_in_zone(&self, clean_name: &str, zone: &str) -> Option<&SchemaEntry> {
        self.by_zone_clean
            .get(&(zone.to_owned(), clean_name.to_owned()))
            .and_then(|original| self.entries.get(original))
    }

    /// Entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.order.iter().filter_map(|o| self.entries.get(o))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display name for `original_name`, qualified with the owning zone when referenced from
    /// another zone.
    pub fn resolve(&self, original_name: &str, current_zone: &str) -> String {
        self.resolve_with(original_name, current_zone, true)
    }

    pub fn resolve_with(
        &self,
        original_name: &str,
        current_zone: &str,
        include_zone_prefix: bool,
    ) -> String {
        if let Some(entry) = self.entries.get(original_name) {
            if include_zone_prefix && entry.zone != current_zone && entry.zone != COMMON_ZONE {
                return format!("{}.{}", entry.zone, entry.clean_name);
            }
            return entry.clean_name.clone();
        }

        if let Some(entry) = self.generic_in_zone(original_name, current_zone) {
            return entry.clean_name.clone();
        }

        Self::clean(original_name)
    }

    /// Like [`SchemaResolver::lookup`] but also finds the zone-local variant of a generic name.
    pub fn lookup_or_generic(&self, original_name: &str, current_zone: &str) -> Option<&SchemaEntry> {
        self.entries
            .get(original_name)
            .or_else(|| self.generic_in_zone(original_name, current_zone))
    }

    fn generic_in_zone(&self, original_name: &str, current_zone: &str) -> Option<&SchemaEntry> {
        if !GENERIC_NAMES.contains(&original_name)
            || current_zone.is_empty()
            || current_zone == COMMON_ZONE
        {
            return None;
        }

        let zone_local = format!("{}{}", capitalize(current_zone), original_name);
        self.find_in_zone(&zone_local, current_zone)
    }

    /// Turns a raw schema key or title into a class name. Pure, does not consult the registry.
    pub fn clean(original_name: &str) -> String {
        let segments = original_name.split("__").collect::<Vec<_>>();
        if segments.len() >= 4 {
            let service = segments[2];
            let operation = segments[segments.len() - 1];
            return format!("{}{}", capitalize(service), capitalize(operation));
        }

        let starts_upper = original_name
            .chars()
            .next()
            .is_some_and(|c| c.is_uppercase());
        if starts_upper && original_name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return original_name.to_owned();
        }

        TOKEN_SPLIT
            .split(original_name)
            .filter(|token| !token.is_empty())
            .map(|token| {
                let upper = token.to_ascii_uppercase();
                if INITIALISMS.contains(&upper.as_str()) {
                    upper
                } else if upper == "ID" {
                    "ID".to_owned()
                } else {
                    capitalize(token)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clean_collapses_framework_paths() {
        assert_eq!(
            SchemaResolver::clean("app__routers__orders__Read"),
            "OrdersRead"
        );
    }

    #[test]
    fn clean_keeps_already_clean_names() {
        assert_eq!(SchemaResolver::clean("HTTPValidationError"), "HTTPValidationError");
        assert_eq!(SchemaResolver::clean("User"), "User");
    }

    #[test]
    fn clean_tokenizes_and_upper_cases_initialisms() {
        assert_eq!(
            SchemaResolver::clean("Body_upload_file_files_post"),
            "BodyUploadFileFilesPost"
        );
        assert_eq!(SchemaResolver::clean("user_id"), "UserID");
        assert_eq!(SchemaResolver::clean("api-url json"), "APIURLJSON");
        assert_eq!(
            SchemaResolver::clean("Response Get User Users  Id Get"),
            "ResponseGetUserUsersIDGet"
        );
    }

    #[test]
    fn clean_is_idempotent() {
        for name in ["user_profile", "app__x__orders__Read", "Thing", "Some Title"] {
            assert_eq!(SchemaResolver::clean(name), SchemaResolver::clean(name));
        }
    }

    #[test]
    fn resolve_qualifies_across_zones() {
        let mut resolver = SchemaResolver::new();
        resolver.register("Order", "Order", "orders");
        resolver.register("ValidationError", "ValidationError", COMMON_ZONE);

        assert_eq!(resolver.resolve("Order", "orders"), "Order");
        assert_eq!(resolver.resolve("Order", "users"), "orders.Order");
        assert_eq!(resolver.resolve("Order", ""), "orders.Order");
        assert_eq!(resolver.resolve("ValidationError", "users"), "ValidationError");
        assert_eq!(resolver.resolve_with("Order", "users", false), "Order");
    }

    #[test]
    fn generic_names_resolve_in_the_current_zone() {
        let mut resolver = SchemaResolver::new();
        resolver.register("app__routers__orders__Read", "OrdersRead", "orders");
        resolver.register("app__routers__users__Read", "UsersRead", "users");
        resolver.register("app__routers__orders__Paginated", "OrdersPaginated", "orders");

        assert_eq!(resolver.resolve("Read", "orders"), "OrdersRead");
        assert_eq!(resolver.resolve("Read", "users"), "UsersRead");
        assert_eq!(resolver.resolve("Paginated", "orders"), "OrdersPaginated");
        assert_eq!(resolver.resolve("Read", COMMON_ZONE), "Read");
        assert_eq!(resolver.resolve("Read", ""), "Read");
    }

    #[test]
    fn clashing_clean_names_get_a_suffix() {
        let mut resolver = SchemaResolver::new();
        let first = resolver.register("user", "User", "users");
        let second = resolver.register("User", "User", "users");

        assert_eq!(first.clean_name, "User");
        assert_eq!(second.clean_name, "User2");
        assert_eq!(second.slug, "user2");
    }

    #[test]
    fn re_registering_replaces_the_entry() {
        let mut resolver = SchemaResolver::new();
        resolver.register("Item", "Item", "items");
        resolver.register("Item", "Item", "catalog");

        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.lookup("Item").map(|e| e.zone.as_str()), Some("catalog"));
        assert_eq!(resolver.entries().count(), 1);
    }

    #[test]
    fn aliases_share_the_target_declaration() {
        let mut resolver = SchemaResolver::new();
        let status = resolver.register("Status", "Status", "orders");
        resolver.register_alias("OrderStatus", &status);

        assert_eq!(resolver.resolve("OrderStatus", "users"), "orders.Status");
        assert_eq!(resolver.lookup("OrderStatus").map(|e| e.slug.as_str()), Some("status"));
    }
}
