//! Case-insensitive lookup from property name to property identifier.

use std::collections::HashMap;

use crate::engine::{Engine, PropertyClass, Session};
use crate::errors::CatalogError;
use crate::log::JobLog;

/// Snapshot of the property names defined in one model.
///
/// Keys are trimmed and lower-cased. When two records normalise to the same
/// key, the one inserted last wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyCatalog {
    /// Normalised name to property identifier.
    names: HashMap<String, u32>,
}

/// Normalised form of a property name.
fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl PropertyCatalog {
    /// Enumerate every property of `class` in the session's open model.
    ///
    /// Identifiers run from 1 to the highest identifier in use. Gaps in the
    /// numbering are expected, so an identifier whose name cannot be read is
    /// skipped rather than treated as an error.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Totals`] when the property totals cannot be read
    /// and [`CatalogError::Empty`] when no named record is found.
    pub fn build<E: Engine + ?Sized>(
        session: &Session<'_, E>,
        class: PropertyClass,
    ) -> Result<Self, CatalogError> {
        let totals = session
            .property_totals(class)
            .map_err(CatalogError::Totals)?;
        if totals.count == 0 {
            return Err(CatalogError::Empty);
        }
        let mut catalog = Self::default();
        for property in 1..=totals.highest {
            match session.property_name(class, property) {
                Ok(name) => catalog.insert(&name, property),
                Err(error) => tracing::trace!(property, %error, "identifier skipped"),
            }
        }
        if catalog.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(catalog)
    }

    /// Add or replace the entry for `name`.
    pub fn insert(&mut self, name: &str, property: u32) {
        self.names.insert(key(name), property);
    }

    /// Identifier of the property called `name`, ignoring case and
    /// surrounding whitespace.
    ///
    /// # Examples
    /// ```
    /// use beamsec::PropertyCatalog;
    ///
    /// let catalog: PropertyCatalog = [("SEC_411", 3)].into_iter().collect();
    /// assert_eq!(catalog.resolve("sec_411"), Some(3));
    /// assert_eq!(catalog.resolve(" Sec_411 "), Some(3));
    /// assert_eq!(catalog.resolve("sec_999"), None);
    /// ```
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<u32> {
        self.names.get(&key(name)).copied()
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the catalog holds no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of names that start with `prefix`, ignoring case.
    #[must_use]
    pub fn count_with_prefix(&self, prefix: &str) -> usize {
        let prefix = key(prefix);
        self.names.keys().filter(|name| name.starts_with(&prefix)).count()
    }

    /// Iterate over `(normalised name, identifier)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.names.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Log every name that starts with `prefix`, sorted, then their count.
    pub fn log_prefixed(&self, prefix: &str, log: &JobLog) {
        let prefix = key(prefix);
        let mut matching: Vec<(&str, u32)> = self
            .iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .collect();
        matching.sort_unstable();
        for (name, id) in &matching {
            log.info(format!("  {name} (property {id})"));
        }
        log.info(format!(
            "{} of {} properties start with '{prefix}'",
            matching.len(),
            self.len()
        ));
    }
}

impl<S: AsRef<str>> FromIterator<(S, u32)> for PropertyCatalog {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        let mut catalog = Self::default();
        for (name, property) in iter {
            catalog.insert(name.as_ref(), property);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::geometry::point;
    use crate::local::{write_model, LocalEngine};
    use crate::log::MemorySink;
    use crate::model::{Model, PropertyRecord};

    #[test]
    fn collisions_keep_the_last_identifier() {
        let catalog: PropertyCatalog = [("Sec_1", 1), ("SEC_1", 4)].into_iter().collect();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.resolve("sec_1"), Some(4));
    }

    #[test]
    fn sparse_numbering_is_skipped() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("frame.st7");
        let mut model = Model::new();
        let a = model.add_node(point(0.0, 0.0, 0.0));
        let b = model.add_node(point(1.0, 0.0, 0.0));
        model.add_beam(a, b, 1).expect("nodes exist");
        model
            .add_property(2, PropertyRecord::named("SEC_411"))
            .expect("identifier free");
        model
            .add_property(7, PropertyRecord::named("BXS_plate"))
            .expect("identifier free");
        write_model(&path, &model).expect("model written");

        let mut engine = LocalEngine::new();
        let mut session = Session::start(&mut engine, 1).expect("engine starts");
        session.open(&path).expect("model opens");
        let catalog = PropertyCatalog::build(&session, PropertyClass::Beam).expect("names found");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.resolve("sec_411"), Some(2));
        assert_eq!(catalog.resolve("bxs_plate"), Some(7));
        assert_eq!(catalog.count_with_prefix("SEC_"), 1);

        let sink = MemorySink::new();
        let log = JobLog::new("matcher").with_sink(Arc::new(sink.clone()));
        catalog.log_prefixed("sec_", &log);
        assert!(sink.contains("sec_411 (property 2)"));
        assert!(sink.contains("1 of 2 properties start with 'sec_'"));
    }

    #[test]
    fn model_without_properties_is_empty() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("bare.st7");
        write_model(&path, &Model::new()).expect("model written");

        let mut engine = LocalEngine::new();
        let mut session = Session::start(&mut engine, 1).expect("engine starts");
        session.open(&path).expect("model opens");
        assert_eq!(
            PropertyCatalog::build(&session, PropertyClass::Beam),
            Err(CatalogError::Empty)
        );
        assert_eq!(
            PropertyCatalog::build(&session, PropertyClass::Plate),
            Err(CatalogError::Empty)
        );
    }

    proptest! {
        #[test]
        fn unique_names_resolve_in_any_case(
            names in prop::collection::hash_set("[a-z][a-z0-9_]{0,11}", 1..40)
        ) {
            let entries: Vec<(String, u32)> = names
                .iter()
                .enumerate()
                .map(|(index, name)| (name.to_uppercase(), index as u32 + 1))
                .collect();
            let catalog: PropertyCatalog = entries.iter().map(|(n, id)| (n.as_str(), *id)).collect();
            prop_assert_eq!(catalog.len(), names.len());
            for (name, id) in &entries {
                prop_assert_eq!(catalog.resolve(&name.to_lowercase()), Some(*id));
                prop_assert_eq!(catalog.resolve(name), Some(*id));
            }
        }
    }
}
