//! Category membership resolution.

use std::collections::{BTreeMap, HashMap};

use catalog_indexer_shared::{Category, CategoryId};

use super::encode_uid;
use crate::config::StoreSettings;

/// Store-scoped category lookup for one pass.
#[derive(Debug, Clone, Default)]
pub struct CategoryLookup {
    root_id: CategoryId,
    by_id: HashMap<CategoryId, Category>,
}

impl CategoryLookup {
    /// Keep active categories, dropping the ones not in the menu when the store asks for it.
    pub fn new(categories: Vec<Category>, settings: &StoreSettings) -> Self {
        let by_id = categories
            .into_iter()
            .filter(|c| c.is_active)
            .filter(|c| !settings.filter_include_in_menu || c.include_in_menu)
            .map(|c| (c.id, c))
            .collect();
        Self {
            root_id: settings.root_category_id,
            by_id,
        }
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Category fields of one product document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedCategories {
    /// Leaf category names keyed by encoded category id.
    pub categories: BTreeMap<String, String>,
    /// Leaf categories and their named ancestors, without duplicates.
    pub category_ids: Vec<CategoryId>,
}

impl ResolvedCategories {
    pub fn category_uids(&self) -> Vec<String> {
        self.category_ids.iter().map(encode_uid).collect()
    }
}

pub struct CategoryResolver;

impl CategoryResolver {
    /// Resolve a product's direct category memberships.
    ///
    /// Categories missing from the lookup or outside the configured root are dropped.
    pub fn resolve(category_ids: &[CategoryId], lookup: &CategoryLookup) -> ResolvedCategories {
        let mut resolved = ResolvedCategories::default();

        for id in category_ids {
            let Some(category) = lookup.get(*id) else {
                continue;
            };
            if !category.is_under(lookup.root_id) {
                continue;
            }

            if let Some(name) = category.display_name() {
                resolved
                    .categories
                    .insert(encode_uid(category.id), name.to_string());
            }

            for ancestor_id in &category.path {
                let named = lookup
                    .get(*ancestor_id)
                    .and_then(Category::display_name)
                    .is_some();
                if named && !resolved.category_ids.contains(ancestor_id) {
                    resolved.category_ids.push(*ancestor_id);
                }
            }
        }

        resolved
    }
}
