//! Extension points run around document assembly.
//!
//! Hooks are synchronous and run in registration order. They must not start
//! another indexing pass.

use std::sync::Arc;

use catalog_indexer_shared::{ProductDocument, ProductEntity, StoreId};

use crate::catalog::ProductFilter;

/// Transforms an assembled document. Fields it sets win over the assembler's own.
pub trait DocumentHook: Send + Sync {
    fn apply(&self, document: ProductDocument, product: &ProductEntity) -> ProductDocument;
}

impl<F> DocumentHook for F
where
    F: Fn(ProductDocument, &ProductEntity) -> ProductDocument + Send + Sync,
{
    fn apply(&self, document: ProductDocument, product: &ProductEntity) -> ProductDocument {
        self(document, product)
    }
}

/// Adjusts the product selection of a pass before it is fetched.
pub trait CollectionHook: Send + Sync {
    fn apply(&self, filter: &mut ProductFilter, store_id: StoreId);
}

impl<F> CollectionHook for F
where
    F: Fn(&mut ProductFilter, StoreId) + Send + Sync,
{
    fn apply(&self, filter: &mut ProductFilter, store_id: StoreId) {
        self(filter, store_id)
    }
}

#[derive(Clone, Default)]
pub struct HookRegistry {
    document_hooks: Vec<Arc<dyn DocumentHook>>,
    collection_hooks: Vec<Arc<dyn CollectionHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_document(mut self, hook: impl DocumentHook + 'static) -> Self {
        self.document_hooks.push(Arc::new(hook));
        self
    }

    pub fn on_collection(mut self, hook: impl CollectionHook + 'static) -> Self {
        self.collection_hooks.push(Arc::new(hook));
        self
    }

    pub fn apply_document(&self, document: ProductDocument, product: &ProductEntity) -> ProductDocument {
        self.document_hooks
            .iter()
            .fold(document, |document, hook| hook.apply(document, product))
    }

    pub fn apply_collection(&self, filter: &mut ProductFilter, store_id: StoreId) {
        for hook in &self.collection_hooks {
            hook.apply(filter, store_id);
        }
    }
}
