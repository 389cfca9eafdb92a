//! Stock and price aggregation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use catalog_indexer_shared::{
    Discount, Money, PriceBand, PriceRange, ProductEntity, StockSnapshot,
};

use crate::catalog::{CatalogError, CatalogServices, PriceProvider, PricingEngine, StockStore};

/// Differences at or below this amount are not a discount.
const DISCOUNT_THRESHOLD: f64 = 0.001;

/// Joins stock levels, reservations and salability per SKU, and computes price ranges.
#[derive(Clone)]
pub struct StockPriceAggregator {
    stock: Arc<dyn StockStore>,
    pricing: Arc<dyn PricingEngine>,
}

impl StockPriceAggregator {
    pub fn new(stock: Arc<dyn StockStore>, pricing: Arc<dyn PricingEngine>) -> Self {
        Self { stock, pricing }
    }

    pub fn from_services(services: &CatalogServices) -> Self {
        Self::new(Arc::clone(&services.stock), Arc::clone(&services.pricing))
    }

    /// Stock snapshot per SKU on one stock channel.
    ///
    /// SKUs without a stock record are absent from the result. Missing reservations
    /// count as zero.
    #[instrument(skip(self, skus), fields(sku_count = skus.len()))]
    pub async fn aggregate(
        &self,
        skus: &[String],
        stock_id: u32,
    ) -> Result<HashMap<String, StockSnapshot>, CatalogError> {
        if skus.is_empty() {
            return Ok(HashMap::new());
        }

        let records = self.stock.stock_records(skus, stock_id).await?;
        let reservations = self.stock.reservations(skus, stock_id).await?;

        let snapshots: HashMap<String, StockSnapshot> = records
            .iter()
            .map(|record| {
                let reserved = reservations.get(&record.sku).copied().unwrap_or(0.0);
                (record.sku.clone(), StockSnapshot::from_record(record, reserved))
            })
            .collect();

        debug!(
            requested = skus.len(),
            found = snapshots.len(),
            "Aggregated stock snapshots"
        );
        Ok(snapshots)
    }

    /// Attach stock snapshots to products in one batched lookup.
    pub async fn attach_stock(
        &self,
        products: &mut [ProductEntity],
        stock_id: u32,
    ) -> Result<(), CatalogError> {
        let skus: Vec<String> = products.iter().map(|p| p.sku.clone()).collect();
        let mut snapshots = self.aggregate(&skus, stock_id).await?;
        for product in products.iter_mut() {
            product.stock = snapshots.remove(&product.sku);
        }
        Ok(())
    }

    /// Authoritative salability per SKU on the store's stock channel.
    pub async fn salability(
        &self,
        skus: &[String],
        stock_id: u32,
    ) -> Result<HashMap<String, bool>, CatalogError> {
        if skus.is_empty() {
            return Ok(HashMap::new());
        }
        self.stock.are_salable(skus, stock_id).await
    }

    pub fn price_provider(&self, product: &ProductEntity) -> Arc<dyn PriceProvider> {
        self.pricing.provider_for(&product.type_id)
    }

    /// Minimum and maximum prices of a product.
    ///
    /// Hidden prices resolve to the null sentinel on both ends so that they cannot
    /// be mistaken for a free product.
    pub fn price_range(&self, product: &ProductEntity, currency: &str) -> PriceRange {
        if product.price_hidden {
            return PriceRange {
                minimum_price: PriceBand::hidden(),
                maximum_price: PriceBand::hidden(),
            };
        }

        let provider = self.price_provider(product);
        PriceRange {
            minimum_price: Self::band(
                provider.minimal_regular_price(product),
                provider.minimal_final_price(product),
                currency,
            ),
            maximum_price: Self::band(
                provider.maximal_regular_price(product),
                provider.maximal_final_price(product),
                currency,
            ),
        }
    }

    fn band(regular: f64, final_price: f64, currency: &str) -> PriceBand {
        PriceBand {
            regular_price: Money::new(regular, currency),
            final_price: Money::new(final_price, currency),
            discount: Some(Self::discount(regular, final_price)),
        }
    }

    /// Amount and percentage off the regular price, rounded to cents.
    pub fn discount(regular: f64, final_price: f64) -> Discount {
        let diff = regular - final_price;
        if diff <= DISCOUNT_THRESHOLD || regular == 0.0 {
            return Discount::default();
        }
        Discount {
            amount_off: round2(diff),
            percent_off: round2(100.0 * diff / regular),
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSnapshot;
    use crate::config::StaticConfigStore;
    use crate::processor::DirectiveFilter;
    use catalog_indexer_shared::{PriceSnapshot, ProductType, StockRecord, StockStatus};

    fn record(sku: &str, is_salable: bool, quantity: f64) -> StockRecord {
        StockRecord {
            sku: sku.to_string(),
            is_salable,
            quantity,
            min_qty: 0.0,
            is_in_stock: is_salable,
            max_sale_qty: None,
            stock_qty: Some(quantity),
        }
    }

    fn aggregator(snapshot: CatalogSnapshot) -> StockPriceAggregator {
        let services = snapshot.into_services(
            Arc::new(StaticConfigStore::new()),
            Arc::new(DirectiveFilter::new("")),
        );
        StockPriceAggregator::from_services(&services)
    }

    #[tokio::test]
    async fn test_salable_flag_is_authoritative_over_quantity() {
        let mut snapshot = CatalogSnapshot::new();
        snapshot.add_stock(record("A", true, 1.0));
        snapshot.add_reservation("A", -4.0);
        snapshot.add_stock(record("B", false, 50.0));
        let aggregator = aggregator(snapshot);

        let skus = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let stock = aggregator.aggregate(&skus, 1).await.unwrap();

        assert_eq!(stock["A"].salable_qty, -3.0);
        assert_eq!(stock["A"].stock_status, StockStatus::InStock);
        assert_eq!(stock["B"].stock_status, StockStatus::OutOfStock);
        assert_eq!(stock["B"].reservation_qty, 0.0);
        assert!(!stock.contains_key("C"));
    }

    #[tokio::test]
    async fn test_attach_stock_sets_snapshots() {
        let mut snapshot = CatalogSnapshot::new();
        snapshot.add_stock(record("A", true, 5.0));
        let aggregator = aggregator(snapshot);

        let mut products = vec![
            ProductEntity::new(1, "A", ProductType::Simple),
            ProductEntity::new(2, "B", ProductType::Simple),
        ];
        aggregator.attach_stock(&mut products, 1).await.unwrap();
        assert_eq!(products[0].stock.as_ref().map(|s| s.qty), Some(5.0));
        assert!(products[1].stock.is_none());
    }

    #[test]
    fn test_hidden_price_is_null_not_zero() {
        let aggregator = aggregator(CatalogSnapshot::new());
        let mut product = ProductEntity::new(1, "A", ProductType::Simple);
        product.price_hidden = true;

        let range = aggregator.price_range(&product, "EUR");
        assert!(range.minimum_price.is_hidden());
        assert!(range.maximum_price.discount.is_none());

        product.price_hidden = false;
        let range = aggregator.price_range(&product, "EUR");
        assert_eq!(range.minimum_price.final_price.value, Some(0.0));
        assert_eq!(range.minimum_price.final_price.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_simple_price_range_applies_special_price() {
        let today = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let aggregator = aggregator(CatalogSnapshot::new().with_today(today));
        let mut product = ProductEntity::new(1, "A", ProductType::Simple);
        product.price = PriceSnapshot {
            regular_price: 40.0,
            special_price: Some(30.0),
            ..Default::default()
        };

        let range = aggregator.price_range(&product, "USD");
        assert_eq!(range.minimum_price, range.maximum_price);
        assert_eq!(range.minimum_price.final_price.value, Some(30.0));
        assert_eq!(
            range.minimum_price.discount,
            Some(Discount {
                amount_off: 10.0,
                percent_off: 25.0
            })
        );
    }

    #[test]
    fn test_discount_threshold() {
        assert_eq!(StockPriceAggregator::discount(10.0, 9.9995), Discount::default());
        assert_eq!(StockPriceAggregator::discount(0.0, -1.0), Discount::default());
        assert_eq!(
            StockPriceAggregator::discount(30.0, 20.0),
            Discount {
                amount_off: 10.0,
                percent_off: 33.33
            }
        );
    }
}
