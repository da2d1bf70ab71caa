use serde::{Deserialize, Serialize};

/// Top-level fields of one order, taken from an order header row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHeader {
    pub status: String,
    pub order_id: String,
    pub ordered_at: String,
    pub estimated_at: String,
    pub purchased_at: String,
    /// Arrival date at the overseas warehouse; empty until the goods arrive
    pub arrived_at: String,
    pub shippable_at: String,
    /// Detail page URL; empty when the row carries no link
    pub detail_link: String,
}

/// One product row of an order. Every item of an order repeats the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    #[serde(flatten)]
    pub order: OrderHeader,
    pub image_url: String,
    pub item_name: String,
}

impl ItemRecord {
    pub fn new(order: &OrderHeader, image_url: String, item_name: String) -> Self {
        Self {
            order: order.clone(),
            image_url,
            item_name,
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order.order_id
    }

    pub fn detail_link(&self) -> &str {
        &self.order.detail_link
    }
}

/// Product section found on a detail page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLink {
    pub product_link: String,
    pub color_size: String,
}

impl ProductLink {
    pub fn new(product_link: impl Into<String>, color_size: impl Into<String>) -> Self {
        Self {
            product_link: product_link.into(),
            color_size: color_size.into(),
        }
    }
}

/// Item after enrichment. `order_link`/`color_size` stay empty when the
/// detail page had no matching product section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedItem {
    #[serde(flatten)]
    pub item: ItemRecord,
    pub order_link: String,
    pub color_size: String,
}

impl EnrichedItem {
    pub fn new(item: ItemRecord, product: Option<&ProductLink>) -> Self {
        let (order_link, color_size) = product
            .map(|p| (p.product_link.clone(), p.color_size.clone()))
            .unwrap_or_default();
        Self {
            item,
            order_link,
            color_size,
        }
    }
}
