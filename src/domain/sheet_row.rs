//! Projection of an enriched item onto the remote table's column layout

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::domain::order::EnrichedItem;

/// Header row of the worksheet, in column order
pub const SHEET_HEADERS: [&str; COLUMN_COUNT] = [
    "ステータス",
    "注文番号",
    "注文日",
    "見積完了日",
    "買付完了日",
    "中国事務所到着日",
    "発送可能日",
    "注文詳細リンク",
    "商品リンク",
    "商品画像",
    "商品名",
    "色・サイズ等指定",
    "更新日",
];

pub const COLUMN_COUNT: usize = 13;

/// 0-based index of the identity column (order id, column B)
pub const COL_ORDER_ID: usize = 1;

/// 0-based index of the arrival date column (column F)
pub const COL_ARRIVED_AT: usize = 5;

/// Default number of leading columns compared when deciding whether a stored
/// row changed. Leaves out the trailing sync timestamp.
pub const DEFAULT_COMPARE_COLUMNS: usize = COLUMN_COUNT - 1;

pub const SYNCED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Row written to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationRow {
    #[serde(flatten)]
    pub item: EnrichedItem,
    pub synced_at: String,
}

impl ReconciliationRow {
    pub fn from_item(item: EnrichedItem, synced_at: &DateTime<Local>) -> Self {
        Self {
            item,
            synced_at: synced_at.format(SYNCED_AT_FORMAT).to_string(),
        }
    }

    /// Stamp a whole batch with the same sync time
    pub fn project_all(items: Vec<EnrichedItem>, synced_at: &DateTime<Local>) -> Vec<Self> {
        items
            .into_iter()
            .map(|item| Self::from_item(item, synced_at))
            .collect()
    }

    pub fn order_id(&self) -> &str {
        &self.item.item.order.order_id
    }

    pub fn arrived_at(&self) -> &str {
        &self.item.item.order.arrived_at
    }

    pub fn item_name(&self) -> &str {
        &self.item.item.item_name
    }

    pub fn to_cells(&self) -> Vec<String> {
        let enriched = &self.item;
        let order = &enriched.item.order;
        vec![
            order.status.clone(),
            order.order_id.clone(),
            order.ordered_at.clone(),
            order.estimated_at.clone(),
            order.purchased_at.clone(),
            order.arrived_at.clone(),
            order.shippable_at.clone(),
            order.detail_link.clone(),
            enriched.order_link.clone(),
            enriched.item.image_url.clone(),
            enriched.item.item_name.clone(),
            enriched.color_size.clone(),
            self.synced_at.clone(),
        ]
    }
}

pub fn header_cells() -> Vec<String> {
    SHEET_HEADERS.iter().map(ToString::to_string).collect()
}
