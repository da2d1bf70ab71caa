//! Google Sheets implementation of the remote table store
//!
//! Talks to the Sheets v4 REST API with a bearer token. Rows and columns
//! are 1-based on the trait surface and converted to A1 notation here.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use crate::domain::errors::StoreError;
use crate::domain::repositories::RemoteTableStore;
use crate::infrastructure::config::SheetsConfig;

/// Cells are stored verbatim so ids and dates read back exactly as written
const VALUE_INPUT_OPTION: &str = "RAW";

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
    #[serde(default)]
    tables: Vec<TableMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableMeta {
    table_id: String,
}

pub struct GoogleSheetsStore {
    client: Client,
    spreadsheet_url: Url,
    worksheet: String,
    access_token: String,
}

/// Spreadsheet column letters for a 1-based column number (1 → A, 27 → AA)
pub fn column_letter(column: usize) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Quota rejections surface as 429, or as 403 with a rate-limit reason
fn is_quota_rejection(status: StatusCode, body: &str) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (body.contains("RATE_LIMIT_EXCEEDED")
                || body.contains("rateLimitExceeded")
                || body.contains("Quota exceeded")))
}

impl GoogleSheetsStore {
    pub fn new(config: &SheetsConfig) -> Result<Self, StoreError> {
        let mut spreadsheet_url = Url::parse(config.api_base_url.trim_end_matches('/'))
            .map_err(|e| StoreError::InvalidRange(format!("invalid api_base_url: {e}")))?;
        spreadsheet_url
            .path_segments_mut()
            .map_err(|()| StoreError::InvalidRange("api_base_url cannot be a base".to_string()))?
            .push("spreadsheets")
            .push(&config.spreadsheet_id);

        Ok(Self {
            client: Client::new(),
            spreadsheet_url,
            worksheet: config.worksheet.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn sheet_range(&self, cells: &str) -> String {
        let name = format!("'{}'", self.worksheet.replace('\'', "''"));
        if cells.is_empty() {
            name
        } else {
            format!("{name}!{cells}")
        }
    }

    fn a1_range(
        &self,
        start_row: usize,
        end_row: usize,
        start_col: usize,
        end_col: usize,
    ) -> Result<String, StoreError> {
        if start_row == 0 || start_col == 0 || end_row < start_row || end_col < start_col {
            return Err(StoreError::InvalidRange(format!(
                "rows {start_row}..={end_row}, columns {start_col}..={end_col}"
            )));
        }
        Ok(self.sheet_range(&format!(
            "{}{}:{}{}",
            column_letter(start_col),
            start_row,
            column_letter(end_col),
            end_row
        )))
    }

    fn values_url(&self, range: &str, suffix: &str) -> Url {
        let mut url = self.spreadsheet_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push("values").push(&format!("{range}{suffix}"));
        }
        url
    }

    fn append_url(&self) -> Url {
        let mut url = self.values_url(&self.sheet_range(""), ":append");
        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION)
            .append_pair("insertDataOption", "INSERT_ROWS");
        url
    }

    fn update_url(&self, range: &str) -> Url {
        let mut url = self.values_url(range, "");
        url.query_pairs_mut().append_pair("valueInputOption", VALUE_INPUT_OPTION);
        url
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| StoreError::transport(operation, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if is_quota_rejection(status, &body) {
            return Err(StoreError::rate_limited(operation, format!("HTTP {status}")));
        }
        Err(StoreError::Api {
            operation: operation.to_string(),
            status: status.as_u16(),
            message: body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, url: Url) -> Result<T, StoreError> {
        self.send(operation, self.client.get(url))
            .await?
            .json::<T>()
            .await
            .map_err(|e| StoreError::decode(operation, e.to_string()))
    }
}

#[async_trait]
impl RemoteTableStore for GoogleSheetsStore {
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let url = self.values_url(&self.sheet_range(""), "");
        let range: ValueRange = self.get_json("read_all_rows", url).await?;
        debug!("Read {} rows from '{}'", range.values.len(), self.worksheet);
        Ok(range.values)
    }

    async fn read_column(&self, column: usize) -> Result<Vec<String>, StoreError> {
        if column == 0 {
            return Err(StoreError::InvalidRange("column 0".to_string()));
        }
        let letter = column_letter(column);
        let mut url = self.values_url(&self.sheet_range(&format!("{letter}:{letter}")), "");
        url.query_pairs_mut().append_pair("majorDimension", "COLUMNS");
        let range: ValueRange = self.get_json("read_column", url).await?;
        Ok(range.values.into_iter().next().unwrap_or_default())
    }

    async fn append_row(&self, row: &[String]) -> Result<(), StoreError> {
        let url = self.append_url();
        let body = json!({ "values": [row] });
        self.send("append_row", self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn update_range(
        &self,
        start_row: usize,
        end_row: usize,
        start_col: usize,
        end_col: usize,
        rows: &[Vec<String>],
    ) -> Result<(), StoreError> {
        let range = self.a1_range(start_row, end_row, start_col, end_col)?;
        let url = self.update_url(&range);
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": rows });
        self.send("update_range", self.client.put(url).json(&body)).await?;
        Ok(())
    }

    async fn extend_logical_boundary(
        &self,
        row_count: usize,
        col_count: usize,
    ) -> Result<(), StoreError> {
        let mut meta_url = self.spreadsheet_url.clone();
        meta_url
            .query_pairs_mut()
            .append_pair("includeGridData", "false")
            .append_pair("fields", "sheets(properties(sheetId,title),tables(tableId))");
        let meta: SpreadsheetMeta = self.get_json("extend_logical_boundary", meta_url).await?;

        let Some(sheet) = meta.sheets.iter().find(|s| s.properties.title == self.worksheet) else {
            info!("Worksheet '{}' not found in metadata, skipping table range update", self.worksheet);
            return Ok(());
        };
        let Some(table) = sheet.tables.first() else {
            info!("No table on '{}', skipping table range update", self.worksheet);
            return Ok(());
        };

        let body = json!({
            "requests": [{
                "updateTable": {
                    "table": {
                        "tableId": table.table_id,
                        "range": {
                            "sheetId": sheet.properties.sheet_id,
                            "startRowIndex": 0,
                            "endRowIndex": row_count,
                            "startColumnIndex": 0,
                            "endColumnIndex": col_count
                        }
                    },
                    "fields": "range"
                }
            }]
        });
        let mut batch_url = self.spreadsheet_url.clone();
        batch_url.set_path(&format!("{}:batchUpdate", self.spreadsheet_url.path()));
        self.send("extend_logical_boundary", self.client.post(batch_url).json(&body))
            .await?;

        info!("Extended table range to {} rows x {} columns", row_count, col_count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn store() -> GoogleSheetsStore {
        GoogleSheetsStore::new(&SheetsConfig {
            spreadsheet_id: "sheet-123".to_string(),
            worksheet: "yiwu".to_string(),
            access_token: "token".to_string(),
            ..SheetsConfig::default()
        })
        .unwrap()
    }

    #[rstest]
    #[case(1, "A")]
    #[case(13, "M")]
    #[case(26, "Z")]
    #[case(27, "AA")]
    #[case(52, "AZ")]
    #[case(703, "AAA")]
    fn column_letters(#[case] column: usize, #[case] expected: &str) {
        assert_eq!(column_letter(column), expected);
    }

    #[test]
    fn a1_range_for_single_row() {
        assert_eq!(store().a1_range(5, 5, 1, 13).unwrap(), "'yiwu'!A5:M5");
        assert!(store().a1_range(0, 1, 1, 13).is_err());
        assert!(store().a1_range(3, 2, 1, 13).is_err());
    }

    #[test]
    fn append_url_keeps_colon_suffix() {
        let url = store().values_url("'yiwu'", ":append");
        assert!(url.as_str().starts_with("https://sheets.googleapis.com/v4/spreadsheets/sheet-123/values/"));
        assert!(url.path().ends_with(":append"));
    }

    #[test]
    fn writes_store_cells_verbatim() {
        let append = store().append_url();
        let update = store().update_url("'yiwu'!A2:M2");

        for url in [&append, &update] {
            let input: Vec<_> = url
                .query_pairs()
                .filter(|(key, _)| key == "valueInputOption")
                .map(|(_, value)| value.into_owned())
                .collect();
            assert_eq!(input, vec!["RAW".to_string()]);
        }
        assert!(append.query_pairs().any(|(key, value)| key == "insertDataOption" && value == "INSERT_ROWS"));
    }

    #[test]
    fn quota_rejections_are_classified() {
        assert!(is_quota_rejection(StatusCode::TOO_MANY_REQUESTS, ""));
        assert!(is_quota_rejection(StatusCode::FORBIDDEN, r#"{"reason":"RATE_LIMIT_EXCEEDED"}"#));
        assert!(!is_quota_rejection(StatusCode::FORBIDDEN, "PERMISSION_DENIED"));
        assert!(!is_quota_rejection(StatusCode::INTERNAL_SERVER_ERROR, ""));
    }
}
