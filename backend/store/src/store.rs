//! On-disk order store with atomic writes and rolling backups.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bendline_catalog::CatalogShape;
use bendline_core::{BendlineError, MappingResult};
use bendline_logging::{PipelineEvent, PipelineEventLogger};

use crate::record::OrderRecord;

/// Order ids become file names, so only a safe character set is allowed.
pub fn validate_order_id(order_id: &str) -> Result<(), BendlineError> {
    let ok = !order_id.is_empty()
        && !order_id.starts_with('.')
        && order_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(BendlineError::Store(format!("invalid order id '{order_id}'")))
    }
}

/// One `<order_id>.json` per order under `root`.
pub struct OrderStore {
    root: PathBuf,
    max_backups: usize,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl OrderStore {
    pub async fn open(root: impl Into<PathBuf>, max_backups: usize) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create orders directory: {}", root.display()))?;
        debug!(root = %root.display(), max_backups, "Opened order store");
        Ok(Self {
            root,
            max_backups,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, order_id: &str) -> Result<PathBuf, BendlineError> {
        validate_order_id(order_id)?;
        Ok(self.root.join(format!("{order_id}.json")))
    }

    /// Load an existing order. A missing file is an error.
    pub async fn load(&self, order_id: &str) -> Result<OrderRecord> {
        let path = self.path_for(order_id)?;
        if !path.exists() {
            return Err(BendlineError::Store(format!("order '{order_id}' not found")).into());
        }
        let raw = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read order: {}", path.display()))?;
        let record: OrderRecord = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse order JSON: {}", path.display()))?;
        Ok(record)
    }

    /// Load an order, or start an empty one if it does not exist yet.
    pub async fn load_or_new(&self, order_id: &str) -> Result<OrderRecord> {
        if self.path_for(order_id)?.exists() {
            self.load(order_id).await
        } else {
            Ok(OrderRecord::new(order_id))
        }
    }

    /// Write the record (temp file + rename). The previous version is kept
    /// as `<order_id>.json.bak.1`, older ones shift up to `max_backups`.
    pub async fn save(&self, record: &OrderRecord) -> Result<PathBuf> {
        let path = self.path_for(&record.order_id)?;
        if path.exists() && self.max_backups > 0 {
            self.rotate_backups(&path).await;
        }

        let json = serde_json::to_string_pretty(record).context("Failed to serialize order")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes())
            .await
            .with_context(|| format!("Failed to write temp order: {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to rename temp order to: {}", path.display()))?;

        info!(order = %record.order_id, lines = record.line_count(), "Saved order");
        Ok(path)
    }

    async fn rotate_backups(&self, path: &Path) {
        for i in (1..self.max_backups).rev() {
            let old = path.with_extension(format!("json.bak.{i}"));
            if old.exists() {
                let new = path.with_extension(format!("json.bak.{}", i + 1));
                if let Err(e) = fs::rename(&old, &new).await {
                    warn!(backup = %old.display(), error = %e, "Failed to rotate order backup");
                }
            }
        }
        let bak = path.with_extension("json.bak.1");
        if let Err(e) = fs::copy(path, &bak).await {
            warn!(backup = %bak.display(), error = %e, "Failed to create order backup");
        }
    }

    /// Merge a mapping into `page`/`line` of the order and write it back.
    ///
    /// Failed mappings are refused so a provider outage never touches the
    /// record.
    pub async fn merge_mapping(
        &self,
        order_id: &str,
        page: u32,
        line: u32,
        shape: &CatalogShape,
        result: &MappingResult,
    ) -> Result<OrderRecord> {
        if let Some(error) = &result.error {
            return Err(BendlineError::Store(format!(
                "not merging failed mapping into {order_id} page {page} line {line}: {error}"
            ))
            .into());
        }

        let _guard = self.write_lock.lock().await;
        let mut record = self.load_or_new(order_id).await?;
        let conflicted = record.line_for_shape(page, line, shape).merge(result);
        if !conflicted.is_empty() {
            warn!(
                order = %order_id,
                page,
                line,
                letters = %conflicted.join(","),
                "Reviewed values kept; model readings stored as conflicts"
            );
        }
        record.touch();
        let path = self.save(&record).await?;

        PipelineEventLogger::log_event(
            Uuid::new_v4(),
            PipelineEvent::RecordWritten {
                order_id: order_id.to_string(),
                path: path.display().to_string(),
            },
        );
        Ok(record)
    }

    /// Operator edit of one letter. The line must exist and carry the letter.
    pub async fn set_value(
        &self,
        order_id: &str,
        page: u32,
        line: u32,
        letter: &str,
        value: Option<f64>,
    ) -> Result<OrderRecord> {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(BendlineError::Store(format!("invalid value {v} for '{letter}'")).into());
            }
        }

        let _guard = self.write_lock.lock().await;
        let mut record = self.load(order_id).await?;
        let target = record.line_mut(page, line).ok_or_else(|| {
            BendlineError::Store(format!("order {order_id} has no page {page} line {line}"))
        })?;
        if !target.values.contains_key(letter) {
            return Err(BendlineError::Store(format!(
                "shape {} has no letter '{letter}'",
                target.shape
            ))
            .into());
        }
        target.set_reviewed(letter, value);
        record.touch();
        self.save(&record).await?;

        PipelineEventLogger::log_event(
            Uuid::new_v4(),
            PipelineEvent::OperatorEdit {
                order_id: order_id.to_string(),
                page,
                line,
                letter: letter.to_string(),
                value,
            },
        );
        Ok(record)
    }

    /// Order ids present in the store, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .with_context(|| format!("Failed to list orders: {}", self.root.display()))?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name.strip_suffix(".json") {
                if validate_order_id(id).is_ok() {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
