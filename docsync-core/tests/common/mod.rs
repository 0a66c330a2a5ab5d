#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use docsync_core::contract::{
    Block, BlockRef, BoxError, DocumentStore, RecordProperties, RecordRef,
};

/// A record as the in-memory store holds it.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub props: RecordProperties,
    pub blocks: Vec<(String, Block)>,
}

impl StoredRecord {
    pub fn block_contents(&self) -> Vec<Block> {
        self.blocks.iter().map(|(_, b)| b.clone()).collect()
    }
}

/// In-memory `DocumentStore` with the same replace semantics as the real one.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, StoredRecord>>,
    /// Fail `delete_block` once this many deletions have succeeded.
    fail_delete_after: Mutex<Option<usize>>,
    deletions: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_deletes_after(&self, successful: usize) {
        *self.fail_delete_after.lock().unwrap() = Some(successful);
    }

    pub fn records(&self) -> BTreeMap<String, StoredRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn record_by_title(&self, title: &str) -> Option<(String, StoredRecord)> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|(_, r)| r.props.title == title)
            .map(|(id, r)| (id.clone(), r.clone()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_by_title(&self, title: &str) -> Result<Vec<RecordRef>, BoxError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.props.title == title)
            .map(|(id, _)| RecordRef { id: id.clone() })
            .collect())
    }

    async fn create_record(&self, props: &RecordProperties) -> Result<RecordRef, BoxError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.records.lock().unwrap().insert(
            id.clone(),
            StoredRecord {
                props: props.clone(),
                blocks: Vec::new(),
            },
        );
        Ok(RecordRef { id })
    }

    async fn update_properties(
        &self,
        record_id: &str,
        props: &RecordProperties,
    ) -> Result<(), BoxError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(record_id)
            .ok_or_else(|| format!("no record {record_id}"))?;
        record.props = props.clone();
        Ok(())
    }

    async fn list_child_blocks(&self, record_id: &str) -> Result<Vec<BlockRef>, BoxError> {
        let records = self.records.lock().unwrap();
        let record = records
            .get(record_id)
            .ok_or_else(|| format!("no record {record_id}"))?;
        Ok(record
            .blocks
            .iter()
            .map(|(id, _)| BlockRef { id: id.clone() })
            .collect())
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), BoxError> {
        let mut deletions = self.deletions.lock().unwrap();
        if let Some(limit) = *self.fail_delete_after.lock().unwrap() {
            if *deletions >= limit {
                return Err("simulated delete failure".into());
            }
        }
        let mut records = self.records.lock().unwrap();
        for record in records.values_mut() {
            if let Some(pos) = record.blocks.iter().position(|(id, _)| id == block_id) {
                record.blocks.remove(pos);
                *deletions += 1;
                return Ok(());
            }
        }
        Err(format!("no block {block_id}").into())
    }

    async fn append_child_blocks(
        &self,
        record_id: &str,
        blocks: Vec<Block>,
    ) -> Result<(), BoxError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(record_id)
            .ok_or_else(|| format!("no record {record_id}"))?;
        for block in blocks {
            record
                .blocks
                .push((uuid::Uuid::new_v4().to_string(), block));
        }
        Ok(())
    }
}

/// Write `files` (relative path, contents) under `root`, creating directories.
pub fn write_tree(root: &std::path::Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}
