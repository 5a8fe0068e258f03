//! In-process course store

use async_trait::async_trait;
use sams_common::{Error, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::CourseStore;
use crate::voting::CourseRecord;

#[derive(Default)]
pub struct MemoryCourseStore {
    records: RwLock<HashMap<String, CourseRecord>>,
}

impl MemoryCourseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseStore for MemoryCourseStore {
    async fn get(&self, course_id: &str) -> Result<CourseRecord> {
        let records = self.records.read().await;
        Ok(records.get(course_id).cloned().unwrap_or_default())
    }

    async fn put(&self, course_id: &str, record: &CourseRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if record.is_empty() {
            records.remove(course_id);
        } else {
            records.insert(course_id.to_string(), record.clone());
        }
        Ok(())
    }

    async fn put_vote(&self, course_id: &str, user_id: &str, option: u32) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(course_id)
            .ok_or_else(|| Error::NotFound(format!("no proposals open for course '{}'", course_id)))?;
        record.votes.cast(user_id, option);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
