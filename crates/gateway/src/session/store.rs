// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session persistence over the KV adapter: composite keys, deep-merge
//! updates, named slots, and elapsed-time tracking.

use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::kv::{Kv, KvError};
use crate::session::{epoch_ms, now_stamp, offset_for, AuthStatus, Session, SessionKey, Slot};

pub struct SessionStore {
    kv: Arc<dyn Kv>,
    prefix: String,
    ttl: u64,
    offset: FixedOffset,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn Kv>, prefix: impl Into<String>, ttl: u64, timezone: &str) -> Self {
        let offset = offset_for(timezone).unwrap_or_else(|| {
            warn!(timezone, "unknown timezone, session stamps fall back to UTC");
            Utc.fix()
        });
        Self { kv, prefix: prefix.into(), ttl, offset }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl
    }

    /// Wall-clock stamp in the configured timezone.
    pub fn stamp(&self) -> String {
        now_stamp(self.offset)
    }

    /// A key under this store's prefix but outside any session's key space.
    pub fn prefixed(&self, suffix: &str) -> String {
        format!("{}:{}", self.prefix, suffix)
    }

    fn record_key(&self, key: &SessionKey) -> String {
        format!(
            "{}:{}:{}:{}",
            self.prefix,
            key.msisdn,
            key.session_id,
            key.shortcode_segment()
        )
    }

    fn start_key(&self, key: &SessionKey) -> String {
        format!("{}:start", self.record_key(key))
    }

    fn slot_key(&self, key: &SessionKey, slot: &Slot) -> String {
        format!("{}:{}", self.record_key(key), slot.as_str())
    }

    // -- Record lifecycle -----------------------------------------------------

    /// Build and persist the default record for a triple, plus the `:start`
    /// anchor. An existing record is overwritten: the aggregator picks a
    /// fresh session id per call, so a collision is a reused id.
    pub async fn create(&self, key: &SessionKey) -> Result<Session, KvError> {
        let now = self.stamp();
        let session = Session {
            current_menu: "home".to_owned(),
            menu_history: vec!["home".to_owned()],
            customer_data: None,
            auth_status: AuthStatus::Pending,
            transaction_count: 0,
            session_start: now.clone(),
            last_activity: now,
            session_end: None,
            last_transaction: None,
            created_at_millis: epoch_ms(),
        };
        self.write(key, &session).await?;
        self.kv
            .set(
                &self.start_key(key),
                session.created_at_millis.to_string().as_bytes(),
                Some(self.ttl),
            )
            .await?;
        Ok(session)
    }

    /// Fetch the record for a triple. A hit refreshes the TTL by rewriting
    /// the value; the `:start` anchor is left alone so elapsed time keeps
    /// counting from creation.
    pub async fn get(&self, key: &SessionKey) -> Result<Option<Session>, KvError> {
        let Some(bytes) = self.kv.get(&self.record_key(key)).await? else {
            return Ok(None);
        };
        let session: Session = match serde_json::from_slice(&bytes) {
            Ok(session) => session,
            Err(err) => {
                warn!(session_id = %key.session_id, err = %err, "corrupt session record, discarding");
                return Ok(None);
            }
        };
        self.write(key, &session).await?;
        Ok(Some(session))
    }

    /// Deep-merge `patch` into the stored record and refresh `lastActivity`.
    /// Object fields merge recursively; arrays and scalars in the patch
    /// replace. `createdAtMillis` survives any patch.
    pub async fn update(&self, key: &SessionKey, patch: Value) -> Result<Option<Session>, KvError> {
        let Some(bytes) = self.kv.get(&self.record_key(key)).await? else {
            return Ok(None);
        };
        let mut record: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        let anchor = record.get("createdAtMillis").cloned();

        deep_merge(&mut record, patch);
        if let Some(anchor) = anchor {
            record["createdAtMillis"] = anchor;
        }
        record["lastActivity"] = Value::String(self.stamp());

        let session: Session = serde_json::from_value(record).map_err(KvError::unavailable)?;
        self.write(key, &session).await?;
        Ok(Some(session))
    }

    /// Delete the record and the `:start` anchor. Slots are left to expire
    /// by TTL.
    pub async fn clear(&self, key: &SessionKey) -> Result<(), KvError> {
        self.kv.del(&self.record_key(key)).await?;
        self.kv.del(&self.start_key(key)).await
    }

    async fn write(&self, key: &SessionKey, session: &Session) -> Result<(), KvError> {
        let bytes = serde_json::to_vec(session).map_err(KvError::unavailable)?;
        self.kv.set(&self.record_key(key), &bytes, Some(self.ttl)).await
    }

    // -- Slots ----------------------------------------------------------------

    /// Put a named slot value, JSON-encoded, with the session TTL.
    pub async fn store<T: Serialize>(
        &self,
        key: &SessionKey,
        slot: &Slot,
        value: &T,
    ) -> Result<(), KvError> {
        let bytes = serde_json::to_vec(value).map_err(KvError::unavailable)?;
        self.kv.set(&self.slot_key(key, slot), &bytes, Some(self.ttl)).await
    }

    /// Read a slot back as its typed value, or `None` when absent.
    pub async fn grab<T: DeserializeOwned>(
        &self,
        key: &SessionKey,
        slot: &Slot,
    ) -> Result<Option<T>, KvError> {
        let Some(bytes) = self.kv.get(&self.slot_key(key, slot)).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(slot = %slot.as_str(), err = %err, "slot holds unexpected shape, discarding");
                self.kv.del(&self.slot_key(key, slot)).await?;
                Ok(None)
            }
        }
    }

    /// Whether a slot currently holds a value.
    pub async fn possess(&self, key: &SessionKey, slot: &Slot) -> Result<bool, KvError> {
        Ok(self.kv.get(&self.slot_key(key, slot)).await?.is_some())
    }

    /// Delete one or more slots.
    pub async fn blank(&self, key: &SessionKey, slots: &[Slot]) -> Result<(), KvError> {
        for slot in slots {
            self.kv.del(&self.slot_key(key, slot)).await?;
        }
        Ok(())
    }

    // -- Bookkeeping ----------------------------------------------------------

    /// Seconds since session creation per the `:start` anchor, 0 when the
    /// anchor is gone.
    pub async fn elapsed_seconds(&self, key: &SessionKey) -> Result<u64, KvError> {
        let Some(bytes) = self.kv.get(&self.start_key(key)).await? else {
            return Ok(0);
        };
        let start: u64 =
            String::from_utf8_lossy(&bytes).trim().parse().unwrap_or_else(|_| epoch_ms());
        Ok(epoch_ms().saturating_sub(start) / 1000)
    }

    /// Bump `transactionCount` and stamp `lastTransaction`.
    pub async fn increment_transaction_count(
        &self,
        key: &SessionKey,
    ) -> Result<Option<Session>, KvError> {
        let Some(session) = self.get(key).await? else {
            return Ok(None);
        };
        self.update(
            key,
            serde_json::json!({
                "transactionCount": session.transaction_count + 1,
                "lastTransaction": self.stamp(),
            }),
        )
        .await
    }

    /// Round-trip probe: a session store is healthy when a write under its
    /// prefix reads back.
    pub async fn healthy(&self) -> bool {
        let key = self.prefixed("healthcheck");
        let stamp = epoch_ms().to_string();
        if self.kv.set(&key, stamp.as_bytes(), Some(5)).await.is_err() {
            return false;
        }
        matches!(self.kv.get(&key).await, Ok(Some(bytes)) if bytes == stamp.as_bytes())
    }

    /// Today's `YYYYMMDD` in the configured timezone, plus the seconds
    /// left until local midnight (TTL for daily aggregates).
    pub fn daily_window(&self) -> (String, u64) {
        let now = Utc::now().with_timezone(&self.offset);
        let date = now.format("%Y%m%d").to_string();
        let remaining = now
            .date_naive()
            .succ_opt()
            .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
            .and_then(|midnight| midnight.and_local_timezone(self.offset).single())
            .and_then(|midnight| {
                let secs = midnight.signed_duration_since(now).num_seconds();
                (secs > 0).then_some(secs as u64)
            })
            .unwrap_or(86_400);
        (date, remaining)
    }
}

/// Recursive object merge; arrays and scalars in `patch` replace.
fn deep_merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (field, value) in patch {
                match target.get_mut(&field) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value);
                    }
                    _ => {
                        target.insert(field, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
