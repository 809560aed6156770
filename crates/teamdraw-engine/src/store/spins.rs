use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use entity::spin_record;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;

use super::{page_bounds, Page, Store};
use crate::error::InviteError;
use crate::prize::PrizeKind;
use crate::util::{now_ts, uuid_v4};

#[derive(Clone, Debug)]
pub struct NewSpinRecord {
    pub spin_id: String,
    pub user_id: String,
    pub username: String,
    pub prize_name: String,
    pub status: PrizeKind,
    pub detail: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HourlySummary {
    /// `YYYY-MM-DD HH:00` in UTC.
    pub hour: String,
    pub win: u64,
    pub retry: u64,
    pub lose: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SpinOverview {
    pub total: u64,
    pub win: u64,
    pub retry: u64,
    pub lose: u64,
    pub unknown: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SpinStats {
    pub hourly: Vec<HourlySummary>,
    pub overview: SpinOverview,
}

fn hour_label(ts: i64) -> String {
    Utc.timestamp_opt(ts - ts.rem_euclid(3600), 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:00").to_string())
        .unwrap_or_default()
}

fn summarize(rows: impl IntoIterator<Item = (String, i64)>) -> SpinStats {
    let mut hourly: BTreeMap<String, HourlySummary> = BTreeMap::new();
    let mut overview = SpinOverview::default();

    for (status, created_at) in rows {
        let label = hour_label(created_at);
        let bucket = hourly.entry(label.clone()).or_insert_with(|| HourlySummary {
            hour: label,
            ..Default::default()
        });
        overview.total += 1;
        match status.as_str() {
            "win" => {
                bucket.win += 1;
                overview.win += 1;
            }
            "retry" => {
                bucket.retry += 1;
                overview.retry += 1;
            }
            "lose" => {
                bucket.lose += 1;
                overview.lose += 1;
            }
            _ => overview.unknown += 1,
        }
    }

    SpinStats {
        hourly: hourly.into_values().collect(),
        overview,
    }
}

impl Store {
    /// Insert or overwrite the audit row for `spin_id`.
    pub async fn record_spin(&self, record: &NewSpinRecord) -> Result<(), InviteError> {
        let spin_id = record.spin_id.trim();
        if spin_id.is_empty() {
            return Err(InviteError::InvalidInput("spin id is required".to_string()));
        }

        let row = spin_record::ActiveModel {
            id: Set(uuid_v4()),
            user_id: Set(record.user_id.clone()),
            username: Set(record.username.clone()),
            prize_name: Set(record.prize_name.clone()),
            status: Set(record.status.as_str().to_string()),
            detail: Set(record.detail.clone()),
            spin_id: Set(spin_id.to_string()),
            created_at: Set(now_ts()),
        };
        spin_record::Entity::insert(row)
            .on_conflict(
                OnConflict::column(spin_record::Column::SpinId)
                    .update_columns([
                        spin_record::Column::PrizeName,
                        spin_record::Column::Status,
                        spin_record::Column::Detail,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    pub async fn get_spin_record(&self, spin_id: &str) -> Result<Option<spin_record::Model>, InviteError> {
        Ok(spin_record::Entity::find()
            .filter(spin_record::Column::SpinId.eq(spin_id))
            .one(&self.db)
            .await?)
    }

    pub async fn list_spin_records(&self, limit: u64, offset: u64) -> Result<Page<spin_record::Model>, InviteError> {
        let (limit, offset) = page_bounds(limit, offset);
        let total = spin_record::Entity::find().count(&self.db).await?;
        let items = spin_record::Entity::find()
            .order_by_desc(spin_record::Column::CreatedAt)
            .order_by_desc(spin_record::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;
        Ok(Page { items, total })
    }

    /// Outcome counts per hour for every spin at or after `since`.
    pub async fn spin_stats(&self, since: i64) -> Result<SpinStats, InviteError> {
        let rows: Vec<(String, i64)> = spin_record::Entity::find()
            .select_only()
            .column(spin_record::Column::Status)
            .column(spin_record::Column::CreatedAt)
            .filter(spin_record::Column::CreatedAt.gte(since))
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(summarize(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_by_utc_hour() {
        // 2026-03-01 10:00:00 UTC
        let base = 1_772_359_200;
        let stats = summarize([
            ("win".to_string(), base + 5),
            ("lose".to_string(), base + 3599),
            ("retry".to_string(), base + 3600),
            ("bogus".to_string(), base + 3601),
        ]);

        assert_eq!(stats.hourly.len(), 2);
        assert_eq!(stats.hourly[0].hour, "2026-03-01 10:00");
        assert_eq!((stats.hourly[0].win, stats.hourly[0].lose), (1, 1));
        assert_eq!(stats.hourly[1].hour, "2026-03-01 11:00");
        assert_eq!(stats.hourly[1].retry, 1);
        assert_eq!(stats.overview.total, 4);
        assert_eq!(stats.overview.win + stats.overview.retry + stats.overview.lose, 3);
        assert_eq!(stats.overview.unknown, 1);
    }
}
