use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_types::Integer;
use crate::{
    models::lead_models::{Lead, NewAnalyticsEvent, NewLead},
    schema::{analytics_events, leads},
    DbPool,
};

sql_function! {
    fn last_insert_rowid() -> Integer;
}

/// Write side of the submission pipeline. Kept as a trait so the pipeline
/// can run against a fake in tests.
#[cfg_attr(test, mockall::automock)]
pub trait LeadStore {
    fn insert_lead(&self, new_lead: NewLead) -> Result<i32, DieselError>;
    fn insert_event(&self, event: NewAnalyticsEvent) -> Result<(), DieselError>;
}

pub struct LeadRepository {
    pool: DbPool,
}

impl LeadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn get_all_leads(&self) -> Result<Vec<Lead>, DieselError> {
        let mut conn = self.pool.get().expect("Failed to get DB connection");
        leads::table
            .order(leads::created_at.desc())
            .load::<Lead>(&mut conn)
    }
}

impl LeadStore for LeadRepository {
    fn insert_lead(&self, new_lead: NewLead) -> Result<i32, DieselError> {
        let mut conn = self.pool.get().expect("Failed to get DB connection");
        diesel::insert_into(leads::table)
            .values(&new_lead)
            .execute(&mut conn)?;
        // same pooled connection, so this is the row we just wrote
        diesel::select(last_insert_rowid()).get_result::<i32>(&mut conn)
    }

    fn insert_event(&self, event: NewAnalyticsEvent) -> Result<(), DieselError> {
        let mut conn = self.pool.get().expect("Failed to get DB connection");
        diesel::insert_into(analytics_events::table)
            .values(&event)
            .execute(&mut conn)?;
        Ok(())
    }
}
