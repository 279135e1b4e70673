use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_types::Text;
use crate::{
    models::lead_models::AdminUser,
    schema::admin_users,
    DbPool,
};

sql_function! {
    fn lower(x: Text) -> Text;
}

/// Read access to the dashboard allow-list. Rows are inserted out-of-band;
/// this repository never creates or mutates them.
pub struct AdminCore {
    pool: DbPool,
}

impl AdminCore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn find_by_email(&self, search_email: &str) -> Result<Option<AdminUser>, DieselError> {
        let mut conn = self.pool.get().expect("Failed to get DB connection");
        let admin = admin_users::table
            .filter(lower(admin_users::email).eq(lower(search_email)))
            .first::<AdminUser>(&mut conn)
            .optional()?;
        Ok(admin)
    }

    pub fn find_by_id(&self, admin_id: i32) -> Result<Option<AdminUser>, DieselError> {
        let mut conn = self.pool.get().expect("Failed to get DB connection");
        let admin = admin_users::table
            .find(admin_id)
            .first::<AdminUser>(&mut conn)
            .optional()?;
        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::r2d2::{self, ConnectionManager};
    use diesel_migrations::MigrationHarness;

    fn core_with_admin(email: &str) -> AdminCore {
        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("Failed to create pool");
        let mut conn = pool.get().expect("Failed to get DB connection");
        conn.run_pending_migrations(crate::MIGRATIONS)
            .expect("Failed to run migrations");
        diesel::insert_into(admin_users::table)
            .values((
                admin_users::email.eq(email),
                admin_users::password_hash.eq("$2b$10$fakefakefakefakefakefake"),
                admin_users::role.eq("admin"),
                admin_users::created_at.eq(1_000),
            ))
            .execute(&mut conn)
            .unwrap();
        AdminCore::new(pool)
    }

    #[test]
    fn find_by_email_is_case_insensitive() {
        let core = core_with_admin("ops@shoc.com.ar");
        let admin = core.find_by_email("OPS@SHOC.com.AR").unwrap();
        assert_eq!(admin.unwrap().role, "admin");
    }

    #[test]
    fn unknown_email_is_none() {
        let core = core_with_admin("ops@shoc.com.ar");
        assert!(core.find_by_email("intruder@shoc.com.ar").unwrap().is_none());
    }

    #[test]
    fn find_by_id_round_trips() {
        let core = core_with_admin("ops@shoc.com.ar");
        let admin = core.find_by_id(1).unwrap().unwrap();
        assert_eq!(admin.email, "ops@shoc.com.ar");
        assert!(core.find_by_id(99).unwrap().is_none());
    }
}
