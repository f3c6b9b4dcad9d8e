use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use crate::workflow::PaperStatus;

use super::{
    DbPool, NewPaper, NewUser, Paper, PaperReviewer, PaperRow, Role, Store, StoreError,
    StoreResult, User, UserRow,
};

const USER_COLUMNS: &str = "id, email, first_name, last_name, active";
const PAPER_COLUMNS: &str =
    "id, title, abstract_text, media_ref, media_type, status, submitted_by, created_at";

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }
}

async fn load_users(conn: &mut PgConnection, rows: Vec<UserRow>) -> StoreResult<Vec<User>> {
    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    let role_rows = sqlx::query_as::<_, (i32, String)>(
        r#"
        SELECT ur.user_id, r.name
        FROM user_roles ur
        JOIN roles r ON r.id = ur.role_id
        WHERE ur.user_id = ANY($1)
        ORDER BY r.id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut roles: HashMap<i32, Vec<Role>> = HashMap::new();
    for (user_id, name) in role_rows {
        if let Some(role) = Role::from_name(&name) {
            roles.entry(user_id).or_default().push(role);
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let user_roles = roles.remove(&row.id).unwrap_or_default();
            User::from_row(row, user_roles)
        })
        .collect())
}

async fn load_papers(conn: &mut PgConnection, rows: Vec<PaperRow>) -> StoreResult<Vec<Paper>> {
    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    let author_rows = sqlx::query_as::<_, (i32, i32)>(
        "SELECT paper_id, author_id FROM paper_authors WHERE paper_id = ANY($1) ORDER BY paper_id, ordinal",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut authors: HashMap<i32, Vec<i32>> = HashMap::new();
    for (paper_id, author_id) in author_rows {
        authors.entry(paper_id).or_default().push(author_id);
    }

    rows.into_iter()
        .map(|row| {
            let paper_authors = authors.remove(&row.id).unwrap_or_default();
            Paper::from_row(row, paper_authors)
        })
        .collect()
}

async fn papers_by_ids(conn: &mut PgConnection, ids: &[i32]) -> StoreResult<Vec<Paper>> {
    let rows = sqlx::query_as::<_, PaperRow>(&format!(
        "SELECT {} FROM papers WHERE id = ANY($1) ORDER BY id",
        PAPER_COLUMNS
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    load_papers(conn, rows).await
}

async fn lock_user(conn: &mut PgConnection, user_id: i32) -> StoreResult<()> {
    sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| StoreError::missing("user", user_id))
}

fn conflict_on_unique(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    let unique = err
        .as_database_error()
        .map_or(false, |db_err| db_err.is_unique_violation());
    if unique {
        StoreError::Conflict(what())
    } else {
        StoreError::Database(err)
    }
}

async fn find_or_create_role(conn: &mut PgConnection, role: Role) -> StoreResult<i32> {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO roles (name, label) VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(role.name())
    .bind(role.label())
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

async fn holds_role(conn: &mut PgConnection, user_id: i32, role: Role) -> StoreResult<bool> {
    let held = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM user_roles ur JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1 AND r.name = $2
        )
        "#,
    )
    .bind(user_id)
    .bind(role.name())
    .fetch_one(&mut *conn)
    .await?;
    Ok(held)
}

async fn apply_role(
    conn: &mut PgConnection,
    user_id: i32,
    role: Role,
    present: bool,
) -> StoreResult<()> {
    if present {
        let role_id = find_or_create_role(conn, role).await?;
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&mut *conn)
        .await?;
        return Ok(());
    }

    if role == Role::Admin {
        return Err(StoreError::Conflict("the admin role cannot be revoked".into()));
    }

    sqlx::query(
        r#"
        DELETE FROM user_roles
        WHERE user_id = $1 AND role_id IN (SELECT id FROM roles WHERE name = $2)
        "#,
    )
    .bind(user_id)
    .bind(role.name())
    .execute(&mut *conn)
    .await?;

    if role == Role::Reviewer {
        sqlx::query("DELETE FROM paper_reviewers WHERE reviewer_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.users_by_ids(&[id]).await?.into_iter().next())
    }

    async fn users_by_ids(&self, ids: &[i32]) -> StoreResult<Vec<User>> {
        let mut conn = self.pool().acquire().await?;
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ANY($1) ORDER BY id",
            USER_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;
        load_users(&mut conn, rows).await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut conn = self.pool().acquire().await?;
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY last_name, first_name, id",
            USER_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await?;
        load_users(&mut conn, rows).await
    }

    async fn count_users(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    async fn create_user(&self, user: NewUser, roles: &[Role]) -> StoreResult<User> {
        let mut tx = self.pool().begin().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, first_name, last_name, active)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("email {} is taken", user.email)))?;

        for role in roles {
            apply_role(&mut tx, row.id, *role, true).await?;
        }
        tx.commit().await?;

        Ok(User::from_row(row, roles.to_vec()))
    }

    async fn set_user_active(&self, id: i32, active: bool) -> StoreResult<()> {
        let updated = sqlx::query("UPDATE users SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(self.pool())
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(StoreError::missing("user", id));
        }
        Ok(())
    }

    async fn set_role(&self, user_id: i32, role: Role, present: bool) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;
        lock_user(&mut tx, user_id).await?;
        if !present && !holds_role(&mut tx, user_id, role).await? {
            return Ok(());
        }
        apply_role(&mut tx, user_id, role, present).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn toggle_role(&self, user_id: i32, role: Role) -> StoreResult<bool> {
        let mut tx = self.pool().begin().await?;
        lock_user(&mut tx, user_id).await?;
        let present = !holds_role(&mut tx, user_id, role).await?;
        apply_role(&mut tx, user_id, role, present).await?;
        tx.commit().await?;
        Ok(present)
    }

    async fn create_paper(&self, paper: NewPaper) -> StoreResult<Paper> {
        let mut tx = self.pool().begin().await?;

        let known: HashSet<i32> =
            sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = ANY($1)")
                .bind(&paper.authors)
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .collect();
        if let Some(missing) = paper.authors.iter().find(|id| !known.contains(*id)) {
            return Err(StoreError::missing("user", *missing));
        }

        let row = sqlx::query_as::<_, PaperRow>(&format!(
            r#"
            INSERT INTO papers (title, abstract_text, status, submitted_by)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            PAPER_COLUMNS
        ))
        .bind(&paper.title)
        .bind(&paper.abstract_text)
        .bind(PaperStatus::Submitted.code())
        .bind(paper.submitted_by)
        .fetch_one(&mut *tx)
        .await?;

        for (ordinal, author_id) in paper.authors.iter().enumerate() {
            let ordinal = i16::try_from(ordinal).map_err(|_| {
                StoreError::Conflict(format!("paper {} has too many authors", row.id))
            })?;
            sqlx::query(
                "INSERT INTO paper_authors (paper_id, author_id, ordinal) VALUES ($1, $2, $3)",
            )
            .bind(row.id)
            .bind(author_id)
            .bind(ordinal)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                conflict_on_unique(e, || {
                    format!("author {} is listed more than once", author_id)
                })
            })?;
        }
        tx.commit().await?;

        Paper::from_row(row, paper.authors)
    }

    async fn find_paper(&self, id: i32) -> StoreResult<Option<Paper>> {
        let mut conn = self.pool().acquire().await?;
        Ok(papers_by_ids(&mut conn, &[id]).await?.into_iter().next())
    }

    async fn list_papers(&self) -> StoreResult<Vec<Paper>> {
        let mut conn = self.pool().acquire().await?;
        let rows = sqlx::query_as::<_, PaperRow>(&format!(
            "SELECT {} FROM papers ORDER BY id",
            PAPER_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await?;
        load_papers(&mut conn, rows).await
    }

    async fn papers_for_member(&self, user_id: i32) -> StoreResult<Vec<Paper>> {
        let mut conn = self.pool().acquire().await?;
        let rows = sqlx::query_as::<_, PaperRow>(&format!(
            r#"
            SELECT {} FROM papers p
            WHERE p.submitted_by = $1
               OR EXISTS (SELECT 1 FROM paper_authors a WHERE a.paper_id = p.id AND a.author_id = $1)
            ORDER BY p.id
            "#,
            PAPER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        load_papers(&mut conn, rows).await
    }

    async fn papers_for_reviewer(
        &self,
        reviewer_id: i32,
    ) -> StoreResult<Vec<(Paper, PaperReviewer)>> {
        let mut conn = self.pool().acquire().await?;
        let assignments = sqlx::query_as::<_, PaperReviewer>(
            "SELECT id, paper_id, reviewer_id, score FROM paper_reviewers WHERE reviewer_id = $1 ORDER BY id",
        )
        .bind(reviewer_id)
        .fetch_all(&mut *conn)
        .await?;

        let ids: Vec<i32> = assignments.iter().map(|a| a.paper_id).collect();
        let mut papers: HashMap<i32, Paper> = papers_by_ids(&mut conn, &ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        assignments
            .into_iter()
            .map(|a| {
                papers
                    .remove(&a.paper_id)
                    .map(|p| (p, a.clone()))
                    .ok_or_else(|| StoreError::missing("paper", a.paper_id))
            })
            .collect()
    }

    async fn set_paper_status(&self, id: i32, status: PaperStatus) -> StoreResult<()> {
        let updated = sqlx::query("UPDATE papers SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.code())
            .execute(self.pool())
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(StoreError::missing("paper", id));
        }
        Ok(())
    }

    async fn set_paper_media(
        &self,
        id: i32,
        media_ref: &str,
        media_type: &str,
    ) -> StoreResult<Option<String>> {
        let replaced = sqlx::query_scalar::<_, Option<String>>(
            r#"
            WITH old AS (SELECT id, media_ref FROM papers WHERE id = $1 FOR UPDATE)
            UPDATE papers p SET media_ref = $2, media_type = $3
            FROM old WHERE p.id = old.id
            RETURNING old.media_ref
            "#,
        )
        .bind(id)
        .bind(media_ref)
        .bind(media_type)
        .fetch_optional(self.pool())
        .await?;
        replaced.ok_or_else(|| StoreError::missing("paper", id))
    }

    async fn reviewers_for_paper(&self, paper_id: i32) -> StoreResult<Vec<PaperReviewer>> {
        let rows = sqlx::query_as::<_, PaperReviewer>(
            "SELECT id, paper_id, reviewer_id, score FROM paper_reviewers WHERE paper_id = $1 ORDER BY id",
        )
        .bind(paper_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn set_assignment(
        &self,
        paper_id: i32,
        reviewer_id: i32,
        assigned: bool,
    ) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;

        let paper_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM papers WHERE id = $1)")
                .bind(paper_id)
                .fetch_one(&mut *tx)
                .await?;
        if !paper_exists {
            return Err(StoreError::missing("paper", paper_id));
        }

        if assigned {
            lock_user(&mut tx, reviewer_id).await?;
            if !holds_role(&mut tx, reviewer_id, Role::Reviewer).await? {
                return Err(StoreError::Conflict(format!(
                    "user {} does not hold the reviewer role",
                    reviewer_id
                )));
            }
            sqlx::query(
                r#"
                INSERT INTO paper_reviewers (paper_id, reviewer_id) VALUES ($1, $2)
                ON CONFLICT (paper_id, reviewer_id) DO NOTHING
                "#,
            )
            .bind(paper_id)
            .bind(reviewer_id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query("DELETE FROM paper_reviewers WHERE paper_id = $1 AND reviewer_id = $2")
                .bind(paper_id)
                .bind(reviewer_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn record_score(&self, paper_id: i32, reviewer_id: i32, score: i32) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;

        let updated = sqlx::query(
            "UPDATE paper_reviewers SET score = $3 WHERE paper_id = $1 AND reviewer_id = $2",
        )
        .bind(paper_id)
        .bind(reviewer_id)
        .bind(score)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(StoreError::NotFound(format!(
                "assignment of reviewer {} to paper {}",
                reviewer_id, paper_id
            )));
        }

        sqlx::query("UPDATE papers SET status = $2 WHERE id = $1 AND status = $3")
            .bind(paper_id)
            .bind(PaperStatus::UnderReview.code())
            .bind(PaperStatus::Submitted.code())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
