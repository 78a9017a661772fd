use chrono::Utc;
use iqac_common::models::{Slot, Timetable, TimetableInput};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

const SELECT_TIMETABLE: &str = "SELECT t.*, d.name AS department_name \
     FROM timetables t JOIN departments d ON d.id = t.department_id";

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TimetableFilter {
    pub department_id: Option<Uuid>,
    pub semester: Option<i64>,
    pub academic_year: Option<String>,
}

/// Timetables matching the filter, ordered by department, semester and
/// section
pub async fn list(pool: &SqlitePool, filter: &TimetableFilter) -> sqlx::Result<Vec<Timetable>> {
    let mut query = QueryBuilder::<Sqlite>::new(SELECT_TIMETABLE);
    query.push(" WHERE 1 = 1");
    if let Some(department_id) = filter.department_id {
        query.push(" AND t.department_id = ").push_bind(department_id);
    }
    if let Some(semester) = filter.semester {
        query.push(" AND t.semester = ").push_bind(semester);
    }
    if let Some(year) = filter.academic_year.as_deref().filter(|y| !y.is_empty()) {
        query.push(" AND t.academic_year = ").push_bind(year.to_string());
    }
    query.push(" ORDER BY d.name COLLATE NOCASE, t.academic_year DESC, t.semester, t.section");

    query.build_query_as::<Timetable>().fetch_all(pool).await
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Timetable>> {
    sqlx::query_as::<_, Timetable>(&format!("{} WHERE t.id = ?", SELECT_TIMETABLE))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// The timetable occupying a (department, semester, year, section) key
pub async fn find_by_key(
    pool: &SqlitePool,
    department_id: Uuid,
    semester: i64,
    academic_year: &str,
    section: &str,
) -> sqlx::Result<Option<Timetable>> {
    sqlx::query_as::<_, Timetable>(&format!(
        "{} WHERE t.department_id = ? AND t.semester = ? AND t.academic_year = ? AND t.section = ?",
        SELECT_TIMETABLE
    ))
    .bind(department_id)
    .bind(semester)
    .bind(academic_year)
    .bind(section)
    .fetch_optional(pool)
    .await
}

/// All timetables of an academic year except `exclude`
pub async fn others_in_year(
    pool: &SqlitePool,
    academic_year: &str,
    exclude: Option<Uuid>,
) -> sqlx::Result<Vec<Timetable>> {
    let mut query = QueryBuilder::<Sqlite>::new(SELECT_TIMETABLE);
    query.push(" WHERE t.academic_year = ").push_bind(academic_year.to_string());
    if let Some(id) = exclude {
        query.push(" AND t.id != ").push_bind(id);
    }
    query.build_query_as::<Timetable>().fetch_all(pool).await
}

pub async fn insert(
    pool: &SqlitePool,
    input: &TimetableInput,
    created_by: Uuid,
) -> sqlx::Result<Timetable> {
    let id = iqac_common::uuid_utils::generate();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO timetables (id, department_id, semester, academic_year, section, slots,
                                created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(input.department_id)
    .bind(input.semester)
    .bind(&input.academic_year)
    .bind(input.section.as_deref().unwrap_or_default())
    .bind(Json(&input.slots))
    .bind(created_by)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn replace_slots(pool: &SqlitePool, id: Uuid, slots: &[Slot]) -> sqlx::Result<()> {
    sqlx::query("UPDATE timetables SET slots = ?, updated_at = ? WHERE id = ?")
        .bind(Json(slots))
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM timetables WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
