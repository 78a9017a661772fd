use chrono::Utc;
use iqac_common::models::{Feedback, FeedbackInput, FeedbackSummary, FeedbackType, User};
use iqac_common::Role;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

const SELECT_FEEDBACK: &str = "SELECT f.*, s.name AS student_name, \
     COALESCE(t.name, c.title) AS target_name \
     FROM feedback f \
     LEFT JOIN users s ON s.id = f.student_id \
     LEFT JOIN users t ON t.id = f.target_user_id \
     LEFT JOIN records c ON c.id = f.target_record_id";

/// Which feedback a reader may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackScope {
    All,
    Department(Uuid),
    /// Feedback about a teacher or about courses they own
    Teacher(Uuid),
    /// A student's own submissions
    Student(Uuid),
}

impl FeedbackScope {
    pub fn for_user(user: &User) -> Self {
        match (user.role, user.department_id) {
            (Role::Admin, _) => FeedbackScope::All,
            (Role::Coordinator, Some(department_id)) => FeedbackScope::Department(department_id),
            (Role::Faculty, _) | (Role::Coordinator, None) => FeedbackScope::Teacher(user.id),
            (Role::Student, _) | (Role::Sports, _) => FeedbackScope::Student(user.id),
        }
    }

    fn push_filter(&self, query: &mut QueryBuilder<'_, Sqlite>) {
        match *self {
            FeedbackScope::All => {}
            FeedbackScope::Department(department_id) => {
                query.push(" AND f.department_id = ").push_bind(department_id);
            }
            FeedbackScope::Teacher(user_id) => {
                query
                    .push(" AND (f.target_user_id = ")
                    .push_bind(user_id)
                    .push(" OR f.target_record_id IN (SELECT id FROM records WHERE owner_id = ")
                    .push_bind(user_id)
                    .push("))");
            }
            FeedbackScope::Student(user_id) => {
                query.push(" AND f.student_id = ").push_bind(user_id);
            }
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FeedbackFilter {
    pub feedback_type: Option<FeedbackType>,
    pub academic_year: Option<String>,
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &FeedbackFilter) {
    if let Some(feedback_type) = filter.feedback_type {
        query.push(" AND f.feedback_type = ").push_bind(feedback_type);
    }
    if let Some(year) = filter.academic_year.as_deref().filter(|y| !y.is_empty()) {
        query.push(" AND f.academic_year = ").push_bind(year.to_string());
    }
}

/// Feedback inside `scope`, newest first (identities not yet redacted)
pub async fn list(
    pool: &SqlitePool,
    scope: FeedbackScope,
    filter: &FeedbackFilter,
) -> sqlx::Result<Vec<Feedback>> {
    let mut query = QueryBuilder::<Sqlite>::new(SELECT_FEEDBACK);
    query.push(" WHERE 1 = 1");
    scope.push_filter(&mut query);
    push_filter(&mut query, filter);
    query.push(" ORDER BY f.created_at DESC");

    query.build_query_as::<Feedback>().fetch_all(pool).await
}

pub async fn summary(
    pool: &SqlitePool,
    scope: FeedbackScope,
    filter: &FeedbackFilter,
) -> sqlx::Result<Vec<FeedbackSummary>> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT f.feedback_type, COUNT(*) AS count, AVG(f.rating) AS average_rating \
         FROM feedback f WHERE 1 = 1",
    );
    scope.push_filter(&mut query);
    push_filter(&mut query, filter);
    query.push(" GROUP BY f.feedback_type ORDER BY f.feedback_type");

    query.build_query_as::<FeedbackSummary>().fetch_all(pool).await
}

/// Whether the student already rated this target in this academic year
pub async fn exists_for(
    pool: &SqlitePool,
    student_id: Uuid,
    input: &FeedbackInput,
) -> sqlx::Result<bool> {
    sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM feedback
            WHERE student_id = ? AND feedback_type = ? AND academic_year = ?
              AND target_user_id IS ? AND target_record_id IS ?
        )
        "#,
    )
    .bind(student_id)
    .bind(input.feedback_type)
    .bind(&input.academic_year)
    .bind(input.target_user_id)
    .bind(input.target_record_id)
    .fetch_one(pool)
    .await
}

pub async fn insert(
    pool: &SqlitePool,
    student_id: Uuid,
    input: &FeedbackInput,
    department_id: Option<Uuid>,
) -> sqlx::Result<Feedback> {
    let id = iqac_common::uuid_utils::generate();
    sqlx::query(
        r#"
        INSERT INTO feedback (id, student_id, feedback_type, target_user_id, target_record_id,
                              department_id, academic_year, semester, rating, comments,
                              is_anonymous, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(student_id)
    .bind(input.feedback_type)
    .bind(input.target_user_id)
    .bind(input.target_record_id)
    .bind(department_id)
    .bind(&input.academic_year)
    .bind(input.semester)
    .bind(input.rating)
    .bind(&input.comments)
    .bind(input.is_anonymous)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Feedback>(&format!("{} WHERE f.id = ?", SELECT_FEEDBACK))
        .bind(id)
        .fetch_one(pool)
        .await
}
