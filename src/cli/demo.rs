//! Demo data generation for local development.

use anyhow::{Result, anyhow};
use fake::{Fake, Faker};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName};
use fake::faker::phone_number::en::PhoneNumber;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::permissions;
use crate::utils::password::hash_password;

const DEMO_PASSWORD: &str = "password123";

/// Seeds one demo school with roles, staff, students, and parents.
///
/// Safe to run repeatedly: each run creates a fresh school with its own
/// staff and records.
pub async fn generate_demo_data(pool: &PgPool) -> Result<()> {
    let school_name = format!("{} Academy", LastName().fake::<String>());
    let school_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO schools (name, address, contact_email)
        VALUES ($1, $2, $3)
        RETURNING id"#,
    )
    .bind(&school_name)
    .bind(format!(
        "{} {} Street",
        (1..200u32).fake::<u32>(),
        LastName().fake::<String>()
    ))
    .bind(SafeEmail().fake::<String>())
    .fetch_one(pool)
    .await?;

    let admin_role = create_school_role(
        pool,
        school_id,
        "School Administrator",
        &[
            permissions::SCHOOLS_READ,
            permissions::SCHOOLS_UPDATE,
            permissions::USERS_CREATE,
            permissions::USERS_READ,
            permissions::USERS_UPDATE,
            permissions::ROLES_CREATE,
            permissions::ROLES_READ,
            permissions::ROLES_UPDATE,
            permissions::ROLES_DELETE,
            permissions::ROLES_ASSIGN,
            permissions::STUDENTS_CREATE,
            permissions::STUDENTS_READ,
            permissions::STUDENTS_UPDATE,
            permissions::STUDENTS_DELETE,
            permissions::PARENTS_CREATE,
            permissions::PARENTS_READ,
            permissions::PARENTS_UPDATE,
            permissions::PARENTS_DELETE,
            permissions::PARENTS_LINK,
            permissions::REPORTS_VIEW,
            permissions::REPORTS_EXPORT,
        ],
    )
    .await?;

    let teacher_role = create_school_role(
        pool,
        school_id,
        "Teacher",
        &[
            permissions::STUDENTS_READ,
            permissions::STUDENTS_UPDATE,
            permissions::PARENTS_READ,
            permissions::REPORTS_VIEW,
        ],
    )
    .await?;

    create_staff_member(pool, school_id, admin_role, "admin").await?;
    for _ in 0..5 {
        create_staff_member(pool, school_id, teacher_role, "teacher").await?;
    }

    let levels = ["Grade 1", "Grade 2", "Grade 3", "Grade 4", "Grade 5"];
    let mut student_ids = Vec::new();
    for n in 0..40u32 {
        let id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO students
                (school_id, first_name, last_name, admission_number, date_of_birth, level)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id"#,
        )
        .bind(school_id)
        .bind(FirstName().fake::<String>())
        .bind(LastName().fake::<String>())
        .bind(format!("ADM-{:04}", n + 1))
        .bind(Faker.fake::<chrono::NaiveDate>())
        .bind(levels[(n as usize) % levels.len()])
        .fetch_one(pool)
        .await?;
        student_ids.push(id);
    }

    for pair in student_ids.chunks(2) {
        let parent_id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO parents (school_id, first_name, last_name, email, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id"#,
        )
        .bind(school_id)
        .bind(FirstName().fake::<String>())
        .bind(LastName().fake::<String>())
        .bind(SafeEmail().fake::<String>())
        .bind(PhoneNumber().fake::<String>())
        .fetch_one(pool)
        .await?;

        for student_id in pair {
            sqlx::query(
                r#"INSERT INTO student_parents (student_id, parent_id, relationship)
                VALUES ($1, $2, 'guardian')
                ON CONFLICT (student_id, parent_id) DO NOTHING"#,
            )
            .bind(student_id)
            .bind(parent_id)
            .execute(pool)
            .await?;
        }
    }

    info!(school = %school_name, "Demo data generated (staff password: {DEMO_PASSWORD})");
    Ok(())
}

async fn create_school_role(
    pool: &PgPool,
    school_id: Uuid,
    name: &str,
    granted: &[&str],
) -> Result<Uuid> {
    let role_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO roles (name, description, school_id)
        VALUES ($1, $2, $3)
        RETURNING id"#,
    )
    .bind(name)
    .bind(format!("{name} (demo)"))
    .bind(school_id)
    .fetch_one(pool)
    .await?;

    for permission in granted {
        sqlx::query(
            r#"INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, id FROM permissions WHERE name = $2
            ON CONFLICT (role_id, permission_id) DO NOTHING"#,
        )
        .bind(role_id)
        .bind(permission)
        .execute(pool)
        .await?;
    }

    Ok(role_id)
}

async fn create_staff_member(
    pool: &PgPool,
    school_id: Uuid,
    role_id: Uuid,
    tag: &str,
) -> Result<Uuid> {
    let first: String = FirstName().fake();
    let last: String = LastName().fake();
    let email = format!(
        "{}.{}.{}@example.com",
        first.to_lowercase(),
        last.to_lowercase(),
        tag
    );
    let hashed = hash_password(DEMO_PASSWORD).map_err(|e| anyhow!(e.error))?;

    let user_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO users (first_name, last_name, email, password)
        VALUES ($1, $2, $3, $4)
        RETURNING id"#,
    )
    .bind(&first)
    .bind(&last)
    .bind(&email)
    .bind(&hashed)
    .fetch_one(pool)
    .await?;

    sqlx::query(
        r#"INSERT INTO user_school_roles (user_id, school_id, role_id, is_validated, accepted_at)
        VALUES ($1, $2, $3, TRUE, NOW())"#,
    )
    .bind(user_id)
    .bind(school_id)
    .bind(role_id)
    .execute(pool)
    .await?;

    Ok(user_id)
}
