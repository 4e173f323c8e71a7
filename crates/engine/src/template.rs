//! Template rendering and template CRUD.
//!
//! Rendering substitutes recognized tokens from the contact/job pair and is a
//! pure function: rendering an already-rendered string returns it unchanged.
//! Three template names are system-reserved and cannot be renamed or deleted.

use sqlx::PgPool;
use uuid::Uuid;

use roster_common::error::AppError;
use roster_common::types::{Contact, Job, MessageTemplate};

/// System-reserved template names, seeded per organization.
pub const RESERVED_TEMPLATE_NAMES: &[&str] =
    &["Job Invitation", "Job Cancellation", "Job Update"];

/// Default bodies for the reserved templates, seeded on org creation.
const RESERVED_TEMPLATE_BODIES: &[(&str, &str)] = &[
    (
        "Job Invitation",
        "Hi {FirstName}, you are invited to {JobName} on {Date} at {Time}, {Location}. {Notes}",
    ),
    (
        "Job Cancellation",
        "Hi {FirstName}, {JobName} on {Date} has been cancelled.",
    ),
    (
        "Job Update",
        "Hi {FirstName}, {JobName} has been updated: {Date} at {Time}, {Location}. {Notes}",
    ),
];

/// Substitute recognized tokens into a template body.
///
/// Recognized tokens: `{FirstName}`, `{LastName}`, `{JobName}`, `{Date}`,
/// `{Time}`, `{Location}`, `{Notes}`. Unrecognized braces pass through
/// unchanged.
pub fn render(body: &str, contact: &Contact, job: &Job) -> String {
    let date = job.start_time.format("%b %-d, %Y").to_string();
    let time = job.start_time.format("%-I:%M %p").to_string();

    body.replace("{FirstName}", &contact.first_name)
        .replace("{LastName}", &contact.last_name)
        .replace("{JobName}", &job.name)
        .replace("{Date}", &date)
        .replace("{Time}", &time)
        .replace("{Location}", &job.location)
        .replace("{Notes}", &job.notes)
}

/// Parameters for creating a template.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateTemplateParams {
    pub name: String,
    pub body: String,
}

/// Parameters for updating a template.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UpdateTemplateParams {
    pub name: Option<String>,
    pub body: Option<String>,
}

/// Service layer for template CRUD.
pub struct TemplateService;

impl TemplateService {
    /// Seed the reserved templates for an organization. Idempotent.
    pub async fn seed_reserved(pool: &PgPool, org_id: Uuid) -> Result<(), AppError> {
        for (name, body) in RESERVED_TEMPLATE_BODIES {
            sqlx::query(
                r#"
                INSERT INTO templates (id, org_id, name, body, reserved)
                VALUES ($1, $2, $3, $4, true)
                ON CONFLICT (org_id, name) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(org_id)
            .bind(name)
            .bind(body)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    /// List all templates for an organization, reserved first.
    pub async fn list(pool: &PgPool, org_id: Uuid) -> Result<Vec<MessageTemplate>, AppError> {
        let templates: Vec<MessageTemplate> = sqlx::query_as(
            "SELECT * FROM templates WHERE org_id = $1 ORDER BY reserved DESC, name ASC",
        )
        .bind(org_id)
        .fetch_all(pool)
        .await?;

        Ok(templates)
    }

    /// Get a single template, scoped to the organization.
    pub async fn get(
        pool: &PgPool,
        org_id: Uuid,
        template_id: Uuid,
    ) -> Result<MessageTemplate, AppError> {
        let template: MessageTemplate =
            sqlx::query_as("SELECT * FROM templates WHERE id = $1 AND org_id = $2")
                .bind(template_id)
                .bind(org_id)
                .fetch_optional(pool)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Template {} not found", template_id)))?;

        Ok(template)
    }

    /// Create a custom template. Reserved names cannot be taken.
    pub async fn create(
        pool: &PgPool,
        org_id: Uuid,
        params: &CreateTemplateParams,
    ) -> Result<MessageTemplate, AppError> {
        if params.body.trim().is_empty() {
            return Err(AppError::Validation("Template body cannot be empty".to_string()));
        }
        if RESERVED_TEMPLATE_NAMES.contains(&params.name.as_str()) {
            return Err(AppError::Validation(format!(
                "'{}' is a reserved template name",
                params.name
            )));
        }

        let template: MessageTemplate = sqlx::query_as(
            r#"
            INSERT INTO templates (id, org_id, name, body, reserved)
            VALUES ($1, $2, $3, $4, false)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(&params.name)
        .bind(&params.body)
        .fetch_one(pool)
        .await?;

        tracing::info!(template_id = %template.id, org_id = %org_id, "Template created");

        Ok(template)
    }

    /// Update a template. Reserved templates may change body but not name.
    pub async fn update(
        pool: &PgPool,
        org_id: Uuid,
        template_id: Uuid,
        params: &UpdateTemplateParams,
    ) -> Result<MessageTemplate, AppError> {
        let existing = Self::get(pool, org_id, template_id).await?;

        if existing.reserved
            && let Some(name) = &params.name
            && name != &existing.name
        {
            return Err(AppError::Validation(format!(
                "'{}' is a reserved template and cannot be renamed",
                existing.name
            )));
        }

        let name = params.name.clone().unwrap_or(existing.name);
        let body = params.body.clone().unwrap_or(existing.body);
        if body.trim().is_empty() {
            return Err(AppError::Validation("Template body cannot be empty".to_string()));
        }

        let template: MessageTemplate = sqlx::query_as(
            "UPDATE templates SET name = $1, body = $2 WHERE id = $3 RETURNING *",
        )
        .bind(&name)
        .bind(&body)
        .bind(template_id)
        .fetch_one(pool)
        .await?;

        Ok(template)
    }

    /// Delete a custom template. Reserved templates cannot be deleted.
    pub async fn delete(
        pool: &PgPool,
        org_id: Uuid,
        template_id: Uuid,
    ) -> Result<bool, AppError> {
        let existing = Self::get(pool, org_id, template_id).await?;
        if existing.reserved {
            return Err(AppError::Validation(format!(
                "'{}' is a reserved template and cannot be deleted",
                existing.name
            )));
        }

        let result = sqlx::query("DELETE FROM templates WHERE id = $1 AND org_id = $2")
            .bind(template_id)
            .bind(org_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_contact(first_name: &str, last_name: &str) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: Some("+15551234567".to_string()),
            email: None,
            skills: serde_json::json!([]),
            opted_out: false,
            created_at: Utc::now(),
        }
    }

    fn make_job(name: &str) -> Job {
        Job {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            name: name.to_string(),
            location: "Pier 9".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 1, 5, 20, 0, 0).unwrap(),
            end_time: None,
            notes: "Bring gloves".to_string(),
            required_headcount: 4,
            department_id: None,
            cancelled: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_all_tokens() {
        let contact = make_contact("Sam", "Rivera");
        let job = make_job("Night Shift");
        let rendered = render(
            "{FirstName} {LastName}: {JobName} at {Location} on {Date} {Time}. {Notes}",
            &contact,
            &job,
        );
        assert_eq!(
            rendered,
            "Sam Rivera: Night Shift at Pier 9 on Jan 5, 2024 8:00 PM. Bring gloves"
        );
    }

    #[test]
    fn test_render_invitation_scenario() {
        let contact = make_contact("Sam", "");
        let job = make_job("Night Shift");
        let rendered = render("Hi {FirstName}, job {JobName} starts {Date}", &contact, &job);
        assert_eq!(rendered, "Hi Sam, job Night Shift starts Jan 5, 2024");
    }

    #[test]
    fn test_render_is_idempotent() {
        let contact = make_contact("Sam", "Rivera");
        let job = make_job("Night Shift");
        let once = render("Hi {FirstName}, see you at {JobName}", &contact, &job);
        let twice = render(&once, &contact, &job);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unrecognized_braces_pass_through() {
        let contact = make_contact("Sam", "Rivera");
        let job = make_job("Night Shift");
        let rendered = render("Hi {FirstName}, code {Unknown} stays", &contact, &job);
        assert_eq!(rendered, "Hi Sam, code {Unknown} stays");
    }

    #[test]
    fn test_render_repeated_token() {
        let contact = make_contact("Sam", "Rivera");
        let job = make_job("Night Shift");
        let rendered = render("{FirstName} {FirstName}", &contact, &job);
        assert_eq!(rendered, "Sam Sam");
    }
}
