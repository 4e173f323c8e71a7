//! Recipient resolver — decides who a dispatch goes to.
//!
//! Invitations go to every requested contact except those already confirmed
//! for the job (declined/maybe/no-reply/cancelled contacts stay re-invitable)
//! and those who opted out. Broadcasts go to exactly the confirmed roster.

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use roster_common::error::AppError;
use roster_common::types::{Availability, AvailabilityStatus, Contact, Recipient};

pub struct RecipientResolver;

impl RecipientResolver {
    /// Resolve invitation recipients from a requested contact set.
    ///
    /// A contact with no availability row for the job is eligible.
    pub async fn invitation_recipients(
        pool: &PgPool,
        org_id: Uuid,
        job_id: Uuid,
        contact_ids: &[Uuid],
    ) -> Result<Vec<Recipient>, AppError> {
        let contacts: Vec<Contact> = sqlx::query_as(
            r#"
            SELECT * FROM contacts
            WHERE org_id = $1 AND id = ANY($2)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(org_id)
        .bind(contact_ids)
        .fetch_all(pool)
        .await?;

        let availability = Self::availability_by_contact(pool, job_id).await?;

        Ok(eligible_for_invitation(contacts, &availability))
    }

    /// Resolve broadcast recipients: exactly the confirmed roster for the job.
    pub async fn broadcast_recipients(
        pool: &PgPool,
        org_id: Uuid,
        job_id: Uuid,
    ) -> Result<Vec<Recipient>, AppError> {
        let contacts: Vec<Contact> = sqlx::query_as(
            r#"
            SELECT DISTINCT c.*
            FROM contacts c
            JOIN availability a ON a.contact_id = c.id
            WHERE c.org_id = $1 AND a.job_id = $2 AND a.status = 'confirmed'
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(org_id)
        .bind(job_id)
        .fetch_all(pool)
        .await?;

        let availability = Self::availability_by_contact(pool, job_id).await?;

        Ok(contacts
            .into_iter()
            .map(|contact| {
                let row = availability.get(&contact.id).cloned();
                Recipient {
                    contact,
                    availability: row,
                }
            })
            .collect())
    }

    async fn availability_by_contact(
        pool: &PgPool,
        job_id: Uuid,
    ) -> Result<HashMap<Uuid, Availability>, AppError> {
        let rows: Vec<Availability> =
            sqlx::query_as("SELECT * FROM availability WHERE job_id = $1")
                .bind(job_id)
                .fetch_all(pool)
                .await?;

        Ok(rows.into_iter().map(|a| (a.contact_id, a)).collect())
    }
}

/// Filter a contact list down to invitation-eligible recipients.
///
/// Excludes contacts whose availability for the job is `confirmed`, and
/// opted-out contacts. Deduplicates by contact id, preserving order.
pub fn eligible_for_invitation(
    contacts: Vec<Contact>,
    availability: &HashMap<Uuid, Availability>,
) -> Vec<Recipient> {
    let mut seen: Vec<Uuid> = Vec::new();
    let mut recipients = Vec::new();

    for contact in contacts {
        if seen.contains(&contact.id) {
            continue;
        }
        seen.push(contact.id);

        if contact.opted_out {
            continue;
        }

        let row = availability.get(&contact.id);
        if row.map(|a| a.status) == Some(AvailabilityStatus::Confirmed) {
            continue;
        }

        recipients.push(Recipient {
            availability: row.cloned(),
            contact,
        });
    }

    recipients
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_contact(opted_out: bool) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            first_name: "Sam".to_string(),
            last_name: "Rivera".to_string(),
            phone: Some("+15551234567".to_string()),
            email: None,
            skills: serde_json::json!([]),
            opted_out,
            created_at: Utc::now(),
        }
    }

    fn make_availability(contact_id: Uuid, status: AvailabilityStatus) -> Availability {
        Availability {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            contact_id,
            status,
            updated_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_confirmed_contact_excluded() {
        let confirmed = make_contact(false);
        let fresh = make_contact(false);
        let mut availability = HashMap::new();
        availability.insert(
            confirmed.id,
            make_availability(confirmed.id, AvailabilityStatus::Confirmed),
        );

        let recipients =
            eligible_for_invitation(vec![confirmed.clone(), fresh.clone()], &availability);

        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].contact.id, fresh.id);
    }

    #[test]
    fn test_declined_and_maybe_remain_reinvitable() {
        let declined = make_contact(false);
        let maybe = make_contact(false);
        let no_reply = make_contact(false);
        let mut availability = HashMap::new();
        availability.insert(
            declined.id,
            make_availability(declined.id, AvailabilityStatus::Declined),
        );
        availability.insert(
            maybe.id,
            make_availability(maybe.id, AvailabilityStatus::Maybe),
        );
        availability.insert(
            no_reply.id,
            make_availability(no_reply.id, AvailabilityStatus::NoReply),
        );

        let recipients =
            eligible_for_invitation(vec![declined, maybe, no_reply], &availability);

        assert_eq!(recipients.len(), 3);
        assert!(recipients.iter().all(|r| r.availability.is_some()));
    }

    #[test]
    fn test_contact_without_availability_is_eligible() {
        let contact = make_contact(false);
        let recipients = eligible_for_invitation(vec![contact.clone()], &HashMap::new());

        assert_eq!(recipients.len(), 1);
        assert!(recipients[0].availability.is_none());
    }

    #[test]
    fn test_opted_out_contact_excluded() {
        let contact = make_contact(true);
        let recipients = eligible_for_invitation(vec![contact], &HashMap::new());
        assert!(recipients.is_empty());
    }

    #[test]
    fn test_duplicates_removed_order_preserved() {
        let first = make_contact(false);
        let second = make_contact(false);
        let recipients = eligible_for_invitation(
            vec![first.clone(), second.clone(), first.clone()],
            &HashMap::new(),
        );

        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[0].contact.id, first.id);
        assert_eq!(recipients[1].contact.id, second.id);
    }
}
