//! Tax-id normalization and company dedup/lookup.

use crate::entities::Company;
use crate::error::PersistenceResult;
use sqlx::types::Json;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

/// Attributes extracted for one party on a document. Any field left empty
/// is treated as "not provided" and never overwrites a known value.
#[derive(Debug, Clone, Default)]
pub struct CompanyAttrs {
    pub legal_name: String,
    pub tax_id: Option<String>,
    pub vat_id: Option<String>,
    pub registration_code: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
}

/// Reduce a raw tax-id string to its longest contiguous digit run.
/// `"код за ЄДРПОУ 37483556"` -> `"37483556"`; no digits -> `None`.
pub fn normalize_tax_id(raw: &str) -> Option<String> {
    let mut best: Option<&str> = None;
    let mut start = None;
    let bytes: Vec<(usize, char)> = raw.char_indices().collect();

    for (i, (byte_idx, c)) in bytes.iter().enumerate() {
        if c.is_ascii_digit() {
            if start.is_none() {
                start = Some(*byte_idx);
            }
            let is_last = i + 1 == bytes.len();
            let next_is_digit = !is_last && bytes[i + 1].1.is_ascii_digit();
            if !next_is_digit {
                let end = byte_idx + c.len_utf8();
                let run = &raw[start.unwrap()..end];
                if best.map(|b| run.len() > b.len()).unwrap_or(true) {
                    best = Some(run);
                }
                start = None;
            }
        } else {
            start = None;
        }
    }

    best.map(str::to_string).filter(|s| !s.is_empty())
}

/// Strip surrounding punctuation, collapse whitespace, case-fold. Used
/// only for lookup; never written back as the canonical name.
pub fn normalize_company_name(raw: &str) -> String {
    let trimmed = raw.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

/// Look up a company by normalized tax id, then normalized name, else
/// insert a new row. On update, only non-empty incoming attributes
/// overwrite existing ones.
pub async fn resolve_or_create(
    executor: &mut PgConnection,
    attrs: &CompanyAttrs,
) -> PersistenceResult<Uuid> {
    let normalized_tax_id = attrs.tax_id.as_deref().and_then(normalize_tax_id);

    if let Some(tax_id) = &normalized_tax_id {
        if let Some(id) = find_by_tax_id(&mut *executor, tax_id).await? {
            update_company(&mut *executor, id, attrs).await?;
            return Ok(id);
        }
    }

    let normalized_name = normalize_company_name(&attrs.legal_name);
    if let Some(id) = find_by_name(&mut *executor, &normalized_name).await? {
        update_company(&mut *executor, id, attrs).await?;
        return Ok(id);
    }

    insert_company(&mut *executor, attrs, normalized_tax_id.as_deref()).await
}

async fn find_by_tax_id<'e, E>(executor: E, tax_id: &str) -> PersistenceResult<Option<Uuid>>
where
    E: PgExecutor<'e>,
{
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM company WHERE tax_id = $1")
        .bind(tax_id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|(id,)| id))
}

async fn find_by_name<'e, E>(executor: E, normalized_name: &str) -> PersistenceResult<Option<Uuid>>
where
    E: PgExecutor<'e>,
{
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM company WHERE lower(regexp_replace(legal_name, '\\s+', ' ', 'g')) = $1",
    )
    .bind(normalized_name)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(|(id,)| id))
}

async fn insert_company<'e, E>(
    executor: E,
    attrs: &CompanyAttrs,
    normalized_tax_id: Option<&str>,
) -> PersistenceResult<Uuid>
where
    E: PgExecutor<'e>,
{
    let row: (Uuid,) = sqlx::query_as(
        r#"INSERT INTO company (legal_name, tax_id, vat_id, registration_code, country, language, addresses, banking_identifiers, contacts)
           VALUES ($1, $2, $3, $4, $5, $6, '[]', '[]', '[]')
           RETURNING id"#,
    )
    .bind(&attrs.legal_name)
    .bind(normalized_tax_id)
    .bind(&attrs.vat_id)
    .bind(&attrs.registration_code)
    .bind(&attrs.country)
    .bind(&attrs.language)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

/// Overwrite only the attributes that arrive non-empty; never clobber a
/// known attribute with a blank.
async fn update_company<'e, E>(executor: E, id: Uuid, attrs: &CompanyAttrs) -> PersistenceResult<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"UPDATE company SET
            vat_id = COALESCE(NULLIF($2, ''), vat_id),
            registration_code = COALESCE(NULLIF($3, ''), registration_code),
            country = COALESCE(NULLIF($4, ''), country),
            language = COALESCE(NULLIF($5, ''), language)
           WHERE id = $1"#,
    )
    .bind(id)
    .bind(attrs.vat_id.as_deref().unwrap_or(""))
    .bind(attrs.registration_code.as_deref().unwrap_or(""))
    .bind(attrs.country.as_deref().unwrap_or(""))
    .bind(attrs.language.as_deref().unwrap_or(""))
    .execute(executor)
    .await?;
    Ok(())
}

/// Fetch a company row by id, used by the service layer to return a fully
/// populated document after linking.
pub async fn fetch<'e, E>(executor: E, id: Uuid) -> PersistenceResult<Option<Company>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, CompanyRow>(
        r#"SELECT id, legal_name, short_name, tax_id, vat_id, registration_code, country, language,
                  addresses, banking_identifiers, contacts, external_id, external_system, verified
           FROM company WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(Into::into))
}

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    legal_name: String,
    short_name: Option<String>,
    tax_id: Option<String>,
    vat_id: Option<String>,
    registration_code: Option<String>,
    country: Option<String>,
    language: Option<String>,
    addresses: Json<docscan_core::DocValue>,
    banking_identifiers: Json<docscan_core::DocValue>,
    contacts: Json<docscan_core::DocValue>,
    external_id: Option<String>,
    external_system: Option<String>,
    verified: bool,
}

impl From<CompanyRow> for Company {
    fn from(r: CompanyRow) -> Self {
        Company {
            id: r.id,
            legal_name: r.legal_name,
            short_name: r.short_name,
            tax_id: r.tax_id,
            vat_id: r.vat_id,
            registration_code: r.registration_code,
            country: r.country,
            language: r.language,
            addresses: r.addresses,
            banking_identifiers: r.banking_identifiers,
            contacts: r.contacts,
            external_id: r.external_id,
            external_system: r.external_system,
            verified: r.verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_tax_id_extracts_longest_digit_run() {
        assert_eq!(normalize_tax_id("код за ЄДРПОУ 37483556"), Some("37483556".to_string()));
    }

    #[test]
    fn normalize_tax_id_is_none_with_no_digits() {
        assert_eq!(normalize_tax_id("no digits here"), None);
    }

    #[test]
    fn normalize_tax_id_is_idempotent() {
        let once = normalize_tax_id("ІД 37483556").unwrap();
        let twice = normalize_tax_id(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_company_name_collapses_whitespace_and_case() {
        assert_eq!(normalize_company_name("  ТОВ   ТЕХНО.  "), "тов техно");
    }
}
