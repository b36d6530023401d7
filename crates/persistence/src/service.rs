//! Atomic persistence of parsed and approved documents.
//!
//! Every public operation opens one `sqlx::Transaction` and either commits
//! it at the end or lets it drop on an early return — nothing here leaves
//! partial state behind on failure.

use crate::company_resolver::{self, CompanyAttrs};
use crate::entities::{Document, DocumentStatus, File, Snapshot, SnapshotKind};
use crate::error::{PersistenceError, PersistenceResult};
use crate::pool::FtsConfig;
use chrono::Utc;
use docscan_core::{column_order as compute_column_order, normalize_number, DocValue, FieldValue};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// The immutable facts recorded about an accepted upload, independent of
/// whether extraction eventually succeeds.
pub struct FileAttrs<'a> {
    pub storage_path: &'a str,
    pub original_filename: &'a str,
    pub content_hash: &'a str,
    pub mime_type: &'a str,
    pub byte_size: i64,
    pub uploaded_by: Option<&'a str>,
}

/// Unwrap a `totals`/`amounts_in_words` leaf that may be either a bare
/// scalar or a `{ value, label }` object (spec payload shape), returning
/// the value to persist and, if present, the label to carry as
/// `section_label`.
fn unwrap_value_label(value: &DocValue) -> (DocValue, Option<String>) {
    if let Some(map) = value.as_map() {
        if let Some(inner) = map.get("value") {
            let label = map
                .get("label")
                .or_else(|| map.get("_label"))
                .and_then(DocValue::as_text)
                .map(str::to_string);
            return (inner.clone(), label);
        }
    }
    (value.clone(), None)
}

pub struct PersistenceService {
    pool: PgPool,
    fts: FtsConfig,
}

impl PersistenceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, fts: FtsConfig::from_env() }
    }

    pub fn with_fts_config(pool: PgPool, fts: FtsConfig) -> Self {
        Self { pool, fts }
    }

    /// Record one `File` row. Called once per accepted upload; `document_id`
    /// is attached once a document is created, or left `NULL` if the
    /// artifact was rejected before a document could be produced.
    pub async fn record_file(&self, document_id: Option<Uuid>, attrs: FileAttrs<'_>) -> PersistenceResult<File> {
        let file = sqlx::query_as::<_, File>(
            r#"INSERT INTO files (document_id, storage_path, original_filename, content_hash, mime_type, byte_size, uploaded_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, document_id, storage_path, original_filename, content_hash, mime_type, byte_size, uploaded_at, uploaded_by"#,
        )
        .bind(document_id)
        .bind(attrs.storage_path)
        .bind(attrs.original_filename)
        .bind(attrs.content_hash)
        .bind(attrs.mime_type)
        .bind(attrs.byte_size)
        .bind(attrs.uploaded_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(file)
    }

    /// Step 1 of `save_parsed`: ensure the calendar-year partition every
    /// range-partitioned table needs exists before the inserts that need
    /// them. `documents`, `snapshots`, `fields`, and `table_sections` are
    /// all written to in the same transaction, so all four are covered
    /// up front rather than at each individual insert site.
    async fn ensure_partition(tx: &mut Transaction<'_, Postgres>) -> PersistenceResult<()> {
        sqlx::query(
            r#"SELECT documents_create_partition_for(now()),
                      snapshots_create_partition_for(now()),
                      fields_create_partition_for(now()),
                      table_sections_create_partition_for(now())"#,
        )
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn resolve_document_type(
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> PersistenceResult<Uuid> {
        if let Some((id,)) =
            sqlx::query_as::<_, (Uuid,)>("SELECT id FROM document_type WHERE code = $1")
                .bind(code)
                .fetch_optional(&mut **tx)
                .await?
        {
            return Ok(id);
        }
        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO document_type (code, name) VALUES ($1, $1) RETURNING id",
        )
        .bind(code)
        .fetch_one(&mut **tx)
        .await?;
        Ok(id)
    }

    async fn resolve_field_definition(
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> PersistenceResult<Option<Uuid>> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM field_definition WHERE code = $1")
                .bind(code)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Persist a freshly-extracted payload as a RAW snapshot, fanning it
    /// out into fields, signatures, and table sections. Returns the
    /// created `Document`.
    /// `file` is optional so tests and scratch tooling can still call this
    /// without a storage-backed artifact; a real upload path always
    /// supplies one so the `File` row lands in the same transaction as
    /// the `Document` it belongs to.
    pub async fn save_parsed(
        &self,
        raw_payload: &DocValue,
        doc_type_code: &str,
        created_by: Option<&str>,
        file: Option<FileAttrs<'_>>,
    ) -> PersistenceResult<Document> {
        let mut tx = self.pool.begin().await?;

        Self::ensure_partition(&mut tx).await?;
        let document_type_id = Self::resolve_document_type(&mut tx, doc_type_code).await?;

        let (supplier_id, buyer_id) = Self::resolve_parties(&mut tx, raw_payload).await?;

        let language = raw_payload.get("document_info").and_then(|d| d.get("language")).and_then(DocValue::as_text);
        let country = raw_payload.get("document_info").and_then(|d| d.get("country")).and_then(DocValue::as_text);

        let document_id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO documents (document_type_id, status, language, country, supplier_id, buyer_id, created_by, parsing_metadata)
               VALUES ($1, 'parsed', $2, $3, $4, $5, $6, $7)
               RETURNING id"#,
        )
        .bind(document_type_id)
        .bind(language)
        .bind(country)
        .bind(supplier_id)
        .bind(buyer_id)
        .bind(created_by)
        .bind(Json(DocValue::Map(Default::default())))
        .fetch_one(&mut *tx)
        .await?;

        if let Some(attrs) = file {
            sqlx::query(
                r#"INSERT INTO files (document_id, storage_path, original_filename, content_hash, mime_type, byte_size, uploaded_by)
                   VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
            )
            .bind(document_id)
            .bind(attrs.storage_path)
            .bind(attrs.original_filename)
            .bind(attrs.content_hash)
            .bind(attrs.mime_type)
            .bind(attrs.byte_size)
            .bind(attrs.uploaded_by)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"INSERT INTO snapshots (document_id, kind, version, payload, created_by)
               VALUES ($1, 'raw', 1, $2, $3)"#,
        )
        .bind(document_id)
        .bind(Json(raw_payload.clone()))
        .bind(created_by)
        .execute(&mut *tx)
        .await?;

        Self::insert_fields(&mut tx, document_id, raw_payload).await?;
        Self::insert_signatures(&mut tx, document_id, raw_payload).await?;
        Self::insert_table_sections(&mut tx, document_id, raw_payload).await?;
        Self::insert_pages(&mut tx, document_id, raw_payload, language).await?;

        tx.commit().await?;

        self.fetch_document(document_id).await?.ok_or_else(|| {
            PersistenceError::invalid_state("document vanished immediately after insert")
        })
    }

    async fn resolve_parties(
        tx: &mut Transaction<'_, Postgres>,
        payload: &DocValue,
    ) -> PersistenceResult<(Option<Uuid>, Option<Uuid>)> {
        let parties = payload.get("parties");
        let supplier = Self::resolve_party(tx, parties.and_then(|p| p.get("supplier"))).await?;
        let buyer = Self::resolve_party(tx, parties.and_then(|p| p.get("buyer"))).await?;
        Ok((supplier, buyer))
    }

    async fn resolve_party(
        tx: &mut Transaction<'_, Postgres>,
        party: Option<&DocValue>,
    ) -> PersistenceResult<Option<Uuid>> {
        let Some(party) = party else { return Ok(None) };
        let Some(name) = party.get("name").and_then(DocValue::as_text) else { return Ok(None) };
        if name.trim().is_empty() {
            return Ok(None);
        }
        let attrs = CompanyAttrs {
            legal_name: name.to_string(),
            tax_id: party.get("tax_id").and_then(DocValue::as_text).map(str::to_string),
            vat_id: party.get("vat_id").and_then(DocValue::as_text).map(str::to_string),
            registration_code: None,
            country: party.get("country").and_then(DocValue::as_text).map(str::to_string),
            language: None,
        };
        let id = company_resolver::resolve_or_create(&mut *tx, &attrs).await?;
        Ok(Some(id))
    }

    /// Flatten `document_info`, `totals`, `amounts_in_words`, and
    /// `other_fields` into `Field` rows. A leaf whose key matches a seeded
    /// `field_definition.code` gets that definition id; everything else
    /// persists as an unknown field with `field_definition = NULL`.
    ///
    /// `totals` and `amounts_in_words` leaves may be a bare scalar or a
    /// `{ value, label }` object; [`unwrap_value_label`] peels the object
    /// shape so the numeric/text value still lands in `raw_value_*`
    /// instead of being silently discarded as an opaque map.
    async fn insert_fields(
        tx: &mut Transaction<'_, Postgres>,
        document_id: Uuid,
        payload: &DocValue,
    ) -> PersistenceResult<()> {
        if let Some(info) = payload.get("document_info").and_then(DocValue::as_map) {
            for (key, value) in info {
                Self::insert_one_field(tx, document_id, "document_info", None, key, key, value).await?;
            }
        }

        for section in ["totals", "amounts_in_words"] {
            if let Some(map) = payload.get(section).and_then(DocValue::as_map) {
                for (key, value) in map {
                    let (leaf, label) = unwrap_value_label(value);
                    Self::insert_one_field(tx, document_id, section, label.as_deref(), key, key, &leaf).await?;
                }
            }
        }

        for record in docscan_core::postprocess::reshape_other_fields(payload.get("other_fields")) {
            let code = record.key.as_deref().unwrap_or(&record.label);
            Self::insert_one_field(tx, document_id, "other_fields", None, code, &record.label, &record.value)
                .await?;
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_one_field(
        tx: &mut Transaction<'_, Postgres>,
        document_id: Uuid,
        section: &str,
        section_label: Option<&str>,
        code_candidate: &str,
        raw_label: &str,
        value: &DocValue,
    ) -> PersistenceResult<()> {
        let field_definition_id = Self::resolve_field_definition(tx, code_candidate).await?;
        let field_code = field_definition_id.is_some().then(|| code_candidate.to_string());

        let text_value = value.as_text().map(str::to_string);
        let normalized = text_value.as_deref().map(normalize_number);
        let field_value = FieldValue::from_doc_value(value);

        let (raw_text, raw_number, raw_date, raw_bool) = match &field_value {
            FieldValue::Text(s) => (Some(s.clone()), normalized.and_then(|n| n.parsed), None, None),
            FieldValue::Number(n) => (text_value, Some(*n), None, None),
            FieldValue::Date(d) => (text_value, None, Some(*d), None),
            FieldValue::Bool(b) => (text_value, None, None, Some(*b)),
            FieldValue::Null => (None, None, None, None),
        };

        sqlx::query(
            r#"INSERT INTO fields (document_id, field_definition_id, field_code, section, section_label, raw_label,
                                    raw_value_text, raw_value_number, raw_value_date, raw_value_bool)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(document_id)
        .bind(field_definition_id)
        .bind(field_code)
        .bind(section)
        .bind(section_label)
        .bind(raw_label)
        .bind(raw_text)
        .bind(raw_number)
        .bind(raw_date)
        .bind(raw_bool)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn insert_signatures(
        tx: &mut Transaction<'_, Postgres>,
        document_id: Uuid,
        payload: &DocValue,
    ) -> PersistenceResult<()> {
        for record in docscan_core::postprocess::reshape_signatures(payload.get("signatures")) {
            let role = record.payload.get("role").and_then(DocValue::as_text);
            let name = record.payload.get("name").and_then(DocValue::as_text);
            let signed = matches!(record.payload.get("is_signed"), Some(DocValue::Bool(true)));
            let stamped = matches!(record.payload.get("is_stamped"), Some(DocValue::Bool(true)));
            let stamp_content = record.payload.get("stamp_content").and_then(DocValue::as_text);
            let handwritten_date = record.payload.get("handwritten_date").and_then(DocValue::as_text);

            sqlx::query(
                r#"INSERT INTO signatures (document_id, signature_index, role, name, signed, stamped, stamp_content, handwritten_date, raw_payload)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
            )
            .bind(document_id)
            .bind(record.index as i32)
            .bind(role)
            .bind(name)
            .bind(signed)
            .bind(stamped)
            .bind(stamp_content)
            .bind(handwritten_date)
            .bind(Json(record.payload.clone()))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn insert_table_sections(
        tx: &mut Transaction<'_, Postgres>,
        document_id: Uuid,
        payload: &DocValue,
    ) -> PersistenceResult<()> {
        let Some(table_data) = payload.get("table_data") else { return Ok(()) };
        let column_mapping = table_data.get("column_mapping").and_then(DocValue::as_map);
        let declared_order = table_data.get("column_order").and_then(DocValue::as_array);
        let rows = table_data.get("line_items").and_then(DocValue::as_array).unwrap_or(&[]);

        let order = compute_column_order(declared_order, column_mapping, rows);

        sqlx::query(
            r#"INSERT INTO table_sections (document_id, section_name, section_order, column_mapping_raw, rows_raw, column_order_raw)
               VALUES ($1, 'line_items', 0, $2, $3, $4)"#,
        )
        .bind(document_id)
        .bind(Json(table_data.get("column_mapping").cloned().unwrap_or(DocValue::Map(Default::default()))))
        .bind(Json(DocValue::Array(rows.to_vec())))
        .bind(order)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// `document_language` is the document's own resolved language (from
    /// `document_info.language`), stamped onto every page row so the
    /// per-language partial FTS indexes have something to filter on.
    async fn insert_pages(
        tx: &mut Transaction<'_, Postgres>,
        document_id: Uuid,
        payload: &DocValue,
        document_language: Option<&str>,
    ) -> PersistenceResult<()> {
        let Some(pages) = payload.get("pages").and_then(DocValue::as_array) else { return Ok(()) };
        for (i, page) in pages.iter().enumerate() {
            let Some(text) = page.get("ocr_text").and_then(DocValue::as_text) else { continue };
            let page_language = page.get("language").and_then(DocValue::as_text).or(document_language);
            sqlx::query("INSERT INTO pages (document_id, page_number, language, ocr_text) VALUES ($1, $2, $3, $4)")
                .bind(document_id)
                .bind((i + 1) as i32)
                .bind(page_language)
                .bind(text)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    /// Append an APPROVED snapshot and write the approved slot on every
    /// field/signature/table section, marking `corrected` where the
    /// approved value differs from raw. The RAW snapshot is never touched.
    pub async fn save_approved(
        &self,
        document_id: Uuid,
        approved_payload: &DocValue,
        user_id: &str,
    ) -> PersistenceResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT snapshots_create_partition_for(now())").execute(&mut *tx).await?;

        let next_version: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM snapshots WHERE document_id = $1 AND kind = 'approved'",
        )
        .bind(document_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE documents SET status = 'approved', updated_by = $2 WHERE id = $1",
        )
        .bind(document_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO snapshots (document_id, kind, version, payload, created_by)
               VALUES ($1, 'approved', $2, $3, $4)"#,
        )
        .bind(document_id)
        .bind(next_version)
        .bind(Json(approved_payload.clone()))
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        Self::apply_approved_fields(&mut tx, document_id, approved_payload, user_id).await?;
        Self::apply_approved_signatures(&mut tx, document_id, approved_payload, user_id).await?;
        Self::apply_approved_table_sections(&mut tx, document_id, approved_payload, user_id).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn apply_approved_fields(
        tx: &mut Transaction<'_, Postgres>,
        document_id: Uuid,
        approved_payload: &DocValue,
        user_id: &str,
    ) -> PersistenceResult<()> {
        let mut approved_values: std::collections::HashMap<String, DocValue> = Default::default();
        if let Some(map) = approved_payload.get("document_info").and_then(DocValue::as_map) {
            for (k, v) in map {
                approved_values.insert(k.clone(), v.clone());
            }
        }
        for section in ["totals", "amounts_in_words"] {
            if let Some(map) = approved_payload.get(section).and_then(DocValue::as_map) {
                for (k, v) in map {
                    let (leaf, _label) = unwrap_value_label(v);
                    approved_values.insert(k.clone(), leaf);
                }
            }
        }
        for record in docscan_core::postprocess::reshape_other_fields(approved_payload.get("other_fields")) {
            let code = record.key.unwrap_or(record.label);
            approved_values.insert(code, record.value);
        }

        let rows: Vec<(Uuid, String, Option<String>, Option<rust_decimal::Decimal>, Option<chrono::NaiveDate>, Option<bool>)> =
            sqlx::query_as(
                "SELECT id, raw_label, raw_value_text, raw_value_number, raw_value_date, raw_value_bool FROM fields WHERE document_id = $1",
            )
            .bind(document_id)
            .fetch_all(&mut **tx)
            .await?;

        for (id, raw_label, raw_text, raw_number, raw_date, raw_bool) in rows {
            let Some(approved_value) = approved_values.get(&raw_label) else { continue };
            let field_value = FieldValue::from_doc_value(approved_value);
            let approved_text = approved_value.as_text().map(str::to_string);
            let (a_text, a_number, a_date, a_bool) = match &field_value {
                FieldValue::Text(s) => (Some(s.clone()), None, None, None),
                FieldValue::Number(n) => (approved_text, Some(*n), None, None),
                FieldValue::Date(d) => (approved_text, None, Some(*d), None),
                FieldValue::Bool(b) => (approved_text, None, None, Some(*b)),
                FieldValue::Null => (None, None, None, None),
            };
            let corrected = a_text != raw_text || a_number != raw_number || a_date != raw_date || a_bool != raw_bool;

            sqlx::query(
                r#"UPDATE fields SET approved_value_text = $2, approved_value_number = $3, approved_value_date = $4,
                                      approved_value_bool = $5, approved_by = $6, approved_at = now(), corrected = $7
                   WHERE id = $1"#,
            )
            .bind(id)
            .bind(a_text)
            .bind(a_number)
            .bind(a_date)
            .bind(a_bool)
            .bind(user_id)
            .bind(corrected)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn apply_approved_signatures(
        tx: &mut Transaction<'_, Postgres>,
        document_id: Uuid,
        approved_payload: &DocValue,
        user_id: &str,
    ) -> PersistenceResult<()> {
        for record in docscan_core::postprocess::reshape_signatures(approved_payload.get("signatures")) {
            let existing: Option<(Uuid, Json<DocValue>)> = sqlx::query_as(
                "SELECT id, raw_payload FROM signatures WHERE document_id = $1 AND signature_index = $2",
            )
            .bind(document_id)
            .bind(record.index as i32)
            .fetch_optional(&mut **tx)
            .await?;
            let Some((id, raw_payload)) = existing else { continue };
            let corrected = raw_payload.0 != record.payload;

            sqlx::query("UPDATE signatures SET approved_payload = $2, corrected = $3 WHERE id = $1")
                .bind(id)
                .bind(Json(record.payload))
                .bind(corrected)
                .execute(&mut **tx)
                .await?;
        }
        let _ = user_id;
        Ok(())
    }

    async fn apply_approved_table_sections(
        tx: &mut Transaction<'_, Postgres>,
        document_id: Uuid,
        approved_payload: &DocValue,
        user_id: &str,
    ) -> PersistenceResult<()> {
        let Some(table_data) = approved_payload.get("table_data") else { return Ok(()) };
        let rows = table_data.get("line_items").cloned().unwrap_or(DocValue::Array(Vec::new()));
        let mapping = table_data.get("column_mapping").cloned();

        sqlx::query(
            r#"UPDATE table_sections SET rows_approved = $2, column_mapping_approved = $3, approved_by = $4, approved_at = now()
               WHERE document_id = $1 AND section_name = 'line_items'"#,
        )
        .bind(document_id)
        .bind(Json(rows))
        .bind(mapping.map(Json))
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// `GET /api/documents/{id}`: the approved snapshot payload if one
    /// exists, else the raw one.
    pub async fn latest_payload(&self, document_id: Uuid) -> PersistenceResult<Option<DocValue>> {
        let row: Option<(Json<DocValue>,)> = sqlx::query_as(
            r#"SELECT payload FROM snapshots WHERE document_id = $1
               ORDER BY (kind = 'approved') DESC, version DESC
               LIMIT 1"#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(Json(p),)| p))
    }

    pub async fn fetch_document(&self, document_id: Uuid) -> PersistenceResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"SELECT id, document_type_id, status, language, country, supplier_id, buyer_id, created_at, created_by, parsing_metadata
               FROM documents WHERE id = $1"#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn reject(&self, document_id: Uuid) -> PersistenceResult<()> {
        sqlx::query("UPDATE documents SET status = 'rejected' WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// `GET /api/search/documents`: optionally filtered by status and a
    /// full-text `query` matched against `fields.raw_value_text`, newest
    /// first, paginated. `query_language` is a document-language hint
    /// (e.g. `"uk"`, `"en"`); [`FtsConfig::config_for`] picks the
    /// tsvector configuration it routes to, falling back to `simple`
    /// when the hint is absent or this deployment has not enabled a
    /// configuration for it.
    pub async fn search_documents(
        &self,
        status: Option<DocumentStatus>,
        query: Option<&str>,
        query_language: Option<&str>,
        page: i64,
        page_size: i64,
    ) -> PersistenceResult<(Vec<Document>, i64)> {
        let offset = page.max(0) * page_size.max(1);
        let limit = page_size.max(1).min(200);
        let fts_config = self.fts.config_for(query_language);

        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"SELECT DISTINCT d.id, d.document_type_id, d.status, d.language, d.country,
                      d.supplier_id, d.buyer_id, d.created_at, d.created_by, d.parsing_metadata
               FROM documents d
               LEFT JOIN fields f ON f.document_id = d.id
               WHERE ($1::document_status IS NULL OR d.status = $1)
                 AND ($2::text IS NULL OR to_tsvector($3::regconfig, coalesce(f.raw_value_text, ''))
                      @@ plainto_tsquery($3::regconfig, $2))
               ORDER BY d.created_at DESC
               LIMIT $4 OFFSET $5"#,
        )
        .bind(status)
        .bind(query)
        .bind(fts_config)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"SELECT count(DISTINCT d.id)
               FROM documents d
               LEFT JOIN fields f ON f.document_id = d.id
               WHERE ($1::document_status IS NULL OR d.status = $1)
                 AND ($2::text IS NULL OR to_tsvector($3::regconfig, coalesce(f.raw_value_text, ''))
                      @@ plainto_tsquery($3::regconfig, $2))"#,
        )
        .bind(status)
        .bind(query)
        .bind(fts_config)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Detaches `documents_<year>` partitions older than
    /// `ARCHIVE_PARTITIONS_OLDER_THAN_YEARS`, leaving the detached tables
    /// on disk under their own name for an operator to export or drop.
    /// Detach rather than drop: archival is a retention policy, not a
    /// deletion policy.
    pub async fn archive_old_partitions(&self, older_than_years: i32) -> PersistenceResult<Vec<String>> {
        let cutoff_year: i32 = sqlx::query_scalar("SELECT (extract(year from now())::int - $1)")
            .bind(older_than_years)
            .fetch_one(&self.pool)
            .await?;

        let partitions: Vec<(String,)> = sqlx::query_as(
            r#"SELECT child.relname
               FROM pg_inherits
               JOIN pg_class parent ON pg_inherits.inhparent = parent.oid
               JOIN pg_class child ON pg_inherits.inhrelid = child.oid
               WHERE parent.relname = 'documents' AND child.relname ~ '^documents_[0-9]{4}$'"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut archived = Vec::new();
        for (name,) in partitions {
            let year: i32 = match name.rsplit('_').next().and_then(|y| y.parse().ok()) {
                Some(y) => y,
                None => continue,
            };
            if year >= cutoff_year {
                continue;
            }
            sqlx::query(&format!("ALTER TABLE documents DETACH PARTITION {name}"))
                .execute(&self.pool)
                .await?;
            archived.push(name);
        }
        Ok(archived)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    document_type_id: Uuid,
    status: DocumentStatus,
    language: Option<String>,
    country: Option<String>,
    supplier_id: Option<Uuid>,
    buyer_id: Option<Uuid>,
    created_at: chrono::DateTime<Utc>,
    created_by: Option<String>,
    parsing_metadata: Json<DocValue>,
}

impl From<DocumentRow> for Document {
    fn from(r: DocumentRow) -> Self {
        Document {
            id: r.id,
            document_type_id: r.document_type_id,
            status: r.status,
            language: r.language,
            country: r.country,
            supplier_id: r.supplier_id,
            buyer_id: r.buyer_id,
            created_at: r.created_at,
            created_by: r.created_by,
            parsing_metadata: r.parsing_metadata,
        }
    }
}

/// A fully-populated snapshot read back for the search/document-detail
/// endpoints.
pub async fn fetch_raw_snapshot(pool: &PgPool, document_id: Uuid) -> PersistenceResult<Option<Snapshot>> {
    let row = sqlx::query_as::<_, Snapshot>(
        "SELECT id, document_id, kind, version, payload, created_at, created_by FROM snapshots WHERE document_id = $1 AND kind = 'raw' AND version = 1",
    )
    .bind(document_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
