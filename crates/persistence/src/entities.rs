//! Row types for the EAV+JSONB schema. Every opaque column round-trips
//! through `docscan_core::DocValue` so insertion order is never lost on
//! the way in or out of the database.

use chrono::{DateTime, Utc};
use docscan_core::DocValue;
use rust_decimal::Decimal;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "document_status", rename_all = "lowercase")]
pub enum DocumentStatus {
    Parsed,
    Approved,
    Rejected,
    Exported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "snapshot_kind", rename_all = "lowercase")]
pub enum SnapshotKind {
    Raw,
    Approved,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct File {
    pub id: Uuid,
    pub document_id: Option<Uuid>,
    pub storage_path: String,
    pub original_filename: String,
    pub content_hash: String,
    pub mime_type: String,
    pub byte_size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub document_type_id: Uuid,
    pub status: DocumentStatus,
    pub language: Option<String>,
    pub country: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub parsing_metadata: Json<DocValue>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Snapshot {
    pub id: Uuid,
    pub document_id: Uuid,
    pub kind: SnapshotKind,
    pub version: i32,
    pub payload: Json<DocValue>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Field {
    pub id: Uuid,
    pub document_id: Uuid,
    pub field_definition_id: Option<Uuid>,
    pub field_code: Option<String>,
    pub section: Option<String>,
    pub section_label: Option<String>,
    pub raw_label: String,
    pub language: Option<String>,
    pub raw_value_text: Option<String>,
    pub raw_value_number: Option<Decimal>,
    pub raw_value_date: Option<chrono::NaiveDate>,
    pub raw_value_bool: Option<bool>,
    pub raw_confidence: Option<f64>,
    pub approved_value_text: Option<String>,
    pub approved_value_number: Option<Decimal>,
    pub approved_value_date: Option<chrono::NaiveDate>,
    pub approved_value_bool: Option<bool>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub corrected: bool,
    pub ignored: bool,
    pub page_number: Option<i32>,
    pub bounding_box: Option<Json<DocValue>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Signature {
    pub id: Uuid,
    pub document_id: Uuid,
    pub signature_index: i32,
    pub role: Option<String>,
    pub name: Option<String>,
    pub signed: bool,
    pub stamped: bool,
    pub stamp_content: Option<String>,
    pub handwritten_date: Option<String>,
    pub raw_payload: Json<DocValue>,
    pub approved_payload: Option<Json<DocValue>>,
    pub corrected: bool,
    pub page_number: Option<i32>,
    pub bounding_box: Option<Json<DocValue>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TableSection {
    pub id: Uuid,
    pub document_id: Uuid,
    pub section_name: String,
    pub section_order: i32,
    pub column_mapping_raw: Json<DocValue>,
    pub column_mapping_approved: Option<Json<DocValue>>,
    pub rows_raw: Json<DocValue>,
    pub rows_approved: Option<Json<DocValue>>,
    pub column_order_raw: Vec<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Page {
    pub id: Uuid,
    pub document_id: Uuid,
    pub page_number: i32,
    pub language: Option<String>,
    pub ocr_text: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    pub legal_name: String,
    pub short_name: Option<String>,
    pub tax_id: Option<String>,
    pub vat_id: Option<String>,
    pub registration_code: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub addresses: Json<DocValue>,
    pub banking_identifiers: Json<DocValue>,
    pub contacts: Json<DocValue>,
    pub external_id: Option<String>,
    pub external_system: Option<String>,
    pub verified: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyProfile {
    pub id: Uuid,
    pub company_id: Uuid,
    pub document_type_id: Uuid,
    pub active: bool,
    pub expected_currency: Option<String>,
    pub expected_vat_mode: Option<String>,
    pub settings: Json<DocValue>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FieldDefinition {
    pub id: Uuid,
    pub code: String,
    pub section: String,
    pub data_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FieldLabel {
    pub id: Uuid,
    pub field_definition_id: Uuid,
    pub locale: String,
    pub label: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentType {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}
