//! Structured payload schemas, one per document type. These are the
//! contract between the Smart Mapper's JSON output, the persisted
//! [`super::ScanResult`], and the Exporter Factory.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::StandardizedTransaction;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Party {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub npwp: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FakturPajakPayload {
    pub seller: Party,
    pub buyer: Party,
    pub invoice_number: String,
    pub invoice_issue_date: Option<chrono::NaiveDate>,
    pub invoice_reference: String,
    pub dpp: Decimal,
    pub ppn: Decimal,
    pub total: Decimal,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pph21Payload {
    pub dokumen_nomor: String,
    pub masa_pajak: String,
    pub dokumen_tanggal: Option<chrono::NaiveDate>,
    pub dokumen_dasar_jenis: String,
    pub dokumen_dasar_tanggal: Option<chrono::NaiveDate>,
    pub dokumen_dasar_nomor: String,
    pub identitas_pemotong: Party,
    pub penerima: Party,
    pub dpp: Decimal,
    pub tarif: Decimal,
    pub pph: Decimal,
}

/// 20 ordered fields, matching the PPh23 spreadsheet column order. Field
/// order here is significant: `export::pph23` projects this struct's
/// fields onto columns 1..20 in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pph23Payload {
    pub dokumen_nomor: String,
    pub dokumen_tanggal: Option<chrono::NaiveDate>,
    pub masa_pajak: String,
    pub dokumen_dasar_jenis: String,
    pub dokumen_dasar_nomor: String,
    pub dokumen_dasar_tanggal: Option<chrono::NaiveDate>,
    pub penerima_nama: String,
    pub penerima_npwp: String,
    pub penerima_alamat: String,
    pub pemotong_nama: String,
    pub pemotong_npwp: String,
    pub pemotong_alamat: String,
    pub objek_pajak_kode: String,
    pub objek_pajak_jenis: String,
    pub objek_pajak_deskripsi: String,
    pub dpp: Decimal,
    pub tarif: Decimal,
    pub pph: Decimal,
    pub bruto: Decimal,
    pub keterangan: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoicePayload {
    pub vendor: Party,
    pub customer: Party,
    pub line_items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RekeningKoranPayload {
    pub nama_bank: String,
    pub nomor_rekening: String,
    pub nama_pemegang: String,
    pub periode: String,
    pub saldo_awal: Decimal,
    pub saldo_akhir: Decimal,
    pub transactions: Vec<StandardizedTransaction>,
}

/// The typed union persisted on a [`super::ScanResult`]; tagged by
/// document type so (de)serialization round-trips without ambiguity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "document_type", rename_all = "snake_case")]
pub enum StructuredPayload {
    FakturPajak(FakturPajakPayload),
    Pph21(Pph21Payload),
    Pph23(Pph23Payload),
    Invoice(InvoicePayload),
    RekeningKoran(RekeningKoranPayload),
}

impl StructuredPayload {
    pub fn document_type(&self) -> super::DocumentType {
        use super::DocumentType::*;
        match self {
            StructuredPayload::FakturPajak(_) => FakturPajak,
            StructuredPayload::Pph21(_) => Pph21,
            StructuredPayload::Pph23(_) => Pph23,
            StructuredPayload::Invoice(_) => Invoice,
            StructuredPayload::RekeningKoran(_) => RekeningKoran,
        }
    }
}
