//! HTML report rendering via `askama` server-rendered templates.

use askama::Template;

use crate::models::{DocumentType, ScanResult, StructuredPayload};

use super::group_by_type;

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate {
    sections: Vec<ReportSection>,
}

struct ReportSection {
    title: String,
    rows: Vec<ReportRow>,
}

struct ReportRow {
    summary: String,
    confidence_pct: u32,
    engine: String,
}

pub fn render_html_report(results: &[ScanResult]) -> Result<String, askama::Error> {
    let sections = group_by_type(results)
        .into_iter()
        .map(|(doc_type, bucket)| ReportSection {
            title: title_for(doc_type).to_string(),
            rows: bucket.into_iter().map(report_row).collect(),
        })
        .collect();

    ReportTemplate { sections }.render()
}

fn title_for(doc_type: DocumentType) -> &'static str {
    match doc_type {
        DocumentType::FakturPajak => "Faktur Pajak",
        DocumentType::Pph21 => "PPh 21",
        DocumentType::Pph23 => "PPh 23",
        DocumentType::Invoice => "Invoice",
        DocumentType::RekeningKoran => "Rekening Koran",
    }
}

fn report_row(result: &ScanResult) -> ReportRow {
    let summary = match &result.payload {
        StructuredPayload::FakturPajak(p) => format!("{} → {}", p.seller.name, p.buyer.name),
        StructuredPayload::Pph21(p) => format!("{} — {}", p.dokumen_nomor, p.penerima.name),
        StructuredPayload::Pph23(p) => format!("{} — {}", p.dokumen_nomor, p.penerima_nama),
        StructuredPayload::Invoice(p) => format!("{} → {}", p.vendor.name, p.customer.name),
        StructuredPayload::RekeningKoran(p) => format!("{} ({} rows)", p.nama_bank, p.transactions.len()),
    };
    ReportRow {
        summary,
        confidence_pct: (result.confidence * 100.0).round() as u32,
        engine: result.ocr_engine_id.clone(),
    }
}
