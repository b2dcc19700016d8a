//! End-to-end coverage of the Exporter Factory's public boundary
//! (`export_batch`/`export_single`), exercised against constructed
//! `ScanResult`s so it needs no PDF/OCR fixtures: a single Faktur Pajak
//! with one line item round-trips through the xlsx writer into a
//! well-formed workbook.

use fakturflow::export::{export_batch, export_single, ExportFormat};
use fakturflow::models::{
    FakturPajakPayload, LineItem, Party, ScanResult, StageTimings, StructuredPayload,
};
use rust_decimal::Decimal;

fn faktur_pajak_result() -> ScanResult {
    let payload = FakturPajakPayload {
        seller: Party {
            name: "PT Seller".into(),
            npwp: "01.234.567.8-901.000".into(),
            ..Default::default()
        },
        buyer: Party {
            name: "PT Buyer".into(),
            npwp: "09.876.543.2-109.000".into(),
            ..Default::default()
        },
        invoice_number: "010.000-26.00000001".into(),
        invoice_reference: "REF-1".into(),
        dpp: Decimal::new(1_000_000, 0),
        ppn: Decimal::new(110_000, 0),
        total: Decimal::new(1_110_000, 0),
        items: vec![LineItem {
            description: "Barang A".into(),
            quantity: Decimal::new(2, 0),
            unit_price: Decimal::new(500_000, 0),
        }],
        ..Default::default()
    };
    ScanResult::new(
        "result-1".into(),
        "file-1".into(),
        "raw ocr text".into(),
        StructuredPayload::FakturPajak(payload),
        0.92,
        "local".into(),
        None,
        StageTimings::default(),
    )
}

#[test]
fn xlsx_export_of_a_single_result_produces_a_nonempty_zip_backed_workbook() {
    let result = faktur_pajak_result();
    let bytes = export_single(&result, ExportFormat::Xlsx).expect("xlsx export should succeed");

    // xlsx files are zip archives; rust_xlsxwriter always starts one with
    // the standard local-file-header magic bytes.
    assert!(bytes.len() > 4);
    assert_eq!(&bytes[0..2], b"PK");
}

#[test]
fn html_export_of_a_single_result_embeds_the_seller_and_buyer_names() {
    let result = faktur_pajak_result();
    let bytes = export_single(&result, ExportFormat::Html).expect("html export should succeed");
    let html = String::from_utf8(bytes).expect("report output should be valid utf-8");
    assert!(html.contains("PT Seller"));
    assert!(html.contains("PT Buyer"));
}

#[test]
fn export_batch_rejects_an_empty_result_set() {
    let err = export_batch(&[], ExportFormat::Xlsx).unwrap_err();
    assert!(matches!(err, fakturflow::export::ExportError::Empty));
}
