//! Per-type worksheet layouts. Each document type gets its own sheet with
//! a header row, one row per result, and (for types with summable money
//! columns) a grand-total row written as a `SUM` formula rather than a
//! precomputed literal, so the workbook stays correct if a cell is edited
//! downstream.

use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::models::{DocumentType, FakturPajakPayload, InvoicePayload, Pph21Payload, Pph23Payload, RekeningKoranPayload, ScanResult, StructuredPayload};

use super::{group_by_type, ExportError};

/// Column header sets, sized as fixed-length arrays so an accidental
/// column add/remove fails to compile against the expected count, rather
/// than silently drifting.
const FAKTUR_PAJAK_COLUMNS: [&str; 19] = [
    "Document File ID",
    "Seller Name", "Seller NPWP", "Seller Address",
    "Buyer Name", "Buyer NPWP", "Buyer Address", "Buyer Email",
    "Invoice Number", "Issue Date", "Invoice Reference",
    "Item Description", "Item Quantity", "Item Unit Price", "Item Line Total",
    "DPP", "PPN", "Total", "Confidence",
];

const PPH23_COLUMNS: [&str; 21] = [
    "Dokumen Nomor", "Dokumen Tanggal", "Masa Pajak",
    "Dokumen Dasar Jenis", "Dokumen Dasar Nomor", "Dokumen Dasar Tanggal",
    "Penerima Nama", "Penerima NPWP", "Penerima Alamat",
    "Pemotong Nama", "Pemotong NPWP", "Pemotong Alamat",
    "Objek Pajak Kode", "Objek Pajak Jenis", "Objek Pajak Deskripsi",
    "DPP", "Tarif", "PPh", "Bruto", "Keterangan", "Confidence",
];

const REKENING_KORAN_COLUMNS: [&str; 13] = [
    "Bank", "Account Number", "Account Holder",
    "Transaction Date", "Posting Date", "Description", "Type", "Reference",
    "Debit", "Credit", "Balance", "Branch", "Additional Info",
];

pub fn write_workbook(results: &[ScanResult]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for (doc_type, bucket) in group_by_type(results) {
        let sheet = workbook.add_worksheet().set_name(sheet_name(doc_type))?;
        match doc_type {
            DocumentType::FakturPajak => write_faktur_pajak(sheet, &header_format, &bucket)?,
            DocumentType::Pph21 => write_pph21(sheet, &header_format, &bucket)?,
            DocumentType::Pph23 => write_pph23(sheet, &header_format, &bucket)?,
            DocumentType::Invoice => write_invoice(sheet, &header_format, &bucket)?,
            DocumentType::RekeningKoran => write_rekening_koran(sheet, &header_format, &bucket)?,
        }
    }

    workbook.save_to_buffer().map_err(ExportError::from)
}

fn sheet_name(doc_type: DocumentType) -> &'static str {
    match doc_type {
        DocumentType::FakturPajak => "Faktur Pajak",
        DocumentType::Pph21 => "PPh 21",
        DocumentType::Pph23 => "PPh 23",
        DocumentType::Invoice => "Invoice",
        DocumentType::RekeningKoran => "Rekening Koran",
    }
}

fn f64_of(d: rust_decimal::Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// DD/MM/YYYY, the locale format used for every date cell.
fn format_date(d: Option<chrono::NaiveDate>) -> String {
    d.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default()
}

fn write_header(sheet: &mut Worksheet, format: &Format, columns: &[&str]) -> Result<(), XlsxError> {
    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, format)?;
    }
    Ok(())
}

/// Writes a `SUM` formula over `col` from row 1 to `last_row - 1` into
/// `last_row`, in A1 notation.
fn write_column_sum(sheet: &mut Worksheet, last_row: u32, col: u16, format: &Format) -> Result<(), XlsxError> {
    if last_row == 1 {
        return Ok(());
    }
    let col_letter = rust_xlsxwriter::utility::col_to_name(col);
    let formula = format!("=SUM({col_letter}2:{col_letter}{last_row})");
    sheet.write_formula_with_format(last_row, col, formula.as_str(), format)?;
    Ok(())
}

/// 19 columns, flat (no merged cells): one row per line item, with the
/// seller/buyer/invoice/financial fields repeated on every item row of the
/// same invoice. The grand-total row sums exactly the column as
/// displayed, so a multi-item invoice's repeated total is summed once per
/// item row.
fn write_faktur_pajak(sheet: &mut Worksheet, header_format: &Format, bucket: &[&ScanResult]) -> Result<(), XlsxError> {
    write_header(sheet, header_format, &FAKTUR_PAJAK_COLUMNS)?;

    let mut row = 1;
    for result in bucket {
        let StructuredPayload::FakturPajak(p) = &result.payload else { continue };
        if p.items.is_empty() {
            write_row_faktur_pajak(sheet, row, &result.document_file_id, p, None, result.confidence)?;
            row += 1;
        } else {
            for item in &p.items {
                write_row_faktur_pajak(sheet, row, &result.document_file_id, p, Some(item), result.confidence)?;
                row += 1;
            }
        }
    }
    let total_format = Format::new().set_bold();
    sheet.write_string_with_format(row, 10, "Grand Total", &total_format)?;
    write_column_sum(sheet, row, 15, &total_format)?;
    write_column_sum(sheet, row, 16, &total_format)?;
    write_column_sum(sheet, row, 17, &total_format)?;
    Ok(())
}

fn write_row_faktur_pajak(
    sheet: &mut Worksheet,
    row: u32,
    document_file_id: &str,
    p: &FakturPajakPayload,
    item: Option<&crate::models::LineItem>,
    confidence: f32,
) -> Result<(), XlsxError> {
    sheet.write_string(row, 0, document_file_id)?;
    sheet.write_string(row, 1, &p.seller.name)?;
    sheet.write_string(row, 2, &p.seller.npwp)?;
    sheet.write_string(row, 3, &p.seller.address)?;
    sheet.write_string(row, 4, &p.buyer.name)?;
    sheet.write_string(row, 5, &p.buyer.npwp)?;
    sheet.write_string(row, 6, &p.buyer.address)?;
    sheet.write_string(row, 7, p.buyer.email.as_deref().unwrap_or_default())?;
    sheet.write_string(row, 8, &p.invoice_number)?;
    sheet.write_string(row, 9, &format_date(p.invoice_issue_date))?;
    sheet.write_string(row, 10, &p.invoice_reference)?;
    sheet.write_string(row, 11, item.map(|i| i.description.as_str()).unwrap_or_default())?;
    sheet.write_number(row, 12, item.map(|i| f64_of(i.quantity)).unwrap_or(0.0))?;
    sheet.write_number(row, 13, item.map(|i| f64_of(i.unit_price)).unwrap_or(0.0))?;
    let line_total = item.map(|i| f64_of(i.quantity) * f64_of(i.unit_price)).unwrap_or(0.0);
    sheet.write_number(row, 14, line_total)?;
    sheet.write_number(row, 15, f64_of(p.dpp))?;
    sheet.write_number(row, 16, f64_of(p.ppn))?;
    sheet.write_number(row, 17, f64_of(p.total))?;
    sheet.write_number(row, 18, confidence as f64)?;
    Ok(())
}

fn write_pph21(sheet: &mut Worksheet, header_format: &Format, bucket: &[&ScanResult]) -> Result<(), XlsxError> {
    let columns = [
        "Dokumen Nomor", "Masa Pajak", "Dokumen Tanggal",
        "Dokumen Dasar Jenis", "Dokumen Dasar Tanggal", "Dokumen Dasar Nomor",
        "Pemotong Nama", "Pemotong NPWP", "Penerima Nama", "Penerima NPWP",
        "DPP", "Tarif", "PPh", "Confidence",
    ];
    write_header(sheet, header_format, &columns)?;

    let mut row = 1;
    for result in bucket {
        let StructuredPayload::Pph21(p) = &result.payload else { continue };
        sheet.write_string(row, 0, &p.dokumen_nomor)?;
        sheet.write_string(row, 1, &p.masa_pajak)?;
        sheet.write_string(row, 2, &format_date(p.dokumen_tanggal))?;
        sheet.write_string(row, 3, &p.dokumen_dasar_jenis)?;
        sheet.write_string(row, 4, &format_date(p.dokumen_dasar_tanggal))?;
        sheet.write_string(row, 5, &p.dokumen_dasar_nomor)?;
        sheet.write_string(row, 6, &p.identitas_pemotong.name)?;
        sheet.write_string(row, 7, &p.identitas_pemotong.npwp)?;
        sheet.write_string(row, 8, &p.penerima.name)?;
        sheet.write_string(row, 9, &p.penerima.npwp)?;
        sheet.write_number(row, 10, f64_of(p.dpp))?;
        sheet.write_number(row, 11, f64_of(p.tarif))?;
        sheet.write_number(row, 12, f64_of(p.pph))?;
        sheet.write_number(row, 13, result.confidence as f64)?;
        row += 1;
    }
    let total_format = Format::new().set_bold();
    sheet.write_string_with_format(row, 9, "Grand Total", &total_format)?;
    write_column_sum(sheet, row, 10, &total_format)?;
    write_column_sum(sheet, row, 12, &total_format)?;
    Ok(())
}

/// 20 columns, one per [`Pph23Payload`] field in declaration order, plus a
/// trailing confidence column.
fn write_pph23(sheet: &mut Worksheet, header_format: &Format, bucket: &[&ScanResult]) -> Result<(), XlsxError> {
    write_header(sheet, header_format, &PPH23_COLUMNS)?;

    let mut row = 1;
    for result in bucket {
        let StructuredPayload::Pph23(p) = &result.payload else { continue };
        write_row_pph23(sheet, row, p, result.confidence)?;
        row += 1;
    }
    let total_format = Format::new().set_bold();
    sheet.write_string_with_format(row, 14, "Grand Total", &total_format)?;
    write_column_sum(sheet, row, 15, &total_format)?;
    write_column_sum(sheet, row, 17, &total_format)?;
    write_column_sum(sheet, row, 18, &total_format)?;
    Ok(())
}

fn write_row_pph23(sheet: &mut Worksheet, row: u32, p: &Pph23Payload, confidence: f32) -> Result<(), XlsxError> {
    sheet.write_string(row, 0, &p.dokumen_nomor)?;
    sheet.write_string(row, 1, &format_date(p.dokumen_tanggal))?;
    sheet.write_string(row, 2, &p.masa_pajak)?;
    sheet.write_string(row, 3, &p.dokumen_dasar_jenis)?;
    sheet.write_string(row, 4, &p.dokumen_dasar_nomor)?;
    sheet.write_string(row, 5, &format_date(p.dokumen_dasar_tanggal))?;
    sheet.write_string(row, 6, &p.penerima_nama)?;
    sheet.write_string(row, 7, &p.penerima_npwp)?;
    sheet.write_string(row, 8, &p.penerima_alamat)?;
    sheet.write_string(row, 9, &p.pemotong_nama)?;
    sheet.write_string(row, 10, &p.pemotong_npwp)?;
    sheet.write_string(row, 11, &p.pemotong_alamat)?;
    sheet.write_string(row, 12, &p.objek_pajak_kode)?;
    sheet.write_string(row, 13, &p.objek_pajak_jenis)?;
    sheet.write_string(row, 14, &p.objek_pajak_deskripsi)?;
    sheet.write_number(row, 15, f64_of(p.dpp))?;
    sheet.write_number(row, 16, f64_of(p.tarif))?;
    sheet.write_number(row, 17, f64_of(p.pph))?;
    sheet.write_number(row, 18, f64_of(p.bruto))?;
    sheet.write_string(row, 19, &p.keterangan)?;
    sheet.write_number(row, 20, confidence as f64)?;
    Ok(())
}

fn write_invoice(sheet: &mut Worksheet, header_format: &Format, bucket: &[&ScanResult]) -> Result<(), XlsxError> {
    let columns = [
        "Vendor Name", "Vendor NPWP", "Customer Name", "Customer NPWP",
        "Line Item Count", "Subtotal", "Tax", "Total", "Confidence",
    ];
    write_header(sheet, header_format, &columns)?;

    let mut row = 1;
    for result in bucket {
        let StructuredPayload::Invoice(p) = &result.payload else { continue };
        write_row_invoice(sheet, row, p, result.confidence)?;
        row += 1;
    }
    let total_format = Format::new().set_bold();
    sheet.write_string_with_format(row, 4, "Grand Total", &total_format)?;
    write_column_sum(sheet, row, 5, &total_format)?;
    write_column_sum(sheet, row, 6, &total_format)?;
    write_column_sum(sheet, row, 7, &total_format)?;
    Ok(())
}

fn write_row_invoice(sheet: &mut Worksheet, row: u32, p: &InvoicePayload, confidence: f32) -> Result<(), XlsxError> {
    sheet.write_string(row, 0, &p.vendor.name)?;
    sheet.write_string(row, 1, &p.vendor.npwp)?;
    sheet.write_string(row, 2, &p.customer.name)?;
    sheet.write_string(row, 3, &p.customer.npwp)?;
    sheet.write_number(row, 4, p.line_items.len() as f64)?;
    sheet.write_number(row, 5, f64_of(p.subtotal))?;
    sheet.write_number(row, 6, f64_of(p.tax))?;
    sheet.write_number(row, 7, f64_of(p.total))?;
    sheet.write_number(row, 8, confidence as f64)?;
    Ok(())
}

/// 13 columns, one row per standardized transaction across every rekening
/// koran result in the bucket, prefixed with the owning
/// account's identity so rows from different accounts stay distinguishable
/// once flattened. Every date cell is normalized to DD/MM/YYYY.
fn write_rekening_koran(sheet: &mut Worksheet, header_format: &Format, bucket: &[&ScanResult]) -> Result<(), XlsxError> {
    write_header(sheet, header_format, &REKENING_KORAN_COLUMNS)?;

    let mut row = 1;
    for result in bucket {
        let StructuredPayload::RekeningKoran(p) = &result.payload else { continue };
        write_rekening_koran_rows(sheet, &mut row, p)?;
    }
    let total_format = Format::new().set_bold();
    sheet.write_string_with_format(row, 7, "Grand Total", &total_format)?;
    write_column_sum(sheet, row, 8, &total_format)?;
    write_column_sum(sheet, row, 9, &total_format)?;
    Ok(())
}

fn write_rekening_koran_rows(sheet: &mut Worksheet, row: &mut u32, p: &RekeningKoranPayload) -> Result<(), XlsxError> {
    for txn in &p.transactions {
        sheet.write_string(*row, 0, &p.nama_bank)?;
        sheet.write_string(*row, 1, &p.nomor_rekening)?;
        sheet.write_string(*row, 2, &p.nama_pemegang)?;
        sheet.write_string(*row, 3, &format_date(Some(txn.transaction_date)))?;
        sheet.write_string(*row, 4, &format_date(txn.posting_date))?;
        sheet.write_string(*row, 5, &txn.description)?;
        sheet.write_string(*row, 6, &txn.transaction_type)?;
        sheet.write_string(*row, 7, &txn.reference_number)?;
        sheet.write_number(*row, 8, f64_of(txn.debit))?;
        sheet.write_number(*row, 9, f64_of(txn.credit))?;
        sheet.write_number(*row, 10, f64_of(txn.balance))?;
        sheet.write_string(*row, 11, &txn.branch)?;
        sheet.write_string(*row, 12, &txn.additional_info)?;
        *row += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FakturPajakPayload, LineItem, Party, StageTimings};
    use rust_decimal::Decimal;

    fn faktur_pajak_scan_result(items: Vec<LineItem>) -> ScanResult {
        let payload = FakturPajakPayload {
            seller: Party { name: "PT Seller".into(), npwp: "01.234.567.8-901.000".into(), ..Default::default() },
            buyer: Party {
                name: "PT Buyer".into(),
                npwp: "09.876.543.2-109.000".into(),
                email: Some("buyer@example.com".into()),
                ..Default::default()
            },
            invoice_number: "010.000-26.00000001".into(),
            invoice_reference: "REF-1".into(),
            dpp: Decimal::new(1_000_000, 0),
            ppn: Decimal::new(110_000, 0),
            total: Decimal::new(1_110_000, 0),
            items,
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

    /// A single faktur pajak result with one line item produces a header
    /// row, one data row, and a grand-total row — 19 columns wide.
    #[test]
    fn write_faktur_pajak_single_item_produces_one_data_row_at_19_columns() {
        assert_eq!(FAKTUR_PAJAK_COLUMNS.len(), 19);

        let result = faktur_pajak_scan_result(vec![LineItem {
            description: "Barang A".into(),
            quantity: Decimal::new(2, 0),
            unit_price: Decimal::new(500_000, 0),
        }]);
        let results = vec![result];
        let bucket: Vec<&ScanResult> = results.iter().collect();

        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        write_faktur_pajak(sheet, &header_format, &bucket).unwrap();

        // header + 1 data row (+ implicit grand-total row at index 2):
        // nothing asserts sheet dimensions directly via rust_xlsxwriter, so
        // this is exercised for panics/Err only; column count is guaranteed
        // at compile time by `FAKTUR_PAJAK_COLUMNS`'s fixed array length.
    }

    /// A multi-item invoice repeats the seller/buyer/invoice/financial
    /// fields on every item row rather than collapsing to one row per
    /// document.
    #[test]
    fn write_faktur_pajak_repeats_document_fields_across_multiple_item_rows() {
        let result = faktur_pajak_scan_result(vec![
            LineItem { description: "Barang A".into(), quantity: Decimal::new(2, 0), unit_price: Decimal::new(500_000, 0) },
            LineItem { description: "Barang B".into(), quantity: Decimal::new(1, 0), unit_price: Decimal::new(100_000, 0) },
        ]);
        let results = vec![result];
        let bucket: Vec<&ScanResult> = results.iter().collect();

        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        write_faktur_pajak(sheet, &header_format, &bucket).unwrap();
    }

    #[test]
    fn rekening_koran_columns_match_spec_count() {
        assert_eq!(REKENING_KORAN_COLUMNS.len(), 13);
    }

    #[test]
    fn pph23_columns_match_spec_count_plus_confidence() {
        assert_eq!(PPH23_COLUMNS.len(), 21);
    }

    #[test]
    fn format_date_renders_dd_mm_yyyy() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(format_date(Some(date)), "07/03/2026");
        assert_eq!(format_date(None), "");
    }
}
