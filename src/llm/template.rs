//! Built-in [`Template`] definitions, one per document type. Templates are
//! constructed once at startup and handed to the Smart Mapper read-only —
//! there is no runtime-mutable template registry.

use crate::models::{DocumentType, FieldHint, Template};

pub fn builtin_template(document_type: DocumentType) -> Template {
    match document_type {
        DocumentType::FakturPajak => faktur_pajak(),
        DocumentType::Pph21 => pph21(),
        DocumentType::Pph23 => pph23(),
        DocumentType::Invoice => invoice(),
        DocumentType::RekeningKoran => rekening_koran(),
    }
}

fn faktur_pajak() -> Template {
    Template {
        document_type: DocumentType::FakturPajak,
        schema_name: "faktur_pajak_v1".to_string(),
        fields: vec![
            FieldHint::new("seller", "seller", true).with_notes("name, address, NPWP of the issuing party"),
            FieldHint::new("buyer", "buyer", true).with_notes("name, address, NPWP of the receiving party"),
            FieldHint::new("invoice_number", "invoice_number", true)
                .with_format("16 digits, may contain dots, e.g. 010.000-23.00000001"),
            FieldHint::new("invoice_issue_date", "invoice_issue_date", true).with_format("YYYY-MM-DD"),
            FieldHint::new("invoice_reference", "invoice_reference", false),
            FieldHint::new("dpp", "dpp", true).with_notes("taxable base, rupiah, no thousands separators"),
            FieldHint::new("ppn", "ppn", true).with_notes("VAT amount, rupiah"),
            FieldHint::new("total", "total", true),
            FieldHint::new("items", "items", false).with_notes("line items: description, quantity, unit_price"),
        ],
    }
}

fn pph21() -> Template {
    Template {
        document_type: DocumentType::Pph21,
        schema_name: "pph21_v1".to_string(),
        fields: vec![
            FieldHint::new("dokumen_nomor", "dokumen_nomor", true),
            FieldHint::new("masa_pajak", "masa_pajak", true).with_format("MM-YYYY"),
            FieldHint::new("dokumen_tanggal", "dokumen_tanggal", true).with_format("YYYY-MM-DD"),
            FieldHint::new("dokumen_dasar_jenis", "dokumen_dasar_jenis", false),
            FieldHint::new("dokumen_dasar_tanggal", "dokumen_dasar_tanggal", false).with_format("YYYY-MM-DD"),
            FieldHint::new("dokumen_dasar_nomor", "dokumen_dasar_nomor", false),
            FieldHint::new("identitas_pemotong", "identitas_pemotong", true).with_notes("withholding party"),
            FieldHint::new("penerima", "penerima", true).with_notes("income recipient"),
            FieldHint::new("dpp", "dpp", true),
            FieldHint::new("tarif", "tarif", true).with_notes("withholding rate, percentage as decimal"),
            FieldHint::new("pph", "pph", true).with_notes("withheld amount, rupiah"),
        ],
    }
}

fn pph23() -> Template {
    Template {
        document_type: DocumentType::Pph23,
        schema_name: "pph23_v1".to_string(),
        fields: vec![
            FieldHint::new("dokumen_nomor", "dokumen_nomor", true),
            FieldHint::new("dokumen_tanggal", "dokumen_tanggal", true).with_format("YYYY-MM-DD"),
            FieldHint::new("masa_pajak", "masa_pajak", true).with_format("MM-YYYY"),
            FieldHint::new("dokumen_dasar_jenis", "dokumen_dasar_jenis", false),
            FieldHint::new("dokumen_dasar_nomor", "dokumen_dasar_nomor", false),
            FieldHint::new("dokumen_dasar_tanggal", "dokumen_dasar_tanggal", false).with_format("YYYY-MM-DD"),
            FieldHint::new("penerima_nama", "penerima_nama", true),
            FieldHint::new("penerima_npwp", "penerima_npwp", true),
            FieldHint::new("penerima_alamat", "penerima_alamat", false),
            FieldHint::new("pemotong_nama", "pemotong_nama", true),
            FieldHint::new("pemotong_npwp", "pemotong_npwp", true),
            FieldHint::new("pemotong_alamat", "pemotong_alamat", false),
            FieldHint::new("objek_pajak_kode", "objek_pajak_kode", true),
            FieldHint::new("objek_pajak_jenis", "objek_pajak_jenis", true),
            FieldHint::new("objek_pajak_deskripsi", "objek_pajak_deskripsi", false),
            FieldHint::new("dpp", "dpp", true),
            FieldHint::new("tarif", "tarif", true),
            FieldHint::new("pph", "pph", true),
            FieldHint::new("bruto", "bruto", true),
            FieldHint::new("keterangan", "keterangan", false),
        ],
    }
}

fn invoice() -> Template {
    Template {
        document_type: DocumentType::Invoice,
        schema_name: "invoice_v1".to_string(),
        fields: vec![
            FieldHint::new("vendor", "vendor", true),
            FieldHint::new("customer", "customer", true),
            FieldHint::new("line_items", "line_items", false),
            FieldHint::new("subtotal", "subtotal", true),
            FieldHint::new("tax", "tax", false),
            FieldHint::new("total", "total", true),
        ],
    }
}

fn rekening_koran() -> Template {
    Template {
        document_type: DocumentType::RekeningKoran,
        schema_name: "rekening_koran_v1".to_string(),
        fields: vec![
            FieldHint::new("nama_bank", "nama_bank", true),
            FieldHint::new("nomor_rekening", "nomor_rekening", true),
            FieldHint::new("nama_pemegang", "nama_pemegang", true),
            FieldHint::new("periode", "periode", true).with_format("MM-YYYY or date range"),
            FieldHint::new("saldo_awal", "saldo_awal", true),
            FieldHint::new("saldo_akhir", "saldo_akhir", true),
            FieldHint::new("transactions", "transactions", true).with_notes(
                "one entry per row: transaction_date, description, debit xor credit, running balance",
            ),
        ],
    }
}
