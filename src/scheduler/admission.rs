//! Submission validation and archive expansion for the Batch Scheduler.
//! Archive admission is all-or-nothing: one disallowed member type
//! rejects the whole archive rather than silently dropping the bad
//! entries.

use std::io::Read;

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::models::DocumentType;

/// One file as submitted by a caller, before it is hashed and written to
/// the object store.
pub struct SubmissionFile {
    pub filename: String,
    pub declared_type: DocumentType,
    pub bytes: Vec<u8>,
}

/// A caller-declared manifest entry describing one member of a submitted
/// archive. The archive's own zip directory names the bytes; this
/// manifest names the document type the caller asserts for each one.
pub struct ArchiveManifestEntry {
    pub archive_member_name: String,
    pub declared_type: DocumentType,
}

pub fn validate_plain_submission(config: &Config, files: &[SubmissionFile]) -> CoreResult<()> {
    if files.is_empty() {
        return Err(CoreError::validation("a batch must contain at least one file"));
    }
    if files.len() as u32 > config.max_files_per_batch {
        return Err(CoreError::validation(format!(
            "batch has {} files, exceeding max_files_per_batch ({})",
            files.len(),
            config.max_files_per_batch
        )));
    }
    validate_content_kinds(files)
}

/// The content-sniffing half of [`validate_plain_submission`], shared with
/// [`extract_archive`] so an already archive-admitted (and thus
/// `max_archive_files`-capped) file list is never re-checked against the
/// stricter plain-submission file-count cap.
fn validate_content_kinds(files: &[SubmissionFile]) -> CoreResult<()> {
    for file in files {
        check_content_kind(&file.filename, &file.bytes)?;
    }
    Ok(())
}

/// Sniff the actual file content (never trust the declared/file-extension
/// type alone) and reject anything that isn't a PDF or a common scanned-page
/// image format. This is a boundary validation, not type detection — the
/// declared document type is still taken from the caller.
fn check_content_kind(filename: &str, bytes: &[u8]) -> CoreResult<()> {
    match infer::get(bytes) {
        Some(kind) if kind.mime_type() == "application/pdf" || kind.mime_type().starts_with("image/") => Ok(()),
        Some(kind) => Err(CoreError::validation(format!(
            "{filename} has unsupported content type {} (expected a PDF or scanned image)",
            kind.mime_type()
        ))),
        None => Err(CoreError::validation(format!(
            "{filename} content could not be identified as a PDF or image"
        ))),
    }
}

/// Extract a submitted zip archive into plain [`SubmissionFile`]s,
/// enforcing the archive-only caps and the all-or-nothing type policy
/// before touching any bytes.
pub fn extract_archive(
    config: &Config,
    archive_bytes: Vec<u8>,
    manifest: Vec<ArchiveManifestEntry>,
) -> CoreResult<Vec<SubmissionFile>> {
    if manifest.len() as u32 > config.max_archive_files {
        return Err(CoreError::validation(format!(
            "archive declares {} members, exceeding max_archive_files ({})",
            manifest.len(),
            config.max_archive_files
        )));
    }

    if let Some(bad) = manifest
        .iter()
        .find(|entry| !config.archive_allowed_types.contains(&entry.declared_type) || !entry.declared_type.archive_eligible())
    {
        return Err(CoreError::validation(format!(
            "archive member {} declares disallowed type {}; the whole archive is rejected",
            bad.archive_member_name, bad.declared_type
        )));
    }

    let cursor = std::io::Cursor::new(archive_bytes);
    let mut zip = zip::ZipArchive::new(cursor).map_err(|e| CoreError::validation(format!("not a valid zip archive: {e}")))?;

    let mut files = Vec::with_capacity(manifest.len());
    for entry in manifest {
        let mut member = zip
            .by_name(&entry.archive_member_name)
            .map_err(|e| CoreError::validation(format!("archive missing declared member {}: {e}", entry.archive_member_name)))?;
        let mut bytes = Vec::with_capacity(member.size() as usize);
        member
            .read_to_end(&mut bytes)
            .map_err(|e| CoreError::validation(format!("failed to read archive member {}: {e}", entry.archive_member_name)))?;
        if bytes.len() as u64 > config.max_file_bytes {
            return Err(CoreError::validation(format!(
                "archive member {} exceeds max_file_bytes ({} > {})",
                entry.archive_member_name,
                bytes.len(),
                config.max_file_bytes
            )));
        }
        files.push(SubmissionFile {
            filename: entry.archive_member_name,
            declared_type: entry.declared_type,
            bytes,
        });
    }

    if files.is_empty() {
        return Err(CoreError::validation("an archive must contain at least one file"));
    }
    validate_content_kinds(&files)?;
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    /// A minimal single-page, zero-content PDF: enough for `infer` to
    /// recognize the `%PDF-` magic bytes without needing a real document.
    fn minimal_pdf_bytes() -> Vec<u8> {
        b"%PDF-1.4\n1 0 obj<<>>endobj\ntrailer<<>>\n%%EOF".to_vec()
    }

    fn zip_with_one_member(member_name: &str, bytes: &[u8]) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut buf);
        writer.start_file(member_name, zip::write::SimpleFileOptions::default()).unwrap();
        std::io::Write::write_all(&mut writer, bytes).unwrap();
        writer.finish().unwrap();
        buf.into_inner()
    }

    /// An archive with one disallowed member type is rejected in its
    /// entirety; not one byte of the zip is read for any member other
    /// than the one that failed the type check.
    #[test]
    fn archive_with_one_disallowed_member_type_rejects_the_whole_archive() {
        let config = Config::default();
        let archive_bytes = zip_with_one_member("statement.pdf", &minimal_pdf_bytes());
        let manifest = vec![ArchiveManifestEntry {
            archive_member_name: "statement.pdf".into(),
            declared_type: DocumentType::RekeningKoran,
        }];

        let err = extract_archive(&config, archive_bytes, manifest).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }

    #[test]
    fn archive_exceeding_max_archive_files_is_rejected_before_any_zip_io() {
        let config = Config::default();
        let manifest: Vec<_> = (0..(config.max_archive_files + 1))
            .map(|i| ArchiveManifestEntry {
                archive_member_name: format!("file-{i}.pdf"),
                declared_type: DocumentType::FakturPajak,
            })
            .collect();

        // Empty archive bytes: if this failed for any reason other than the
        // cap check, `zip::ZipArchive::new` would error on malformed bytes
        // instead, so a validation error here confirms the cap is checked
        // first.
        let err = extract_archive(&config, Vec::new(), manifest).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }

    #[test]
    fn content_sniffing_rejects_a_file_whose_bytes_do_not_match_a_pdf_or_image() {
        let config = Config::default();
        let files = vec![SubmissionFile {
            filename: "not-really-a-pdf.pdf".into(),
            declared_type: DocumentType::FakturPajak,
            bytes: b"plain text pretending to be a document".to_vec(),
        }];
        let err = validate_plain_submission(&config, &files).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }

    /// An archive in the 51-100 file range is within `max_archive_files`
    /// but over `max_files_per_batch`; it must be admitted, not rejected by
    /// the stricter plain-submission cap.
    #[test]
    fn archive_with_51_to_100_files_is_admitted() {
        let config = Config::default();
        let pdf = minimal_pdf_bytes();
        let member_count = 75u32;
        assert!(member_count > config.max_files_per_batch);
        assert!(member_count <= config.max_archive_files);

        let mut buf = std::io::Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut buf);
        let manifest: Vec<_> = (0..member_count)
            .map(|i| {
                let name = format!("file-{i}.pdf");
                writer.start_file(&name, zip::write::SimpleFileOptions::default()).unwrap();
                std::io::Write::write_all(&mut writer, &pdf).unwrap();
                ArchiveManifestEntry {
                    archive_member_name: name,
                    declared_type: DocumentType::FakturPajak,
                }
            })
            .collect();
        writer.finish().unwrap();
        let archive_bytes = buf.into_inner();

        let files = extract_archive(&config, archive_bytes, manifest).unwrap();
        assert_eq!(files.len() as u32, member_count);
    }

    #[test]
    fn content_sniffing_accepts_real_pdf_bytes_regardless_of_declared_type() {
        let config = Config::default();
        let files = vec![SubmissionFile {
            filename: "scan.pdf".into(),
            declared_type: DocumentType::FakturPajak,
            bytes: minimal_pdf_bytes(),
        }];
        assert!(validate_plain_submission(&config, &files).is_ok());
    }
}
