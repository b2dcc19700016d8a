//! Prompt construction for the Smart Mapper: placeholder-substitution
//! prompts that build a strict JSON-only contract instead of free text,
//! since the output here is parsed back into a
//! [`crate::models::StructuredPayload`].

use crate::models::Template;

/// Build the extraction prompt for one OCR pass. The model is told the
/// exact field list and is instructed to answer with JSON only — no
/// markdown fences, no commentary — so the mapper can parse the response
/// directly.
pub fn extraction_prompt(template: &Template, ocr_text: &str) -> String {
    let mut fields = String::new();
    for field in &template.fields {
        let required = if field.required { "required" } else { "optional" };
        let format = field.format_hint.as_deref().unwrap_or("");
        let notes = field.notes.as_deref().unwrap_or("");
        fields.push_str(&format!(
            "- {} ({}, {}){}{}\n",
            field.path,
            required,
            format,
            if notes.is_empty() { "" } else { ": " },
            notes
        ));
    }

    format!(
        "You are extracting structured data from an OCR'd {} document.\n\
         Extract these fields:\n{}\n\
         Respond with ONLY a single JSON object matching schema `{}`. \
         Do not wrap the JSON in markdown code fences. Do not include any \
         explanation before or after the JSON. Use null for fields you \
         cannot find. Render all monetary amounts as plain decimal \
         strings with no thousands separators.\n\n\
         OCR TEXT:\n{}",
        template.document_type, fields, template.schema_name, ocr_text
    )
}

/// Follow-up prompt sent exactly once, when the first response failed to
/// parse as valid JSON: retry once, then flag `extractor_parse` if it
/// still fails.
pub fn repair_prompt(template: &Template, previous_response: &str) -> String {
    format!(
        "Your previous response did not parse as valid JSON for schema `{}`. \
         Respond again with ONLY the corrected JSON object, no markdown \
         fences, no commentary.\n\nPREVIOUS RESPONSE:\n{}",
        template.schema_name, previous_response
    )
}
