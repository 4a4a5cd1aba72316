//! Prompts for resume analysis and vision OCR.
//!
//! Keeping every prompt here lets unit tests inspect them directly without a
//! live model. The analysis prompt is deterministic: the same text and
//! profile always produce the same instruction.

use crate::config::PromptProfile;

/// Field list requested by [`PromptProfile::Standard`].
const STANDARD_FIELDS: &str = "\
- name
- contact_information (email, phone, linkedin)
- summary
- work_experience (job_title, company, duration, responsibilities)
- education (degree, institution, graduation_year)
- skills
- overall_summary
- suitability_score (0-100)";

/// Field list requested by [`PromptProfile::Extended`].
const EXTENDED_FIELDS: &str = "\
- name
- contact_information (email, phone, linkedin, github, portfolio, address)
- summary
- work_experience (job_title, company, location, duration, responsibilities)
- education (degree, institution, location, graduation_year, details)
- skills
- projects (name, description, technologies, link)
- custom_sections (object mapping a section title such as \"Awards\" to a list of strings)
- overall_summary
- suitability_score (0-100)";

/// Closing directive shared by every profile.
pub const JSON_ONLY_DIRECTIVE: &str = "Respond only with a valid JSON object.";

/// Build the analysis instruction for `resume_text`.
///
/// The resume text is embedded verbatim.
pub fn analysis_prompt(resume_text: &str, profile: PromptProfile) -> String {
    let fields = match profile {
        PromptProfile::Standard => STANDARD_FIELDS,
        PromptProfile::Extended => EXTENDED_FIELDS,
    };
    format!(
        "You are a smart resume assistant. Analyze the following resume and return a structured JSON with:\n\
{fields}\n\
\n\
Use exactly these keys. Omit a field when the resume does not contain it.\n\
\n\
Resume:\n\
{resume_text}\n\
\n\
{JSON_ONLY_DIRECTIVE}\n"
    )
}

/// System prompt for transcribing an image with a vision model.
pub const OCR_SYSTEM_PROMPT: &str = r#"You are an OCR engine. Transcribe ALL text visible in the image exactly as written.

Rules:
- Keep the reading order a human would use
- Keep line breaks between separate lines and blocks
- Do NOT describe the image, add commentary, or wrap the output in fences
- If the image contains no readable text, output nothing"#;
