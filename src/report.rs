//! Markdown report of a [`ResumeRecord`].
//!
//! Every core field is always shown; an absent value prints as `N/A`.
//! Projects and custom sections appear only when the record has them.

use crate::record::ResumeRecord;
use std::fmt::Write;

const NA: &str = "N/A";

fn or_na(v: &Option<String>) -> &str {
    v.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(NA)
}

fn joined(v: &Option<Vec<String>>, sep: &str) -> String {
    match v {
        Some(items) if !items.is_empty() => items.join(sep),
        _ => NA.to_string(),
    }
}

/// Render the record as a Markdown document.
pub fn render_markdown(record: &ResumeRecord) -> String {
    let mut md = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut md, record);
    md
}

fn write_report(md: &mut String, r: &ResumeRecord) -> std::fmt::Result {
    writeln!(md, "# {}\n", or_na(&r.name))?;

    writeln!(md, "## Contact Information\n")?;
    let contact = r.contact_information.clone().unwrap_or_default();
    writeln!(md, "- Email: {}", or_na(&contact.email))?;
    writeln!(md, "- Phone: {}", or_na(&contact.phone))?;
    writeln!(md, "- LinkedIn: {}", or_na(&contact.linkedin))?;
    for (label, value) in [
        ("GitHub", &contact.github),
        ("Portfolio", &contact.portfolio),
        ("Address", &contact.address),
    ] {
        if let Some(v) = value {
            writeln!(md, "- {label}: {v}")?;
        }
    }
    writeln!(md)?;

    writeln!(md, "## Skills\n\n{}\n", joined(&r.skills, ", "))?;
    writeln!(md, "## Summary\n\n{}\n", or_na(&r.summary))?;

    writeln!(md, "## Work Experience\n")?;
    match r.work_experience.as_deref() {
        Some(jobs) if !jobs.is_empty() => {
            for (i, job) in jobs.iter().enumerate() {
                writeln!(
                    md,
                    "**{}. {} at {}**",
                    i + 1,
                    or_na(&job.job_title),
                    or_na(&job.company)
                )?;
                if let Some(ref loc) = job.location {
                    writeln!(md, "- Location: {loc}")?;
                }
                writeln!(md, "- Duration: {}", or_na(&job.duration))?;
                writeln!(md, "- Responsibilities: {}\n", joined(&job.responsibilities, "; "))?;
            }
        }
        _ => writeln!(md, "{NA}\n")?,
    }

    writeln!(md, "## Education\n")?;
    match r.education.as_deref() {
        Some(schools) if !schools.is_empty() => {
            for (i, edu) in schools.iter().enumerate() {
                writeln!(
                    md,
                    "**{}. {} from {}**",
                    i + 1,
                    or_na(&edu.degree),
                    or_na(&edu.institution)
                )?;
                writeln!(md, "- Graduation Year: {}", or_na(&edu.graduation_year))?;
                if let Some(ref details) = edu.details {
                    writeln!(md, "- Details: {}", details.join("; "))?;
                }
                writeln!(md)?;
            }
        }
        _ => writeln!(md, "{NA}\n")?,
    }

    if let Some(projects) = r.projects.as_deref().filter(|p| !p.is_empty()) {
        writeln!(md, "## Projects\n")?;
        for p in projects {
            writeln!(md, "**{}**", or_na(&p.name))?;
            if let Some(ref d) = p.description {
                writeln!(md, "- {d}")?;
            }
            if let Some(ref t) = p.technologies {
                writeln!(md, "- Technologies: {}", t.join(", "))?;
            }
            if let Some(ref l) = p.link {
                writeln!(md, "- Link: {l}")?;
            }
            writeln!(md)?;
        }
    }

    if let Some(ref sections) = r.custom_sections {
        for (title, items) in sections {
            writeln!(md, "## {title}\n")?;
            for item in items {
                writeln!(md, "- {item}")?;
            }
            writeln!(md)?;
        }
    }

    writeln!(md, "## Overall Summary\n\n{}\n", or_na(&r.overall_summary))?;

    let score = r
        .suitability_score
        .map(|s| s.to_string())
        .unwrap_or_else(|| NA.to_string());
    writeln!(md, "## Suitability Score: {score} / 100")
}
