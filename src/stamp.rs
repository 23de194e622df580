//! One stamped copy of the template per company.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::config::StampJob;
use crate::pdf::{save_document, stamp_clause, ClauseFont};

/// Stamp every company of `job` in order and return the written paths.
///
/// Each company gets a fresh document loaded from `template`. The first
/// failure aborts the remaining companies.
pub fn stamp_all<F: ClauseFont + ?Sized>(job: &StampJob, template: &[u8], font: &F) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(job.company_names.len());
    for name in &job.company_names {
        let path = stamp_company(job, template, font, name)?;
        println!("Out: \"{}\"", path.display());
        written.push(path);
    }
    Ok(written)
}

fn stamp_company<F: ClauseFont + ?Sized>(job: &StampJob, template: &[u8], font: &F, name: &str) -> Result<PathBuf> {
    let clause = job.clause.render(name);
    let mut doc = stamp_clause(template, job.page, &clause, font, &job.style)
        .with_context(|| format!("Failed to stamp the clause for {:?}", name))?;
    let bytes = save_document(&mut doc)?;

    let output = PathBuf::from(job.output.render(name));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {:?}", parent))?;
    }
    fs::write(&output, bytes)
        .with_context(|| format!("Failed to write {:?}", output))?;

    info!(company = name, path = %output.display(), "wrote stamped PDF");
    Ok(output)
}
