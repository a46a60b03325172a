use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Company used when a form leaves the company blank.
pub const DEFAULT_COMPANY_ID: &str = "company1";

/// Watermark used for companies missing from the table below.
pub const DEFAULT_WATERMARK: &str = "lc_logo.png";

static WATERMARKS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([("company1", "lc_logo.png"), ("company2", "arr_logo.png")])
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Company {
    #[schema(example = "company1")]
    pub id: String,
    #[schema(example = "Lakshmi Consultancy Pvt. Ltd.")]
    pub display_name: String,
    #[schema(example = "letterheads/lc.png")]
    pub letterhead_asset: String,
}

impl Company {
    pub fn watermark(&self) -> &'static str {
        watermark_for(&self.id)
    }
}

pub fn watermark_for(company_id: &str) -> &'static str {
    WATERMARKS
        .get(company_id)
        .copied()
        .unwrap_or(DEFAULT_WATERMARK)
}

/// Read-only list of configured companies.
#[derive(Debug, Clone, Default)]
pub struct CompanyDirectory {
    companies: Vec<Company>,
}

impl CompanyDirectory {
    pub fn new(companies: Vec<Company>) -> Self {
        CompanyDirectory { companies }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read companies file {}", path.display()))?;
        let companies: Vec<Company> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid companies file {}", path.display()))?;
        Ok(CompanyDirectory::new(companies))
    }

    pub fn all(&self) -> &[Company] {
        &self.companies
    }

    pub fn resolve(&self, id: &str) -> Result<&Company, AppError> {
        self.companies
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::UnknownCompany(id.to_string()))
    }
}
