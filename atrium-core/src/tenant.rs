//! Tenant records and their cache projection.

use serde::{Deserialize, Serialize};

use crate::{hostname, new_tenant_id, Timestamp};

/// Visual settings for a tenant site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSettings {
    /// Theme preset name, e.g. `"clinic"` or `"studio"`.
    pub preset: String,
    pub primary_color: Option<String>,
    pub accent_color: Option<String>,
    pub font_family: Option<String>,
    pub logo_url: Option<String>,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            preset: "default".to_string(),
            primary_color: None,
            accent_color: None,
            font_family: None,
            logo_url: None,
        }
    }
}

/// Per-tenant feature switches for the content collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    pub services: bool,
    pub team: bool,
    pub testimonials: bool,
    pub faqs: bool,
    pub blog: bool,
    pub contact_form: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            services: true,
            team: true,
            testimonials: true,
            faqs: true,
            blog: false,
            contact_form: true,
        }
    }
}

/// Contact metadata shown on the tenant's site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// One customer site hosted by the platform.
///
/// Tenants are never hard-deleted. At most one tenant may claim a given
/// bare domain; the store enforces this on upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    pub id: String,
    /// Unique slug used to namespace the tenant's paths.
    pub slug: String,
    pub name: String,
    /// Custom domain, with or without a `www.` prefix.
    pub domain: Option<String>,
    #[serde(default)]
    pub theme: ThemeSettings,
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub contact: ContactInfo,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TenantRecord {
    /// New tenant with a fresh id and default settings.
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: new_tenant_id(),
            slug: slug.into(),
            name: name.into(),
            domain: None,
            theme: ThemeSettings::default(),
            features: FeatureFlags::default(),
            contact: ContactInfo::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Whether a non-blank domain is set.
    pub fn has_domain(&self) -> bool {
        self.domain.as_deref().is_some_and(|d| !d.trim().is_empty())
    }

    /// The normalized bare domain, if any.
    pub fn bare_domain(&self) -> Option<String> {
        self.domain
            .as_deref()
            .map(hostname::bare_domain)
            .filter(|d| !d.is_empty())
    }

    /// Project to the fields the resolution cache keeps.
    pub fn to_ref(&self) -> TenantRef {
        TenantRef {
            slug: self.slug.clone(),
            id: self.id.clone(),
        }
    }
}

/// What a hostname resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantRef {
    pub slug: String,
    pub id: String,
}

impl TenantRef {
    pub fn new(slug: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_domain() {
        let tenant = TenantRecord::new("clinic", "Clinic");
        assert!(!tenant.has_domain());
        assert!(!tenant.clone().with_domain("  ").has_domain());
        assert!(tenant.with_domain("clinic.test").has_domain());
    }

    #[test]
    fn test_bare_domain_normalizes() {
        let tenant = TenantRecord::new("clinic", "Clinic").with_domain("WWW.Clinic.Test");
        assert_eq!(tenant.bare_domain().as_deref(), Some("clinic.test"));
    }

    #[test]
    fn test_to_ref() {
        let tenant = TenantRecord::new("clinic", "Clinic").with_id("t1");
        assert_eq!(tenant.to_ref(), TenantRef::new("clinic", "t1"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = serde_json::json!({
            "id": "t1",
            "slug": "clinic",
            "name": "Clinic",
            "domain": "clinic.test",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z"
        });
        let tenant: TenantRecord = serde_json::from_value(json).unwrap();
        assert_eq!(tenant.theme, ThemeSettings::default());
        assert!(tenant.features.faqs);
    }
}
