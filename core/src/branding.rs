//! Site branding and the teacher info bar.

use serde::{Deserialize, Serialize};

/// Site name shown when none is configured.
pub const DEFAULT_SITE_NAME: &str = "Media Studies A/L";

/// Branding singleton stored at `branding`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrandingSettings {
    /// Site title in headers and the watermark.
    pub site_name: String,
    /// Teacher shown in the info bar.
    pub teacher_name: String,
    /// Class label under the teacher name.
    pub class_name: String,
    /// Login page tagline.
    pub tagline: String,
    /// Logo payload or URL; empty when no logo is set.
    pub logo: String,
    /// Theme primary colour.
    pub primary_color: String,
    /// Theme secondary colour.
    pub secondary_color: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub phone: String,
    /// WhatsApp number in any format.
    pub whatsapp: String,
    /// Facebook page URL.
    pub facebook: String,
    /// YouTube channel URL.
    pub youtube: String,
    /// Footer text.
    pub footer: String,
}

impl Default for BrandingSettings {
    fn default() -> Self {
        Self {
            site_name: DEFAULT_SITE_NAME.to_string(),
            teacher_name: String::new(),
            class_name: String::new(),
            tagline: "Online Learning Portal".to_string(),
            logo: String::new(),
            primary_color: "#6366f1".to_string(),
            secondary_color: "#8b5cf6".to_string(),
            email: String::new(),
            phone: String::new(),
            whatsapp: String::new(),
            facebook: String::new(),
            youtube: String::new(),
            footer: "© 2024 Media Studies A/L. All rights reserved.".to_string(),
        }
    }
}

impl BrandingSettings {
    /// Fill blank fields that have non-empty defaults.
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        for (field, fallback) in [
            (&mut self.site_name, defaults.site_name),
            (&mut self.tagline, defaults.tagline),
            (&mut self.primary_color, defaults.primary_color),
            (&mut self.secondary_color, defaults.secondary_color),
            (&mut self.footer, defaults.footer),
        ] {
            if field.trim().is_empty() {
                *field = fallback;
            }
        }
        self
    }

    /// Keep the stored logo; logos change only through the logo operations.
    pub fn retain_logo(&mut self, existing: &BrandingSettings) {
        self.logo = existing.logo.clone();
    }

    /// Info bar contents, or `None` when it should be hidden.
    pub fn teacher_info(&self) -> Option<TeacherInfo> {
        if [&self.teacher_name, &self.email, &self.phone, &self.whatsapp]
            .iter()
            .all(|v| v.is_empty())
        {
            return None;
        }

        let mut contacts = Vec::new();
        if !self.email.is_empty() {
            contacts.push(ContactLink::new("email", format!("mailto:{}", self.email)));
        }
        if !self.phone.is_empty() {
            contacts.push(ContactLink::new("phone", format!("tel:{}", self.phone)));
        }
        if !self.whatsapp.is_empty() {
            let digits: String = self.whatsapp.chars().filter(char::is_ascii_digit).collect();
            contacts.push(ContactLink::new("whatsapp", format!("https://wa.me/{}", digits)));
        }
        if !self.facebook.is_empty() {
            contacts.push(ContactLink::new("facebook", self.facebook.clone()));
        }
        if !self.youtube.is_empty() {
            contacts.push(ContactLink::new("youtube", self.youtube.clone()));
        }

        let name = [&self.teacher_name, &self.site_name]
            .into_iter()
            .find(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| "Teacher".to_string());

        Some(TeacherInfo {
            name,
            class_name: Some(self.class_name.clone()).filter(|c| !c.is_empty()),
            photo: Some(self.logo.clone()).filter(|l| !l.is_empty()),
            contacts,
        })
    }
}

/// One contact icon in the info bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactLink {
    /// Channel name.
    pub kind: &'static str,
    /// Target URL.
    pub href: String,
}

impl ContactLink {
    fn new(kind: &'static str, href: String) -> Self {
        Self { kind, href }
    }
}

/// Teacher info bar on the student dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherInfo {
    /// Teacher name, falling back to the site name.
    pub name: String,
    /// Class label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Logo reused as the teacher photo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Contact icons, in display order.
    pub contacts: Vec<ContactLink>,
}
