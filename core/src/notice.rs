//! Notice and banner board.

use crate::content::Record;
use crate::error::{Error, Result};
use crate::lenient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Text notice priority. Affects styling only, never ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Informational.
    #[default]
    Normal,
    /// Highlighted.
    Important,
    /// Highest severity.
    Urgent,
}

impl Priority {
    /// Severity class used for badges.
    pub fn severity(self) -> &'static str {
        match self {
            Priority::Normal => "info",
            Priority::Important => "warning",
            Priority::Urgent => "danger",
        }
    }

    /// Icon name.
    pub fn icon(self) -> &'static str {
        match self {
            Priority::Normal => "fa-info-circle",
            Priority::Important => "fa-exclamation-triangle",
            Priority::Urgent => "fa-exclamation-circle",
        }
    }
}

/// Variant-specific notice fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NoticeBody {
    /// Announcement text.
    Text {
        /// Heading.
        #[serde(default)]
        title: String,
        /// Body text.
        #[serde(default)]
        message: String,
        /// Styling priority.
        #[serde(default)]
        priority: Priority,
        /// Optional link.
        #[serde(
            default,
            deserialize_with = "lenient::non_empty_string",
            skip_serializing_if = "Option::is_none"
        )]
        link: Option<String>,
    },
    /// Clickable image banner.
    Banner {
        /// Image payload or URL.
        #[serde(default)]
        image: String,
        /// Optional click-through link.
        #[serde(
            default,
            deserialize_with = "lenient::non_empty_string",
            skip_serializing_if = "Option::is_none"
        )]
        link: Option<String>,
    },
}

/// A notice record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Shown to students when true.
    #[serde(default, deserialize_with = "lenient::bool_or_string")]
    pub active: bool,
    /// Text or banner fields.
    #[serde(flatten)]
    pub body: NoticeBody,
}

impl Notice {
    /// Check the fields each variant needs.
    pub fn validate(&self) -> Result<()> {
        match &self.body {
            NoticeBody::Text { title, message, .. } => {
                if title.trim().is_empty() {
                    return Err(Error::MissingField { field: "title" });
                }
                if message.trim().is_empty() {
                    return Err(Error::MissingField { field: "message" });
                }
            }
            NoticeBody::Banner { image, .. } => {
                if image.is_empty() {
                    return Err(Error::MissingField { field: "image" });
                }
            }
        }
        Ok(())
    }

    /// Carry the stored banner image over when an edit omits it.
    pub fn retain_image(&mut self, existing: &Notice) {
        if let (NoticeBody::Banner { image, .. }, NoticeBody::Banner { image: kept, .. }) =
            (&mut self.body, &existing.body)
        {
            if image.is_empty() {
                *image = kept.clone();
            }
        }
    }
}

/// Shown iff active and not switched off by the per-notice override.
pub fn is_visible(id: &str, notice: &Notice, overrides: &BTreeMap<String, bool>) -> bool {
    notice.active && overrides.get(id) != Some(&false)
}

/// Text notice as students see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNoticeView {
    /// Record ID.
    pub id: String,
    /// Heading.
    pub title: String,
    /// Body.
    pub message: String,
    /// Priority.
    pub priority: Priority,
    /// Severity class.
    pub severity: &'static str,
    /// Icon name.
    pub icon: &'static str,
    /// Optional link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Banner as students see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerView {
    /// Record ID.
    pub id: String,
    /// Image source.
    pub image: String,
    /// Click-through link; the banner is clickable only when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Student-facing notice section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeFeed {
    /// Banners, in stored order.
    pub banners: Vec<BannerView>,
    /// Text notices, in stored order.
    pub notices: Vec<TextNoticeView>,
}

impl NoticeFeed {
    /// The section is hidden when nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.banners.is_empty() && self.notices.is_empty()
    }
}

/// Split visible notices into banners and text notices.
pub fn visible_notices(records: &[Record<Notice>], overrides: &BTreeMap<String, bool>) -> NoticeFeed {
    let mut feed = NoticeFeed::default();
    for record in records
        .iter()
        .filter(|r| is_visible(&r.id, &r.item, overrides))
    {
        match &record.item.body {
            NoticeBody::Banner { image, link } => feed.banners.push(BannerView {
                id: record.id.clone(),
                image: image.clone(),
                link: link.clone(),
            }),
            NoticeBody::Text {
                title,
                message,
                priority,
                link,
            } => feed.notices.push(TextNoticeView {
                id: record.id.clone(),
                title: title.clone(),
                message: message.clone(),
                priority: *priority,
                severity: priority.severity(),
                icon: priority.icon(),
                link: link.clone(),
            }),
        }
    }
    feed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(active: bool) -> Notice {
        Notice {
            active,
            body: NoticeBody::Text {
                title: "Exam".into(),
                message: "Starts Monday".into(),
                priority: Priority::Urgent,
                link: None,
            },
        }
    }

    #[test]
    fn override_false_hides_notice() {
        let records = vec![Record::new("n1", text(true))];
        let mut overrides = BTreeMap::new();
        assert_eq!(visible_notices(&records, &overrides).notices.len(), 1);

        overrides.insert("n1".to_string(), false);
        assert!(visible_notices(&records, &overrides).is_empty());

        overrides.insert("n1".to_string(), true);
        assert_eq!(visible_notices(&records, &overrides).notices.len(), 1);
    }

    #[test]
    fn inactive_notices_hidden() {
        let records = vec![Record::new("n1", text(false))];
        assert!(visible_notices(&records, &BTreeMap::new()).is_empty());
    }

    #[test]
    fn string_active_flag_accepted() {
        let notice: Notice = serde_json::from_value(json!({
            "type": "banner",
            "active": "true",
            "image": "data:image/png;base64,AAAA",
            "link": ""
        }))
        .unwrap();
        assert!(notice.active);
        assert_eq!(
            notice.body,
            NoticeBody::Banner {
                image: "data:image/png;base64,AAAA".into(),
                link: None
            }
        );
    }

    #[test]
    fn priority_styles() {
        assert_eq!(Priority::Urgent.icon(), "fa-exclamation-circle");
        assert_eq!(Priority::Important.severity(), "warning");
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn validation_per_variant() {
        assert!(text(true).validate().is_ok());
        let banner = Notice {
            active: true,
            body: NoticeBody::Banner {
                image: String::new(),
                link: None,
            },
        };
        assert_eq!(
            banner.validate(),
            Err(Error::MissingField { field: "image" })
        );
    }
}
