//! List filtering, ordering and card view models.
//!
//! `list` applies the type filter (tutorials only), then access, then
//! month, and orders newest first by `createdAt`. Records without a
//! timestamp sort as oldest; ties fall back to the ID, which is
//! time-ordered for pushed records.

use crate::calendar;
use crate::content::{is_locked, Access, Content, ContentKind, Record, TutorialType};
use crate::error::Result;
use crate::video::Player;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Filters accepted by a content listing. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFilter {
    /// Access tier filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
    /// Exact `YYYY-MM` month filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    /// Tutorial type filter; ignored for other kinds.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tutorial_type: Option<TutorialType>,
}

impl ContentFilter {
    /// Build a filter from raw query values, where `"all"` or an empty
    /// value disables that filter. The month is compared verbatim, so a
    /// value no record carries selects nothing.
    pub fn parse(access: Option<&str>, month: Option<&str>, kind: Option<&str>) -> Result<Self> {
        fn selected(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|v| !v.is_empty() && *v != "all")
        }

        let access = selected(access).map(str::parse).transpose()?;
        let month = selected(month).map(str::to_string);
        let tutorial_type = selected(kind).map(str::parse).transpose()?;
        Ok(Self {
            access,
            month,
            tutorial_type,
        })
    }

    fn matches<T: Content>(&self, item: &T) -> bool {
        if let (Some(wanted), Some(actual)) = (self.tutorial_type, item.tutorial_type()) {
            if wanted != actual {
                return false;
            }
        }
        if let Some(access) = self.access {
            if item.base().access != access {
                return false;
            }
        }
        if let Some(month) = &self.month {
            if item.base().month.as_deref() != Some(month.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Filter and order records, newest first.
pub fn list<T: Content>(records: Vec<Record<T>>, filter: &ContentFilter) -> Vec<Record<T>> {
    let mut items: Vec<Record<T>> = records
        .into_iter()
        .filter(|record| filter.matches(&record.item))
        .collect();
    sort_newest_first(&mut items);
    items
}

/// Order records by `createdAt` descending; missing timestamps last.
pub fn sort_newest_first<T: Content>(items: &mut [Record<T>]) {
    items.sort_by(|a, b| {
        let key_a = (a.item.base().created_at, &a.id);
        let key_b = (b.item.base().created_at, &b.id);
        key_b.cmp(&key_a)
    });
}

/// Distinct months present in the records, newest first.
pub fn available_months<T: Content>(records: &[Record<T>]) -> Vec<String> {
    let mut months: Vec<String> = records
        .iter()
        .filter_map(|r| r.item.base().month.clone())
        .filter(|m| calendar::parse_month(m).is_some())
        .collect();
    months.sort_by_key(|m| Reverse(m.clone()));
    months.dedup();
    months
}

/// Number of records the viewer can open.
pub fn accessible_count<T: Content>(records: &[Record<T>], viewer: Access) -> usize {
    records
        .iter()
        .filter(|r| !is_locked(r.item.base().access, viewer))
        .count()
}

/// Actions offered on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardActions {
    /// Open the viewer or player.
    pub view: bool,
    /// Download the file.
    pub download: bool,
}

/// One entry in a rendered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCard {
    /// Record ID.
    pub id: String,
    /// Collection.
    pub kind: ContentKind,
    /// Title.
    pub title: String,
    /// Description, empty when unset.
    pub description: String,
    /// Access tier.
    pub access: Access,
    /// "Free" or "Paid".
    pub access_label: &'static str,
    /// "Mar 2024", when a month is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_label: Option<String>,
    /// Tutorial type or video source label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind_label: Option<&'static str>,
    /// Thumbnail URL; `None` renders the placeholder icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Whether the viewer lacks access.
    pub locked: bool,
    /// File reference, withheld when locked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Offered actions.
    pub actions: CardActions,
    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl ContentCard {
    /// Build the card a viewer with `viewer` access sees.
    pub fn build<T: Content>(record: &Record<T>, viewer: Access) -> Self {
        let base = record.item.base();
        let locked = is_locked(base.access, viewer);
        let file = (!locked)
            .then(|| record.item.media_ref().map(str::to_string))
            .flatten();
        Self {
            id: record.id.clone(),
            kind: T::KIND,
            title: base.title.clone(),
            description: base.description.clone(),
            access: base.access,
            access_label: base.access.label(),
            month_label: base.month.as_deref().and_then(calendar::format_month),
            kind_label: record.item.kind_badge(),
            thumbnail: record.item.thumbnail(),
            locked,
            actions: CardActions {
                view: !locked,
                download: !locked && base.downloadable && T::KIND != ContentKind::Videos,
            },
            file,
            created_at: base.created_at,
        }
    }
}

/// Cards for an already filtered and ordered list.
pub fn cards<T: Content>(records: &[Record<T>], viewer: Access) -> Vec<ContentCard> {
    records
        .iter()
        .map(|r| ContentCard::build(r, viewer))
        .collect()
}

const PROTECTED_VIEWER_FRAGMENT: &str = "#toolbar=0&navpanes=0&scrollbar=1";

/// Document viewer model for notes and tutorials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentViewer {
    /// Modal title.
    pub title: String,
    /// Source to embed.
    pub src: String,
    /// Toolbar, save and print affordances suppressed.
    pub protected: bool,
    /// Overlay watermark text, present when protected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<String>,
    /// Whether a download button is shown.
    pub download_allowed: bool,
}

impl DocumentViewer {
    /// Viewer for a document, watermarked with the site name when the
    /// record is not downloadable.
    pub fn new(title: &str, file: &str, downloadable: bool, site_name: &str) -> Self {
        if downloadable {
            Self {
                title: title.to_string(),
                src: file.to_string(),
                protected: false,
                watermark: None,
                download_allowed: true,
            }
        } else {
            Self {
                title: title.to_string(),
                src: format!("{}{}", file, PROTECTED_VIEWER_FRAGMENT),
                protected: true,
                watermark: Some(site_name.to_string()),
                download_allowed: false,
            }
        }
    }
}

/// What the view action opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "viewer", rename_all = "lowercase")]
pub enum ViewModel {
    /// Document modal.
    Document(DocumentViewer),
    /// Video modal.
    Video {
        /// Modal title.
        title: String,
        /// Player to embed.
        player: Player,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentBase, Note, Tutorial, Video, VideoSource};

    fn note(id: &str, created_at: Option<i64>, access: Access, month: Option<&str>) -> Record<Note> {
        Record::new(
            id,
            Note {
                base: ContentBase {
                    title: format!("note {}", id),
                    access,
                    month: month.map(str::to_string),
                    created_at,
                    ..Default::default()
                },
                file: Some("data:application/pdf;base64,AAAA".into()),
            },
        )
    }

    #[test]
    fn newest_first() {
        let records = vec![
            note("a", Some(100), Access::Free, None),
            note("b", Some(300), Access::Free, None),
            note("c", Some(200), Access::Free, None),
        ];
        let ids: Vec<_> = list(records, &ContentFilter::default())
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn missing_timestamp_sorts_oldest() {
        let records = vec![
            note("a", None, Access::Free, None),
            note("b", Some(1), Access::Free, None),
        ];
        let ids: Vec<_> = list(records, &ContentFilter::default())
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn month_filter_is_exact() {
        let records = vec![
            note("a", Some(1), Access::Free, Some("2024-03")),
            note("b", Some(2), Access::Paid, Some("2024-04")),
            note("c", Some(3), Access::Free, None),
        ];
        let filter = ContentFilter::parse(None, Some("2024-03"), None).unwrap();
        let listed = list(records.clone(), &filter);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "a");

        let all = ContentFilter::parse(Some("all"), Some("all"), None).unwrap();
        assert_eq!(list(records, &all).len(), 3);
    }

    #[test]
    fn access_then_type_filter() {
        let tut = |id: &str, t: TutorialType, access: Access| {
            Record::new(
                id,
                Tutorial {
                    base: ContentBase {
                        title: id.into(),
                        access,
                        ..Default::default()
                    },
                    tutorial_type: t,
                    file: None,
                },
            )
        };
        let records = vec![
            tut("a", TutorialType::New, Access::Free),
            tut("b", TutorialType::Old, Access::Free),
            tut("c", TutorialType::Old, Access::Paid),
        ];
        let filter = ContentFilter::parse(Some("free"), None, Some("old")).unwrap();
        let listed = list(records, &filter);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "b");
    }

    #[test]
    fn bad_filter_values_rejected() {
        assert!(ContentFilter::parse(Some("gold"), None, None).is_err());
        assert!(ContentFilter::parse(Some("free"), None, Some("essay")).is_err());
    }

    #[test]
    fn malformed_month_selects_nothing() {
        let records = vec![
            note("a", Some(1), Access::Free, Some("2024-03")),
            note("b", Some(2), Access::Free, Some("2024-04")),
        ];
        for month in ["2024-3", "March"] {
            let filter = ContentFilter::parse(None, Some(month), None).unwrap();
            assert_eq!(filter.month.as_deref(), Some(month));
            assert!(list(records.clone(), &filter).is_empty());
        }
    }

    #[test]
    fn locked_card_withholds_file() {
        let record = note("a", Some(1), Access::Paid, Some("2024-03"));
        let card = ContentCard::build(&record, Access::Free);
        assert!(card.locked);
        assert_eq!(card.file, None);
        assert!(!card.actions.view);
        assert_eq!(card.month_label.as_deref(), Some("Mar 2024"));

        let card = ContentCard::build(&record, Access::Paid);
        assert!(!card.locked);
        assert!(card.file.is_some());
        assert!(card.actions.view);
        assert!(!card.actions.download);
    }

    #[test]
    fn video_cards_carry_source_badge_and_thumbnail() {
        let record = Record::new(
            "v",
            Video {
                base: ContentBase {
                    title: "Intro".into(),
                    ..Default::default()
                },
                source: VideoSource::Youtube {
                    youtube: "https://youtu.be/dQw4w9WgXcQ".into(),
                },
                thumbnail: None,
            },
        );
        let card = ContentCard::build(&record, Access::Free);
        assert_eq!(card.kind_label, Some("YouTube"));
        assert_eq!(
            card.thumbnail.as_deref(),
            Some("https://img.youtube.com/vi/dQw4w9WgXcQ/mqdefault.jpg")
        );
    }

    #[test]
    fn months_distinct_newest_first() {
        let records = vec![
            note("a", None, Access::Free, Some("2024-01")),
            note("b", None, Access::Free, Some("2024-03")),
            note("c", None, Access::Free, Some("2024-01")),
            note("d", None, Access::Free, None),
        ];
        assert_eq!(available_months(&records), ["2024-03", "2024-01"]);
    }

    #[test]
    fn counts_follow_viewer_status() {
        let records = vec![
            note("a", None, Access::Free, None),
            note("b", None, Access::Paid, None),
        ];
        assert_eq!(accessible_count(&records, Access::Free), 1);
        assert_eq!(accessible_count(&records, Access::Paid), 2);
    }

    #[test]
    fn protected_viewer_watermarks() {
        let viewer = DocumentViewer::new("Week 1", "data:x", false, "Media Studies A/L");
        assert!(viewer.protected);
        assert_eq!(viewer.src, "data:x#toolbar=0&navpanes=0&scrollbar=1");
        assert_eq!(viewer.watermark.as_deref(), Some("Media Studies A/L"));

        let viewer = DocumentViewer::new("Week 1", "data:x", true, "Media Studies A/L");
        assert!(!viewer.protected);
        assert_eq!(viewer.src, "data:x");
    }
}
