//! Portal Core - domain model for a small e-learning portal.
//!
//! This library holds everything about the portal that does not touch
//! storage or the network:
//! - Content records (notes, tutorials, videos) and their validation
//! - Access-tier locking, list filtering and newest-first ordering
//! - YouTube and Google Drive URL parsing
//! - Student expiry, admin credentials and branding defaults
//! - The tenant license gate and feature flags
//! - Notice visibility and the backup document shape
//!
//! # Constraints
//!
//! This library intentionally does NOT:
//! - Perform file or network I/O
//! - Read the clock (callers pass `now`)
//! - Log
//!
//! # Example: What a free student sees
//!
//! ```
//! use portal_core::{catalog, Access, ContentBase, ContentFilter, Note, Record};
//!
//! let notes = vec![
//!     Record::new("a", Note {
//!         base: ContentBase { title: "Week 1".into(), created_at: Some(100), ..Default::default() },
//!         file: Some("data:application/pdf;base64,AAAA".into()),
//!     }),
//!     Record::new("b", Note {
//!         base: ContentBase {
//!             title: "Week 2".into(),
//!             access: Access::Paid,
//!             created_at: Some(200),
//!             ..Default::default()
//!         },
//!         file: Some("data:application/pdf;base64,BBBB".into()),
//!     }),
//! ];
//!
//! let listed = catalog::list(notes, &ContentFilter::default());
//! let cards = catalog::cards(&listed, Access::Free);
//!
//! assert_eq!(cards[0].id, "b");
//! assert!(cards[0].locked);
//! assert!(cards[0].file.is_none());
//! assert!(!cards[1].locked);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backup;
pub mod branding;
pub mod calendar;
pub mod catalog;
pub mod content;
pub mod error;
pub mod lenient;
pub mod license;
pub mod notice;
pub mod student;
pub mod video;

pub use backup::BackupDocument;
pub use branding::{BrandingSettings, TeacherInfo};
pub use catalog::{ContentCard, ContentFilter, DocumentViewer, ViewModel};
pub use content::{
    is_locked, Access, Content, ContentBase, ContentKind, Note, Record, Tutorial, TutorialType,
    Video, VideoSource,
};
pub use error::{Error, Result};
pub use license::{GateDecision, License, LicenseStatus, Restrictions, Screen};
pub use notice::{Notice, NoticeBody, NoticeFeed, Priority};
pub use student::{AdminCredential, Student, StudentSummary};
pub use video::Player;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
