//! Page Descriptors and the Refresh Dispatch Seam
//!
//! A refresh tick does different work depending on where the user currently
//! is: the VM list, a VM detail page, the console page, the settings pages.
//! The scheduler itself only tags each tick with the page descriptor and a
//! reason; the host application implements [`PageRefreshDispatcher`] to route
//! the tick to the right domain fetches.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::RefreshError;

/// What kind of page a refresh tick targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageType {
    /// No page to refresh (pre-login, post-logout)
    NoRefresh,
    /// VM/pool list page
    List,
    /// Single VM detail page
    Detail,
    /// VM creation/edit wizard
    Create,
    /// VM console page
    Console,
    /// Account settings page
    Settings,
    /// Per-VM settings page
    VmSettings,
    /// Settings page covering several VMs at once
    MultiVmSettings,
}

/// Identifies what a refresh tick should fetch.
///
/// Owned by process-wide navigation state and replaced on navigation; the
/// scheduler captures it at start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDescriptor {
    #[serde(rename = "type")]
    pub page_type: PageType,
    /// Entity id for detail-like pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl PageDescriptor {
    pub fn new(page_type: PageType, id: Option<String>) -> Self {
        Self { page_type, id }
    }

    /// The non-page used before login and after logout.
    pub fn none() -> Self {
        Self::new(PageType::NoRefresh, None)
    }

    pub fn list() -> Self {
        Self::new(PageType::List, None)
    }

    pub fn detail(id: impl Into<String>) -> Self {
        Self::new(PageType::Detail, Some(id.into()))
    }

    pub fn console(id: impl Into<String>) -> Self {
        Self::new(PageType::Console, Some(id.into()))
    }

    pub fn settings() -> Self {
        Self::new(PageType::Settings, None)
    }

    /// Whether a refresh tick has anything to do on this page.
    pub fn refreshable(&self) -> bool {
        self.page_type != PageType::NoRefresh
    }
}

impl Default for PageDescriptor {
    fn default() -> Self {
        Self::none()
    }
}

/// Why a refresh was dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshReason {
    /// The user navigated to the page
    Navigation,
    /// A scheduled tick fired
    Schedule,
    /// The user clicked refresh
    Manual,
}

/// External collaborator that executes a refresh for a page.
///
/// Implementations route to the domain fetches for the page type and own
/// their error reporting; the reason lets them do extra work on manual
/// refreshes only (the original client reloads ISO images that way).
pub trait PageRefreshDispatcher: Send + Sync {
    fn refresh(
        &self,
        page: &PageDescriptor,
        reason: RefreshReason,
    ) -> BoxFuture<'static, Result<(), RefreshError>>;
}
