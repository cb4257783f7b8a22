use folio_common::paging::PageWindow;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// `?page=` as sent by the client. Kept as text: anything that is not a
/// positive integer resolves to page 1 instead of failing the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number (default 1; out-of-range values are clamped)
    #[param(required = false)]
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    pub fn window(&self, total: u64, page_size: u64) -> PageWindow {
        PageWindow::resolve(self.page.as_deref(), total, page_size)
    }
}

/// Trimmed, non-empty query text.
pub fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_pages_resolve_to_first() {
        let q = PageQuery {
            page: Some("abc".into()),
        };
        let w = q.window(30, 9);
        assert_eq!(w.number, 1);
        assert_eq!(w.num_pages, 4);

        let q = PageQuery {
            page: Some("99".into()),
        };
        assert_eq!(q.window(30, 9).number, 4);
        assert_eq!(PageQuery::default().window(0, 9).number, 1);
    }

    #[test]
    fn blank_text_is_none() {
        assert_eq!(non_empty(&Some("  ".into())), None);
        assert_eq!(non_empty(&Some(" rust ".into())), Some("rust".into()));
        assert_eq!(non_empty(&None), None);
    }
}
