//! Pagination link construction (§4.4 supplement): out of scope for the
//! core design, but needed for a runnable `GET /subscriptions` response.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Href {
    pub href: String,
}

#[derive(Debug, Serialize, Default)]
pub struct PaginationLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<Href>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Href>,
}

/// Builds `_links.prev`/`_links.next` from the page that was actually
/// served. `prev` is absent at `offset == 0`; `next` is absent once a page
/// comes back short of `limit` (no more data beyond it).
pub fn build(
    path: &str,
    owning_application: Option<&str>,
    event_types: &[String],
    offset: u32,
    limit: u32,
    actual_size: u32,
) -> PaginationLinks {
    let query = |offset: u32| -> String {
        let mut params = vec![format!("offset={offset}"), format!("limit={limit}")];
        if let Some(app) = owning_application {
            params.push(format!("owning_application={}", urlencoding::encode(app)));
        }
        for event_type in event_types {
            params.push(format!("event_type={}", urlencoding::encode(event_type)));
        }
        format!("{path}?{}", params.join("&"))
    };

    let prev = (offset > 0).then(|| Href { href: query(offset.saturating_sub(limit)) });
    let next = (actual_size >= limit).then(|| Href { href: query(offset + limit) });

    PaginationLinks { prev, next }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_has_no_prev_link() {
        let links = build("/subscriptions", None, &[], 0, 20, 20);
        assert!(links.prev.is_none());
        assert!(links.next.is_some());
    }

    #[test]
    fn short_page_has_no_next_link() {
        let links = build("/subscriptions", None, &[], 20, 20, 5);
        assert!(links.prev.is_some());
        assert!(links.next.is_none());
    }

    #[test]
    fn query_string_includes_owning_application_and_event_types() {
        let links = build(
            "/subscriptions",
            Some("my app"),
            &["orders.placed".to_string()],
            0,
            20,
            20,
        );
        let href = &links.next.unwrap().href;
        assert!(href.contains("owning_application=my%20app"));
        assert!(href.contains("event_type=orders.placed"));
    }
}
