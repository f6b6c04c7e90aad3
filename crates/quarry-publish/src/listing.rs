//! Browsable `index.html` pages

use askama::Template;
use quarry_core::QuarryError;

use crate::PublishResult;

/// One directory listing; `path` is empty for the publication root
#[derive(Template)]
#[template(path = "listing.html")]
pub struct Listing<'a> {
    pub path: &'a str,
    pub links: Vec<String>,
}

impl<'a> Listing<'a> {
    pub fn new(path: &'a str, links: Vec<String>) -> Self {
        Self { path, links }
    }

    /// Relative path of the page inside the publication
    pub fn file_path(&self) -> String {
        format!("{}index.html", self.path)
    }

    pub fn render_page(&self) -> PublishResult<String> {
        self.render().map_err(|e| {
            QuarryError::codec(format!("failed to render {}: {}", self.file_path(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_listing() {
        let page = Listing::new("", vec!["names".to_string()])
            .render_page()
            .unwrap();
        assert!(page.contains("<title>Gem Index</title>"));
        assert!(page.contains(r#"<a href="names">names</a>"#));
    }

    #[test]
    fn test_nested_listing_escapes_links() {
        let listing = Listing::new("info/", vec!["a&b".to_string()]);
        assert_eq!(listing.file_path(), "info/index.html");
        let page = listing.render_page().unwrap();
        assert!(page.contains("Index of info"));
        assert!(page.contains("a&amp;b"));
        assert!(!page.contains("a&b<"));
    }
}
