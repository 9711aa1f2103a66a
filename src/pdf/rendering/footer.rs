//! Page footers.
//!
//! Footers are stamped onto every page after all content is rendered, when the total
//! page count is known. Templates support placeholders:
//! - `{n}` - page number, starting at 1
//! - `{total}` - total page count

use crate::pdf::document::Document;

/// Expand a footer template for one page.
pub fn expand_template(template: &str, page_number: usize, total: usize) -> String {
    template
        .replace("{n}", &page_number.to_string())
        .replace("{total}", &total.to_string())
}

/// Render the footer on every page. An empty template disables footers.
pub fn render_footers(doc: &mut Document, template: &str) {
    if template.trim().is_empty() {
        return;
    }

    let total = doc.page_count();
    for page in 0..total {
        let text = expand_template(template, page + 1, total);
        if !text.trim().is_empty() {
            doc.add_footer(page, &text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_expand_template() {
        assert_eq!(expand_template("Page {n}/{total}", 3, 12), "Page 3/12");
        assert_eq!(expand_template("- {n} -", 1, 1), "- 1 -");
        assert_eq!(expand_template("Confidential", 2, 5), "Confidential");
    }
}
