//! Source Reader: page extraction and the HTTP implementation of `SourceReader`.

pub mod extract;
pub mod http;

pub use extract::{extract, parse_id};
pub use http::HttpSourceReader;

/// Minimal person pages in the shape `extract` expects.
#[cfg(test)]
pub(crate) mod testing {
    use crate::domain::AncestorId;

    pub fn person_page(
        first_name: &str,
        last_name: &str,
        parents: Option<(AncestorId, AncestorId)>,
    ) -> String {
        let mut page = format!(
            "<html><body>\n<input size=\"48\" type=\"text\" value=\"[[{first_name}/{last_name}/0/x]]\"/>\n"
        );
        match parents {
            Some((father, mother)) => page.push_str(&format!(
                "<h3 class=\"highlight\">Parents</h3>\n<ul>\n\
                 <li><a href=\"roglo_f?lang=fr;i={father}\">father</a></li>\n\
                 <li><a href=\"roglo_f?lang=fr;i={mother}\">mother</a></li>\n</ul>\n"
            )),
            None => page.push_str("<h3 class=\"highlight\">Mariage et enfant(s)</h3>\n<ul></ul>\n"),
        }
        page.push_str("</body></html>\n");
        page
    }
}
