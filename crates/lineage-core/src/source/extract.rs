//! Person page extraction (regex-based).
//!
//! Anchors the extraction relies on:
//! - the first `<input>` carries `value="[[first/last/occ/display]]"`
//! - the first `<h3>` announces the parents section (`Parents`) when parents are known
//! - the list right after that header holds the father, then the mother, each as a link
//!   whose query ends in `i=<id>`

use std::sync::LazyLock;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::{Captures, Regex};

use crate::domain::{AncestorId, Extraction, LineageError};

static INPUT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b[^>]*>").expect("input tag pattern"));
static VALUE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bvalue\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("value attr pattern")
});
static FIRST_H3: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h3\b[^>]*>(.*?)</h3>").expect("h3 pattern"));
static LIST_AFTER_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\A\s*<ul\b[^>]*>(.*?)</ul>").expect("list pattern"));
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li\b[^>]*>").expect("list item pattern"));
static LINK_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("href pattern")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").expect("entity pattern")
});
static ID_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[?;&])i=(\d+)").expect("id param pattern"));

const PARENTS_HEADER: &str = "Parents";

/// Extract names and parent ids from one person page.
pub fn extract(page: &str) -> Result<Extraction, LineageError> {
    let (first_name, last_name) = extract_names(page)?;

    let header = FIRST_H3
        .captures(page)
        .ok_or_else(|| LineageError::Parse("no section header (<h3>) on page".into()))?;
    let header_text = TAG.replace_all(&header[1], "");

    let (father_id, mother_id) = if header_text.contains(PARENTS_HEADER) {
        let after_header = &page[header.get(0).map_or(0, |m| m.end())..];
        extract_parents(after_header)?
    } else {
        (None, None)
    };

    Ok(Extraction {
        first_name,
        last_name,
        father_id,
        mother_id,
    })
}

/// Extract the numeric id from a person link, e.g. `roglo?lang=fr;i=1640524`.
pub fn parse_id(href: &str) -> Result<AncestorId, LineageError> {
    let caps = ID_PARAM
        .captures(href)
        .ok_or_else(|| LineageError::Parse(format!("no person id in link {href:?}")))?;
    caps[1]
        .parse::<u64>()
        .map(AncestorId::new)
        .map_err(|e| LineageError::Parse(format!("person id in {href:?}: {e}")))
}

fn extract_names(page: &str) -> Result<(String, String), LineageError> {
    let input = INPUT_TAG
        .find(page)
        .ok_or_else(|| LineageError::Parse("no <input> carrying the name payload".into()))?;
    let value = VALUE_ATTR
        .captures(input.as_str())
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| decode_entities(m.as_str()))
        .ok_or_else(|| LineageError::Parse("name <input> has no value attribute".into()))?;

    let payload = value
        .strip_prefix("[[")
        .map(|rest| rest.trim_end_matches("]]"))
        .ok_or_else(|| LineageError::Parse(format!("unexpected name payload {value:?}")))?;
    let mut fields = payload.split('/');
    match (fields.next(), fields.next()) {
        (Some(first), Some(last)) => Ok((first.to_string(), last.to_string())),
        _ => Err(LineageError::Parse(format!(
            "name payload {value:?} lacks first/last fields"
        ))),
    }
}

fn extract_parents(
    after_header: &str,
) -> Result<(Option<AncestorId>, Option<AncestorId>), LineageError> {
    let list = LIST_AFTER_HEADER
        .captures(after_header)
        .ok_or_else(|| LineageError::Parse("parents header is not followed by a list".into()))?;
    let list = list.get(1).map_or("", |m| m.as_str());

    let starts: Vec<usize> = LIST_ITEM.find_iter(list).map(|m| m.end()).collect();
    let mut ids = Vec::with_capacity(2);
    for (n, start) in starts.iter().take(2).enumerate() {
        let end = starts.get(n + 1).map_or(list.len(), |next| *next);
        let item = &list[*start..end];
        let id = match LINK_HREF.captures(item) {
            Some(caps) => {
                let href = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
                Some(parse_id(&decode_entities(href))?)
            }
            None => None,
        };
        ids.push(id);
    }

    let father_id = ids.first().copied().flatten();
    let mother_id = ids.get(1).copied().flatten();
    if father_id.is_none() && mother_id.is_none() {
        return Err(LineageError::Parse(
            "parents section lists no linked parent".into(),
        ));
    }
    Ok((father_id, mother_id))
}

/// Decode character references (numeric and HTML5 named) in an attribute value.
/// Each reference is decoded on its own, so a stray `&` or an unknown name stays as written.
fn decode_entities(raw: &str) -> String {
    ENTITY
        .replace_all(raw, |caps: &Captures<'_>| {
            unescape_with(&caps[0], resolve_html5_entity)
                .map_or_else(|_| caps[0].to_string(), |text| text.into_owned())
        })
        .into_owned()
}
