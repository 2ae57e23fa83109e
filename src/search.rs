//! Helpers for filtering the catalog and presenting the results.

use crate::{Record, COMPONENT};
use percent_encoding::utf8_percent_encode;
use regex::RegexBuilder;
use url::Url;

impl Record {
    /// Does this [`Record`] match a free-text query?
    ///
    /// The query is trimmed and compared case-insensitively against the
    /// name, description and year. An empty query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();

        query.is_empty()
            || self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.year.to_string().contains(&query)
    }
}

/// Find all [`Record`]s matching `query`, in their original order.
pub fn search<'r, I>(records: I, query: &str) -> Vec<&'r Record>
where
    I: IntoIterator<Item = &'r Record>,
{
    records
        .into_iter()
        .filter(|record| record.matches(query))
        .collect()
}

/// Wrap every case-insensitive occurrence of `query` in `<mark>` tags.
///
/// The query is matched literally, so `"a.b"` won't match `"axb"`.
///
/// # Examples
///
/// ```rust
/// assert_eq!(
///     carimage::highlight("Ford Mustang", "must"),
///     "Ford <mark>Must</mark>ang"
/// );
/// assert_eq!(carimage::highlight("Ford Mustang", ""), "Ford Mustang");
/// ```
pub fn highlight(text: &str, query: &str) -> String {
    if query.is_empty() {
        return text.to_string();
    }

    let pattern = format!("({})", regex::escape(query));

    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.replace_all(text, "<mark>${1}</mark>").into_owned(),
        Err(e) => {
            log::debug!("Unable to highlight \"{}\": {}", query, e);
            text.to_string()
        },
    }
}

/// Escape the characters which are significant inside HTML text and
/// attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }

    escaped
}

/// An inline SVG showing `label`, for use until a real image is available.
pub fn placeholder_data_url(label: &str) -> String {
    let svg = format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='1200' height='600' viewBox='0 0 1200 600'>\
         <rect width='100%' height='100%' fill='#252525'/>\
         <text x='50%' y='50%' font-family='Quicksand, Arial, sans-serif' font-size='36' fill='#cccccc' \
         dominant-baseline='middle' text-anchor='middle'>{}</text></svg>",
        escape_html(label)
    );

    format!(
        "data:image/svg+xml;charset=utf-8,{}",
        utf8_percent_encode(&svg, COMPONENT)
    )
}

/// A short label crediting where a record's image came from.
///
/// This is the link's host name without any leading `www.`, or a generic
/// `"Source"` when there is no usable link.
pub fn source_name(link: Option<&str>) -> String {
    const GENERIC: &str = "Source";

    let link = match link {
        Some(link) if !link.is_empty() && link != "#" => link,
        _ => return String::from(GENERIC),
    };

    match Url::parse(link).ok().as_ref().and_then(Url::host_str) {
        Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
        None => String::from(GENERIC),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Year;
    use pretty_assertions::assert_eq;

    fn catalog() -> Vec<Record> {
        vec![
            Record::new("Ford Mustang", Year::from(1964), "A pony car.")
                .with_source_link("https://www.example.com/mustang"),
            Record::new("Bugatti Veyron", Year::from(2005), "Very fast.")
                .with_direct_image("https://img.example.com/veyron.jpg"),
            Record::new("Reliant Robin", Year::from("1973-1981"), "Three wheels, one roof."),
        ]
    }

    #[test]
    fn empty_queries_match_everything() {
        let records = catalog();

        assert_eq!(search(&records, "").len(), 3);
        assert_eq!(search(&records, "   ").len(), 3);
    }

    #[test]
    fn queries_look_at_name_description_and_year() {
        fn names<'r>(records: &'r [Record], query: &str) -> Vec<&'r str> {
            search(records, query)
                .into_iter()
                .map(|r| r.name.as_str())
                .collect()
        }
        let records = catalog();
        let names = |query| names(&records, query);

        assert_eq!(names("MUSTANG"), vec!["Ford Mustang"]);
        assert_eq!(names("  fast "), vec!["Bugatti Veyron"]);
        assert_eq!(names("1973"), vec!["Reliant Robin"]);
        assert_eq!(names("19"), vec!["Ford Mustang", "Reliant Robin"]);
        assert!(names("tesla").is_empty());
    }

    #[test]
    fn highlight_keeps_the_original_casing() {
        assert_eq!(highlight("Ford Mustang", "must"), "Ford <mark>Must</mark>ang");
        assert_eq!(
            highlight("Mustang, a MUSTang", "mUsT"),
            "<mark>Must</mark>ang, a <mark>MUST</mark>ang"
        );
    }

    #[test]
    fn highlight_treats_the_query_literally() {
        assert_eq!(highlight("a.b axb", "a.b"), "<mark>a.b</mark> axb");
        assert_eq!(highlight("(1+1)*2", "(1+1)"), "<mark>(1+1)</mark>*2");
        assert_eq!(highlight("cost $5", "$5"), "cost <mark>$5</mark>");
    }

    #[test]
    fn nothing_to_highlight() {
        assert_eq!(highlight("Ford Mustang", ""), "Ford Mustang");
        assert_eq!(highlight("Ford Mustang", "Ferrari"), "Ford Mustang");
    }

    #[test]
    fn escape_the_usual_suspects() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&lt;/a&gt;"
        );
    }

    #[test]
    fn placeholders_are_encoded_svg() {
        let got = placeholder_data_url("Ford <Mustang>");

        assert!(got.starts_with("data:image/svg+xml;charset=utf-8,%3Csvg"));
        assert!(got.contains("%23252525"));
        assert!(got.contains("Ford%20%26lt%3BMustang%26gt%3B"));
        assert!(!got.contains(' '));
    }

    #[test]
    fn source_names() {
        let inputs = vec![
            (Some("https://www.example.com/mustang"), "example.com"),
            (Some("http://cars.example.org/a?b=c"), "cars.example.org"),
            (Some("#"), "Source"),
            (Some(""), "Source"),
            (Some("not a url"), "Source"),
            (None, "Source"),
        ];

        for (link, should_be) in inputs {
            assert_eq!(source_name(link), should_be, "{:?}", link);
        }
    }
}
