//! Catalog query construction
//!
//! Filters map one of the twelve exposed query fields to an exact-match value.
//! Keys are a closed enum, so only compile-time column names ever reach the
//! SQL text; every value is a bound parameter.

use af_common::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Exposed query fields, in result-column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryField {
    Title,
    Path,
    BasePath,
    TrackNum,
    DiscNum,
    Album,
    TrackCount,
    DiscCount,
    Year,
    Artist,
    Publisher,
    Genre,
}

impl QueryField {
    pub const ALL: [QueryField; 12] = [
        QueryField::Title,
        QueryField::Path,
        QueryField::BasePath,
        QueryField::TrackNum,
        QueryField::DiscNum,
        QueryField::Album,
        QueryField::TrackCount,
        QueryField::DiscCount,
        QueryField::Year,
        QueryField::Artist,
        QueryField::Publisher,
        QueryField::Genre,
    ];

    /// Public field name, used as filter key and result column alias
    pub fn name(self) -> &'static str {
        match self {
            QueryField::Title => "title",
            QueryField::Path => "path",
            QueryField::BasePath => "base_path",
            QueryField::TrackNum => "track_num",
            QueryField::DiscNum => "disc_num",
            QueryField::Album => "album",
            QueryField::TrackCount => "track_count",
            QueryField::DiscCount => "disc_count",
            QueryField::Year => "year",
            QueryField::Artist => "artist",
            QueryField::Publisher => "publisher",
            QueryField::Genre => "genre",
        }
    }

    /// Qualified catalog column backing this field
    pub fn column(self) -> &'static str {
        match self {
            QueryField::Title => "song.name",
            QueryField::Path => "song.path",
            QueryField::BasePath => "song.base_path",
            QueryField::TrackNum => "song.track_num",
            QueryField::DiscNum => "song.disc_num",
            QueryField::Album => "album.name",
            QueryField::TrackCount => "album.track_count",
            QueryField::DiscCount => "album.disc_count",
            QueryField::Year => "album.year",
            QueryField::Artist => "artist.name",
            QueryField::Publisher => "publisher.name",
            QueryField::Genre => "genre.name",
        }
    }
}

impl FromStr for QueryField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        QueryField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| Error::InvalidFilterKey(s.to_string()))
    }
}

impl fmt::Display for QueryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Exact-match filter over the catalog; an empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    terms: BTreeMap<QueryField, String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from string keys, rejecting any unknown key
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut filter = Self::new();
        for (key, value) in pairs {
            filter.insert(key.as_ref(), value)?;
        }
        Ok(filter)
    }

    /// Add a term by field name; a repeated key replaces the earlier value
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let field: QueryField = key.parse()?;
        self.terms.insert(field, value.into());
        Ok(())
    }

    /// Add a term by field
    pub fn with(mut self, field: QueryField, value: impl Into<String>) -> Self {
        self.terms.insert(field, value.into());
        self
    }

    pub fn get(&self, field: QueryField) -> Option<&str> {
        self.terms.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (QueryField, &str)> {
        self.terms.iter().map(|(field, value)| (*field, value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
}

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub sql: String,
    pub params: Vec<String>,
}

/// Build the joined catalog SELECT for a filter
///
/// Song, album and artist must all agree on the artist: a song is only
/// reported under the artist that owns its album.
pub fn build_catalog_query(filter: &Filter) -> CatalogQuery {
    let columns = QueryField::ALL
        .iter()
        .map(|field| format!("{} AS {}", field.column(), field.name()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "SELECT {} FROM song \
         JOIN album ON song.album_id = album.id \
         JOIN artist ON song.artist_id = artist.id AND album.artist_id = artist.id \
         JOIN genre ON song.genre_id = genre.id \
         JOIN publisher ON album.publisher_id = publisher.id",
        columns
    );

    let mut params = Vec::with_capacity(filter.len());
    let mut keyword = " WHERE";
    for (field, value) in filter.iter() {
        sql.push_str(keyword);
        sql.push(' ');
        sql.push_str(field.column());
        sql.push_str(" = ?");
        params.push(value.to_string());
        keyword = " AND";
    }

    sql.push_str(
        " ORDER BY artist.name, album.name, song.disc_num, song.track_num, song.name",
    );

    CatalogQuery { sql, params }
}

/// Parse the command-line filter syntax
///
/// `artist=Radiohead,album='OK Computer'` is a comma separated list of
/// `key=value` pairs. A key or value wrapped in single or double quotes may
/// contain `=` and `,`; anything between the closing quote and the next
/// separator is ignored. Unquoted items are trimmed.
pub fn parse_filter(input: &str) -> Result<Filter> {
    let mut filter = Filter::new();
    let mut rest = input;

    while !rest.trim().is_empty() {
        let (key, after_key) = next_item(rest, '=');
        let after_key = after_key.ok_or_else(|| {
            Error::InvalidFilterKey(format!("missing '=' after \"{}\"", key))
        })?;

        let (value, after_value) = next_item(after_key, ',');
        filter.insert(&key, value)?;

        match after_value {
            Some(tail) => rest = tail,
            None => break,
        }
    }

    Ok(filter)
}

/// Split off one item ending at `separator`, honoring a leading quote
fn next_item(s: &str, separator: char) -> (String, Option<&str>) {
    let s = s.trim_start();

    if let Some(quote) = s.chars().next().filter(|c| *c == '\'' || *c == '"') {
        let body = &s[quote.len_utf8()..];
        return match body.find(quote) {
            Some(end) => {
                let word = body[..end].to_string();
                let tail = &body[end + quote.len_utf8()..];
                let rest = tail.find(separator).map(|i| &tail[i + separator.len_utf8()..]);
                (word, rest)
            }
            // Unterminated quote runs to the end of input
            None => (body.to_string(), None),
        };
    }

    match s.find(separator) {
        Some(i) => (s[..i].trim().to_string(), Some(&s[i + separator.len_utf8()..])),
        None => (s.trim().to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for field in QueryField::ALL {
            assert_eq!(field.name().parse::<QueryField>().unwrap(), field);
        }
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = "colour".parse::<QueryField>();
        assert!(matches!(result, Err(Error::InvalidFilterKey(k)) if k == "colour"));

        // Column-looking keys are not accepted either
        assert!("song.name".parse::<QueryField>().is_err());
        assert!("title; DROP TABLE song".parse::<QueryField>().is_err());
    }

    #[test]
    fn test_empty_filter_has_no_where_clause() {
        let query = build_catalog_query(&Filter::new());
        assert!(!query.sql.contains("WHERE"));
        assert!(query.params.is_empty());
        assert!(query.sql.contains("song.name AS title"));
        assert!(query.sql.contains("genre.name AS genre"));
    }

    #[test]
    fn test_values_are_bound_not_interpolated() {
        let filter = Filter::new()
            .with(QueryField::Artist, "O'Brien")
            .with(QueryField::Year, "1997");
        let query = build_catalog_query(&filter);

        assert!(!query.sql.contains("O'Brien"));
        assert!(query.sql.contains("WHERE album.year = ? AND artist.name = ?"));
        assert_eq!(query.params, vec!["1997".to_string(), "O'Brien".to_string()]);
    }

    #[test]
    fn test_parse_plain_pairs() {
        let filter = parse_filter("artist=Radiohead, album=OK Computer").unwrap();
        assert_eq!(filter.get(QueryField::Artist), Some("Radiohead"));
        assert_eq!(filter.get(QueryField::Album), Some("OK Computer"));
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn test_parse_quoted_values() {
        let filter = parse_filter("title='Hello, World',artist=\"A=B\",genre=Rock").unwrap();
        assert_eq!(filter.get(QueryField::Title), Some("Hello, World"));
        assert_eq!(filter.get(QueryField::Artist), Some("A=B"));
        assert_eq!(filter.get(QueryField::Genre), Some("Rock"));
    }

    #[test]
    fn test_parse_quoted_key_and_embedded_apostrophe() {
        let filter = parse_filter("'artist'=\"O'Brien\"").unwrap();
        assert_eq!(filter.get(QueryField::Artist), Some("O'Brien"));
    }

    #[test]
    fn test_parse_empty_and_trailing_comma() {
        assert!(parse_filter("").unwrap().is_empty());
        assert!(parse_filter("   ").unwrap().is_empty());
        assert_eq!(parse_filter("year=1997,").unwrap().len(), 1);
    }

    #[test]
    fn test_parse_value_may_contain_equals() {
        let filter = parse_filter("title=a=b").unwrap();
        assert_eq!(filter.get(QueryField::Title), Some("a=b"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_filter("radiohead"), Err(Error::InvalidFilterKey(_))));
        assert!(matches!(parse_filter("band=Radiohead"), Err(Error::InvalidFilterKey(k)) if k == "band"));
    }

    #[test]
    fn test_from_pairs_validates_keys() {
        let ok = Filter::from_pairs([("artist", "Radiohead"), ("year", "1997")]).unwrap();
        assert_eq!(ok.len(), 2);

        let bad = Filter::from_pairs([("artist", "Radiohead"), ("label", "EMI")]);
        assert!(matches!(bad, Err(Error::InvalidFilterKey(_))));
    }
}
