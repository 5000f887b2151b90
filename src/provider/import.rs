//! Parsing of composite import ids such as `service_name/engine/id`.

use super::ProviderError;

/// Splits a slash-delimited import id into exactly `N` non-empty segments.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidImportId`] naming the expected format when
/// the segment count differs or a segment is empty.
pub fn parse_import_id<'a, const N: usize>(
    id: &'a str,
    fields: [&str; N],
) -> Result<[&'a str; N], ProviderError> {
    split_import_id(id, '/', fields)
}

/// Splits `id` on `separator` into exactly `N` non-empty segments.
///
/// Used directly by resources whose key segments may themselves contain a
/// slash, such as CIDR blocks.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidImportId`] on malformed ids.
pub fn split_import_id<'a, const N: usize>(
    id: &'a str,
    separator: char,
    fields: [&str; N],
) -> Result<[&'a str; N], ProviderError> {
    let invalid = || ProviderError::InvalidImportId {
        id: id.to_owned(),
        expected: fields.join(separator.to_string().as_str()),
    };

    let segments: Vec<&str> = id.split(separator).map(str::trim).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(invalid());
    }
    <[&str; N]>::try_from(segments).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_three_segment_ids() {
        let [service, engine, id] =
            parse_import_id("abc123/postgresql/db-1", ["service_name", "engine", "id"])
                .expect("id should parse");
        assert_eq!((service, engine, id), ("abc123", "postgresql", "db-1"));
    }

    #[rstest]
    #[case("abc123/postgresql")]
    #[case("abc123/postgresql/db-1/extra")]
    #[case("abc123//db-1")]
    #[case("")]
    fn rejects_malformed_ids(#[case] id: &str) {
        let err = parse_import_id(id, ["service_name", "engine", "id"])
            .expect_err("id should be rejected");
        let ProviderError::InvalidImportId { expected, .. } = err else {
            panic!("expected InvalidImportId");
        };
        assert_eq!(expected, "service_name/engine/id");
    }

    #[test]
    fn custom_separator_keeps_cidr_blocks_intact() {
        let [block, ip] = split_import_id("192.0.2.0/24|192.0.2.10", '|', ["ip_block", "ip"])
            .expect("id should parse");
        assert_eq!(block, "192.0.2.0/24");
        assert_eq!(ip, "192.0.2.10");
    }
}
