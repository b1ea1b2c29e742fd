use drover_dsl::json::escape;

const OPEN: &str = "$(";
const CLOSE: char = ')';

/// Substitute `$(Title.Property)` references in `input`.
///
/// `lookup(title, property)` resolves one reference; the span content is split
/// on its first `.`. A resolved value is JSON-escaped and replaces the whole
/// span. Spans that do not resolve (unknown title, no state yet, unknown
/// property, no `.`, or no closing `)`) are kept verbatim, so interpolation
/// never fails. When a second `$(` appears before the closing `)`, the text up
/// to it is literal and the span restarts there.
pub fn interpolate<F>(input: &str, mut lookup: F) -> String
where
    F: FnMut(&str, &str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];

        let Some(end) = after.find(CLOSE) else {
            rest = &rest[start..];
            break;
        };
        let body = &after[..end];

        if let Some(inner) = body.find(OPEN) {
            out.push_str(&rest[start..start + OPEN.len() + inner]);
            rest = &after[inner..];
            continue;
        }

        let resolved = body
            .split_once('.')
            .and_then(|(title, property)| lookup(title, property));
        match resolved {
            Some(value) => out.push_str(&escape(&value)),
            None => out.push_str(&rest[start..start + OPEN.len() + end + 1]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(title: &str, property: &str) -> Option<String> {
        match (title, property) {
            ("A", "X") => Some("42".into()),
            ("A", "Quote") => Some("say \"hi\"".into()),
            ("B", "Path") => Some("/tmp/out".into()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_reference() {
        assert_eq!(interpolate("val=$(A.X)", lookup), "val=42");
    }

    #[test]
    fn unknown_title_is_kept_verbatim() {
        assert_eq!(interpolate("val=$(Z.X)", lookup), "val=$(Z.X)");
    }

    #[test]
    fn unknown_property_is_kept_verbatim() {
        assert_eq!(interpolate("$(A.Nope)", lookup), "$(A.Nope)");
    }

    #[test]
    fn several_references_in_one_string() {
        assert_eq!(
            interpolate(r#"{"Args":["$(A.X)","$(B.Path)","$(Z.Q)"]}"#, lookup),
            r#"{"Args":["42","\/tmp\/out","$(Z.Q)"]}"#
        );
    }

    #[test]
    fn substituted_value_is_escaped() {
        let out = interpolate(r#"{"Msg":"$(A.Quote)"}"#, lookup);
        assert_eq!(out, r#"{"Msg":"say \"hi\""}"#);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["Msg"], "say \"hi\"");
    }

    #[test]
    fn malformed_spans_degrade_to_literal_text() {
        assert_eq!(interpolate("$(AX)", lookup), "$(AX)");
        assert_eq!(interpolate("open $(A.X", lookup), "open $(A.X");
        assert_eq!(interpolate("tail $(", lookup), "tail $(");
        assert_eq!(interpolate("no refs at all", lookup), "no refs at all");
        assert_eq!(interpolate("$ (A.X) and $A.X", lookup), "$ (A.X) and $A.X");
    }

    #[test]
    fn nested_open_restarts_the_span() {
        assert_eq!(interpolate("$(junk $(A.X)", lookup), "$(junk 42");
    }

    #[test]
    fn property_path_keeps_later_dots() {
        let out = interpolate("$(A.b.c)", |title, property| {
            assert_eq!((title, property), ("A", "b.c"));
            Some("ok".into())
        });
        assert_eq!(out, "ok");
    }
}
