//! Service instance names and the stable identity derived from them.

/// Decode DNS-SD presentation escapes: `\DDD` is a decimal byte value and
/// `\c` is the literal character `c`.
///
/// Decoded bytes are reassembled as UTF-8, so `Caf\195\169` becomes `Café`.
#[must_use]
pub fn decode_service_name(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if let Some(byte) = bytes.get(i + 1..i + 4).and_then(decimal_escape) {
                out.push(byte);
                i += 4;
                continue;
            }
            // A digit that does not start a full `\DDD` leaves the backslash as is.
            if let Some(&next) = bytes.get(i + 1).filter(|next| !next.is_ascii_digit()) {
                out.push(next);
                i += 2;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn decimal_escape(digits: &[u8]) -> Option<u8> {
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let value = digits
        .iter()
        .fold(0_u16, |acc, d| acc * 10 + u16::from(d - b'0'));
    u8::try_from(value).ok()
}

/// Trim, collapse internal whitespace and lowercase.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Identity of an advertisement, stable across re-resolution.
#[must_use]
pub fn stable_id(service_type: &str, domain: &str, name: &str) -> String {
    format!("{service_type}|{domain}|{}", normalize_name(name))
}

/// Instance label of a full service name such as
/// `Office\032Gateway._openclaw-gw._tcp.local.`.
#[must_use]
pub fn instance_from_fullname<'a>(fullname: &'a str, service_type: &str, domain: &str) -> &'a str {
    let suffix = format!(".{service_type}.{domain}");
    fullname
        .strip_suffix(suffix.as_str())
        .or_else(|| fullname.strip_suffix(suffix.trim_end_matches('.')))
        .unwrap_or(fullname)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(r"Office\032Gateway", "Office Gateway" ; "decimal space")]
    #[test_case(r"Caf\195\169", "Café" ; "utf8 bytes")]
    #[test_case(r"Rack\.1", "Rack.1" ; "escaped dot")]
    #[test_case(r"back\\slash", r"back\slash" ; "escaped backslash")]
    #[test_case("plain", "plain" ; "no escapes")]
    #[test_case(r"trailing\", r"trailing\" ; "dangling backslash")]
    #[test_case(r"big\999", r"big\999" ; "out of range value")]
    #[test_case(r"a\03", r"a\03" ; "short decimal at end")]
    #[test_case(r"a\3b", r"a\3b" ; "short decimal mid name")]
    #[test_case(r"a\0329", "a 9" ; "decimal followed by digit")]
    fn test_decode_service_name(raw: &str, expected: &str) {
        assert_eq!(decode_service_name(raw), expected);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Office \t  Gateway "), "office gateway");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_stable_id_for_escaped_name() {
        let name = decode_service_name(r"Office\032Gateway");
        let id = stable_id("_openclaw-gw._tcp", "local.", &name);
        assert_eq!(name, "Office Gateway");
        assert_eq!(id, "_openclaw-gw._tcp|local.|office gateway");
    }

    #[test]
    fn test_instance_from_fullname() {
        assert_eq!(
            instance_from_fullname(r"Office\032Gateway._openclaw-gw._tcp.local.", "_openclaw-gw._tcp", "local."),
            r"Office\032Gateway"
        );
        assert_eq!(
            instance_from_fullname("Den._openclaw-gw._tcp.local", "_openclaw-gw._tcp", "local."),
            "Den"
        );
        assert_eq!(instance_from_fullname("Den", "_openclaw-gw._tcp", "local."), "Den");
    }

    proptest! {
        #[test]
        fn prop_stable_id_ignores_case_and_spacing(words in proptest::collection::vec("[a-zA-Z0-9]{1,8}", 1..5)) {
            let tight = words.join(" ");
            let loose = format!("  {}  ", words.join("   ")).to_uppercase();
            prop_assert_eq!(
                stable_id("_openclaw-gw._tcp", "local.", &tight),
                stable_id("_openclaw-gw._tcp", "local.", &loose)
            );
        }

        #[test]
        fn prop_normalize_is_idempotent(name in "[a-zA-Z0-9 \t]{0,40}") {
            let once = normalize_name(&name);
            prop_assert_eq!(normalize_name(&once), once.clone());
        }
    }
}
