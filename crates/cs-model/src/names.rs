use std::collections::BTreeMap;

/// Substitutes `@key@` markers with values from `replacements`. Unknown keys stay as written.
pub fn apply_replacements(text: &str, replacements: &BTreeMap<String, String>) -> String {
    if replacements.is_empty() || !text.contains('@') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('@') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('@') {
            Some(end) => match replacements.get(&after[..end]) {
                Some(value) => {
                    out.push_str(value);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push('@');
                    rest = after;
                }
            },
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Case-insensitive name test; an empty pattern matches everything.
pub(crate) fn name_matches(pattern: &str, name: &str) -> bool {
    pattern.is_empty() || same_name(pattern, name)
}

pub(crate) fn same_name(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}

pub(crate) fn tag_matches(pattern: &str, tags: &[String]) -> bool {
    pattern.is_empty() || tags.iter().any(|tag| name_matches(pattern, tag))
}

#[cfg(test)]
mod names_tests {
    use super::*;

    #[test]
    fn replacements_fill_known_keys() {
        let replacements = BTreeMap::from([("weapon".to_string(), "Broadsword".to_string())]);
        assert_eq!(
            apply_replacements("Weapon Master (@weapon@)", &replacements),
            "Weapon Master (Broadsword)"
        );
        assert_eq!(
            apply_replacements("@other@ and @weapon@", &replacements),
            "@other@ and Broadsword"
        );
        assert_eq!(apply_replacements("mail@", &replacements), "mail@");
        assert_eq!(apply_replacements("plain", &BTreeMap::new()), "plain");
    }

    #[test]
    fn matching_ignores_case() {
        assert!(name_matches("", "Anything"));
        assert!(name_matches("stealth", "Stealth"));
        assert!(!name_matches("Stealth", "Stealthy"));
        assert!(same_name("", ""));
        assert!(!same_name("", "Dagger"));
        assert!(tag_matches("Combat", &["combat".to_string()]));
        assert!(!tag_matches("Social", &["combat".to_string()]));
    }
}
