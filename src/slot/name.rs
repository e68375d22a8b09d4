use crate::error::SlotError;

/// Returns true for the characters allowed in slot names and dynamic parameter keys.
pub fn is_slot_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ',' | '#')
}

/// The one grammar check for slot names (`[A-Za-z0-9._,#]+`).
///
/// Both the configuration engine and editing front ends must call this predicate
/// instead of re-implementing the rule.
pub fn is_valid_slot_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_slot_name_char)
}

pub fn validate_slot_name(name: &str) -> Result<(), SlotError> {
    if is_valid_slot_name(name) {
        Ok(())
    } else {
        Err(SlotError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Strips characters outside the grammar, e.g. to turn a type name into a slot name.
/// Returns `None` if nothing usable remains.
pub fn sanitize_slot_name(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| is_slot_name_char(*c)).collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Proposes a name based on `base` that is not contained in `taken`.
///
/// `base` itself is returned when free; otherwise a counter starting at 2 is appended.
pub fn unique_slot_name<'a>(base: &str, taken: impl IntoIterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = taken.into_iter().collect();
    if !taken.contains(&base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_grammar_characters() {
        for name in ["Input", "Output2", "a.b", "x_y", "1,2", "#tag", "Mask.#1,b_2"] {
            assert!(is_valid_slot_name(name), "{name} should be accepted");
        }
    }

    #[test]
    fn test_rejects_outside_grammar() {
        for name in ["", " ", "Input Image", "a/b", "a-b", "ümlaut", "tab\t", "x:y"] {
            assert!(!is_valid_slot_name(name), "{name:?} should be rejected");
        }
    }

    #[test]
    fn test_unique_name_appends_counter() {
        assert_eq!(unique_slot_name("Input", ["Output"]), "Input");
        assert_eq!(unique_slot_name("Input", ["Input", "Input2"]), "Input3");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_slot_name("Label image").as_deref(), Some("Labelimage"));
        assert_eq!(sanitize_slot_name("  "), None);
    }
}
