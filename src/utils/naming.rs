//! Identifier conversions used to derive feature column names.

/// Converts `CamelCase` to `snake_case`.
///
/// Every run of capitals after the first character starts a new word, so
/// `MorganFingerprint` becomes `morgan_fingerprint` and `HTTPServer` becomes `h_ttpserver`.
pub fn camel_to_snake(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 && (i == 1 || !chars[i - 1].is_ascii_uppercase()) {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Converts free text such as `Morgan Fingerprint` to `snake_case`.
pub fn free_to_snake(s: &str) -> String {
    s.trim().to_lowercase().replace(' ', "_")
}

/// Column prefix for a unit name: free text when it contains spaces, `CamelCase` otherwise.
pub fn column_prefix(name: &str) -> String {
    if name.trim().contains(char::is_whitespace) {
        free_to_snake(name)
    } else {
        camel_to_snake(name.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_becomes_snake_case() {
        assert_eq!(camel_to_snake("MorganFingerprint"), "morgan_fingerprint");
        assert_eq!(camel_to_snake("CoulombMatrix"), "coulomb_matrix");
        assert_eq!(camel_to_snake("weight"), "weight");
        assert_eq!(camel_to_snake("AB"), "a_b");
        assert_eq!(camel_to_snake("HTTPServer"), "h_ttpserver");
    }

    #[test]
    fn free_text_becomes_snake_case() {
        assert_eq!(free_to_snake("  Morgan Fingerprint "), "morgan_fingerprint");
        assert_eq!(free_to_snake("Weight"), "weight");
    }

    #[test]
    fn prefix_picks_conversion_by_shape_of_name() {
        assert_eq!(column_prefix("MorganFingerprint"), "morgan_fingerprint");
        assert_eq!(column_prefix("Atom Counts"), "atom_counts");
    }
}
